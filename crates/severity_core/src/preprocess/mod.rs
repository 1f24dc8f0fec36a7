//! Feature preprocessing shared by training and inference
//!
//! A fitted [`FeatureTransform`] turns a [`FeatureRow`](crate::schema::FeatureRow)
//! into the fixed-point vector the forest consumes:
//!
//! - categorical columns are one-hot encoded against categories learned at fit time
//! - numeric columns pass through unscaled, stored at [`SCALE`](crate::forest::SCALE)
//! - binary columns accept yes/no style text and are normalized to 0/1
//!
//! The transform is serialized inside the artifact, so inference applies
//! exactly the encoding training used.

pub mod binary;
pub mod encoder;
pub mod transform;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::forest::SCALE;

pub use binary::{normalize_binary, parse_binary};
pub use encoder::OneHotEncoder;
pub use transform::FeatureTransform;

/// Preprocessing errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PreprocessError {
    #[error("missing column '{0}'")]
    MissingColumn(String),

    #[error("column '{column}': '{value}' is not a number")]
    InvalidNumber { column: String, value: String },

    #[error("column '{column}': category '{value}' was not seen during training")]
    UnknownCategory { column: String, value: String },

    #[error("column '{column}': '{value}' is not a recognised yes/no value")]
    UnmappedBinary { column: String, value: String },

    #[error("cannot fit transform on an empty set of rows")]
    NoRows,
}

/// What to do with a categorical value that was not seen during fit
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UnknownCategoryPolicy {
    /// Encode the column as all zeros
    #[default]
    Ignore,
    /// Fail the transform
    Error,
}

/// What to do with binary-column text outside the yes/no dictionary
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UnmappedBinaryPolicy {
    /// Treat as 0
    #[default]
    Zero,
    /// Fail the transform
    Error,
}

/// Both silent-fallback policies, frozen into the artifact at fit time
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PreprocessPolicy {
    pub unknown_category: UnknownCategoryPolicy,
    pub unmapped_binary: UnmappedBinaryPolicy,
}

/// Largest magnitude that survives conversion to fixed point
const MAX_ABS_VALUE: f64 = (i64::MAX / SCALE) as f64;

/// Convert a raw numeric value to fixed point at `SCALE`
pub fn to_fixed(column: &str, value: f64) -> Result<i64, PreprocessError> {
    if !value.is_finite() || value.abs() >= MAX_ABS_VALUE {
        return Err(PreprocessError::InvalidNumber {
            column: column.to_string(),
            value: value.to_string(),
        });
    }
    Ok((value * SCALE as f64).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_fixed() {
        assert_eq!(to_fixed("Driver_Age", 30.0).unwrap(), 30 * SCALE);
        assert_eq!(to_fixed("Driver_Age", 0.5).unwrap(), SCALE / 2);
        assert_eq!(to_fixed("Driver_Age", -2.0).unwrap(), -2 * SCALE);
    }

    #[test]
    fn test_to_fixed_rejects_non_finite() {
        assert!(to_fixed("Speed_Limit", f64::NAN).is_err());
        assert!(to_fixed("Speed_Limit", f64::INFINITY).is_err());
        assert!(to_fixed("Speed_Limit", 1e300).is_err());
    }

    #[test]
    fn test_policy_serde_names() {
        let policy: PreprocessPolicy =
            serde_json::from_str(r#"{"unknown_category":"error","unmapped_binary":"zero"}"#)
                .unwrap();
        assert_eq!(policy.unknown_category, UnknownCategoryPolicy::Error);
        assert_eq!(policy.unmapped_binary, UnmappedBinaryPolicy::Zero);
        assert_eq!(PreprocessPolicy::default().unknown_category, UnknownCategoryPolicy::Ignore);
    }
}
