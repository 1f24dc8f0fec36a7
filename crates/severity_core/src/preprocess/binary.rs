//! Yes/no normalization for binary columns such as `Driver_Alcohol`

use super::{PreprocessError, UnmappedBinaryPolicy};

const TRUTHY: [&str; 4] = ["yes", "y", "true", "1"];
const FALSY: [&str; 4] = ["no", "n", "false", "0"];

/// Look up trimmed, lowercased text in the yes/no dictionary
pub fn parse_binary(raw: &str) -> Option<i64> {
    let key = raw.trim().to_lowercase();
    if TRUTHY.contains(&key.as_str()) {
        Some(1)
    } else if FALSY.contains(&key.as_str()) {
        Some(0)
    } else {
        None
    }
}

/// Normalize text to 0/1, applying `policy` to values outside the dictionary
pub fn normalize_binary(
    column: &str,
    raw: &str,
    policy: UnmappedBinaryPolicy,
) -> Result<i64, PreprocessError> {
    match (parse_binary(raw), policy) {
        (Some(value), _) => Ok(value),
        (None, UnmappedBinaryPolicy::Zero) => {
            tracing::debug!(column, value = raw, "unmapped binary value treated as 0");
            Ok(0)
        }
        (None, UnmappedBinaryPolicy::Error) => Err(PreprocessError::UnmappedBinary {
            column: column.to_string(),
            value: raw.to_string(),
        }),
    }
}
