//! Column transform: one-hot categorical block followed by numeric passthrough

use serde::{Deserialize, Serialize};

use super::{normalize_binary, to_fixed, OneHotEncoder, PreprocessError, PreprocessPolicy};
use crate::schema::{FeatureRow, FeatureSchema, FeatureValue};

/// Fitted feature transform
///
/// Output layout is the one-hot slots of every categorical column (in schema
/// order) followed by one slot per numeric column. Columns not named here are
/// ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeatureTransform {
    pub categorical: OneHotEncoder,
    pub numeric: Vec<String>,
    pub binary: Vec<String>,
    pub policy: PreprocessPolicy,
}

impl FeatureTransform {
    /// Fit on training rows only; the vocabulary never sees held-out data
    pub fn fit(
        schema: &FeatureSchema,
        rows: &[FeatureRow],
        policy: PreprocessPolicy,
    ) -> Result<Self, PreprocessError> {
        let categorical = OneHotEncoder::fit(&schema.categorical, rows)?;
        let transform = Self {
            categorical,
            numeric: schema.numeric.clone(),
            binary: schema.binary.clone(),
            policy,
        };

        // Surface missing or malformed numeric columns at fit time as well.
        for row in rows {
            transform.numeric_values(row, &mut Vec::with_capacity(transform.numeric.len()))?;
        }

        Ok(transform)
    }

    /// Number of model inputs produced per row
    pub fn width(&self) -> usize {
        self.categorical.width() + self.numeric.len()
    }

    /// Input column names this transform reads
    pub fn input_columns(&self) -> impl Iterator<Item = &str> {
        self.categorical
            .columns
            .iter()
            .chain(self.numeric.iter())
            .map(String::as_str)
    }

    /// Name of every output slot
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = self.categorical.feature_names();
        names.extend(self.numeric.iter().cloned());
        names
    }

    /// Encode one row
    pub fn transform_row(&self, row: &FeatureRow) -> Result<Vec<i64>, PreprocessError> {
        let mut out = Vec::with_capacity(self.width());
        self.categorical
            .encode_into(row, self.policy.unknown_category, &mut out)?;
        self.numeric_values(row, &mut out)?;
        Ok(out)
    }

    /// Encode many rows, failing on the first bad one
    pub fn transform(&self, rows: &[FeatureRow]) -> Result<Vec<Vec<i64>>, PreprocessError> {
        rows.iter().map(|row| self.transform_row(row)).collect()
    }

    fn numeric_values(&self, row: &FeatureRow, out: &mut Vec<i64>) -> Result<(), PreprocessError> {
        for column in &self.numeric {
            let value = row
                .get(column)
                .ok_or_else(|| PreprocessError::MissingColumn(column.clone()))?;
            out.push(self.numeric_value(column, value)?);
        }
        Ok(())
    }

    fn numeric_value(&self, column: &str, value: &FeatureValue) -> Result<i64, PreprocessError> {
        match value {
            FeatureValue::Number(n) => to_fixed(column, *n),
            FeatureValue::Text(text) if self.binary.iter().any(|b| b == column) => {
                let bit = normalize_binary(column, text, self.policy.unmapped_binary)?;
                to_fixed(column, bit as f64)
            }
            FeatureValue::Text(text) => {
                let parsed: f64 =
                    text.trim()
                        .parse()
                        .map_err(|_| PreprocessError::InvalidNumber {
                            column: column.to_string(),
                            value: text.clone(),
                        })?;
                to_fixed(column, parsed)
            }
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        self.categorical.validate()?;
        if let Some(column) = self.binary.iter().find(|b| !self.numeric.contains(*b)) {
            return Err(format!("binary column '{column}' is not a numeric column"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forest::SCALE;
    use crate::preprocess::{UnknownCategoryPolicy, UnmappedBinaryPolicy};

    fn schema() -> FeatureSchema {
        FeatureSchema {
            categorical: vec!["Weather".into()],
            numeric: vec!["Driver_Age".into(), "Driver_Alcohol".into()],
            binary: vec!["Driver_Alcohol".into()],
            label: "Accident".into(),
        }
    }

    fn rows() -> Vec<FeatureRow> {
        vec![
            FeatureRow::new()
                .with("Weather", "Clear")
                .with("Driver_Age", 30)
                .with("Driver_Alcohol", 0),
            FeatureRow::new()
                .with("Weather", "Snow")
                .with("Driver_Age", 55)
                .with("Driver_Alcohol", 1),
        ]
    }

    #[test]
    fn test_layout() {
        let transform = FeatureTransform::fit(&schema(), &rows(), PreprocessPolicy::default()).unwrap();
        assert_eq!(transform.width(), 4);
        assert_eq!(
            transform.feature_names(),
            vec!["Weather=Clear", "Weather=Snow", "Driver_Age", "Driver_Alcohol"]
        );

        let encoded = transform.transform(&rows()).unwrap();
        assert_eq!(encoded[0], vec![SCALE, 0, 30 * SCALE, 0]);
        assert_eq!(encoded[1], vec![0, SCALE, 55 * SCALE, SCALE]);
    }

    #[test]
    fn test_binary_text_at_inference() {
        let transform = FeatureTransform::fit(&schema(), &rows(), PreprocessPolicy::default()).unwrap();
        let row = FeatureRow::new()
            .with("Weather", "Clear")
            .with("Driver_Age", "41")
            .with("Driver_Alcohol", "Yes");
        assert_eq!(
            transform.transform_row(&row).unwrap(),
            vec![SCALE, 0, 41 * SCALE, SCALE]
        );
    }

    #[test]
    fn test_extra_columns_ignored() {
        let transform = FeatureTransform::fit(&schema(), &rows(), PreprocessPolicy::default()).unwrap();
        let row = rows()[0].clone().with("Accident", "Rear-end");
        assert_eq!(transform.transform_row(&row).unwrap(), transform.transform_row(&rows()[0]).unwrap());
    }

    #[test]
    fn test_invalid_numeric_text() {
        let transform = FeatureTransform::fit(&schema(), &rows(), PreprocessPolicy::default()).unwrap();
        let row = rows()[0].clone().with("Driver_Age", "thirty");
        assert!(matches!(
            transform.transform_row(&row),
            Err(PreprocessError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_strict_policies() {
        let policy = PreprocessPolicy {
            unknown_category: UnknownCategoryPolicy::Error,
            unmapped_binary: UnmappedBinaryPolicy::Error,
        };
        let transform = FeatureTransform::fit(&schema(), &rows(), policy).unwrap();

        let unknown = rows()[0].clone().with("Weather", "Fog");
        assert!(matches!(
            transform.transform_row(&unknown),
            Err(PreprocessError::UnknownCategory { .. })
        ));

        let unmapped = rows()[0].clone().with("Driver_Alcohol", "sometimes");
        assert!(matches!(
            transform.transform_row(&unmapped),
            Err(PreprocessError::UnmappedBinary { .. })
        ));
    }

    #[test]
    fn test_fit_requires_all_columns() {
        let mut broken = rows();
        broken[1].remove("Driver_Age");
        assert_eq!(
            FeatureTransform::fit(&schema(), &broken, PreprocessPolicy::default()),
            Err(PreprocessError::MissingColumn("Driver_Age".into()))
        );
    }
}
