//! One-hot encoder with categories frozen at fit time

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{PreprocessError, UnknownCategoryPolicy};
use crate::forest::SCALE;
use crate::schema::{FeatureRow, FeatureValue};

/// One-hot encoder over a fixed list of columns
///
/// Categories are stored sorted per column; a value occupies the slot at its
/// position in that list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OneHotEncoder {
    pub columns: Vec<String>,
    pub categories: Vec<Vec<String>>,
}

/// Category key for a raw value; whole numbers render without a fraction
pub fn category_key(value: &FeatureValue) -> String {
    match value {
        FeatureValue::Text(text) => text.clone(),
        FeatureValue::Number(n) if n.is_finite() && n.fract() == 0.0 => format!("{}", *n as i64),
        FeatureValue::Number(n) => n.to_string(),
    }
}

impl OneHotEncoder {
    /// Learn the category vocabulary of each column from `rows`
    pub fn fit(columns: &[String], rows: &[FeatureRow]) -> Result<Self, PreprocessError> {
        if rows.is_empty() {
            return Err(PreprocessError::NoRows);
        }

        let mut seen: Vec<BTreeSet<String>> = vec![BTreeSet::new(); columns.len()];
        for row in rows {
            for (column, set) in columns.iter().zip(seen.iter_mut()) {
                let value = row
                    .get(column)
                    .ok_or_else(|| PreprocessError::MissingColumn(column.clone()))?;
                set.insert(category_key(value));
            }
        }

        Ok(Self {
            columns: columns.to_vec(),
            categories: seen.into_iter().map(|s| s.into_iter().collect()).collect(),
        })
    }

    /// Number of output slots
    pub fn width(&self) -> usize {
        self.categories.iter().map(Vec::len).sum()
    }

    /// Append the encoding of `row` to `out`
    pub fn encode_into(
        &self,
        row: &FeatureRow,
        policy: UnknownCategoryPolicy,
        out: &mut Vec<i64>,
    ) -> Result<(), PreprocessError> {
        for (column, categories) in self.columns.iter().zip(&self.categories) {
            let value = row
                .get(column)
                .ok_or_else(|| PreprocessError::MissingColumn(column.clone()))?;
            let key = category_key(value);

            let start = out.len();
            out.resize(start + categories.len(), 0);

            match categories.binary_search(&key) {
                Ok(slot) => out[start + slot] = SCALE,
                Err(_) => match policy {
                    UnknownCategoryPolicy::Ignore => {
                        tracing::debug!(column = %column, value = %key, "unknown category encoded as zeros");
                    }
                    UnknownCategoryPolicy::Error => {
                        return Err(PreprocessError::UnknownCategory {
                            column: column.clone(),
                            value: key,
                        });
                    }
                },
            }
        }
        Ok(())
    }

    /// Output slot names as `column=category`
    pub fn feature_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .zip(&self.categories)
            .flat_map(|(column, categories)| {
                categories.iter().map(move |c| format!("{column}={c}"))
            })
            .collect()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.columns.len() != self.categories.len() {
            return Err(format!(
                "{} columns but {} category lists",
                self.columns.len(),
                self.categories.len()
            ));
        }
        for (column, categories) in self.columns.iter().zip(&self.categories) {
            if categories.windows(2).any(|w| w[0] >= w[1]) {
                return Err(format!("categories of '{column}' are not sorted and unique"));
            }
        }
        Ok(())
    }
}
