//! Class label set and display names

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Ordered set of class labels
///
/// Classes are the distinct raw label strings of the training data, sorted.
/// The position of a class is the index the forest predicts. `names` maps a
/// raw class to the name shown to users (e.g. `"2" -> "High"`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LabelSet {
    pub classes: Vec<String>,
    #[serde(default)]
    pub names: BTreeMap<String, String>,
}

impl LabelSet {
    pub fn from_labels<'a>(
        labels: impl IntoIterator<Item = &'a str>,
        names: BTreeMap<String, String>,
    ) -> Self {
        let classes: BTreeSet<&str> = labels.into_iter().collect();
        Self {
            classes: classes.into_iter().map(str::to_string).collect(),
            names,
        }
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn index_of(&self, class: &str) -> Option<usize> {
        self.classes.binary_search_by(|c| c.as_str().cmp(class)).ok()
    }

    pub fn class(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }

    /// Display name of a class, falling back to the raw label
    ///
    /// Name keys match exactly first, then ignoring ASCII case.
    pub fn display_name(&self, index: usize) -> Option<&str> {
        let class = self.class(index)?;
        let name = self.names.get(class).or_else(|| {
            self.names
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(class))
                .map(|(_, name)| name)
        });
        Some(name.map(String::as_str).unwrap_or(class))
    }

    /// Map raw labels to class indices
    pub fn encode<'a>(&self, labels: impl IntoIterator<Item = &'a str>) -> Option<Vec<usize>> {
        labels.into_iter().map(|l| self.index_of(l)).collect()
    }
}
