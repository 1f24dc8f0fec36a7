//! Forest of classification trees with averaged probabilities

use serde::{Deserialize, Serialize};

use super::{ClassificationTree, Classifier};

/// Random-forest classifier
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Forest {
    /// Model format version (always 1 for now)
    pub version: i32,

    /// Number of classes every tree predicts over
    pub n_classes: usize,

    /// Expected input width
    pub n_features: usize,

    /// Trees in the ensemble
    pub trees: Vec<ClassificationTree>,
}

impl Forest {
    pub fn new(trees: Vec<ClassificationTree>, n_classes: usize, n_features: usize) -> Self {
        Self {
            version: 1,
            n_classes,
            n_features,
            trees,
        }
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Validate forest structure
    pub fn validate(&self) -> Result<(), String> {
        if self.version != 1 {
            return Err(format!("Unsupported forest version: {}", self.version));
        }
        if self.n_classes == 0 {
            return Err("Forest has no classes".to_string());
        }
        if self.trees.is_empty() {
            return Err("Forest has no trees".to_string());
        }

        for (i, tree) in self.trees.iter().enumerate() {
            if tree.n_classes != self.n_classes {
                return Err(format!(
                    "Tree {i} predicts {} classes, forest has {}",
                    tree.n_classes, self.n_classes
                ));
            }
            tree.validate(self.n_features)
                .map_err(|e| format!("Tree {i} validation failed: {e}"))?;
        }

        Ok(())
    }
}

impl Classifier for Forest {
    fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Mean of the per-tree probabilities; trees that cannot score the
    /// input are skipped
    fn predict_proba(&self, features: &[i64]) -> Option<Vec<i64>> {
        let mut sum = vec![0i64; self.n_classes];
        let mut voters = 0i64;

        for tree in &self.trees {
            if let Some(proba) = tree.predict_proba(features) {
                for (acc, p) in sum.iter_mut().zip(proba) {
                    *acc = acc.saturating_add(p);
                }
                voters += 1;
            }
        }

        if voters == 0 {
            return None;
        }
        Some(sum.into_iter().map(|s| s / voters).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forest::{Node, SCALE};

    fn create_test_forest() -> Forest {
        let tree1 = ClassificationTree::new(
            vec![
                Node::internal(0, 0, 50 * SCALE, 1, 2),
                Node::leaf(1, vec![4, 0, 0]),
                Node::leaf(2, vec![0, 2, 2]),
            ],
            3,
        );
        let tree2 = ClassificationTree::new(
            vec![
                Node::internal(0, 1, 30 * SCALE, 1, 2),
                Node::leaf(1, vec![2, 2, 0]),
                Node::leaf(2, vec![0, 0, 1]),
            ],
            3,
        );
        Forest::new(vec![tree1, tree2], 3, 2)
    }

    #[test]
    fn test_forest_creation() {
        let forest = create_test_forest();
        assert_eq!(forest.num_trees(), 2);
        assert!(forest.validate().is_ok());
    }

    #[test]
    fn test_averaged_probabilities() {
        let forest = create_test_forest();

        // tree1 -> [1, 0, 0], tree2 -> [0.5, 0.5, 0]
        let proba = forest.predict_proba(&[30 * SCALE, 20 * SCALE]).unwrap();
        assert_eq!(proba, vec![750_000, 250_000, 0]);
        assert_eq!(forest.predict(&[30 * SCALE, 20 * SCALE]), 0);

        // tree1 -> [0, 0.5, 0.5], tree2 -> [0, 0, 1]
        let proba = forest.predict_proba(&[60 * SCALE, 40 * SCALE]).unwrap();
        assert_eq!(proba, vec![0, 250_000, 750_000]);
        assert_eq!(forest.predict(&[60 * SCALE, 40 * SCALE]), 2);
    }

    #[test]
    fn test_deterministic_inference_repeated() {
        let forest = create_test_forest();
        let features = vec![45 * SCALE, 35 * SCALE];
        let first = forest.predict_proba(&features);
        assert!((0..100).all(|_| forest.predict_proba(&features) == first));
    }

    #[test]
    fn test_forest_validation() {
        let mut invalid = create_test_forest();
        invalid.version = 999;
        assert!(invalid.validate().is_err());

        let mut mismatched = create_test_forest();
        mismatched.n_classes = 2;
        assert!(mismatched.validate().is_err());

        let mut narrow = create_test_forest();
        narrow.n_features = 1;
        assert!(narrow.validate().is_err());

        assert!(Forest::new(vec![], 3, 2).validate().is_err());
    }

    #[test]
    fn test_json_roundtrip() {
        let original = create_test_forest();
        let json = serde_json::to_string(&original).unwrap();
        let restored: Forest = serde_json::from_str(&json).unwrap();
        assert_eq!(original, restored);
    }
}
