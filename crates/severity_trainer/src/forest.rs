//! Random-forest training: bootstrap samples + randomized CART trees

use tracing::{debug, info};
use traffic_severity_core::forest::{Forest, SCALE};

use crate::cart::{CartBuilder, TreeConfig};
use crate::deterministic::{mix_seed, LcgRng};
use crate::errors::{Result, TrainerError};

/// Forest hyperparameters
#[derive(Clone, Debug)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub seed: i64,
    pub bootstrap: bool,
    pub tree: TreeConfig,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            seed: 42,
            bootstrap: true,
            tree: TreeConfig::default(),
        }
    }
}

/// A fitted forest with its feature importances
#[derive(Clone, Debug)]
pub struct TrainedForest {
    pub forest: Forest,
    /// Mean over trees of each tree's normalized Gini decrease, at `SCALE`
    pub importances: Vec<i64>,
}

/// Deterministic random-forest trainer
pub struct ForestTrainer {
    params: ForestParams,
}

impl ForestTrainer {
    pub fn new(params: ForestParams) -> Self {
        Self { params }
    }

    /// Fit on fixed-point `features` with class indices `labels`
    ///
    /// Tree `i` draws its bootstrap sample and feature orders from a
    /// generator seeded with `mix_seed(seed, i)`.
    pub fn train(
        &self,
        features: &[Vec<i64>],
        labels: &[usize],
        n_classes: usize,
    ) -> Result<TrainedForest> {
        if self.params.n_estimators == 0 {
            return Err(TrainerError::Training("n_estimators must be at least 1".into()));
        }
        if features.is_empty() {
            return Err(TrainerError::Training("no training rows".into()));
        }

        let builder = CartBuilder::new(features, labels, n_classes, self.params.tree.clone())?;
        let n_features = builder.n_features();
        let n = features.len();

        info!(
            trees = self.params.n_estimators,
            rows = n,
            features = n_features,
            classes = n_classes,
            max_features = self.params.tree.max_features,
            "training random forest"
        );

        let mut trees = Vec::with_capacity(self.params.n_estimators);
        let mut importance_sum = vec![0i64; n_features];

        for tree_idx in 0..self.params.n_estimators {
            let mut rng = LcgRng::new(mix_seed(self.params.seed, tree_idx));

            let samples: Vec<usize> = if self.params.bootstrap {
                (0..n).map(|_| rng.next_index(n)).collect()
            } else {
                (0..n).collect()
            };

            let grown = builder.build(&samples, &mut rng)?;
            for (acc, share) in importance_sum.iter_mut().zip(normalize(&grown.importances)) {
                *acc += share;
            }

            debug!(
                tree = tree_idx,
                nodes = grown.tree.nodes.len(),
                depth = grown.tree.depth(),
                leaves = grown.tree.leaf_count(),
                "tree grown"
            );
            trees.push(grown.tree);
        }

        let n_trees = trees.len() as i64;
        let importances = normalize(
            &importance_sum
                .into_iter()
                .map(|total| total / n_trees)
                .collect::<Vec<_>>(),
        );

        let forest = Forest::new(trees, n_classes, n_features);
        forest.validate().map_err(TrainerError::Training)?;

        info!(trees = forest.num_trees(), "random forest trained");
        Ok(TrainedForest {
            forest,
            importances,
        })
    }
}

/// Scale non-negative weights to sum to `SCALE`; all-zero stays all-zero
fn normalize(weights: &[i64]) -> Vec<i64> {
    let total: i128 = weights.iter().map(|&w| w.max(0) as i128).sum();
    if total == 0 {
        return vec![0; weights.len()];
    }
    weights
        .iter()
        .map(|&w| (w.max(0) as i128 * SCALE as i128 / total) as i64)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use traffic_severity_core::{argmax, Classifier};

    fn dataset() -> (Vec<Vec<i64>>, Vec<usize>) {
        let features: Vec<Vec<i64>> = (0..60)
            .map(|i| vec![(i % 10) * SCALE, (i * 7 % 13) * SCALE, (i % 2) * SCALE])
            .collect();
        let labels = (0..60).map(|i| usize::from(i % 10 >= 6)).collect();
        (features, labels)
    }

    fn params(n_estimators: usize, seed: i64) -> ForestParams {
        ForestParams {
            n_estimators,
            seed,
            bootstrap: true,
            tree: TreeConfig {
                max_features: 2,
                ..TreeConfig::default()
            },
        }
    }

    #[test]
    fn test_training_is_deterministic() {
        let (features, labels) = dataset();
        let a = ForestTrainer::new(params(10, 42)).train(&features, &labels, 2).unwrap();
        let b = ForestTrainer::new(params(10, 42)).train(&features, &labels, 2).unwrap();
        assert_eq!(a.forest, b.forest);
        assert_eq!(a.importances, b.importances);

        let c = ForestTrainer::new(params(10, 7)).train(&features, &labels, 2).unwrap();
        assert_ne!(a.forest, c.forest);
    }

    #[test]
    fn test_forest_learns_the_signal() {
        let (features, labels) = dataset();
        let trained = ForestTrainer::new(params(15, 42)).train(&features, &labels, 2).unwrap();
        assert_eq!(trained.forest.num_trees(), 15);

        // Rows 52 and 7 of the training set
        assert_eq!(trained.forest.predict(&[2 * SCALE, 0, 0]), 0);
        assert_eq!(trained.forest.predict(&[7 * SCALE, 10 * SCALE, SCALE]), 1);

        // Feature 0 carries the label
        assert_eq!(argmax(&trained.importances), 0);
        let total: i64 = trained.importances.iter().sum();
        assert!((SCALE - 3..=SCALE).contains(&total));
    }

    #[test]
    fn test_without_bootstrap_trees_see_every_row() {
        let (features, labels) = dataset();
        let params = ForestParams {
            bootstrap: false,
            ..params(3, 42)
        };
        let trained = ForestTrainer::new(params).train(&features, &labels, 2).unwrap();
        for tree in &trained.forest.trees {
            let total: u32 = tree
                .nodes
                .iter()
                .filter_map(|n| n.leaf.as_ref())
                .flatten()
                .sum();
            assert_eq!(total, 60);
        }
    }

    #[test]
    fn test_zero_trees_rejected() {
        let (features, labels) = dataset();
        assert!(ForestTrainer::new(params(0, 42)).train(&features, &labels, 2).is_err());
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(&[1, 3]), vec![250_000, 750_000]);
        assert_eq!(normalize(&[0, 0]), vec![0, 0]);
    }
}
