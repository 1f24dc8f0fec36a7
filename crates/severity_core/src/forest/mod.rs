//! Integer-only random-forest classifier
//!
//! - **Fixed-point inputs**: features are `i64` at [`SCALE`]
//! - **Integer traversal**: a sample goes left when `feature <= threshold`
//! - **Class counts at leaves**: probabilities are derived at inference as
//!   fixed-point fractions of [`SCALE`], averaged over trees
//!
//! # Usage
//!
//! ```rust
//! use traffic_severity_core::forest::{Classifier, ClassificationTree, Forest, Node, SCALE};
//!
//! let tree = ClassificationTree::new(
//!     vec![
//!         Node::internal(0, 0, SCALE / 2, 1, 2),
//!         Node::leaf(1, vec![3, 1]),
//!         Node::leaf(2, vec![0, 4]),
//!     ],
//!     2,
//! );
//! let forest = Forest::new(vec![tree], 2, 1);
//!
//! let proba = forest.predict_proba(&[SCALE]).unwrap();
//! assert_eq!(proba, vec![0, SCALE]);
//! assert_eq!(forest.predict(&[0]), 0);
//! ```

pub mod ensemble;
pub mod tree;

pub use ensemble::Forest;
pub use tree::{ClassificationTree, Node};

/// Fixed-point scale for features and probabilities (1e6)
pub const SCALE: i64 = 1_000_000;

/// A fitted classifier over fixed-point feature vectors
pub trait Classifier {
    /// Number of classes the classifier distinguishes
    fn n_classes(&self) -> usize;

    /// Per-class probabilities at `SCALE`, or `None` when the classifier
    /// has no probability output
    fn predict_proba(&self, features: &[i64]) -> Option<Vec<i64>>;

    /// Index of the predicted class
    fn predict(&self, features: &[i64]) -> usize {
        self.predict_proba(features)
            .map(|proba| argmax(&proba))
            .unwrap_or(0)
    }
}

/// Index of the largest value; the first one wins ties
pub fn argmax(values: &[i64]) -> usize {
    let mut best = 0;
    for (idx, value) in values.iter().enumerate() {
        if *value > values[best] {
            best = idx;
        }
    }
    best
}
