//! Classification tree structures
//!
//! Nodes are stored in pre-order: node 0 is the root and every child index
//! is greater than its parent's, so traversal always terminates.

use serde::{Deserialize, Serialize};

use super::{Classifier, SCALE};

/// A decision tree node (internal or leaf)
///
/// For internal nodes `feature_idx >= 0`, `left`/`right` index child nodes and
/// `leaf` is `None`. Leaf nodes have `feature_idx == -1` and carry the class
/// counts of the training samples that reached them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Node {
    /// Node ID (for reference, not used in traversal)
    pub id: i32,

    /// Left child index (-1 for leaf nodes)
    pub left: i32,

    /// Right child index (-1 for leaf nodes)
    pub right: i32,

    /// Feature index to split on (-1 for leaf nodes)
    pub feature_idx: i32,

    /// Split threshold (fixed-point integer)
    pub threshold: i64,

    /// Per-class sample counts (leaf nodes only)
    pub leaf: Option<Vec<u32>>,
}

impl Node {
    /// Create a new internal (split) node
    pub fn internal(id: i32, feature_idx: i32, threshold: i64, left: i32, right: i32) -> Self {
        Self {
            id,
            left,
            right,
            feature_idx,
            threshold,
            leaf: None,
        }
    }

    /// Create a new leaf node
    pub fn leaf(id: i32, counts: Vec<u32>) -> Self {
        Self {
            id,
            left: -1,
            right: -1,
            feature_idx: -1,
            threshold: 0,
            leaf: Some(counts),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.feature_idx == -1 || self.leaf.is_some()
    }
}

/// A single classification tree
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ClassificationTree {
    /// Tree nodes (node 0 is the root)
    pub nodes: Vec<Node>,

    /// Length of every leaf count vector
    pub n_classes: usize,
}

impl ClassificationTree {
    pub fn new(nodes: Vec<Node>, n_classes: usize) -> Self {
        Self { nodes, n_classes }
    }

    /// Class counts of the leaf `features` falls into
    pub fn leaf_counts(&self, features: &[i64]) -> Option<&[u32]> {
        let mut idx = 0usize;

        loop {
            let node = self.nodes.get(idx)?;

            if node.is_leaf() {
                return node.leaf.as_deref();
            }

            let feature_value = *features.get(node.feature_idx as usize)?;
            let next = if feature_value <= node.threshold {
                node.left
            } else {
                node.right
            };

            if next as usize <= idx {
                return None;
            }
            idx = next as usize;
        }
    }

    /// Number of nodes on the longest root-to-leaf path, minus one
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((idx, depth)) = stack.pop() {
            match self.nodes.get(idx) {
                Some(node) if !node.is_leaf() => {
                    // Children always come after their parent
                    for child in [node.left, node.right] {
                        if child >= 0 && child as usize > idx {
                            stack.push((child as usize, depth + 1));
                        }
                    }
                }
                _ => deepest = deepest.max(depth),
            }
        }
        deepest
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Validate tree structure against the expected input width
    pub fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("Tree has no nodes".to_string());
        }

        for (i, node) in self.nodes.iter().enumerate() {
            if node.is_leaf() {
                let counts = node
                    .leaf
                    .as_ref()
                    .ok_or_else(|| format!("Leaf node {i} has no class counts"))?;
                if counts.len() != self.n_classes {
                    return Err(format!(
                        "Leaf node {i} has {} class counts, expected {}",
                        counts.len(),
                        self.n_classes
                    ));
                }
                if counts.iter().all(|&c| c == 0) {
                    return Err(format!("Leaf node {i} is empty"));
                }
                continue;
            }

            for (side, child) in [("left", node.left), ("right", node.right)] {
                if child <= i as i32 || child as usize >= self.nodes.len() {
                    return Err(format!("Node {i} has invalid {side} child: {child}"));
                }
            }

            if node.feature_idx < 0 || node.feature_idx as usize >= n_features {
                return Err(format!(
                    "Internal node {i} has invalid feature index: {}",
                    node.feature_idx
                ));
            }
        }

        Ok(())
    }
}

impl Classifier for ClassificationTree {
    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn predict_proba(&self, features: &[i64]) -> Option<Vec<i64>> {
        let counts = self.leaf_counts(features)?;
        let total: i64 = counts.iter().map(|&c| c as i64).sum();
        if total == 0 {
            return None;
        }
        Some(
            counts
                .iter()
                .map(|&c| ((c as i128 * SCALE as i128) / total as i128) as i64)
                .collect(),
        )
    }
}
