//! CART classification tree builder
//!
//! Exact-greedy Gini splits over fixed-point features. Every split candidate
//! is a midpoint between two adjacent distinct values, and all impurity
//! arithmetic is integer at `SCALE`, so a given sample set and RNG state
//! always grow the same tree.

use traffic_severity_core::forest::{ClassificationTree, Node, SCALE};

use crate::deterministic::{LcgRng, SplitTieBreaker};
use crate::errors::{Result, TrainerError};

/// Growth limits for a single tree
#[derive(Clone, Debug)]
pub struct TreeConfig {
    /// `None` grows until leaves are pure or too small to split
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Non-constant features examined per split before settling
    pub max_features: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: usize::MAX,
        }
    }
}

/// A grown tree with its per-feature impurity decrease
#[derive(Clone, Debug)]
pub struct GrownTree {
    pub tree: ClassificationTree,
    /// Weighted Gini decrease per feature at `SCALE`, not normalized
    pub importances: Vec<i64>,
}

/// Split candidate with gain and tie-breaker
#[derive(Debug, Clone)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: i64,
    gain: i64,
    tie_breaker: SplitTieBreaker,
}

impl SplitCandidate {
    fn new(feature_idx: usize, threshold: i64, gain: i64) -> Self {
        Self {
            feature_idx,
            threshold,
            gain,
            tie_breaker: SplitTieBreaker::new(feature_idx, threshold),
        }
    }

    fn beats(&self, other: &SplitCandidate) -> bool {
        self.gain > other.gain || (self.gain == other.gain && self.tie_breaker < other.tie_breaker)
    }
}

/// A subtree waiting to be grown, with the slot it fills in its parent
struct PendingNode {
    indices: Vec<usize>,
    depth: usize,
    parent: Option<(usize, bool)>,
}

/// Builds classification trees over a shared feature matrix
///
/// Nodes are emitted in pre-order, so every child index is greater than its
/// parent's.
pub struct CartBuilder<'a> {
    features: &'a [Vec<i64>],
    labels: &'a [usize],
    n_classes: usize,
    n_features: usize,
    config: TreeConfig,
}

impl<'a> CartBuilder<'a> {
    pub fn new(
        features: &'a [Vec<i64>],
        labels: &'a [usize],
        n_classes: usize,
        config: TreeConfig,
    ) -> Result<Self> {
        if features.len() != labels.len() {
            return Err(TrainerError::Training(format!(
                "{} feature rows for {} labels",
                features.len(),
                labels.len()
            )));
        }
        if n_classes == 0 {
            return Err(TrainerError::Training("no classes to learn".into()));
        }
        if let Some(label) = labels.iter().find(|&&l| l >= n_classes) {
            return Err(TrainerError::Training(format!(
                "label {label} outside {n_classes} classes"
            )));
        }

        let n_features = features.first().map(Vec::len).unwrap_or(0);
        if features.iter().any(|row| row.len() != n_features) {
            return Err(TrainerError::Training("feature rows differ in width".into()));
        }

        Ok(Self {
            features,
            labels,
            n_classes,
            n_features,
            config,
        })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Grow a tree on `samples` (row indices, repeats allowed)
    pub fn build(&self, samples: &[usize], rng: &mut LcgRng) -> Result<GrownTree> {
        if samples.is_empty() {
            return Err(TrainerError::Training("cannot grow a tree on zero samples".into()));
        }

        let mut nodes: Vec<Node> = Vec::new();
        let mut importances = vec![0i64; self.n_features];

        // Pending subtrees; the left child is pushed last so it is grown first
        let mut stack = vec![PendingNode {
            indices: samples.to_vec(),
            depth: 0,
            parent: None,
        }];

        while let Some(pending) = stack.pop() {
            let current_idx = nodes.len() as i32;
            if let Some((parent, is_left)) = pending.parent {
                let parent = &mut nodes[parent];
                if is_left {
                    parent.left = current_idx;
                } else {
                    parent.right = current_idx;
                }
            }

            let counts = self.class_counts(&pending.indices);
            let split = if self.is_terminal(&pending, &counts) {
                None
            } else {
                self.find_best_split(&pending.indices, &counts, rng)
            };

            let Some(split) = split else {
                nodes.push(Node::leaf(current_idx, counts));
                continue;
            };

            let (left, right): (Vec<usize>, Vec<usize>) = pending
                .indices
                .iter()
                .partition(|&&idx| self.features[idx][split.feature_idx] <= split.threshold);

            importances[split.feature_idx] =
                importances[split.feature_idx].saturating_add(split.gain);
            nodes.push(Node::internal(
                current_idx,
                split.feature_idx as i32,
                split.threshold,
                -1,
                -1,
            ));

            let parent = current_idx as usize;
            stack.push(PendingNode {
                indices: right,
                depth: pending.depth + 1,
                parent: Some((parent, false)),
            });
            stack.push(PendingNode {
                indices: left,
                depth: pending.depth + 1,
                parent: Some((parent, true)),
            });
        }

        Ok(GrownTree {
            tree: ClassificationTree::new(nodes, self.n_classes),
            importances,
        })
    }

    fn is_terminal(&self, pending: &PendingNode, counts: &[u32]) -> bool {
        let n = pending.indices.len();
        counts.iter().filter(|&&c| c > 0).count() <= 1
            || self.config.max_depth.is_some_and(|max| pending.depth >= max)
            || n < self.config.min_samples_split
            || n < 2 * self.config.min_samples_leaf
    }

    /// Best split over a random feature order
    ///
    /// Constant features are skipped without counting. Once `max_features`
    /// features have been examined the search stops, unless no valid split
    /// has been found yet.
    fn find_best_split(
        &self,
        indices: &[usize],
        parent_counts: &[u32],
        rng: &mut LcgRng,
    ) -> Option<SplitCandidate> {
        let mut order: Vec<usize> = (0..self.n_features).collect();
        rng.shuffle(&mut order);

        let parent_score = gini_score(parent_counts, indices.len());
        let mut best: Option<SplitCandidate> = None;
        let mut examined = 0;

        let mut column: Vec<(i64, usize)> = Vec::with_capacity(indices.len());
        for feature_idx in order {
            if examined >= self.config.max_features && best.is_some() {
                break;
            }

            column.clear();
            column.extend(
                indices
                    .iter()
                    .map(|&idx| (self.features[idx][feature_idx], self.labels[idx])),
            );
            column.sort_unstable();

            if column.first().map(|c| c.0) == column.last().map(|c| c.0) {
                continue;
            }
            examined += 1;

            if let Some(candidate) = self.best_threshold(feature_idx, &column, parent_counts, parent_score)
            {
                if best.as_ref().map_or(true, |b| candidate.beats(b)) {
                    best = Some(candidate);
                }
            }
        }

        best
    }

    /// Sweep sorted `(value, label)` pairs for the best threshold of one feature
    fn best_threshold(
        &self,
        feature_idx: usize,
        column: &[(i64, usize)],
        parent_counts: &[u32],
        parent_score: i64,
    ) -> Option<SplitCandidate> {
        let n = column.len();
        let min_leaf = self.config.min_samples_leaf;
        let mut left = vec![0u32; self.n_classes];
        let mut right = parent_counts.to_vec();
        let mut best: Option<SplitCandidate> = None;

        for i in 0..n - 1 {
            let (value, label) = column[i];
            left[label] += 1;
            right[label] -= 1;

            let next = column[i + 1].0;
            if value == next {
                continue;
            }
            let n_left = i + 1;
            if n_left < min_leaf || n - n_left < min_leaf {
                continue;
            }

            let threshold = value + (next - value) / 2;
            let gain = gini_score(&left, n_left) + gini_score(&right, n - n_left) - parent_score;
            let candidate = SplitCandidate::new(feature_idx, threshold, gain);
            if best.as_ref().map_or(true, |b| candidate.beats(b)) {
                best = Some(candidate);
            }
        }

        best
    }

    fn class_counts(&self, indices: &[usize]) -> Vec<u32> {
        let mut counts = vec![0u32; self.n_classes];
        for &idx in indices {
            counts[self.labels[idx]] += 1;
        }
        counts
    }
}

/// `sum(c^2) / n` at `SCALE`
///
/// Equals `n * (1 - gini)`, so the children's total minus the parent's is the
/// sample-weighted Gini decrease of a split.
pub fn gini_score(counts: &[u32], n: usize) -> i64 {
    if n == 0 {
        return 0;
    }
    let sum_sq: i128 = counts.iter().map(|&c| c as i128 * c as i128).sum();
    (sum_sq * SCALE as i128 / n as i128) as i64
}
