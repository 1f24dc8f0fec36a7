//! Deterministic, stratified train/test split

use tracing::debug;
use traffic_severity_core::LabelSet;

use crate::deterministic::LcgRng;
use crate::errors::{Result, TrainerError};

/// Row indices of the two partitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Split rows into train and test partitions
///
/// `labels` holds the class index of every row. The test partition gets
/// `ceil(test_fraction * n)` rows. With more than one class the split is
/// stratified: each class contributes in proportion to its size, every class
/// keeps at least one training row, and a class with a single member is an
/// error.
pub fn train_test_split(
    labels: &[usize],
    classes: &LabelSet,
    test_fraction: f64,
    seed: i64,
) -> Result<TrainTestSplit> {
    let n = labels.len();
    let n_test = (test_fraction * n as f64).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(TrainerError::Split(format!(
            "test_fraction {test_fraction} leaves {} train and {n_test} test rows out of {n}",
            n.saturating_sub(n_test)
        )));
    }
    let n_train = n - n_test;

    let mut rng = LcgRng::new(seed);
    let n_classes = classes.len();

    if n_classes <= 1 {
        let mut order: Vec<usize> = (0..n).collect();
        rng.shuffle(&mut order);
        let train = order.split_off(n_test);
        return Ok(TrainTestSplit { train, test: order });
    }

    let mut members: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
    for (row, &class) in labels.iter().enumerate() {
        let bucket = members.get_mut(class).ok_or_else(|| {
            TrainerError::Split(format!("row {row} has class index {class} outside {n_classes} classes"))
        })?;
        bucket.push(row);
    }

    if let Some((class, _)) = members.iter().enumerate().find(|(_, m)| m.len() < 2) {
        return Err(TrainerError::Split(format!(
            "class '{}' has fewer than 2 members",
            classes.class(class).unwrap_or("?")
        )));
    }
    if n_test < n_classes || n_train < n_classes {
        return Err(TrainerError::Split(format!(
            "{n_train} train and {n_test} test rows cannot cover {n_classes} classes"
        )));
    }

    let counts: Vec<usize> = members.iter().map(Vec::len).collect();
    let allocation = allocate_test_rows(&counts, n_test);
    debug!(?counts, ?allocation, "stratified test allocation");

    let mut train = Vec::with_capacity(n_train);
    let mut test = Vec::with_capacity(n_test);
    for (mut rows, take) in members.into_iter().zip(allocation) {
        rng.shuffle(&mut rows);
        test.extend_from_slice(&rows[..take]);
        train.extend_from_slice(&rows[take..]);
    }
    rng.shuffle(&mut train);
    rng.shuffle(&mut test);

    Ok(TrainTestSplit { train, test })
}

/// Test rows per class: proportional floor, remainder to the largest
/// fractional parts (lower class first on ties), at most `count - 1` each
fn allocate_test_rows(counts: &[usize], n_test: usize) -> Vec<usize> {
    let n: usize = counts.iter().sum();
    let mut allocation: Vec<usize> = counts.iter().map(|&c| c * n_test / n).collect();

    let mut order: Vec<usize> = (0..counts.len()).collect();
    order.sort_by_key(|&class| std::cmp::Reverse(counts[class] * n_test % n));

    let mut remaining = n_test - allocation.iter().sum::<usize>();
    for class in order.iter().cycle() {
        if remaining == 0 {
            break;
        }
        allocation[*class] += 1;
        remaining -= 1;
    }

    let mut excess = 0;
    for (take, &count) in allocation.iter_mut().zip(counts) {
        if *take >= count {
            excess += *take - (count - 1);
            *take = count - 1;
        }
    }
    while excess > 0 {
        let before = excess;
        for &class in &order {
            if excess > 0 && allocation[class] + 1 < counts[class] {
                allocation[class] += 1;
                excess -= 1;
            }
        }
        if excess == before {
            break;
        }
    }

    allocation
}
