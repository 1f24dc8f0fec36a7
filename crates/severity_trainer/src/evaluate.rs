//! Held-out evaluation

use serde::Serialize;
use traffic_severity_core::forest::{Classifier, SCALE};

/// Accuracy and confusion matrix over a labelled set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    pub samples: usize,
    pub correct: usize,
    /// `confusion[actual][predicted]`
    pub confusion: Vec<Vec<usize>>,
}

impl Evaluation {
    /// Score `classifier` on fixed-point `features` against class indices
    pub fn compute<C: Classifier>(
        classifier: &C,
        features: &[Vec<i64>],
        labels: &[usize],
        n_classes: usize,
    ) -> Self {
        let mut confusion = vec![vec![0usize; n_classes]; n_classes];
        let mut correct = 0;

        for (row, &actual) in features.iter().zip(labels) {
            let predicted = classifier.predict(row);
            if predicted == actual {
                correct += 1;
            }
            if let Some(cell) = confusion.get_mut(actual).and_then(|r| r.get_mut(predicted)) {
                *cell += 1;
            }
        }

        Self {
            samples: features.len().min(labels.len()),
            correct,
            confusion,
        }
    }

    /// Accuracy at `SCALE`; `None` for an empty set
    pub fn accuracy(&self) -> Option<i64> {
        if self.samples == 0 {
            return None;
        }
        Some((self.correct as i128 * SCALE as i128 / self.samples as i128) as i64)
    }

    /// Recall of each class at `SCALE`; `None` where the class has no samples
    pub fn per_class_recall(&self) -> Vec<Option<i64>> {
        self.confusion
            .iter()
            .enumerate()
            .map(|(class, row)| {
                let total: usize = row.iter().sum();
                (total > 0).then(|| (row[class] as i128 * SCALE as i128 / total as i128) as i64)
            })
            .collect()
    }
}
