//! Single-row inference over a trained artifact

use serde::Serialize;
use std::path::Path;

use crate::artifact::TrainedArtifact;
use crate::errors::{Result, SeverityError};
use crate::forest::{argmax, Classifier, SCALE};
use crate::labels::LabelSet;
use crate::preprocess::FeatureTransform;
use crate::schema::FeatureRow;

/// Outcome of one prediction
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Prediction {
    /// Predicted class index
    pub class_index: usize,
    /// Raw class label as it appeared in the training data
    pub class: String,
    /// Display name for the class
    pub label: String,
    /// Probability of the predicted class at `SCALE`
    pub confidence: i64,
    /// Per-class probabilities at `SCALE`, when the classifier provides them
    pub probabilities: Option<Vec<i64>>,
}

impl Prediction {
    /// Confidence as a percentage in [0, 100]
    pub fn confidence_percent(&self) -> f64 {
        self.confidence as f64 * 100.0 / SCALE as f64
    }
}

/// Applies a frozen transform and classifier to feature rows
pub struct Predictor<C = crate::forest::Forest> {
    transform: FeatureTransform,
    classifier: C,
    labels: LabelSet,
}

impl Predictor {
    /// Load an artifact from disk
    pub fn from_path<P: AsRef<Path>>(path: P, verify_hash: bool) -> Result<Self> {
        Ok(Self::from_artifact(TrainedArtifact::load(path, verify_hash)?))
    }

    pub fn from_artifact(artifact: TrainedArtifact) -> Self {
        Self::new(artifact.transform, artifact.model, artifact.labels)
    }
}

impl<C: Classifier> Predictor<C> {
    pub fn new(transform: FeatureTransform, classifier: C, labels: LabelSet) -> Self {
        Self {
            transform,
            classifier,
            labels,
        }
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn transform(&self) -> &FeatureTransform {
        &self.transform
    }

    /// Predict one row
    ///
    /// Confidence is the probability of the predicted class; a classifier
    /// without probability output reports full confidence.
    pub fn predict(&self, row: &FeatureRow) -> Result<Prediction> {
        let features = self.transform.transform_row(row)?;
        let probabilities = self.classifier.predict_proba(&features);

        let (class_index, confidence) = match &probabilities {
            Some(proba) => {
                let idx = argmax(proba);
                (idx, proba.get(idx).copied().unwrap_or(0).clamp(0, SCALE))
            }
            None => (self.classifier.predict(&features), SCALE),
        };

        let unknown = || SeverityError::UnknownClass {
            index: class_index,
            classes: self.labels.len(),
        };
        let class = self.labels.class(class_index).ok_or_else(unknown)?;
        let label = self.labels.display_name(class_index).ok_or_else(unknown)?;

        tracing::debug!(class, confidence, "prediction");

        Ok(Prediction {
            class_index,
            class: class.to_string(),
            label: label.to_string(),
            confidence,
            probabilities,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forest::{ClassificationTree, Forest, Node};
    use crate::preprocess::PreprocessPolicy;
    use crate::schema::FeatureSchema;
    use std::collections::BTreeMap;

    fn transform() -> FeatureTransform {
        let schema = FeatureSchema {
            categorical: vec!["Weather".into()],
            numeric: vec!["Speed_Limit".into()],
            binary: vec![],
            label: "Accident".into(),
        };
        let rows = vec![
            FeatureRow::new().with("Weather", "Clear").with("Speed_Limit", 50),
            FeatureRow::new().with("Weather", "Rain").with("Speed_Limit", 90),
        ];
        FeatureTransform::fit(&schema, &rows, PreprocessPolicy::default()).unwrap()
    }

    fn labels() -> LabelSet {
        let names = BTreeMap::from([("0".to_string(), "Low".to_string()), ("1".to_string(), "High".to_string())]);
        LabelSet::from_labels(["0", "1"], names)
    }

    fn forest() -> Forest {
        // Split on Speed_Limit (slot 2)
        let tree = ClassificationTree::new(
            vec![
                Node::internal(0, 2, 70 * SCALE, 1, 2),
                Node::leaf(1, vec![3, 1]),
                Node::leaf(2, vec![1, 9]),
            ],
            2,
        );
        Forest::new(vec![tree], 2, 3)
    }

    /// Classifier without probability output
    struct Majority(usize);

    impl Classifier for Majority {
        fn n_classes(&self) -> usize {
            2
        }

        fn predict_proba(&self, _features: &[i64]) -> Option<Vec<i64>> {
            None
        }

        fn predict(&self, _features: &[i64]) -> usize {
            self.0
        }
    }

    #[test]
    fn test_prediction_with_confidence() {
        let predictor = Predictor::new(transform(), forest(), labels());
        let row = FeatureRow::new().with("Weather", "Rain").with("Speed_Limit", 120);

        let prediction = predictor.predict(&row).unwrap();
        assert_eq!(prediction.class, "1");
        assert_eq!(prediction.label, "High");
        assert_eq!(prediction.confidence, 900_000);
        assert!((prediction.confidence_percent() - 90.0).abs() < 1e-9);
        assert_eq!(prediction.probabilities, Some(vec![100_000, 900_000]));
    }

    #[test]
    fn test_unknown_category_still_predicts() {
        let predictor = Predictor::new(transform(), forest(), labels());
        let row = FeatureRow::new().with("Weather", "Thunderstorm").with("Speed_Limit", 30);

        let prediction = predictor.predict(&row).unwrap();
        assert_eq!(prediction.label, "Low");
        assert_eq!(prediction.confidence, 750_000);
    }

    #[test]
    fn test_missing_probability_means_full_confidence() {
        let predictor = Predictor::new(transform(), Majority(1), labels());
        let row = FeatureRow::new().with("Weather", "Clear").with("Speed_Limit", 30);

        let prediction = predictor.predict(&row).unwrap();
        assert_eq!(prediction.label, "High");
        assert_eq!(prediction.confidence, SCALE);
        assert_eq!(prediction.probabilities, None);
        assert!((prediction.confidence_percent() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_class_outside_labels() {
        let predictor = Predictor::new(transform(), Majority(5), labels());
        let row = FeatureRow::new().with("Weather", "Clear").with("Speed_Limit", 30);
        assert!(matches!(
            predictor.predict(&row),
            Err(SeverityError::UnknownClass { index: 5, classes: 2 })
        ));
    }

    #[test]
    fn test_schema_drift_is_an_error() {
        let predictor = Predictor::new(transform(), forest(), labels());
        let row = FeatureRow::new().with("weather", "Clear").with("Speed_Limit", 30);
        assert!(matches!(predictor.predict(&row), Err(SeverityError::Preprocess(_))));
    }
}
