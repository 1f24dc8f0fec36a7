//! Training pipeline: labels -> split -> transform -> forest -> artifact

use std::collections::BTreeMap;
use tracing::{info, warn};

use traffic_severity_core::config::{MaxFeatures, SeverityConfig};
use traffic_severity_core::{
    ArtifactMetadata, FeatureSchema, FeatureTransform, LabelSet, PreprocessPolicy,
    TrainedArtifact,
};

use crate::cart::TreeConfig;
use crate::dataset::Dataset;
use crate::errors::{Result, TrainerError};
use crate::evaluate::Evaluation;
use crate::forest::{ForestParams, ForestTrainer};
use crate::split::{train_test_split, TrainTestSplit};

/// Everything the pipeline needs besides the data
#[derive(Clone, Debug)]
pub struct TrainingParams {
    pub schema: FeatureSchema,
    pub policy: PreprocessPolicy,
    /// Raw class label -> display name, embedded in the artifact
    pub label_names: BTreeMap<String, String>,
    pub test_fraction: f64,
    pub seed: i64,
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
}

impl TrainingParams {
    pub fn from_config(config: &SeverityConfig) -> Self {
        let training = &config.training;
        Self {
            schema: FeatureSchema::accident(config.dataset.label.clone()),
            policy: config.preprocess.into(),
            label_names: config.labels.names.clone(),
            test_fraction: training.test_fraction,
            seed: training.seed,
            n_estimators: training.n_estimators,
            max_depth: training.max_depth,
            min_samples_split: training.min_samples_split,
            min_samples_leaf: training.min_samples_leaf,
            max_features: training.max_features,
            bootstrap: training.bootstrap,
        }
    }
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self::from_config(&SeverityConfig::default())
    }
}

/// Result of one training run
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub artifact: TrainedArtifact,
    pub evaluation: Evaluation,
    pub split: TrainTestSplit,
}

impl TrainingOutcome {
    /// The `k` most important output features, highest first
    pub fn top_features(&self, k: usize) -> Vec<(&str, i64)> {
        let metadata = &self.artifact.metadata;
        let mut ranked: Vec<(&str, i64)> = metadata
            .feature_names
            .iter()
            .map(String::as_str)
            .zip(metadata.feature_importances.iter().copied())
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(k);
        ranked
    }
}

/// Random-forest severity trainer
pub struct SeverityTrainer {
    params: TrainingParams,
}

impl SeverityTrainer {
    pub fn new(params: TrainingParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &TrainingParams {
        &self.params
    }

    /// Train and package an artifact
    ///
    /// The transform is fitted on the training partition only; the held-out
    /// partition is used for the accuracy recorded in the metadata.
    pub fn train(&self, dataset: &Dataset) -> Result<TrainingOutcome> {
        let params = &self.params;
        if dataset.is_empty() {
            return Err(TrainerError::Training("dataset has no rows".into()));
        }

        let labels = LabelSet::from_labels(
            dataset.labels.iter().map(String::as_str),
            params.label_names.clone(),
        );
        for raw in params.label_names.keys() {
            if labels.index_of(raw).is_none() {
                warn!(label = %raw, "configured label name matches no class in the data");
            }
        }
        let targets = labels
            .encode(dataset.labels.iter().map(String::as_str))
            .ok_or_else(|| TrainerError::Training("label outside the fitted label set".into()))?;
        info!(classes = ?labels.classes, "label set");

        let split = train_test_split(&targets, &labels, params.test_fraction, params.seed)?;
        info!(
            train = split.train.len(),
            test = split.test.len(),
            seed = params.seed,
            "train/test split"
        );

        let (train_rows, _) = dataset.select(&split.train);
        let (test_rows, _) = dataset.select(&split.test);
        let train_targets: Vec<usize> = split.train.iter().map(|&i| targets[i]).collect();
        let test_targets: Vec<usize> = split.test.iter().map(|&i| targets[i]).collect();

        let transform = FeatureTransform::fit(&params.schema, &train_rows, params.policy)?;
        let train_features = transform.transform(&train_rows)?;
        info!(
            inputs = transform.input_columns().count(),
            width = transform.width(),
            "feature transform fitted"
        );

        let tree = TreeConfig {
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split,
            min_samples_leaf: params.min_samples_leaf,
            max_features: params.max_features.resolve(transform.width()),
        };
        let trained = ForestTrainer::new(ForestParams {
            n_estimators: params.n_estimators,
            seed: params.seed,
            bootstrap: params.bootstrap,
            tree,
        })
        .train(&train_features, &train_targets, labels.len())?;

        let test_features = transform.transform(&test_rows)?;
        let evaluation =
            Evaluation::compute(&trained.forest, &test_features, &test_targets, labels.len());

        let metadata = ArtifactMetadata {
            created_at: chrono::Utc::now().timestamp().max(0) as u64,
            model_hash: String::new(),
            training_data_hash: dataset.data_hash.clone(),
            training_rows: split.train.len(),
            holdout_rows: split.test.len(),
            dropped_rows: dataset.dropped_rows,
            holdout_accuracy: evaluation.accuracy(),
            feature_names: transform.feature_names(),
            feature_importances: trained.importances,
        };

        let artifact = TrainedArtifact::new(transform, trained.forest, labels, metadata)?;
        info!(model_hash = %artifact.metadata.model_hash, "artifact assembled");

        Ok(TrainingOutcome {
            artifact,
            evaluation,
            split,
        })
    }
}
