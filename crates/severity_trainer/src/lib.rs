//! Accident severity trainer: deterministic offline random-forest training
//!
//! Reads the accident CSV, fits the feature transform and a forest of Gini
//! CART trees, and packages both into a `TrainedArtifact`. A fixed seed and
//! dataset always produce the same split, the same trees and the same
//! model hash.

pub mod cart;
pub mod dataset;
pub mod deterministic;
pub mod errors;
pub mod evaluate;
pub mod forest;
pub mod split;
pub mod trainer;

use std::path::Path;

pub use dataset::Dataset;
pub use deterministic::{LcgRng, SplitTieBreaker};
pub use errors::{DatasetError, TrainerError};
pub use evaluate::Evaluation;
pub use forest::{ForestParams, ForestTrainer};
pub use split::{train_test_split, TrainTestSplit};
pub use trainer::{SeverityTrainer, TrainingOutcome, TrainingParams};

/// Load `path` and train with `params`
pub fn train_from_csv(path: &Path, params: TrainingParams) -> Result<TrainingOutcome, TrainerError> {
    let dataset = Dataset::from_csv(path, &params.schema)?;
    SeverityTrainer::new(params).train(&dataset)
}

/// Train from `csv` and write the artifact to `output`; returns the outcome and file hash
pub fn train_artifact_from_csv(
    csv: &Path,
    output: &Path,
    params: TrainingParams,
) -> Result<(TrainingOutcome, String), TrainerError> {
    let outcome = train_from_csv(csv, params)?;
    let file_hash = outcome.artifact.save(output)?;
    Ok((outcome, file_hash))
}
