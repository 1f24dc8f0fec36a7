use std::path::PathBuf;
use thiserror::Error;
use traffic_severity_core::{ArtifactError, PreprocessError};

/// Errors raised while reading the training CSV
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("dataset not found at {}", .0.display())]
    NotFound(PathBuf),

    #[error("label column '{0}' not found in CSV header")]
    MissingLabel(String),

    #[error("feature column '{0}' not found in CSV header")]
    MissingColumn(String),

    #[error("line {line}, column '{column}': '{value}' is not a number")]
    InvalidNumber {
        line: u64,
        column: String,
        value: String,
    },

    #[error("no rows left after dropping incomplete records")]
    Empty,

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors returned by the trainer
#[derive(Debug, Error)]
pub enum TrainerError {
    #[error("dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("preprocessing error: {0}")]
    Preprocess(#[from] PreprocessError),

    #[error("artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("cannot split dataset: {0}")]
    Split(String),

    #[error("training error: {0}")]
    Training(String),
}

pub type Result<T> = std::result::Result<T, TrainerError>;
