//! Error types for the severity core

use thiserror::Error;

use crate::artifact::ArtifactError;
use crate::config::ConfigError;
use crate::preprocess::PreprocessError;
use crate::serde_canon::CanonicalError;

/// Errors that can occur anywhere in the severity core
#[derive(Error, Debug)]
pub enum SeverityError {
    /// Feature row could not be turned into a model input
    #[error("Preprocessing failed: {0}")]
    Preprocess(#[from] PreprocessError),

    /// Artifact could not be loaded, validated or written
    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Canonical serialization failed
    #[error("Serialization error: {0}")]
    Canonical(#[from] CanonicalError),

    /// Classifier produced a class index outside the label set
    #[error("Class index {index} outside label set of {classes} classes")]
    UnknownClass { index: usize, classes: usize },
}

/// Result type for severity core operations
pub type Result<T> = std::result::Result<T, SeverityError>;
