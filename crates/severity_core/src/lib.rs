//! Traffic accident severity core
//!
//! Shared by the offline trainer and the interactive form: everything needed
//! to turn a raw accident record into a severity class and a confidence.
//!
//! Modules:
//! - `schema`: Column names, feature rows and cell values
//! - `preprocess`: One-hot / numeric / yes-no transform fitted at training time
//! - `forest`: Integer-only classification trees and the averaged forest
//! - `labels`: Ordered class labels and their display names
//! - `artifact`: The persisted transform + model + labels bundle
//! - `predict`: Single-row inference with confidence
//! - `config`: Layered TOML / environment configuration
//! - `serde_canon`: Canonical JSON and Blake3 hashing helpers
//! - `errors`: Crate-level error type

pub mod artifact;
pub mod config;
pub mod errors;
pub mod forest;
pub mod labels;
pub mod predict;
pub mod preprocess;
pub mod schema;
pub mod serde_canon;

pub use artifact::{ArtifactError, ArtifactMetadata, TrainedArtifact, ARTIFACT_VERSION};
pub use config::{ConfigError, SeverityConfig, Tone};
pub use errors::{Result, SeverityError};
pub use forest::{argmax, ClassificationTree, Classifier, Forest, Node, SCALE};
pub use labels::LabelSet;
pub use predict::{Prediction, Predictor};
pub use preprocess::{
    FeatureTransform, PreprocessError, PreprocessPolicy, UnknownCategoryPolicy,
    UnmappedBinaryPolicy,
};
pub use schema::{FeatureRow, FeatureSchema, FeatureValue};
