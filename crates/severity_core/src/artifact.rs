//! Trained artifact: fitted transform + forest + labels, persisted as one file
//!
//! The artifact is written as canonical JSON next to a `.hash` sidecar holding
//! the Blake3 digest of the file. Writes go through a temporary file in the
//! target directory and are renamed into place.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::forest::Forest;
use crate::labels::LabelSet;
use crate::preprocess::FeatureTransform;
use crate::serde_canon::{hash_bytes_hex, hash_canonical_hex, to_canonical_json, CanonicalError};

/// Current artifact format version
pub const ARTIFACT_VERSION: i32 = 1;

/// Artifact errors
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("model artifact not found at {}", .0.display())]
    NotFound(PathBuf),

    #[error("artifact validation failed: {0}")]
    ValidationFailed(String),

    #[error("artifact hash mismatch: sidecar has {expected}, file hashes to {actual}")]
    HashMismatch { expected: String, actual: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Canonical serialization error: {0}")]
    Canonical(#[from] CanonicalError),

    #[error("failed to move artifact into place: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// Training provenance and diagnostics
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ArtifactMetadata {
    /// Unix timestamp of training
    pub created_at: u64,
    /// Blake3 of transform + model + labels (metadata excluded)
    pub model_hash: String,
    /// Blake3 of the training CSV bytes
    pub training_data_hash: String,
    pub training_rows: usize,
    pub holdout_rows: usize,
    pub dropped_rows: usize,
    /// Held-out accuracy at `SCALE`
    pub holdout_accuracy: Option<i64>,
    /// Output slot names of the transform
    pub feature_names: Vec<String>,
    /// Mean impurity decrease per output slot at `SCALE`
    pub feature_importances: Vec<i64>,
}

/// The fitted pipeline consumed by inference
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrainedArtifact {
    pub version: i32,
    pub transform: FeatureTransform,
    pub model: Forest,
    pub labels: LabelSet,
    pub metadata: ArtifactMetadata,
}

#[derive(Serialize)]
struct Fingerprint<'a> {
    version: i32,
    transform: &'a FeatureTransform,
    model: &'a Forest,
    labels: &'a LabelSet,
}

impl TrainedArtifact {
    /// Assemble and validate an artifact, stamping its model hash
    pub fn new(
        transform: FeatureTransform,
        model: Forest,
        labels: LabelSet,
        metadata: ArtifactMetadata,
    ) -> Result<Self, ArtifactError> {
        let mut artifact = Self {
            version: ARTIFACT_VERSION,
            transform,
            model,
            labels,
            metadata,
        };
        artifact.validate()?;
        artifact.metadata.model_hash = artifact.fingerprint()?;
        Ok(artifact)
    }

    /// Hash of everything that affects predictions
    pub fn fingerprint(&self) -> Result<String, ArtifactError> {
        Ok(hash_canonical_hex(&Fingerprint {
            version: self.version,
            transform: &self.transform,
            model: &self.model,
            labels: &self.labels,
        })?)
    }

    /// Structural checks tying transform, model and labels together
    pub fn validate(&self) -> Result<(), ArtifactError> {
        if self.version != ARTIFACT_VERSION {
            return Err(ArtifactError::ValidationFailed(format!(
                "Unsupported artifact version: {}",
                self.version
            )));
        }

        self.transform
            .validate()
            .map_err(ArtifactError::ValidationFailed)?;
        self.model.validate().map_err(ArtifactError::ValidationFailed)?;

        if self.transform.width() != self.model.n_features {
            return Err(ArtifactError::ValidationFailed(format!(
                "transform produces {} features, model expects {}",
                self.transform.width(),
                self.model.n_features
            )));
        }

        if self.labels.len() != self.model.n_classes {
            return Err(ArtifactError::ValidationFailed(format!(
                "{} labels for a model over {} classes",
                self.labels.len(),
                self.model.n_classes
            )));
        }

        Ok(())
    }

    pub fn to_canonical_json(&self) -> Result<String, ArtifactError> {
        Ok(to_canonical_json(self)?)
    }

    /// Location of the hash sidecar: the artifact path with `.hash` appended
    pub fn hash_path(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_owned();
        name.push(".hash");
        PathBuf::from(name)
    }

    /// Write the artifact and its hash sidecar; returns the file hash
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<String, ArtifactError> {
        let path = path.as_ref();
        let json = self.to_canonical_json()?;
        let file_hash = hash_bytes_hex(json.as_bytes());

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut artifact_tmp = NamedTempFile::new_in(&dir)?;
        artifact_tmp.write_all(json.as_bytes())?;
        artifact_tmp.flush()?;

        let mut hash_tmp = NamedTempFile::new_in(&dir)?;
        hash_tmp.write_all(file_hash.as_bytes())?;
        hash_tmp.flush()?;

        // No stale sidecar may sit next to a new artifact
        let hash_path = Self::hash_path(path);
        match fs::remove_file(&hash_path) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }

        artifact_tmp.persist(path)?;
        hash_tmp.persist(&hash_path)?;

        info!(path = %path.display(), bytes = json.len(), "artifact written");
        Ok(file_hash)
    }

    /// Load, optionally verify against the sidecar, and validate
    pub fn load<P: AsRef<Path>>(path: P, verify_hash: bool) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ArtifactError::NotFound(path.to_path_buf()));
        }

        let bytes = fs::read(path)?;

        if verify_hash {
            let hash_path = Self::hash_path(path);
            if hash_path.exists() {
                let expected = fs::read_to_string(&hash_path)?.trim().to_string();
                let actual = hash_bytes_hex(&bytes);
                if expected != actual {
                    return Err(ArtifactError::HashMismatch { expected, actual });
                }
                debug!(hash = %actual, "artifact hash verified");
            } else {
                warn!(path = %hash_path.display(), "hash sidecar missing, skipping verification");
            }
        }

        let artifact: TrainedArtifact = serde_json::from_slice(&bytes)?;
        artifact.validate()?;

        if !artifact.metadata.model_hash.is_empty() {
            let fingerprint = artifact.fingerprint()?;
            if fingerprint != artifact.metadata.model_hash {
                return Err(ArtifactError::ValidationFailed(format!(
                    "model hash {} does not match recorded {}",
                    fingerprint, artifact.metadata.model_hash
                )));
            }
        }

        info!(
            path = %path.display(),
            trees = artifact.model.num_trees(),
            classes = artifact.labels.len(),
            "artifact loaded"
        );
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forest::{ClassificationTree, Node, SCALE};
    use crate::preprocess::PreprocessPolicy;
    use crate::schema::{FeatureRow, FeatureSchema};
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn test_artifact() -> TrainedArtifact {
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
        let transform = FeatureTransform::fit(&schema, &rows, PreprocessPolicy::default()).unwrap();
        let tree = ClassificationTree::new(
            vec![
                Node::internal(0, 2, 70 * SCALE, 1, 2),
                Node::leaf(1, vec![1, 0]),
                Node::leaf(2, vec![0, 1]),
            ],
            2,
        );
        let labels = LabelSet::from_labels(["Low", "High"], BTreeMap::new());
        TrainedArtifact::new(
            transform,
            Forest::new(vec![tree], 2, 3),
            labels,
            ArtifactMetadata::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_new_stamps_model_hash() {
        let artifact = test_artifact();
        assert_eq!(artifact.metadata.model_hash.len(), 64);
        assert_eq!(artifact.metadata.model_hash, artifact.fingerprint().unwrap());
    }

    #[test]
    fn test_fingerprint_ignores_metadata() {
        let a = test_artifact();
        let mut b = test_artifact();
        b.metadata.created_at = 12345;
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("models").join("accident_model.json");

        let artifact = test_artifact();
        let file_hash = artifact.save(&path).unwrap();

        assert!(path.exists());
        let sidecar = fs::read_to_string(TrainedArtifact::hash_path(&path)).unwrap();
        assert_eq!(sidecar, file_hash);

        let loaded = TrainedArtifact::load(&path, true).unwrap();
        assert_eq!(artifact, loaded);
    }

    #[test]
    fn test_sidecar_appends_to_file_name() {
        let json = TrainedArtifact::hash_path(Path::new("models/model.json"));
        let bin = TrainedArtifact::hash_path(Path::new("models/model.bin"));
        assert_eq!(json, PathBuf::from("models/model.json.hash"));
        assert_ne!(json, bin);
        assert_eq!(
            TrainedArtifact::hash_path(Path::new("model.hash")),
            PathBuf::from("model.hash.hash")
        );
    }

    #[test]
    fn test_resave_replaces_sidecar() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model.json");
        test_artifact().save(&path).unwrap();

        let mut retrained = test_artifact();
        retrained.metadata.created_at = 99;
        let file_hash = retrained.save(&path).unwrap();

        assert_eq!(fs::read_to_string(TrainedArtifact::hash_path(&path)).unwrap(), file_hash);
        assert_eq!(TrainedArtifact::load(&path, true).unwrap(), retrained);
    }

    #[test]
    fn test_unwritable_sidecar_leaves_previous_artifact() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model.json");
        test_artifact().save(&path).unwrap();
        let before = fs::read(&path).unwrap();

        // A directory where the sidecar belongs cannot be replaced
        let hash_path = TrainedArtifact::hash_path(&path);
        fs::remove_file(&hash_path).unwrap();
        fs::create_dir(&hash_path).unwrap();

        let mut retrained = test_artifact();
        retrained.metadata.created_at = 99;
        assert!(retrained.save(&path).is_err());
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let err = TrainedArtifact::load(dir.path().join("absent.json"), true).unwrap_err();
        assert!(matches!(err, ArtifactError::NotFound(_)));
    }

    #[test]
    fn test_tampered_artifact_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model.json");
        test_artifact().save(&path).unwrap();

        let json = fs::read_to_string(&path).unwrap();
        fs::write(&path, json.replace("\"Rain\"", "\"Snow\"")).unwrap();

        let err = TrainedArtifact::load(&path, true).unwrap_err();
        assert!(matches!(err, ArtifactError::HashMismatch { .. }));

        // Without the sidecar check the recorded model hash still catches it
        let err = TrainedArtifact::load(&path, false).unwrap_err();
        assert!(matches!(err, ArtifactError::ValidationFailed(_)));
    }

    #[test]
    fn test_width_mismatch_rejected() {
        let mut artifact = test_artifact();
        artifact.model.n_features = 7;
        assert!(artifact.validate().is_err());
    }
}
