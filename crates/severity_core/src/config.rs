//! Layered configuration shared by the trainer and the form
//!
//! Sources, later ones winning: built-in defaults, a TOML file
//! (`severity.toml` in the working directory or an explicit path), then
//! `SEVERITY_`-prefixed environment variables with `__` between nested keys,
//! e.g. `SEVERITY_TRAINING__SEED=7`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::preprocess::{PreprocessPolicy, UnknownCategoryPolicy, UnmappedBinaryPolicy};
use crate::schema::ACCIDENT;

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "severity.toml";

const ENV_PREFIX: &str = "SEVERITY";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration file {} not found", .0.display())]
    NotFound(PathBuf),

    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SeverityConfig {
    pub dataset: DatasetConfig,
    pub training: TrainingConfig,
    pub preprocess: PreprocessConfig,
    pub artifact: ArtifactConfig,
    pub labels: LabelsConfig,
    pub logging: LoggingConfig,
}

/// Training data location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatasetConfig {
    pub path: PathBuf,
    /// Label column name
    pub label: String,
}

/// Split and forest hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrainingConfig {
    pub n_estimators: usize,
    pub seed: i64,
    pub test_fraction: f64,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
}

/// Candidate features examined per split
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MaxFeatures {
    #[default]
    Sqrt,
    Log2,
    All,
}

impl MaxFeatures {
    /// Resolve to a count for `n_features` inputs (at least 1)
    pub fn resolve(self, n_features: usize) -> usize {
        let count = match self {
            MaxFeatures::Sqrt => integer_sqrt(n_features),
            MaxFeatures::Log2 => match n_features {
                0 => 0,
                n => (usize::BITS - 1 - n.leading_zeros()) as usize,
            },
            MaxFeatures::All => n_features,
        };
        count.clamp(1, n_features.max(1))
    }
}

fn integer_sqrt(n: usize) -> usize {
    let mut root = 0usize;
    while (root + 1).saturating_mul(root + 1) <= n {
        root += 1;
    }
    root
}

/// Fallback policies frozen into the artifact
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PreprocessConfig {
    pub unknown_category: UnknownCategoryPolicy,
    pub unmapped_binary: UnmappedBinaryPolicy,
}

impl From<PreprocessConfig> for PreprocessPolicy {
    fn from(config: PreprocessConfig) -> Self {
        PreprocessPolicy {
            unknown_category: config.unknown_category,
            unmapped_binary: config.unmapped_binary,
        }
    }
}

/// Artifact location and integrity checking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ArtifactConfig {
    pub path: PathBuf,
    pub verify_hash: bool,
}

/// How classes are presented
///
/// Defaults to the three-level severity scale `0 -> Low`, `1 -> Medium`,
/// `2 -> High`; a `[labels.names]` or `[labels.tones]` table replaces the
/// whole map.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LabelsConfig {
    /// Raw class label -> display name
    pub names: BTreeMap<String, String>,
    /// Display name -> tone
    pub tones: BTreeMap<String, Tone>,
}

/// Presentation tone of a predicted class
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Success,
    Warning,
    Alert,
    #[default]
    Info,
}

impl LabelsConfig {
    /// Tone for a display name; keys match exactly first, then ignoring ASCII case
    pub fn tone_for(&self, label: &str) -> Tone {
        self.tones
            .get(label)
            .or_else(|| {
                self.tones
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(label))
                    .map(|(_, tone)| tone)
            })
            .copied()
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data_accidents.csv"),
            label: ACCIDENT.to_string(),
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            seed: 42,
            test_fraction: 0.2,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
        }
    }
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("models/accident_model.json"),
            verify_hash: true,
        }
    }
}

impl Default for LabelsConfig {
    fn default() -> Self {
        let scale = [
            ("0", "Low", Tone::Success),
            ("1", "Medium", Tone::Warning),
            ("2", "High", Tone::Alert),
        ];
        Self {
            names: scale
                .iter()
                .map(|(class, name, _)| (class.to_string(), name.to_string()))
                .collect(),
            tones: scale
                .iter()
                .map(|(_, name, tone)| (name.to_string(), *tone))
                .collect(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl SeverityConfig {
    /// Load defaults, then the config file, then the environment
    ///
    /// An explicit `path` must exist; without one, `severity.toml` is used
    /// when present. The result is not validated: callers apply their own
    /// overrides first and then call [`SeverityConfig::validate`].
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = match path {
            Some(path) if !path.exists() => return Err(ConfigError::NotFound(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.exists()),
        };

        let mut builder = config::Config::builder();
        if let Some(path) = &resolved {
            info!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path.as_path()));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: SeverityConfig = builder.build()?.try_deserialize()?;
        debug!(?config, "configuration loaded");
        Ok(config)
    }

    /// Parse a TOML document on top of the defaults
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: SeverityConfig = config::Config::builder()
            .add_source(config::File::from_str(content, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Render as pretty TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let training = &self.training;
        if training.n_estimators == 0 {
            return Err(ConfigError::Invalid("training.n_estimators must be at least 1".into()));
        }
        if !(training.test_fraction > 0.0 && training.test_fraction < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "training.test_fraction must be in (0, 1), got {}",
                training.test_fraction
            )));
        }
        if training.min_samples_split < 2 {
            return Err(ConfigError::Invalid("training.min_samples_split must be at least 2".into()));
        }
        if training.min_samples_leaf < 1 {
            return Err(ConfigError::Invalid("training.min_samples_leaf must be at least 1".into()));
        }
        if training.max_depth == Some(0) {
            return Err(ConfigError::Invalid("training.max_depth must be at least 1".into()));
        }
        if self.dataset.label.trim().is_empty() {
            return Err(ConfigError::Invalid("dataset.label must not be empty".into()));
        }
        Ok(())
    }
}
