//! Accident severity trainer CLI
//!
//! Trains the random forest from the accident CSV and writes the artifact
//! with its hash sidecar.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use traffic_severity_core::forest::SCALE;
use traffic_severity_core::{LabelSet, SeverityConfig};
use traffic_severity_trainer::{Dataset, Evaluation, SeverityTrainer, TrainingParams};

#[derive(Parser, Debug)]
#[command(name = "severity-train")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train the accident severity random forest", long_about = None)]
struct Args {
    /// Configuration file (defaults to ./severity.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Input CSV dataset path
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output artifact path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Label column name
    #[arg(long)]
    label: Option<String>,

    /// Number of trees
    #[arg(long)]
    trees: Option<usize>,

    /// Random seed for the split and the forest
    #[arg(long)]
    seed: Option<i64>,

    /// Held-out fraction in (0, 1)
    #[arg(long)]
    test_fraction: Option<f64>,

    /// Maximum tree depth (unlimited by default)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Print the merged configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn apply(&self, config: &mut SeverityConfig) {
        if let Some(input) = &self.input {
            config.dataset.path = input.clone();
        }
        if let Some(output) = &self.output {
            config.artifact.path = output.clone();
        }
        if let Some(label) = &self.label {
            config.dataset.label = label.clone();
        }
        if let Some(trees) = self.trees {
            config.training.n_estimators = trees;
        }
        if let Some(seed) = self.seed {
            config.training.seed = seed;
        }
        if let Some(fraction) = self.test_fraction {
            config.training.test_fraction = fraction;
        }
        if self.max_depth.is_some() {
            config.training.max_depth = self.max_depth;
        }
    }
}

/// Merged configuration with command-line overrides, validated once
fn resolve_config(args: &Args) -> Result<SeverityConfig> {
    let mut config =
        SeverityConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    args.apply(&mut config);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn init_tracing(level: &str, verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {e}"))
}

fn percent(value: i64) -> f64 {
    value as f64 * 100.0 / SCALE as f64
}

/// One line per actual class: predicted counts and recall
fn confusion_report(evaluation: &Evaluation, labels: &LabelSet) -> Vec<String> {
    evaluation
        .confusion
        .iter()
        .zip(evaluation.per_class_recall())
        .enumerate()
        .map(|(class, (row, recall))| {
            let name = labels.display_name(class).unwrap_or("?");
            let recall = recall
                .map(|r| format!("{:.2}%", percent(r)))
                .unwrap_or_else(|| "n/a".to_string());
            format!("actual {name:>12}: predicted {row:?}, recall {recall}")
        })
        .collect()
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = resolve_config(&args)?;

    if args.print_config {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    init_tracing(&config.logging.level, args.verbose)?;
    info!("Accident severity trainer v{}", env!("CARGO_PKG_VERSION"));

    let params = TrainingParams::from_config(&config);
    let dataset = Dataset::from_csv(&config.dataset.path, &params.schema)
        .with_context(|| format!("Failed to load dataset {}", config.dataset.path.display()))?;

    info!(
        rows = dataset.len(),
        dropped = dataset.dropped_rows,
        label = %params.schema.label,
        "dataset summary"
    );
    for (class, count) in dataset.class_distribution() {
        info!("  class {class}: {count} rows");
    }

    let outcome = SeverityTrainer::new(params)
        .train(&dataset)
        .context("Training failed")?;

    let artifact = &outcome.artifact;
    match artifact.metadata.holdout_accuracy {
        Some(accuracy) => info!(
            "Held-out accuracy: {:.2}% over {} rows",
            percent(accuracy),
            outcome.evaluation.samples
        ),
        None => info!("No held-out rows to evaluate"),
    }
    for line in confusion_report(&outcome.evaluation, &artifact.labels) {
        info!("  {line}");
    }

    info!("Top feature importances:");
    for (name, importance) in outcome.top_features(10) {
        info!("  {name:<40} {:.2}%", percent(importance));
    }

    let path = &config.artifact.path;
    let file_hash = artifact
        .save(path)
        .with_context(|| format!("Failed to write artifact {}", path.display()))?;

    info!("Training completed");
    info!("  Model: {}", path.display());
    info!("  Model hash: {}", artifact.metadata.model_hash);
    info!("  File hash: {file_hash}");

    Ok(())
}
