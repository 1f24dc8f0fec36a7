//! Accident severity form CLI
//!
//! Loads the trained artifact once, then asks for one accident description
//! per round and prints the predicted severity with its confidence.

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use inquire::validator::Validation;
use inquire::{Confirm, CustomType, CustomUserError, InquireError, Select};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use traffic_severity_core::{FeatureRow, Predictor, SeverityConfig};
use traffic_severity_form::{
    collect_answers, format_prediction, format_probabilities, init_predictor, validate_row,
    ChoiceField, FormError, FormSource, SliderField,
};

#[derive(Parser, Debug)]
#[command(name = "severity-form")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Predict accident severity from a short form", long_about = None)]
struct Args {
    /// Configuration file (defaults to ./severity.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Trained artifact path
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Predict a single JSON row instead of prompting
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Verbose logging and per-class probabilities
    #[arg(short, long)]
    verbose: bool,
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
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {e}"))
}

/// Prompts on the terminal
struct TerminalForm;

fn prompt_error(err: InquireError) -> FormError {
    match err {
        InquireError::OperationCanceled | InquireError::OperationInterrupted => {
            FormError::Cancelled
        }
        other => FormError::Prompt(other.to_string()),
    }
}

impl FormSource for TerminalForm {
    fn choose(&mut self, field: &ChoiceField) -> Result<String, FormError> {
        Select::new(field.prompt, field.options.to_vec())
            .prompt()
            .map(str::to_string)
            .map_err(prompt_error)
    }

    fn slide(&mut self, field: &SliderField) -> Result<i64, FormError> {
        let (min, max) = (field.min, field.max);
        let help = format!("{min} to {max}");
        CustomType::<i64>::new(field.prompt)
            .with_default(field.default)
            .with_help_message(&help)
            .with_error_message("Please type a whole number")
            .with_validator(move |value: &i64| -> Result<Validation, CustomUserError> {
                if (min..=max).contains(value) {
                    Ok(Validation::Valid)
                } else {
                    Ok(Validation::Invalid(
                        format!("Must be between {min} and {max}").into(),
                    ))
                }
            })
            .prompt()
            .map_err(prompt_error)
    }
}

fn confirm(message: &str, default: bool) -> Result<bool, FormError> {
    Confirm::new(message)
        .with_default(default)
        .prompt()
        .map_err(prompt_error)
}

fn show(
    predictor: &Predictor,
    config: &SeverityConfig,
    row: &FeatureRow,
    verbose: bool,
) -> Result<()> {
    let prediction = predictor.predict(row).context("Prediction failed")?;
    debug!(class = %prediction.class, confidence = prediction.confidence, "prediction");

    let tone = config.labels.tone_for(&prediction.label);
    println!("{}", format_prediction(&prediction, tone));
    if verbose {
        for line in format_probabilities(&prediction, predictor.labels()) {
            println!("{line}");
        }
    }
    Ok(())
}

fn run_interactive(predictor: &Predictor, config: &SeverityConfig, verbose: bool) -> Result<()> {
    println!("{}", "🚦 Traffic Accident Severity Prediction".bold());
    println!("Enter details below to predict accident severity.\n");

    loop {
        let row = match collect_answers(&mut TerminalForm) {
            Ok(row) => row,
            Err(FormError::Cancelled) => break,
            Err(err) => return Err(err).context("Failed to read user input"),
        };

        match confirm("Predict severity?", true) {
            Ok(true) => show(predictor, config, &row, verbose)?,
            Ok(false) => {}
            Err(FormError::Cancelled) => break,
            Err(err) => return Err(err).context("Failed to read user input"),
        }

        match confirm("Make another prediction?", false) {
            Ok(true) => println!(),
            Ok(false) | Err(FormError::Cancelled) => break,
            Err(err) => return Err(err).context("Failed to read user input"),
        }
    }
    Ok(())
}

fn run_once(
    predictor: &Predictor,
    config: &SeverityConfig,
    input: &Path,
    verbose: bool,
) -> Result<()> {
    let content = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let row: FeatureRow = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a JSON object of column values", input.display()))?;
    validate_row(&row).context("Input row rejected")?;
    show(predictor, config, &row, verbose)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config =
        SeverityConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(model) = &args.model {
        config.artifact.path = model.clone();
    }
    config.validate().context("Invalid configuration")?;

    init_tracing(&config.logging.level, args.verbose)?;
    info!("Accident severity form v{}", env!("CARGO_PKG_VERSION"));

    let predictor = match init_predictor(&config.artifact.path, config.artifact.verify_hash) {
        Ok(predictor) => predictor,
        Err(err) => {
            eprintln!("{} {err}", "❌ Model could not be loaded:".red().bold());
            eprintln!("Train one first with severity-train.");
            std::process::exit(1);
        }
    };

    match &args.input {
        Some(input) => run_once(predictor, &config, input, args.verbose),
        None => run_interactive(predictor, &config, args.verbose),
    }
}
