//! Result formatting for the terminal

use colored::{ColoredString, Colorize};
use traffic_severity_core::forest::SCALE;
use traffic_severity_core::{LabelSet, Prediction, Tone};

pub fn icon(tone: Tone) -> &'static str {
    match tone {
        Tone::Success => "✅",
        Tone::Warning => "⚠️",
        Tone::Alert => "🚨",
        Tone::Info => "ℹ️",
    }
}

fn paint(text: String, tone: Tone) -> ColoredString {
    match tone {
        Tone::Success => text.green(),
        Tone::Warning => text.yellow(),
        Tone::Alert => text.red(),
        Tone::Info => text.cyan(),
    }
}

/// One line: icon, label and confidence with two decimals
pub fn format_prediction(prediction: &Prediction, tone: Tone) -> String {
    let text = format!(
        "Predicted Severity: {} ({:.2}%)",
        prediction.label,
        prediction.confidence_percent()
    );
    format!("{} {}", icon(tone), paint(text, tone).bold())
}

/// Per-class probabilities, one line per class in class order
pub fn format_probabilities(prediction: &Prediction, labels: &LabelSet) -> Vec<String> {
    let Some(probabilities) = &prediction.probabilities else {
        return Vec::new();
    };
    probabilities
        .iter()
        .enumerate()
        .map(|(index, &p)| {
            let name = labels.display_name(index).unwrap_or("?");
            format!("  {name:<12} {:>6.2}%", p as f64 * 100.0 / SCALE as f64)
        })
        .collect()
}
