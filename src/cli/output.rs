//! Output formatting for CLI commands.

use serde::{Deserialize, Serialize};

use crate::cli::args::{FaqcatArgs, OutputFormat};
use crate::error::Result;

/// Result structure for training.
#[derive(Debug, Serialize, Deserialize)]
pub struct TrainResult {
    pub documents: usize,
    pub documents_used: usize,
    pub documents_skipped: usize,
    pub categories: usize,
    pub epochs: usize,
    pub steps: u64,
    pub model_path: String,
    pub categories_path: String,
    pub duration_ms: u64,
}

/// One ranked category.
#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryScore {
    pub category: String,
    pub probability: f64,
}

/// Result structure for classification.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub text: String,
    pub tokens: Vec<String>,
    pub categories: Vec<CategoryScore>,
}

/// Result structure for evaluation.
#[derive(Debug, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub documents: usize,
    pub trials: usize,
    pub train_size: usize,
    pub test_size: usize,
    pub categories: usize,
    pub mean_accuracy: f64,
    pub mean_average_precision: f64,
    pub perfect_trials: usize,
    /// Trials per number of correctly classified test documents.
    pub accuracy_histogram: Vec<usize>,
    pub calibration_csv: Option<String>,
    pub duration_ms: u64,
}

/// Result structure for configuration initialization.
#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigInitResult {
    pub path: String,
}

/// Output a result in the specified format.
pub fn output_result<T: Serialize>(message: &str, result: &T, args: &FaqcatArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => output_human(message, result, args),
        OutputFormat::Json => output_json(result, args),
    }
}

/// Output in human-readable format.
fn output_human<T: Serialize>(message: &str, result: &T, args: &FaqcatArgs) -> Result<()> {
    if args.verbosity() > 0 {
        println!("{message}");
        println!();
    }

    let value = serde_json::to_value(result)?;
    for line in human_lines(&value) {
        println!("{line}");
    }
    Ok(())
}

/// Lines of the human rendering. Arrays of objects get one indented line per
/// element.
fn human_lines(value: &serde_json::Value) -> Vec<String> {
    let mut lines = Vec::new();
    match value {
        serde_json::Value::Object(obj) => {
            for (key, val) in obj {
                match val {
                    serde_json::Value::Array(items) if items.iter().any(|i| i.is_object()) => {
                        lines.push(format!("{key}:"));
                        for (i, item) in items.iter().enumerate() {
                            lines.push(format!("  {}. {}", i + 1, format_inline_object(item)));
                        }
                    }
                    serde_json::Value::Null => {}
                    _ => lines.push(format!("{key}: {}", format_value(val))),
                }
            }
        }
        _ => lines.push(format_value(value)),
    }
    lines
}

/// Output in JSON format.
fn output_json<T: Serialize>(result: &T, args: &FaqcatArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };

    println!("{json}");
    Ok(())
}

/// Format an object as `key=value` pairs on one line.
fn format_inline_object(value: &serde_json::Value) -> String {
    match value.as_object() {
        Some(obj) => obj
            .iter()
            .map(|(k, v)| format!("{k}={}", format_value(v)))
            .collect::<Vec<_>>()
            .join(", "),
        None => format_value(value),
    }
}

/// Format a JSON value for display.
fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => format!("{f:.4}"),
            _ => n.to_string(),
        },
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Array(arr) => {
            let formatted_values = arr.iter().map(format_value).collect::<Vec<_>>().join(", ");
            format!("[{formatted_values}]")
        }
        serde_json::Value::Object(_) => "[object]".to_string(),
        serde_json::Value::Null => "null".to_string(),
    }
}
