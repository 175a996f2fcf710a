//! Command line argument parsing for the faqcat CLI using clap.

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::analysis::TokenizerOption;

/// faqcat - categorize FAQ and knowledge-base documents
#[derive(Parser, Debug, Clone)]
#[command(name = "faqcat")]
#[command(about = "Train, apply and evaluate an online document categorizer")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct FaqcatArgs {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human", global = true)]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl FaqcatArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose + 1
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Train a classifier on a labeled dataset
    Train(TrainArgs),

    /// Classify a piece of text with a trained classifier
    Classify(ClassifyArgs),

    /// Run repeated train/test trials over a dataset
    Evaluate(EvaluateArgs),

    /// Write a configuration file with default settings
    #[command(name = "init-config")]
    InitConfig(InitConfigArgs),
}

/// Arguments for training
#[derive(Parser, Debug, Clone)]
pub struct TrainArgs {
    /// Labeled dataset (JSON array)
    #[arg(value_name = "DATASET")]
    pub dataset: PathBuf,

    /// Where to write the model blob
    #[arg(short, long, value_name = "PATH", default_value = "faqcat.model")]
    pub model: PathBuf,

    /// Where to write the category index blob
    #[arg(short, long, value_name = "PATH", default_value = "faqcat.categories")]
    pub categories: PathBuf,

    /// Number of passes over the dataset
    #[arg(short, long)]
    pub epochs: Option<usize>,

    /// Shuffle seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Configuration file (JSON)
    #[arg(long, value_name = "CONFIG_FILE", env = "FAQCAT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Tokenizer for documents without precomputed tokens
    #[arg(short, long)]
    pub tokenizer: Option<TokenizerOption>,
}

/// Arguments for classification
#[derive(Parser, Debug, Clone)]
pub struct ClassifyArgs {
    /// Text to classify
    #[arg(value_name = "TEXT")]
    pub text: String,

    /// Model blob written by `train`
    #[arg(short, long, value_name = "PATH", default_value = "faqcat.model")]
    pub model: PathBuf,

    /// Category index blob written by `train`
    #[arg(short, long, value_name = "PATH", default_value = "faqcat.categories")]
    pub categories: PathBuf,

    /// Number of categories to report
    #[arg(short = 'n', long, default_value = "5")]
    pub top: usize,

    /// Configuration file (JSON)
    #[arg(long, value_name = "CONFIG_FILE", env = "FAQCAT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Tokenizer for the input text
    #[arg(short, long)]
    pub tokenizer: Option<TokenizerOption>,
}

/// Arguments for evaluation
#[derive(Parser, Debug, Clone)]
pub struct EvaluateArgs {
    /// Labeled dataset (JSON array)
    #[arg(value_name = "DATASET")]
    pub dataset: PathBuf,

    /// Number of train/test trials
    #[arg(long)]
    pub trials: Option<usize>,

    /// Share of the dataset used for training
    #[arg(long)]
    pub train_fraction: Option<f64>,

    /// Base seed for splits and shuffles
    #[arg(long)]
    pub seed: Option<u64>,

    /// Training epochs per trial
    #[arg(short, long)]
    pub epochs: Option<usize>,

    /// Run trials in parallel
    #[arg(long)]
    pub parallel: bool,

    /// Write the calibration curve to this CSV file
    #[arg(long, value_name = "CSV_FILE")]
    pub calibration_csv: Option<PathBuf>,

    /// Configuration file (JSON)
    #[arg(long, value_name = "CONFIG_FILE", env = "FAQCAT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Tokenizer for documents without precomputed tokens
    #[arg(short, long)]
    pub tokenizer: Option<TokenizerOption>,
}

/// Arguments for writing a default configuration
#[derive(Parser, Debug, Clone)]
pub struct InitConfigArgs {
    /// Destination of the configuration file
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

/// Output formats for CLI
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}
