//! Command implementations for the faqcat CLI.

use std::fs;
use std::path::Path;
use std::time::Instant;

use log::info;

use crate::analysis::{Analyzer, TokenizerOption};
use crate::cli::args::*;
use crate::cli::output::*;
use crate::config::FaqcatConfig;
use crate::document::{Document, DocumentSource, JsonDocumentSource, tokenize_all};
use crate::error::{FaqcatError, Result};
use crate::ml::classifier::CategoryClassifier;
use crate::ml::evaluation::Evaluator;
use crate::ml::trainer::Trainer;

/// Execute a CLI command.
pub fn execute_command(args: FaqcatArgs) -> Result<()> {
    match &args.command {
        Command::Train(train_args) => train(train_args, &args),
        Command::Classify(classify_args) => classify(classify_args, &args),
        Command::Evaluate(evaluate_args) => evaluate(evaluate_args, &args),
        Command::InitConfig(init_args) => init_config(init_args, &args),
    }
}

/// Configuration file if given, defaults otherwise.
fn load_config(path: Option<&Path>) -> Result<FaqcatConfig> {
    match path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            FaqcatConfig::load(path)
        }
        None => Ok(FaqcatConfig::default()),
    }
}

fn load_documents(path: &Path, tokenizer: TokenizerOption) -> Result<Vec<Document>> {
    let source = JsonDocumentSource::new(path);
    let mut documents = source.documents()?;
    let analyzer = tokenizer.analyzer()?;
    tokenize_all(&mut documents, &analyzer)?;
    info!(
        "Loaded {} documents from {} ({} tokenizer)",
        documents.len(),
        source.name(),
        tokenizer
    );
    Ok(documents)
}

/// Train a classifier and write its blobs.
fn train(args: &TrainArgs, cli_args: &FaqcatArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(epochs) = args.epochs {
        config.trainer.epochs = epochs;
    }
    if args.seed.is_some() {
        config.trainer.seed = args.seed;
    }
    if let Some(tokenizer) = args.tokenizer {
        config.analysis.tokenizer = tokenizer;
    }
    config.validate()?;

    let start_time = Instant::now();
    let documents = load_documents(&args.dataset, config.analysis.tokenizer)?;

    let mut classifier = CategoryClassifier::from_documents(&documents, config.classifier.clone())?
        .with_weighting(config.features.weighting);
    let mut trainer = Trainer::new(config.trainer.clone())?;
    let summary = trainer.fit(&mut classifier, &documents)?;
    classifier.save(&args.model, &args.categories)?;

    output_result(
        "Training finished",
        &TrainResult {
            documents: documents.len(),
            documents_used: summary.documents_used,
            documents_skipped: summary.documents_skipped,
            categories: summary.categories,
            epochs: summary.epochs,
            steps: summary.steps,
            model_path: args.model.display().to_string(),
            categories_path: args.categories.display().to_string(),
            duration_ms: start_time.elapsed().as_millis() as u64,
        },
        cli_args,
    )
}

/// Classify one text with a stored classifier.
fn classify(args: &ClassifyArgs, cli_args: &FaqcatArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(tokenizer) = args.tokenizer {
        config.analysis.tokenizer = tokenizer;
    }
    if args.top == 0 {
        return Err(FaqcatError::invalid_argument("--top must be at least 1"));
    }

    let classifier = CategoryClassifier::load(&args.model, &args.categories)?;
    let analyzer = config.analysis.tokenizer.analyzer()?;
    let tokens = analyzer.analyze_to_strings(&args.text)?;

    let categories = classifier
        .top_categories(&tokens, args.top)?
        .into_iter()
        .map(|(category, probability)| CategoryScore {
            category,
            probability,
        })
        .collect();

    output_result(
        "Classification",
        &ClassificationResult {
            text: args.text.clone(),
            tokens,
            categories,
        },
        cli_args,
    )
}

/// Run the evaluation harness over a dataset.
fn evaluate(args: &EvaluateArgs, cli_args: &FaqcatArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(trials) = args.trials {
        config.evaluation.trials = trials;
    }
    if let Some(fraction) = args.train_fraction {
        config.evaluation.train_fraction = fraction;
    }
    if args.seed.is_some() {
        config.evaluation.seed = args.seed;
    }
    if let Some(epochs) = args.epochs {
        config.trainer.epochs = epochs;
    }
    if let Some(tokenizer) = args.tokenizer {
        config.analysis.tokenizer = tokenizer;
    }
    config.evaluation.parallel |= args.parallel;
    config.validate()?;

    let start_time = Instant::now();
    let documents = load_documents(&args.dataset, config.analysis.tokenizer)?;
    let evaluator = Evaluator::from_config(&config)?;
    let report = evaluator.evaluate(&documents)?;

    if let Some(path) = &args.calibration_csv {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, report.calibration.to_csv())?;
        info!("Wrote calibration curve to {}", path.display());
    }

    output_result(
        "Evaluation finished",
        &EvaluationSummary {
            documents: documents.len(),
            trials: report.trials,
            train_size: report.train_size,
            test_size: report.test_size,
            categories: report.categories,
            mean_accuracy: report.mean_accuracy,
            mean_average_precision: report.mean_average_precision,
            perfect_trials: report.accuracy_histogram.perfect_trials(),
            accuracy_histogram: report.accuracy_histogram.counts().to_vec(),
            calibration_csv: args
                .calibration_csv
                .as_ref()
                .map(|p| p.display().to_string()),
            duration_ms: start_time.elapsed().as_millis() as u64,
        },
        cli_args,
    )
}

/// Write the default configuration.
fn init_config(args: &InitConfigArgs, cli_args: &FaqcatArgs) -> Result<()> {
    if args.path.exists() && !args.force {
        return Err(FaqcatError::invalid_argument(format!(
            "{} already exists. Use --force to overwrite.",
            args.path.display()
        )));
    }
    if let Some(parent) = args.path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    FaqcatConfig::default().save(&args.path)?;

    output_result(
        "Configuration written",
        &ConfigInitResult {
            path: args.path.display().to_string(),
        },
        cli_args,
    )
}
