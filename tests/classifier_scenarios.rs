use std::sync::Arc;

use faqcat::analysis::{Analyzer, TokenizerOption, tokenize};
use faqcat::config::{CategoryGrowth, ClassifierConfig};
use faqcat::document::Document;
use faqcat::error::{FaqcatError, Result};
use faqcat::ml::{
    CategoryClassifier, CorpusStats, FeatureEncoder, FeatureVector, OnlineLogisticRegression,
    TokenWeighting, Trainer, argmax,
};
use tempfile::TempDir;

fn words(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

#[test]
fn test_two_documents_in_seven_features() -> Result<()> {
    // 1. Two labeled documents, stemmed with the standard analyzer
    let option = TokenizerOption::Standard;
    let documents = vec![
        Document::new("Test text to teach machine.", vec!["cat1".into()]),
        Document::new("Real document that can be really applied.", vec!["cat2".into()]),
    ];
    let analyzer: Arc<dyn Analyzer> = Arc::new(option.analyzer()?);

    // 2. Train a tiny model where most tokens collide
    let mut classifier = CategoryClassifier::new(ClassifierConfig::with_dimensions(2, 7))?;
    let mut trainer = Trainer::seeded(30, 0)?.with_analyzer(analyzer);
    let summary = trainer.fit(&mut classifier, &documents)?;
    assert_eq!(summary.steps, 60);

    // 3. The training documents themselves come back with their labels
    for document in &documents {
        let tokens = tokenize(document.text.as_deref().unwrap_or_default(), option)?;
        assert_eq!(classifier.most_confident_category(&tokens)?, document.categories[0]);
    }

    // 4. Held-out queries land in the matching category
    let first = tokenize("Teach the machine a test", option)?;
    let second = tokenize("Really applied document", option)?;
    assert_eq!(classifier.most_confident_category(&first)?, "cat1");
    assert_eq!(classifier.most_confident_category(&second)?, "cat2");
    assert!(classifier.category_probability(&first, "cat1")? > 0.5);

    let probabilities = classifier.classify(&first)?;
    assert!((probabilities.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    Ok(())
}

#[test]
fn test_shared_tokens_separate_by_keyword() -> Result<()> {
    let texts = [
        ("alpha report", "A"),
        ("alpha summary alpha", "A"),
        ("the alpha notes", "A"),
        ("alpha", "A"),
        ("beta report", "B"),
        ("beta summary beta", "B"),
        ("the beta notes", "B"),
        ("beta", "B"),
    ];
    let documents: Vec<Document> = texts
        .iter()
        .map(|(text, label)| Document::new(*text, vec![label.to_string()]))
        .collect();
    let analyzer: Arc<dyn Analyzer> = Arc::new(TokenizerOption::UnicodeWords.analyzer()?);

    let mut classifier = CategoryClassifier::new(ClassifierConfig::with_dimensions(2, 1024))?;
    Trainer::seeded(30, 11)?
        .with_analyzer(Arc::clone(&analyzer))
        .fit(&mut classifier, &documents)?;

    let alpha = analyzer.analyze_to_strings("alpha alpha gamma")?;
    let beta = analyzer.analyze_to_strings("beta gamma")?;
    assert_eq!(classifier.most_confident_category(&alpha)?, "A");
    assert_eq!(classifier.most_confident_category(&beta)?, "B");

    let top = classifier.top_categories(&alpha, 2)?;
    assert_eq!(top[0].0, "A");
    assert!(top[0].1 > 0.8);
    Ok(())
}

#[test]
fn test_unknown_category_probability_is_zero() -> Result<()> {
    let mut classifier = CategoryClassifier::new(ClassifierConfig::with_dimensions(2, 128))?;
    classifier.train(&words("alpha"), "A")?;

    assert_eq!(classifier.category_probability(&words("alpha"), "Z")?, 0.0);

    // the unused second row still gets probability mass, but no category id
    let vector = classifier.encode(&words("alpha"));
    assert!(classifier.model().probability_of(&vector, 1)? > 0.0);
    assert_eq!(classifier.model().probability_of(&vector, 7)?, 0.0);
    Ok(())
}

#[test]
fn test_untrained_classifier_refuses_queries() {
    let classifier = CategoryClassifier::new(ClassifierConfig::default()).unwrap();
    assert!(!classifier.is_trained());
    assert!(matches!(
        classifier.top_categories(&words("anything"), 3),
        Err(FaqcatError::NotTrained)
    ));
}

#[test]
fn test_vector_of_wrong_size_is_rejected() -> Result<()> {
    let mut model = OnlineLogisticRegression::with_dimensions(2, 16)?;
    let vector = FeatureVector::from_entries(32, vec![(0, 1.0), (20, 2.0)])?;

    let err = model.train_step(0, &vector).unwrap_err();
    assert!(matches!(
        err,
        FaqcatError::DimensionMismatch {
            expected: 16,
            actual: 32
        }
    ));
    assert_eq!(model.step(), 0);
    assert!(model.classify(&vector).is_err());
    Ok(())
}

#[test]
fn test_growing_model_accepts_new_categories() -> Result<()> {
    let config = ClassifierConfig {
        category_growth: CategoryGrowth::Grow,
        ..ClassifierConfig::with_dimensions(1, 64)
    };
    let mut classifier = CategoryClassifier::new(config)?;
    for label in ["a", "b", "c"] {
        classifier.train(&words(label), label)?;
    }

    assert_eq!(classifier.model().num_categories(), 3);
    assert_eq!(classifier.classify(&words("a"))?.len(), 3);
    Ok(())
}

#[test]
fn test_saved_classifier_predicts_identically() -> Result<()> {
    let dir = TempDir::new()?;
    let model_path = dir.path().join("model.bin");
    let categories_path = dir.path().join("categories.bin");

    let documents = vec![
        Document::from_tokens(words("reset password login"), vec!["security".into()]),
        Document::from_tokens(words("refund invoice payment"), vec!["billing".into()]),
        Document::from_tokens(words("flight hotel luggage"), vec!["travel".into()]),
    ];
    let mut classifier = CategoryClassifier::from_documents(&documents, ClassifierConfig::default())?
        .with_weighting(TokenWeighting::TfIdf);
    Trainer::seeded(10, 5)?.fit(&mut classifier, &documents)?;
    classifier.save(&model_path, &categories_path)?;

    // weighting and corpus statistics travel with the model blob
    let restored = CategoryClassifier::load(&model_path, &categories_path)?;
    assert_eq!(restored.weighting(), TokenWeighting::TfIdf);
    assert_eq!(restored.corpus_stats(), classifier.corpus_stats());

    for query in ["forgot password", "hotel refund", "nothing known"] {
        let tokens = words(query);
        assert_eq!(restored.classify(&tokens)?, classifier.classify(&tokens)?);
    }
    assert_eq!(restored.model(), classifier.model());
    Ok(())
}

#[test]
fn test_encoder_and_model_compose_by_hand() -> Result<()> {
    let encoder = FeatureEncoder::new(256)?;
    let mut model = OnlineLogisticRegression::with_dimensions(2, 256)?;
    let weighting = TokenWeighting::default();
    let corpus = CorpusStats::new();

    let yes = encoder.encode(&words("yes please"), &weighting, &corpus);
    let no = encoder.encode(&words("no thanks"), &weighting, &corpus);
    for _ in 0..20 {
        model.train_step(0, &yes)?;
        model.train_step(1, &no)?;
    }

    assert_eq!(argmax(&model.classify(&yes)?), 0);
    assert_eq!(model.predict_category(&no)?, 1);
    Ok(())
}
