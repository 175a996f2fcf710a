//! Criterion benchmarks for faqcat.
//!
//! Covers the hot paths of training and inference:
//! - Text analysis
//! - Feature hashing
//! - Single training steps and classification

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use faqcat::analysis::{Analyzer, TokenizerOption};
use faqcat::config::ClassifierConfig;
use faqcat::ml::{CorpusStats, FeatureEncoder, OnlineLogisticRegression, TokenWeighting};
use std::hint::black_box;

/// Generate test documents for benchmarking.
fn generate_test_documents(count: usize) -> Vec<String> {
    let words = [
        "account", "password", "reset", "login", "invoice", "payment", "refund", "charge",
        "flight", "hotel", "luggage", "booking", "cancel", "change", "email", "phone",
        "verify", "address", "card", "limit", "transfer", "balance", "statement", "support",
    ];

    let mut documents = Vec::with_capacity(count);
    for i in 0..count {
        let doc_length = 20 + (i % 60);
        let doc_words: Vec<&str> = (0..doc_length)
            .map(|j| words[(i * 7 + j * 13) % words.len()])
            .collect();
        documents.push(doc_words.join(" "));
    }

    documents
}

/// Benchmark tokenization with both fitted analyzers.
fn bench_text_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("text_analysis");
    let texts = generate_test_documents(100);

    for option in [TokenizerOption::Standard, TokenizerOption::UnicodeWords] {
        let analyzer = option.analyzer().unwrap();
        group.throughput(Throughput::Elements(texts.len() as u64));
        group.bench_function(BenchmarkId::new("analyze_batch", option), |b| {
            b.iter(|| {
                for text in &texts {
                    let _ = black_box(analyzer.analyze_to_strings(black_box(text)));
                }
            })
        });
    }

    group.finish();
}

/// Benchmark feature hashing.
fn bench_encoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("encoding");
    let analyzer = TokenizerOption::UnicodeWords.analyzer().unwrap();
    let token_sets: Vec<Vec<String>> = generate_test_documents(100)
        .iter()
        .map(|text| analyzer.analyze_to_strings(text).unwrap())
        .collect();
    let corpus = CorpusStats::from_token_sets(token_sets.iter());
    let encoder = FeatureEncoder::new(10_000).unwrap();

    for weighting in [TokenWeighting::default(), TokenWeighting::TfIdf] {
        group.bench_function(format!("{weighting:?}"), |b| {
            b.iter(|| {
                for tokens in &token_sets {
                    black_box(encoder.encode(black_box(tokens), &weighting, &corpus));
                }
            })
        });
    }

    group.finish();
}

/// Benchmark training steps and classification at several category counts.
fn bench_model(c: &mut Criterion) {
    let mut group = c.benchmark_group("model");
    let analyzer = TokenizerOption::UnicodeWords.analyzer().unwrap();
    let encoder = FeatureEncoder::new(10_000).unwrap();
    let vectors: Vec<_> = generate_test_documents(100)
        .iter()
        .map(|text| {
            let tokens = analyzer.analyze_to_strings(text).unwrap();
            encoder.encode(&tokens, &TokenWeighting::default(), &CorpusStats::new())
        })
        .collect();

    for categories in [10, 100] {
        let config = ClassifierConfig::with_dimensions(categories, 10_000);

        group.bench_with_input(
            BenchmarkId::new("train_step", categories),
            &categories,
            |b, &categories| {
                let mut model = OnlineLogisticRegression::new(config.clone()).unwrap();
                let mut i = 0;
                b.iter(|| {
                    model.train_step(i % categories, &vectors[i % vectors.len()]).unwrap();
                    i += 1;
                })
            },
        );

        let mut trained = OnlineLogisticRegression::new(config.clone()).unwrap();
        for (i, vector) in vectors.iter().enumerate() {
            trained.train_step(i % categories, vector).unwrap();
        }
        group.bench_with_input(BenchmarkId::new("classify", categories), &trained, |b, model| {
            b.iter(|| black_box(model.classify(black_box(&vectors[0])).unwrap()))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_text_analysis, bench_encoding, bench_model);
criterion_main!(benches);
