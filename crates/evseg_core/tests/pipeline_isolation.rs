use evseg_core::chunking::ChunkingConfig;
use evseg_core::domain::Document;
use evseg_core::error::AppError;
use evseg_core::pipeline::{process_document, run_documents};
use evseg_core::segment::{SegmentationConfig, SentenceSource, UnicodeSentenceSource};
use pretty_assertions::assert_eq;

/// Splits like the default source but refuses any text mentioning `POISON`.
struct PoisonedSource {
    inner: UnicodeSentenceSource,
}

impl SentenceSource for PoisonedSource {
    fn split(&self, text: &str) -> Result<Vec<String>, AppError> {
        if text.contains("POISON") {
            return Err(AppError::new("SEGMENT_TEXT_TOO_LONG", "refused"));
        }
        self.inner.split(text)
    }
}

/// Panics mid-split on any text mentioning `DETONATE`.
struct PanickingSource {
    inner: UnicodeSentenceSource,
}

impl SentenceSource for PanickingSource {
    fn split(&self, text: &str) -> Result<Vec<String>, AppError> {
        if text.contains("DETONATE") {
            panic!("splitter crashed");
        }
        self.inner.split(text)
    }
}

fn body(entity: &str, sentences: usize) -> String {
    (0..sentences)
        .map(|i| format!("{entity} reports climate item number {i} in this filing section."))
        .collect::<Vec<_>>()
        .join(" ")
}

fn corpus() -> Vec<Document> {
    vec![
        Document::new("XOM", "2024", "RiskFactors", body("Exxon", 40)),
        Document::new("CVX", "2024", "MDA", "POISON pill text. More words here."),
        Document::new("CVX", "2024", "RiskFactors", body("Chevron", 25)),
        Document::new("APA", "2023", "MDA", "SECTION NOT FOUND"),
        Document::new("APA", "2023", "RiskFactors", body("Apache", 12)),
    ]
}

#[test]
fn process_document_tags_every_record() {
    let source = UnicodeSentenceSource::default();
    let doc = Document::new(
        "XOM",
        "2024",
        "RiskFactors",
        "Regu-\nlations may change.\nPage 7\nWe report scope 1 emissions annually.",
    );
    let records = process_document(&doc, &source, &ChunkingConfig::default()).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].evidence_id, "XOM_RiskFactors_0");
    assert_eq!(
        records[0].evidence_text,
        "[XOM | 2024 | RiskFactors] Regulations may change. We report scope 1 emissions annually."
    );
}

#[test]
fn failing_document_is_skipped_without_touching_others() {
    let source = PoisonedSource {
        inner: UnicodeSentenceSource::default(),
    };
    let docs = corpus();
    let outcome = run_documents(&docs, &source, &ChunkingConfig::default(), 1);

    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].entity_id, "CVX");
    assert_eq!(outcome.failures[0].section_id, "MDA");
    assert!(outcome.failures[0].error.is_segmentation_failure());
    assert_eq!(outcome.documents_processed, 4);

    // Healthy documents produce exactly what they produce on their own.
    for doc in docs.iter().filter(|d| !d.raw_text.contains("POISON")) {
        let alone = process_document(doc, &source, &ChunkingConfig::default()).unwrap();
        let in_run: Vec<_> = outcome
            .records
            .iter()
            .filter(|r| r.entity_id == doc.entity_id && r.section_id == doc.section_id)
            .cloned()
            .collect();
        assert_eq!(in_run, alone);
    }
}

#[test]
fn output_is_ordered_by_entity_period_section_and_sequence() {
    let source = UnicodeSentenceSource::default();
    let outcome = run_documents(&corpus(), &source, &ChunkingConfig::default(), 1);
    let keys: Vec<(String, String, String)> = outcome
        .records
        .iter()
        .map(|r| (r.entity_id.clone(), r.period.clone(), r.section_id.clone()))
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);

    let xom: Vec<&str> = outcome
        .records
        .iter()
        .filter(|r| r.entity_id == "XOM")
        .map(|r| r.evidence_id.as_str())
        .collect();
    let expected: Vec<String> = (0..xom.len()).map(|i| format!("XOM_RiskFactors_{i}")).collect();
    assert_eq!(xom, expected);
}

#[test]
fn parallel_run_matches_sequential_run() {
    let source = PoisonedSource {
        inner: UnicodeSentenceSource::new(SegmentationConfig::default()),
    };
    let docs = corpus();
    let chunking = ChunkingConfig {
        chunk_size: 300,
        overlap_sentences: 1,
        min_final_chunk_length: 50,
    };
    let sequential = run_documents(&docs, &source, &chunking, 1);
    for jobs in [2, 3, 8] {
        let parallel = run_documents(&docs, &source, &chunking, jobs);
        assert_eq!(parallel, sequential, "jobs={jobs}");
    }
}

#[test]
fn empty_and_sentinel_sections_yield_no_records() {
    let source = UnicodeSentenceSource::default();
    let docs = vec![
        Document::new("PSX", "2024", "MDA", "SECTION NOT FOUND"),
        Document::new("PSX", "2024", "RiskFactors", "   "),
    ];
    let outcome = run_documents(&docs, &source, &ChunkingConfig::default(), 2);
    assert!(outcome.records.is_empty());
    assert!(outcome.failures.is_empty());
    assert_eq!(outcome.documents_processed, 2);
}

#[test]
fn panicking_document_fails_alone_at_any_job_count() {
    let source = PanickingSource {
        inner: UnicodeSentenceSource::default(),
    };
    let docs = vec![
        Document::new("AAA", "2024", "MDA", body("Alpha", 10)),
        Document::new("BBB", "2024", "MDA", "DETONATE now. Then more text follows here."),
        Document::new("CCC", "2024", "MDA", body("Gamma", 10)),
        Document::new("DDD", "2024", "MDA", body("Delta", 10)),
    ];
    for jobs in [1, 2, 4] {
        let outcome = run_documents(&docs, &source, &ChunkingConfig::default(), jobs);
        assert_eq!(outcome.documents_processed, 3, "jobs={jobs}");
        let failed: Vec<&str> = outcome.failures.iter().map(|f| f.entity_id.as_str()).collect();
        assert_eq!(failed, vec!["BBB"], "jobs={jobs}");
        assert_eq!(outcome.failures[0].error.code, "PIPELINE_WORKER_FAILED");

        let mut entities: Vec<&str> = outcome.records.iter().map(|r| r.entity_id.as_str()).collect();
        entities.dedup();
        assert_eq!(entities, vec!["AAA", "CCC", "DDD"], "jobs={jobs}");
    }
}
