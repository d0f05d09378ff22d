use std::any::Any;
use std::cmp::Ordering;
use std::panic::{self, AssertUnwindSafe};
use std::thread;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::aggregate::{group_by_entity, GroupOrder};
use crate::assemble::assemble;
use crate::chunking::{ChunkBuilder, ChunkingConfig};
use crate::domain::{Document, DocumentFailure, EntityGroup, EvidenceRecord};
use crate::error::AppError;
use crate::filter::TopicFilter;
use crate::normalize::normalize;
use crate::segment::{sentences_for, SentenceSource};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PipelineOutcome {
    /// Ordered by entity id, period, section id, then sequence index.
    pub records: Vec<EvidenceRecord>,
    pub failures: Vec<DocumentFailure>,
    pub documents_processed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatternHits {
    pub pattern: String,
    /// Retained records containing at least one match.
    pub records: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilterSummary {
    pub total: usize,
    pub retained: usize,
    /// Share of records dropped by the filter, 0.0 for an empty input.
    pub noise_removed_pct: f64,
    pub pattern_hits: Vec<PatternHits>,
}

/// Normalize, split, chunk and assemble one document.
pub fn process_document(
    doc: &Document,
    source: &dyn SentenceSource,
    chunking: &ChunkingConfig,
) -> Result<Vec<EvidenceRecord>, AppError> {
    let text = normalize(&doc.raw_text);
    let sentences = sentences_for(source, &text)?;
    let chunks = ChunkBuilder::new(*chunking).build(&sentences);
    debug!(
        document = %doc.label(),
        bytes = text.len(),
        sentences = sentences.len(),
        chunks = chunks.len(),
        "segmented document"
    );
    Ok(assemble(&chunks, &doc.entity_id, &doc.period, &doc.section_id))
}

type DocResult = (usize, Result<Vec<EvidenceRecord>, AppError>);

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

/// [`process_document`] with a panic turned into a failure of this document alone.
fn process_isolated(
    doc: &Document,
    source: &dyn SentenceSource,
    chunking: &ChunkingConfig,
) -> Result<Vec<EvidenceRecord>, AppError> {
    panic::catch_unwind(AssertUnwindSafe(|| process_document(doc, source, chunking)))
        .unwrap_or_else(|payload| {
            Err(AppError::new("PIPELINE_WORKER_FAILED", "Document processing panicked")
                .with_details(format!("document={}; panic={}", doc.label(), panic_message(&*payload))))
        })
}

fn run_inline(
    docs: &[Document],
    offset: usize,
    source: &dyn SentenceSource,
    chunking: &ChunkingConfig,
) -> Vec<DocResult> {
    docs.iter()
        .enumerate()
        .map(|(i, d)| (offset + i, process_isolated(d, source, chunking)))
        .collect()
}

fn run_workers(
    docs: &[Document],
    source: &dyn SentenceSource,
    chunking: &ChunkingConfig,
    jobs: usize,
) -> Vec<DocResult> {
    let per_worker = docs.len().div_ceil(jobs);
    thread::scope(|scope| {
        let handles: Vec<_> = docs
            .chunks(per_worker)
            .enumerate()
            .map(|(w, batch)| {
                let offset = w * per_worker;
                scope.spawn(move || run_inline(batch, offset, source, chunking))
            })
            .collect();

        // Workers catch per-document panics, so a join can only fail while building results.
        let mut out = Vec::with_capacity(docs.len());
        for handle in handles {
            match handle.join() {
                Ok(results) => out.extend(results),
                Err(payload) => panic::resume_unwind(payload),
            }
        }
        out
    })
}

fn document_order(a: &Document, b: &Document) -> Ordering {
    a.entity_id
        .cmp(&b.entity_id)
        .then(a.period.cmp(&b.period))
        .then(a.section_id.cmp(&b.section_id))
}

/// Run every document through the per-document stage.
///
/// Documents are independent: a failing document is reported in `failures` and skipped, and
/// never affects records produced for the others. With `jobs > 1` documents are spread over
/// scoped worker threads; output ordering does not depend on `jobs`.
pub fn run_documents(
    docs: &[Document],
    source: &dyn SentenceSource,
    chunking: &ChunkingConfig,
    jobs: usize,
) -> PipelineOutcome {
    info!(documents = docs.len(), jobs, "segmenting documents");

    let mut results = if jobs <= 1 || docs.len() <= 1 {
        run_inline(docs, 0, source, chunking)
    } else {
        run_workers(docs, source, chunking, jobs)
    };
    results.sort_by(|(ia, _), (ib, _)| document_order(&docs[*ia], &docs[*ib]).then(ia.cmp(ib)));

    let mut records = Vec::new();
    let mut failures = Vec::new();
    let mut documents_processed = 0;
    for (idx, result) in results {
        let doc = &docs[idx];
        match result {
            Ok(recs) => {
                documents_processed += 1;
                records.extend(recs);
            }
            Err(error) => {
                warn!(document = %doc.label(), error = %error, "skipping document");
                failures.push(DocumentFailure {
                    entity_id: doc.entity_id.clone(),
                    section_id: doc.section_id.clone(),
                    error,
                });
            }
        }
    }

    info!(
        processed = documents_processed,
        failed = failures.len(),
        records = records.len(),
        "segmentation finished"
    );
    PipelineOutcome {
        records,
        failures,
        documents_processed,
    }
}

/// Apply `filter` and summarize what it kept.
pub fn filter_evidence(
    records: &[EvidenceRecord],
    filter: &TopicFilter,
) -> (Vec<EvidenceRecord>, FilterSummary) {
    let mut hits = vec![0usize; filter.patterns().len()];
    let mut retained = Vec::new();
    for rec in records {
        let matched = filter.matched_patterns(&rec.evidence_text);
        if matched.is_empty() {
            continue;
        }
        for idx in matched {
            hits[idx] += 1;
        }
        retained.push(rec.clone());
    }

    let total = records.len();
    let noise_removed_pct = if total == 0 {
        0.0
    } else {
        (1.0 - retained.len() as f64 / total as f64) * 100.0
    };
    let summary = FilterSummary {
        total,
        retained: retained.len(),
        noise_removed_pct,
        pattern_hits: filter
            .patterns()
            .iter()
            .zip(hits)
            .map(|(pattern, records)| PatternHits {
                pattern: pattern.clone(),
                records,
            })
            .collect(),
    };
    info!(
        total,
        retained = summary.retained,
        noise_removed_pct,
        topic = filter.label(),
        "filtered evidence"
    );
    (retained, summary)
}

/// [`filter_evidence`] followed by [`group_by_entity`].
pub fn filter_and_group(
    records: &[EvidenceRecord],
    filter: &TopicFilter,
    order: GroupOrder,
) -> (Vec<EntityGroup>, FilterSummary) {
    let (retained, summary) = filter_evidence(records, filter);
    (group_by_entity(&retained, order), summary)
}
