use serde::{Deserialize, Serialize};

/// One fetched section of one filing, as handed to the segmentation pipeline.
///
/// Notes:
/// - Identity (`entity_id`, `period`, `section_id`) is fixed at acquisition time and flows
///   through every later stage unchanged; nothing downstream re-derives it from file names.
/// - `raw_text` is the un-normalized section body. The sentinel `SECTION NOT FOUND` is allowed
///   and normalizes to empty text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    pub entity_id: String,
    /// Four-digit filing year.
    pub period: String,
    pub section_id: String,
    pub raw_text: String,
    pub filing_date: Option<String>,
    pub accession_id: Option<String>,
}

impl Document {
    pub fn new(
        entity_id: impl Into<String>,
        period: impl Into<String>,
        section_id: impl Into<String>,
        raw_text: impl Into<String>,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            period: period.into(),
            section_id: section_id.into(),
            raw_text: raw_text.into(),
            filing_date: None,
            accession_id: None,
        }
    }

    /// Short `entity/section` label used in logs and failure reports.
    pub fn label(&self) -> String {
        format!("{}/{}", self.entity_id, self.section_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sentence {
    pub text: String,
    /// Document-local position as produced by the sentence source.
    pub order_index: usize,
}

impl Sentence {
    /// Length in characters, the unit every size bound is expressed in.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// A sentence-aligned window of one document. Never empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    pub sentences: Vec<Sentence>,
    pub sequence_index: usize,
}

impl Chunk {
    /// Sentences joined with a single space.
    pub fn text(&self) -> String {
        let parts: Vec<&str> = self.sentences.iter().map(|s| s.text.as_str()).collect();
        parts.join(" ")
    }

    pub fn char_len(&self) -> usize {
        self.text().chars().count()
    }
}

/// The unit of output data. Field order matches the serialized column order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EvidenceRecord {
    pub evidence_id: String,
    pub entity_id: String,
    pub period: String,
    pub section_id: String,
    #[serde(default)]
    pub evidence_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntityGroup {
    pub entity_id: String,
    pub records: Vec<EvidenceRecord>,
}

/// A document that was skipped, with the reason. Other documents are unaffected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentFailure {
    pub entity_id: String,
    pub section_id: String,
    pub error: crate::error::AppError,
}
