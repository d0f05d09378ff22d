use crate::domain::{Chunk, EvidenceRecord};

/// `[entity | period | section]`, prefixed to every evidence text.
pub fn provenance_tag(entity_id: &str, period: &str, section_id: &str) -> String {
    format!("[{entity_id} | {period} | {section_id}]")
}

/// `entity_section_sequence`. Unique within one document only.
pub fn evidence_id(entity_id: &str, section_id: &str, sequence_index: usize) -> String {
    format!("{entity_id}_{section_id}_{sequence_index}")
}

/// One evidence record per chunk, in chunk order.
pub fn assemble(
    chunks: &[Chunk],
    entity_id: &str,
    period: &str,
    section_id: &str,
) -> Vec<EvidenceRecord> {
    let tag = provenance_tag(entity_id, period, section_id);
    chunks
        .iter()
        .map(|chunk| EvidenceRecord {
            evidence_id: evidence_id(entity_id, section_id, chunk.sequence_index),
            entity_id: entity_id.to_string(),
            period: period.to_string(),
            section_id: section_id.to_string(),
            evidence_text: format!("{tag} {}", chunk.text()),
        })
        .collect()
}
