use std::fs;
use std::path::Path;

use evseg_core::domain::EvidenceRecord;
use evseg_core::error::AppError;
use tracing::info;

pub const EVIDENCE_COLUMNS: [&str; 5] = [
    "evidence_id",
    "entity_id",
    "period",
    "section_id",
    "evidence_text",
];

/// Encode records as CSV with the [`EVIDENCE_COLUMNS`] header.
pub fn records_to_csv(records: &[EvidenceRecord]) -> Result<String, AppError> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    if records.is_empty() {
        // serde only emits a header alongside the first row.
        wtr.write_record(EVIDENCE_COLUMNS).map_err(|e| {
            AppError::new("STORE_ENCODE_FAILED", "Failed to encode evidence header")
                .with_details(e.to_string())
        })?;
    }
    for rec in records {
        wtr.serialize(rec).map_err(|e| {
            AppError::new("STORE_ENCODE_FAILED", "Failed to encode evidence record")
                .with_details(format!("evidence_id={}; err={}", rec.evidence_id, e))
        })?;
    }
    let bytes = wtr.into_inner().map_err(|e| {
        AppError::new("STORE_ENCODE_FAILED", "Failed to flush evidence CSV")
            .with_details(e.to_string())
    })?;
    String::from_utf8(bytes).map_err(|e| {
        AppError::new("STORE_ENCODE_FAILED", "Evidence CSV is not valid UTF-8")
            .with_details(e.to_string())
    })
}

/// Decode evidence CSV. Rows missing `evidence_text` decode with empty text.
pub fn records_from_csv(csv_text: &str) -> Result<Vec<EvidenceRecord>, AppError> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(csv_text.as_bytes());
    let mut out = Vec::new();
    for (idx, row) in rdr.deserialize::<EvidenceRecord>().enumerate() {
        let rec = row.map_err(|e| {
            AppError::new("STORE_DECODE_FAILED", "Failed to decode evidence row")
                .with_details(format!("row={}; err={}", idx + 1, e))
        })?;
        out.push(rec);
    }
    Ok(out)
}

/// Write `records` to `path`, replacing any previous file atomically.
pub fn write_records(path: &Path, records: &[EvidenceRecord]) -> Result<(), AppError> {
    let csv_text = records_to_csv(records)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            AppError::new("STORE_WRITE_FAILED", "Failed to create evidence output directory")
                .with_details(format!("path={}; err={}", parent.display(), e))
        })?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, csv_text.as_bytes()).map_err(|e| {
        AppError::new("STORE_WRITE_FAILED", "Failed to write evidence CSV")
            .with_details(format!("path={}; err={}", tmp.display(), e))
    })?;
    fs::rename(&tmp, path).map_err(|e| {
        AppError::new("STORE_WRITE_FAILED", "Failed to finalize evidence CSV write")
            .with_details(format!("tmp={}; dest={}; err={}", tmp.display(), path.display(), e))
    })?;
    info!(path = %path.display(), records = records.len(), "wrote evidence CSV");
    Ok(())
}

pub fn read_records(path: &Path) -> Result<Vec<EvidenceRecord>, AppError> {
    let raw = fs::read_to_string(path).map_err(|e| {
        AppError::new("STORE_READ_FAILED", "Failed to read evidence CSV")
            .with_details(format!("path={}; err={}", path.display(), e))
    })?;
    let records = records_from_csv(&raw)?;
    info!(path = %path.display(), records = records.len(), "loaded evidence CSV");
    Ok(records)
}
