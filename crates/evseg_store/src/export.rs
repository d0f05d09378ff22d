use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use evseg_core::domain::{EntityGroup, EvidenceRecord};
use evseg_core::error::AppError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

pub const EXPORT_MANIFEST_FILENAME: &str = "export_manifest.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExportManifest {
    pub manifest_version: u32,
    pub export_time: String,
    pub topic_label: String,
    pub record_count: usize,
    pub entity_count: usize,
    pub files: Vec<ExportFileInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExportFileInfo {
    /// Relative to the manifest directory, `/`-separated.
    pub filename: String,
    pub bytes: u64,
    pub sha256: String,
}

/// Keep identifiers usable as file names on every platform.
pub fn filename_safe(id: &str) -> String {
    id.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '-' | '.' => c,
            _ => '_',
        })
        .collect()
}

/// Map each id to `<safe id><suffix>`, failing before anything is written when two ids would
/// share a file.
fn planned_names<'a>(
    ids: impl Iterator<Item = &'a str>,
    suffix: &str,
) -> Result<Vec<String>, AppError> {
    let mut owners: HashMap<String, &str> = HashMap::new();
    let mut names = Vec::new();
    for id in ids {
        let name = format!("{}{suffix}", filename_safe(id));
        if let Some(prev) = owners.insert(name.clone(), id) {
            return Err(AppError::new(
                "STORE_FILENAME_COLLISION",
                "Two identifiers map to the same export file",
            )
            .with_details(format!("file={name}; ids={prev},{id}")));
        }
        names.push(name);
    }
    Ok(names)
}

fn ensure_dir(dir: &Path) -> Result<(), AppError> {
    fs::create_dir_all(dir).map_err(|e| {
        AppError::new("STORE_WRITE_FAILED", "Failed to create export directory")
            .with_details(format!("path={}; err={}", dir.display(), e))
    })
}

fn write_text(path: &Path, text: &str) -> Result<(), AppError> {
    fs::write(path, text.as_bytes()).map_err(|e| {
        AppError::new("STORE_WRITE_FAILED", "Failed to write export file")
            .with_details(format!("path={}; err={}", path.display(), e))
    })
}

/// One `<evidence_id>.txt` per record holding just its evidence text.
pub fn write_chunk_files(dir: &Path, records: &[EvidenceRecord]) -> Result<Vec<PathBuf>, AppError> {
    let names = planned_names(records.iter().map(|r| r.evidence_id.as_str()), ".txt")?;
    ensure_dir(dir)?;
    let mut written = Vec::with_capacity(records.len());
    for (rec, name) in records.iter().zip(names) {
        let path = dir.join(name);
        write_text(&path, &rec.evidence_text)?;
        written.push(path);
    }
    info!(dir = %dir.display(), files = written.len(), "wrote per-chunk files");
    Ok(written)
}

/// Scrollable per-entity view: a heading, then every record under its evidence id.
pub fn render_combined(group: &EntityGroup, topic_label: &str) -> String {
    let mut out = format!("=== {topic_label} EVIDENCE FOR {} ===\n\n", group.entity_id);
    for rec in &group.records {
        out.push_str(&format!("--- {} ---\n", rec.evidence_id));
        out.push_str(&rec.evidence_text);
        out.push_str("\n\n");
    }
    out
}

/// `<entity_id>_combined_evidence.txt` per group.
pub fn write_combined_files(
    dir: &Path,
    groups: &[EntityGroup],
    topic_label: &str,
) -> Result<Vec<PathBuf>, AppError> {
    let names = planned_names(
        groups.iter().map(|g| g.entity_id.as_str()),
        "_combined_evidence.txt",
    )?;
    ensure_dir(dir)?;
    let mut written = Vec::with_capacity(groups.len());
    for (group, name) in groups.iter().zip(names) {
        let path = dir.join(name);
        write_text(&path, &render_combined(group, topic_label))?;
        written.push(path);
    }
    info!(dir = %dir.display(), files = written.len(), "wrote combined entity files");
    Ok(written)
}

fn sha256_file_hex(path: &Path) -> Result<(String, u64), AppError> {
    let mut f = fs::File::open(path).map_err(|e| {
        AppError::new("STORE_READ_FAILED", "Failed to open file for hashing")
            .with_details(format!("path={}: {}", path.display(), e))
    })?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    let mut total: u64 = 0;
    loop {
        let n = f.read(&mut buf).map_err(|e| {
            AppError::new("STORE_READ_FAILED", "Failed to read file for hashing")
                .with_details(format!("path={}: {}", path.display(), e))
        })?;
        if n == 0 {
            break;
        }
        total += n as u64;
        hasher.update(&buf[..n]);
    }
    Ok((hex::encode(hasher.finalize()), total))
}

fn relative_name(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Hash every file in `files` and write [`EXPORT_MANIFEST_FILENAME`] into `root`.
///
/// Files are listed sorted by relative name so the manifest is stable across runs.
pub fn write_export_manifest(
    root: &Path,
    files: &[PathBuf],
    export_time: &str,
    topic_label: &str,
    record_count: usize,
    entity_count: usize,
) -> Result<ExportManifest, AppError> {
    ensure_dir(root)?;
    let mut infos = Vec::with_capacity(files.len());
    for path in files {
        let (sha256, bytes) = sha256_file_hex(path)?;
        infos.push(ExportFileInfo {
            filename: relative_name(root, path),
            bytes,
            sha256,
        });
    }
    infos.sort_by(|a, b| a.filename.cmp(&b.filename));

    let manifest = ExportManifest {
        manifest_version: 1,
        export_time: export_time.to_string(),
        topic_label: topic_label.to_string(),
        record_count,
        entity_count,
        files: infos,
    };
    let json = serde_json::to_string_pretty(&manifest).map_err(|e| {
        AppError::new("STORE_ENCODE_FAILED", "Failed to encode export manifest")
            .with_details(e.to_string())
    })?;
    write_text(&root.join(EXPORT_MANIFEST_FILENAME), &json)?;
    Ok(manifest)
}
