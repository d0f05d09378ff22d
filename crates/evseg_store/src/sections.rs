use std::fs;
use std::path::{Path, PathBuf};

use evseg_core::config::{SECTION_MDA, SECTION_RISK_FACTORS};
use evseg_core::domain::{Document, DocumentFailure};
use evseg_core::error::AppError;
use evseg_core::normalize::SECTION_NOT_FOUND;
use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::Date;
use tracing::{debug, info, warn};

/// What the acquisition step knows about one section of one filing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FetchedSection {
    pub raw_text: String,
    /// `YYYY-MM-DD`.
    pub filing_date: String,
    pub accession_id: String,
}

/// Acquisition boundary: `fetch_section(entity, section) -> section | NotFound`.
pub trait SectionSource {
    /// `Ok(None)` when the filing has no such section.
    fn fetch_section(
        &self,
        entity_id: &str,
        section_id: &str,
    ) -> Result<Option<FetchedSection>, AppError>;

    /// Entities this source can serve, in its own order.
    fn entities(&self) -> Vec<String>;
}

/// One row of `dataset_manifest.csv` as written by the filing scraper.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManifestRow {
    pub ticker: String,
    pub filing_date: String,
    pub accession_number: String,
    #[serde(default)]
    pub risk_factors_file: Option<String>,
    #[serde(default)]
    pub mda_file: Option<String>,
    #[serde(default)]
    pub has_risk_factors: Option<String>,
    #[serde(default)]
    pub has_mda: Option<String>,
}

fn flag_is_false(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|s| s.trim().to_ascii_lowercase()).as_deref(),
        Some("false") | Some("0") | Some("no")
    )
}

/// Sections backed by the scraper's manifest plus its per-section text files.
///
/// Each ticker maps to a single filing; when the manifest lists several, the one with the latest
/// `filing_date` is used. Relative file paths in the manifest resolve against the manifest's directory. Section ids
/// other than `RiskFactors` and `MDA` are looked up as `<ticker>_<filing_date>_<section>.txt`
/// next to the known files.
#[derive(Debug, Clone)]
pub struct ManifestSectionSource {
    root: PathBuf,
    rows: Vec<ManifestRow>,
}

impl ManifestSectionSource {
    pub fn open(manifest_path: &Path) -> Result<Self, AppError> {
        let raw = fs::read_to_string(manifest_path).map_err(|e| {
            AppError::new("SOURCE_MANIFEST_READ_FAILED", "Failed to read acquisition manifest")
                .with_details(format!("path={}; err={}", manifest_path.display(), e))
        })?;
        let root = manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let source = Self::from_csv_str(&raw, root)?;
        info!(
            manifest = %manifest_path.display(),
            entities = source.rows.len(),
            "loaded acquisition manifest"
        );
        Ok(source)
    }

    pub fn from_csv_str(csv_text: &str, root: PathBuf) -> Result<Self, AppError> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(csv_text.as_bytes());
        let mut rows = Vec::new();
        for (idx, row) in rdr.deserialize::<ManifestRow>().enumerate() {
            let row = row.map_err(|e| {
                AppError::new("SOURCE_MANIFEST_INVALID", "Failed to decode manifest row")
                    .with_details(format!("row={}; err={}", idx + 1, e))
            })?;
            if row.ticker.trim().is_empty() {
                return Err(AppError::new(
                    "SOURCE_MANIFEST_INVALID",
                    "Manifest row is missing a ticker",
                )
                .with_details(format!("row={}", idx + 1)));
            }
            match rows.iter().position(|r: &ManifestRow| r.ticker == row.ticker) {
                // One filing per entity: the latest date wins, a later row breaks ties.
                Some(pos) => {
                    let kept = &rows[pos];
                    if row.filing_date.trim() >= kept.filing_date.trim() {
                        warn!(
                            ticker = %row.ticker,
                            replaced = %kept.filing_date,
                            kept = %row.filing_date,
                            "duplicate manifest ticker"
                        );
                        rows[pos] = row;
                    } else {
                        warn!(
                            ticker = %row.ticker,
                            replaced = %row.filing_date,
                            kept = %kept.filing_date,
                            "duplicate manifest ticker"
                        );
                    }
                }
                None => rows.push(row),
            }
        }
        Ok(Self { root, rows })
    }

    pub fn rows(&self) -> &[ManifestRow] {
        &self.rows
    }

    fn row(&self, entity_id: &str) -> Option<&ManifestRow> {
        self.rows.iter().find(|r| r.ticker == entity_id)
    }

    fn resolve(&self, rel: &str) -> PathBuf {
        let p = PathBuf::from(rel);
        if p.is_absolute() {
            p
        } else {
            self.root.join(p)
        }
    }

    fn section_path(&self, row: &ManifestRow, section_id: &str) -> Option<PathBuf> {
        let (file, flag) = match section_id {
            SECTION_RISK_FACTORS => (row.risk_factors_file.as_deref(), row.has_risk_factors.as_deref()),
            SECTION_MDA => (row.mda_file.as_deref(), row.has_mda.as_deref()),
            _ => {
                let name = format!("{}_{}_{}.txt", row.ticker, row.filing_date, section_id);
                let dir = row
                    .risk_factors_file
                    .as_deref()
                    .or(row.mda_file.as_deref())
                    .and_then(|f| self.resolve(f).parent().map(Path::to_path_buf))
                    .unwrap_or_else(|| self.root.clone());
                return Some(dir.join(name));
            }
        };
        if flag_is_false(flag) {
            return None;
        }
        file.map(str::trim)
            .filter(|f| !f.is_empty())
            .map(|f| self.resolve(f))
    }
}

impl SectionSource for ManifestSectionSource {
    fn fetch_section(
        &self,
        entity_id: &str,
        section_id: &str,
    ) -> Result<Option<FetchedSection>, AppError> {
        let Some(row) = self.row(entity_id) else {
            return Ok(None);
        };
        let Some(path) = self.section_path(row, section_id) else {
            return Ok(None);
        };
        if !path.is_file() {
            debug!(entity = entity_id, section = section_id, path = %path.display(), "section file missing");
            return Ok(None);
        }
        let raw_text = fs::read_to_string(&path).map_err(|e| {
            AppError::new("SOURCE_SECTION_READ_FAILED", "Failed to read section text")
                .with_details(format!("path={}; err={}", path.display(), e))
        })?;
        let trimmed = raw_text.trim();
        if trimmed.is_empty() || trimmed == SECTION_NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(FetchedSection {
            raw_text,
            filing_date: row.filing_date.clone(),
            accession_id: row.accession_number.clone(),
        }))
    }

    fn entities(&self) -> Vec<String> {
        self.rows.iter().map(|r| r.ticker.clone()).collect()
    }
}

/// Four-digit year of a `YYYY-MM-DD` filing date.
pub fn period_from_filing_date(filing_date: &str) -> Result<String, AppError> {
    let fmt = format_description!("[year]-[month]-[day]");
    let date = Date::parse(filing_date.trim(), &fmt).map_err(|e| {
        AppError::new("SOURCE_FILING_DATE_INVALID", "Filing date is not YYYY-MM-DD")
            .with_details(format!("value={filing_date}; err={e}"))
    })?;
    Ok(format!("{:04}", date.year()))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MissingSection {
    pub entity_id: String,
    pub section_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoadedDocuments {
    pub documents: Vec<Document>,
    pub missing: Vec<MissingSection>,
    pub failures: Vec<DocumentFailure>,
}

/// Fetch every `(entity, section)` pair. A pair that cannot be fetched is recorded and skipped.
pub fn load_documents(
    source: &dyn SectionSource,
    entities: &[String],
    sections: &[String],
) -> LoadedDocuments {
    let mut out = LoadedDocuments::default();
    for entity_id in entities {
        for section_id in sections {
            let fetched = source
                .fetch_section(entity_id, section_id)
                .and_then(|f| match f {
                    Some(f) => period_from_filing_date(&f.filing_date).map(|p| Some((f, p))),
                    None => Ok(None),
                });
            match fetched {
                Ok(Some((f, period))) => out.documents.push(Document {
                    entity_id: entity_id.clone(),
                    period,
                    section_id: section_id.clone(),
                    raw_text: f.raw_text,
                    filing_date: Some(f.filing_date),
                    accession_id: Some(f.accession_id),
                }),
                Ok(None) => {
                    warn!(entity = %entity_id, section = %section_id, "section not found");
                    out.missing.push(MissingSection {
                        entity_id: entity_id.clone(),
                        section_id: section_id.clone(),
                    });
                }
                Err(error) => {
                    warn!(entity = %entity_id, section = %section_id, error = %error, "failed to fetch section");
                    out.failures.push(DocumentFailure {
                        entity_id: entity_id.clone(),
                        section_id: section_id.clone(),
                        error,
                    });
                }
            }
        }
    }
    out
}
