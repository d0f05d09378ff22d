use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use evseg_core::aggregate::group_by_entity;
use evseg_core::config::PipelineConfig;
use evseg_core::domain::EvidenceRecord;
use evseg_core::error::AppError;
use evseg_core::filter::TopicFilter;
use evseg_core::pipeline::{filter_evidence, run_documents, FilterSummary, PipelineOutcome};
use evseg_core::segment::UnicodeSentenceSource;
use evseg_store::evidence_csv::{read_records, write_records};
use evseg_store::export::{write_chunk_files, write_combined_files, write_export_manifest};
use evseg_store::sections::{load_documents, ManifestSectionSource, SectionSource};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

pub const SEGMENTED_CSV: &str = "segmented_evidence.csv";
pub const FILTERED_CSV: &str = "filtered_evidence.csv";
pub const CHUNKS_DIR: &str = "chunks";
pub const COMBINED_DIR: &str = "combined";

/// Split disclosure sections into provenance-tagged evidence chunks and keep the on-topic ones.
#[derive(Parser, Debug)]
#[command(name = "evseg", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,

    /// Pipeline config JSON. Flags below override its values.
    #[arg(long, global = true, env = "EVSEG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Worker threads for segmentation.
    #[arg(long, global = true)]
    pub jobs: Option<usize>,

    /// Target chunk length in characters.
    #[arg(long, global = true)]
    pub chunk_size: Option<usize>,

    /// Sentences carried from one chunk into the next.
    #[arg(long, global = true)]
    pub overlap: Option<usize>,

    /// Trailing chunks at or below this length are dropped.
    #[arg(long, global = true)]
    pub min_final: Option<usize>,

    /// Debug logging (RUST_LOG wins when set).
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Normalize, split and chunk sections listed in an acquisition manifest.
    Segment {
        #[arg(long)]
        manifest: PathBuf,
        /// Restrict to these entities. Defaults to every manifest row.
        #[arg(long = "entity")]
        entities: Vec<String>,
        /// Restrict to these sections. Defaults to the configured list.
        #[arg(long = "section")]
        sections: Vec<String>,
        #[arg(long)]
        out: PathBuf,
    },
    /// Keep on-topic records from an evidence CSV and optionally export text views.
    Filter {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        chunks_dir: Option<PathBuf>,
        #[arg(long)]
        combined_dir: Option<PathBuf>,
    },
    /// Segment, filter and export in one pass.
    Run {
        #[arg(long)]
        manifest: PathBuf,
        #[arg(long)]
        out_dir: PathBuf,
    },
}

pub fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

/// Config file (or defaults) with command-line overrides applied, then validated.
pub fn resolve_config(cli: &Cli) -> Result<PipelineConfig, AppError> {
    let mut cfg = match &cli.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(jobs) = cli.jobs {
        cfg.jobs = jobs;
    }
    if let Some(size) = cli.chunk_size {
        cfg.chunking.chunk_size = size;
    }
    if let Some(overlap) = cli.overlap {
        cfg.chunking.overlap_sentences = overlap;
    }
    if let Some(min_final) = cli.min_final {
        cfg.chunking.min_final_chunk_length = min_final;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn now_rfc3339_utc() -> Result<String, AppError> {
    OffsetDateTime::now_utc().format(&Rfc3339).map_err(|e| {
        AppError::new("EXPORT_TIME_FAILED", "Failed to format export time").with_details(e.to_string())
    })
}

#[derive(Debug, Clone)]
pub struct SegmentReport {
    pub outcome: PipelineOutcome,
    pub missing_sections: usize,
    pub unloadable_sections: usize,
}

/// Acquisition plus the per-document stage. Nothing is written.
pub fn segment_manifest(
    cfg: &PipelineConfig,
    manifest: &Path,
    entities: &[String],
    sections: &[String],
) -> Result<SegmentReport, AppError> {
    let source = ManifestSectionSource::open(manifest)?;
    let entities = if entities.is_empty() {
        source.entities()
    } else {
        entities.to_vec()
    };
    let sections = if sections.is_empty() {
        cfg.sections.clone()
    } else {
        sections.to_vec()
    };

    let loaded = load_documents(&source, &entities, &sections);
    let splitter = UnicodeSentenceSource::new(cfg.segmentation);
    let mut outcome = run_documents(&loaded.documents, &splitter, &cfg.chunking, cfg.jobs);
    let unloadable_sections = loaded.failures.len();
    outcome.failures.extend(loaded.failures);

    Ok(SegmentReport {
        outcome,
        missing_sections: loaded.missing.len(),
        unloadable_sections,
    })
}

#[derive(Debug, Clone)]
pub struct FilterReport {
    pub retained: Vec<EvidenceRecord>,
    pub summary: FilterSummary,
    pub exported_files: Vec<PathBuf>,
}

/// Filter `records` and write the kept ones to `out`, plus the optional text views.
pub fn filter_and_export(
    cfg: &PipelineConfig,
    records: &[EvidenceRecord],
    out: &Path,
    chunks_dir: Option<&Path>,
    combined_dir: Option<&Path>,
) -> Result<FilterReport, AppError> {
    let filter = TopicFilter::new(&cfg.topics)?;
    let (retained, summary) = filter_evidence(records, &filter);
    write_records(out, &retained)?;

    let mut exported_files = Vec::new();
    if let Some(dir) = chunks_dir {
        exported_files.extend(write_chunk_files(dir, &retained)?);
    }
    if let Some(dir) = combined_dir {
        let groups = group_by_entity(&retained, cfg.group_order);
        exported_files.extend(write_combined_files(dir, &groups, filter.label())?);
    }
    Ok(FilterReport {
        retained,
        summary,
        exported_files,
    })
}

fn log_pattern_hits(summary: &FilterSummary) {
    for hit in summary.pattern_hits.iter().filter(|h| h.records > 0) {
        info!(pattern = %hit.pattern, records = hit.records, "pattern hits");
    }
}

fn log_segment_report(report: &SegmentReport) {
    if !report.outcome.failures.is_empty() {
        warn!(
            failures = report.outcome.failures.len(),
            unloadable_sections = report.unloadable_sections,
            "some documents were skipped"
        );
    }
    info!(
        documents = report.outcome.documents_processed,
        records = report.outcome.records.len(),
        missing_sections = report.missing_sections,
        "manifest sections segmented"
    );
}

/// Full pass into `out_dir`: both CSVs, the two text views and an export manifest.
pub fn run_all(cfg: &PipelineConfig, manifest: &Path, out_dir: &Path) -> Result<FilterReport, AppError> {
    let report = segment_manifest(cfg, manifest, &[], &[])?;
    log_segment_report(&report);

    let segmented = out_dir.join(SEGMENTED_CSV);
    write_records(&segmented, &report.outcome.records)?;

    let filtered_path = out_dir.join(FILTERED_CSV);
    let filtered = filter_and_export(
        cfg,
        &report.outcome.records,
        &filtered_path,
        Some(&out_dir.join(CHUNKS_DIR)),
        Some(&out_dir.join(COMBINED_DIR)),
    )?;
    log_pattern_hits(&filtered.summary);

    let mut files = vec![segmented, filtered_path];
    files.extend(filtered.exported_files.iter().cloned());
    let entity_count = group_by_entity(&filtered.retained, cfg.group_order).len();
    let export_time = now_rfc3339_utc()?;
    write_export_manifest(
        out_dir,
        &files,
        &export_time,
        &cfg.topics.label,
        filtered.retained.len(),
        entity_count,
    )?;
    info!(out_dir = %out_dir.display(), files = files.len(), "export complete");
    Ok(filtered)
}

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let cfg = resolve_config(&cli).context("invalid pipeline configuration")?;

    match &cli.cmd {
        Command::Segment {
            manifest,
            entities,
            sections,
            out,
        } => {
            let report = segment_manifest(&cfg, manifest, entities, sections)?;
            log_segment_report(&report);
            write_records(out, &report.outcome.records)?;
        }
        Command::Filter {
            input,
            out,
            chunks_dir,
            combined_dir,
        } => {
            let records = read_records(input)?;
            let report =
                filter_and_export(&cfg, &records, out, chunks_dir.as_deref(), combined_dir.as_deref())?;
            log_pattern_hits(&report.summary);
        }
        Command::Run { manifest, out_dir } => {
            run_all(&cfg, manifest, out_dir)
                .with_context(|| format!("pipeline run into {} failed", out_dir.display()))?;
        }
    }
    Ok(())
}
