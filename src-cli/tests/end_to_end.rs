use std::fs;

use tempfile::tempdir;

use evseg_core::config::PipelineConfig;
use evseg_lib::{run_all, CHUNKS_DIR, COMBINED_DIR, FILTERED_CSV, SEGMENTED_CSV};
use evseg_store::evidence_csv::read_records;
use evseg_store::export::{ExportManifest, EXPORT_MANIFEST_FILENAME};

#[test]
fn run_all_segments_filters_and_exports() {
    let tmp = tempdir().unwrap();
    let data = tmp.path().join("data");
    fs::create_dir_all(&data).unwrap();
    fs::write(
        tmp.path().join("dataset_manifest.csv"),
        "ticker,filing_date,accession_number,risk_factors_file,mda_file,has_risk_factors,has_mda\n\
         XOM,2024-02-28,acc-1,data/XOM_RiskFactors.txt,data/XOM_MDA.txt,True,True\n\
         KO,2024-02-20,acc-2,data/KO_RiskFactors.txt,,True,False\n",
    )
    .unwrap();
    fs::write(
        data.join("XOM_RiskFactors.txt"),
        "Table of Contents\nGreenhouse gas regula-\ntion could raise costs. Our refineries are large.",
    )
    .unwrap();
    fs::write(data.join("XOM_MDA.txt"), "Earnings rose on higher volumes across the upstream business this year.").unwrap();
    fs::write(data.join("KO_RiskFactors.txt"), "Sugar and aluminum prices are volatile and may reduce our margins materially.").unwrap();

    let out = tmp.path().join("out");
    let report = run_all(&PipelineConfig::default(), &tmp.path().join("dataset_manifest.csv"), &out).unwrap();

    let segmented = read_records(&out.join(SEGMENTED_CSV)).unwrap();
    let ids: Vec<&str> = segmented.iter().map(|r| r.evidence_id.as_str()).collect();
    assert_eq!(ids, vec!["KO_RiskFactors_0", "XOM_MDA_0", "XOM_RiskFactors_0"]);

    let filtered = read_records(&out.join(FILTERED_CSV)).unwrap();
    assert_eq!(filtered, report.retained);
    assert_eq!(filtered.len(), 1);
    assert_eq!(
        filtered[0].evidence_text,
        "[XOM | 2024 | RiskFactors] Greenhouse gas regulation could raise costs. Our refineries are large."
    );
    assert!(out.join(CHUNKS_DIR).join("XOM_RiskFactors_0.txt").is_file());
    let combined =
        fs::read_to_string(out.join(COMBINED_DIR).join("XOM_combined_evidence.txt")).unwrap();
    assert!(combined.starts_with("=== CLIMATE EVIDENCE FOR XOM ===\n"));

    let manifest: ExportManifest =
        serde_json::from_str(&fs::read_to_string(out.join(EXPORT_MANIFEST_FILENAME)).unwrap()).unwrap();
    assert_eq!(manifest.record_count, 1);
    assert_eq!(manifest.entity_count, 1);
    assert_eq!(manifest.files.len(), 4);
    assert!(manifest.files.iter().any(|f| f.filename == SEGMENTED_CSV));
}
