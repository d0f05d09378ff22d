use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use tempfile::tempdir;

use evseg_store::sections::{load_documents, ManifestSectionSource, MissingSection, SectionSource};

fn write(dir: &Path, rel: &str, text: &str) {
    let path = dir.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

fn seed(dir: &Path) {
    write(
        dir,
        "dataset_manifest.csv",
        "ticker,filing_date,accession_number,risk_factors_file,mda_file,has_risk_factors,has_mda\n\
         XOM,2024-02-28,0000034088-24-000018,sections/XOM_2024-02-28_RiskFactors.txt,sections/XOM_2024-02-28_MDA.txt,True,True\n\
         CVX,2023-02-23,0000093410-23-000009,sections/CVX_2023-02-23_RiskFactors.txt,,True,False\n\
         APA,2024-02-22,0001841666-24-000010,sections/APA_2024-02-22_RiskFactors.txt,sections/APA_2024-02-22_MDA.txt,True,True\n",
    );
    write(dir, "sections/XOM_2024-02-28_RiskFactors.txt", "Climate rules may tighten.");
    write(dir, "sections/XOM_2024-02-28_MDA.txt", "Upstream earnings rose.");
    write(dir, "sections/CVX_2023-02-23_RiskFactors.txt", "Carbon pricing is uncertain.");
    write(dir, "sections/APA_2024-02-22_RiskFactors.txt", "SECTION NOT FOUND");
    // APA MDA file is listed but absent on disk.
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn loads_documents_with_period_from_filing_date() {
    let tmp = tempdir().unwrap();
    seed(tmp.path());
    let source = ManifestSectionSource::open(&tmp.path().join("dataset_manifest.csv")).unwrap();
    assert_eq!(source.entities(), strings(&["XOM", "CVX", "APA"]));

    let loaded = load_documents(&source, &source.entities(), &strings(&["RiskFactors", "MDA"]));
    let docs: Vec<(&str, &str, &str, &str)> = loaded
        .documents
        .iter()
        .map(|d| {
            (
                d.entity_id.as_str(),
                d.period.as_str(),
                d.section_id.as_str(),
                d.raw_text.as_str(),
            )
        })
        .collect();
    assert_eq!(
        docs,
        vec![
            ("XOM", "2024", "RiskFactors", "Climate rules may tighten."),
            ("XOM", "2024", "MDA", "Upstream earnings rose."),
            ("CVX", "2023", "RiskFactors", "Carbon pricing is uncertain."),
        ]
    );
    assert_eq!(loaded.documents[0].accession_id.as_deref(), Some("0000034088-24-000018"));
    assert_eq!(loaded.documents[0].filing_date.as_deref(), Some("2024-02-28"));

    let missing = vec![
        MissingSection {
            entity_id: "CVX".to_string(),
            section_id: "MDA".to_string(),
        },
        MissingSection {
            entity_id: "APA".to_string(),
            section_id: "RiskFactors".to_string(),
        },
        MissingSection {
            entity_id: "APA".to_string(),
            section_id: "MDA".to_string(),
        },
    ];
    assert_eq!(loaded.missing, missing);
    assert!(loaded.failures.is_empty());
}

#[test]
fn unknown_entity_is_missing_not_failure() {
    let tmp = tempdir().unwrap();
    seed(tmp.path());
    let source = ManifestSectionSource::open(&tmp.path().join("dataset_manifest.csv")).unwrap();
    assert_eq!(source.fetch_section("PSX", "MDA").unwrap(), None);
}

#[test]
fn extra_sections_resolve_next_to_known_files() {
    let tmp = tempdir().unwrap();
    seed(tmp.path());
    write(tmp.path(), "sections/XOM_2024-02-28_Business.txt", "We explore for oil.");
    let source = ManifestSectionSource::open(&tmp.path().join("dataset_manifest.csv")).unwrap();
    let fetched = source.fetch_section("XOM", "Business").unwrap().unwrap();
    assert_eq!(fetched.raw_text, "We explore for oil.");
    assert_eq!(source.fetch_section("CVX", "Business").unwrap(), None);
}

#[test]
fn bad_filing_date_is_a_failure_for_that_entity_only() {
    let tmp = tempdir().unwrap();
    write(
        tmp.path(),
        "m.csv",
        "ticker,filing_date,accession_number,risk_factors_file\n\
         BAD,Feb 2024,acc-1,BAD.txt\n\
         GOOD,2022-03-01,acc-2,GOOD.txt\n",
    );
    write(tmp.path(), "BAD.txt", "Some text.");
    write(tmp.path(), "GOOD.txt", "Other text.");
    let source = ManifestSectionSource::open(&tmp.path().join("m.csv")).unwrap();
    let loaded = load_documents(&source, &source.entities(), &strings(&["RiskFactors"]));
    assert_eq!(loaded.documents.len(), 1);
    assert_eq!(loaded.documents[0].period, "2022");
    assert_eq!(loaded.failures.len(), 1);
    assert_eq!(loaded.failures[0].entity_id, "BAD");
    assert_eq!(loaded.failures[0].error.code, "SOURCE_FILING_DATE_INVALID");
}

#[test]
fn manifest_errors_are_structured() {
    let err = ManifestSectionSource::open(Path::new("/definitely/not/here.csv")).unwrap_err();
    assert_eq!(err.code, "SOURCE_MANIFEST_READ_FAILED");

    let err = ManifestSectionSource::from_csv_str(
        "ticker,filing_date,accession_number\n ,2024-01-01,acc\n",
        Default::default(),
    )
    .unwrap_err();
    assert_eq!(err.code, "SOURCE_MANIFEST_INVALID");

    let err = ManifestSectionSource::from_csv_str("ticker\nXOM\n", Default::default()).unwrap_err();
    assert_eq!(err.code, "SOURCE_MANIFEST_INVALID");
}

#[test]
fn duplicate_ticker_keeps_latest_filing_once() {
    let tmp = tempdir().unwrap();
    write(
        tmp.path(),
        "m.csv",
        "ticker,filing_date,accession_number,risk_factors_file\n\
         XOM,2024-02-28,acc-2024,XOM_2024.txt\n\
         CVX,2024-02-23,acc-cvx,CVX_2024.txt\n\
         XOM,2023-03-01,acc-2023,XOM_2023.txt\n",
    );
    write(tmp.path(), "XOM_2023.txt", "Old climate text.");
    write(tmp.path(), "XOM_2024.txt", "New climate text.");
    write(tmp.path(), "CVX_2024.txt", "Chevron climate text.");
    let source = ManifestSectionSource::open(&tmp.path().join("m.csv")).unwrap();
    assert_eq!(source.entities(), strings(&["XOM", "CVX"]));

    let loaded = load_documents(&source, &source.entities(), &strings(&["RiskFactors"]));
    let docs: Vec<(&str, &str, &str)> = loaded
        .documents
        .iter()
        .map(|d| (d.entity_id.as_str(), d.period.as_str(), d.raw_text.as_str()))
        .collect();
    assert_eq!(
        docs,
        vec![
            ("XOM", "2024", "New climate text."),
            ("CVX", "2024", "Chevron climate text."),
        ]
    );
}
