pub mod evidence_csv;
pub mod export;
pub mod sections;
