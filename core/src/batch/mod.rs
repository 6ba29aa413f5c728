//! Batch processing of an input folder
//!
//! Discovers input files, drives each one through classification, patching,
//! pixel flipping and re-identification, and reports per-file outcomes.

mod discover;
mod driver;
mod report;

pub use discover::{collect_dicom_files, discover_subjects, Subject};
pub use driver::BatchDriver;
pub use report::{BatchReport, FileOutcome, FileRecord, IdentifierTriple};
