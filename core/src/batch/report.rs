use crate::editing::PatchReport;
use crate::error::RetagError;
use crate::types::{FlipAxis, SeriesType};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Study, series and instance UIDs given to one output file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierTriple {
    pub study: String,
    pub series: String,
    pub instance: String,
}

/// Terminal state of one input file
#[derive(Debug)]
pub enum FileOutcome {
    /// Edited and saved
    Written {
        output: PathBuf,
        series: SeriesType,
        ids: IdentifierTriple,
        flipped: Option<FlipAxis>,
        patch: PatchReport,
    },

    /// Classified into a skip bucket, nothing written
    Skipped { series: SeriesType },

    /// Decode, transform or serialize error
    Failed {
        series: SeriesType,
        error: RetagError,
    },
}

impl FileOutcome {
    /// Series type the file was classified into
    pub fn series(&self) -> SeriesType {
        match self {
            FileOutcome::Written { series, .. }
            | FileOutcome::Skipped { series }
            | FileOutcome::Failed { series, .. } => *series,
        }
    }

    pub fn is_written(&self) -> bool {
        matches!(self, FileOutcome::Written { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FileOutcome::Failed { .. })
    }
}

/// One input file and what happened to it
#[derive(Debug)]
pub struct FileRecord {
    pub input: PathBuf,
    pub patient: String,
    pub outcome: FileOutcome,
}

impl FileRecord {
    /// File name of the input, lossily converted
    pub fn file_name(&self) -> String {
        self.input
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Result of a batch run, one record per discovered file in processing order
#[derive(Debug, Default)]
pub struct BatchReport {
    pub files: Vec<FileRecord>,

    /// Series UIDs per patient, shared by every written file of a series
    /// type within that subject. Each subject has its own study, so its
    /// series are never shared with another subject.
    pub series_uids: BTreeMap<String, BTreeMap<SeriesType, String>>,
}

impl BatchReport {
    pub fn written(&self) -> usize {
        self.files.iter().filter(|f| f.outcome.is_written()).count()
    }

    pub fn skipped(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, FileOutcome::Skipped { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.files.iter().filter(|f| f.outcome.is_failed()).count()
    }

    /// Series UID assigned to a patient's files of one series type
    pub fn series_uid(&self, patient: &str, series: SeriesType) -> Option<&str> {
        self.series_uids
            .get(patient)
            .and_then(|uids| uids.get(&series))
            .map(String::as_str)
    }

    /// Record of the first input with the given file name
    pub fn file(&self, name: &str) -> Option<&FileRecord> {
        self.files.iter().find(|f| f.file_name() == name)
    }

    /// Paths of all written files
    pub fn outputs(&self) -> Vec<&Path> {
        self.files
            .iter()
            .filter_map(|f| match &f.outcome {
                FileOutcome::Written { output, .. } => Some(output.as_path()),
                _ => None,
            })
            .collect()
    }
}
