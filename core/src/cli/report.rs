use crate::batch::{BatchReport, FileOutcome, FileRecord};
use serde::Serialize;
use std::fmt;

/// Text report formatter for a batch run
///
/// One line per file, field write problems indented below their file,
/// then a summary block.
pub struct TextReport<'a> {
    report: &'a BatchReport,
}

impl<'a> TextReport<'a> {
    /// Creates a new text report
    pub fn new(report: &'a BatchReport) -> Self {
        Self { report }
    }
}

impl<'a> fmt::Display for TextReport<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Retag Report")?;
        writeln!(f, "============")?;
        writeln!(f)?;

        for file in &self.report.files {
            let name = file.file_name();
            match &file.outcome {
                FileOutcome::Written {
                    output,
                    series,
                    flipped,
                    patch,
                    ..
                } => {
                    write!(f, "OK    {} [{}] -> {}", name, series, output.display())?;
                    if let Some(axis) = flipped {
                        write!(f, " (flipped {})", axis)?;
                    }
                    writeln!(f)?;
                    for failure in patch.failures() {
                        writeln!(f, "      field skipped: {}", failure)?;
                    }
                }
                FileOutcome::Skipped { series } => {
                    writeln!(f, "SKIP  {} [{}]", name, series)?;
                }
                FileOutcome::Failed { error, .. } => {
                    writeln!(f, "FAIL  {}: {}", name, error)?;
                }
            }
        }

        writeln!(f)?;
        writeln!(f, "Summary")?;
        writeln!(f, "-------")?;
        writeln!(f, "Files:    {}", self.report.files.len())?;
        writeln!(f, "Written:  {}", self.report.written())?;
        writeln!(f, "Skipped:  {}", self.report.skipped())?;
        writeln!(f, "Failed:   {}", self.report.failed())?;

        Ok(())
    }
}

/// JSON view of a batch run
#[derive(Serialize)]
pub struct JsonReport {
    pub files: Vec<FileJson>,
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// JSON view of one file record
#[derive(Serialize)]
pub struct FileJson {
    pub input: String,
    pub patient: String,
    pub status: &'static str,
    pub series: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub study_uid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_uid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_uid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flipped: Option<String>,
    pub fields_written: usize,
    pub field_errors: Vec<String>,
    pub unresolved_keywords: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&FileRecord> for FileJson {
    fn from(record: &FileRecord) -> Self {
        let mut json = FileJson {
            input: record.input.display().to_string(),
            patient: record.patient.clone(),
            status: "",
            series: record.outcome.series().to_string(),
            output: None,
            study_uid: None,
            series_uid: None,
            instance_uid: None,
            flipped: None,
            fields_written: 0,
            field_errors: Vec::new(),
            unresolved_keywords: Vec::new(),
            error: None,
        };

        match &record.outcome {
            FileOutcome::Written {
                output,
                ids,
                flipped,
                patch,
                ..
            } => {
                json.status = "written";
                json.output = Some(output.display().to_string());
                json.study_uid = Some(ids.study.clone());
                json.series_uid = Some(ids.series.clone());
                json.instance_uid = Some(ids.instance.clone());
                json.flipped = flipped.map(|axis| axis.to_string());
                json.fields_written = patch.written();
                json.field_errors = patch.failures().iter().map(|e| e.to_string()).collect();
                json.unresolved_keywords =
                    patch.unresolved().iter().map(|k| k.to_string()).collect();
            }
            FileOutcome::Skipped { .. } => json.status = "skipped",
            FileOutcome::Failed { error, .. } => {
                json.status = "failed";
                json.error = Some(format!("{} ({})", error, error.stage()));
            }
        }

        json
    }
}

impl From<&BatchReport> for JsonReport {
    fn from(report: &BatchReport) -> Self {
        JsonReport {
            files: report.files.iter().map(FileJson::from).collect(),
            written: report.written(),
            skipped: report.skipped(),
            failed: report.failed(),
        }
    }
}
