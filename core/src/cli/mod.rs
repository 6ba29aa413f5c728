pub mod report;

use crate::error::Result;
use crate::types::RetagConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Command-line arguments for retag
///
/// Values given here override the configuration file.
#[derive(Parser, Debug)]
#[command(name = "retag")]
#[command(about = "Batch edit DICOM series tags, flip pixel data and assign new UIDs")]
#[command(version)]
pub struct Cli {
    /// Folder containing the DICOM files (or subject folders)
    #[arg(value_name = "INPUT")]
    pub input: Option<PathBuf>,

    /// Folder receiving the edited files
    #[arg(value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Patient identifier (defaults to the input folder name)
    #[arg(short, long)]
    pub patient: Option<String>,

    /// Treat each sub-folder of INPUT as one subject
    #[arg(short, long)]
    pub subject_folders: bool,

    /// Extension of the files to process
    #[arg(short, long)]
    pub extension: Option<String>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    pub dump_config: bool,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format
    Text,
    /// JSON format
    Json,
}

impl Cli {
    /// Builds the run configuration: file (or defaults), then CLI overrides
    pub fn to_config(&self) -> Result<RetagConfig> {
        let mut config = match &self.config {
            Some(path) => RetagConfig::from_json_file(path)?,
            None => RetagConfig::default(),
        };

        if let Some(input) = &self.input {
            config.input_root = input.clone();
        }
        if let Some(output) = &self.output {
            config.output_root = output.clone();
        }
        if let Some(patient) = &self.patient {
            config = config.with_patient(patient.as_str());
        }
        if self.subject_folders {
            config = config.with_subject_folders(true);
        }
        if let Some(extension) = &self.extension {
            config = config.with_extension(extension.as_str());
        }

        Ok(config)
    }
}
