use dicom_core::VR;
use thiserror::Error;

/// Result type for retag operations
pub type Result<T> = std::result::Result<T, RetagError>;

/// Error types for retag operations
///
/// Everything except [`RetagError::Fatal`] and [`RetagError::Config`] is
/// scoped to a single file: the batch driver records it and moves on.
#[derive(Error, Debug)]
pub enum RetagError {
    /// Input file could not be read or parsed as DICOM
    #[error("DICOM decode error: {0}")]
    Decode(String),

    /// Pixel data could not be reinterpreted or flipped
    #[error("Pixel transform error: {0}")]
    Transform(String),

    /// Output file could not be encoded or written
    #[error("Serialize error: {0}")]
    Serialize(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Run-level misconfiguration, aborts the whole batch
    #[error("Fatal error: {0}")]
    Fatal(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RetagError {
    /// Short label of the failing stage, used in reports
    pub fn stage(&self) -> &'static str {
        match self {
            RetagError::Decode(_) => "decode",
            RetagError::Transform(_) => "transform",
            RetagError::Serialize(_) => "serialize",
            RetagError::Config(_) => "config",
            RetagError::Fatal(_) => "fatal",
            RetagError::Io(_) => "io",
        }
    }
}

/// Failure to write a single field during tag patching
///
/// Never escalates beyond the patch report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldWriteError {
    /// Value does not fit the field's value representation
    #[error("invalid value {value:?} for {keyword} ({vr}): {reason}")]
    InvalidValue {
        keyword: String,
        vr: VR,
        value: String,
        reason: String,
    },

    /// Value representation cannot be written from text
    #[error("cannot write {keyword}: unsupported value representation {vr}")]
    UnsupportedVr { keyword: String, vr: VR },
}

impl FieldWriteError {
    /// Keyword of the field that failed
    pub fn keyword(&self) -> &str {
        match self {
            FieldWriteError::InvalidValue { keyword, .. } => keyword,
            FieldWriteError::UnsupportedVr { keyword, .. } => keyword,
        }
    }
}

// Convert dicom-object errors
impl From<dicom_object::ReadError> for RetagError {
    fn from(e: dicom_object::ReadError) -> Self {
        RetagError::Decode(format!("{}", e))
    }
}

impl From<dicom_object::WriteError> for RetagError {
    fn from(e: dicom_object::WriteError) -> Self {
        RetagError::Serialize(format!("{}", e))
    }
}

impl From<serde_json::Error> for RetagError {
    fn from(e: serde_json::Error) -> Self {
        RetagError::Config(format!("{}", e))
    }
}
