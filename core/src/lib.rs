pub mod batch;
pub mod cli;
pub mod editing;
pub mod error;
pub mod types;

pub use batch::{BatchDriver, BatchReport, FileOutcome, FileRecord, IdentifierTriple};
pub use cli::report::TextReport;
pub use editing::{
    apply_patch, classify, flip_pixel_data, generate_uid, is_valid_uid, set_field, FieldOutcome,
    PatchReport,
};
pub use error::{FieldWriteError, Result, RetagError};
pub use types::*;
