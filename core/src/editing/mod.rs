pub mod classify;
pub mod patch;
pub mod pixel;
pub mod tags;
pub mod uid;

pub use classify::{classify, match_rule};
pub use patch::{apply_patch, resolve_keyword, set_field, FieldOutcome, FieldReport, PatchReport};
pub use pixel::{flip_pixel_data, PixelLayout};
pub use tags::*;
pub use uid::{generate_uid, is_valid_uid};
