//! Core type definitions for series re-tagging
//!
//! This module provides the fundamental types used throughout the retag library:
//! - [`SeriesType`]: Classification of a file into a series bucket
//! - [`FlipAxis`]: Axis along which pixel data is reversed
//! - [`TagPatch`]: Ordered keyword to value mapping applied to DICOM objects
//! - [`PixelSpacing`]: In-plane resolution used by resolution overrides
//! - [`RetagConfig`]: Configuration for a batch run

mod config;
mod patch;
mod pixel_spacing;
mod series;

pub use config::{ResolutionOverride, RetagConfig, SeriesRule, DEFAULT_EXTENSION};
pub use patch::{TagPatch, PATIENT_PLACEHOLDER};
pub use pixel_spacing::PixelSpacing;
pub use series::{FlipAxis, SeriesType};
