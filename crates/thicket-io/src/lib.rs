//! Annotated feature matrix (AFM) loading for thicket.
//!
//! An AFM is a tab-separated table with one row per feature and one column
//! per case; see [`AfmReader`] for the format.

mod afm;
mod error;

pub use afm::{AfmReader, ParsedAfm, parse_afm};
pub use error::IoError;
