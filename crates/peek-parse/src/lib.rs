//! # peek-parse
//!
//! Log line parsing with format auto-detection.
//!
//! This crate provides:
//!
//! - [`FormatDetector`] — Tries each known format in order, falling back
//!   to a raw record when nothing accepts the line
//! - [`LogfmtFormat`] — `key=value` lines with quoted values
//! - [`StructuredFormat`] — Brace-delimited structured objects (JSON)
//! - [`Format`] — Explicit format selection for `parse_as`
//!
//! Detection order is logfmt first, then structured objects: a JSON line
//! never contains bare `key=` pairs, while logfmt lines frequently contain
//! braces inside quoted values.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod detector;
pub mod error;
mod extract;
pub mod json;
pub mod logfmt;

pub use detector::{Format, FormatDetector, LineFormat};
pub use error::{ParseError, Result};
pub use json::StructuredFormat;
pub use logfmt::LogfmtFormat;
