//! # peek-model
//!
//! Core data model for the peek log service.
//!
//! This crate provides:
//!
//! - [`Record`] — A normalized log entry with a JSON codec
//! - [`FieldValue`] — Tagged variant for heterogeneous field values
//! - [`FieldInfo`] — A discovered field name with its most frequent values
//! - [`TimeRange`] — Inclusive time window used by queries and subscriptions
//! - [`normalize_level`] — Canonical uppercase level tags
//! - [`generate_record_id`] — Random 64-bit ids rendered as 16 hex chars

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod level;
pub mod types;
pub mod value;

pub use level::normalize_level;
pub use types::{generate_record_id, FieldInfo, Record, TimeRange};
pub use value::FieldValue;
