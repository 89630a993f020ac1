//! # peek-store
//!
//! Ordered persistent log storage backed by redb.
//!
//! This crate provides:
//!
//! - [`LogStore`] — Durable record storage with a time-ordered primary
//!   index and a by-level secondary index, written atomically
//! - [`StoreConfig`] — Database path and retention policy
//! - [`Stats`] — Totals, on-disk size, and per-level counts
//! - [`ScanFlow`] — Continuation signal for callback-driven scans
//!
//! ## Key layout
//!
//! Everything lives in one ordered string keyspace:
//!
//! ```text
//! log:{timestamp_nanos}:{id}                 -> record JSON
//! index:level:{LEVEL}:{timestamp_nanos}:{id} -> id
//! ```
//!
//! Nanosecond timestamps render as plain decimal; for any instant after
//! 2001 that is 19 digits, so lexicographic key order equals
//! chronological order and a forward prefix scan yields records oldest
//! first.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
mod fields;
pub mod keys;
mod retention;
pub mod store;

pub use error::{Result, StoreError};
pub use store::{LogStore, ScanFlow, Stats, StoreConfig};
