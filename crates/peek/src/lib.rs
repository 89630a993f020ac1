//! # peek
//!
//! Binary crate: CLI parsing, configuration, the ingest supervisor, and
//! database maintenance commands. The reusable machinery lives in the
//! `peek-*` library crates; this one wires them together.

#![forbid(unsafe_code)]

pub mod browser;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;

pub use cli::{Cli, Commands, DbCommands, FormatArg};
pub use config::Config;
pub use error::{PeekError, Result};
pub use ingest::IngestSupervisor;
