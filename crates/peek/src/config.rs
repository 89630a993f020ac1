//! Configuration file loading.
//!
//! Defaults live here; `~/.peek/config.toml` overrides them, and CLI
//! flags override both.

use std::path::{Path, PathBuf};

use peek_parse::Format;
use serde::Deserialize;

use crate::cli::Cli;
use crate::error::{PeekError, Result};

/// Application configuration.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Storage settings.
    pub storage: StorageSection,
    /// Server settings.
    pub server: ServerSection,
    /// Parsing settings.
    pub parsing: ParsingSection,
}

/// `[storage]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Human-readable size budget, e.g. `1GB` or `500MB`.
    pub retention_size: String,
    /// Maximum record age in days; 0 disables.
    pub retention_days: i64,
    /// Database directory.
    pub db_path: String,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            retention_size: "1GB".to_string(),
            retention_days: 7,
            db_path: "~/.peek/db".to_string(),
        }
    }
}

/// `[server]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// HTTP port.
    pub port: u16,
    /// Open the web UI in a browser on startup.
    pub auto_open_browser: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            port: 8080,
            auto_open_browser: true,
        }
    }
}

/// `[parsing]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ParsingSection {
    /// Line format: `auto`, `json`, or `logfmt`.
    pub format: String,
}

impl Default for ParsingSection {
    fn default() -> Self {
        Self {
            format: "auto".to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from a file, falling back to defaults when
    /// the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but cannot be read or
    /// parsed.
    pub fn load(path: &str) -> Result<Self> {
        let path = expand_path(path);
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path)?;
        toml::from_str(&text)
            .map_err(|e| PeekError::Config(format!("{}: {e}", path.display())))
    }

    /// Applies CLI flag overrides.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(db_path) = &cli.db_path {
            self.storage.db_path.clone_from(db_path);
        }
        if let Some(size) = &cli.retention_size {
            self.storage.retention_size.clone_from(size);
        }
        if let Some(days) = cli.retention_days {
            self.storage.retention_days = days;
        }
        if let Some(format) = cli.format {
            self.parsing.format = match Format::from(format) {
                Format::Auto => "auto",
                Format::Json => "json",
                Format::Logfmt => "logfmt",
            }
            .to_string();
        }
        if let Some(port) = cli.port {
            self.server.port = port;
        }
        if cli.no_browser {
            self.server.auto_open_browser = false;
        }
    }

    /// The retention budget in bytes, or `None` when disabled.
    #[must_use]
    pub fn retention_size_bytes(&self) -> Option<u64> {
        match parse_size(&self.storage.retention_size) {
            Ok(0) => None,
            Ok(bytes) => Some(bytes),
            Err(_) => Some(1024 * 1024 * 1024),
        }
    }

    /// The configured line format.
    #[must_use]
    pub fn format(&self) -> Format {
        match self.parsing.format.as_str() {
            "json" => Format::Json,
            "logfmt" => Format::Logfmt,
            _ => Format::Auto,
        }
    }

    /// The database directory with `~` expanded.
    #[must_use]
    pub fn db_dir(&self) -> PathBuf {
        expand_path(&self.storage.db_path)
    }
}

/// Parses a human size like `1GB`, `500MB`, or `64KB` into bytes.
///
/// # Errors
///
/// Returns a configuration error for unknown units or a bad number.
pub fn parse_size(text: &str) -> Result<u64> {
    let upper = text.trim().to_uppercase();
    let (number, multiplier) = if let Some(n) = upper.strip_suffix("GB") {
        (n, 1024u64 * 1024 * 1024)
    } else if let Some(n) = upper.strip_suffix("MB") {
        (n, 1024 * 1024)
    } else if let Some(n) = upper.strip_suffix("KB") {
        (n, 1024)
    } else {
        return Err(PeekError::Config(format!(
            "invalid size '{text}' (use KB, MB, or GB)"
        )));
    };

    let value: f64 = number
        .trim()
        .parse()
        .map_err(|_| PeekError::Config(format!("invalid size number '{number}'")))?;
    Ok((value * multiplier as f64) as u64)
}

/// Expands a leading `~` to the user's home directory.
#[must_use]
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    Path::new(path).to_path_buf()
}
