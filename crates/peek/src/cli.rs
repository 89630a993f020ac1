//! Command-line argument parsing with clap.

use clap::{Parser, Subcommand, ValueEnum};
use peek_parse::Format;

/// Peek - minimalist log collector and viewer.
///
/// Pipe logs in to collect them (`cat app.log | peek`), or run `peek
/// server` to browse what was collected earlier.
#[derive(Parser, Debug, Clone)]
#[command(name = "peek")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the config file.
    #[arg(long, default_value = "~/.peek/config.toml")]
    pub config: String,

    /// Database directory (overrides config).
    #[arg(long)]
    pub db_path: Option<String>,

    /// Max storage size, e.g. 1GB or 500MB (overrides config).
    #[arg(long)]
    pub retention_size: Option<String>,

    /// Max age of logs in days (overrides config).
    #[arg(long)]
    pub retention_days: Option<i64>,

    /// Log format.
    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,

    /// HTTP port for the web UI (overrides config).
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Don't auto-open the browser.
    #[arg(long)]
    pub no_browser: bool,

    /// Show all historic logs alongside new ones (collect mode only).
    #[arg(long)]
    pub all: bool,

    /// Subcommand; without one, peek collects from stdin when piped and
    /// serves otherwise.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Log format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    /// Detect per line.
    Auto,
    /// Structured-object (JSON) only.
    Json,
    /// Logfmt only.
    Logfmt,
}

impl From<FormatArg> for Format {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Auto => Self::Auto,
            FormatArg::Json => Self::Json,
            FormatArg::Logfmt => Self::Logfmt,
        }
    }
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the web server over previously collected logs.
    Server,

    /// Database maintenance.
    Db {
        /// Db subcommand to execute.
        #[command(subcommand)]
        command: DbCommands,
    },
}

/// `peek db` subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum DbCommands {
    /// Show database statistics.
    Stats,

    /// Delete logs from the database.
    Clean {
        /// Delete logs older than a duration, e.g. 24h, 7d, 2w.
        #[arg(long)]
        older_than: Option<String>,

        /// Delete only logs with this level, e.g. DEBUG.
        #[arg(long)]
        level: Option<String>,

        /// Skip the confirmation prompt.
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_invocation() {
        let cli = Cli::parse_from(["peek"]);
        assert!(cli.command.is_none());
        assert!(cli.format.is_none());
        assert!(!cli.all);
        assert!(!cli.no_browser);
        assert_eq!(cli.config, "~/.peek/config.toml");
    }

    #[test]
    fn parses_collect_flags() {
        let cli = Cli::parse_from([
            "peek",
            "--db-path",
            "/tmp/db",
            "--retention-size",
            "500MB",
            "--retention-days",
            "30",
            "--format",
            "logfmt",
            "--port",
            "8081",
            "--no-browser",
            "--all",
        ]);
        assert_eq!(cli.db_path.as_deref(), Some("/tmp/db"));
        assert_eq!(cli.retention_size.as_deref(), Some("500MB"));
        assert_eq!(cli.retention_days, Some(30));
        assert_eq!(cli.format, Some(FormatArg::Logfmt));
        assert_eq!(cli.port, Some(8081));
        assert!(cli.no_browser);
        assert!(cli.all);
    }

    #[test]
    fn parses_server_subcommand() {
        let cli = Cli::parse_from(["peek", "server", "--port", "9000"]);
        assert!(matches!(cli.command, Some(Commands::Server)));
        assert_eq!(cli.port, Some(9000));
    }

    #[test]
    fn parses_db_subcommands() {
        let cli = Cli::parse_from(["peek", "db", "stats"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Db {
                command: DbCommands::Stats
            })
        ));

        let cli = Cli::parse_from([
            "peek", "db", "clean", "--older-than", "7d", "--force",
        ]);
        match cli.command {
            Some(Commands::Db {
                command:
                    DbCommands::Clean {
                        older_than,
                        level,
                        force,
                    },
            }) => {
                assert_eq!(older_than.as_deref(), Some("7d"));
                assert!(level.is_none());
                assert!(force);
            }
            other => panic!("expected db clean, got {other:?}"),
        }
    }

    #[test]
    fn unknown_flags_are_rejected() {
        assert!(Cli::try_parse_from(["peek", "--mystery"]).is_err());
    }

    #[test]
    fn format_arg_converts() {
        assert_eq!(Format::from(FormatArg::Auto), Format::Auto);
        assert_eq!(Format::from(FormatArg::Json), Format::Json);
        assert_eq!(Format::from(FormatArg::Logfmt), Format::Logfmt);
    }
}
