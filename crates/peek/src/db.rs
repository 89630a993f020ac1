//! `peek db` maintenance commands.

use std::io::Write;

use chrono::Utc;
use peek_query::time::parse_duration;
use peek_store::{LogStore, StoreConfig};

use crate::cli::DbCommands;
use crate::config::Config;
use crate::error::{PeekError, Result};

/// Runs a `peek db` subcommand.
///
/// # Errors
///
/// Returns an error when the store cannot be opened or the operation
/// fails.
pub fn run(command: &DbCommands, config: &Config) -> Result<()> {
    match command {
        DbCommands::Stats => stats(config),
        DbCommands::Clean {
            older_than,
            level,
            force,
        } => clean(config, older_than.as_deref(), level.as_deref(), *force),
    }
}

fn open_store(config: &Config) -> Result<LogStore> {
    let mut store_config = StoreConfig::new(config.db_dir());
    if let Some(bytes) = config.retention_size_bytes() {
        store_config = store_config.with_retention_size(bytes);
    }
    if config.storage.retention_days > 0 {
        store_config = store_config.with_retention_days(config.storage.retention_days);
    }
    Ok(LogStore::open(store_config)?)
}

fn stats(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let stats = store.get_stats()?;
    let (oldest, newest) = store.get_oldest_newest()?;

    println!("Database Statistics");
    println!("===================");
    println!("Path:          {}", config.db_dir().display());
    println!("Total logs:    {}", stats.total_logs);
    println!("Database size: {:.2} MB", stats.db_size_mb);
    if let Some(oldest) = oldest {
        println!("Oldest entry:  {}", oldest.to_rfc3339());
    }
    if let Some(newest) = newest {
        println!("Newest entry:  {}", newest.to_rfc3339());
    }
    if !stats.levels.is_empty() {
        println!();
        println!("Logs by level:");
        let mut levels: Vec<_> = stats.levels.iter().collect();
        levels.sort_by(|a, b| a.0.cmp(b.0));
        for (level, count) in levels {
            println!("  {level}: {count}");
        }
    }

    store.close()?;
    Ok(())
}

fn clean(config: &Config, older_than: Option<&str>, level: Option<&str>, force: bool) -> Result<()> {
    let store = open_store(config)?;
    let stats = store.get_stats()?;

    let prompt = if let Some(level) = level {
        let Some(count) = stats.levels.get(level) else {
            println!("No logs found with level {level}");
            store.close()?;
            return Ok(());
        };
        format!("This will delete {count} log entries with level {level}. Continue?")
    } else if let Some(spec) = older_than {
        let duration = parse_duration(spec)
            .ok_or_else(|| PeekError::Config(format!("invalid duration '{spec}'")))?;
        format!("This will delete logs older than {duration}. Continue?")
    } else {
        format!(
            "This will delete all {} log entries ({:.2} MB). Continue?",
            stats.total_logs, stats.db_size_mb
        )
    };

    if !force && !confirm(&prompt)? {
        println!("Aborted.");
        store.close()?;
        return Ok(());
    }

    let deleted = if let Some(level) = level {
        store.delete_by_level(level)?
    } else if let Some(spec) = older_than {
        let duration = parse_duration(spec)
            .ok_or_else(|| PeekError::Config(format!("invalid duration '{spec}'")))?;
        store.delete_older_than(Utc::now() - duration)?
    } else {
        store.delete_all()?
    };

    if let Err(e) = store.compact() {
        tracing::warn!(error = %e, "failed to compact database");
    }

    println!("Deleted {deleted} entries. Database compacted.");
    store.close()?;
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N] ");
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    let answer = answer.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}
