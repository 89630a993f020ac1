//! Peek binary entrypoint.
//!
//! Modes:
//!
//! - piped stdin (`cat app.log | peek`) — collect mode: ingest lines,
//!   serve the live web UI alongside
//! - `peek server`, or no piped stdin — serve previously collected logs
//! - `peek db stats` / `peek db clean` — database maintenance

use std::io::IsTerminal;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use peek::{browser, db, Cli, Commands, Config, IngestSupervisor, PeekError};
use peek_server::{AppState, Server, ServerConfig};
use peek_store::{LogStore, StoreConfig};
use peek_stream::Broadcaster;
use tokio::io::BufReader;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so piped stdin/stdout workflows stay clean.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "fatal error");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> peek::Result<()> {
    let mut config = Config::load(&cli.config)?;
    config.apply_cli(&cli);

    match &cli.command {
        Some(Commands::Db { command }) => db::run(command, &config),
        Some(Commands::Server) => run_server(&config).await,
        None if std::io::stdin().is_terminal() => run_server(&config).await,
        None => run_collect(&cli, &config).await,
    }
}

fn open_store(config: &Config) -> peek::Result<Arc<LogStore>> {
    let mut store_config = StoreConfig::new(config.db_dir());
    if let Some(bytes) = config.retention_size_bytes() {
        store_config = store_config.with_retention_size(bytes);
    }
    if config.storage.retention_days > 0 {
        store_config = store_config.with_retention_days(config.storage.retention_days);
    }
    Ok(Arc::new(LogStore::open(store_config)?))
}

/// Collect mode: ingest stdin while serving the web UI, then keep the
/// server alive until a signal arrives so the logs stay browsable.
async fn run_collect(cli: &Cli, config: &Config) -> peek::Result<()> {
    info!("starting collect mode");
    let store = open_store(config)?;
    let broadcaster = Broadcaster::new();

    let fresh_since = if cli.all {
        info!("showing all historic logs alongside new ones");
        None
    } else {
        info!("fresh mode: only showing logs from the current session");
        Some(Utc::now())
    };

    let addr = SocketAddr::from(([127, 0, 0, 1], config.server.port));
    let state = Arc::new(AppState::new(
        ServerConfig::new(addr),
        Arc::clone(&store),
        broadcaster.clone(),
        fresh_since,
    ));
    let server = Server::new(state);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let mut server_task = tokio::spawn(async move {
        server
            .serve_with_shutdown(addr, async move {
                let _ = shutdown_rx.await;
            })
            .await
    });

    let url = format!("http://localhost:{}", config.server.port);
    info!(%url, "web UI available");
    if config.server.auto_open_browser {
        browser::open(&url);
    }

    let supervisor = IngestSupervisor::new(config.format(), Arc::clone(&store), broadcaster.clone());
    let stdin = BufReader::new(tokio::io::stdin());

    tokio::select! {
        collected = supervisor.run(stdin) => {
            let collected = collected?;
            info!("syncing database");
            store.sync()?;
            info!(collected, %url, "collection complete; server still running, press Ctrl+C to exit");
        }
        early = &mut server_task => {
            // The server died before stdin closed; bind failures land here.
            broadcaster.close();
            store.close()?;
            return match early {
                Ok(result) => result.map_err(PeekError::from),
                Err(e) => Err(PeekError::Internal(e.to_string())),
            };
        }
    }

    wait_for_shutdown_signal().await;
    info!("shutting down");

    // Stop accepting connections, then cancel subscribers, then close
    // the store.
    let _ = shutdown_tx.send(());
    if let Err(e) = (&mut server_task).await {
        error!(error = %e, "server task failed during shutdown");
    }
    broadcaster.close();
    store.close()?;
    Ok(())
}

/// Server mode: browse previously collected logs.
async fn run_server(config: &Config) -> peek::Result<()> {
    info!("starting server mode");
    let store = open_store(config)?;
    let broadcaster = Broadcaster::new();

    let addr = SocketAddr::from(([127, 0, 0, 1], config.server.port));
    let state = Arc::new(AppState::new(
        ServerConfig::new(addr),
        Arc::clone(&store),
        broadcaster.clone(),
        None,
    ));
    let server = Server::new(state);

    let url = format!("http://localhost:{}", config.server.port);
    info!(%url, "web UI available");
    if config.server.auto_open_browser {
        browser::open(&url);
    }

    server
        .serve_with_shutdown(addr, wait_for_shutdown_signal())
        .await?;

    broadcaster.close();
    store.close()?;
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let Ok(mut terminate) = signal(SignalKind::terminate()) else {
        let _ = tokio::signal::ctrl_c().await;
        return;
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
