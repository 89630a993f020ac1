//! # peek-server
//!
//! HTTP and WebSocket surface over the log store and broadcaster.
//!
//! Endpoints:
//!
//! - `GET /health` — liveness plus stored-record and size counters
//! - `GET /stats` — totals, size, per-level counts
//! - `GET /fields` — field discovery, optional `start`/`end` window
//! - `POST /query` — batch query with pagination
//! - `GET /logs` — WebSocket subscribe/unsubscribe stream
//! - `GET /` — static landing page
//!
//! Queries read the store synchronously; live delivery goes through the
//! broadcaster and never touches store locks.

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;
pub mod websocket;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use routes::create_router;
pub use server::Server;
pub use state::AppState;
