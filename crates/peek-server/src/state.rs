//! Shared server state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use peek_query::Filter;
use peek_store::LogStore;
use peek_stream::Broadcaster;

use crate::config::ServerConfig;

/// State shared by every handler: the store, the broadcaster, and the
/// optional fresh-mode cutoff.
pub struct AppState {
    config: ServerConfig,
    store: Arc<LogStore>,
    broadcaster: Broadcaster,
    fresh_since: Option<DateTime<Utc>>,
}

impl AppState {
    /// Creates the shared state.
    #[must_use]
    pub const fn new(
        config: ServerConfig,
        store: Arc<LogStore>,
        broadcaster: Broadcaster,
        fresh_since: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            config,
            store,
            broadcaster,
            fresh_since,
        }
    }

    /// The server configuration.
    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The log store.
    #[must_use]
    pub fn store(&self) -> &LogStore {
        &self.store
    }

    /// The live fan-out.
    #[must_use]
    pub const fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    /// The fresh-mode cutoff, if the process is hiding pre-start records.
    #[must_use]
    pub const fn fresh_since(&self) -> Option<DateTime<Utc>> {
        self.fresh_since
    }

    /// Combines a user filter with the fresh-mode cutoff.
    ///
    /// With fresh mode off this is the identity; with it on, records
    /// older than the process start are hidden from queries and
    /// subscriptions alike.
    #[must_use]
    pub fn effective_filter(&self, user: Filter) -> Filter {
        match self.fresh_since {
            Some(cutoff) => user.and(Filter::since(cutoff)),
            None => user,
        }
    }
}
