//! The ingest supervisor: stdin → parser → store → broadcaster.

use std::sync::Arc;

use peek_parse::{Format, FormatDetector};
use peek_store::LogStore;
use peek_stream::Broadcaster;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{info, warn};

use crate::error::Result;

/// Lines longer than this are dropped with a warning.
const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Lines between progress log messages.
const PROGRESS_INTERVAL: u64 = 1000;

/// Owns the read-parse-store-publish loop.
///
/// Per-line failures (parse rejection, oversized input, a store write
/// error) log a warning and skip the line; the loop itself only ends at
/// EOF or on a read error.
pub struct IngestSupervisor {
    detector: FormatDetector,
    format: Format,
    store: Arc<LogStore>,
    broadcaster: Broadcaster,
}

impl IngestSupervisor {
    /// Creates a supervisor writing to the given store and broadcaster.
    #[must_use]
    pub fn new(format: Format, store: Arc<LogStore>, broadcaster: Broadcaster) -> Self {
        Self {
            detector: FormatDetector::new(),
            format,
            store,
            broadcaster,
        }
    }

    /// Consumes the reader line by line until EOF.
    ///
    /// Returns the number of records committed.
    ///
    /// # Errors
    ///
    /// Returns an error only when reading the input itself fails.
    pub async fn run<R>(&self, reader: R) -> Result<u64>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        let mut collected = 0u64;

        while let Some(line) = lines.next_line().await? {
            if line.is_empty() {
                continue;
            }
            if line.len() > MAX_LINE_BYTES {
                warn!(bytes = line.len(), "skipping oversized line");
                continue;
            }

            let record = match self.detector.parse_as(&line, self.format) {
                Ok(record) => record,
                Err(e) => {
                    warn!(error = %e, "skipping unparsable line");
                    continue;
                }
            };

            if let Err(e) = self.store.write(&record) {
                warn!(error = %e, "failed to store record");
                continue;
            }
            self.broadcaster.publish(&Arc::new(record));

            collected += 1;
            if collected % PROGRESS_INTERVAL == 0 {
                info!(collected, "collected log entries");
            }
        }

        Ok(collected)
    }
}
