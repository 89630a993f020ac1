//! The redb-backed log store.

use std::collections::HashMap;
use std::ops::Bound;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{sync_channel, SyncSender};
use std::sync::Arc;
use std::thread::JoinHandle;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use peek_model::{FieldInfo, Record, TimeRange};
use peek_query::Filter;
use redb::{Database, ReadableTable, TableDefinition};
use serde::Serialize;
use tracing::warn;

use crate::error::Result;
use crate::keys;

/// File name of the database inside the configured directory.
const DB_FILE: &str = "peek.redb";

/// The single ordered keyspace holding records and index entries.
pub(crate) const LOGS: TableDefinition<&str, &[u8]> = TableDefinition::new("logs");

/// Records read per transaction during callback-driven scans.
const SCAN_CHUNK: usize = 512;

/// Configuration for opening a [`LogStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory holding the database file. Created if missing.
    pub dir: PathBuf,
    /// On-disk byte budget; oldest records go first when exceeded.
    pub retention_size: Option<u64>,
    /// Maximum record age in days.
    pub retention_days: Option<i64>,
    /// Commits between retention sweep triggers.
    pub sweep_interval: u64,
}

impl StoreConfig {
    /// Creates a config with no retention policy.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            retention_size: None,
            retention_days: None,
            sweep_interval: 1000,
        }
    }

    /// Sets the size budget in bytes.
    #[must_use]
    pub const fn with_retention_size(mut self, bytes: u64) -> Self {
        self.retention_size = Some(bytes);
        self
    }

    /// Sets the maximum record age in days.
    #[must_use]
    pub const fn with_retention_days(mut self, days: i64) -> Self {
        self.retention_days = Some(days);
        self
    }

    /// Sets how many commits pass between sweep triggers.
    #[must_use]
    pub const fn with_sweep_interval(mut self, commits: u64) -> Self {
        self.sweep_interval = commits;
        self
    }
}

/// Storage statistics.
#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    /// Number of stored records.
    pub total_logs: u64,
    /// On-disk size in megabytes.
    pub db_size_mb: f64,
    /// Record count per level. Records without a level are omitted.
    pub levels: HashMap<String, u64>,
}

/// Continuation signal returned by scan callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanFlow {
    /// Keep iterating.
    Continue,
    /// Stop the scan early.
    Stop,
}

pub(crate) struct StoreInner {
    /// Read guard for writes/queries, write guard for bulk deletion,
    /// retention, and compaction.
    pub(crate) db: RwLock<Database>,
    pub(crate) path: PathBuf,
    pub(crate) config: StoreConfig,
    write_count: AtomicU64,
}

/// Durable, time-ordered log storage.
///
/// Every record write commits the primary entry and its by-level index
/// twin in a single transaction. A dedicated sweeper thread applies the
/// retention policy; triggers are coalesced so at most one sweep runs at
/// a time.
pub struct LogStore {
    inner: Arc<StoreInner>,
    sweep_tx: Mutex<Option<SyncSender<()>>>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl LogStore {
    /// Opens (or creates) the store in the configured directory and runs
    /// an initial retention sweep.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the
    /// database cannot be opened.
    pub fn open(config: StoreConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.dir)?;
        let path = config.dir.join(DB_FILE);
        let db = Database::create(&path)?;

        // Make sure the table exists before any read transaction runs.
        let txn = db.begin_write()?;
        txn.open_table(LOGS)?;
        txn.commit()?;

        let inner = Arc::new(StoreInner {
            db: RwLock::new(db),
            path,
            config,
            write_count: AtomicU64::new(0),
        });

        if let Err(e) = inner.enforce_retention() {
            warn!(error = %e, "startup retention sweep failed");
        }

        let (sweep_tx, sweep_rx) = sync_channel::<()>(1);
        let sweeper_inner = Arc::clone(&inner);
        let sweeper = std::thread::Builder::new()
            .name("peek-retention".to_string())
            .spawn(move || {
                while sweep_rx.recv().is_ok() {
                    if let Err(e) = sweeper_inner.enforce_retention() {
                        warn!(error = %e, "retention sweep failed");
                    }
                }
            })?;

        Ok(Self {
            inner,
            sweep_tx: Mutex::new(Some(sweep_tx)),
            sweeper: Mutex::new(Some(sweeper)),
        })
    }

    /// Durably writes a record: primary key and by-level index entry in
    /// one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the commit fails.
    pub fn write(&self, record: &Record) -> Result<()> {
        let value = record.to_json()?;
        let nanos = keys::timestamp_nanos(record.timestamp);
        let primary = keys::primary_key(nanos, &record.id);
        let index = keys::level_key(&record.level, nanos, &record.id);

        {
            let db = self.inner.db.read();
            let txn = db.begin_write()?;
            {
                let mut table = txn.open_table(LOGS)?;
                table.insert(primary.as_str(), value.as_slice())?;
                table.insert(index.as_str(), record.id.as_bytes())?;
            }
            txn.commit()?;
        }

        let committed = self.inner.write_count.fetch_add(1, Ordering::Relaxed) + 1;
        let interval = self.inner.config.sweep_interval;
        if interval > 0 && committed % interval == 0 {
            self.trigger_sweep();
        }
        Ok(())
    }

    /// Queries records in forward (chronological) order.
    ///
    /// `total` counts every match regardless of `limit`/`offset`. When a
    /// time range is given, iteration seeks directly to its window
    /// instead of scanning the whole keyspace; the filter still runs per
    /// record since it may restrict further.
    ///
    /// # Errors
    ///
    /// Surfaces engine I/O errors as is.
    pub fn query(
        &self,
        filter: &Filter,
        time_range: Option<TimeRange>,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<Record>, usize)> {
        let (lo, hi) = primary_bounds(time_range.as_ref());

        let db = self.inner.db.read();
        let txn = db.begin_read()?;
        let table = txn.open_table(LOGS)?;

        let mut records = Vec::new();
        let mut total = 0usize;
        let mut skipped = 0usize;

        for item in table.range(lo.as_str()..hi.as_str())? {
            let (_key, value) = item?;
            let Ok(record) = Record::from_json(value.value()) else {
                continue;
            };
            if let Some(range) = &time_range {
                if !range.contains(record.timestamp) {
                    continue;
                }
            }
            if !filter.matches(&record) {
                continue;
            }
            total += 1;
            if skipped < offset {
                skipped += 1;
                continue;
            }
            if records.len() < limit {
                records.push(record);
            }
        }

        Ok((records, total))
    }

    /// Iterates all records in forward order, invoking the callback for
    /// each.
    ///
    /// Records are read in chunks; the store lock and the read
    /// transaction are released before any callback runs, so a callback
    /// may freely call back into the store.
    ///
    /// # Errors
    ///
    /// Propagates engine errors and any error returned by the callback.
    pub fn scan<F>(&self, mut callback: F) -> Result<()>
    where
        F: FnMut(&Record) -> Result<ScanFlow>,
    {
        let hi = keys::prefix_end(keys::LOG_PREFIX);
        let mut resume: Option<String> = None;

        loop {
            let mut chunk: Vec<Record> = Vec::with_capacity(SCAN_CHUNK);
            let mut last_key: Option<String> = None;
            let mut seen = 0usize;
            {
                let db = self.inner.db.read();
                let txn = db.begin_read()?;
                let table = txn.open_table(LOGS)?;
                let range = match &resume {
                    Some(last) => table.range::<&str>((
                        Bound::Excluded(last.as_str()),
                        Bound::Excluded(hi.as_str()),
                    ))?,
                    None => table.range(keys::LOG_PREFIX..hi.as_str())?,
                };
                for item in range {
                    let (key, value) = item?;
                    last_key = Some(key.value().to_string());
                    if let Ok(record) = Record::from_json(value.value()) {
                        chunk.push(record);
                    }
                    seen += 1;
                    if seen >= SCAN_CHUNK {
                        break;
                    }
                }
            }

            let Some(last) = last_key else {
                return Ok(());
            };
            resume = Some(last);

            for record in &chunk {
                if callback(record)? == ScanFlow::Stop {
                    return Ok(());
                }
            }

            if seen < SCAN_CHUNK {
                return Ok(());
            }
        }
    }

    /// Discovers field names and their most frequent values, optionally
    /// restricted to a time window.
    ///
    /// # Errors
    ///
    /// Surfaces engine I/O errors as is.
    pub fn get_fields(&self, range: TimeRange) -> Result<Vec<FieldInfo>> {
        self.inner.collect_fields(range)
    }

    /// Returns totals, on-disk size, and per-level counts.
    ///
    /// Level counts come from the secondary index alone, without reading
    /// record values.
    ///
    /// # Errors
    ///
    /// Surfaces engine I/O errors as is.
    pub fn get_stats(&self) -> Result<Stats> {
        let (total, levels) = {
            let db = self.inner.db.read();
            let txn = db.begin_read()?;
            let table = txn.open_table(LOGS)?;

            let mut total = 0u64;
            let hi = keys::prefix_end(keys::LOG_PREFIX);
            for item in table.range(keys::LOG_PREFIX..hi.as_str())? {
                item?;
                total += 1;
            }

            let mut levels: HashMap<String, u64> = HashMap::new();
            let idx_hi = keys::prefix_end(keys::LEVEL_INDEX_PREFIX);
            for item in table.range(keys::LEVEL_INDEX_PREFIX..idx_hi.as_str())? {
                let (key, _value) = item?;
                if let Some((level, _, _)) = keys::parse_level_key(key.value()) {
                    if !level.is_empty() {
                        *levels.entry(level.to_string()).or_insert(0) += 1;
                    }
                }
            }
            (total, levels)
        };

        let bytes = self.inner.db_size()?;
        Ok(Stats {
            total_logs: total,
            db_size_mb: bytes as f64 / (1024.0 * 1024.0),
            levels,
        })
    }

    /// Returns the oldest and newest stored timestamps, if any.
    ///
    /// # Errors
    ///
    /// Surfaces engine I/O errors as is.
    pub fn get_oldest_newest(&self) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)> {
        let db = self.inner.db.read();
        let txn = db.begin_read()?;
        let table = txn.open_table(LOGS)?;
        let hi = keys::prefix_end(keys::LOG_PREFIX);
        let mut range = table.range(keys::LOG_PREFIX..hi.as_str())?;

        let oldest = match range.next() {
            Some(item) => {
                let (_key, value) = item?;
                Record::from_json(value.value()).ok().map(|r| r.timestamp)
            }
            None => None,
        };
        let newest = match range.next_back() {
            Some(item) => {
                let (_key, value) = item?;
                Record::from_json(value.value()).ok().map(|r| r.timestamp)
            }
            None => oldest,
        };

        Ok((oldest, newest))
    }

    /// Deletes every record and index entry.
    ///
    /// # Errors
    ///
    /// Surfaces engine I/O errors as is.
    pub fn delete_all(&self) -> Result<usize> {
        self.inner.delete_all()
    }

    /// Deletes all records with the given level, plus their index twins.
    ///
    /// # Errors
    ///
    /// Surfaces engine I/O errors as is.
    pub fn delete_by_level(&self, level: &str) -> Result<usize> {
        self.inner.delete_by_level(level)
    }

    /// Deletes all records strictly older than `cutoff`.
    ///
    /// # Errors
    ///
    /// Surfaces engine I/O errors as is.
    pub fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        self.inner.delete_older_than(cutoff)
    }

    /// Applies the retention policy immediately.
    ///
    /// # Errors
    ///
    /// Surfaces engine I/O errors as is.
    pub fn enforce_retention(&self) -> Result<()> {
        self.inner.enforce_retention()
    }

    /// Reclaims disk space after bulk deletions.
    ///
    /// Takes the writer lock for the duration.
    ///
    /// # Errors
    ///
    /// Surfaces engine I/O errors as is.
    pub fn compact(&self) -> Result<bool> {
        self.inner.compact()
    }

    /// Flushes pending writes to disk.
    ///
    /// # Errors
    ///
    /// Surfaces engine I/O errors as is.
    pub fn sync(&self) -> Result<()> {
        self.inner.sync()
    }

    /// Stops the sweeper thread and flushes the database.
    ///
    /// Safe to call more than once.
    ///
    /// # Errors
    ///
    /// Surfaces engine I/O errors as is.
    pub fn close(&self) -> Result<()> {
        drop(self.sweep_tx.lock().take());
        if let Some(handle) = self.sweeper.lock().take() {
            let _ = handle.join();
        }
        self.inner.sync()
    }

    fn trigger_sweep(&self) {
        if let Some(tx) = self.sweep_tx.lock().as_ref() {
            // Capacity-1 channel: a pending trigger already covers us.
            let _ = tx.try_send(());
        }
    }
}

impl StoreInner {
    pub(crate) fn db_size(&self) -> Result<u64> {
        Ok(std::fs::metadata(&self.path)?.len())
    }

    pub(crate) fn sync(&self) -> Result<()> {
        let db = self.db.read();
        let txn = db.begin_write()?;
        txn.commit()?;
        Ok(())
    }

    pub(crate) fn compact(&self) -> Result<bool> {
        let mut db = self.db.write();
        Ok(db.compact()?)
    }

    pub(crate) fn delete_all(&self) -> Result<usize> {
        let db = self.db.write();
        let mut primary = Vec::new();
        let mut index = Vec::new();
        {
            let txn = db.begin_read()?;
            let table = txn.open_table(LOGS)?;
            let hi = keys::prefix_end(keys::LOG_PREFIX);
            for item in table.range(keys::LOG_PREFIX..hi.as_str())? {
                let (key, _value) = item?;
                primary.push(key.value().to_string());
            }
            let idx_hi = keys::prefix_end(keys::LEVEL_INDEX_PREFIX);
            for item in table.range(keys::LEVEL_INDEX_PREFIX..idx_hi.as_str())? {
                let (key, _value) = item?;
                index.push(key.value().to_string());
            }
        }
        let count = primary.len();
        remove_keys(&db, primary.iter().chain(index.iter()))?;
        Ok(count)
    }

    pub(crate) fn delete_by_level(&self, level: &str) -> Result<usize> {
        let db = self.db.write();
        let mut primary = Vec::new();
        let mut index = Vec::new();
        {
            let txn = db.begin_read()?;
            let table = txn.open_table(LOGS)?;
            let prefix = format!("{}{level}:", keys::LEVEL_INDEX_PREFIX);
            let hi = keys::prefix_end(&prefix);
            for item in table.range(prefix.as_str()..hi.as_str())? {
                let (key, _value) = item?;
                let key = key.value().to_string();
                if let Some((_, nanos, id)) = keys::parse_level_key(&key) {
                    primary.push(keys::primary_key(nanos, id));
                }
                index.push(key);
            }
        }
        let count = primary.len();
        remove_keys(&db, primary.iter().chain(index.iter()))?;
        Ok(count)
    }

    pub(crate) fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let db = self.db.write();
        let cutoff_key = format!("{}{}:", keys::LOG_PREFIX, keys::timestamp_nanos(cutoff));
        let mut primary = Vec::new();
        let mut index = Vec::new();
        {
            let txn = db.begin_read()?;
            let table = txn.open_table(LOGS)?;
            for item in table.range(keys::LOG_PREFIX..cutoff_key.as_str())? {
                let (key, value) = item?;
                primary.push(key.value().to_string());
                if let Ok(record) = Record::from_json(value.value()) {
                    let nanos = keys::timestamp_nanos(record.timestamp);
                    index.push(keys::level_key(&record.level, nanos, &record.id));
                }
            }
        }
        let count = primary.len();
        remove_keys(&db, primary.iter().chain(index.iter()))?;
        Ok(count)
    }
}

/// Removes a batch of keys in one transaction.
pub(crate) fn remove_keys<'a>(
    db: &Database,
    batch: impl Iterator<Item = &'a String>,
) -> Result<()> {
    let txn = db.begin_write()?;
    {
        let mut table = txn.open_table(LOGS)?;
        for key in batch {
            table.remove(key.as_str())?;
        }
    }
    txn.commit()?;
    Ok(())
}

/// Seek bounds for a primary scan: `[lo, hi)` key strings.
pub(crate) fn primary_bounds(time_range: Option<&TimeRange>) -> (String, String) {
    let lo = time_range
        .and_then(|r| r.start)
        .map_or_else(
            || keys::LOG_PREFIX.to_string(),
            |start| format!("{}{}:", keys::LOG_PREFIX, keys::timestamp_nanos(start)),
        );
    let hi = time_range.and_then(|r| r.end).map_or_else(
        || keys::prefix_end(keys::LOG_PREFIX),
        |end| format!("{}{}:", keys::LOG_PREFIX, keys::timestamp_nanos(end) + 1),
    );
    (lo, hi)
}
