//! Retention sweeps.
//!
//! Two independent policies, either of which may be active:
//!
//! - *Size-based*: when the database file exceeds its byte budget, the
//!   oldest records are deleted until the estimated size sits 20% below
//!   the budget, so back-to-back sweeps do not oscillate around it.
//! - *Time-based*: records older than `retention_days` are deleted.
//!
//! Sweeps run once at startup and again every `sweep_interval` commits.
//! Errors are logged and never abort the process.

use chrono::Utc;
use peek_model::Record;
use redb::ReadableTable;
use tracing::{debug, warn};

use crate::error::Result;
use crate::keys;
use crate::store::{remove_keys, StoreInner, LOGS};

impl StoreInner {
    /// Applies both retention policies.
    pub(crate) fn enforce_retention(&self) -> Result<()> {
        if let Some(budget) = self.config.retention_size {
            let size = self.db_size()?;
            if size > budget {
                let target = budget - budget / 5;
                let excess = size.saturating_sub(target);
                let deleted = self.delete_oldest_bytes(excess)?;
                if deleted > 0 {
                    debug!(deleted, size, budget, "size retention removed oldest records");
                    if let Err(e) = self.compact() {
                        warn!(error = %e, "compaction after size retention failed");
                    }
                }
            }
        }

        if let Some(days) = self.config.retention_days {
            let cutoff = Utc::now() - chrono::Duration::days(days);
            let deleted = self.delete_older_than(cutoff)?;
            if deleted > 0 {
                debug!(deleted, %cutoff, "time retention removed expired records");
            }
        }

        Ok(())
    }

    /// Deletes the oldest records until roughly `excess` bytes of keys
    /// and values are gone, removing index twins alongside.
    fn delete_oldest_bytes(&self, excess: u64) -> Result<usize> {
        let db = self.db.write();
        let mut primary = Vec::new();
        let mut index = Vec::new();
        let mut freed = 0u64;
        {
            let txn = db.begin_read()?;
            let table = txn.open_table(LOGS)?;
            let hi = keys::prefix_end(keys::LOG_PREFIX);
            for item in table.range(keys::LOG_PREFIX..hi.as_str())? {
                if freed >= excess {
                    break;
                }
                let (key, value) = item?;
                let key = key.value().to_string();
                freed += (key.len() + value.value().len()) as u64;
                if let Ok(record) = Record::from_json(value.value()) {
                    let nanos = keys::timestamp_nanos(record.timestamp);
                    index.push(keys::level_key(&record.level, nanos, &record.id));
                }
                primary.push(key);
            }
        }
        let count = primary.len();
        remove_keys(&db, primary.iter().chain(index.iter()))?;
        Ok(count)
    }
}
