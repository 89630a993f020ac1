//! Field-name and top-value discovery.

use std::collections::HashMap;

use peek_model::{FieldInfo, Record, TimeRange};
use redb::ReadableTable;

use crate::error::Result;
use crate::store::{primary_bounds, StoreInner, LOGS};

/// Values reported per field, most frequent first.
const MAX_TOP_VALUES: usize = 10;

/// Distinct values tracked per field before new ones are ignored.
///
/// Caps memory on high-cardinality fields; counts for already-seen
/// values keep accumulating past the cap.
const MAX_DISTINCT_VALUES: usize = 1000;

/// Built-in names that appear in every result, even with no data.
const BUILTIN_FIELDS: [&str; 3] = ["level", "message", "timestamp"];

/// Counts observed values for one field, remembering first-seen order so
/// frequency ties resolve deterministically.
#[derive(Debug, Default)]
struct ValueCounter {
    counts: HashMap<String, (usize, usize)>,
    next_rank: usize,
}

impl ValueCounter {
    fn add(&mut self, value: String) {
        if let Some((count, _)) = self.counts.get_mut(&value) {
            *count += 1;
        } else if self.counts.len() < MAX_DISTINCT_VALUES {
            let rank = self.next_rank;
            self.next_rank += 1;
            self.counts.insert(value, (1, rank));
        }
    }

    fn top(&self, n: usize) -> Vec<String> {
        let mut items: Vec<(&String, &(usize, usize))> = self.counts.iter().collect();
        items.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
        items.into_iter().take(n).map(|(v, _)| v.clone()).collect()
    }
}

impl StoreInner {
    /// Scans the primary index once and builds per-field value counts.
    ///
    /// `level` counts the record's level; `message` and `timestamp` are
    /// present but never enumerated (free text and near-unique values
    /// make their top-10 meaningless).
    pub(crate) fn collect_fields(&self, range: TimeRange) -> Result<Vec<FieldInfo>> {
        let mut counters: HashMap<String, ValueCounter> = HashMap::new();
        for builtin in BUILTIN_FIELDS {
            counters.insert(builtin.to_string(), ValueCounter::default());
        }

        let window = if range.is_unbounded() {
            None
        } else {
            Some(range)
        };
        let (lo, hi) = primary_bounds(window.as_ref());

        let db = self.db.read();
        let txn = db.begin_read()?;
        let table = txn.open_table(LOGS)?;
        for item in table.range(lo.as_str()..hi.as_str())? {
            let (_key, value) = item?;
            let Ok(record) = Record::from_json(value.value()) else {
                continue;
            };
            if !range.contains(record.timestamp) {
                continue;
            }

            if !record.level.is_empty() {
                if let Some(counter) = counters.get_mut("level") {
                    counter.add(record.level.clone());
                }
            }
            for (name, value) in &record.fields {
                if name == "message" {
                    continue;
                }
                counters
                    .entry(name.clone())
                    .or_default()
                    .add(value.to_string());
            }
        }

        let mut fields: Vec<FieldInfo> = counters
            .into_iter()
            .map(|(name, counter)| FieldInfo {
                top_values: if name == "message" || name == "timestamp" {
                    Vec::new()
                } else {
                    counter.top(MAX_TOP_VALUES)
                },
                name,
                field_type: "string".to_string(),
            })
            .collect();
        fields.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as StdHashMap;

    use chrono::{Duration, Utc};
    use peek_model::{generate_record_id, FieldValue};
    use tempfile::TempDir;

    use crate::store::{LogStore, StoreConfig};

    fn store_with_records(records: &[Record]) -> (LogStore, TempDir) {
        let dir = TempDir::new().expect("tempdir");
        let store = LogStore::open(StoreConfig::new(dir.path())).expect("open store");
        for record in records {
            store.write(record).expect("write");
        }
        (store, dir)
    }

    fn record(level: &str, fields: &[(&str, &str)]) -> Record {
        Record {
            id: generate_record_id(),
            timestamp: Utc::now(),
            level: level.to_string(),
            message: "msg".to_string(),
            fields: fields
                .iter()
                .map(|(k, v)| ((*k).to_string(), FieldValue::from(*v)))
                .collect(),
            raw: "raw".to_string(),
        }
    }

    fn by_name(fields: Vec<FieldInfo>) -> StdHashMap<String, FieldInfo> {
        fields.into_iter().map(|f| (f.name.clone(), f)).collect()
    }

    #[test]
    fn builtins_always_present_on_empty_store() {
        let (store, _dir) = store_with_records(&[]);
        let fields = store.get_fields(TimeRange::default()).expect("fields");
        let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["level", "message", "timestamp"]);
        assert!(fields.iter().all(|f| f.top_values.is_empty()));
        assert!(fields.iter().all(|f| f.field_type == "string"));
    }

    #[test]
    fn counts_levels_and_field_values() {
        let (store, _dir) = store_with_records(&[
            record("ERROR", &[("service", "api")]),
            record("ERROR", &[("service", "api")]),
            record("WARN", &[("service", "worker")]),
        ]);

        let fields = by_name(store.get_fields(TimeRange::default()).expect("fields"));

        assert_eq!(fields["level"].top_values, vec!["ERROR", "WARN"]);
        assert_eq!(fields["service"].top_values, vec!["api", "worker"]);
    }

    #[test]
    fn message_is_never_enumerated() {
        let (store, _dir) = store_with_records(&[record("INFO", &[])]);
        let fields = by_name(store.get_fields(TimeRange::default()).expect("fields"));
        assert!(fields["message"].top_values.is_empty());
        assert!(fields["timestamp"].top_values.is_empty());
    }

    #[test]
    fn top_values_cap_at_ten() {
        let mut records = Vec::new();
        for i in 0..15 {
            // "v00" appears most, then "v01", and so on down.
            for _ in 0..(15 - i) {
                records.push(record("INFO", &[("tag", &format!("v{i:02}"))]));
            }
        }
        let (store, _dir) = store_with_records(&records);
        let fields = by_name(store.get_fields(TimeRange::default()).expect("fields"));

        let top = &fields["tag"].top_values;
        assert_eq!(top.len(), 10);
        assert_eq!(top[0], "v00");
        assert_eq!(top[9], "v09");
    }

    #[test]
    fn window_restricts_the_scan() {
        let now = Utc::now();
        let mut early = record("INFO", &[("phase", "early")]);
        early.timestamp = now - Duration::hours(2);
        let mut late = record("INFO", &[("phase", "late")]);
        late.timestamp = now;

        let (store, _dir) = store_with_records(&[early, late]);
        let window = TimeRange::since(now - Duration::hours(1));
        let fields = by_name(store.get_fields(window).expect("fields"));

        assert_eq!(fields["phase"].top_values, vec!["late"]);
    }

    #[test]
    fn ties_resolve_by_first_seen() {
        let mut counter = ValueCounter::default();
        counter.add("b".to_string());
        counter.add("a".to_string());
        counter.add("a".to_string());
        counter.add("c".to_string());
        // a=2, then b and c tied at 1: b came first.
        assert_eq!(counter.top(3), vec!["a", "b", "c"]);
    }

    #[test]
    fn distinct_cap_stops_new_values() {
        let mut counter = ValueCounter::default();
        for i in 0..(MAX_DISTINCT_VALUES + 100) {
            counter.add(format!("v{i}"));
        }
        assert_eq!(counter.counts.len(), MAX_DISTINCT_VALUES);
        // Existing values keep counting past the cap.
        counter.add("v0".to_string());
        assert_eq!(counter.top(1), vec!["v0"]);
    }
}
