//! Persistence Adapter
//!
//! Durable key-value storage for progress records and the refresh clock.
//! Layout: one `goal.<id>` entry per active goal holding its JSON-encoded
//! record, an `active_goals` index entry listing membership, and two
//! timestamp entries for the refresh clock.
//!
//! Loading tolerates a record whose payload fails to deserialize by
//! dropping only that record and reporting it, never the whole store.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::error::QuestError;
use crate::progress::{ProgressRecord, ProgressStore};
use crate::refresh::RefreshClock;

const INDEX_KEY: &str = "active_goals";
const DAILY_KEY: &str = "last_daily_refresh";
const WEEKLY_KEY: &str = "last_weekly_refresh";
const RECORD_PREFIX: &str = "goal.";

/// Everything an adapter recovers on load.
#[derive(Debug, Default)]
pub struct PersistedState {
    pub records: Vec<ProgressRecord>,
    pub clock: RefreshClock,
    /// Ids whose payload was missing or failed to deserialize. Non-fatal.
    pub dropped: Vec<String>,
}

/// Durable storage for the progress store and refresh clock.
pub trait PersistenceAdapter {
    fn save(&mut self, store: &ProgressStore, clock: &RefreshClock) -> Result<(), QuestError>;
    fn load(&mut self) -> Result<PersistedState, QuestError>;
}

fn encode(store: &ProgressStore, clock: &RefreshClock) -> Result<HashMap<String, String>, QuestError> {
    let mut entries = HashMap::new();

    let mut ids = Vec::new();
    for (id, record) in store.iter() {
        entries.insert(
            format!("{RECORD_PREFIX}{id}"),
            serde_json::to_string(record)?,
        );
        ids.push(id.to_string());
    }
    ids.sort();
    entries.insert(INDEX_KEY.to_string(), serde_json::to_string(&ids)?);
    entries.insert(DAILY_KEY.to_string(), clock.last_daily.to_rfc3339());
    entries.insert(WEEKLY_KEY.to_string(), clock.last_weekly.to_rfc3339());

    Ok(entries)
}

fn decode(entries: &HashMap<String, String>) -> PersistedState {
    // The index is the source of truth for membership. If it is itself
    // unreadable, recover membership by scanning record keys.
    let ids: Vec<String> = match entries.get(INDEX_KEY) {
        Some(raw) => serde_json::from_str(raw).unwrap_or_else(|e| {
            warn!("active goal index unreadable ({}), recovering from record keys", e);
            entries
                .keys()
                .filter_map(|k| k.strip_prefix(RECORD_PREFIX))
                .map(String::from)
                .collect()
        }),
        None => Vec::new(),
    };

    let mut records = Vec::new();
    let mut dropped = Vec::new();
    for id in ids {
        let key = format!("{RECORD_PREFIX}{id}");
        match entries.get(&key).map(|raw| serde_json::from_str(raw)) {
            Some(Ok(record)) => records.push(record),
            Some(Err(e)) => {
                warn!("dropping corrupt progress record '{}': {}", id, e);
                dropped.push(id);
            }
            None => {
                warn!("dropping progress record '{}': payload missing", id);
                dropped.push(id);
            }
        }
    }

    let clock = RefreshClock {
        last_daily: parse_timestamp(entries.get(DAILY_KEY), DAILY_KEY),
        last_weekly: parse_timestamp(entries.get(WEEKLY_KEY), WEEKLY_KEY),
    };

    PersistedState {
        records,
        clock,
        dropped,
    }
}

fn parse_timestamp(raw: Option<&String>, key: &str) -> DateTime<Utc> {
    match raw {
        Some(s) => match DateTime::parse_from_rfc3339(s) {
            Ok(dt) => dt.with_timezone(&Utc),
            Err(e) => {
                warn!("timestamp '{}' unreadable ({}), resetting to epoch", key, e);
                DateTime::<Utc>::UNIX_EPOCH
            }
        },
        None => DateTime::<Utc>::UNIX_EPOCH,
    }
}

/// File-backed adapter. The whole key-value map is written as one JSON
/// document via write-then-rename, so a crash mid-save leaves the previous
/// state intact.
pub struct FileAdapter {
    path: PathBuf,
}

impl FileAdapter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PersistenceAdapter for FileAdapter {
    fn save(&mut self, store: &ProgressStore, clock: &RefreshClock) -> Result<(), QuestError> {
        let entries = encode(store, clock)?;
        let body = serde_json::to_string_pretty(&entries)?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, body)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn load(&mut self) -> Result<PersistedState, QuestError> {
        if !self.path.exists() {
            return Ok(PersistedState::default());
        }
        let body = std::fs::read_to_string(&self.path)?;
        let entries: HashMap<String, String> = serde_json::from_str(&body)?;
        Ok(decode(&entries))
    }
}

/// In-memory adapter with the same key layout. Used in tests and as a
/// stand-in where durability is not wanted.
#[derive(Debug, Default)]
pub struct MemoryAdapter {
    entries: HashMap<String, String>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a raw entry. Lets tests plant corrupt payloads.
    pub fn insert_raw(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    pub fn get_raw(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

impl PersistenceAdapter for MemoryAdapter {
    fn save(&mut self, store: &ProgressStore, clock: &RefreshClock) -> Result<(), QuestError> {
        self.entries = encode(store, clock)?;
        Ok(())
    }

    fn load(&mut self) -> Result<PersistedState, QuestError> {
        Ok(decode(&self.entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn sample_store() -> (ProgressStore, RefreshClock) {
        let now = Utc.with_ymd_and_hms(2026, 8, 27, 12, 0, 0).unwrap();
        let mut store = ProgressStore::new(10);
        let mut rec = ProgressRecord::new("daily_play_3", now);
        rec.add_progress(2, 3, now);
        rec.recorded_tags.insert("rifle".to_string());
        store.insert(rec);
        store.insert(ProgressRecord::new("weekly_wins", now));
        let clock = RefreshClock {
            last_daily: now,
            last_weekly: now - chrono::Duration::days(3),
        };
        (store, clock)
    }

    #[test]
    fn test_memory_round_trip() {
        let (store, clock) = sample_store();
        let mut adapter = MemoryAdapter::new();
        adapter.save(&store, &clock).unwrap();

        let loaded = adapter.load().unwrap();
        assert_eq!(loaded.records.len(), 2);
        assert!(loaded.dropped.is_empty());
        assert_eq!(loaded.clock.last_daily, clock.last_daily);
        assert_eq!(loaded.clock.last_weekly, clock.last_weekly);

        let rec = loaded
            .records
            .iter()
            .find(|r| r.goal_id == "daily_play_3")
            .unwrap();
        assert_eq!(rec.current, 2);
        assert!(rec.recorded_tags.contains("rifle"));
    }

    #[test]
    fn test_saved_key_layout() {
        let (store, clock) = sample_store();
        let mut adapter = MemoryAdapter::new();
        adapter.save(&store, &clock).unwrap();

        // one payload entry per goal, one index entry, two clock entries
        assert!(adapter.get_raw("goal.daily_play_3").is_some());
        assert!(adapter.get_raw("goal.weekly_wins").is_some());
        let index: Vec<String> =
            serde_json::from_str(adapter.get_raw(INDEX_KEY).unwrap()).unwrap();
        assert_eq!(index, vec!["daily_play_3".to_string(), "weekly_wins".to_string()]);
        assert_eq!(
            adapter.get_raw(DAILY_KEY).unwrap(),
            clock.last_daily.to_rfc3339()
        );
        assert!(adapter.get_raw(WEEKLY_KEY).is_some());
    }

    #[test]
    fn test_corrupt_record_dropped_not_fatal() {
        let (store, clock) = sample_store();
        let mut adapter = MemoryAdapter::new();
        adapter.save(&store, &clock).unwrap();
        adapter.insert_raw("goal.daily_play_3", "{not json");

        let loaded = adapter.load().unwrap();
        assert_eq!(loaded.records.len(), 1);
        assert_eq!(loaded.records[0].goal_id, "weekly_wins");
        assert_eq!(loaded.dropped, vec!["daily_play_3".to_string()]);
    }

    #[test]
    fn test_corrupt_index_recovers_membership() {
        let (store, clock) = sample_store();
        let mut adapter = MemoryAdapter::new();
        adapter.save(&store, &clock).unwrap();
        adapter.insert_raw(INDEX_KEY, "not an array");

        let loaded = adapter.load().unwrap();
        assert_eq!(loaded.records.len(), 2);
    }

    #[test]
    fn test_file_round_trip_and_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("profile").join("quests.json");

        let mut adapter = FileAdapter::new(&path);
        let empty = adapter.load().unwrap();
        assert!(empty.records.is_empty());
        assert_eq!(empty.clock.last_daily, DateTime::<Utc>::UNIX_EPOCH);

        let (store, clock) = sample_store();
        adapter.save(&store, &clock).unwrap();

        let mut reopened = FileAdapter::new(&path);
        let loaded = reopened.load().unwrap();
        assert_eq!(loaded.records.len(), 2);
        assert_eq!(loaded.clock.last_weekly, clock.last_weekly);
        // no temp file left behind
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_bad_timestamp_resets_to_epoch() {
        let (store, clock) = sample_store();
        let mut adapter = MemoryAdapter::new();
        adapter.save(&store, &clock).unwrap();
        adapter.insert_raw(DAILY_KEY, "yesterday-ish");

        let loaded = adapter.load().unwrap();
        assert_eq!(loaded.clock.last_daily, DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(loaded.clock.last_weekly, clock.last_weekly);
    }
}
