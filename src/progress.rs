//! Progress State Tracking
//!
//! Per-goal progress records and the bounded active set. Completion and
//! claiming are latches: once set they are never re-evaluated or cleared
//! by the engine.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mutable progress state for one active goal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub goal_id: String,
    /// Current progress counter. Clamped at the goal's target.
    pub current: u32,
    pub completed: bool,
    pub reward_claimed: bool,
    /// When the record entered the active set.
    pub started_at: DateTime<Utc>,
    /// When the goal completed (absent until then).
    pub completed_at: Option<DateTime<Utc>>,
    /// Distinct tags already counted for this goal (weapon types used,
    /// locations visited). Exact string match.
    #[serde(default)]
    pub recorded_tags: BTreeSet<String>,
}

impl ProgressRecord {
    pub fn new(goal_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            goal_id: goal_id.to_string(),
            current: 0,
            completed: false,
            reward_claimed: false,
            started_at: now,
            completed_at: None,
            recorded_tags: BTreeSet::new(),
        }
    }

    /// Add progress toward `target` and return true if newly completed.
    ///
    /// Completed records are never incremented; the counter clamps at the
    /// target so the final increment is terminal.
    pub fn add_progress(&mut self, amount: u32, target: u32, now: DateTime<Utc>) -> bool {
        if self.completed {
            return false;
        }
        self.current = self.current.saturating_add(amount).min(target);
        if self.current >= target {
            self.completed = true;
            self.completed_at = Some(now);
            true
        } else {
            false
        }
    }

    /// Completed and not yet claimed.
    pub fn is_claimable(&self) -> bool {
        self.completed && !self.reward_claimed
    }

    /// Whether this record has outlived a goal's time limit.
    pub fn is_expired(&self, limit_hours: u32, now: DateTime<Utc>) -> bool {
        now - self.started_at > chrono::Duration::hours(i64::from(limit_hours))
    }

    pub fn progress_percent(&self, target: u32) -> f32 {
        if target == 0 {
            return 1.0;
        }
        self.current as f32 / target as f32
    }
}

/// The active goal set: goal id -> progress record, bounded in size.
///
/// Membership changes only through the refresh scheduler or an explicit
/// add; a record exists here if and only if its goal is active.
#[derive(Debug, Clone)]
pub struct ProgressStore {
    records: HashMap<String, ProgressRecord>,
    max_active: usize,
}

impl ProgressStore {
    pub fn new(max_active: usize) -> Self {
        Self {
            records: HashMap::new(),
            max_active,
        }
    }

    pub fn max_active(&self) -> usize {
        self.max_active
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.records.len() >= self.max_active
    }

    pub fn contains(&self, goal_id: &str) -> bool {
        self.records.contains_key(goal_id)
    }

    pub fn get(&self, goal_id: &str) -> Option<&ProgressRecord> {
        self.records.get(goal_id)
    }

    pub fn get_mut(&mut self, goal_id: &str) -> Option<&mut ProgressRecord> {
        self.records.get_mut(goal_id)
    }

    /// Insert respecting the active-set bound. Returns false when full.
    pub fn insert(&mut self, record: ProgressRecord) -> bool {
        if self.is_full() && !self.records.contains_key(&record.goal_id) {
            return false;
        }
        self.records.insert(record.goal_id.clone(), record);
        true
    }

    /// Insert without the bound check. Used when reloading persisted
    /// state, which may predate a shrunk bound.
    pub(crate) fn insert_unchecked(&mut self, record: ProgressRecord) {
        self.records.insert(record.goal_id.clone(), record);
    }

    pub fn remove(&mut self, goal_id: &str) -> Option<ProgressRecord> {
        self.records.remove(goal_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ProgressRecord)> {
        self.records.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Snapshot of active goal ids, sorted for deterministic iteration.
    pub fn active_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.records.keys().cloned().collect();
        ids.sort();
        ids
    }
}
