//! Refresh Scheduler
//!
//! Time-boundary rotation of the active goal set. The daily boundary is a
//! calendar-day rollover; the weekly boundary is a full 168 elapsed hours.
//! A rotation is hard: every record of the due category is discarded
//! regardless of completion or claim state, then the category is
//! repopulated from shuffled catalog candidates up to its quota.
//!
//! The expiry sweep and the unconditional fill pass live here too; all of
//! it mutates the same store the engine owns, within one logical tick.

use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::GoalCategory;
use crate::engine::QuestEngine;
use crate::error::QuestError;
use crate::progress::ProgressRecord;

/// Persisted refresh timestamps driving the boundary checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClock {
    pub last_daily: DateTime<Utc>,
    pub last_weekly: DateTime<Utc>,
}

impl Default for RefreshClock {
    /// Epoch timestamps, so a fresh profile is due on its first tick.
    fn default() -> Self {
        Self {
            last_daily: DateTime::<Utc>::UNIX_EPOCH,
            last_weekly: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

impl RefreshClock {
    /// Calendar-day rollover, not a fixed 24h window: 23:59 -> 00:01 is due.
    pub fn daily_due(&self, now: DateTime<Utc>) -> bool {
        now.date_naive() > self.last_daily.date_naive()
    }

    /// A full week of elapsed time, independent of calendar weeks.
    pub fn weekly_due(&self, now: DateTime<Utc>) -> bool {
        now - self.last_weekly >= Duration::hours(168)
    }
}

impl QuestEngine {
    /// Run one scheduler pass at the current time.
    pub fn tick(&mut self) -> Result<(), QuestError> {
        self.tick_at(Utc::now())
    }

    /// Run one scheduler pass: expiry sweep, then daily and weekly
    /// boundary checks. Persists once if anything changed.
    pub fn tick_at(&mut self, now: DateTime<Utc>) -> Result<(), QuestError> {
        let mut mutated = self.expire_records(now);

        if self.clock.daily_due(now) {
            info!("{} refresh boundary reached", GoalCategory::Daily.as_str());
            self.rotate_category(GoalCategory::Daily, now);
            self.clock.last_daily = now;
            self.listener.goals_refreshed();
            mutated = true;
        }

        if self.clock.weekly_due(now) {
            info!("{} refresh boundary reached", GoalCategory::Weekly.as_str());
            self.rotate_category(GoalCategory::Weekly, now);
            self.clock.last_weekly = now;
            self.listener.goals_refreshed();
            mutated = true;
        }

        if mutated {
            self.persist()?;
        }
        Ok(())
    }

    /// Remove every record whose goal's time limit has elapsed since the
    /// record started. Runs for all categories; an unclaimed reward on an
    /// expired record is forfeited.
    fn expire_records(&mut self, now: DateTime<Utc>) -> bool {
        let mut removed = false;
        for id in self.store.active_ids() {
            let Some(goal) = self.catalog.get(&id) else {
                continue;
            };
            let Some(limit) = goal.time_limit_hours else {
                continue;
            };
            let expired = self
                .store
                .get(&id)
                .is_some_and(|r| r.is_expired(limit, now));
            if expired {
                info!("goal '{}' expired after {}h limit", id, limit);
                self.store.remove(&id);
                removed = true;
            }
        }
        removed
    }

    /// Hard rotation of one category: discard all of its records, then
    /// activate shuffled candidates up to the category quota. Records whose
    /// goal id has no catalog entry are inert carry-overs from a retired
    /// catalog; a rotation is where they get dropped.
    fn rotate_category(&mut self, category: GoalCategory, now: DateTime<Utc>) {
        for id in self.store.active_ids() {
            match self.catalog.get(&id) {
                Some(goal) if goal.category == category => {
                    debug!("rotating out '{}'", id);
                    self.store.remove(&id);
                }
                Some(_) => {}
                None => {
                    info!("dropping record '{}' with no catalog entry", id);
                    self.store.remove(&id);
                }
            }
        }
        self.activate_category(category, now);
    }

    /// Activate up to `quota` inactive goals of a category, or until the
    /// active-set bound, whichever comes first.
    fn activate_category(&mut self, category: GoalCategory, now: DateTime<Utc>) -> usize {
        let mut candidates = self.catalog.of_category(category);
        candidates.retain(|g| !self.store.contains(&g.id));
        // stable base order; selection then depends only on the shuffle source
        candidates.sort_by(|a, b| a.id.cmp(&b.id));
        candidates.shuffle(&mut *self.rng);

        let quota = self.config.quota(category);
        let mut added = 0;
        for goal in candidates {
            if added >= quota || self.store.is_full() {
                break;
            }
            self.store.insert(ProgressRecord::new(&goal.id, now));
            added += 1;
        }
        added
    }

    /// Unconditional top-up toward the active-set bound from any inactive
    /// catalog goals, in shuffled order. Not tied to a time boundary;
    /// invoked at startup after `load` or as a manual trigger.
    pub fn fill_active_set(&mut self) -> Result<usize, QuestError> {
        let now = Utc::now();
        let mut candidates: Vec<_> = self
            .catalog
            .iter()
            .filter(|g| !self.store.contains(&g.id))
            .cloned()
            .collect();
        candidates.sort_by(|a, b| a.id.cmp(&b.id));
        candidates.shuffle(&mut *self.rng);

        let mut added = 0;
        for goal in candidates {
            if self.store.is_full() {
                break;
            }
            self.store.insert(ProgressRecord::new(&goal.id, now));
            added += 1;
        }

        if added > 0 {
            info!("fill pass activated {} goals", added);
            self.listener.goals_refreshed();
            self.persist()?;
        }
        Ok(added)
    }

    /// Manual control: drop the entire active set and repopulate every
    /// category by its quota. Stamps both refresh timestamps.
    pub fn force_refresh(&mut self) -> Result<(), QuestError> {
        let now = Utc::now();
        for id in self.store.active_ids() {
            self.store.remove(&id);
        }
        for category in GoalCategory::ALL {
            self.activate_category(category, now);
        }
        self.clock.last_daily = now;
        self.clock.last_weekly = now;
        self.listener.goals_refreshed();
        self.persist()?;
        Ok(())
    }
}
