//! Quest Progression Engine
//!
//! Translates objective events into progress record mutations with
//! exactly-once completion semantics, grants claimable rewards exactly
//! once, and persists after every mutating operation.
//!
//! The engine is an explicitly constructed, single-owner instance: it is
//! handed its catalog, persistence adapter, and currency ledger at
//! construction and is the only mutator of its progress store.

use std::sync::Arc;

use chrono::Utc;
use rand::RngCore;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::catalog::{GoalCatalog, GoalDefinition, ObjectiveKind};
use crate::config::EngineConfig;
use crate::error::QuestError;
use crate::events::{context_matches, EventContext};
use crate::persist::PersistenceAdapter;
use crate::progress::{ProgressRecord, ProgressStore};
use crate::refresh::RefreshClock;

/// Synchronous notification sink for the presentation layer.
///
/// Callbacks fire at the point of mutation, before the operation that
/// caused them returns. Default bodies are no-ops.
pub trait EngineListener {
    fn goal_completed(&mut self, _goal: &GoalDefinition, _record: &ProgressRecord) {}
    fn progress_updated(&mut self, _goal: &GoalDefinition, _record: &ProgressRecord) {}
    fn goals_refreshed(&mut self) {}
}

/// Listener that ignores everything.
pub struct NullListener;

impl EngineListener for NullListener {}

/// External currency collaborator. Credited on successful claims;
/// fire-and-forget from the engine's perspective.
pub trait CurrencyLedger {
    fn credit(&mut self, amount: u32);
}

/// The central progression engine. Owns the active-set store, the refresh
/// clock, and the persistence/notification/currency collaborators.
pub struct QuestEngine {
    pub(crate) catalog: GoalCatalog,
    pub(crate) config: EngineConfig,
    pub(crate) store: ProgressStore,
    pub(crate) clock: RefreshClock,
    pub(crate) persistence: Box<dyn PersistenceAdapter>,
    pub(crate) listener: Box<dyn EngineListener>,
    pub(crate) wallet: Box<dyn CurrencyLedger>,
    pub(crate) rng: Box<dyn RngCore>,
}

impl QuestEngine {
    pub fn new(
        catalog: GoalCatalog,
        config: EngineConfig,
        persistence: Box<dyn PersistenceAdapter>,
        wallet: Box<dyn CurrencyLedger>,
    ) -> Self {
        let store = ProgressStore::new(config.max_active_goals);
        Self {
            catalog,
            config,
            store,
            clock: RefreshClock::default(),
            persistence,
            listener: Box::new(NullListener),
            wallet,
            rng: Box::new(StdRng::from_entropy()),
        }
    }

    pub fn with_listener(mut self, listener: Box<dyn EngineListener>) -> Self {
        self.listener = listener;
        self
    }

    /// Replace the shuffle source. Tests seed a `StdRng` here so refresh
    /// selection is reproducible.
    pub fn with_rng(mut self, rng: Box<dyn RngCore>) -> Self {
        self.rng = rng;
        self
    }

    /// Load persisted records and the refresh clock into the engine.
    ///
    /// Returns the ids of records dropped as corrupt. A record whose goal
    /// is missing from the catalog is kept inert; the next rotation
    /// discards it. A completely unreadable state file starts a fresh
    /// session rather than aborting.
    pub fn load(&mut self) -> Vec<String> {
        match self.persistence.load() {
            Ok(state) => {
                self.clock = state.clock;
                for record in state.records {
                    if !self.catalog.contains(&record.goal_id) {
                        debug!(
                            "record '{}' has no catalog entry, keeping inert",
                            record.goal_id
                        );
                    }
                    self.store.insert_unchecked(record);
                }
                info!(
                    "loaded {} active goals ({} dropped)",
                    self.store.len(),
                    state.dropped.len()
                );
                state.dropped
            }
            Err(e) => {
                warn!("persisted quest state unreadable, starting fresh: {}", e);
                Vec::new()
            }
        }
    }

    /// Record a gameplay occurrence against every active, not-yet-completed
    /// goal of the matching kind.
    ///
    /// `amount` is added as-is; threshold crossings for continuous
    /// quantities (damage, distance) are converted into discrete events by
    /// the event source before calling in. The store is persisted once
    /// after all matching records are processed.
    pub fn record_objective(
        &mut self,
        kind: ObjectiveKind,
        amount: u32,
        context: EventContext,
    ) -> Result<(), QuestError> {
        if amount == 0 {
            return Ok(());
        }
        let now = Utc::now();
        let mut mutated = false;

        for id in self.store.active_ids() {
            // Best-effort path: ids with no catalog entry are skipped.
            let Some(goal) = self.catalog.get(&id).cloned() else {
                continue;
            };
            if goal.kind != kind {
                continue;
            }
            let Some(record) = self.store.get_mut(&id) else {
                continue;
            };
            if record.completed {
                continue;
            }
            if !context_matches(&self.config, kind, &context, &record.recorded_tags) {
                continue;
            }

            if kind.dedupes_tags() {
                if let EventContext::Tag(tag) = &context {
                    record.recorded_tags.insert(tag.clone());
                }
            }

            let newly_completed = record.add_progress(amount, goal.target, now);
            mutated = true;

            if newly_completed {
                info!("goal '{}' completed", goal.id);
                self.listener.goal_completed(&goal, record);
            } else {
                self.listener.progress_updated(&goal, record);
            }
        }

        if mutated {
            self.persist()?;
        }
        Ok(())
    }

    /// Claim a completed goal's reward. Idempotent: exactly one call per
    /// goal lifetime succeeds; every other returns `NotClaimable` with no
    /// state change and no currency movement.
    pub fn claim_reward(&mut self, goal_id: &str) -> Result<u32, QuestError> {
        let Some(goal) = self.catalog.get(goal_id).cloned() else {
            warn!("claim requested for unknown goal '{}'", goal_id);
            return Err(QuestError::GoalNotFound(goal_id.to_string()));
        };

        let Some(record) = self.store.get_mut(goal_id) else {
            return Err(QuestError::NotClaimable(goal_id.to_string()));
        };
        if !record.is_claimable() {
            return Err(QuestError::NotClaimable(goal_id.to_string()));
        }

        record.reward_claimed = true;
        self.wallet.credit(goal.reward);
        info!("claimed {} for goal '{}'", goal.reward, goal.id);
        self.persist()?;
        Ok(goal.reward)
    }

    /// Explicitly activate a goal. Returns `Ok(false)` when it is already
    /// active, `ActiveSetFull` at the bound, `GoalNotFound` for ids absent
    /// from the catalog.
    pub fn add_goal(&mut self, goal_id: &str) -> Result<bool, QuestError> {
        if !self.catalog.contains(goal_id) {
            warn!("add requested for unknown goal '{}'", goal_id);
            return Err(QuestError::GoalNotFound(goal_id.to_string()));
        }
        if self.store.contains(goal_id) {
            return Ok(false);
        }
        if self.store.is_full() {
            return Err(QuestError::ActiveSetFull);
        }

        self.store.insert(ProgressRecord::new(goal_id, Utc::now()));
        self.persist()?;
        Ok(true)
    }

    /// Debug control: complete every active goal immediately.
    pub fn force_complete_all(&mut self) -> Result<(), QuestError> {
        let now = Utc::now();
        let mut mutated = false;
        for id in self.store.active_ids() {
            let Some(goal) = self.catalog.get(&id).cloned() else {
                continue;
            };
            let Some(record) = self.store.get_mut(&id) else {
                continue;
            };
            if record.completed {
                continue;
            }
            record.add_progress(goal.target, goal.target, now);
            mutated = true;
            self.listener.goal_completed(&goal, record);
        }
        if mutated {
            self.persist()?;
        }
        Ok(())
    }

    /// Debug control: claim every completed, unclaimed goal.
    pub fn force_claim_all_completed(&mut self) -> Result<u32, QuestError> {
        let mut total = 0;
        let mut mutated = false;
        for id in self.store.active_ids() {
            let Some(goal) = self.catalog.get(&id).cloned() else {
                continue;
            };
            let Some(record) = self.store.get_mut(&id) else {
                continue;
            };
            if !record.is_claimable() {
                continue;
            }
            record.reward_claimed = true;
            self.wallet.credit(goal.reward);
            total += goal.reward;
            mutated = true;
        }
        if mutated {
            self.persist()?;
        }
        Ok(total)
    }

    // --- read surface for the presentation layer ---

    /// Active goals paired with their definitions. Inert records (goal id
    /// unknown to the catalog) are omitted here but still reachable via
    /// [`QuestEngine::progress`].
    pub fn active_goals(&self) -> Vec<(Arc<GoalDefinition>, &ProgressRecord)> {
        let mut out: Vec<_> = self
            .store
            .iter()
            .filter_map(|(id, record)| self.catalog.get(id).map(|g| (g.clone(), record)))
            .collect();
        out.sort_by(|a, b| a.0.id.cmp(&b.0.id));
        out
    }

    pub fn progress(&self, goal_id: &str) -> Option<&ProgressRecord> {
        self.store.get(goal_id)
    }

    pub fn goal(&self, goal_id: &str) -> Option<&Arc<GoalDefinition>> {
        self.catalog.get(goal_id)
    }

    pub fn active_count(&self) -> usize {
        self.store.len()
    }

    pub fn clock(&self) -> &RefreshClock {
        &self.clock
    }

    pub fn catalog(&self) -> &GoalCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn persist(&mut self) -> Result<(), QuestError> {
        self.persistence.save(&self.store, &self.clock)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::catalog::{Difficulty, GoalCategory};

    /// Wallet that records every credit for assertions.
    #[derive(Default)]
    pub struct RecordingWallet {
        pub credits: Rc<RefCell<Vec<u32>>>,
    }

    impl CurrencyLedger for RecordingWallet {
        fn credit(&mut self, amount: u32) {
            self.credits.borrow_mut().push(amount);
        }
    }

    /// Listener that counts notifications per channel.
    #[derive(Default)]
    pub struct RecordingListener {
        pub completed: Rc<RefCell<Vec<String>>>,
        pub progressed: Rc<RefCell<Vec<String>>>,
        pub refreshes: Rc<RefCell<u32>>,
    }

    impl EngineListener for RecordingListener {
        fn goal_completed(&mut self, goal: &GoalDefinition, _record: &ProgressRecord) {
            self.completed.borrow_mut().push(goal.id.clone());
        }

        fn progress_updated(&mut self, goal: &GoalDefinition, _record: &ProgressRecord) {
            self.progressed.borrow_mut().push(goal.id.clone());
        }

        fn goals_refreshed(&mut self) {
            *self.refreshes.borrow_mut() += 1;
        }
    }

    pub fn goal(
        id: &str,
        category: GoalCategory,
        kind: ObjectiveKind,
        target: u32,
        reward: u32,
    ) -> GoalDefinition {
        GoalDefinition {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            category,
            difficulty: Difficulty::Easy,
            kind,
            target,
            reward,
            time_limit_hours: None,
            level_required: 0,
            prerequisites: Vec::new(),
        }
    }
}
