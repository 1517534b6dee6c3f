//! Quest Progression Engine
//!
//! Tracks player progress toward a catalog of goals driven by gameplay
//! events, latches completion exactly once, grants each reward through a
//! single idempotent claim, and rotates the active goal set on daily and
//! weekly boundaries.
//!
//! The engine is single-threaded and tick-driven: the session owner feeds
//! it objective events via [`QuestEngine::record_objective`], runs the
//! scheduler with [`QuestEngine::tick`], and reads the active set back for
//! presentation. Persistence, currency crediting, and notifications are
//! collaborators handed in at construction.

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod persist;
pub mod progress;
pub mod refresh;

pub use catalog::{Difficulty, GoalCatalog, GoalCategory, GoalDefinition, ObjectiveKind};
pub use config::EngineConfig;
pub use engine::{CurrencyLedger, EngineListener, NullListener, QuestEngine};
pub use error::QuestError;
pub use events::EventContext;
pub use persist::{FileAdapter, MemoryAdapter, PersistedState, PersistenceAdapter};
pub use progress::{ProgressRecord, ProgressStore};
pub use refresh::RefreshClock;
