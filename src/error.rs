//! Engine Error Taxonomy
//!
//! Every error here is recoverable within the session; the engine has no
//! fatal class. Best-effort paths (objective matching) swallow
//! `GoalNotFound` internally, explicit requests surface it.

use thiserror::Error;

/// Errors returned by the quest engine's public operations.
#[derive(Debug, Error)]
pub enum QuestError {
    /// A goal id was referenced that does not exist in the catalog.
    #[error("goal '{0}' not found in catalog")]
    GoalNotFound(String),

    /// Claim requested on a record that is missing, incomplete, or already
    /// claimed. No state change occurred.
    #[error("goal '{0}' is not claimable")]
    NotClaimable(String),

    /// The active goal set is at its configured bound.
    #[error("active goal set is full")]
    ActiveSetFull,

    /// A goal definition failed validation while loading the catalog.
    #[error("invalid goal definition: {0}")]
    InvalidDefinition(String),

    /// Reading or writing persisted state failed.
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl From<std::io::Error> for QuestError {
    fn from(e: std::io::Error) -> Self {
        QuestError::Persistence(e.to_string())
    }
}

impl From<serde_json::Error> for QuestError {
    fn from(e: serde_json::Error) -> Self {
        QuestError::Persistence(e.to_string())
    }
}
