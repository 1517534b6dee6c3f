//! Objective Event Context
//!
//! Events arrive as an objective kind plus a tagged context payload. Each
//! eligibility predicate pattern-matches its expected variant, so a
//! mismatched payload is ineligible rather than a runtime cast failure.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::catalog::ObjectiveKind;
use crate::config::EngineConfig;

/// Typed payload accompanying a `record_objective` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventContext {
    /// No payload; the kind and amount carry everything.
    None,
    /// Final placement in a match.
    Placement { place: u32, total_entrants: u32 },
    /// Distance scalar (engine units), e.g. elimination range.
    Distance(f32),
    /// Boolean qualifier, e.g. whether an elimination was a headshot.
    Flag(bool),
    /// String tag, e.g. a weapon type or location name.
    Tag(String),
}

/// Evaluate the eligibility predicate for one goal kind against an event
/// context. `recorded_tags` is the goal's set of tags already counted.
///
/// Kinds without a predicate row are always eligible.
pub(crate) fn context_matches(
    config: &EngineConfig,
    kind: ObjectiveKind,
    context: &EventContext,
    recorded_tags: &BTreeSet<String>,
) -> bool {
    match kind {
        ObjectiveKind::FinishTopPercent => match context {
            EventContext::Placement {
                place,
                total_entrants,
            } => {
                *total_entrants > 0
                    && (*place as f32 / *total_entrants as f32) <= config.top_percent_threshold
            }
            _ => false,
        },
        ObjectiveKind::CloseRangeEliminations => match context {
            EventContext::Distance(d) => *d <= config.close_range_distance,
            _ => false,
        },
        ObjectiveKind::HeadshotEliminations => matches!(context, EventContext::Flag(true)),
        ObjectiveKind::LandInHighRiskAreas => match context {
            EventContext::Tag(location) => config.is_high_risk(location),
            _ => false,
        },
        ObjectiveKind::UseWeaponTypes | ObjectiveKind::LandInLocations => match context {
            EventContext::Tag(tag) => !recorded_tags.contains(tag),
            _ => false,
        },
        _ => true,
    }
}
