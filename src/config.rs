//! Engine Configuration
//!
//! Tunables for the active-set bound, per-category refresh quotas, and the
//! eligibility thresholds. Loadable from a TOML file; every field has a
//! default matching shipped behavior.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::catalog::GoalCategory;
use crate::error::QuestError;

/// Engine tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of simultaneously active goals.
    pub max_active_goals: usize,
    /// How many goals a category activates during its rotation.
    pub daily_quota: usize,
    pub combat_quota: usize,
    pub weekly_quota: usize,
    pub progression_quota: usize,
    pub special_quota: usize,
    /// Elimination distance (engine units) at or under which a kill counts
    /// as close range.
    pub close_range_distance: f32,
    /// Placement ratio (place / total entrants) at or under which a finish
    /// counts for top-percent goals.
    pub top_percent_threshold: f32,
    /// Locations that count toward high-risk landing goals. Exact match.
    pub high_risk_locations: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_active_goals: 10,
            daily_quota: 3,
            combat_quota: 2,
            weekly_quota: 2,
            progression_quota: 2,
            special_quota: 1,
            close_range_distance: 10.0,
            top_percent_threshold: 0.5,
            high_risk_locations: vec![
                "military_base".to_string(),
                "power_plant".to_string(),
                "prison_complex".to_string(),
                "downtown".to_string(),
            ],
        }
    }
}

impl EngineConfig {
    /// Load from a TOML file. Missing keys fall back to defaults.
    pub fn load(path: &Path) -> Result<Self, QuestError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| QuestError::Persistence(format!("failed to read {:?}: {}", path, e)))?;
        toml::from_str(&content)
            .map_err(|e| QuestError::InvalidDefinition(format!("config {:?}: {}", path, e)))
    }

    /// Rotation quota for a category.
    pub fn quota(&self, category: GoalCategory) -> usize {
        match category {
            GoalCategory::Daily => self.daily_quota,
            GoalCategory::Combat => self.combat_quota,
            GoalCategory::Weekly => self.weekly_quota,
            GoalCategory::Progression => self.progression_quota,
            GoalCategory::Special => self.special_quota,
        }
    }

    pub fn is_high_risk(&self, location: &str) -> bool {
        self.high_risk_locations.iter().any(|l| l == location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.max_active_goals, 10);
        assert_eq!(cfg.quota(GoalCategory::Daily), 3);
        assert_eq!(cfg.quota(GoalCategory::Special), 1);
        assert!(cfg.is_high_risk("military_base"));
        assert!(!cfg.is_high_risk("quiet_meadow"));
    }

    #[test]
    fn test_partial_toml_overrides() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("engine.toml");
        std::fs::write(&path, "max_active_goals = 6\ndaily_quota = 2\n").unwrap();

        let cfg = EngineConfig::load(&path).unwrap();
        assert_eq!(cfg.max_active_goals, 6);
        assert_eq!(cfg.daily_quota, 2);
        // untouched keys keep defaults
        assert_eq!(cfg.weekly_quota, 2);
        assert_eq!(cfg.close_range_distance, 10.0);
    }
}
