//! Goal Catalog
//!
//! Immutable goal definitions loaded from TOML content files at startup.
//! The catalog is read-only for the lifetime of a session; everything else
//! in the engine looks goals up here and never mutates them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::QuestError;

/// Rotation/content category a goal belongs to.
///
/// Daily and Weekly are the only categories with a refresh cadence; the
/// others rotate only on a forced refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalCategory {
    Daily,
    Combat,
    Weekly,
    Progression,
    Special,
}

impl GoalCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalCategory::Daily => "daily",
            GoalCategory::Combat => "combat",
            GoalCategory::Weekly => "weekly",
            GoalCategory::Progression => "progression",
            GoalCategory::Special => "special",
        }
    }

    /// All categories, in the order a forced refresh populates them.
    pub const ALL: [GoalCategory; 5] = [
        GoalCategory::Daily,
        GoalCategory::Combat,
        GoalCategory::Weekly,
        GoalCategory::Progression,
        GoalCategory::Special,
    ];
}

/// Difficulty tier. Informational only; never affects engine logic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
    Epic,
}

/// What kind of gameplay occurrence a goal tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveKind {
    PlayMatches,
    GetEliminations,
    DealDamage,
    HeadshotEliminations,
    CloseRangeEliminations,
    FinishTopPercent,
    FinishTopTen,
    SurviveFinalCircle,
    TravelDistance,
    SurviveStormCircles,
    TakeStormDamage,
    WinMatches,
    WinWithoutStormDamage,
    LootBuildings,
    UseHealingItems,
    UseWeaponTypes,
    LandInLocations,
    LandInHighRiskAreas,
    TotalEliminations,
    SurviveTime,
}

impl ObjectiveKind {
    /// Kinds that count distinct string tags: each tag advances progress at
    /// most once per goal.
    pub fn dedupes_tags(&self) -> bool {
        matches!(
            self,
            ObjectiveKind::UseWeaponTypes | ObjectiveKind::LandInLocations
        )
    }
}

/// A goal definition loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawGoalFile {
    pub goal: RawGoal,
}

/// Raw goal data as it appears in TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawGoal {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: GoalCategory,
    #[serde(default)]
    pub difficulty: Difficulty,
    pub objective: ObjectiveKind,
    pub target: u32,
    #[serde(default)]
    pub reward: u32,
    /// Hours before an active record expires. Absent means no expiry.
    pub time_limit_hours: Option<u32>,
    #[serde(default)]
    pub level_required: i32,
    /// Prerequisite goal ids. Acceptance gating is a catalog-authoring
    /// concern; the engine trusts whatever it is handed.
    #[serde(default)]
    pub prerequisites: Vec<String>,
}

/// A fully resolved goal definition
#[derive(Debug, Clone)]
pub struct GoalDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: GoalCategory,
    pub difficulty: Difficulty,
    pub kind: ObjectiveKind,
    /// Progress counter value at which the goal completes. Always positive.
    pub target: u32,
    /// Currency credited on claim.
    pub reward: u32,
    pub time_limit_hours: Option<u32>,
    pub level_required: i32,
    pub prerequisites: Vec<String>,
}

impl GoalDefinition {
    pub fn from_raw(raw: &RawGoal) -> Result<Self, QuestError> {
        if raw.id.is_empty() {
            return Err(QuestError::InvalidDefinition("empty goal id".into()));
        }
        if raw.target == 0 {
            return Err(QuestError::InvalidDefinition(format!(
                "goal '{}' has target 0",
                raw.id
            )));
        }
        if raw.time_limit_hours == Some(0) {
            return Err(QuestError::InvalidDefinition(format!(
                "goal '{}' has a zero-hour time limit",
                raw.id
            )));
        }
        Ok(Self {
            id: raw.id.clone(),
            name: raw.name.clone(),
            description: raw.description.clone(),
            category: raw.category,
            difficulty: raw.difficulty,
            kind: raw.objective,
            target: raw.target,
            reward: raw.reward,
            time_limit_hours: raw.time_limit_hours,
            level_required: raw.level_required,
            prerequisites: raw.prerequisites.clone(),
        })
    }

}

/// Immutable catalog of all goal definitions for a session.
#[derive(Debug, Default, Clone)]
pub struct GoalCatalog {
    goals: HashMap<String, Arc<GoalDefinition>>,
}

impl GoalCatalog {
    /// Build a catalog from already-resolved definitions.
    pub fn from_definitions(defs: impl IntoIterator<Item = GoalDefinition>) -> Self {
        let goals = defs
            .into_iter()
            .map(|d| (d.id.clone(), Arc::new(d)))
            .collect();
        Self { goals }
    }

    /// Load every `*.toml` goal file under a directory (recursive).
    ///
    /// Files that fail to parse or validate are skipped with a warning;
    /// a bad content file never aborts startup.
    pub fn load_dir(dir: &Path) -> Result<Self, QuestError> {
        info!("loading goal catalog from {:?}", dir);

        if !dir.exists() {
            warn!("goal directory does not exist: {:?}", dir);
            return Ok(Self::default());
        }

        let mut paths = Vec::new();
        collect_toml_files(dir, &mut paths)?;

        let mut goals = HashMap::new();
        for path in paths {
            match load_goal_file(&path) {
                Ok(goal) => {
                    goals.insert(goal.id.clone(), Arc::new(goal));
                }
                Err(e) => warn!("skipping goal file {:?}: {}", path, e),
            }
        }

        info!("loaded {} goal definitions", goals.len());
        Ok(Self { goals })
    }

    pub fn get(&self, goal_id: &str) -> Option<&Arc<GoalDefinition>> {
        self.goals.get(goal_id)
    }

    pub fn contains(&self, goal_id: &str) -> bool {
        self.goals.contains_key(goal_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<GoalDefinition>> {
        self.goals.values()
    }

    /// All goals in a rotation category.
    pub fn of_category(&self, category: GoalCategory) -> Vec<Arc<GoalDefinition>> {
        self.goals
            .values()
            .filter(|g| g.category == category)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.goals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.goals.is_empty()
    }
}

fn collect_toml_files(dir: &Path, paths: &mut Vec<PathBuf>) -> Result<(), QuestError> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| QuestError::Persistence(format!("failed to read {:?}: {}", dir, e)))?;

    for entry in entries {
        let entry =
            entry.map_err(|e| QuestError::Persistence(format!("failed to read entry: {}", e)))?;
        let path = entry.path();

        if path.is_dir() {
            collect_toml_files(&path, paths)?;
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            paths.push(path);
        }
    }

    Ok(())
}

fn load_goal_file(path: &Path) -> Result<GoalDefinition, QuestError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| QuestError::Persistence(format!("failed to read {:?}: {}", path, e)))?;

    let raw: RawGoalFile = toml::from_str(&content)
        .map_err(|e| QuestError::InvalidDefinition(format!("{:?}: {}", path, e)))?;

    GoalDefinition::from_raw(&raw.goal)
}
