//! Static data tables: per-type enemy stats and the game mode's ability table.
//!
//! Both tables are plain JSON embedded at compile time and parsed once into
//! resources. Lookups never panic: a miss is a `StatError::NotFound` the caller
//! logs before falling back to defaults.

use std::collections::HashMap;

use bevy::prelude::*;
use serde::Deserialize;

pub const ENEMY_STATS_JSON: &str = include_str!("../../assets/enemy_stats.json");
pub const ABILITIES_JSON: &str = include_str!("../../assets/abilities.json");

#[derive(Debug, thiserror::Error)]
pub enum StatError {
    #[error("no stats for entity type `{0}`")]
    NotFound(String),
    #[error("stat table parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One row of the enemy stat table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EnemyStats {
    pub max_health: f32,
    pub attack: f32,
    pub attack_cooldown: f32,
    pub pursuit_radius: f32,
    pub attack_range: f32,
    pub is_grabbable: bool,
    #[serde(default)]
    pub is_devourable: bool,
    pub speed: f32,
    pub mass: f32,
    #[serde(default)]
    pub ability_tags: Vec<String>,
}

impl Default for EnemyStats {
    fn default() -> Self {
        Self {
            max_health: 5.0,
            attack: 1.0,
            attack_cooldown: 1.5,
            pursuit_radius: 300.0,
            attack_range: 28.0,
            is_grabbable: true,
            is_devourable: true,
            speed: 90.0,
            mass: 1.0,
            ability_tags: Vec::new(),
        }
    }
}

#[derive(Resource, Debug, Clone, Default)]
pub struct StatTable {
    rows: HashMap<String, EnemyStats>,
}

impl StatTable {
    pub fn from_json(json: &str) -> Result<Self, StatError> {
        let rows: HashMap<String, EnemyStats> = serde_json::from_str(json)?;
        Ok(Self { rows })
    }

    pub fn lookup(&self, key: &str) -> Result<&EnemyStats, StatError> {
        self.rows.get(key).ok_or_else(|| StatError::NotFound(key.to_owned()))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A temporary ability the player can absorb from a devoured enemy.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AbilitySpec {
    pub name: String,
    pub duration: f32,
    #[serde(default = "one")]
    pub speed_multiplier: f32,
}

fn one() -> f32 {
    1.0
}

/// Ability tag -> ability granted by the current game mode.
#[derive(Resource, Debug, Clone, Default)]
pub struct AbilityTable {
    by_tag: HashMap<String, AbilitySpec>,
}

impl AbilityTable {
    pub fn from_json(json: &str) -> Result<Self, StatError> {
        let by_tag: HashMap<String, AbilitySpec> = serde_json::from_str(json)?;
        Ok(Self { by_tag })
    }

    pub fn get(&self, tag: &str) -> Option<&AbilitySpec> {
        self.by_tag.get(tag)
    }

    pub fn insert(&mut self, tag: impl Into<String>, spec: AbilitySpec) {
        self.by_tag.insert(tag.into(), spec);
    }
}
