//! Core plugin: shared resources, data tables and the fixed-step ordering.

use avian2d::collision::narrow_phase::CollisionEventSystems;
use bevy::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::common::state::{CombatSet, GameState};
use crate::common::stats::{ABILITIES_JSON, AbilityTable, ENEMY_STATS_JSON, StatTable};
use crate::common::tunables::Tunables;

/// Seeded RNG for gameplay rolls (ability picks, spawn jitter).
#[derive(Resource, Debug)]
pub struct GameRng(pub StdRng);

impl GameRng {
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

pub fn plugin(app: &mut App) {
    let tunables = Tunables::default();
    app.insert_resource(GameRng::seeded(tunables.world.rng_seed));
    app.insert_resource(tunables);
    app.insert_resource(ClearColor(Color::srgb(0.05, 0.05, 0.07)));

    app.insert_resource(load_stat_table(ENEMY_STATS_JSON));
    app.insert_resource(load_ability_table(ABILITIES_JSON));

    app.configure_sets(
        FixedUpdate,
        (
            CombatSet::Input,
            CombatSet::Commands,
            CombatSet::Aim,
            CombatSet::Hold,
            CombatSet::Acquire,
            CombatSet::Arm,
        )
            .chain()
            .run_if(in_state(GameState::InGame)),
    );
    app.configure_sets(
        FixedPostUpdate,
        (
            CombatSet::Contacts,
            CombatSet::Timers,
            CombatSet::Damage,
            CombatSet::Reactions,
        )
            .chain()
            .after(CollisionEventSystems)
            .run_if(in_state(GameState::InGame)),
    );
}

/// A broken table is logged and replaced by an empty one; lookups then fall back to defaults.
pub(crate) fn load_stat_table(json: &str) -> StatTable {
    StatTable::from_json(json).unwrap_or_else(|err| {
        error!(%err, "enemy stat table failed to load");
        StatTable::default()
    })
}

pub(crate) fn load_ability_table(json: &str) -> AbilityTable {
    AbilityTable::from_json(json).unwrap_or_else(|err| {
        error!(%err, "ability table failed to load");
        AbilityTable::default()
    })
}
