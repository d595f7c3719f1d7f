//! Global state machine + fixed-step ordering.

use bevy::prelude::*;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, States, Default)]
pub enum GameState {
    #[default]
    InGame,
}

/// Fixed-step combat pipeline.
///
/// One fixed order per tick: input commands are applied before the simulation,
/// the arm curve is rebuilt before physics reports overlaps, and every damage
/// producer writes before `Damage` consumes.
///
/// ```text
/// FixedUpdate:     Input -> Commands -> Aim -> Hold -> Acquire -> Arm
/// FixedPostUpdate: (physics) -> Contacts -> Timers -> Damage -> Reactions
/// ```
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CombatSet {
    Input,
    Commands,
    Aim,
    Hold,
    Acquire,
    Arm,
    Contacts,
    Timers,
    Damage,
    Reactions,
}
