//! Collision layers.

use avian2d::prelude::*;

#[derive(PhysicsLayer, Default, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layer {
    #[default]
    Default,
    World,
    Player,
    Enemy,
    Object,
    /// One visual segment of the arm (sensor).
    ArmSegment,
    /// Grab range trigger around the player (sensor).
    GrabRange,
    /// Punch / grab volume at the real hand.
    Hand,
    /// Surfaces that detonate whatever the hand is holding.
    Detonator,
}
