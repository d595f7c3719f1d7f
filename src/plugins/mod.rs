//! Feature plugins.

use bevy::prelude::*;

pub mod arm;
pub mod core;
pub mod enemies;
pub mod fx;
pub mod grab;
pub mod health;
pub mod periodic;
pub mod persistence;
pub mod physics;
pub mod player;
pub mod timers;
pub mod world;

// Render-only
pub mod camera;
pub mod lighting;

/// Register gameplay plugins that work in headless tests.
pub fn register_gameplay(app: &mut App) {
    core::plugin(app);
    physics::plugin(app);
    health::plugin(app);
    timers::plugin(app);
    periodic::plugin(app);
    fx::plugin(app);
    persistence::plugin(app);
    world::plugin(app);
    player::plugin(app);
    arm::plugin(app);
    grab::plugin(app);
    enemies::plugin(app);
}

/// Register render-only plugins (requires DefaultPlugins / render infra).
pub fn register_render(app: &mut App) {
    lighting::plugin(app);
    camera::plugin(app);
}

/// Register all plugins (full app).
pub fn register_all(app: &mut App) {
    register_gameplay(app);
    register_render(app);
}
