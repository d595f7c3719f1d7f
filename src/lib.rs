//! Slime Arm: a top-down grab / devour / throw combat prototype.
//!
//! `main.rs` only calls `game::run`. Everything else lives in the library so the
//! integration tests in `tests/` (separate crates) can build a headless app.

pub mod common;
pub mod game;
pub mod plugins;
