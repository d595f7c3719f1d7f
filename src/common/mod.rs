//! Common, shared types.

pub mod contacts;
pub mod layers;
pub mod state;
pub mod stats;
pub mod tunables;

#[cfg(test)]
pub mod test_utils;
