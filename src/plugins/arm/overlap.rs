//! Per-entity contact reference counts across the arm's segments.
//!
//! The arm is many sensors; one enemy can touch several at once. Only the transition
//! absent -> 1 counts as a new contact and only 1 -> absent ends it. Entries are
//! removed at zero, so an exit with nothing to decrement is reported instead of
//! driving a count negative.

use bevy::platform::collections::HashMap;
use bevy::prelude::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitOutcome {
    StillOverlapping(u32),
    /// Last segment let go; the entry is gone.
    Cleared,
    /// Exit owed by a contact that was force-removed while still touching.
    Detached,
    /// No enter matches this exit: the count would have gone below zero.
    Unbalanced,
}

#[derive(Resource, Debug, Default)]
pub struct OverlapRecord {
    counts: HashMap<Entity, u32>,
    /// Exits still owed by force-removed entries.
    detached: HashMap<Entity, u32>,
}

impl OverlapRecord {
    /// Returns `true` on first contact.
    pub fn record_enter(&mut self, e: Entity) -> bool {
        let count = self.counts.entry(e).or_insert(0);
        *count += 1;
        *count == 1
    }

    pub fn record_exit(&mut self, e: Entity) -> ExitOutcome {
        if let Some(owed) = self.detached.get_mut(&e) {
            *owed -= 1;
            if *owed == 0 {
                self.detached.remove(&e);
            }
            debug!(entity = ?e, "overlap exit for detached entity");
            return ExitOutcome::Detached;
        }

        let Some(count) = self.counts.get_mut(&e) else {
            error!(entity = ?e, "overlap exit without a matching enter; count held at zero");
            return ExitOutcome::Unbalanced;
        };
        *count -= 1;
        if *count > 0 {
            return ExitOutcome::StillOverlapping(*count);
        }
        self.counts.remove(&e);
        ExitOutcome::Cleared
    }

    /// Drop the entry regardless of count; its outstanding exits are absorbed quietly.
    /// Returns whether one existed.
    pub fn force_remove(&mut self, e: Entity) -> bool {
        let Some(count) = self.counts.remove(&e) else {
            return false;
        };
        *self.detached.entry(e).or_insert(0) += count;
        true
    }

    /// Drop every trace of `e`, for entities leaving the world.
    pub fn forget(&mut self, e: Entity) {
        self.counts.remove(&e);
        self.detached.remove(&e);
    }

    pub fn count(&self, e: Entity) -> Option<u32> {
        self.counts.get(&e).copied()
    }

    pub fn contains(&self, e: Entity) -> bool {
        self.counts.contains_key(&e)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}
