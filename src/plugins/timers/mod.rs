//! Deferred callbacks for the fixed step.
//!
//! Work that must happen "later" (delayed detonation, recurring damage) is scheduled
//! here as plain data and handed back as `TimerFired` messages. Handles are opaque and
//! never reused, so a stale handle can be cancelled or compared safely.

use bevy::prelude::*;

use crate::common::state::CombatSet;
use crate::plugins::periodic::DamagePurpose;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

/// What a timer does when it fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Task {
    Explode { entity: Entity },
    PeriodicDamage { target: Entity, purpose: DamagePurpose },
}

#[derive(Message, Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerFired {
    pub handle: TimerHandle,
    pub task: Task,
}

#[derive(Debug, Clone)]
struct Entry {
    handle: TimerHandle,
    remaining: f32,
    repeat: Option<f32>,
    task: Task,
    /// Armed since the last pass: no time has elapsed for it yet.
    fresh: bool,
}

#[derive(Resource, Debug, Default)]
pub struct Scheduler {
    next_id: u64,
    entries: Vec<Entry>,
}

impl Scheduler {
    /// Fire `task` after `delay` seconds, then every `repeat` seconds if given.
    /// A non-positive repeat interval fires once.
    pub fn schedule(&mut self, delay: f32, repeat: Option<f32>, task: Task) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry {
            handle,
            remaining: delay.max(0.0),
            repeat: repeat.filter(|r| *r > 0.0),
            task,
            fresh: true,
        });
        handle
    }

    /// Returns `false` when the handle already fired (one-shot) or was cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.handle != handle);
        self.entries.len() != before
    }

    pub fn is_active(&self, handle: TimerHandle) -> bool {
        self.entries.iter().any(|e| e.handle == handle)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Advance every timer by `dt`, returning fired tasks in scheduling order.
    /// Timers armed since the previous pass are not aged by it, so a zero delay
    /// fires on this pass and the next firing lands a full interval later.
    /// A repeating timer that fell behind fires once per elapsed interval.
    pub fn advance(&mut self, dt: f32) -> Vec<(TimerHandle, Task)> {
        let mut fired = Vec::new();
        self.entries.retain_mut(|entry| {
            if !std::mem::take(&mut entry.fresh) {
                entry.remaining -= dt;
            }
            while entry.remaining <= 0.0 {
                fired.push((entry.handle, entry.task));
                match entry.repeat {
                    Some(interval) => entry.remaining += interval,
                    None => return false,
                }
            }
            true
        });
        fired
    }
}

pub fn plugin(app: &mut App) {
    app.insert_resource(Scheduler::default())
        .add_message::<TimerFired>()
        .add_systems(FixedPostUpdate, tick_scheduler.in_set(CombatSet::Timers));
}

pub fn tick_scheduler(
    time: Res<Time>,
    mut scheduler: ResMut<Scheduler>,
    mut out: MessageWriter<TimerFired>,
) {
    for (handle, task) in scheduler.advance(time.delta_secs()) {
        out.write(TimerFired { handle, task });
    }
}
