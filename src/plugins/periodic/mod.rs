//! Recurring damage bound to `(entity, purpose)`.
//!
//! At most one timer per pair: `start` replaces (and so re-phases) a running one.
//! Firings are resolved against the current entry, so a handle that was replaced
//! or stopped in the same tick never lands damage.

use bevy::platform::collections::HashMap;
use bevy::prelude::*;

use crate::common::state::CombatSet;
use crate::plugins::health::{DamageKind, DamageRequest, PendingDespawn};
use crate::plugins::timers::{self, Scheduler, Task, TimerFired, TimerHandle};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DamagePurpose {
    /// Held in the arm, waiting to be devoured.
    Held,
    /// Touching an arm segment.
    ArmStay,
}

#[derive(Clone, Copy, Debug)]
struct Ticking {
    handle: TimerHandle,
    amount: f32,
    kind: DamageKind,
    instigator: Option<Entity>,
}

#[derive(Resource, Debug, Default)]
pub struct PeriodicDamage {
    active: HashMap<(Entity, DamagePurpose), Ticking>,
}

impl PeriodicDamage {
    /// Fires on the next scheduler pass, then every `interval` seconds.
    #[allow(clippy::too_many_arguments)]
    pub fn start(
        &mut self,
        scheduler: &mut Scheduler,
        target: Entity,
        purpose: DamagePurpose,
        amount: f32,
        interval: f32,
        kind: DamageKind,
        instigator: Option<Entity>,
    ) {
        self.stop(scheduler, target, purpose);
        let handle = scheduler.schedule(0.0, Some(interval), Task::PeriodicDamage { target, purpose });
        self.active.insert((target, purpose), Ticking { handle, amount, kind, instigator });
    }

    /// Returns `false` when nothing was running for the pair.
    pub fn stop(&mut self, scheduler: &mut Scheduler, target: Entity, purpose: DamagePurpose) -> bool {
        match self.active.remove(&(target, purpose)) {
            Some(t) => {
                scheduler.cancel(t.handle);
                true
            }
            None => false,
        }
    }

    pub fn stop_all(&mut self, scheduler: &mut Scheduler, target: Entity) {
        self.active.retain(|(e, _), t| {
            if *e == target {
                scheduler.cancel(t.handle);
                false
            } else {
                true
            }
        });
    }

    pub fn is_active(&self, target: Entity, purpose: DamagePurpose) -> bool {
        self.active.contains_key(&(target, purpose))
    }

    fn resolve(&self, handle: TimerHandle, target: Entity, purpose: DamagePurpose) -> Option<DamageRequest> {
        let t = self.active.get(&(target, purpose)).filter(|t| t.handle == handle)?;
        Some(DamageRequest { target, amount: t.amount, kind: t.kind, instigator: t.instigator })
    }
}

pub fn plugin(app: &mut App) {
    app.insert_resource(PeriodicDamage::default())
        .add_systems(
            FixedPostUpdate,
            dispatch_periodic_damage
                .after(timers::tick_scheduler)
                .in_set(CombatSet::Timers),
        )
        .add_systems(
            PostUpdate,
            stop_timers_for_despawning.before(crate::plugins::health::despawn_marked),
        );
}

pub(crate) fn dispatch_periodic_damage(
    mut fired: MessageReader<TimerFired>,
    scheduler: Res<Scheduler>,
    mut periodic: ResMut<PeriodicDamage>,
    mut out: MessageWriter<DamageRequest>,
) {
    for ev in fired.read() {
        let Task::PeriodicDamage { target, purpose } = ev.task else {
            continue;
        };
        let Some(req) = periodic.resolve(ev.handle, target, purpose) else {
            continue;
        };
        out.write(req);

        // One-shot (non-positive interval) timers retire after their only firing.
        if !scheduler.is_active(ev.handle) {
            periodic.active.remove(&(target, purpose));
        }
    }
}

fn stop_timers_for_despawning(
    mut scheduler: ResMut<Scheduler>,
    mut periodic: ResMut<PeriodicDamage>,
    q: Query<Entity, Added<PendingDespawn>>,
) {
    for e in &q {
        periodic.stop_all(&mut scheduler, e);
    }
}
