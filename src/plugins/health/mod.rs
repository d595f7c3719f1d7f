//! Health / damage model shared by the player and every enemy.
//!
//! ```text
//! producers (arm, grab, explode, AI) --DamageRequest--> apply_damage_requests
//!                                                        |-> HealthChanged
//!                                                        |-> HealthDepleted (first time at zero)
//!                                                        '-> Died + LifeState::Dying
//! advance_dying:  Dying timer finished -> Dead + PendingDespawn
//! despawn_marked: PostUpdate structural cleanup
//! ```
//!
//! `apply_damage_requests` is the only writer of `Health` during the fixed step, apart
//! from the absorb heal it performs on behalf of an instigator.

use bevy::prelude::*;

use crate::common::state::{CombatSet, GameState};

// -----------------------------------------------------------------------------
// Components
// -----------------------------------------------------------------------------

#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Health {
    current: f32,
    max: f32,
}

impl Health {
    pub fn new(max: f32) -> Self {
        let max = max.max(0.0);
        Self { current: max, max }
    }

    #[inline]
    pub fn current(&self) -> f32 {
        self.current
    }

    #[inline]
    pub fn max(&self) -> f32 {
        self.max
    }

    #[inline]
    pub fn is_depleted(&self) -> bool {
        self.current <= 0.0
    }

    /// Adds `delta` and clamps to `[0, max]`. Returns the change actually applied.
    pub fn modify(&mut self, delta: f32) -> f32 {
        let before = self.current;
        self.current = (self.current + delta).clamp(0.0, self.max);
        self.current - before
    }

    /// Heals by `damage_dealt * steal_percent / 100`. Returns the amount healed.
    pub fn absorb(&mut self, damage_dealt: f32, steal_percent: f32) -> f32 {
        self.modify((damage_dealt * steal_percent / 100.0).max(0.0))
    }
}

/// Post-hit window during which strikes are ignored.
#[derive(Component, Debug, Clone, Copy)]
pub struct Invincibility {
    remaining: f32,
    duration: f32,
}

impl Invincibility {
    pub fn new(duration: f32) -> Self {
        Self { remaining: 0.0, duration: duration.max(0.0) }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.remaining > 0.0
    }

    #[inline]
    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    fn reset(&mut self) {
        self.remaining = self.duration;
    }

    fn tick(&mut self, dt: f32) {
        self.remaining = (self.remaining - dt).max(0.0);
    }
}

/// Lifecycle state machine.
///
/// - Alive: normal gameplay.
/// - Dying: death animation; no further damage lands.
/// - Dead: terminal, waiting for despawn.
#[derive(Component, Debug, Clone)]
pub enum LifeState {
    Alive,
    Dying { timer: Timer },
    Dead,
}

impl LifeState {
    #[inline]
    pub fn is_alive(&self) -> bool {
        matches!(self, LifeState::Alive)
    }

    /// Dying state for an entity with the given death delay.
    pub fn dying(delay: Option<&DeathDelay>) -> Self {
        let secs = delay.map_or(DEFAULT_DEATH_DELAY, |d| d.0);
        LifeState::Dying {
            timer: Timer::from_seconds(secs, TimerMode::Once),
        }
    }
}

/// Seconds an entity stays in `LifeState::Dying` before it is despawned.
#[derive(Component, Debug, Clone, Copy)]
pub struct DeathDelay(pub f32);

/// Heals itself from siphon damage it instigates.
#[derive(Component, Debug, Clone, Copy)]
pub struct Absorber {
    pub steal_percent: f32,
}

/// Marker: entity should be removed from the world.
///
/// We don't despawn inside the fixed step; we mark and despawn later in PostUpdate.
#[derive(Component, Debug, Clone, Copy)]
pub struct PendingDespawn;

// -----------------------------------------------------------------------------
// Messages
// -----------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DamageKind {
    /// Respects invincibility and can kill.
    Strike,
    /// Held-in-arm drain: ignores invincibility, clamps at zero, never kills.
    Siphon,
}

#[derive(Message, Clone, Copy, Debug, PartialEq)]
pub struct DamageRequest {
    pub target: Entity,
    pub amount: f32,
    pub kind: DamageKind,
    pub instigator: Option<Entity>,
}

impl DamageRequest {
    pub fn strike(target: Entity, amount: f32, instigator: Option<Entity>) -> Self {
        Self { target, amount, kind: DamageKind::Strike, instigator }
    }

    pub fn siphon(target: Entity, amount: f32, instigator: Entity) -> Self {
        Self { target, amount, kind: DamageKind::Siphon, instigator: Some(instigator) }
    }
}

#[derive(Message, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Died {
    pub entity: Entity,
}

/// Health reached zero for the first time (by any damage kind).
#[derive(Message, Clone, Copy, Debug, PartialEq, Eq)]
pub struct HealthDepleted {
    pub entity: Entity,
}

#[derive(Message, Clone, Copy, Debug, PartialEq)]
pub struct HealthChanged {
    pub entity: Entity,
    pub delta: f32,
}

// -----------------------------------------------------------------------------
// Rules
// -----------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DamageOutcome {
    Ignored,
    Applied { dealt: f32, depleted: bool, died: bool },
}

/// Strike damage.
///
/// No-op while invincible or no longer alive. Otherwise reduces and clamps health,
/// restarts the invincibility window and reports the death transition when health
/// is at zero for an entity that is still alive.
pub fn apply_damage(
    health: &mut Health,
    invincibility: Option<&mut Invincibility>,
    life: &LifeState,
    amount: f32,
) -> DamageOutcome {
    if !life.is_alive() {
        return DamageOutcome::Ignored;
    }
    if let Some(inv) = invincibility {
        if inv.is_active() {
            return DamageOutcome::Ignored;
        }
        inv.reset();
    }

    let was_depleted = health.is_depleted();
    let dealt = -health.modify(-amount.max(0.0));
    DamageOutcome::Applied {
        dealt,
        depleted: !was_depleted && health.is_depleted(),
        died: health.is_depleted(),
    }
}

/// Siphon damage: same clamp, no invincibility, never kills.
pub fn apply_siphon(health: &mut Health, life: &LifeState, amount: f32) -> DamageOutcome {
    if !life.is_alive() {
        return DamageOutcome::Ignored;
    }
    let was_depleted = health.is_depleted();
    let dealt = -health.modify(-amount.max(0.0));
    DamageOutcome::Applied {
        dealt,
        depleted: !was_depleted && health.is_depleted(),
        died: false,
    }
}

pub fn plugin(app: &mut App) {
    app.add_message::<DamageRequest>()
        .add_message::<Died>()
        .add_message::<HealthDepleted>()
        .add_message::<HealthChanged>();

    app.add_systems(
        FixedPostUpdate,
        (tick_invincibility, apply_damage_requests)
            .chain()
            .in_set(CombatSet::Damage),
    )
    .add_systems(FixedPostUpdate, advance_dying.in_set(CombatSet::Reactions))
    .add_systems(
        PostUpdate,
        despawn_marked.run_if(in_state(GameState::InGame)),
    );
}

fn tick_invincibility(time: Res<Time>, mut q: Query<&mut Invincibility>) {
    let dt = time.delta_secs();
    for mut inv in &mut q {
        if inv.is_active() {
            inv.tick(dt);
        }
    }
}

const DEFAULT_DEATH_DELAY: f32 = 0.35;

pub(crate) fn apply_damage_requests(
    mut requests: MessageReader<DamageRequest>,
    mut q: Query<
        (
            &mut Health,
            Option<&mut Invincibility>,
            &mut LifeState,
            Option<&DeathDelay>,
            Option<&Absorber>,
        ),
        Without<PendingDespawn>,
    >,
    mut changed: MessageWriter<HealthChanged>,
    mut depleted_out: MessageWriter<HealthDepleted>,
    mut died_out: MessageWriter<Died>,
) {
    for req in requests.read() {
        let Ok((mut health, inv, mut life, delay, _)) = q.get_mut(req.target) else {
            continue;
        };

        let outcome = match req.kind {
            DamageKind::Strike => apply_damage(&mut health, inv.map(|i| i.into_inner()), &life, req.amount),
            DamageKind::Siphon => apply_siphon(&mut health, &life, req.amount),
        };

        let DamageOutcome::Applied { dealt, depleted, died } = outcome else {
            continue;
        };

        if dealt > 0.0 {
            changed.write(HealthChanged { entity: req.target, delta: -dealt });
        }
        if depleted {
            depleted_out.write(HealthDepleted { entity: req.target });
        }
        if died {
            *life = LifeState::dying(delay);
            died_out.write(Died { entity: req.target });
        }

        if req.kind != DamageKind::Siphon || dealt <= 0.0 {
            continue;
        }
        let Some(instigator) = req.instigator else {
            continue;
        };
        if let Ok((mut health, _, life, _, Some(absorber))) = q.get_mut(instigator) {
            if life.is_alive() {
                let healed = health.absorb(dealt, absorber.steal_percent);
                if healed > 0.0 {
                    changed.write(HealthChanged { entity: instigator, delta: healed });
                }
            }
        }
    }
}

/// Tick Dying timers and mark PendingDespawn once finished.
fn advance_dying(
    time: Res<Time>,
    mut commands: Commands,
    mut q: Query<(Entity, &mut LifeState), Without<PendingDespawn>>,
) {
    for (e, mut life) in &mut q {
        let LifeState::Dying { timer } = &mut *life else {
            continue;
        };
        timer.tick(time.delta());
        if timer.is_finished() {
            *life = LifeState::Dead;
            commands.entity(e).insert(PendingDespawn);
        }
    }
}

/// Despawn everything marked for removal.
pub fn despawn_marked(mut commands: Commands, q: Query<Entity, With<PendingDespawn>>) {
    for e in &q {
        commands.entity(e).despawn();
    }
}
