//! Enemies plugin: stat-driven enemies and throwable objects, a pausable AI brain,
//! and derived presentation (highlight tint, hit flash, death fade).
//!
//! ---------------------------
//! HOW THIS IS DESIGNED (ECS)
//! ---------------------------
//! 1) FACTS live in components:
//!    - `Stats` is the row from the stat table the entity was spawned with.
//!    - `Brain` is the AI's run state; the grab machine pauses/resumes it, death stops it.
//!    - `Health` / `LifeState` (health plugin) are gameplay truth.
//!
//! 2) RULES mutate facts in predictable places:
//!    - `drive_brains` steers running enemies toward the player and queues attacks;
//!      a stunned brain sits out until its stun wears off.
//!    - `on_enemy_died` stops the brain and clears collision filters.
//!
//! 3) PRESENTATION is derived from facts:
//!    - sprite colour from `Highlight` + `EnemyLook::hit_flash`,
//!    - alpha/scale from the `LifeState::Dying` timer.
//!
//! Despawning is never done here: the health plugin marks `PendingDespawn` when the
//! death timer ends and removes the entity in PostUpdate.

use avian2d::prelude::*;
use bevy::prelude::*;
use bevy::state::state_scoped::DespawnOnExit;
use bevy_firefly::prelude::Occluder2d;

use crate::common::layers::Layer;
use crate::common::state::{CombatSet, GameState};
use crate::common::stats::{EnemyStats, StatTable};
use crate::plugins::fx::UnitF32;
use crate::plugins::grab::{AbilityTags, Grabbable, GrabbableKind, Highlight, Thrown};
use crate::plugins::health::{DamageRequest, Died, Health, HealthChanged, LifeState, PendingDespawn};
use crate::plugins::player::Player;

// -----------------------------------------------------------------------------
// Components
// -----------------------------------------------------------------------------

#[derive(Component, Debug, Clone, Copy)]
pub struct Enemy;

/// Stat row the entity was spawned from.
#[derive(Component, Debug, Clone)]
pub struct Stats(pub EnemyStats);

#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct MoveSpeed(pub f32);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BrainMode {
    #[default]
    Running,
    Paused,
    /// Terminal: a stopped brain never resumes.
    Stopped,
}

/// AI run state plus attack cooldown and stun.
#[derive(Component, Debug, Clone, Default)]
pub struct Brain {
    mode: BrainMode,
    cooldown: f32,
    stunned: f32,
}

impl Brain {
    #[inline]
    pub fn mode(&self) -> BrainMode {
        self.mode
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.mode == BrainMode::Running
    }

    pub fn pause(&mut self, reason: &str) {
        if self.mode == BrainMode::Running {
            self.mode = BrainMode::Paused;
            debug!(reason, "brain paused");
        }
    }

    /// A running brain idles for `secs` without changing its mode.
    pub fn stun(&mut self, secs: f32) {
        if self.mode != BrainMode::Stopped && secs > self.stunned {
            self.stunned = secs;
            debug!(secs, "brain stunned");
        }
    }

    #[inline]
    pub fn is_stunned(&self) -> bool {
        self.stunned > 0.0
    }

    pub fn resume(&mut self, reason: &str) {
        if self.mode == BrainMode::Paused {
            self.mode = BrainMode::Running;
            debug!(reason, "brain resumed");
        }
    }

    pub fn stop(&mut self, reason: &str) {
        if self.mode != BrainMode::Stopped {
            self.mode = BrainMode::Stopped;
            debug!(reason, "brain stopped");
        }
    }
}

/// Presentation-only state. Always present so hits never cause structural churn.
#[derive(Component, Debug, Clone)]
pub struct EnemyLook {
    base: Color,
    hit_flash: UnitF32,
}

impl EnemyLook {
    fn new(base: Color) -> Self {
        Self { base, hit_flash: UnitF32::default() }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Enemy,
    Object,
}

// -----------------------------------------------------------------------------
// Plugin wiring
// -----------------------------------------------------------------------------

pub fn plugin(app: &mut App) {
    app.add_systems(OnEnter(GameState::InGame), spawn_roster);

    app.add_systems(
        FixedUpdate,
        drive_brains
            .after(CombatSet::Commands)
            .before(CombatSet::Hold)
            .run_if(in_state(GameState::InGame)),
    );

    app.add_systems(
        FixedPostUpdate,
        (on_enemy_died, flash_on_damage).in_set(CombatSet::Reactions),
    );

    app.add_systems(
        PostUpdate,
        tint_enemies.run_if(in_state(GameState::InGame)),
    );
}

// -----------------------------------------------------------------------------
// Spawn
// -----------------------------------------------------------------------------

/// Collision layers for an entity that should no longer interact with anything.
#[inline]
fn non_interacting_layers() -> CollisionLayers {
    CollisionLayers::new(Layer::Enemy, LayerMask::NONE)
}

fn role_layers(role: Role) -> CollisionLayers {
    match role {
        Role::Enemy => CollisionLayers::new(
            Layer::Enemy,
            [
                Layer::World,
                Layer::Player,
                Layer::Enemy,
                Layer::Object,
                Layer::ArmSegment,
                Layer::GrabRange,
                Layer::Hand,
            ],
        ),
        Role::Object => CollisionLayers::new(
            Layer::Object,
            [Layer::World, Layer::Player, Layer::Enemy, Layer::Object, Layer::GrabRange],
        ),
    }
}

const ROSTER: &[(&str, Role, Vec2)] = &[
    ("Slimeling", Role::Enemy, Vec2::new(-260.0, 160.0)),
    ("Slimeling", Role::Enemy, Vec2::new(240.0, 180.0)),
    ("Bramblehog", Role::Enemy, Vec2::new(0.0, 280.0)),
    ("Ironshell", Role::Enemy, Vec2::new(-340.0, -220.0)),
    ("Crate", Role::Object, Vec2::new(180.0, -120.0)),
    ("Crate", Role::Object, Vec2::new(260.0, -170.0)),
];

fn spawn_roster(mut commands: Commands, table: Res<StatTable>) {
    for (key, role, at) in ROSTER {
        spawn_from_stats(&mut commands, &table, key, *role, *at);
    }
}

/// Spawn one enemy or object by stat key. An unknown key is logged and spawned
/// with default stats.
pub fn spawn_from_stats(
    commands: &mut Commands,
    table: &StatTable,
    key: &str,
    role: Role,
    at: Vec2,
) -> Entity {
    let stats = table.lookup(key).cloned().unwrap_or_else(|err| {
        warn!(%err, "spawning with default stats");
        EnemyStats::default()
    });

    let (size, base) = match role {
        Role::Enemy => (28.0 + stats.mass * 4.0, Color::srgb(0.9, 0.3, 0.3)),
        Role::Object => (30.0, Color::srgb(0.65, 0.48, 0.3)),
    };
    let radius = size * 0.5;

    let mut e = commands.spawn((
        (
            Name::new(key.to_owned()),
            Stats(stats.clone()),
            Health::new(stats.max_health),
            LifeState::Alive,
            EnemyLook::new(base),
            Sprite { color: base, custom_size: Some(Vec2::splat(size)), ..default() },
            Transform::from_translation(at.extend(1.0)),
            DespawnOnExit(GameState::InGame),
        ),
        (
            RigidBody::Dynamic,
            Collider::circle(radius),
            Mass(stats.mass),
            LinearDamping(4.0),
            LockedAxes::ROTATION_LOCKED,
            role_layers(role),
            CollisionEventsEnabled,
        ),
    ));

    if role == Role::Enemy {
        e.insert((
            Enemy,
            Brain::default(),
            MoveSpeed(stats.speed),
            AbilityTags(stats.ability_tags.clone()),
            Occluder2d::circle(radius),
        ));
    }

    if stats.is_grabbable {
        let kind = match role {
            Role::Enemy => GrabbableKind::Enemy { devourable: stats.is_devourable },
            Role::Object => GrabbableKind::Object,
        };
        e.insert((Grabbable::new(kind, key), Highlight::default()));
    }

    e.id()
}

// -----------------------------------------------------------------------------
// Rules
// -----------------------------------------------------------------------------

/// Fraction of the gap between current and desired velocity closed per second.
const STEERING: f32 = 6.0;

/// Running brains chase the player inside their pursuit radius and strike in range.
/// Steering blends toward the desired velocity so knockback still reads.
#[allow(clippy::type_complexity)]
fn drive_brains(
    time: Res<Time>,
    q_player: Query<(Entity, &Transform, &LifeState), With<Player>>,
    mut q: Query<
        (Entity, &mut Brain, &Stats, &MoveSpeed, &Transform, &LifeState, &mut LinearVelocity),
        (With<Enemy>, Without<Player>, Without<Thrown>, Without<PendingDespawn>),
    >,
    mut damage: MessageWriter<DamageRequest>,
) {
    let dt = time.delta_secs();
    let target = q_player
        .single()
        .ok()
        .filter(|(_, _, life)| life.is_alive())
        .map(|(e, tf, _)| (e, tf.translation.truncate()));

    let blend = 1.0 - (-STEERING * dt).exp();

    for (e, mut brain, stats, speed, tf, life, mut vel) in &mut q {
        if !brain.is_running() || !life.is_alive() {
            continue;
        }
        if brain.is_stunned() {
            brain.stunned = (brain.stunned - dt).max(0.0);
            continue;
        }
        brain.cooldown = (brain.cooldown - dt).max(0.0);

        let pos = tf.translation.truncate();
        let desired = match target {
            Some((player, at)) if pos.distance(at) <= stats.0.pursuit_radius => {
                let to = at - pos;
                if to.length() > stats.0.attack_range {
                    to.normalize_or_zero() * speed.0
                } else {
                    if brain.cooldown <= 0.0 && stats.0.attack > 0.0 {
                        damage.write(DamageRequest::strike(player, stats.0.attack, Some(e)));
                        brain.cooldown = stats.0.attack_cooldown;
                    }
                    Vec2::ZERO
                }
            }
            _ => Vec2::ZERO,
        };
        vel.0 = vel.0.lerp(desired, blend);
    }
}

fn on_enemy_died(
    mut died: MessageReader<Died>,
    mut q: Query<(&mut Brain, &mut CollisionLayers, &mut LinearVelocity), With<Enemy>>,
) {
    for ev in died.read() {
        let Ok((mut brain, mut layers, mut vel)) = q.get_mut(ev.entity) else {
            continue;
        };
        brain.stop("Died");
        *layers = non_interacting_layers();
        vel.0 = Vec2::ZERO;
    }
}

fn flash_on_damage(mut changed: MessageReader<HealthChanged>, mut q: Query<&mut EnemyLook>) {
    for ev in changed.read() {
        if ev.delta >= 0.0 {
            continue;
        }
        if let Ok(mut look) = q.get_mut(ev.entity) {
            look.hit_flash = UnitF32::new_clamped(1.0);
        }
    }
}

// -----------------------------------------------------------------------------
// Presentation
// -----------------------------------------------------------------------------

fn tint_enemies(
    time: Res<Time>,
    mut q: Query<(&mut EnemyLook, &LifeState, Option<&Highlight>, &mut Sprite, &mut Transform)>,
) {
    let dt = time.delta_secs();

    for (mut look, life, highlight, mut sprite, mut tf) in &mut q {
        look.hit_flash.decay_to_zero(8.0, dt);

        let mut out = look.base.to_srgba();
        if highlight.is_some_and(|h| h.0) {
            out.red = (out.red + 0.15).min(1.0);
            out.green = (out.green + 0.45).min(1.0);
            out.blue = (out.blue + 0.25).min(1.0);
        }
        let hf = look.hit_flash.get();
        out.red = (out.red + hf * 0.55).min(1.0);
        out.green = (out.green + hf * 0.55).min(1.0);
        out.blue = (out.blue + hf * 0.55).min(1.0);

        let fade = match life {
            LifeState::Alive => 0.0,
            LifeState::Dying { timer } => timer.fraction(),
            LifeState::Dead => 1.0,
        };
        out.alpha = 1.0 - fade;
        tf.scale = Vec3::splat((1.0 - fade).max(0.05));
        sprite.color = out.into();
    }
}

#[cfg(test)]
mod tests;
