//! Feedback layer: effect bursts, sound cues, camera shake and hitstop.
//!
//! ---------------------------
//! HOW THIS IS DESIGNED (ECS)
//! ---------------------------
//! Gameplay never touches the camera, the clock or sprites directly. It writes
//! intent as messages:
//!
//! - `SpawnEffect { kind, at }`    -> short-lived burst sprite
//! - `PlaySound { cue, at }`       -> logged cue (2D when `at` is `None`)
//! - `ShakeCamera { bias }`        -> directional kick, `normalize(bias) * 20`
//!
//! `GlobalFx` is the single source of truth for global presentation effects.
//! Producers write intent there; one consumer applies it to the camera and one to
//! virtual time, so nothing fights over either.
//!
//! ---------------------------
//! TIME MODEL (HITSTOP)
//! ---------------------------
//! Hitstop sets virtual time speed to 0 for a short real-time window. Its timer ticks
//! on real time so it still progresses while virtual time is frozen.

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use bevy::state::state_scoped::DespawnOnExit;
use bevy::time::{Real, Virtual};

use crate::common::state::GameState;
use crate::plugins::camera::MainCamera;

/// Length of the directional kick for a unit shake request.
pub const SHAKE_SCALE: f32 = 20.0;

// -----------------------------------------------------------------------------
// Newtypes
// -----------------------------------------------------------------------------

/// Value normalized to `[0, 1]`; clamped once on write.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct UnitF32(f32);

impl UnitF32 {
    #[inline]
    pub(crate) fn new_clamped(v: f32) -> Self {
        Self(v.clamp(0.0, 1.0))
    }
    #[inline]
    pub(crate) fn get(self) -> f32 {
        self.0
    }
    #[inline]
    pub(crate) fn add_clamped(&mut self, dv: f32) {
        self.0 = (self.0 + dv).clamp(0.0, 1.0);
    }
    #[inline]
    pub(crate) fn decay_to_zero(&mut self, rate_per_sec: f32, dt: f32) {
        self.0 = (self.0 - rate_per_sec * dt).max(0.0);
    }
}

/// Wall-clock seconds, never negative.
#[derive(Clone, Copy, Debug, Default)]
struct RealSeconds(f32);

impl RealSeconds {
    #[inline]
    fn get(self) -> f32 {
        self.0
    }
    #[inline]
    fn set_max(&mut self, v: f32) {
        self.0 = self.0.max(v.max(0.0));
    }
    #[inline]
    fn tick_down(&mut self, dt: f32) {
        self.0 = (self.0 - dt).max(0.0);
    }
    #[inline]
    fn is_positive(self) -> bool {
        self.0 > 0.0
    }
}

/// Quintic easing (0..1 -> 0..1).
#[inline]
pub fn smootherstep(x: f32) -> f32 {
    x * x * x * (x * (x * 6.0 - 15.0) + 10.0)
}

// -----------------------------------------------------------------------------
// Messages
// -----------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EffectKind {
    ArmHit,
    Punch,
    Explosion,
    Devour,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SoundCue {
    ArmHit,
    Punch,
    Grab,
    Explosion,
    Devour,
}

#[derive(Message, Clone, Copy, Debug, PartialEq)]
pub struct SpawnEffect {
    pub kind: EffectKind,
    pub at: Vec2,
}

#[derive(Message, Clone, Copy, Debug, PartialEq)]
pub struct PlaySound {
    pub cue: SoundCue,
    /// `None` plays as a 2D (non-positional) sound.
    pub at: Option<Vec2>,
}

#[derive(Message, Clone, Copy, Debug, PartialEq)]
pub struct ShakeCamera {
    pub bias: Vec2,
}

/// Writers for the three feedback channels.
#[derive(SystemParam)]
pub struct FxWriters<'w> {
    effects: MessageWriter<'w, SpawnEffect>,
    sounds: MessageWriter<'w, PlaySound>,
    shakes: MessageWriter<'w, ShakeCamera>,
}

impl FxWriters<'_> {
    pub fn effect(&mut self, kind: EffectKind, at: Vec2) {
        self.effects.write(SpawnEffect { kind, at });
    }

    pub fn sound(&mut self, cue: SoundCue, at: Option<Vec2>) {
        self.sounds.write(PlaySound { cue, at });
    }

    pub fn shake(&mut self, bias: Vec2) {
        self.shakes.write(ShakeCamera { bias });
    }
}

// -----------------------------------------------------------------------------
// Resources
// -----------------------------------------------------------------------------

#[derive(Resource, Debug, Default)]
pub struct GlobalFx {
    // trauma is intensity [0..1], shake_phase is a deterministic oscillator.
    trauma: UnitF32,
    shake_phase: f32,
    kick: Vec2,
    hitstop: RealSeconds,
}

impl GlobalFx {
    /// Directional shake: the bias is normalized then scaled by `SHAKE_SCALE`.
    pub fn push_shake(&mut self, bias: Vec2) {
        self.kick = bias.normalize_or_zero() * SHAKE_SCALE;
        self.trauma.add_clamped(0.45);
    }

    fn trigger_explosion(&mut self) {
        self.trauma.add_clamped(0.8);
        self.hitstop.set_max(0.06);
    }

    pub fn kick(&self) -> Vec2 {
        self.kick
    }
}

/// Cached camera handle plus last frame's shake offset, so the shake never drifts.
#[derive(Resource, Debug, Default, Clone, Copy)]
pub(crate) struct FxHandles {
    camera: Option<Entity>,
    prev_shake_offset: Vec2,
}

#[derive(Component, Debug, Clone)]
struct Burst {
    timer: Timer,
    from: f32,
    to: f32,
}

// -----------------------------------------------------------------------------
// Plugin wiring
// -----------------------------------------------------------------------------

pub fn plugin(app: &mut App) {
    app.insert_resource(GlobalFx::default())
        .insert_resource(FxHandles::default())
        .add_message::<SpawnEffect>()
        .add_message::<PlaySound>()
        .add_message::<ShakeCamera>();

    app.add_systems(
        PostUpdate,
        (
            (collect_shakes, spawn_bursts, log_sound_cues),
            age_bursts,
            apply_time_control,
            ensure_fx_handles,
            apply_camera_shake,
        )
            .chain()
            .run_if(in_state(GameState::InGame)),
    );
}

fn collect_shakes(mut requests: MessageReader<ShakeCamera>, mut fx: ResMut<GlobalFx>) {
    for req in requests.read() {
        fx.push_shake(req.bias);
    }
}

fn burst_style(kind: EffectKind) -> (Color, f32, f32, f32) {
    // (colour, start size, end size, seconds)
    match kind {
        EffectKind::ArmHit => (Color::srgb(0.6, 1.0, 0.7), 10.0, 34.0, 0.18),
        EffectKind::Punch => (Color::srgb(1.0, 0.95, 0.8), 12.0, 40.0, 0.15),
        EffectKind::Explosion => (Color::srgb(1.0, 0.55, 0.2), 30.0, 280.0, 0.35),
        EffectKind::Devour => (Color::srgb(0.75, 0.4, 1.0), 40.0, 4.0, 0.4),
    }
}

fn spawn_bursts(
    mut commands: Commands,
    mut requests: MessageReader<SpawnEffect>,
    mut fx: ResMut<GlobalFx>,
) {
    for req in requests.read() {
        let (color, from, to, secs) = burst_style(req.kind);
        if req.kind == EffectKind::Explosion {
            fx.trigger_explosion();
        }
        commands.spawn((
            Name::new("EffectBurst"),
            Burst { timer: Timer::from_seconds(secs, TimerMode::Once), from, to },
            Sprite::from_color(color, Vec2::splat(from)),
            Transform::from_xyz(req.at.x, req.at.y, 5.0),
            DespawnOnExit(GameState::InGame),
        ));
    }
}

fn log_sound_cues(mut cues: MessageReader<PlaySound>) {
    for cue in cues.read() {
        match cue.at {
            Some(at) => debug!(cue = ?cue.cue, x = at.x, y = at.y, "sound"),
            None => debug!(cue = ?cue.cue, "sound 2d"),
        }
    }
}

fn age_bursts(
    time: Res<Time>,
    mut commands: Commands,
    mut q: Query<(Entity, &mut Burst, &mut Sprite)>,
) {
    for (e, mut burst, mut sprite) in &mut q {
        burst.timer.tick(time.delta());
        let t = burst.timer.fraction();
        sprite.custom_size = Some(Vec2::splat(burst.from + (burst.to - burst.from) * smootherstep(t)));
        let mut c = sprite.color.to_srgba();
        c.alpha = 1.0 - t;
        sprite.color = c.into();
        if burst.timer.is_finished() {
            commands.entity(e).despawn();
        }
    }
}

fn apply_time_control(
    real_time: Res<Time<Real>>,
    mut virtual_time: ResMut<Time<Virtual>>,
    mut fx: ResMut<GlobalFx>,
) {
    if fx.hitstop.is_positive() {
        fx.hitstop.tick_down(real_time.delta_secs());
        virtual_time.set_relative_speed(0.0);
    } else if virtual_time.relative_speed() != 1.0 {
        virtual_time.set_relative_speed(1.0);
    }
}

fn ensure_fx_handles(
    mut handles: ResMut<FxHandles>,
    q_main_cam: Query<Entity, With<MainCamera>>,
) {
    if handles.camera.is_none() {
        handles.camera = q_main_cam.single().ok();
    }
}

pub(crate) fn apply_camera_shake(
    real_time: Res<Time<Real>>,
    mut fx: ResMut<GlobalFx>,
    mut handles: ResMut<FxHandles>,
    mut q_cam_tf: Query<&mut Transform, With<MainCamera>>,
) {
    let Some(cam_e) = handles.camera else {
        return;
    };
    let Ok(mut cam_tf) = q_cam_tf.get_mut(cam_e) else {
        handles.camera = None;
        return;
    };
    let dt = real_time.delta_secs();

    // Remove last frame's offset first to prevent drift.
    cam_tf.translation.x -= handles.prev_shake_offset.x;
    cam_tf.translation.y -= handles.prev_shake_offset.y;
    handles.prev_shake_offset = Vec2::ZERO;

    fx.shake_phase += dt;
    fx.trauma.decay_to_zero(1.6, dt);
    if fx.trauma.get() <= 0.0 {
        fx.kick = Vec2::ZERO;
        return;
    }

    let strength = fx.trauma.get() * fx.trauma.get();
    let x = (fx.shake_phase * 37.0 * std::f32::consts::TAU).sin()
        + 0.5 * (fx.shake_phase * 61.0 * std::f32::consts::TAU).sin();
    let y = (fx.shake_phase * 41.0 * std::f32::consts::TAU).cos()
        + 0.5 * (fx.shake_phase * 53.0 * std::f32::consts::TAU).cos();
    let noise = Vec2::new(x, y).clamp_length_max(1.0) * 12.0;
    let offset = (fx.kick + noise) * strength;

    cam_tf.translation.x += offset.x;
    cam_tf.translation.y += offset.y;
    handles.prev_shake_offset = offset;
}
