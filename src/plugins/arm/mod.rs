//! Procedural arm.
//!
//! The arm lives on its owning character as an `Arm` component. Its collision is a set
//! of free-standing sensor entities (one per segment, plus the hand and the grab range
//! trigger) that are re-posed from the curve every fixed tick.
//!
//! ```text
//! FixedUpdate      Aim:   stick (or homing focus) -> hand target -> real hand chase
//!                  Arm:   bulge timeline -> Bézier rebuild -> sensor poses
//! FixedPostUpdate  Contacts: segment CollisionStart/End -> OverlapRecord
//!                            first contact: hit + fx + stay damage
//!                            last exit:     stop stay damage
//! ```

pub mod bulge;
pub mod curve;
pub mod overlap;

use avian2d::prelude::*;
use bevy::prelude::*;
use bevy::state::state_scoped::DespawnOnExit;

use crate::common::contacts::{ended_sides, split_pair, started_sides};
use crate::common::layers::Layer;
use crate::common::state::{CombatSet, GameState};
use crate::common::tunables::{ArmTunables, Tunables};
use crate::plugins::enemies::{Brain, Enemy};
use crate::plugins::fx::{EffectKind, FxWriters, SoundCue};
use crate::plugins::grab::components::{Grabber, GrabberInput};
use crate::plugins::health::{DamageKind, DamageRequest, LifeState, PendingDespawn};
use crate::plugins::periodic::{DamagePurpose, PeriodicDamage};
use crate::plugins::timers::Scheduler;

use bulge::{Bulge, BulgeProfile};
use overlap::{ExitOutcome, OverlapRecord};

// -----------------------------------------------------------------------------
// Components
// -----------------------------------------------------------------------------

/// Collision profile of the hand volume.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HandProfile {
    #[default]
    Inactive,
    /// Melee fallback when a grab starts without a target.
    Punch,
    /// Holding something; touching a detonator sets it off.
    Blocking,
}

pub fn hand_layers(profile: HandProfile) -> CollisionLayers {
    match profile {
        HandProfile::Inactive => CollisionLayers::new(Layer::Hand, [] as [Layer; 0]),
        HandProfile::Punch => CollisionLayers::new(Layer::Hand, [Layer::Enemy]),
        HandProfile::Blocking => CollisionLayers::new(Layer::Hand, [Layer::Detonator]),
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SegmentPose {
    pub start: Vec2,
    pub end: Vec2,
    pub start_tangent: Vec2,
    pub end_tangent: Vec2,
    pub start_scale: f32,
    pub end_scale: f32,
}

#[derive(Component, Debug, Clone)]
pub struct Arm {
    point_count: usize,
    shoulder: Vec2,
    hand_target: Vec2,
    real_hand: Vec2,
    hand_velocity: Vec2,
    stick: Vec2,
    swing_bias: Vec2,
    points: Vec<Vec2>,
    tangents: Vec<Vec2>,
    scales: Vec<(f32, f32)>,
    poses: Vec<SegmentPose>,
    bulge: Bulge,
    profile: BulgeProfile,
    focus: Option<Entity>,
    hand_profile: HandProfile,
}

impl Arm {
    pub fn new(t: &ArmTunables, shoulder: Vec2) -> Self {
        let point_count = t.point_count.max(2);
        let rest = shoulder + curve::hand_target_offset(Vec2::ZERO, t);
        let mut arm = Self {
            point_count,
            shoulder,
            hand_target: rest,
            real_hand: rest,
            hand_velocity: Vec2::ZERO,
            stick: Vec2::ZERO,
            swing_bias: Vec2::ZERO,
            points: Vec::with_capacity(point_count),
            tangents: Vec::with_capacity(point_count),
            scales: Vec::with_capacity(point_count - 1),
            poses: Vec::with_capacity(point_count - 1),
            bulge: Bulge::new(point_count, t.bulge_radius),
            profile: BulgeProfile::new(t.bulge_radius, t.bulge_amplitude),
            focus: None,
            hand_profile: HandProfile::Inactive,
        };
        arm.rebuild(t);
        arm
    }

    #[inline]
    pub fn shoulder(&self) -> Vec2 {
        self.shoulder
    }

    #[inline]
    pub fn hand_target(&self) -> Vec2 {
        self.hand_target
    }

    #[inline]
    pub fn real_hand(&self) -> Vec2 {
        self.real_hand
    }

    /// Velocity of the real hand over the last aim step; used as throw velocity.
    #[inline]
    pub fn hand_velocity(&self) -> Vec2 {
        self.hand_velocity
    }

    /// Perpendicular of the stick while it is rotating, zero otherwise. Orients hit shakes.
    #[inline]
    pub fn swing_bias(&self) -> Vec2 {
        self.swing_bias
    }

    #[inline]
    pub fn control_points(&self) -> &[Vec2] {
        &self.points
    }

    #[inline]
    pub fn segment_poses(&self) -> &[SegmentPose] {
        &self.poses
    }

    #[inline]
    pub fn segment_count(&self) -> usize {
        self.point_count - 1
    }

    #[inline]
    pub fn is_bulging(&self) -> bool {
        self.bulge.is_active()
    }

    #[inline]
    pub fn bulge_center(&self) -> usize {
        self.bulge.center()
    }

    /// Entity the hand is homing onto, if any.
    #[inline]
    pub fn focus(&self) -> Option<Entity> {
        self.focus
    }

    #[inline]
    pub fn hand_profile(&self) -> HandProfile {
        self.hand_profile
    }

    pub(crate) fn set_focus(&mut self, focus: Option<Entity>) {
        self.focus = focus;
    }

    pub(crate) fn set_hand_profile(&mut self, profile: HandProfile) {
        self.hand_profile = profile;
    }

    pub fn start_bulge(&mut self) {
        self.bulge.start();
    }

    pub fn stop_bulge(&mut self) {
        self.bulge.stop(self.point_count, self.profile.radius());
    }

    /// Move the hand target (stick or homing position) and chase it with the real hand.
    pub fn aim(&mut self, shoulder: Vec2, stick: Vec2, focus_at: Option<Vec2>, t: &ArmTunables, dt: f32) {
        self.shoulder = shoulder;
        self.hand_target = focus_at.unwrap_or_else(|| shoulder + curve::hand_target_offset(stick, t));

        let move_time = match focus_at {
            Some(_) => t.hand_move_time * t.grab_move_time_scale,
            None => t.hand_move_time,
        };
        let before = self.real_hand;
        self.real_hand = before.lerp(self.hand_target, curve::smoothing_alpha(dt, move_time));
        self.hand_velocity = if dt > 0.0 { (self.real_hand - before) / dt } else { Vec2::ZERO };

        let stick = stick.normalize_or_zero();
        let turn = self.stick.perp_dot(stick);
        self.swing_bias = if turn.abs() > f32::EPSILON { Vec2::new(stick.y, -stick.x) } else { Vec2::ZERO };
        self.stick = stick;
    }

    pub fn advance_bulge(&mut self, dt: f32, t: &ArmTunables) {
        self.bulge.advance(
            dt,
            t.bulge_speed,
            t.bulge_timeline_offset,
            self.point_count,
            self.profile.radius(),
        );
    }

    /// Full recompute of points, tangents and segment poses.
    pub fn rebuild(&mut self, t: &ArmTunables) {
        let anchors = curve::anchors(self.shoulder, self.real_hand, self.hand_target, t);
        curve::sample_curve(&anchors, self.point_count, &mut self.points);
        curve::tangents(&self.points, t.tangent_scale, &mut self.tangents);
        bulge::segment_scales(
            self.point_count - 1,
            t.start_scale,
            t.end_scale,
            &self.bulge,
            &self.profile,
            &mut self.scales,
        );

        self.poses.clear();
        self.poses.extend((0..self.point_count - 1).map(|i| SegmentPose {
            start: self.points[i],
            end: self.points[i + 1],
            start_tangent: self.tangents[i],
            end_tangent: self.tangents[i + 1],
            start_scale: self.scales[i].0,
            end_scale: self.scales[i].1,
        }));
    }
}

#[derive(Component, Debug, Clone, Copy)]
pub struct ArmSegment {
    pub owner: Entity,
    pub index: usize,
}

#[derive(Component, Debug, Clone, Copy)]
pub struct HandVolume {
    pub owner: Entity,
}

#[derive(Component, Debug, Clone, Copy)]
pub struct GrabRangeVolume {
    pub owner: Entity,
}

/// First-contact notice for UI / feel.
#[derive(Message, Clone, Copy, Debug, PartialEq)]
pub struct ArmHit {
    pub owner: Entity,
    pub entity: Entity,
    pub at: Vec2,
}

// -----------------------------------------------------------------------------
// Plugin wiring
// -----------------------------------------------------------------------------

pub fn plugin(app: &mut App) {
    app.insert_resource(OverlapRecord::default())
        .add_message::<ArmHit>();

    app.add_systems(
        OnEnter(GameState::InGame),
        spawn_arm_parts.after(crate::plugins::player::spawn),
    );

    app.add_systems(FixedUpdate, aim_hands.in_set(CombatSet::Aim))
        .add_systems(
            FixedUpdate,
            (rebuild_arms, sync_arm_volumes).chain().in_set(CombatSet::Arm),
        )
        .add_systems(FixedPostUpdate, arm_overlap_contacts.in_set(CombatSet::Contacts))
        .add_systems(
            PostUpdate,
            forget_despawning.before(crate::plugins::health::despawn_marked),
        );
}

// -----------------------------------------------------------------------------
// Spawn
// -----------------------------------------------------------------------------

fn segment_base_length(t: &ArmTunables) -> f32 {
    t.max_length / (t.point_count.max(2) - 1) as f32
}

/// Spawn the sensor entities backing the arm.
///
/// An arm without exactly one owning character is a setup error.
pub(crate) fn spawn_arm_parts(
    mut commands: Commands,
    tunables: Res<Tunables>,
    q_owner: Query<(Entity, &Arm)>,
) {
    let (owner, arm) = q_owner
        .single()
        .expect("arm parts need exactly one owning character");
    let t = &tunables.arm;
    let base_len = segment_base_length(t);

    for index in 0..arm.segment_count() {
        commands.spawn((
            Name::new(format!("ArmSegment{index}")),
            ArmSegment { owner, index },
            Sprite {
                color: Color::srgb(0.35, 0.85, 0.55),
                custom_size: Some(Vec2::new(base_len, t.thickness)),
                ..default()
            },
            Transform::from_xyz(arm.shoulder().x, arm.shoulder().y, 2.0),
            RigidBody::Static,
            Collider::rectangle(base_len, t.thickness),
            Sensor,
            CollisionEventsEnabled,
            CollisionLayers::new(Layer::ArmSegment, [Layer::Enemy]),
            DespawnOnExit(GameState::InGame),
        ));
    }

    commands.spawn((
        Name::new("HandVolume"),
        HandVolume { owner },
        Transform::from_xyz(arm.real_hand().x, arm.real_hand().y, 2.0),
        RigidBody::Static,
        Collider::circle(t.hand_radius),
        Sensor,
        CollisionEventsEnabled,
        hand_layers(HandProfile::Inactive),
        DespawnOnExit(GameState::InGame),
    ));

    commands.spawn((
        Name::new("GrabRange"),
        GrabRangeVolume { owner },
        Transform::from_xyz(arm.shoulder().x, arm.shoulder().y, 0.0),
        RigidBody::Static,
        Collider::circle(t.max_length + tunables.grab.range_extension),
        Sensor,
        CollisionEventsEnabled,
        CollisionLayers::new(Layer::GrabRange, [Layer::Enemy, Layer::Object]),
        DespawnOnExit(GameState::InGame),
    ));
}

// -----------------------------------------------------------------------------
// Fixed step
// -----------------------------------------------------------------------------

fn aim_hands(
    time: Res<Time>,
    tunables: Res<Tunables>,
    mut q_arm: Query<(&mut Arm, &Transform, Option<&GrabberInput>)>,
    q_focus: Query<&Transform, Without<Arm>>,
) {
    let dt = time.delta_secs();
    let t = &tunables.arm;
    for (mut arm, tf, input) in &mut q_arm {
        let shoulder = tf.translation.truncate() + t.shoulder_offset;
        let stick = input.map_or(Vec2::ZERO, |i| i.aim);
        let focus_at = arm
            .focus()
            .and_then(|e| q_focus.get(e).ok())
            .map(|ftf| ftf.translation.truncate());
        arm.aim(shoulder, stick, focus_at, t, dt);
    }
}

fn rebuild_arms(time: Res<Time>, tunables: Res<Tunables>, mut q: Query<&mut Arm>) {
    let dt = time.delta_secs();
    for mut arm in &mut q {
        arm.advance_bulge(dt, &tunables.arm);
        arm.rebuild(&tunables.arm);
    }
}

#[allow(clippy::type_complexity)]
fn sync_arm_volumes(
    tunables: Res<Tunables>,
    q_arm: Query<&Arm>,
    mut q_segments: Query<(&ArmSegment, &mut Transform), (Without<HandVolume>, Without<GrabRangeVolume>)>,
    mut q_hand: Query<
        (&HandVolume, &mut Transform, &mut CollisionLayers),
        (Without<ArmSegment>, Without<GrabRangeVolume>),
    >,
    mut q_range: Query<(&GrabRangeVolume, &mut Transform), (Without<ArmSegment>, Without<HandVolume>)>,
) {
    let base_len = segment_base_length(&tunables.arm);

    for (seg, mut tf) in &mut q_segments {
        let Ok(arm) = q_arm.get(seg.owner) else {
            continue;
        };
        let Some(pose) = arm.segment_poses().get(seg.index) else {
            continue;
        };
        let span = pose.end - pose.start;
        let mid = (pose.start + pose.end) * 0.5;
        tf.translation.x = mid.x;
        tf.translation.y = mid.y;
        tf.rotation = Quat::from_rotation_z(span.y.atan2(span.x));
        tf.scale = Vec3::new(
            (span.length() / base_len).max(0.05),
            ((pose.start_scale + pose.end_scale) * 0.5).max(0.05),
            1.0,
        );
    }

    for (hand, mut tf, mut layers) in &mut q_hand {
        let Ok(arm) = q_arm.get(hand.owner) else {
            continue;
        };
        tf.translation.x = arm.real_hand().x;
        tf.translation.y = arm.real_hand().y;
        let wanted = hand_layers(arm.hand_profile());
        if *layers != wanted {
            *layers = wanted;
        }
    }

    for (range, mut tf) in &mut q_range {
        let Ok(arm) = q_arm.get(range.owner) else {
            continue;
        };
        tf.translation.x = arm.shoulder().x;
        tf.translation.y = arm.shoulder().y;
    }
}

// -----------------------------------------------------------------------------
// Contacts
// -----------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
pub(crate) fn arm_overlap_contacts(
    mut started: MessageReader<CollisionStart>,
    mut ended: MessageReader<CollisionEnd>,
    tunables: Res<Tunables>,
    mut record: ResMut<OverlapRecord>,
    mut scheduler: ResMut<Scheduler>,
    mut periodic: ResMut<PeriodicDamage>,
    mut damage: MessageWriter<DamageRequest>,
    mut hits: MessageWriter<ArmHit>,
    mut fx: FxWriters,
    q_segments: Query<&ArmSegment>,
    q_owner: Query<(&Arm, Option<&Grabber>)>,
    mut q_enemy: Query<(&Transform, &LifeState, Option<&mut Brain>), (With<Enemy>, Without<PendingDespawn>)>,
) {
    let t = &tunables.arm;

    // Enters before exits: a hand-off between two segments in one tick is not a new contact.
    for ev in started.read() {
        let Some((seg_side, other)) = split_pair(started_sides(ev), |e| q_segments.contains(e)) else {
            continue;
        };
        let Ok(seg) = q_segments.get(seg_side.collider) else {
            continue;
        };
        let target = other.gameplay_owner();
        let Ok((tf, life, brain)) = q_enemy.get_mut(target) else {
            continue;
        };
        let Ok((arm, grabber)) = q_owner.get(seg.owner) else {
            continue;
        };
        if !record.record_enter(target) {
            continue;
        }
        if !life.is_alive() || grabber.is_some_and(|g| g.grabbed() == Some(target)) {
            continue;
        }

        let at = tf.translation.truncate();
        if let Some(mut brain) = brain {
            brain.stun(t.hit_stun);
        }
        damage.write(DamageRequest::strike(target, t.hit_damage, Some(seg.owner)));
        fx.effect(EffectKind::ArmHit, at);
        fx.sound(SoundCue::ArmHit, None);
        if arm.swing_bias() != Vec2::ZERO {
            fx.shake(arm.swing_bias());
        }
        hits.write(ArmHit { owner: seg.owner, entity: target, at });
        periodic.start(
            &mut scheduler,
            target,
            DamagePurpose::ArmStay,
            t.stay_damage,
            t.stay_damage_interval,
            DamageKind::Strike,
            Some(seg.owner),
        );
    }

    for ev in ended.read() {
        let Some((_, other)) = split_pair(ended_sides(ev), |e| q_segments.contains(e)) else {
            continue;
        };
        let target = other.gameplay_owner();
        if !q_enemy.contains(target) {
            continue;
        }
        if record.record_exit(target) == ExitOutcome::Cleared {
            periodic.stop(&mut scheduler, target, DamagePurpose::ArmStay);
        }
    }
}

fn forget_despawning(mut record: ResMut<OverlapRecord>, q: Query<Entity, Added<PendingDespawn>>) {
    for e in &q {
        record.forget(e);
    }
}
