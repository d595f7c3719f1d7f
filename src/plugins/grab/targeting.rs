//! Target acquisition.
//!
//! Range membership comes from the grab range sensor. Lists keep entry order, which
//! makes the tie-break deterministic: on equal yaw the candidate that entered range
//! first wins, because only a strictly smaller difference replaces the best.

use avian2d::prelude::*;
use bevy::prelude::*;

use super::components::{GrabbableKind, Grabbable, Grabber, Highlight};
use crate::common::contacts::{ended_sides, split_pair, started_sides};
use crate::common::tunables::Tunables;
use crate::plugins::arm::{Arm, GrabRangeVolume};
use crate::plugins::health::{LifeState, PendingDespawn};

/// Grabbables currently inside the owner's range trigger, in entry order.
#[derive(Component, Debug, Clone, Default)]
pub struct GrabRange {
    enemies: Vec<Entity>,
    objects: Vec<Entity>,
}

impl GrabRange {
    pub fn insert(&mut self, e: Entity, kind: GrabbableKind) -> bool {
        let list = match kind {
            GrabbableKind::Enemy { .. } => &mut self.enemies,
            GrabbableKind::Object => &mut self.objects,
        };
        if list.contains(&e) {
            return false;
        }
        list.push(e);
        true
    }

    pub fn remove(&mut self, e: Entity) -> bool {
        let before = self.enemies.len() + self.objects.len();
        self.enemies.retain(|x| *x != e);
        self.objects.retain(|x| *x != e);
        before != self.enemies.len() + self.objects.len()
    }

    pub fn enemies(&self) -> &[Entity] {
        &self.enemies
    }

    pub fn objects(&self) -> &[Entity] {
        &self.objects
    }

    fn retain(&mut self, keep: impl Fn(Entity) -> bool) {
        self.enemies.retain(|e| keep(*e));
        self.objects.retain(|e| keep(*e));
    }
}

/// Bearing from `from` to `to`, in degrees.
#[inline]
pub fn yaw_deg(from: Vec2, to: Vec2) -> f32 {
    let d = to - from;
    d.y.atan2(d.x).to_degrees()
}

/// Absolute difference of two bearings, wrapped into `[0, 180]`.
#[inline]
pub fn yaw_difference(a: f32, b: f32) -> f32 {
    let d = (a - b).rem_euclid(360.0);
    if d > 180.0 { 360.0 - d } else { d }
}

/// Candidate with the smallest yaw difference under `tolerance`; first wins on ties.
pub fn select_best(
    origin: Vec2,
    aim_point: Vec2,
    candidates: impl IntoIterator<Item = (Entity, Vec2)>,
    tolerance: f32,
) -> Option<Entity> {
    let aim = yaw_deg(origin, aim_point);
    let mut best: Option<(Entity, f32)> = None;
    for (e, pos) in candidates {
        let diff = yaw_difference(aim, yaw_deg(origin, pos));
        let bound = best.map_or(tolerance, |(_, d)| d);
        if diff < tolerance && diff < bound {
            best = Some((e, diff));
        }
    }
    best.map(|(e, _)| e)
}

pub(crate) fn track_grab_range(
    mut started: MessageReader<CollisionStart>,
    mut ended: MessageReader<CollisionEnd>,
    q_volumes: Query<&GrabRangeVolume>,
    mut q_ranges: Query<&mut GrabRange>,
    q_grabbable: Query<&Grabbable>,
) {
    for ev in started.read() {
        let Some((vol, other)) = split_pair(started_sides(ev), |e| q_volumes.contains(e)) else {
            continue;
        };
        let Ok(volume) = q_volumes.get(vol.collider) else {
            continue;
        };
        let target = other.gameplay_owner();
        let (Ok(mut range), Ok(g)) = (q_ranges.get_mut(volume.owner), q_grabbable.get(target)) else {
            continue;
        };
        range.insert(target, g.kind());
    }

    for ev in ended.read() {
        let Some((vol, other)) = split_pair(ended_sides(ev), |e| q_volumes.contains(e)) else {
            continue;
        };
        let Ok(volume) = q_volumes.get(vol.collider) else {
            continue;
        };
        if let Ok(mut range) = q_ranges.get_mut(volume.owner) {
            range.remove(other.gameplay_owner());
        }
    }
}

/// Re-evaluate the best candidate for every grabber that is not grabbing.
#[allow(clippy::type_complexity)]
pub(crate) fn acquire_targets(
    tunables: Res<Tunables>,
    mut q_grabbers: Query<(&mut Grabber, &mut GrabRange, &Arm)>,
    mut q_targets: Query<
        (&mut Grabbable, &Transform, Option<&LifeState>, Option<&mut Highlight>),
        Without<PendingDespawn>,
    >,
) {
    let tolerance = tunables.grab.angle_tolerance;

    for (mut grabber, mut range, arm) in &mut q_grabbers {
        if grabber.is_grabbing() {
            continue;
        }
        range.retain(|e| q_targets.contains(e));

        let eligible = |list: &[Entity]| -> Vec<(Entity, Vec2)> {
            list.iter()
                .filter_map(|e| {
                    let (g, tf, life, _) = q_targets.get(*e).ok()?;
                    let alive = life.is_none_or(|l| l.is_alive());
                    (g.is_available() && alive).then(|| (*e, tf.translation.truncate()))
                })
                .collect()
        };
        let enemies = eligible(range.enemies());
        let objects = eligible(range.objects());

        let best = select_best(arm.shoulder(), arm.hand_target(), enemies, tolerance)
            .or_else(|| select_best(arm.shoulder(), arm.hand_target(), objects, tolerance));

        let previous = grabber.grab_target();
        if previous != best {
            if let Some(prev) = previous {
                set_highlight(&mut q_targets, prev, false);
            }
            if let Some(next) = best {
                set_highlight(&mut q_targets, next, true);
            }
            grabber.set_grab_target(best);
        }
    }
}

/// Highlight on/off together with the Targeted state.
#[allow(clippy::type_complexity)]
pub(crate) fn set_highlight(
    q: &mut Query<
        (&mut Grabbable, &Transform, Option<&LifeState>, Option<&mut Highlight>),
        Without<PendingDespawn>,
    >,
    e: Entity,
    on: bool,
) {
    if let Ok((mut g, _, _, highlight)) = q.get_mut(e) {
        g.set_targeted(on);
        if let Some(mut h) = highlight {
            h.0 = on;
        }
    }
}
