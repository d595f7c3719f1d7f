//! Thrown-entity explosions.
//!
//! Requests come from thrown impacts, the fuse timer, detonator surfaces touched by
//! a blocking hand, and the kill bounds. `detonate` resolves each at most once per
//! throw; the outcome (destroyed or back to free) is settled after damage lands.

use avian2d::prelude::*;
use bevy::prelude::*;

use super::components::{Detonated, Detonator, Grabbable, Grabber, Thrown};
use super::messages::ExplodeRequest;
use crate::common::contacts::started_sides;
use crate::common::tunables::Tunables;
use crate::plugins::arm::{Arm, HandProfile};
use crate::plugins::enemies::Brain;
use crate::plugins::fx::{EffectKind, FxWriters, SoundCue};
use crate::plugins::health::{DamageRequest, DeathDelay, Died, Health, LifeState, PendingDespawn};
use crate::plugins::timers::{Scheduler, Task, TimerFired};

/// Circle vs axis-aligned box overlap.
#[inline]
pub fn circle_touches_rect(center: Vec2, radius: f32, rect_center: Vec2, half_extents: Vec2) -> bool {
    let closest = center.clamp(rect_center - half_extents, rect_center + half_extents);
    closest.distance_squared(center) <= radius * radius
}

#[inline]
pub fn outside_bounds(p: Vec2, half_extents: Vec2) -> bool {
    p.x.abs() > half_extents.x || p.y.abs() > half_extents.y
}

/// Blast falloff: full strength at the center, zero at the rim.
#[inline]
pub fn falloff(distance: f32, radius: f32) -> f32 {
    if radius <= 0.0 {
        return 0.0;
    }
    (1.0 - distance / radius).clamp(0.0, 1.0)
}

// -----------------------------------------------------------------------------
// Request sources
// -----------------------------------------------------------------------------

/// A thrown entity colliding with another grabbable explodes.
pub(crate) fn thrown_impacts(
    mut started: MessageReader<CollisionStart>,
    q_thrown: Query<(), With<Thrown>>,
    q_grabbable: Query<(), (With<Grabbable>, Without<PendingDespawn>)>,
    mut out: MessageWriter<ExplodeRequest>,
) {
    for ev in started.read() {
        let (a, b) = started_sides(ev);
        let (a, b) = (a.gameplay_owner(), b.gameplay_owner());
        if q_thrown.contains(a) && q_grabbable.contains(b) {
            out.write(ExplodeRequest { entity: a });
        }
        if q_thrown.contains(b) && q_grabbable.contains(a) {
            out.write(ExplodeRequest { entity: b });
        }
    }
}

/// A blocking hand touching a detonator sets off whatever it holds.
pub(crate) fn detonate_on_surfaces(
    tunables: Res<Tunables>,
    q_grabbers: Query<(&Grabber, &Arm)>,
    q_detonators: Query<(&Detonator, &Transform)>,
    mut out: MessageWriter<ExplodeRequest>,
) {
    let r = tunables.arm.hand_radius;
    for (grabber, arm) in &q_grabbers {
        let Some(held) = grabber.grabbed() else {
            continue;
        };
        if arm.hand_profile() != HandProfile::Blocking {
            continue;
        }
        let hand = arm.real_hand();
        let touching = q_detonators
            .iter()
            .any(|(d, tf)| circle_touches_rect(hand, r, tf.translation.truncate(), d.half_extents));
        if touching {
            out.write(ExplodeRequest { entity: held });
        }
    }
}

/// Grabbables that fell outside the kill bounds blow up once.
pub(crate) fn explode_out_of_bounds(
    tunables: Res<Tunables>,
    q: Query<(Entity, &Transform, &Grabbable), Without<PendingDespawn>>,
    mut out: MessageWriter<ExplodeRequest>,
) {
    let bounds = tunables.world.kill_half_extents;
    for (e, tf, g) in &q {
        if !g.has_exploded() && outside_bounds(tf.translation.truncate(), bounds) {
            out.write(ExplodeRequest { entity: e });
        }
    }
}

/// The fuse armed at let-go. Stale fuses (entity re-thrown since) are ignored.
pub(crate) fn explode_on_timer(
    mut fired: MessageReader<TimerFired>,
    q_thrown: Query<&Thrown>,
    mut out: MessageWriter<ExplodeRequest>,
) {
    for ev in fired.read() {
        let Task::Explode { entity } = ev.task else {
            continue;
        };
        if q_thrown.get(entity).is_ok_and(|t| t.fuse == ev.handle) {
            out.write(ExplodeRequest { entity });
        }
    }
}

// -----------------------------------------------------------------------------
// Resolution
// -----------------------------------------------------------------------------

#[allow(clippy::type_complexity, clippy::too_many_arguments)]
pub(crate) fn detonate(
    mut requests: MessageReader<ExplodeRequest>,
    tunables: Res<Tunables>,
    mut commands: Commands,
    mut scheduler: ResMut<Scheduler>,
    mut q_grabbable: Query<(&mut Grabbable, &Transform, Option<&Thrown>, Option<&RigidBody>)>,
    q_victims: Query<(Entity, &Transform), (With<Health>, Without<PendingDespawn>)>,
    mut q_push: Query<&mut LinearVelocity>,
    mut damage: MessageWriter<DamageRequest>,
    mut fx: FxWriters,
) {
    let t = &tunables.throw;

    for req in requests.read() {
        let Ok((mut g, tf, thrown, body)) = q_grabbable.get_mut(req.entity) else {
            continue;
        };
        let thrower = g.holder().or(thrown.map(|th| th.by));
        if !g.begin_explode() {
            continue;
        }
        if let Some(th) = thrown {
            scheduler.cancel(th.fuse);
        }
        if let Some(body) = body {
            if *body != RigidBody::Dynamic {
                commands.entity(req.entity).insert(RigidBody::Dynamic);
            }
        }
        let center = tf.translation.truncate();

        for (victim, vtf) in &q_victims {
            if Some(victim) == thrower {
                continue;
            }
            if victim == req.entity && !t.explosion_damages_self {
                continue;
            }
            let at = vtf.translation.truncate();
            let d = at.distance(center);
            if d > t.explosion_radius {
                continue;
            }
            damage.write(DamageRequest::strike(victim, t.explosion_damage, thrower));
            if victim != req.entity {
                if let Ok(mut vel) = q_push.get_mut(victim) {
                    let dir = (at - center).normalize_or(Vec2::X);
                    vel.0 += dir * t.knockback * falloff(d, t.explosion_radius);
                }
            }
        }

        let bias = thrower
            .and_then(|th| q_victims.get(th).ok())
            .map_or(Vec2::Y, |(_, ttf)| center - ttf.translation.truncate());
        fx.effect(EffectKind::Explosion, center);
        fx.sound(SoundCue::Explosion, Some(center));
        fx.shake(bias);

        debug!(entity = ?req.entity, thrower = ?thrower, "detonated");
        commands.entity(req.entity).insert(Detonated).remove::<Thrown>();
    }
}

/// After blast damage is applied: destroyed if out of health, otherwise free again.
///
/// A destroyed entity that is still alive (drained by a hold, spared by its own
/// blast) dies here so `Died` is written once; the health plugin despawns it when
/// the death delay ends. Entities without a life cycle are despawned directly.
#[allow(clippy::type_complexity)]
pub(crate) fn settle_detonations(
    mut commands: Commands,
    mut q: Query<
        (
            Entity,
            &mut Grabbable,
            Option<&Health>,
            Option<&mut LifeState>,
            Option<&DeathDelay>,
            Option<&mut Brain>,
        ),
        With<Detonated>,
    >,
    mut died: MessageWriter<Died>,
) {
    for (e, mut g, health, life, delay, brain) in &mut q {
        let destroyed = health.is_none_or(|h| h.is_depleted());
        g.settle(destroyed);
        commands.entity(e).remove::<Detonated>();
        if !destroyed {
            if let Some(mut brain) = brain {
                brain.resume("Exploded");
            }
            continue;
        }
        match life {
            Some(mut life) if life.is_alive() => {
                *life = LifeState::dying(delay);
                died.write(Died { entity: e });
            }
            Some(_) => {}
            None => {
                commands.entity(e).insert(PendingDespawn);
            }
        }
    }
}
