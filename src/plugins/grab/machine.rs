//! Grab state machine: Grab / homing commit / held / LetGo.
//!
//! ```text
//! Free -> Targeted -> (Grab: pause AI, home) -> Grabbed -> Devoured
//!                                                      '-> Thrown -> Exploding -> Free | Destroyed
//! Targeted/homing -> Free   (LetGo before commit)
//! ```
//!
//! Grabber references (`grab_target`, `grabbed`) are only written here and in
//! `devour`. Every command whose precondition fails is a silent no-op.

use avian2d::prelude::*;
use bevy::ecs::system::SystemParam;
use bevy::prelude::*;

use super::components::{Grabbable, Grabber, Highlight, Stamina, Thrown};
use super::messages::{DevourPrompt, GrabAction, GrabCommand, GrabStarted, LetGoNotice};
use crate::common::contacts::{split_pair, started_sides};
use crate::common::tunables::{HeldDamageMode, Tunables};
use crate::plugins::arm::overlap::OverlapRecord;
use crate::plugins::arm::{Arm, HandProfile, HandVolume};
use crate::plugins::enemies::{Brain, Enemy};
use crate::plugins::fx::{EffectKind, FxWriters, SoundCue};
use crate::plugins::health::{DamageKind, DamageRequest, Health, HealthDepleted, LifeState, PendingDespawn};
use crate::plugins::periodic::{DamagePurpose, PeriodicDamage};
use crate::plugins::timers::{Scheduler, Task};

/// Shared state touched whenever a hold starts or ends.
#[derive(SystemParam)]
pub(crate) struct HoldCleanup<'w> {
    pub(crate) scheduler: ResMut<'w, Scheduler>,
    pub(crate) periodic: ResMut<'w, PeriodicDamage>,
    pub(crate) overlap: ResMut<'w, OverlapRecord>,
}

impl HoldCleanup<'_> {
    /// Forget arm contact and stop every damage timer tied to the hold.
    pub(crate) fn detach(&mut self, e: Entity) {
        self.overlap.force_remove(e);
        self.periodic.stop(&mut self.scheduler, e, DamagePurpose::ArmStay);
        self.periodic.stop(&mut self.scheduler, e, DamagePurpose::Held);
    }
}

#[inline]
fn alive(life: Option<&LifeState>) -> bool {
    life.is_none_or(|l| l.is_alive())
}

// -----------------------------------------------------------------------------
// Input-side: stamina
// -----------------------------------------------------------------------------

/// Drain while grabbing (forcing LetGo when empty), recharge otherwise.
pub(crate) fn drain_stamina(
    time: Res<Time>,
    tunables: Res<Tunables>,
    mut q: Query<(Entity, &Grabber, &mut Stamina)>,
    mut out: MessageWriter<GrabCommand>,
) {
    let dt = time.delta_secs();
    let t = &tunables.stamina;
    for (e, grabber, mut stamina) in &mut q {
        if !grabber.is_grabbing() {
            stamina.recharge(t.recharge * dt);
            continue;
        }
        if stamina.drain(t.periodic_cost * dt) {
            out.write(GrabCommand::let_go(e));
        }
    }
}

// -----------------------------------------------------------------------------
// Commands
// -----------------------------------------------------------------------------

pub(crate) fn apply_grab(
    mut cmds: MessageReader<GrabCommand>,
    tunables: Res<Tunables>,
    mut q_grabbers: Query<(&mut Grabber, &mut Stamina, &mut Arm)>,
    mut q_targets: Query<(&Grabbable, Option<&LifeState>, Option<&mut Brain>), Without<Grabber>>,
    mut started: MessageWriter<GrabStarted>,
    mut fx: FxWriters,
) {
    for cmd in cmds.read().filter(|c| c.action == GrabAction::Grab) {
        let Ok((mut grabber, mut stamina, mut arm)) = q_grabbers.get_mut(cmd.grabber) else {
            continue;
        };
        if grabber.is_grabbing() || !stamina.try_spend(tunables.stamina.initial_grab_cost) {
            continue;
        }
        grabber.set_grabbing(true);

        let target = grabber
            .grab_target()
            .filter(|t| q_targets.get(*t).is_ok_and(|(g, life, _)| g.is_available() && alive(life)));

        match target {
            Some(t) => {
                if let Ok((_, _, Some(mut brain))) = q_targets.get_mut(t) {
                    brain.pause("Grabbed");
                }
                arm.set_focus(Some(t));
            }
            None => {
                grabber.set_grab_target(None);
                arm.set_hand_profile(HandProfile::Punch);
            }
        }

        fx.sound(SoundCue::Grab, None);
        started.write(GrabStarted { grabber: cmd.grabber, target });
    }
}

#[allow(clippy::type_complexity, clippy::too_many_arguments)]
pub(crate) fn apply_let_go(
    mut cmds: MessageReader<GrabCommand>,
    tunables: Res<Tunables>,
    mut commands: Commands,
    mut cleanup: HoldCleanup,
    mut q_grabbers: Query<(&mut Grabber, &mut Arm)>,
    mut q_targets: Query<
        (
            &mut Grabbable,
            Option<&mut Brain>,
            Option<&mut Highlight>,
            Option<&RigidBody>,
            Option<&mut LinearVelocity>,
        ),
        Without<Grabber>,
    >,
    mut notices: MessageWriter<LetGoNotice>,
    mut prompt: MessageWriter<DevourPrompt>,
) {
    let t = &tunables.throw;

    for cmd in cmds.read().filter(|c| c.action == GrabAction::LetGo) {
        let Ok((mut grabber, mut arm)) = q_grabbers.get_mut(cmd.grabber) else {
            continue;
        };
        if !grabber.is_grabbing() {
            continue;
        }

        let released = grabber.grabbed();
        if let Some(held) = released {
            arm.stop_bulge();
            if let Ok((mut g, brain, _, body, vel)) = q_targets.get_mut(held) {
                if g.let_go() {
                    if let Some(mut brain) = brain {
                        brain.resume("LetGo");
                    }
                    if body.is_some() {
                        commands.entity(held).insert(RigidBody::Dynamic);
                    }
                    if let Some(mut vel) = vel {
                        vel.0 = arm.hand_velocity().clamp_length_max(t.max_throw_speed);
                    }
                    let fuse = cleanup
                        .scheduler
                        .schedule(t.time_to_explode, None, Task::Explode { entity: held });
                    commands.entity(held).insert(Thrown { by: cmd.grabber, fuse });
                }
            }
            cleanup.detach(held);
            grabber.set_grabbed(None);
            prompt.write(DevourPrompt::End { grabber: cmd.grabber });
        } else if let Some(target) = grabber.grab_target() {
            if let Ok((mut g, brain, highlight, _, _)) = q_targets.get_mut(target) {
                if let Some(mut brain) = brain {
                    brain.resume("LetGo");
                }
                g.set_targeted(false);
                if let Some(mut h) = highlight {
                    h.0 = false;
                }
            }
            grabber.set_grab_target(None);
        }

        arm.set_focus(None);
        arm.set_hand_profile(HandProfile::Inactive);
        grabber.set_grabbing(false);
        grabber.set_ready_to_devour(false);
        notices.write(LetGoNotice { grabber: cmd.grabber, released });
    }
}

// -----------------------------------------------------------------------------
// Hold
// -----------------------------------------------------------------------------

/// Home the hand onto the target and commit the grab once it is close enough.
#[allow(clippy::type_complexity)]
pub(crate) fn home_and_commit(
    tunables: Res<Tunables>,
    mut commands: Commands,
    mut cleanup: HoldCleanup,
    mut q_grabbers: Query<(Entity, &mut Grabber, &mut Arm)>,
    mut q_targets: Query<
        (
            &mut Grabbable,
            &Transform,
            Option<&LifeState>,
            Option<&mut Brain>,
            Option<&mut Highlight>,
            Option<&RigidBody>,
            Option<&mut LinearVelocity>,
        ),
        (Without<Grabber>, Without<PendingDespawn>),
    >,
) {
    let g_t = &tunables.grab;

    for (me, mut grabber, mut arm) in &mut q_grabbers {
        if !grabber.is_grabbing() || grabber.grabbed().is_some() {
            continue;
        }
        let Some(target) = arm.focus() else {
            continue;
        };
        let Ok((mut g, tf, life, brain, highlight, body, vel)) = q_targets.get_mut(target) else {
            arm.set_focus(None);
            grabber.set_grab_target(None);
            continue;
        };

        if !g.is_available() || !alive(life) {
            if let Some(mut brain) = brain {
                brain.resume("TargetLost");
            }
            g.set_targeted(false);
            if let Some(mut h) = highlight {
                h.0 = false;
            }
            arm.set_focus(None);
            grabber.set_grab_target(None);
            continue;
        }

        if arm.real_hand().distance(tf.translation.truncate()) > g_t.distance_tolerance {
            continue;
        }

        if !g.grab(me) {
            continue;
        }
        if let Some(mut brain) = brain {
            brain.pause("Grabbed");
        }
        if let Some(mut h) = highlight {
            h.0 = false;
        }
        if body.is_some() {
            commands.entity(target).insert(RigidBody::Kinematic);
        }
        if let Some(mut vel) = vel {
            vel.0 = Vec2::ZERO;
        }

        grabber.set_grabbed(Some(target));
        grabber.set_grab_target(None);
        arm.set_focus(None);
        arm.set_hand_profile(HandProfile::Blocking);
        cleanup.detach(target);
        if g.is_devourable_enemy() {
            arm.start_bulge();
        }

        if g_t.held_damage_mode == HeldDamageMode::Interval {
            cleanup.periodic.start(
                &mut cleanup.scheduler,
                target,
                DamagePurpose::Held,
                g_t.devour_damage,
                g_t.devour_damage_interval,
                DamageKind::Siphon,
                Some(me),
            );
        }
    }
}

/// The held entity rides on the real hand.
pub(crate) fn carry_held(
    q_grabbers: Query<(&Grabber, &Arm)>,
    mut q_held: Query<&mut Transform, (With<Grabbable>, Without<Grabber>)>,
) {
    for (grabber, arm) in &q_grabbers {
        let Some(held) = grabber.grabbed() else {
            continue;
        };
        if let Ok(mut tf) = q_held.get_mut(held) {
            tf.translation.x = arm.real_hand().x;
            tf.translation.y = arm.real_hand().y;
        }
    }
}

/// Per-tick siphon of the held entity while it still has health.
pub(crate) fn siphon_held(
    time: Res<Time>,
    tunables: Res<Tunables>,
    q_grabbers: Query<(Entity, &Grabber)>,
    q_health: Query<&Health>,
    mut out: MessageWriter<DamageRequest>,
) {
    let g_t = &tunables.grab;
    if g_t.held_damage_mode != HeldDamageMode::PerTick {
        return;
    }
    let amount = g_t.devour_damage * time.delta_secs();
    for (me, grabber) in &q_grabbers {
        let Some(held) = grabber.grabbed() else {
            continue;
        };
        if q_health.get(held).is_ok_and(|h| !h.is_depleted()) {
            out.write(DamageRequest::siphon(held, amount, me));
        }
    }
}

// -----------------------------------------------------------------------------
// Contacts
// -----------------------------------------------------------------------------

/// Melee fallback: the punch-profile hand strikes and knocks back enemies it touches.
#[allow(clippy::type_complexity)]
pub(crate) fn punch_contacts(
    mut started: MessageReader<CollisionStart>,
    tunables: Res<Tunables>,
    q_hands: Query<&HandVolume>,
    q_arm: Query<&Arm>,
    mut q_enemies: Query<
        (&Transform, &LifeState, Option<&mut LinearVelocity>),
        (With<Enemy>, Without<PendingDespawn>),
    >,
    mut damage: MessageWriter<DamageRequest>,
    mut fx: FxWriters,
) {
    let g_t = &tunables.grab;
    for ev in started.read() {
        let Some((hand_side, other)) = split_pair(started_sides(ev), |e| q_hands.contains(e)) else {
            continue;
        };
        let Ok(hand) = q_hands.get(hand_side.collider) else {
            continue;
        };
        let Ok(arm) = q_arm.get(hand.owner) else {
            continue;
        };
        if arm.hand_profile() != HandProfile::Punch {
            continue;
        }
        let target = other.gameplay_owner();
        let Ok((tf, life, vel)) = q_enemies.get_mut(target) else {
            continue;
        };
        if !life.is_alive() {
            continue;
        }

        let at = tf.translation.truncate();
        let dir = (at - arm.real_hand()).normalize_or(arm.swing_bias().normalize_or(Vec2::X));
        if let Some(mut vel) = vel {
            vel.0 += dir * g_t.punch_knockback;
        }
        damage.write(DamageRequest::strike(target, g_t.punch_damage, Some(hand.owner)));
        fx.effect(EffectKind::Punch, at);
        fx.sound(SoundCue::Punch, Some(at));
        fx.shake(dir);
    }
}

// -----------------------------------------------------------------------------
// Reactions
// -----------------------------------------------------------------------------

/// Held entity ran dry: arm the devour prompt.
pub(crate) fn prompt_devour(
    mut depleted: MessageReader<HealthDepleted>,
    mut q: Query<(Entity, &mut Grabber)>,
    mut prompt: MessageWriter<DevourPrompt>,
) {
    for ev in depleted.read() {
        for (me, mut grabber) in &mut q {
            if grabber.grabbed() == Some(ev.entity) && !grabber.ready_to_devour() {
                grabber.set_ready_to_devour(true);
                prompt.write(DevourPrompt::Begin { grabber: me, target: ev.entity });
            }
        }
    }
}

/// Clear grabber references to entities that were destroyed, exploded or otherwise
/// stopped being held by this grabber.
pub(crate) fn release_stale_holds(
    mut cleanup: HoldCleanup,
    mut q_grabbers: Query<(Entity, &mut Grabber, &mut Arm)>,
    q_grabbable: Query<&Grabbable, Without<PendingDespawn>>,
    mut prompt: MessageWriter<DevourPrompt>,
) {
    for (me, mut grabber, mut arm) in &mut q_grabbers {
        if let Some(held) = grabber.grabbed() {
            let still_held = q_grabbable.get(held).is_ok_and(|g| g.holder() == Some(me));
            if !still_held {
                arm.stop_bulge();
                arm.set_hand_profile(HandProfile::Inactive);
                cleanup.detach(held);
                grabber.set_grabbed(None);
                grabber.set_grabbing(false);
                if grabber.ready_to_devour() {
                    grabber.set_ready_to_devour(false);
                    prompt.write(DevourPrompt::End { grabber: me });
                }
            }
        }

        if let Some(target) = grabber.grab_target() {
            if !q_grabbable.contains(target) {
                grabber.set_grab_target(None);
                if arm.focus() == Some(target) {
                    arm.set_focus(None);
                }
            }
        }
    }
}
