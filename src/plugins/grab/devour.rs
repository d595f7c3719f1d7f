//! Devour: consume the held entity once its health has run out.

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use rand::seq::SliceRandom;

use super::components::{AbilityTags, ActiveAbility, Grabbable, GrabbableKind, Grabber};
use super::machine::HoldCleanup;
use super::messages::{
    AbilityExpired, AbilityGranted, DevourPrompt, Devoured, GrabAction, GrabCommand, LoreDiscovered,
};
use crate::common::stats::AbilityTable;
use crate::common::tunables::Tunables;
use crate::plugins::arm::{Arm, HandProfile};
use crate::plugins::core::GameRng;
use crate::plugins::fx::{EffectKind, FxWriters, SoundCue};
use crate::plugins::health::{DamageRequest, PendingDespawn};
use crate::plugins::persistence::{PersistSave, SaveRecord};

#[derive(SystemParam)]
pub(crate) struct DevourNotices<'w> {
    prompt: MessageWriter<'w, DevourPrompt>,
    devoured: MessageWriter<'w, Devoured>,
    lore: MessageWriter<'w, LoreDiscovered>,
    granted: MessageWriter<'w, AbilityGranted>,
    expired: MessageWriter<'w, AbilityExpired>,
    persist: MessageWriter<'w, PersistSave>,
}

#[allow(clippy::type_complexity, clippy::too_many_arguments)]
pub(crate) fn apply_devour(
    mut cmds: MessageReader<GrabCommand>,
    tunables: Res<Tunables>,
    abilities: Res<AbilityTable>,
    mut rng: ResMut<GameRng>,
    mut save: ResMut<SaveRecord>,
    mut cleanup: HoldCleanup,
    mut commands: Commands,
    mut q_grabbers: Query<(&mut Grabber, &mut Arm, Option<&mut ActiveAbility>)>,
    mut q_held: Query<(&mut Grabbable, &Transform, Option<&AbilityTags>), Without<Grabber>>,
    mut damage: MessageWriter<DamageRequest>,
    mut notices: DevourNotices,
    mut fx: FxWriters,
) {
    for cmd in cmds.read().filter(|c| c.action == GrabAction::Devour) {
        let Ok((mut grabber, mut arm, ability)) = q_grabbers.get_mut(cmd.grabber) else {
            continue;
        };
        let ready = grabber.ready_to_devour();
        grabber.set_ready_to_devour(false);

        let held = grabber.grabbed().filter(|_| ready);
        if let Some((held, Ok((mut g, tf, tags)))) = held.map(|h| (h, q_held.get_mut(h))) {
            let at = tf.translation.truncate();
            let key = g.type_key().to_owned();

            match g.kind() {
                GrabbableKind::Object => {
                    commands.entity(held).insert(PendingDespawn);
                }
                GrabbableKind::Enemy { .. } => {
                    if let Some(tag) = tags.and_then(|t| t.0.choose(&mut rng.0)) {
                        match abilities.get(tag) {
                            None => warn!(tag = %tag, "devoured enemy carries an unknown ability tag"),
                            Some(spec) => {
                                let next = ActiveAbility {
                                    tag: tag.clone(),
                                    name: spec.name.clone(),
                                    remaining: spec.duration,
                                    speed_multiplier: spec.speed_multiplier,
                                };
                                match ability {
                                    Some(mut current) => {
                                        notices.expired.write(AbilityExpired {
                                            grabber: cmd.grabber,
                                            name: current.name.clone(),
                                        });
                                        *current = next;
                                    }
                                    None => {
                                        commands.entity(cmd.grabber).insert(next);
                                    }
                                }
                                notices.granted.write(AbilityGranted {
                                    grabber: cmd.grabber,
                                    tag: tag.clone(),
                                    name: spec.name.clone(),
                                });
                            }
                        }
                    }
                    damage.write(DamageRequest::strike(
                        held,
                        tunables.grab.devour_final_damage,
                        Some(cmd.grabber),
                    ));
                }
            }
            g.mark_devoured();

            arm.stop_bulge();
            arm.set_hand_profile(HandProfile::Inactive);
            cleanup.detach(held);
            grabber.set_grabbed(None);
            grabber.set_grabbing(false);

            if save.increment(&key) == 1 {
                notices.lore.write(LoreDiscovered { type_key: key.clone() });
            }
            notices.persist.write(PersistSave);
            notices.devoured.write(Devoured { grabber: cmd.grabber, entity: held, type_key: key });
            fx.effect(EffectKind::Devour, at);
            fx.sound(SoundCue::Devour, None);
        }

        notices.prompt.write(DevourPrompt::End { grabber: cmd.grabber });
    }
}
