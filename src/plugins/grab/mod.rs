//! Grab, devour and throw.
//!
//! ```text
//! FixedUpdate
//!   Input     drain_stamina (may force LetGo)
//!   Commands  apply_grab -> apply_devour -> apply_let_go
//!   Hold      home_and_commit -> carry_held -> siphon_held
//!   Acquire   acquire_targets
//! FixedPostUpdate
//!   Contacts  range tracking, punches, thrown impacts, detonators, kill bounds
//!   Timers    fuse -> detonate
//!   Reactions prompt_devour -> settle_detonations -> release_stale_holds
//! ```

pub mod components;
pub mod devour;
pub mod explode;
pub mod machine;
pub mod messages;
pub mod targeting;

use bevy::prelude::*;

use crate::common::state::CombatSet;
use crate::plugins::timers;

pub use components::{
    AbilityTags, ActiveAbility, Detonator, GrabState, Grabbable, GrabbableKind, Grabber, GrabberInput,
    Highlight, Stamina, Thrown,
};
pub use messages::{
    AbilityExpired, AbilityGranted, DevourPrompt, Devoured, ExplodeRequest, GrabAction, GrabCommand,
    GrabStarted, LetGoNotice, LoreDiscovered,
};
pub use targeting::GrabRange;

pub fn plugin(app: &mut App) {
    app.add_message::<GrabCommand>()
        .add_message::<ExplodeRequest>()
        .add_message::<DevourPrompt>()
        .add_message::<GrabStarted>()
        .add_message::<LetGoNotice>()
        .add_message::<Devoured>()
        .add_message::<LoreDiscovered>()
        .add_message::<AbilityGranted>()
        .add_message::<AbilityExpired>();

    app.add_systems(
        FixedUpdate,
        (
            machine::drain_stamina
                .after(crate::plugins::player::emit_grab_commands)
                .in_set(CombatSet::Input),
            (machine::apply_grab, devour::apply_devour, machine::apply_let_go)
                .chain()
                .in_set(CombatSet::Commands),
            (machine::home_and_commit, machine::carry_held, machine::siphon_held)
                .chain()
                .in_set(CombatSet::Hold),
            targeting::acquire_targets.in_set(CombatSet::Acquire),
        ),
    );

    app.add_systems(
        FixedPostUpdate,
        (
            (
                targeting::track_grab_range,
                machine::punch_contacts,
                explode::thrown_impacts,
                explode::detonate_on_surfaces,
                explode::explode_out_of_bounds,
            )
                .in_set(CombatSet::Contacts),
            (explode::explode_on_timer, explode::detonate)
                .chain()
                .after(timers::tick_scheduler)
                .in_set(CombatSet::Timers),
            (
                machine::prompt_devour,
                explode::settle_detonations,
                machine::release_stale_holds,
            )
                .chain()
                .in_set(CombatSet::Reactions),
        ),
    );
}

#[cfg(test)]
mod tests;
