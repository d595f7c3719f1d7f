//! Grab commands in, notifications out.
//!
//! Commands are intent (input edges, stamina exhaustion); the grab machine is the
//! single consumer. Notifications are for UI / animation / save layers.

use bevy::prelude::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrabAction {
    Grab,
    LetGo,
    Devour,
}

#[derive(Message, Clone, Copy, Debug, PartialEq, Eq)]
pub struct GrabCommand {
    pub grabber: Entity,
    pub action: GrabAction,
}

impl GrabCommand {
    pub fn grab(grabber: Entity) -> Self {
        Self { grabber, action: GrabAction::Grab }
    }

    pub fn let_go(grabber: Entity) -> Self {
        Self { grabber, action: GrabAction::LetGo }
    }

    pub fn devour(grabber: Entity) -> Self {
        Self { grabber, action: GrabAction::Devour }
    }
}

/// Something the machine wants blown up this tick.
#[derive(Message, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExplodeRequest {
    pub entity: Entity,
}

#[derive(Message, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DevourPrompt {
    Begin { grabber: Entity, target: Entity },
    End { grabber: Entity },
}

#[derive(Message, Clone, Copy, Debug, PartialEq, Eq)]
pub struct GrabStarted {
    pub grabber: Entity,
    pub target: Option<Entity>,
}

#[derive(Message, Clone, Copy, Debug, PartialEq, Eq)]
pub struct LetGoNotice {
    pub grabber: Entity,
    pub released: Option<Entity>,
}

#[derive(Message, Clone, Debug, PartialEq, Eq)]
pub struct Devoured {
    pub grabber: Entity,
    pub entity: Entity,
    pub type_key: String,
}

/// First time a type is ever devoured.
#[derive(Message, Clone, Debug, PartialEq, Eq)]
pub struct LoreDiscovered {
    pub type_key: String,
}

#[derive(Message, Clone, Debug, PartialEq, Eq)]
pub struct AbilityGranted {
    pub grabber: Entity,
    pub tag: String,
    pub name: String,
}

#[derive(Message, Clone, Debug, PartialEq, Eq)]
pub struct AbilityExpired {
    pub grabber: Entity,
    pub name: String,
}
