use bevy::prelude::*;

use crate::plugins::timers::TimerHandle;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrabbableKind {
    Enemy { devourable: bool },
    Object,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrabState {
    Free,
    Targeted,
    Grabbed { by: Entity },
    Devoured,
    Thrown,
    Exploding,
    Destroyed,
}

/// Anything the arm can grab, throw or devour.
#[derive(Component, Debug, Clone)]
pub struct Grabbable {
    kind: GrabbableKind,
    state: GrabState,
    exploded: bool,
    type_key: String,
}

impl Grabbable {
    pub fn new(kind: GrabbableKind, type_key: impl Into<String>) -> Self {
        Self { kind, state: GrabState::Free, exploded: false, type_key: type_key.into() }
    }

    #[inline]
    pub fn kind(&self) -> GrabbableKind {
        self.kind
    }

    #[inline]
    pub fn state(&self) -> GrabState {
        self.state
    }

    #[inline]
    pub fn type_key(&self) -> &str {
        &self.type_key
    }

    #[inline]
    pub fn has_exploded(&self) -> bool {
        self.exploded
    }

    #[inline]
    pub fn is_devourable_enemy(&self) -> bool {
        matches!(self.kind, GrabbableKind::Enemy { devourable: true })
    }

    /// Can be targeted or grabbed right now.
    #[inline]
    pub fn is_available(&self) -> bool {
        matches!(self.state, GrabState::Free | GrabState::Targeted)
    }

    pub fn holder(&self) -> Option<Entity> {
        match self.state {
            GrabState::Grabbed { by } => Some(by),
            _ => None,
        }
    }

    pub(crate) fn set_targeted(&mut self, on: bool) {
        match (on, self.state) {
            (true, GrabState::Free) => self.state = GrabState::Targeted,
            (false, GrabState::Targeted) => self.state = GrabState::Free,
            _ => {}
        }
    }

    /// Refused when someone already holds it or it is mid-throw.
    pub(crate) fn grab(&mut self, by: Entity) -> bool {
        if !self.is_available() {
            return false;
        }
        self.state = GrabState::Grabbed { by };
        true
    }

    /// Release into a throw; re-arms the one-shot explode flag.
    pub(crate) fn let_go(&mut self) -> bool {
        if self.holder().is_none() {
            return false;
        }
        self.state = GrabState::Thrown;
        self.exploded = false;
        true
    }

    pub(crate) fn mark_devoured(&mut self) {
        self.state = GrabState::Devoured;
    }

    /// One-shot: `false` if this throw already exploded.
    pub(crate) fn begin_explode(&mut self) -> bool {
        if self.exploded || matches!(self.state, GrabState::Devoured | GrabState::Destroyed) {
            return false;
        }
        self.exploded = true;
        self.state = GrabState::Exploding;
        true
    }

    pub(crate) fn settle(&mut self, destroyed: bool) {
        self.state = if destroyed { GrabState::Destroyed } else { GrabState::Free };
    }
}

/// Highlight flag driven by target acquisition; presentation reads it.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Highlight(pub bool);

/// Set while an entity flies after being let go.
#[derive(Component, Debug, Clone, Copy)]
pub struct Thrown {
    pub by: Entity,
    pub(crate) fuse: TimerHandle,
}

/// Blast resolved this tick; settled after damage is applied.
#[derive(Component, Debug, Clone, Copy)]
pub(crate) struct Detonated;

/// Axis-aligned surface that sets off whatever the hand is holding.
#[derive(Component, Debug, Clone, Copy)]
pub struct Detonator {
    pub half_extents: Vec2,
}

/// Capability grants an enemy yields when devoured.
#[derive(Component, Debug, Clone, Default)]
pub struct AbilityTags(pub Vec<String>);

/// The grabbing side of the relation. Only the grab machine mutates it.
#[derive(Component, Debug, Clone, Default)]
pub struct Grabber {
    grabbing: bool,
    grab_target: Option<Entity>,
    grabbed: Option<Entity>,
    ready_to_devour: bool,
}

impl Grabber {
    #[inline]
    pub fn is_grabbing(&self) -> bool {
        self.grabbing
    }

    #[inline]
    pub fn grab_target(&self) -> Option<Entity> {
        self.grab_target
    }

    #[inline]
    pub fn grabbed(&self) -> Option<Entity> {
        self.grabbed
    }

    #[inline]
    pub fn ready_to_devour(&self) -> bool {
        self.ready_to_devour
    }

    pub(crate) fn set_grabbing(&mut self, on: bool) {
        self.grabbing = on;
    }

    pub(crate) fn set_grab_target(&mut self, target: Option<Entity>) {
        self.grab_target = target;
    }

    pub(crate) fn set_grabbed(&mut self, grabbed: Option<Entity>) {
        self.grabbed = grabbed;
    }

    pub(crate) fn set_ready_to_devour(&mut self, ready: bool) {
        self.ready_to_devour = ready;
    }
}

#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Stamina {
    current: f32,
    max: f32,
}

impl Stamina {
    pub fn new(max: f32) -> Self {
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

    /// Deducts `cost` only if it is affordable.
    pub fn try_spend(&mut self, cost: f32) -> bool {
        if self.current < cost {
            return false;
        }
        self.current -= cost;
        true
    }

    /// Returns `true` when this drain emptied the bar.
    pub fn drain(&mut self, amount: f32) -> bool {
        self.current = (self.current - amount).max(0.0);
        self.current <= 0.0
    }

    pub fn recharge(&mut self, amount: f32) {
        self.current = (self.current + amount).min(self.max);
    }
}

/// Input latched per grabber. `pushing` is the previous fixed tick's grab button,
/// used to turn a held button into press / release edges.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct GrabberInput {
    pub aim: Vec2,
    pub grab_held: bool,
    /// Grab pressed since the last fixed tick, even if already released.
    pub grab_pressed: bool,
    pub devour_pressed: bool,
    pub(crate) pushing: bool,
}

/// Temporary ability granted by devouring.
#[derive(Component, Debug, Clone)]
pub struct ActiveAbility {
    pub tag: String,
    pub name: String,
    pub remaining: f32,
    pub speed_multiplier: f32,
}
