//! Collision message helpers shared by every contact consumer.

use avian2d::prelude::*;
use bevy::prelude::*;

/// One side of a collision pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CollisionTarget {
    pub collider: Entity,
    pub body: Option<Entity>,
}

impl CollisionTarget {
    /// The entity gameplay cares about: the body when the collider is attached to one.
    #[inline]
    pub fn gameplay_owner(self) -> Entity {
        self.body.unwrap_or(self.collider)
    }
}

#[inline]
pub fn started_sides(ev: &CollisionStart) -> (CollisionTarget, CollisionTarget) {
    (
        CollisionTarget { collider: ev.collider1, body: ev.body1 },
        CollisionTarget { collider: ev.collider2, body: ev.body2 },
    )
}

#[inline]
pub fn ended_sides(ev: &CollisionEnd) -> (CollisionTarget, CollisionTarget) {
    (
        CollisionTarget { collider: ev.collider1, body: ev.body1 },
        CollisionTarget { collider: ev.collider2, body: ev.body2 },
    )
}

/// Orders a pair as `(matching, other)` when exactly one collider satisfies `is_ours`.
#[inline]
pub fn split_pair(
    (a, b): (CollisionTarget, CollisionTarget),
    is_ours: impl Fn(Entity) -> bool,
) -> Option<(CollisionTarget, CollisionTarget)> {
    match (is_ours(a.collider), is_ours(b.collider)) {
        (true, false) => Some((a, b)),
        (false, true) => Some((b, a)),
        _ => None,
    }
}
