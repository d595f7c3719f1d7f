use avian2d::prelude::*;
use bevy::prelude::*;

use super::*;
use crate::common::test_utils::run_system_once;
use crate::common::tunables::Tunables;
use crate::plugins::grab::explode::{circle_touches_rect, outside_bounds};

#[test]
fn spawns_walls_on_enter() {
    let mut world = World::new();
    run_system_once(&mut world, spawn_arena);

    let walls = world
        .query::<(&Name, &RigidBody, &Detonator)>()
        .iter(&world)
        .filter(|(n, rb, _)| n.as_str().starts_with("Wall") && matches!(**rb, RigidBody::Static))
        .count();
    assert_eq!(walls, 4);
}

#[test]
fn pads_have_no_body() {
    let mut world = World::new();
    run_system_once(&mut world, spawn_pads);

    let pads: Vec<_> = world
        .query::<(&Detonator, Option<&RigidBody>)>()
        .iter(&world)
        .map(|(d, rb)| (d.half_extents, rb.is_some()))
        .collect();
    assert_eq!(pads.len(), PADS.len());
    assert!(pads.iter().all(|(_, has_body)| !has_body));
}

#[test]
fn wall_surface_reaches_the_hand() {
    let mut world = World::new();
    run_system_once(&mut world, spawn_arena);

    let (d, tf) = world
        .query::<(&Detonator, &Transform, &Name)>()
        .iter(&world)
        .find(|(_, _, n)| n.as_str() == "WallRight")
        .map(|(d, tf, _)| (*d, *tf))
        .unwrap();

    let inner_face = HALF_W as f32;
    let center = tf.translation.truncate();
    assert!(circle_touches_rect(Vec2::new(inner_face - 10.0, 0.0), 12.0, center, d.half_extents));
    assert!(!circle_touches_rect(Vec2::new(inner_face - 20.0, 0.0), 12.0, center, d.half_extents));
}

#[test]
fn kill_bounds_enclose_the_arena() {
    let bounds = Tunables::default().world.kill_half_extents;
    let corner = Vec2::new(HALF_W as f32 + WALL_THICKNESS, HALF_H as f32 + WALL_THICKNESS);
    assert!(!outside_bounds(corner, bounds));
}
