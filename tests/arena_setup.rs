mod common;

use bevy::prelude::*;
use slime_arm::plugins::arm::{Arm, ArmSegment, HandVolume};
use slime_arm::plugins::enemies::{Brain, BrainMode, Enemy};
use slime_arm::plugins::grab::{GrabState, Grabbable, Grabber, Stamina};
use slime_arm::plugins::health::Health;
use slime_arm::plugins::player::Player;

#[test]
fn player_spawns_with_a_full_arm() {
    let mut app = common::app_in_game();
    let world = app.world_mut();

    let (arm, stamina, health, grabber) = world
        .query_filtered::<(&Arm, &Stamina, &Health, &Grabber), With<Player>>()
        .single(world)
        .unwrap();
    assert_eq!(arm.control_points().len(), 25);
    assert_eq!(arm.segment_count(), 24);
    assert_eq!(stamina.current(), stamina.max());
    assert_eq!(health.current(), health.max());
    assert!(!grabber.is_grabbing());

    let segments = world.query::<&ArmSegment>().iter(world).count();
    assert_eq!(segments, 24);
    let hands = world.query::<&HandVolume>().iter(world).count();
    assert_eq!(hands, 1);
}

#[test]
fn roster_spawns_enemies_and_objects() {
    let mut app = common::app_in_game();
    let world = app.world_mut();

    let enemies: Vec<_> = world.query_filtered::<&Brain, With<Enemy>>().iter(world).map(Brain::mode).collect();
    assert_eq!(enemies.len(), 4);
    assert!(enemies.iter().all(|m| *m == BrainMode::Running));

    let grabbables: Vec<_> = world.query::<&Grabbable>().iter(world).map(|g| g.state()).collect();
    // Ironshell is too heavy to grab.
    assert_eq!(grabbables.len(), 5);
    assert!(grabbables.iter().all(|s| *s == GrabState::Free));
}
