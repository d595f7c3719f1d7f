use avian2d::prelude::*;
use bevy::prelude::*;

use super::components::*;
use super::devour::apply_devour;
use super::explode::{
    circle_touches_rect, detonate, detonate_on_surfaces, explode_on_timer, explode_out_of_bounds, falloff,
    outside_bounds, settle_detonations, thrown_impacts,
};
use super::machine::{
    apply_grab, apply_let_go, drain_stamina, home_and_commit, prompt_devour, punch_contacts,
    release_stale_holds, siphon_held,
};
use super::messages::*;
use super::targeting::{acquire_targets, select_best, track_grab_range, yaw_difference, GrabRange};
use crate::common::stats::{AbilitySpec, AbilityTable};
use crate::common::test_utils::{drain_messages, ensure_messages, run_system_once, time_with_delta};
use crate::common::tunables::{HeldDamageMode, Tunables};
use crate::plugins::arm::overlap::OverlapRecord;
use crate::plugins::arm::{Arm, GrabRangeVolume, HandProfile, HandVolume};
use crate::plugins::core::GameRng;
use crate::plugins::enemies::{Brain, BrainMode, Enemy};
use crate::plugins::fx::{PlaySound, ShakeCamera, SpawnEffect};
use crate::plugins::health::{
    apply_damage_requests, Absorber, DamageRequest, Died, Health, HealthChanged, HealthDepleted, LifeState,
    PendingDespawn,
};
use crate::plugins::periodic::{dispatch_periodic_damage, DamagePurpose, PeriodicDamage};
use crate::plugins::persistence::{PersistSave, SaveRecord};
use crate::plugins::timers::{tick_scheduler, Scheduler, Task, TimerFired};

const HASTE: &str = "PlayerAbility.Haste";

fn combat_world() -> World {
    let mut world = World::new();
    world.insert_resource(Tunables::default());
    world.insert_resource(time_with_delta(1.0 / 64.0));
    world.insert_resource(Scheduler::default());
    world.insert_resource(PeriodicDamage::default());
    world.insert_resource(OverlapRecord::default());
    world.insert_resource(GameRng::seeded(7));
    world.insert_resource(SaveRecord::default());

    let mut abilities = AbilityTable::default();
    abilities.insert(HASTE, AbilitySpec { name: "Haste".into(), duration: 8.0, speed_multiplier: 1.5 });
    world.insert_resource(abilities);

    ensure_messages::<GrabCommand>(&mut world);
    ensure_messages::<GrabStarted>(&mut world);
    ensure_messages::<LetGoNotice>(&mut world);
    ensure_messages::<DevourPrompt>(&mut world);
    ensure_messages::<Devoured>(&mut world);
    ensure_messages::<LoreDiscovered>(&mut world);
    ensure_messages::<AbilityGranted>(&mut world);
    ensure_messages::<AbilityExpired>(&mut world);
    ensure_messages::<ExplodeRequest>(&mut world);
    ensure_messages::<PersistSave>(&mut world);
    ensure_messages::<DamageRequest>(&mut world);
    ensure_messages::<HealthChanged>(&mut world);
    ensure_messages::<HealthDepleted>(&mut world);
    ensure_messages::<Died>(&mut world);
    ensure_messages::<SpawnEffect>(&mut world);
    ensure_messages::<PlaySound>(&mut world);
    ensure_messages::<ShakeCamera>(&mut world);
    ensure_messages::<TimerFired>(&mut world);
    ensure_messages::<CollisionStart>(&mut world);
    world
}

fn spawn_player(world: &mut World) -> Entity {
    let arm = Arm::new(&world.resource::<Tunables>().arm, Vec2::ZERO);
    world
        .spawn((
            Grabber::default(),
            Stamina::new(100.0),
            GrabRange::default(),
            arm,
            Transform::default(),
            Health::new(35.0),
            LifeState::Alive,
        ))
        .id()
}

fn spawn_enemy(world: &mut World, at: Vec2, health: f32, tags: &[&str]) -> Entity {
    world
        .spawn((
            Grabbable::new(GrabbableKind::Enemy { devourable: true }, "Slimeling"),
            Transform::from_translation(at.extend(0.0)),
            Health::new(health),
            LifeState::Alive,
            Brain::default(),
            Highlight::default(),
            RigidBody::Dynamic,
            LinearVelocity::default(),
            AbilityTags(tags.iter().map(|t| t.to_string()).collect()),
        ))
        .id()
}

fn spawn_crate(world: &mut World, at: Vec2) -> Entity {
    world
        .spawn((
            Grabbable::new(GrabbableKind::Object, "Crate"),
            Transform::from_translation(at.extend(0.0)),
            Health::new(1.0),
            LifeState::Alive,
            Highlight::default(),
            RigidBody::Dynamic,
            LinearVelocity::default(),
        ))
        .id()
}

fn hand_of(world: &World, player: Entity) -> Vec2 {
    world.get::<Arm>(player).unwrap().real_hand()
}

/// Target `enemy`, press grab and let the hand commit (the enemy sits on the hand).
fn grab_and_commit(world: &mut World, player: Entity, target: Entity) {
    world.get_mut::<Grabber>(player).unwrap().set_grab_target(Some(target));
    world.get_mut::<Grabbable>(target).unwrap().set_targeted(true);
    world.write_message(GrabCommand::grab(player));
    run_system_once(world, apply_grab);
    run_system_once(world, home_and_commit);
    drain_messages::<GrabCommand>(world);
}

fn grabbable_state(world: &World, e: Entity) -> GrabState {
    world.get::<Grabbable>(e).unwrap().state()
}

// -----------------------------------------------------------------------------
// Targeting
// -----------------------------------------------------------------------------

#[test]
fn select_prefers_smaller_yaw_difference_in_either_order() {
    let mut world = World::new();
    let a = world.spawn_empty().id();
    let b = world.spawn_empty().id();
    let near = Vec2::from_angle(10f32.to_radians()) * 50.0;
    let far = Vec2::from_angle(25f32.to_radians()) * 50.0;

    assert_eq!(select_best(Vec2::ZERO, Vec2::X, [(a, near), (b, far)], 40.0), Some(a));
    assert_eq!(select_best(Vec2::ZERO, Vec2::X, [(b, far), (a, near)], 40.0), Some(a));
}

#[test]
fn select_ties_go_to_the_earlier_candidate_and_tolerance_is_strict() {
    let mut world = World::new();
    let a = world.spawn_empty().id();
    let b = world.spawn_empty().id();
    let up = Vec2::from_angle(20f32.to_radians()) * 50.0;
    let down = Vec2::from_angle(-20f32.to_radians()) * 50.0;

    assert_eq!(select_best(Vec2::ZERO, Vec2::X, [(a, up), (b, down)], 40.0), Some(a));
    assert_eq!(select_best(Vec2::ZERO, Vec2::X, [(b, down), (a, up)], 40.0), Some(b));
    assert_eq!(select_best(Vec2::ZERO, Vec2::X, [(a, up)], 20.0), None);
}

#[test]
fn yaw_difference_wraps_across_the_back() {
    assert!((yaw_difference(179.0, -179.0) - 2.0).abs() < 1e-4);
    assert!((yaw_difference(-90.0, 90.0) - 180.0).abs() < 1e-4);
    assert!((yaw_difference(30.0, 10.0) - 20.0).abs() < 1e-4);
}

#[test]
fn acquisition_prefers_enemies_over_objects_and_skips_ineligible() {
    let mut world = combat_world();
    let player = spawn_player(&mut world);
    let aim = {
        let arm = world.get::<Arm>(player).unwrap();
        (arm.hand_target() - arm.shoulder()).normalize()
    };

    let object = spawn_crate(&mut world, aim * 80.0);
    let enemy = spawn_enemy(&mut world, Vec2::from_angle(30f32.to_radians()).rotate(aim) * 80.0, 3.0, &[]);
    let dying = spawn_enemy(&mut world, aim * 60.0, 3.0, &[]);
    *world.get_mut::<LifeState>(dying).unwrap() = LifeState::Dead;

    {
        let mut range = world.get_mut::<GrabRange>(player).unwrap();
        range.insert(dying, GrabbableKind::Enemy { devourable: true });
        range.insert(enemy, GrabbableKind::Enemy { devourable: true });
        range.insert(object, GrabbableKind::Object);
    }

    run_system_once(&mut world, acquire_targets);

    assert_eq!(world.get::<Grabber>(player).unwrap().grab_target(), Some(enemy));
    assert_eq!(grabbable_state(&world, enemy), GrabState::Targeted);
    assert!(world.get::<Highlight>(enemy).unwrap().0);
    assert!(!world.get::<Highlight>(object).unwrap().0);

    // Enemy leaves range: the object takes over and the old highlight goes off.
    world.get_mut::<GrabRange>(player).unwrap().remove(enemy);
    run_system_once(&mut world, acquire_targets);

    assert_eq!(world.get::<Grabber>(player).unwrap().grab_target(), Some(object));
    assert_eq!(grabbable_state(&world, enemy), GrabState::Free);
    assert!(!world.get::<Highlight>(enemy).unwrap().0);
    assert!(world.get::<Highlight>(object).unwrap().0);
}

#[test]
fn acquisition_is_frozen_while_grabbing() {
    let mut world = combat_world();
    let player = spawn_player(&mut world);
    let aim = world.get::<Arm>(player).unwrap().hand_target();
    let enemy = spawn_enemy(&mut world, aim, 3.0, &[]);
    world
        .get_mut::<GrabRange>(player)
        .unwrap()
        .insert(enemy, GrabbableKind::Enemy { devourable: true });
    world.get_mut::<Grabber>(player).unwrap().set_grabbing(true);

    run_system_once(&mut world, acquire_targets);
    assert_eq!(world.get::<Grabber>(player).unwrap().grab_target(), None);
}

// -----------------------------------------------------------------------------
// Stamina and commands
// -----------------------------------------------------------------------------

#[test]
fn grab_costs_stamina_then_drains_per_second() {
    let mut world = combat_world();
    world.insert_resource(time_with_delta(1.0));
    let player = spawn_player(&mut world);

    world.write_message(GrabCommand::grab(player));
    run_system_once(&mut world, apply_grab);
    assert_eq!(world.get::<Stamina>(player).unwrap().current(), 80.0);

    run_system_once(&mut world, drain_stamina);
    run_system_once(&mut world, drain_stamina);
    assert_eq!(world.get::<Stamina>(player).unwrap().current(), 70.0);
    assert!(drain_messages::<GrabCommand>(&mut world).iter().all(|c| c.action == GrabAction::Grab));
}

#[test]
fn empty_stamina_forces_let_go_and_recharges_when_idle() {
    let mut world = combat_world();
    world.insert_resource(time_with_delta(1.0));
    let player = spawn_player(&mut world);
    world.get_mut::<Grabber>(player).unwrap().set_grabbing(true);
    world.get_mut::<Stamina>(player).unwrap().drain(97.0);

    run_system_once(&mut world, drain_stamina);
    let cmds = drain_messages::<GrabCommand>(&mut world);
    assert_eq!(cmds, vec![GrabCommand::let_go(player)]);

    world.get_mut::<Grabber>(player).unwrap().set_grabbing(false);
    run_system_once(&mut world, drain_stamina);
    assert_eq!(world.get::<Stamina>(player).unwrap().current(), 8.0);
}

#[test]
fn grab_without_enough_stamina_is_a_no_op() {
    let mut world = combat_world();
    let player = spawn_player(&mut world);
    world.get_mut::<Stamina>(player).unwrap().drain(85.0);

    world.write_message(GrabCommand::grab(player));
    run_system_once(&mut world, apply_grab);

    assert!(!world.get::<Grabber>(player).unwrap().is_grabbing());
    assert_eq!(world.get::<Stamina>(player).unwrap().current(), 15.0);
    assert!(drain_messages::<GrabStarted>(&mut world).is_empty());
}

#[test]
fn grab_without_target_punches() {
    let mut world = combat_world();
    let player = spawn_player(&mut world);

    world.write_message(GrabCommand::grab(player));
    run_system_once(&mut world, apply_grab);

    assert!(world.get::<Grabber>(player).unwrap().is_grabbing());
    assert_eq!(world.get::<Arm>(player).unwrap().hand_profile(), HandProfile::Punch);
    assert_eq!(
        drain_messages::<GrabStarted>(&mut world),
        vec![GrabStarted { grabber: player, target: None }]
    );

    world.write_message(GrabCommand::let_go(player));
    run_system_once(&mut world, apply_let_go);
    assert_eq!(world.get::<Arm>(player).unwrap().hand_profile(), HandProfile::Inactive);
    assert!(!world.get::<Grabber>(player).unwrap().is_grabbing());
}

#[test]
fn let_go_before_commit_frees_the_target() {
    let mut world = combat_world();
    let player = spawn_player(&mut world);
    let far = hand_of(&world, player) + Vec2::new(100.0, 0.0);
    let enemy = spawn_enemy(&mut world, far, 3.0, &[]);

    grab_and_commit(&mut world, player, enemy);
    assert_eq!(world.get::<Arm>(player).unwrap().focus(), Some(enemy));
    assert_eq!(world.get::<Brain>(enemy).unwrap().mode(), BrainMode::Paused);
    assert_eq!(grabbable_state(&world, enemy), GrabState::Targeted);

    world.write_message(GrabCommand::let_go(player));
    run_system_once(&mut world, apply_let_go);

    let grabber = world.get::<Grabber>(player).unwrap();
    assert!(!grabber.is_grabbing());
    assert_eq!(grabber.grab_target(), None);
    assert_eq!(world.get::<Arm>(player).unwrap().focus(), None);
    assert_eq!(grabbable_state(&world, enemy), GrabState::Free);
    assert_eq!(world.get::<Brain>(enemy).unwrap().mode(), BrainMode::Running);
    assert!(world.get::<Thrown>(enemy).is_none());
}

#[test]
fn commit_throw_and_regrab_leave_no_stale_contact_state() {
    let mut world = combat_world();
    let player = spawn_player(&mut world);
    let hand = hand_of(&world, player);
    let enemy = spawn_enemy(&mut world, hand, 3.0, &[]);

    // The enemy was brushing the arm before being grabbed.
    world.resource_mut::<OverlapRecord>().record_enter(enemy);
    world.resource_scope(|world, mut periodic: Mut<PeriodicDamage>| {
        let mut scheduler = world.resource_mut::<Scheduler>();
        periodic.start(
            &mut scheduler,
            enemy,
            DamagePurpose::ArmStay,
            0.2,
            0.5,
            crate::plugins::health::DamageKind::Strike,
            Some(player),
        );
    });

    grab_and_commit(&mut world, player, enemy);

    assert_eq!(grabbable_state(&world, enemy), GrabState::Grabbed { by: player });
    assert_eq!(world.get::<Grabber>(player).unwrap().grabbed(), Some(enemy));
    assert_eq!(*world.get::<RigidBody>(enemy).unwrap(), RigidBody::Kinematic);
    let arm = world.get::<Arm>(player).unwrap();
    assert_eq!(arm.hand_profile(), HandProfile::Blocking);
    assert!(arm.is_bulging());
    assert!(!world.resource::<OverlapRecord>().contains(enemy));
    assert!(!world.resource::<PeriodicDamage>().is_active(enemy, DamagePurpose::ArmStay));

    world.write_message(GrabCommand::let_go(player));
    run_system_once(&mut world, apply_let_go);

    assert_eq!(grabbable_state(&world, enemy), GrabState::Thrown);
    assert_eq!(*world.get::<RigidBody>(enemy).unwrap(), RigidBody::Dynamic);
    let fuse = world.get::<Thrown>(enemy).unwrap().fuse;
    assert!(world.resource::<Scheduler>().is_active(fuse));
    let grabber = world.get::<Grabber>(player).unwrap();
    assert_eq!(grabber.grabbed(), None);
    assert!(!grabber.is_grabbing());
    assert!(!world.get::<Arm>(player).unwrap().is_bulging());
    assert_eq!(
        drain_messages::<LetGoNotice>(&mut world),
        vec![LetGoNotice { grabber: player, released: Some(enemy) }]
    );

    // A thrown enemy cannot be re-grabbed; the next grab is a punch.
    world.get_mut::<Grabber>(player).unwrap().set_grab_target(Some(enemy));
    world.write_message(GrabCommand::grab(player));
    run_system_once(&mut world, apply_grab);
    assert_eq!(world.get::<Arm>(player).unwrap().hand_profile(), HandProfile::Punch);
    assert!(world.resource::<OverlapRecord>().is_empty());
}

// -----------------------------------------------------------------------------
// Held damage and punches
// -----------------------------------------------------------------------------

#[test]
fn per_tick_siphon_drains_the_held_entity_and_heals_the_grabber() {
    let mut world = combat_world();
    let player = spawn_player(&mut world);
    world.entity_mut(player).insert(Absorber { steal_percent: 50.0 });
    world.get_mut::<Health>(player).unwrap().modify(-10.0);
    let hand = hand_of(&world, player);
    let enemy = spawn_enemy(&mut world, hand, 3.0, &[]);
    grab_and_commit(&mut world, player, enemy);

    let ticks = 8;
    for _ in 0..ticks {
        run_system_once(&mut world, siphon_held);
        run_system_once(&mut world, apply_damage_requests);
    }

    let lost = ticks as f32 * world.resource::<Tunables>().grab.devour_damage / 64.0;
    assert!((world.get::<Health>(enemy).unwrap().current() - (3.0 - lost)).abs() < 1e-4);
    assert!((world.get::<Health>(player).unwrap().current() - (25.0 + lost * 0.5)).abs() < 1e-4);
    assert!(world.get::<LifeState>(enemy).unwrap().is_alive());
}

fn tick_held_timers(world: &mut World) -> Vec<DamageRequest> {
    run_system_once(world, tick_scheduler);
    run_system_once(world, dispatch_periodic_damage);
    drain_messages::<DamageRequest>(world)
}

#[test]
fn interval_siphon_lands_lump_sums_and_stops_on_let_go() {
    let mut world = combat_world();
    world.insert_resource(time_with_delta(0.25));
    {
        let mut tunables = world.resource_mut::<Tunables>();
        tunables.grab.held_damage_mode = HeldDamageMode::Interval;
        tunables.grab.devour_damage = 2.0;
        tunables.grab.devour_damage_interval = 0.5;
    }
    let player = spawn_player(&mut world);
    let hand = hand_of(&world, player);
    let enemy = spawn_enemy(&mut world, hand, 9.0, &[]);
    grab_and_commit(&mut world, player, enemy);
    assert!(world.resource::<PeriodicDamage>().is_active(enemy, DamagePurpose::Held));

    let lump = DamageRequest::siphon(enemy, 2.0, player);
    assert_eq!(tick_held_timers(&mut world), vec![lump]);
    assert!(tick_held_timers(&mut world).is_empty());
    assert_eq!(tick_held_timers(&mut world), vec![lump]);

    world.write_message(GrabCommand::let_go(player));
    run_system_once(&mut world, apply_let_go);
    assert!(!world.resource::<PeriodicDamage>().is_active(enemy, DamagePurpose::Held));
    for _ in 0..4 {
        assert!(tick_held_timers(&mut world).is_empty());
    }
}

#[test]
fn only_the_punch_profile_strikes_and_knocks_back() {
    let mut world = combat_world();
    let player = spawn_player(&mut world);
    let hand_volume = world.spawn(HandVolume { owner: player }).id();
    let hand = hand_of(&world, player);
    let enemy = spawn_enemy(&mut world, hand + Vec2::new(20.0, 0.0), 3.0, &[]);
    world.entity_mut(enemy).insert(Enemy);
    let touch = || CollisionStart { collider1: enemy, collider2: hand_volume, body1: Some(enemy), body2: None };

    world.get_mut::<Arm>(player).unwrap().set_hand_profile(HandProfile::Inactive);
    world.write_message(touch());
    run_system_once(&mut world, punch_contacts);
    assert!(drain_messages::<DamageRequest>(&mut world).is_empty());
    assert_eq!(world.get::<LinearVelocity>(enemy).unwrap().0, Vec2::ZERO);
    drain_messages::<CollisionStart>(&mut world);

    world.get_mut::<Arm>(player).unwrap().set_hand_profile(HandProfile::Punch);
    world.write_message(touch());
    run_system_once(&mut world, punch_contacts);
    let g_t = world.resource::<Tunables>().grab.clone();
    assert_eq!(
        drain_messages::<DamageRequest>(&mut world),
        vec![DamageRequest::strike(enemy, g_t.punch_damage, Some(player))]
    );
    let vel = world.get::<LinearVelocity>(enemy).unwrap().0;
    assert!((vel.length() - g_t.punch_knockback).abs() < 1e-3);
    assert!(vel.x > 0.0);
}

#[test]
fn grab_range_fills_and_depletes_in_entry_order() {
    let mut world = combat_world();
    ensure_messages::<CollisionEnd>(&mut world);
    let player = spawn_player(&mut world);
    let volume = world.spawn(GrabRangeVolume { owner: player }).id();
    let a = spawn_enemy(&mut world, Vec2::new(60.0, 0.0), 3.0, &[]);
    let b = spawn_enemy(&mut world, Vec2::new(0.0, 60.0), 3.0, &[]);
    let c = spawn_crate(&mut world, Vec2::new(-60.0, 0.0));
    let scenery = world.spawn(Transform::default()).id();

    for other in [b, c, a, scenery] {
        world.write_message(CollisionStart { collider1: volume, collider2: other, body1: None, body2: Some(other) });
    }
    run_system_once(&mut world, track_grab_range);
    {
        let range = world.get::<GrabRange>(player).unwrap();
        assert_eq!(range.enemies(), &[b, a]);
        assert_eq!(range.objects(), &[c]);
    }
    drain_messages::<CollisionStart>(&mut world);

    world.write_message(CollisionEnd { collider1: b, collider2: volume, body1: Some(b), body2: None });
    world.write_message(CollisionEnd { collider1: volume, collider2: c, body1: None, body2: Some(c) });
    run_system_once(&mut world, track_grab_range);
    let range = world.get::<GrabRange>(player).unwrap();
    assert_eq!(range.enemies(), &[a]);
    assert!(range.objects().is_empty());
}

// -----------------------------------------------------------------------------
// Explosions
// -----------------------------------------------------------------------------

fn thrown_enemy(world: &mut World, player: Entity, health: f32) -> Entity {
    let hand = hand_of(world, player);
    let enemy = spawn_enemy(world, hand, health, &[]);
    grab_and_commit(world, player, enemy);
    world.write_message(GrabCommand::let_go(player));
    run_system_once(world, apply_let_go);
    drain_messages::<GrabCommand>(world);
    enemy
}

#[test]
fn explosion_is_one_shot_and_spares_the_thrower() {
    let mut world = combat_world();
    let player = spawn_player(&mut world);
    let thrown = thrown_enemy(&mut world, player, 3.0);
    let at = world.get::<Transform>(thrown).unwrap().translation.truncate();
    let bystander = spawn_enemy(&mut world, at + Vec2::new(30.0, 0.0), 3.0, &[]);
    let distant = spawn_enemy(&mut world, at + Vec2::new(1000.0, 0.0), 3.0, &[]);
    drain_messages::<DamageRequest>(&mut world);

    world.write_message(ExplodeRequest { entity: thrown });
    world.write_message(ExplodeRequest { entity: thrown });
    run_system_once(&mut world, detonate);

    let hits: Vec<Entity> = drain_messages::<DamageRequest>(&mut world).iter().map(|r| r.target).collect();
    assert!(hits.contains(&bystander));
    assert!(hits.contains(&thrown));
    assert!(!hits.contains(&player));
    assert!(!hits.contains(&distant));
    assert_eq!(hits.iter().filter(|e| **e == bystander).count(), 1);

    assert_eq!(grabbable_state(&world, thrown), GrabState::Exploding);
    assert!(world.get::<Thrown>(thrown).is_none());
    assert!(world.resource::<Scheduler>().is_empty());
    assert!(world.get::<LinearVelocity>(bystander).unwrap().0.x > 0.0);

    // A later request for the same throw does nothing.
    world.write_message(ExplodeRequest { entity: thrown });
    run_system_once(&mut world, detonate);
    assert!(drain_messages::<DamageRequest>(&mut world).is_empty());
}

#[test]
fn survivors_return_to_free_and_the_dead_are_destroyed() {
    let mut world = combat_world();
    let player = spawn_player(&mut world);
    let tough = thrown_enemy(&mut world, player, 3.0);
    let frail = thrown_enemy(&mut world, player, 1.0);
    drain_messages::<DamageRequest>(&mut world);

    world.write_message(ExplodeRequest { entity: tough });
    world.write_message(ExplodeRequest { entity: frail });
    run_system_once(&mut world, detonate);
    run_system_once(&mut world, apply_damage_requests);
    run_system_once(&mut world, settle_detonations);

    assert_eq!(grabbable_state(&world, tough), GrabState::Free);
    assert_eq!(world.get::<Brain>(tough).unwrap().mode(), BrainMode::Running);
    assert!(world.get::<PendingDespawn>(tough).is_none());

    assert_eq!(grabbable_state(&world, frail), GrabState::Destroyed);
    assert!(matches!(world.get::<LifeState>(frail), Some(LifeState::Dying { .. })));
    assert!(world.get::<PendingDespawn>(frail).is_none());
    assert_eq!(drain_messages::<Died>(&mut world), vec![Died { entity: frail }]);
}

#[test]
fn drained_entity_spared_by_its_own_blast_still_dies_once() {
    let mut world = combat_world();
    world.resource_mut::<Tunables>().throw.explosion_damages_self = false;
    let player = spawn_player(&mut world);
    let thrown = thrown_enemy(&mut world, player, 3.0);
    drain_messages::<DamageRequest>(&mut world);

    world.write_message(DamageRequest::siphon(thrown, 3.0, player));
    run_system_once(&mut world, apply_damage_requests);
    assert!(world.get::<Health>(thrown).unwrap().is_depleted());
    assert!(world.get::<LifeState>(thrown).unwrap().is_alive());

    world.write_message(ExplodeRequest { entity: thrown });
    run_system_once(&mut world, detonate);
    assert!(drain_messages::<DamageRequest>(&mut world).iter().all(|r| r.target != thrown));
    run_system_once(&mut world, apply_damage_requests);
    run_system_once(&mut world, settle_detonations);
    run_system_once(&mut world, settle_detonations);

    assert_eq!(grabbable_state(&world, thrown), GrabState::Destroyed);
    assert!(matches!(world.get::<LifeState>(thrown), Some(LifeState::Dying { .. })));
    assert!(world.get::<PendingDespawn>(thrown).is_none());
    assert_eq!(drain_messages::<Died>(&mut world), vec![Died { entity: thrown }]);
}

#[test]
fn grabbables_past_the_kill_bounds_explode_once() {
    let mut world = combat_world();
    let bounds = world.resource::<Tunables>().world.kill_half_extents;
    let lost = spawn_enemy(&mut world, Vec2::new(bounds.x + 200.0, 0.0), 3.0, &[]);
    spawn_crate(&mut world, Vec2::ZERO);

    run_system_once(&mut world, explode_out_of_bounds);
    assert_eq!(drain_messages::<ExplodeRequest>(&mut world), vec![ExplodeRequest { entity: lost }]);

    world.write_message(ExplodeRequest { entity: lost });
    run_system_once(&mut world, detonate);
    run_system_once(&mut world, apply_damage_requests);
    run_system_once(&mut world, settle_detonations);
    assert_eq!(grabbable_state(&world, lost), GrabState::Free);

    run_system_once(&mut world, explode_out_of_bounds);
    run_system_once(&mut world, explode_out_of_bounds);
    assert!(drain_messages::<ExplodeRequest>(&mut world).is_empty());
}

#[test]
fn fuse_only_fires_for_the_current_throw() {
    let mut world = combat_world();
    let player = spawn_player(&mut world);
    let thrown = thrown_enemy(&mut world, player, 3.0);
    let fuse = world.get::<Thrown>(thrown).unwrap().fuse;

    let stale = world.resource_mut::<Scheduler>().schedule(9.0, None, Task::Explode { entity: thrown });
    world.write_message(TimerFired { handle: stale, task: Task::Explode { entity: thrown } });
    run_system_once(&mut world, explode_on_timer);
    assert!(drain_messages::<ExplodeRequest>(&mut world).is_empty());

    world.write_message(TimerFired { handle: fuse, task: Task::Explode { entity: thrown } });
    run_system_once(&mut world, explode_on_timer);
    assert_eq!(drain_messages::<ExplodeRequest>(&mut world), vec![ExplodeRequest { entity: thrown }]);
}

#[test]
fn thrown_entities_explode_on_grabbable_impact_only() {
    let mut world = combat_world();
    let player = spawn_player(&mut world);
    let thrown = thrown_enemy(&mut world, player, 3.0);
    let other = spawn_crate(&mut world, Vec2::new(500.0, 0.0));
    let wall = world.spawn(Transform::default()).id();

    world.write_message(CollisionStart { collider1: wall, collider2: thrown, body1: None, body2: Some(thrown) });
    world.write_message(CollisionStart { collider1: other, collider2: thrown, body1: Some(other), body2: None });
    run_system_once(&mut world, thrown_impacts);

    assert_eq!(drain_messages::<ExplodeRequest>(&mut world), vec![ExplodeRequest { entity: thrown }]);
}

#[test]
fn holding_into_a_detonator_requests_an_explosion() {
    let mut world = combat_world();
    let player = spawn_player(&mut world);
    let hand = hand_of(&world, player);
    let enemy = spawn_enemy(&mut world, hand, 3.0, &[]);
    grab_and_commit(&mut world, player, enemy);

    world.spawn((Detonator { half_extents: Vec2::splat(10.0) }, Transform::from_xyz(500.0, 500.0, 0.0)));
    run_system_once(&mut world, detonate_on_surfaces);
    assert!(drain_messages::<ExplodeRequest>(&mut world).is_empty());

    world.spawn((
        Detonator { half_extents: Vec2::splat(10.0) },
        Transform::from_translation((hand + Vec2::new(15.0, 0.0)).extend(0.0)),
    ));
    run_system_once(&mut world, detonate_on_surfaces);
    assert_eq!(drain_messages::<ExplodeRequest>(&mut world), vec![ExplodeRequest { entity: enemy }]);
}

#[test]
fn geometry_helpers() {
    assert!(circle_touches_rect(Vec2::new(15.0, 0.0), 6.0, Vec2::ZERO, Vec2::splat(10.0)));
    assert!(!circle_touches_rect(Vec2::new(17.0, 0.0), 6.0, Vec2::ZERO, Vec2::splat(10.0)));
    assert!(outside_bounds(Vec2::new(0.0, -901.0), Vec2::new(1400.0, 900.0)));
    assert!(!outside_bounds(Vec2::new(1400.0, 900.0), Vec2::new(1400.0, 900.0)));
    assert_eq!(falloff(0.0, 100.0), 1.0);
    assert_eq!(falloff(150.0, 100.0), 0.0);
}

#[test]
fn exploding_a_held_entity_releases_the_hold() {
    let mut world = combat_world();
    let player = spawn_player(&mut world);
    let hand = hand_of(&world, player);
    let enemy = spawn_enemy(&mut world, hand, 3.0, &[]);
    grab_and_commit(&mut world, player, enemy);

    world.write_message(ExplodeRequest { entity: enemy });
    run_system_once(&mut world, detonate);
    let hits: Vec<Entity> = drain_messages::<DamageRequest>(&mut world).iter().map(|r| r.target).collect();
    assert!(!hits.contains(&player));

    run_system_once(&mut world, release_stale_holds);
    let grabber = world.get::<Grabber>(player).unwrap();
    assert_eq!(grabber.grabbed(), None);
    assert!(!grabber.is_grabbing());
    assert_eq!(world.get::<Arm>(player).unwrap().hand_profile(), HandProfile::Inactive);
}

// -----------------------------------------------------------------------------
// Devour
// -----------------------------------------------------------------------------

#[test]
fn depleted_held_entity_prompts_devour_once() {
    let mut world = combat_world();
    let player = spawn_player(&mut world);
    let hand = hand_of(&world, player);
    let enemy = spawn_enemy(&mut world, hand, 3.0, &[]);
    grab_and_commit(&mut world, player, enemy);

    world.write_message(HealthDepleted { entity: enemy });
    world.write_message(HealthDepleted { entity: enemy });
    run_system_once(&mut world, prompt_devour);

    assert!(world.get::<Grabber>(player).unwrap().ready_to_devour());
    assert_eq!(
        drain_messages::<DevourPrompt>(&mut world),
        vec![DevourPrompt::Begin { grabber: player, target: enemy }]
    );
}

#[test]
fn devour_before_ready_only_ends_the_prompt() {
    let mut world = combat_world();
    let player = spawn_player(&mut world);
    let hand = hand_of(&world, player);
    let enemy = spawn_enemy(&mut world, hand, 3.0, &[HASTE]);
    grab_and_commit(&mut world, player, enemy);

    world.write_message(GrabCommand::devour(player));
    run_system_once(&mut world, apply_devour);

    assert_eq!(drain_messages::<DevourPrompt>(&mut world), vec![DevourPrompt::End { grabber: player }]);
    assert!(drain_messages::<Devoured>(&mut world).is_empty());
    assert_eq!(world.get::<Grabber>(player).unwrap().grabbed(), Some(enemy));
    assert_eq!(grabbable_state(&world, enemy), GrabState::Grabbed { by: player });
}

#[test]
fn devouring_objects_records_lore_only_the_first_time() {
    let mut world = combat_world();
    let player = spawn_player(&mut world);

    for round in 0..2 {
        let hand = hand_of(&world, player);
        let object = spawn_crate(&mut world, hand);
        grab_and_commit(&mut world, player, object);
        world.get_mut::<Grabber>(player).unwrap().set_ready_to_devour(true);

        world.write_message(GrabCommand::devour(player));
        run_system_once(&mut world, apply_devour);

        assert_eq!(grabbable_state(&world, object), GrabState::Devoured);
        assert!(world.get::<PendingDespawn>(object).is_some());
        let grabber = world.get::<Grabber>(player).unwrap();
        assert_eq!(grabber.grabbed(), None);
        assert!(!grabber.is_grabbing());
        assert!(!grabber.ready_to_devour());

        let lore = drain_messages::<LoreDiscovered>(&mut world);
        if round == 0 {
            assert_eq!(lore, vec![LoreDiscovered { type_key: "Crate".into() }]);
        } else {
            assert!(lore.is_empty());
        }
        assert_eq!(drain_messages::<Devoured>(&mut world).len(), 1);
        assert_eq!(drain_messages::<PersistSave>(&mut world).len(), 1);
    }
    assert_eq!(world.resource::<SaveRecord>().count("Crate"), 2);
    // Objects are consumed without a damage strike.
    assert!(drain_messages::<DamageRequest>(&mut world).is_empty());
}

#[test]
fn devouring_an_enemy_swaps_the_active_ability() {
    let mut world = combat_world();
    let player = spawn_player(&mut world);
    world.entity_mut(player).insert(ActiveAbility {
        tag: "PlayerAbility.Thorns".into(),
        name: "Thorns".into(),
        remaining: 3.0,
        speed_multiplier: 1.0,
    });
    let hand = hand_of(&world, player);
    let enemy = spawn_enemy(&mut world, hand, 3.0, &[HASTE]);
    grab_and_commit(&mut world, player, enemy);
    world.get_mut::<Grabber>(player).unwrap().set_ready_to_devour(true);

    world.write_message(GrabCommand::devour(player));
    run_system_once(&mut world, apply_devour);

    let ability = world.get::<ActiveAbility>(player).unwrap();
    assert_eq!(ability.name, "Haste");
    assert_eq!(ability.remaining, 8.0);
    assert_eq!(
        drain_messages::<AbilityExpired>(&mut world),
        vec![AbilityExpired { grabber: player, name: "Thorns".into() }]
    );
    assert_eq!(drain_messages::<AbilityGranted>(&mut world).len(), 1);

    let strikes = drain_messages::<DamageRequest>(&mut world);
    assert!(strikes.iter().any(|r| r.target == enemy && r.instigator == Some(player)));
    assert_eq!(grabbable_state(&world, enemy), GrabState::Devoured);
    assert!(!world.get::<Arm>(player).unwrap().is_bulging());
}

#[test]
fn unknown_ability_tag_keeps_the_current_ability() {
    let mut world = combat_world();
    let player = spawn_player(&mut world);
    world.entity_mut(player).insert(ActiveAbility {
        tag: "PlayerAbility.Thorns".into(),
        name: "Thorns".into(),
        remaining: 3.0,
        speed_multiplier: 1.0,
    });
    let hand = hand_of(&world, player);
    let enemy = spawn_enemy(&mut world, hand, 3.0, &["PlayerAbility.Unlisted"]);
    grab_and_commit(&mut world, player, enemy);
    world.get_mut::<Grabber>(player).unwrap().set_ready_to_devour(true);

    world.write_message(GrabCommand::devour(player));
    run_system_once(&mut world, apply_devour);

    assert_eq!(world.get::<ActiveAbility>(player).unwrap().name, "Thorns");
    assert!(drain_messages::<AbilityExpired>(&mut world).is_empty());
    assert!(drain_messages::<AbilityGranted>(&mut world).is_empty());
    assert_eq!(drain_messages::<Devoured>(&mut world).len(), 1);
}

#[test]
fn stale_hold_is_cleared_when_the_held_entity_vanishes() {
    let mut world = combat_world();
    let player = spawn_player(&mut world);
    let hand = hand_of(&world, player);
    let enemy = spawn_enemy(&mut world, hand, 3.0, &[]);
    grab_and_commit(&mut world, player, enemy);
    world.get_mut::<Grabber>(player).unwrap().set_ready_to_devour(true);

    world.despawn(enemy);
    run_system_once(&mut world, release_stale_holds);

    let grabber = world.get::<Grabber>(player).unwrap();
    assert_eq!(grabber.grabbed(), None);
    assert!(!grabber.ready_to_devour());
    assert_eq!(drain_messages::<DevourPrompt>(&mut world), vec![DevourPrompt::End { grabber: player }]);
}
