use std::time::Duration;

use avian2d::prelude::*;
use bevy::prelude::*;

use super::*;
use crate::common::stats::ENEMY_STATS_JSON;
use crate::common::test_utils::{drain_messages, ensure_messages, run_system_once, time_with_delta};
use crate::plugins::timers::{Scheduler, Task};

// -----------------------------------------------------------------------------
// Helpers
// -----------------------------------------------------------------------------

fn stats_world() -> World {
    let mut world = World::new();
    world.insert_resource(StatTable::from_json(ENEMY_STATS_JSON).unwrap());
    world
}

fn spawn_keyed(world: &mut World, key: &'static str, role: Role) -> Entity {
    run_system_once(world, move |mut commands: Commands, table: Res<StatTable>| {
        spawn_from_stats(&mut commands, &table, key, role, Vec2::new(10.0, 20.0))
    })
}

fn brute() -> EnemyStats {
    EnemyStats {
        attack: 2.0,
        attack_cooldown: 1.5,
        pursuit_radius: 300.0,
        attack_range: 30.0,
        speed: 100.0,
        ..EnemyStats::default()
    }
}

fn ai_world(dt: f32, player_at: Vec2) -> (World, Entity) {
    let mut world = World::new();
    world.insert_resource(time_with_delta(dt));
    ensure_messages::<DamageRequest>(&mut world);
    let player = world
        .spawn((Player, Transform::from_translation(player_at.extend(0.0)), LifeState::Alive))
        .id();
    (world, player)
}

fn spawn_brain(world: &mut World, at: Vec2) -> Entity {
    let stats = brute();
    world
        .spawn((
            Enemy,
            Brain::default(),
            MoveSpeed(stats.speed),
            Stats(stats),
            Transform::from_translation(at.extend(0.0)),
            LifeState::Alive,
            LinearVelocity::ZERO,
        ))
        .id()
}

// -----------------------------------------------------------------------------
// Brain
// -----------------------------------------------------------------------------

#[test]
fn brain_pauses_resumes_and_stop_is_terminal() {
    let mut brain = Brain::default();
    assert_eq!(brain.mode(), BrainMode::Running);

    brain.pause("Grabbed");
    assert_eq!(brain.mode(), BrainMode::Paused);
    brain.resume("LetGo");
    assert!(brain.is_running());

    brain.stop("Died");
    brain.resume("Exploded");
    brain.pause("Grabbed");
    assert_eq!(brain.mode(), BrainMode::Stopped);
}

#[test]
fn resume_without_pause_is_a_noop() {
    let mut brain = Brain::default();
    brain.resume("LetGo");
    assert!(brain.is_running());
}

// -----------------------------------------------------------------------------
// Spawn
// -----------------------------------------------------------------------------

#[test]
fn spawn_uses_stat_row() {
    let mut world = stats_world();
    let e = spawn_keyed(&mut world, "Bramblehog", Role::Enemy);

    assert_eq!(world.get::<Health>(e).unwrap().max(), 8.0);
    assert_eq!(world.get::<MoveSpeed>(e).unwrap().0, 70.0);
    assert_eq!(world.get::<Name>(e).unwrap().as_str(), "Bramblehog");
    let grabbable = world.get::<Grabbable>(e).unwrap();
    assert_eq!(grabbable.kind(), GrabbableKind::Enemy { devourable: true });
    assert_eq!(grabbable.type_key(), "Bramblehog");
    assert_eq!(world.get::<AbilityTags>(e).unwrap().0.len(), 2);
    assert_eq!(world.get::<Brain>(e).unwrap().mode(), BrainMode::Running);
}

#[test]
fn ungrabbable_types_get_no_grabbable() {
    let mut world = stats_world();
    let e = spawn_keyed(&mut world, "Ironshell", Role::Enemy);

    assert!(world.get::<Enemy>(e).is_some());
    assert!(world.get::<Grabbable>(e).is_none());
    assert!(world.get::<Highlight>(e).is_none());
}

#[test]
fn objects_have_no_brain() {
    let mut world = stats_world();
    let e = spawn_keyed(&mut world, "Crate", Role::Object);

    assert!(world.get::<Brain>(e).is_none());
    assert!(world.get::<Enemy>(e).is_none());
    assert_eq!(world.get::<Grabbable>(e).unwrap().kind(), GrabbableKind::Object);
    assert_eq!(world.get::<Health>(e).unwrap().max(), 1.0);
}

#[test]
fn unknown_key_falls_back_to_defaults() {
    let mut world = stats_world();
    let e = spawn_keyed(&mut world, "Gloomwyrm", Role::Enemy);

    assert_eq!(world.get::<Stats>(e).unwrap().0, EnemyStats::default());
    assert_eq!(world.get::<Health>(e).unwrap().max(), EnemyStats::default().max_health);
}

// -----------------------------------------------------------------------------
// AI
// -----------------------------------------------------------------------------

#[test]
fn running_brain_steers_toward_player() {
    let (mut world, _) = ai_world(0.1, Vec2::new(200.0, 0.0));
    let e = spawn_brain(&mut world, Vec2::ZERO);

    run_system_once(&mut world, drive_brains);

    let v = world.get::<LinearVelocity>(e).unwrap().0;
    assert!(v.x > 0.0 && v.x < 100.0, "partial blend toward desired velocity: {v}");
    assert_eq!(v.y, 0.0);
    assert!(drain_messages::<DamageRequest>(&mut world).is_empty());
}

#[test]
fn out_of_pursuit_radius_settles() {
    let (mut world, _) = ai_world(0.1, Vec2::new(1000.0, 0.0));
    let e = spawn_brain(&mut world, Vec2::ZERO);
    world.get_mut::<LinearVelocity>(e).unwrap().0 = Vec2::new(50.0, 0.0);

    run_system_once(&mut world, drive_brains);

    assert!(world.get::<LinearVelocity>(e).unwrap().0.x < 50.0);
}

#[test]
fn attack_respects_cooldown() {
    let (mut world, player) = ai_world(0.1, Vec2::new(20.0, 0.0));
    let e = spawn_brain(&mut world, Vec2::ZERO);

    run_system_once(&mut world, drive_brains);
    assert_eq!(
        drain_messages::<DamageRequest>(&mut world),
        vec![DamageRequest::strike(player, 2.0, Some(e))]
    );

    run_system_once(&mut world, drive_brains);
    assert!(drain_messages::<DamageRequest>(&mut world).is_empty());
}

#[test]
fn paused_or_thrown_brains_do_nothing() {
    let (mut world, _) = ai_world(0.1, Vec2::new(20.0, 0.0));
    let paused = spawn_brain(&mut world, Vec2::ZERO);
    world.get_mut::<Brain>(paused).unwrap().pause("Grabbed");
    let thrown = spawn_brain(&mut world, Vec2::new(5.0, 0.0));
    let fuse = Scheduler::default().schedule(0.5, None, Task::Explode { entity: thrown });
    world.entity_mut(thrown).insert(Thrown { by: paused, fuse });
    world.get_mut::<LinearVelocity>(thrown).unwrap().0 = Vec2::new(400.0, 0.0);

    run_system_once(&mut world, drive_brains);

    assert!(drain_messages::<DamageRequest>(&mut world).is_empty());
    assert_eq!(world.get::<LinearVelocity>(thrown).unwrap().0, Vec2::new(400.0, 0.0));
}

#[test]
fn stunned_brain_sits_out_then_attacks() {
    let (mut world, player) = ai_world(0.1, Vec2::new(20.0, 0.0));
    let e = spawn_brain(&mut world, Vec2::ZERO);
    world.get_mut::<Brain>(e).unwrap().stun(0.2);

    for _ in 0..2 {
        run_system_once(&mut world, drive_brains);
        assert!(drain_messages::<DamageRequest>(&mut world).is_empty());
    }
    assert!(!world.get::<Brain>(e).unwrap().is_stunned());

    run_system_once(&mut world, drive_brains);
    assert_eq!(
        drain_messages::<DamageRequest>(&mut world),
        vec![DamageRequest::strike(player, 2.0, Some(e))]
    );
}

#[test]
fn stopped_brain_ignores_stuns() {
    let mut brain = Brain::default();
    brain.stop("Died");
    brain.stun(1.0);
    assert!(!brain.is_stunned());
}

#[test]
fn dead_player_is_ignored() {
    let (mut world, player) = ai_world(0.1, Vec2::new(20.0, 0.0));
    *world.get_mut::<LifeState>(player).unwrap() = LifeState::Dead;
    spawn_brain(&mut world, Vec2::ZERO);

    run_system_once(&mut world, drive_brains);
    assert!(drain_messages::<DamageRequest>(&mut world).is_empty());
}

// -----------------------------------------------------------------------------
// Reactions
// -----------------------------------------------------------------------------

#[test]
fn death_stops_brain_and_clears_filters() {
    let mut world = World::new();
    ensure_messages::<Died>(&mut world);
    let e = world
        .spawn((
            Enemy,
            Brain::default(),
            role_layers(Role::Enemy),
            LinearVelocity(Vec2::new(30.0, 0.0)),
        ))
        .id();
    world.write_message(Died { entity: e });

    run_system_once(&mut world, on_enemy_died);

    assert_eq!(world.get::<Brain>(e).unwrap().mode(), BrainMode::Stopped);
    assert_eq!(world.get::<CollisionLayers>(e).unwrap().filters, LayerMask::NONE);
    assert_eq!(world.get::<LinearVelocity>(e).unwrap().0, Vec2::ZERO);
}

#[test]
fn damage_flashes_and_healing_does_not() {
    let mut world = World::new();
    ensure_messages::<HealthChanged>(&mut world);
    let hurt = world.spawn(EnemyLook::new(Color::BLACK)).id();
    let healed = world.spawn(EnemyLook::new(Color::BLACK)).id();
    world.write_message(HealthChanged { entity: hurt, delta: -1.0 });
    world.write_message(HealthChanged { entity: healed, delta: 1.0 });

    run_system_once(&mut world, flash_on_damage);

    assert_eq!(world.get::<EnemyLook>(hurt).unwrap().hit_flash.get(), 1.0);
    assert_eq!(world.get::<EnemyLook>(healed).unwrap().hit_flash.get(), 0.0);
}

// -----------------------------------------------------------------------------
// Presentation
// -----------------------------------------------------------------------------

#[test]
fn highlight_brightens_and_dying_fades() {
    let mut world = World::new();
    world.insert_resource(time_with_delta(0.0));
    let base = Color::srgb(0.5, 0.2, 0.2);

    let lit = world
        .spawn((EnemyLook::new(base), LifeState::Alive, Highlight(true), Sprite::default(), Transform::default()))
        .id();

    let mut timer = Timer::from_seconds(1.0, TimerMode::Once);
    timer.tick(Duration::from_secs_f32(0.5));
    let dying = world
        .spawn((EnemyLook::new(base), LifeState::Dying { timer }, Sprite::default(), Transform::default()))
        .id();

    run_system_once(&mut world, tint_enemies);

    let lit_color = world.get::<Sprite>(lit).unwrap().color.to_srgba();
    assert!(lit_color.green > 0.2);
    assert_eq!(lit_color.alpha, 1.0);

    let dying_color = world.get::<Sprite>(dying).unwrap().color.to_srgba();
    assert!((dying_color.alpha - 0.5).abs() < 1e-4);
    assert!((world.get::<Transform>(dying).unwrap().scale.x - 0.5).abs() < 1e-4);
}
