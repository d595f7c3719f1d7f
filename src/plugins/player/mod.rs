//! Player plugin.
//!
//! Pipeline:
//! - Update: sample keyboard into `PlayerInput` (movement) and the `GrabberInput` latch
//! - FixedUpdate `Input`: turn the latch into grab / let-go / devour commands,
//!   tick the temporary ability
//! - FixedUpdate: apply velocity to the kinematic body
//!
//! The grab button is edge-triggered against the previous fixed tick. Presses are
//! latched like the devour key, so a tap released before the next fixed step still
//! grabs on that step and lets go on the one after.

use avian2d::prelude::*;
use bevy::prelude::*;
use bevy::state::state_scoped::DespawnOnExit;

use crate::common::{layers::Layer, state::CombatSet, state::GameState, tunables::Tunables};
use crate::plugins::arm::Arm;
use crate::plugins::grab::{AbilityExpired, ActiveAbility, GrabCommand, GrabRange, Grabber, GrabberInput, Stamina};
use crate::plugins::health::{Absorber, DeathDelay, Died, Health, Invincibility, LifeState};

#[derive(Component)]
pub struct Player;

#[derive(Resource, Default, Debug)]
struct PlayerInput {
    move_axis: Vec2,
}

pub fn plugin(app: &mut App) {
    app.insert_resource(PlayerInput::default())
        .add_systems(OnEnter(GameState::InGame), spawn)
        .add_systems(Update, gather_input)
        .add_systems(
            FixedUpdate,
            (emit_grab_commands, tick_ability).in_set(CombatSet::Input),
        )
        .add_systems(FixedUpdate, apply_movement.after(CombatSet::Commands))
        .add_systems(FixedPostUpdate, announce_death.after(CombatSet::Damage));
}

pub fn spawn(mut commands: Commands, tunables: Res<Tunables>) {
    let t = &tunables.player;
    let layers = CollisionLayers::new(Layer::Player, [Layer::World, Layer::Enemy, Layer::Object]);
    let origin = Vec2::ZERO;

    commands.spawn((
        (
            Name::new("Player"),
            Player,
            Sprite {
                color: Color::srgb(0.2, 0.75, 0.9),
                custom_size: Some(Vec2::splat(26.0)),
                ..default()
            },
            Transform::from_translation(origin.extend(1.0)),
            RigidBody::Kinematic,
            Collider::circle(13.0),
            layers,
            LinearVelocity::ZERO,
            DespawnOnExit(GameState::InGame),
        ),
        (
            Health::new(t.max_health),
            Invincibility::new(t.invincibility),
            LifeState::Alive,
            DeathDelay(t.death_despawn_delay),
            Absorber { steal_percent: t.steal_percent },
        ),
        (
            Grabber::default(),
            Stamina::new(tunables.stamina.max),
            GrabberInput::default(),
            GrabRange::default(),
            Arm::new(&tunables.arm, origin + tunables.arm.shoulder_offset),
        ),
    ));
}

fn axis(keys: &ButtonInput<KeyCode>, pos: KeyCode, neg: KeyCode) -> f32 {
    keys.pressed(pos) as i32 as f32 - keys.pressed(neg) as i32 as f32
}

/// WASD moves, arrow keys aim the arm, Space grabs, E devours.
fn gather_input(
    keys: Option<Res<ButtonInput<KeyCode>>>,
    mut input: ResMut<PlayerInput>,
    mut q_grabber: Query<&mut GrabberInput, With<Player>>,
) {
    let Some(keys) = keys else {
        return;
    };

    let movement = Vec2::new(axis(&keys, KeyCode::KeyD, KeyCode::KeyA), axis(&keys, KeyCode::KeyW, KeyCode::KeyS));
    input.move_axis = movement.normalize_or_zero();

    let Ok(mut grab) = q_grabber.single_mut() else {
        return;
    };
    grab.aim = Vec2::new(
        axis(&keys, KeyCode::ArrowRight, KeyCode::ArrowLeft),
        axis(&keys, KeyCode::ArrowUp, KeyCode::ArrowDown),
    )
    .normalize_or_zero();
    grab.grab_held = keys.pressed(KeyCode::Space);
    if keys.just_pressed(KeyCode::Space) {
        grab.grab_pressed = true;
    }
    if keys.just_pressed(KeyCode::KeyE) {
        grab.devour_pressed = true;
    }
}

/// Grab button edges and the devour latch become commands. A dead player lets go.
pub(crate) fn emit_grab_commands(
    mut q: Query<(Entity, &mut GrabberInput, &LifeState), With<Player>>,
    mut out: MessageWriter<GrabCommand>,
) {
    for (e, mut input, life) in &mut q {
        let tapped = std::mem::take(&mut input.grab_pressed);
        let held = (input.grab_held || tapped) && life.is_alive();
        match (held, input.pushing) {
            (true, false) => {
                out.write(GrabCommand::grab(e));
            }
            (false, true) => {
                out.write(GrabCommand::let_go(e));
            }
            _ => {}
        }
        input.pushing = held;

        if std::mem::take(&mut input.devour_pressed) && life.is_alive() {
            out.write(GrabCommand::devour(e));
        }
    }
}

fn tick_ability(
    time: Res<Time>,
    mut commands: Commands,
    mut q: Query<(Entity, &mut ActiveAbility)>,
    mut expired: MessageWriter<AbilityExpired>,
) {
    let dt = time.delta_secs();
    for (e, mut ability) in &mut q {
        ability.remaining -= dt;
        if ability.remaining <= 0.0 {
            expired.write(AbilityExpired { grabber: e, name: ability.name.clone() });
            commands.entity(e).remove::<ActiveAbility>();
        }
    }
}

fn apply_movement(
    tunables: Res<Tunables>,
    input: Res<PlayerInput>,
    mut q_player: Query<(&mut LinearVelocity, &LifeState, Option<&ActiveAbility>), With<Player>>,
) {
    let Ok((mut vel, life, ability)) = q_player.single_mut() else {
        return;
    };
    if !life.is_alive() {
        vel.0 = Vec2::ZERO;
        return;
    }
    let multiplier = ability.map_or(1.0, |a| a.speed_multiplier);
    vel.0 = input.move_axis * tunables.player.speed * multiplier;
}

fn announce_death(mut died: MessageReader<Died>, q: Query<(), With<Player>>) {
    for ev in died.read() {
        if q.contains(ev.entity) {
            info!("player died");
        }
    }
}
