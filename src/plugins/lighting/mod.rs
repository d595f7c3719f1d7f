//! Lighting plugin (Firefly) (render-only).
//!
//! A warm light sits on the player; a second, green light rides the hand and
//! swells while something travels up the arm.

use bevy::prelude::*;
use bevy::state::state_scoped::DespawnOnExit;
use bevy_firefly::prelude::*;

use crate::common::state::GameState;
use crate::plugins::arm::Arm;
use crate::plugins::player::Player;

const HAND_RANGE: f32 = 140.0;
const HAND_RANGE_BULGING: f32 = 260.0;

#[derive(Component)]
pub struct PlayerLight;

#[derive(Component)]
pub struct HandLight;

pub fn plugin(app: &mut App) {
    if !app.is_plugin_added::<FireflyPlugin>() {
        app.add_plugins(FireflyPlugin);
    }

    app.add_systems(OnEnter(GameState::InGame), setup)
        .add_systems(Update, (follow_player_light, follow_hand_light).run_if(in_state(GameState::InGame)));
}

fn setup(mut commands: Commands) {
    commands.spawn((
        Name::new("PlayerLight"),
        PlayerLight,
        PointLight2d {
            color: Color::srgb(1.0, 0.9, 0.75),
            radius: 450.0,
            ..default()
        },
        Transform::from_xyz(0.0, 0.0, 10.0),
        DespawnOnExit(GameState::InGame),
    ));

    commands.spawn((
        Name::new("HandLight"),
        HandLight,
        PointLight2d {
            color: Color::srgb(0.55, 1.0, 0.6),
            radius: HAND_RANGE,
            ..default()
        },
        Transform::from_xyz(0.0, 0.0, 10.0),
        DespawnOnExit(GameState::InGame),
    ));
}

fn follow_player_light(
    q_player: Query<&Transform, (With<Player>, Without<PlayerLight>)>,
    mut q_light: Query<&mut Transform, (With<PlayerLight>, Without<Player>)>,
) {
    let Ok(tf_player) = q_player.single() else {
        return;
    };
    let Ok(mut tf_light) = q_light.single_mut() else {
        return;
    };

    tf_light.translation.x = tf_player.translation.x;
    tf_light.translation.y = tf_player.translation.y;
}

fn follow_hand_light(
    time: Res<Time>,
    q_arm: Query<&Arm, With<Player>>,
    mut q_light: Query<(&mut Transform, &mut PointLight2d), With<HandLight>>,
) {
    let Ok(arm) = q_arm.single() else {
        return;
    };
    let Ok((mut tf, mut light)) = q_light.single_mut() else {
        return;
    };

    let hand = arm.real_hand();
    tf.translation.x = hand.x;
    tf.translation.y = hand.y;

    let goal = if arm.is_bulging() { HAND_RANGE_BULGING } else { HAND_RANGE };
    let alpha = 1.0 - (-6.0 * time.delta_secs()).exp();
    light.radius += (goal - light.radius) * alpha;
}
