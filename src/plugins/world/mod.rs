//! World plugin: arena walls, floor and detonator pads.
//!
//! Walls double as detonators: slamming a held enemy into one sets it off.
//! The kill bounds live in `Tunables::world` and are enforced by the grab plugin.

use avian2d::prelude::*;
use bevy::prelude::*;
use bevy::state::state_scoped::DespawnOnExit;

use crate::common::layers::Layer;
use crate::common::state::GameState;
use crate::plugins::grab::Detonator;

const TILE: i32 = 64;
const HALF_W: i32 = TILE * 16;
const HALF_H: i32 = TILE * 9;
const WALL_THICKNESS: f32 = 30.0;

/// Pads in the middle of the arena.
const PADS: &[(Vec2, Vec2)] = &[
    (Vec2::new(-480.0, 0.0), Vec2::new(40.0, 120.0)),
    (Vec2::new(480.0, 0.0), Vec2::new(40.0, 120.0)),
];

pub fn plugin(app: &mut App) {
    app.add_systems(OnEnter(GameState::InGame), (spawn_arena, spawn_pads, spawn_floor));
}

fn wall_layers() -> CollisionLayers {
    CollisionLayers::new(Layer::World, [Layer::Player, Layer::Enemy, Layer::Object])
}

fn spawn_arena(mut commands: Commands) {
    let wall_color = Color::srgb(0.25, 0.27, 0.33);
    let t = WALL_THICKNESS;
    let (hw, hh) = (HALF_W as f32, HALF_H as f32);

    let walls = [
        ("WallTop", Vec2::new(0.0, hh + t * 0.5), Vec2::new(hw * 2.0 + t * 2.0, t)),
        ("WallBottom", Vec2::new(0.0, -hh - t * 0.5), Vec2::new(hw * 2.0 + t * 2.0, t)),
        ("WallLeft", Vec2::new(-hw - t * 0.5, 0.0), Vec2::new(t, hh * 2.0)),
        ("WallRight", Vec2::new(hw + t * 0.5, 0.0), Vec2::new(t, hh * 2.0)),
    ];

    for (name, at, size) in walls {
        commands.spawn((
            Name::new(name),
            Sprite {
                color: wall_color,
                custom_size: Some(size),
                ..default()
            },
            Transform::from_translation(at.extend(0.0)),
            RigidBody::Static,
            Collider::rectangle(size.x, size.y),
            wall_layers(),
            Detonator { half_extents: size * 0.5 },
            DespawnOnExit(GameState::InGame),
        ));
    }
}

/// Spiked pads: no physical body, they only set off held grabbables.
fn spawn_pads(mut commands: Commands) {
    for (i, (at, half_extents)) in PADS.iter().enumerate() {
        commands.spawn((
            Name::new(format!("DetonatorPad{i}")),
            Sprite {
                color: Color::srgb(0.55, 0.2, 0.18),
                custom_size: Some(*half_extents * 2.0),
                ..default()
            },
            Transform::from_translation(at.extend(0.5)),
            Detonator { half_extents: *half_extents },
            DespawnOnExit(GameState::InGame),
        ));
    }
}

/// Checkerboard of solid-colour sprites, so the project ships no assets.
fn spawn_floor(mut commands: Commands) {
    (-(HALF_H / TILE)..=HALF_H / TILE)
        .flat_map(|y| (-(HALF_W / TILE)..=HALF_W / TILE).map(move |x| (x, y)))
        .for_each(|(x, y)| {
            let world_pos = Vec3::new(x as f32 * TILE as f32, y as f32 * TILE as f32, -1.0);
            let color = if (x + y) % 2 == 0 {
                Color::srgb(0.14, 0.14, 0.16)
            } else {
                Color::srgb(0.12, 0.12, 0.14)
            };

            commands.spawn((
                Sprite::from_color(color, Vec2::splat(TILE as f32)),
                Transform::from_translation(world_pos),
                DespawnOnExit(GameState::InGame),
            ));
        });
}

#[cfg(test)]
mod tests;
