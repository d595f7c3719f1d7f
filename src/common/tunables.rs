//! Tunable gameplay constants.
//!
//! Distances are in pixels, times in seconds, angles in degrees.

use bevy::prelude::*;

#[derive(Resource, Debug, Clone, Default)]
pub struct Tunables {
    pub world: WorldTunables,
    pub player: PlayerTunables,
    pub stamina: StaminaTunables,
    pub arm: ArmTunables,
    pub grab: GrabTunables,
    pub throw: ThrowTunables,
}

#[derive(Debug, Clone)]
pub struct WorldTunables {
    pub pixels_per_meter: f32,
    /// Half extents of the kill bounds; anything outside has fallen out of the world.
    pub kill_half_extents: Vec2,
    pub rng_seed: u64,
}

impl Default for WorldTunables {
    fn default() -> Self {
        Self {
            pixels_per_meter: 20.0,
            kill_half_extents: Vec2::new(1400.0, 900.0),
            rng_seed: 0x5EED_A4E5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlayerTunables {
    pub speed: f32,
    pub max_health: f32,
    pub invincibility: f32,
    pub death_despawn_delay: f32,
    /// Percent of siphoned damage returned to the player as health.
    pub steal_percent: f32,
}

impl Default for PlayerTunables {
    fn default() -> Self {
        Self {
            speed: 320.0,
            max_health: 35.0,
            invincibility: 0.5,
            death_despawn_delay: 2.5,
            steal_percent: 50.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StaminaTunables {
    pub max: f32,
    pub initial_grab_cost: f32,
    /// Drained per second while grabbing.
    pub periodic_cost: f32,
    /// Regained per second while not grabbing.
    pub recharge: f32,
}

impl Default for StaminaTunables {
    fn default() -> Self {
        Self { max: 100.0, initial_grab_cost: 20.0, periodic_cost: 5.0, recharge: 8.0 }
    }
}

#[derive(Debug, Clone)]
pub struct ArmTunables {
    pub point_count: usize,
    pub start_scale: f32,
    pub end_scale: f32,
    /// Segment thickness in pixels at scale 1.
    pub thickness: f32,
    pub tangent_scale: f32,
    pub max_length: f32,
    pub shoulder_offset: Vec2,
    /// Stick direction used while the stick is below `deactivate_threshold`.
    pub resting_direction: Vec2,
    pub deactivate_threshold: f32,
    pub closeness_threshold: f32,
    pub minimum_distance: f32,
    pub hand_move_time: f32,
    /// Multiplier on `hand_move_time` while homing onto a grab target.
    pub grab_move_time_scale: f32,
    pub lower_point_deviation: f32,
    pub upper_point_deviation: f32,
    pub lower_distance_percentage: f32,
    pub upper_distance_percentage: f32,
    pub bulge_radius: usize,
    pub bulge_amplitude: f32,
    pub bulge_speed: f32,
    /// Pushes the far end of the bulge travel past the shoulder so loops pause briefly.
    pub bulge_timeline_offset: f32,
    pub hit_damage: f32,
    /// Seconds an enemy's brain stays idle after the arm first touches it.
    pub hit_stun: f32,
    pub stay_damage: f32,
    pub stay_damage_interval: f32,
    pub hand_radius: f32,
}

impl Default for ArmTunables {
    fn default() -> Self {
        Self {
            point_count: 25,
            start_scale: 0.6,
            end_scale: 0.65,
            thickness: 14.0,
            tangent_scale: 1.0,
            max_length: 160.0,
            shoulder_offset: Vec2::new(0.0, 6.0),
            resting_direction: Vec2::new(0.35, -0.2),
            deactivate_threshold: 0.15,
            closeness_threshold: 0.3,
            minimum_distance: 0.3,
            hand_move_time: 0.1,
            grab_move_time_scale: 0.5,
            lower_point_deviation: 0.9,
            upper_point_deviation: 0.5,
            lower_distance_percentage: 0.3,
            upper_distance_percentage: 0.75,
            bulge_radius: 4,
            bulge_amplitude: 2.3,
            bulge_speed: 0.5,
            bulge_timeline_offset: 0.0,
            hit_damage: 1.0,
            hit_stun: 0.4,
            stay_damage: 0.2,
            stay_damage_interval: 0.5,
            hand_radius: 12.0,
        }
    }
}

/// How held damage is paced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeldDamageMode {
    /// `devour_damage * dt` every fixed tick.
    PerTick,
    /// Lump-sum `devour_damage` every `devour_damage_interval` seconds.
    Interval,
}

#[derive(Debug, Clone)]
pub struct GrabTunables {
    /// Extra reach of the range trigger beyond the arm length.
    pub range_extension: f32,
    pub angle_tolerance: f32,
    pub distance_tolerance: f32,
    pub devour_damage: f32,
    pub devour_damage_interval: f32,
    pub held_damage_mode: HeldDamageMode,
    /// Strike applied on devour so the enemy's own death path fires.
    pub devour_final_damage: f32,
    pub punch_damage: f32,
    pub punch_knockback: f32,
}

impl Default for GrabTunables {
    fn default() -> Self {
        Self {
            range_extension: 45.0,
            angle_tolerance: 40.0,
            distance_tolerance: 10.0,
            devour_damage: 1.0,
            devour_damage_interval: 1.0,
            held_damage_mode: HeldDamageMode::PerTick,
            devour_final_damage: 1.0,
            punch_damage: 1.0,
            punch_knockback: 420.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ThrowTunables {
    pub time_to_explode: f32,
    pub explosion_radius: f32,
    pub explosion_damage: f32,
    pub knockback: f32,
    /// Cap on the hand velocity handed to a released entity.
    pub max_throw_speed: f32,
    /// When false the exploding entity is excluded from its own blast.
    pub explosion_damages_self: bool,
}

impl Default for ThrowTunables {
    fn default() -> Self {
        Self {
            time_to_explode: 0.5,
            explosion_radius: 140.0,
            explosion_damage: 1.0,
            knockback: 520.0,
            max_throw_speed: 900.0,
            explosion_damages_self: true,
        }
    }
}
