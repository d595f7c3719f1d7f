//! Arm geometry: stick -> hand target -> four anchors -> cubic Bézier samples.
//!
//! Everything here is pure and recomputed from scratch every tick.

use bevy::prelude::*;

use crate::common::tunables::ArmTunables;

/// Hand target offset from the shoulder for a raw stick vector.
///
/// Below `deactivate_threshold` the arm rests; inside the closeness ring the reach is
/// floored to `minimum_distance`; longer-than-unit input is normalized.
pub fn hand_target_offset(stick: Vec2, t: &ArmTunables) -> Vec2 {
    let mut v = stick;
    if v.length() < t.deactivate_threshold {
        v = t.resting_direction;
    }
    if v.length() > 1.0 {
        v = v.normalize();
    }
    if v.length() < t.closeness_threshold {
        v = v.normalize_or_zero() * t.minimum_distance;
    }
    v * t.max_length
}

/// Frame-rate independent blend factor for chasing a target over `move_time` seconds.
#[inline]
pub fn smoothing_alpha(dt: f32, move_time: f32) -> f32 {
    if move_time <= 0.0 {
        return 1.0;
    }
    1.0 - (-dt / move_time).exp()
}

/// `[P0, P1, P2, P3]` = shoulder, lower sample, upper sample, real hand.
pub fn anchors(shoulder: Vec2, real_hand: Vec2, hand_target: Vec2, t: &ArmTunables) -> [Vec2; 4] {
    let lower = real_hand.lerp(hand_target, t.lower_point_deviation);
    let upper = real_hand.lerp(hand_target, t.upper_point_deviation);
    [
        shoulder,
        shoulder.lerp(lower, t.lower_distance_percentage),
        shoulder.lerp(upper, t.upper_distance_percentage),
        real_hand,
    ]
}

#[inline]
pub fn cubic_bezier(p: &[Vec2; 4], t: f32) -> Vec2 {
    let u = 1.0 - t;
    p[0] * (u * u * u) + p[1] * (3.0 * u * u * t) + p[2] * (3.0 * u * t * t) + p[3] * (t * t * t)
}

/// `count` points at evenly spaced parameters in `[0, 1]`.
pub fn sample_curve(p: &[Vec2; 4], count: usize, out: &mut Vec<Vec2>) {
    out.clear();
    match count {
        0 => {}
        1 => out.push(p[0]),
        _ => {
            let last = (count - 1) as f32;
            out.extend((0..count).map(|i| cubic_bezier(p, i as f32 / last)));
        }
    }
}

/// Central differences, one-sided at the ends.
pub fn tangents(points: &[Vec2], scale: f32, out: &mut Vec<Vec2>) {
    out.clear();
    let n = points.len();
    if n < 2 {
        out.extend(points.iter().map(|_| Vec2::ZERO));
        return;
    }
    out.extend((0..n).map(|i| {
        let prev = points[i.saturating_sub(1)];
        let next = points[(i + 1).min(n - 1)];
        let span = if i == 0 || i == n - 1 { 1.0 } else { 0.5 };
        (next - prev) * span * scale
    }));
}
