//! Devour bulge: a thickness pulse that travels from the hand to the shoulder.

use crate::plugins::fx::smootherstep;

/// Precomputed sine envelope for a window of `2 * radius + 1` segments.
#[derive(Debug, Clone, PartialEq)]
pub struct BulgeProfile {
    radius: usize,
    increments: Vec<f32>,
}

impl BulgeProfile {
    pub fn new(radius: usize, amplitude: f32) -> Self {
        let width = 2 * radius + 1;
        let increments = (0..=width)
            .map(|k| amplitude * (std::f32::consts::PI / width as f32 * k as f32).sin())
            .collect();
        Self { radius, increments }
    }

    #[inline]
    pub fn radius(&self) -> usize {
        self.radius
    }

    #[inline]
    pub fn width(&self) -> usize {
        2 * self.radius + 1
    }

    /// Thickness added at offset `k` from the window start; zero outside `0..=width`.
    #[inline]
    pub fn envelope(&self, k: usize) -> f32 {
        self.increments.get(k).copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bulge {
    active: bool,
    elapsed: f32,
    center: usize,
}

impl Bulge {
    pub fn new(point_count: usize, radius: usize) -> Self {
        Self { active: false, elapsed: 0.0, center: rest_center(point_count, radius) }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[inline]
    pub fn center(&self) -> usize {
        self.center
    }

    /// No-op while already bulging.
    pub fn start(&mut self) {
        if self.active {
            return;
        }
        self.active = true;
        self.elapsed = 0.0;
    }

    pub fn stop(&mut self, point_count: usize, radius: usize) {
        self.active = false;
        self.elapsed = 0.0;
        self.center = rest_center(point_count, radius);
    }

    /// Advance the looping timeline and move the center index.
    pub fn advance(&mut self, dt: f32, speed: f32, timeline_offset: f32, point_count: usize, radius: usize) {
        if !self.active {
            return;
        }
        self.elapsed += dt * speed;
        let alpha = smootherstep(self.elapsed.fract());
        self.center = center_for(alpha, point_count, radius, timeline_offset);
    }
}

#[inline]
fn rest_center(point_count: usize, radius: usize) -> usize {
    point_count.saturating_sub(1 + radius)
}

/// `round(lerp(N - 1 - r, r - offset, alpha))`, clamped to a valid index.
pub fn center_for(alpha: f32, point_count: usize, radius: usize, timeline_offset: f32) -> usize {
    let from = rest_center(point_count, radius) as f32;
    let to = radius as f32 - timeline_offset;
    (from + (to - from) * alpha).round().max(0.0) as usize
}

/// Per-segment `(start_scale, end_scale)`.
///
/// The window `center ± radius` only applies when it lies entirely inside the segment
/// range; at rest the window overhangs the hand end and nothing is bulged.
pub fn segment_scales(
    segment_count: usize,
    base_start: f32,
    base_end: f32,
    bulge: &Bulge,
    profile: &BulgeProfile,
    out: &mut Vec<(f32, f32)>,
) {
    out.clear();
    out.resize(segment_count, (base_start, base_end));
    if !bulge.is_active() {
        return;
    }

    let r = profile.radius();
    let Some(start) = bulge.center().checked_sub(r) else {
        return;
    };
    let end = bulge.center() + r;
    if end >= segment_count {
        return;
    }
    for i in start..=end {
        let k = i - start;
        out[i] = (base_start + profile.envelope(k), base_end + profile.envelope(k + 1));
    }
}
