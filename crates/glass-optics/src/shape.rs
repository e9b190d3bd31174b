// ABOUTME: Signed distance to the rounded (superellipse) glass shape.
// ABOUTME: Includes the liquid wobble perturbation, surface normal and edge coverage.

use crate::noise::value_noise;
use crate::Vec2;

/// Exponent at roundness 1 (an ellipse)
pub const MIN_EXPONENT: f32 = 2.0;

/// Extra exponent added as roundness drops to 0 (near-rectangular)
pub const EXPONENT_RANGE: f32 = 10.0;

/// Wobble amplitude as a fraction of the half-size at `liquid_wobble = 1`
pub const WOBBLE_SCALE: f32 = 0.04;

/// Finite difference step for normals, in pixels
pub const NORMAL_EPSILON: f32 = 0.5;

/// Half-width of the anti-aliased edge band, in pixels
pub const AA_HALF_WIDTH: f32 = 1.0;

// Keeps |u|^n finite for far-away points; sign is unaffected.
const MAX_NORMALIZED_COORD: f32 = 64.0;

/// Superellipse exponent for a corner roundness in 0..1
pub fn roundness_exponent(roundness: f32) -> f32 {
    let r = if roundness.is_nan() { 0.0 } else { roundness.clamp(0.0, 1.0) };
    MIN_EXPONENT + (1.0 - r) * EXPONENT_RANGE
}

/// Signed distance estimate to a superellipse with half extents `half` and
/// exponent `n`, centered at the origin. Negative strictly inside.
pub fn shape_distance(p: Vec2, half: Vec2, n: f32) -> f32 {
    let a = half.x.max(1e-3);
    let b = half.y.max(1e-3);
    let ux = (p.x.abs() / a).min(MAX_NORMALIZED_COORD);
    let uy = (p.y.abs() / b).min(MAX_NORMALIZED_COORD);

    let s = ux.powf(n) + uy.powf(n);
    let k = s.powf(1.0 / n);
    if k <= f32::EPSILON {
        return -a.min(b);
    }

    // |grad k|, written with (u/k) so nothing overflows near the center
    let gx = (ux / k).powf(n - 1.0) / a;
    let gy = (uy / k).powf(n - 1.0) / b;
    let grad = (gx * gx + gy * gy).sqrt();
    if grad <= 1e-9 {
        return (k - 1.0) * a.min(b);
    }

    (k - 1.0) / grad
}

/// Relative size change of the shape along `angle` at `time`
pub fn wobble(angle: f32, time: f32, phase: f32, amplitude: f32) -> f32 {
    if amplitude <= 0.0 {
        return 0.0;
    }

    let harmonics = 0.5 * (3.0 * angle + time * 1.3 + phase).sin()
        + 0.3 * (5.0 * angle - time * 0.9 + phase * 1.7).sin()
        + 0.2 * (2.0 * angle + time * 0.6 + phase * 0.5).sin();

    // Sampled on the unit circle so there is no seam at angle = +-PI
    let drift_at = Vec2::new(
        angle.cos() * 1.5 + phase + time * 0.35,
        angle.sin() * 1.5 + time * 0.2,
    );
    let drift = value_noise(drift_at) - 0.5;

    amplitude * WOBBLE_SCALE * (harmonics + drift)
}

/// Shape distance with the wobble applied to the half extents
pub fn wobbly_distance(p: Vec2, half: Vec2, n: f32, time: f32, phase: f32, amplitude: f32) -> f32 {
    let w = wobble(p.y.atan2(p.x), time, phase, amplitude);
    shape_distance(p, half * (1.0 + w), n)
}

/// Outward unit normal from central differences of the wobbly distance
pub fn surface_normal(p: Vec2, half: Vec2, n: f32, time: f32, phase: f32, amplitude: f32) -> Vec2 {
    let sd = |q: Vec2| wobbly_distance(q, half, n, time, phase, amplitude);
    let ex = Vec2::new(NORMAL_EPSILON, 0.0);
    let ey = Vec2::new(0.0, NORMAL_EPSILON);
    Vec2::new(sd(p + ex) - sd(p - ex), sd(p + ey) - sd(p - ey)).normalize_or_zero()
}

/// Alpha of the shape at signed distance `sd`
pub fn coverage(sd: f32) -> f32 {
    1.0 - smoothstep(-AA_HALF_WIDTH, AA_HALF_WIDTH, sd)
}

pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}
