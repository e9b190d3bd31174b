// ABOUTME: Deterministic hash and value noise used by the liquid wobble.
// ABOUTME: Seeded only by position, time and region identity, never by entropy.

use glass_core::RegionId;

use crate::Vec2;

/// Sine hash in 0..1, identical to `hash21` in the shader
pub fn hash21(p: Vec2) -> f32 {
    let h = p.dot(Vec2::new(127.1, 311.7));
    fract(h.sin() * 43758.547)
}

/// Smooth 2D value noise in 0..1
pub fn value_noise(p: Vec2) -> f32 {
    let i = Vec2::new(p.x.floor(), p.y.floor());
    let f = Vec2::new(p.x - i.x, p.y - i.y);
    let u = Vec2::new(f.x * f.x * (3.0 - 2.0 * f.x), f.y * f.y * (3.0 - 2.0 * f.y));

    let a = hash21(i);
    let b = hash21(i + Vec2::new(1.0, 0.0));
    let c = hash21(i + Vec2::new(0.0, 1.0));
    let d = hash21(i + Vec2::new(1.0, 1.0));

    mix(mix(a, b, u.x), mix(c, d, u.x), u.y)
}

/// Phase offset in 0..TAU so that regions wobble out of step with each other
pub fn region_phase(id: RegionId) -> f32 {
    // splitmix64 finalizer
    let mut z = id.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^= z >> 31;
    let unit = (z >> 40) as f32 / (1u64 << 24) as f32;
    unit * std::f32::consts::TAU
}

#[inline]
pub(crate) fn fract(v: f32) -> f32 {
    v - v.floor()
}

#[inline]
pub(crate) fn mix(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
