// ABOUTME: Light transport approximations for the glass body.
// ABOUTME: Depth proxy, refraction offset, chromatic dispersion, Schlick fresnel and specular glare.

use crate::Vec2;

/// Exponent shaping how quickly edge effects fade toward the center
pub const EDGE_EXPONENT: f32 = 2.5;

/// Refraction displacement at the edge per unit of (ior - 1), in logical pixels
pub const REFRACTION_SCALE: f32 = 40.0;

/// Channel spread per unit of dispersion
pub const DISPERSION_SCALE: f32 = 0.02;

/// Share of the light direction that follows the pointer when one is present
pub const POINTER_INFLUENCE: f32 = 0.5;

const SPECULAR_SHARP_POWER: f32 = 64.0;
const SPECULAR_BROAD_POWER: f32 = 8.0;
const SPECULAR_BROAD_WEIGHT: f32 = 0.25;

/// 0 at the boundary, 1 once `thickness` pixels inside
pub fn depth(sd: f32, thickness: f32) -> f32 {
    (-sd / thickness.max(1e-3)).clamp(0.0, 1.0)
}

/// Weight of the edge effects: 1 at the boundary, 0 at full depth
pub fn edge_factor(depth: f32) -> f32 {
    (1.0 - depth).clamp(0.0, 1.0).powf(EDGE_EXPONENT)
}

/// Displacement to subtract from the sampling position. The convex surface
/// pulls samples toward the center, so the offset points along the normal.
pub fn refraction_offset(normal: Vec2, edge: f32, refraction_index: f32, scale: f32) -> Vec2 {
    normal * (edge * (refraction_index - 1.0).max(0.0) * REFRACTION_SCALE * scale)
}

/// Per-channel multipliers (red, green, blue) of the refraction offset
pub fn dispersion_scales(dispersion: f32, edge: f32, tier_scale: f32) -> [f32; 3] {
    let spread = dispersion.max(0.0) * DISPERSION_SCALE * edge * tier_scale;
    [1.0 - spread, 1.0, 1.0 + spread]
}

/// Schlick reflectance scaled by the caller's strength
pub fn fresnel(depth: f32, refraction_index: f32, strength: f32) -> f32 {
    let r = (refraction_index - 1.0) / (refraction_index + 1.0);
    let f0 = r * r;
    let grazing = (1.0 - depth).clamp(0.0, 1.0).powi(5);
    ((f0 + (1.0 - f0) * grazing) * strength).clamp(0.0, 1.0)
}

/// In-plane direction the light comes from, bent toward the pointer
pub fn light_direction(glare_angle_degrees: f32, pointer: Option<Vec2>, center: Vec2) -> Vec2 {
    let theta = glare_angle_degrees.to_radians();
    let base = Vec2::new(theta.cos(), theta.sin());

    let Some(pointer) = pointer else {
        return base;
    };
    let toward = (pointer - center).normalize_or_zero();
    if toward == Vec2::zero() {
        return base;
    }

    let bent = (base * (1.0 - POINTER_INFLUENCE) + toward * POINTER_INFLUENCE).normalize_or_zero();
    if bent == Vec2::zero() {
        base
    } else {
        bent
    }
}

/// Blinn-style highlight: a sharp lobe plus a broad, dimmer one
pub fn specular(normal: Vec2, edge: f32, depth: f32, light: Vec2, strength: f32) -> f32 {
    // Normal lifted out of the plane; steeper toward the edge
    let n = normalize3([normal.x * edge, normal.y * edge, 1.0]);
    let l = normalize3([light.x, light.y, 1.0]);
    let h = normalize3([l[0], l[1], l[2] + 1.0]);

    let n_dot_h = (n[0] * h[0] + n[1] * h[1] + n[2] * h[2]).max(0.0);
    let lobe = n_dot_h.powf(SPECULAR_SHARP_POWER) + SPECULAR_BROAD_WEIGHT * n_dot_h.powf(SPECULAR_BROAD_POWER);
    lobe * strength * (1.0 - depth).clamp(0.0, 1.0)
}

fn normalize3(v: [f32; 3]) -> [f32; 3] {
    let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if len > 1e-6 {
        [v[0] / len, v[1] / len, v[2] / len]
    } else {
        [0.0, 0.0, 1.0]
    }
}
