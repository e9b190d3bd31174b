// ABOUTME: Resolves a registered glass region into the values the optics need per pixel.
// ABOUTME: Same packing the GPU program receives in its region uniform array.

use glass_core::{GlassRegion, OpticalParameters};

use crate::noise::region_phase;
use crate::shape::roundness_exponent;
use crate::Vec2;

/// Thickness cap in logical pixels
pub const MAX_THICKNESS: f32 = 48.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionGeometry {
    pub center: Vec2,
    pub half_size: Vec2,
    pub exponent: f32,
    /// Distance from the edge at which the glass reaches full depth
    pub thickness: f32,
    pub tier_scale: f32,
    pub phase: f32,
}

impl RegionGeometry {
    pub fn resolve(region: &GlassRegion, params: &OpticalParameters, device_pixel_ratio: f32) -> Self {
        let (cx, cy) = region.rect.center();
        let (hx, hy) = region.rect.half_size();
        let roundness = (region.corner_roundness + params.roundness_bias).clamp(0.0, 1.0);
        let thickness = (hx.min(hy) * 0.5).clamp(1.0, MAX_THICKNESS * device_pixel_ratio.max(1.0));

        Self {
            center: Vec2::new(cx, cy),
            half_size: Vec2::new(hx, hy),
            exponent: roundness_exponent(roundness),
            thickness,
            tier_scale: region.tier.scale(),
            phase: region_phase(region.id),
        }
    }

    /// Zero-area regions never cover a pixel
    pub fn is_degenerate(&self) -> bool {
        self.half_size.x <= 0.0 || self.half_size.y <= 0.0
    }
}
