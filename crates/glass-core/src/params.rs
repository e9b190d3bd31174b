// ABOUTME: Global optical parameters shared by every glass region.
// ABOUTME: Controls refraction, dispersion, blur, fresnel, glare, wobble, tint and roundness bias.

use serde::{Deserialize, Serialize};

use crate::Color;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpticalParameters {
    /// Index of refraction of the glass (1.0 = no bending)
    pub refraction_index: f32,

    /// Chromatic dispersion amount (0 = none, ~7 = strong fringes)
    pub dispersion: f32,

    /// Backdrop blur radius in logical pixels
    pub blur_radius: f32,

    /// Rim reflectivity (0.0 = none, 1.0 = strong)
    pub fresnel_strength: f32,

    /// Specular glint strength (0.0 = none, 1.0 = strong)
    pub glare_strength: f32,

    /// Direction the synthetic light comes from, in degrees
    pub glare_angle: f32,

    /// Edge undulation amount (0.0 = static shape, 1.0 = very liquid)
    pub liquid_wobble: f32,

    /// Tint color mixed into the glass body
    pub tint: Color,

    /// How much of the tint color is mixed in (0.0 = clear)
    pub tint_intensity: f32,

    /// Added to every region's corner roundness before shaping
    pub roundness_bias: f32,
}

impl Default for OpticalParameters {
    fn default() -> Self {
        Self::liquid()
    }
}

impl OpticalParameters {
    /// Liquid preset - strong bending and fringes, gentle wobble
    pub fn liquid() -> Self {
        Self {
            refraction_index: 1.45,
            dispersion: 4.0,
            blur_radius: 2.0,
            fresnel_strength: 0.6,
            glare_strength: 0.5,
            glare_angle: 315.0,
            liquid_wobble: 0.25,
            tint: Color::WHITE,
            tint_intensity: 0.08,
            roundness_bias: 0.0,
        }
    }

    /// Frosted preset - heavy blur, cold tint, almost no bending
    pub fn frosted() -> Self {
        Self {
            refraction_index: 1.1,
            dispersion: 0.5,
            blur_radius: 12.0,
            fresnel_strength: 0.35,
            glare_strength: 0.2,
            glare_angle: 300.0,
            liquid_wobble: 0.0,
            tint: Color::ICE,
            tint_intensity: 0.22,
            roundness_bias: 0.0,
        }
    }

    /// Crystal preset - clear body, sharp glints and wide fringes
    pub fn crystal() -> Self {
        Self {
            refraction_index: 1.7,
            dispersion: 9.0,
            blur_radius: 0.0,
            fresnel_strength: 0.8,
            glare_strength: 0.9,
            glare_angle: 330.0,
            liquid_wobble: 0.0,
            tint: Color::WHITE,
            tint_intensity: 0.02,
            roundness_bias: -0.1,
        }
    }

    pub fn presets() -> Vec<(&'static str, OpticalParameters)> {
        vec![
            ("liquid", Self::liquid()),
            ("frosted", Self::frosted()),
            ("crystal", Self::crystal()),
        ]
    }

    /// Bring every field into its usable range; NaN falls back to the default
    pub fn sanitized(&self) -> Self {
        let fallback = Self::liquid();
        Self {
            refraction_index: clamp_or(self.refraction_index, 1.0, 3.0, fallback.refraction_index),
            dispersion: clamp_or(self.dispersion, 0.0, 20.0, fallback.dispersion),
            blur_radius: clamp_or(self.blur_radius, 0.0, 32.0, fallback.blur_radius),
            fresnel_strength: clamp_or(self.fresnel_strength, 0.0, 1.0, fallback.fresnel_strength),
            glare_strength: clamp_or(self.glare_strength, 0.0, 1.0, fallback.glare_strength),
            glare_angle: if self.glare_angle.is_finite() {
                self.glare_angle.rem_euclid(360.0)
            } else {
                fallback.glare_angle
            },
            liquid_wobble: clamp_or(self.liquid_wobble, 0.0, 1.0, fallback.liquid_wobble),
            tint: self.tint.clamped(),
            tint_intensity: clamp_or(self.tint_intensity, 0.0, 1.0, fallback.tint_intensity),
            roundness_bias: clamp_or(self.roundness_bias, -1.0, 1.0, fallback.roundness_bias),
        }
    }
}

fn clamp_or(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(min, max)
    }
}

/// Partial parameter change applied as a whole-struct replacement
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamsUpdate {
    pub refraction_index: Option<f32>,
    pub dispersion: Option<f32>,
    pub blur_radius: Option<f32>,
    pub fresnel_strength: Option<f32>,
    pub glare_strength: Option<f32>,
    pub glare_angle: Option<f32>,
    pub liquid_wobble: Option<f32>,
    pub tint: Option<Color>,
    pub tint_intensity: Option<f32>,
    pub roundness_bias: Option<f32>,
}

impl ParamsUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Build the complete replacement for `current`
    pub fn apply_to(&self, current: &OpticalParameters) -> OpticalParameters {
        OpticalParameters {
            refraction_index: self.refraction_index.unwrap_or(current.refraction_index),
            dispersion: self.dispersion.unwrap_or(current.dispersion),
            blur_radius: self.blur_radius.unwrap_or(current.blur_radius),
            fresnel_strength: self.fresnel_strength.unwrap_or(current.fresnel_strength),
            glare_strength: self.glare_strength.unwrap_or(current.glare_strength),
            glare_angle: self.glare_angle.unwrap_or(current.glare_angle),
            liquid_wobble: self.liquid_wobble.unwrap_or(current.liquid_wobble),
            tint: self.tint.unwrap_or(current.tint),
            tint_intensity: self.tint_intensity.unwrap_or(current.tint_intensity),
            roundness_bias: self.roundness_bias.unwrap_or(current.roundness_bias),
        }
        .sanitized()
    }
}
