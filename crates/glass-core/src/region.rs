// ABOUTME: Glass region data model.
// ABOUTME: Identity, pixel-space rectangle, corner roundness and intensity tier of one glass area.

use serde::{Deserialize, Serialize};

/// Opaque region identity, stable for the lifetime of a registered region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionId(pub u64);

/// Rectangle in surface pixel coordinates (y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    pub fn half_size(&self) -> (f32, f32) {
        (self.width.max(0.0) * 0.5, self.height.max(0.0) * 0.5)
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }

    /// Zero-area rects are kept in the registry but never produce coverage
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
            width: self.width * factor,
            height: self.height * factor,
        }
    }
}

/// Partial geometry change; `None` fields keep their current value
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RectUpdate {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub width: Option<f32>,
    pub height: Option<f32>,
}

impl RectUpdate {
    pub fn position(x: f32, y: f32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Default::default()
        }
    }

    pub fn size(width: f32, height: f32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Default::default()
        }
    }

    pub fn apply(&self, rect: &mut Rect) {
        if let Some(x) = self.x {
            rect.x = x;
        }
        if let Some(y) = self.y {
            rect.y = y;
        }
        if let Some(width) = self.width {
            rect.width = width;
        }
        if let Some(height) = self.height {
            rect.height = height;
        }
    }
}

impl From<Rect> for RectUpdate {
    fn from(rect: Rect) -> Self {
        Self {
            x: Some(rect.x),
            y: Some(rect.y),
            width: Some(rect.width),
            height: Some(rect.height),
        }
    }
}

/// How strongly the optical effects apply to one region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IntensityTier {
    /// Subtle glass
    Light,
    #[default]
    Normal,
    /// Dramatic, thick-looking glass
    Heavy,
}

impl IntensityTier {
    /// Multiplier applied to refraction, dispersion, fresnel, glare and tint
    pub fn scale(&self) -> f32 {
        match self {
            IntensityTier::Light => 0.5,
            IntensityTier::Normal => 1.0,
            IntensityTier::Heavy => 1.6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlassRegion {
    pub id: RegionId,
    pub rect: Rect,
    /// 0 = rectangular, 1 = ellipse
    pub corner_roundness: f32,
    pub tier: IntensityTier,
    /// Disabled regions stay registered but are skipped when drawing
    pub enabled: bool,
}

impl GlassRegion {
    pub fn new(id: RegionId, rect: Rect, corner_roundness: f32, tier: IntensityTier) -> Self {
        Self {
            id,
            rect,
            corner_roundness: clamp_roundness(corner_roundness),
            tier,
            enabled: true,
        }
    }

    pub fn set_roundness(&mut self, roundness: f32) {
        self.corner_roundness = clamp_roundness(roundness);
    }
}

fn clamp_roundness(roundness: f32) -> f32 {
    if roundness.is_nan() {
        0.0
    } else {
        roundness.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_update_keeps_untouched_fields() {
        let mut rect = Rect::new(10.0, 20.0, 100.0, 50.0);
        RectUpdate::position(30.0, 40.0).apply(&mut rect);
        assert_eq!(rect, Rect::new(30.0, 40.0, 100.0, 50.0));

        RectUpdate::size(8.0, 9.0).apply(&mut rect);
        assert_eq!(rect, Rect::new(30.0, 40.0, 8.0, 9.0));
    }

    #[test]
    fn roundness_is_clamped() {
        let mut region = GlassRegion::new(RegionId(1), Rect::default(), 1.7, IntensityTier::Light);
        assert_eq!(region.corner_roundness, 1.0);
        region.set_roundness(-0.3);
        assert_eq!(region.corner_roundness, 0.0);
        region.set_roundness(f32::NAN);
        assert_eq!(region.corner_roundness, 0.0);
    }

    #[test]
    fn tiers_scale_in_order() {
        let scales: Vec<f32> = [IntensityTier::Light, IntensityTier::Normal, IntensityTier::Heavy]
            .iter()
            .map(|t| t.scale())
            .collect();
        assert!(scales.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(IntensityTier::default().scale(), 1.0);
    }

    #[test]
    fn rect_center_and_contains() {
        let rect = Rect::new(100.0, 100.0, 200.0, 150.0);
        assert_eq!(rect.center(), (200.0, 175.0));
        assert_eq!(rect.half_size(), (100.0, 75.0));
        assert!(rect.contains(100.0, 100.0));
        assert!(!rect.contains(300.0, 175.0));
    }
}
