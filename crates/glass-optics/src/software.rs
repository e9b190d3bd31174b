// ABOUTME: CPU reference compositor for the glass effect.
// ABOUTME: Renders a RenderFrame over an image backdrop; used for headless drawing and cross-checks.

use std::convert::Infallible;

use glass_core::{DrawOutcome, FrameSink, RenderFrame, SkipReason};
use image::{Rgba, RgbaImage};

use crate::composite::{composite_pixel, BackdropSampler, ImageBackdrop, OpticsContext};
use crate::geometry::RegionGeometry;
use crate::Vec2;

/// Headless renderer producing an `RgbaImage` per frame
#[derive(Debug, Default)]
pub struct SoftwareCompositor {
    backdrop: Option<RgbaImage>,
    last_frame: Option<RgbaImage>,
    frames_drawn: u64,
    torn_down: bool,
}

impl SoftwareCompositor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backdrop(backdrop: RgbaImage) -> Self {
        Self {
            backdrop: Some(backdrop),
            ..Self::default()
        }
    }

    /// Replace the backdrop; frames are skipped while none is set
    pub fn set_backdrop(&mut self, backdrop: Option<RgbaImage>) {
        self.backdrop = backdrop;
    }

    pub fn last_frame(&self) -> Option<&RgbaImage> {
        self.last_frame.as_ref()
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    /// Render one frame over `backdrop` without touching any state
    pub fn render(frame: &RenderFrame, backdrop: &RgbaImage) -> RgbaImage {
        let sampler = ImageBackdrop::new(backdrop, frame.surface_size);
        Self::render_with(frame, &sampler)
    }

    /// Render one frame over any backdrop sampler
    pub fn render_with<S: BackdropSampler + ?Sized>(frame: &RenderFrame, sampler: &S) -> RgbaImage {
        let (width, height) = frame.surface_size;
        let ctx = OpticsContext::from_frame(frame);
        let regions: Vec<RegionGeometry> = frame
            .regions
            .iter()
            .map(|r| RegionGeometry::resolve(r, &frame.params, frame.device_pixel_ratio))
            .collect();

        RgbaImage::from_fn(width, height, |x, y| {
            let pixel = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let color = composite_pixel(pixel, &regions, &ctx, sampler);
            Rgba(color.map(to_unorm8))
        })
    }
}

fn to_unorm8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

impl FrameSink for SoftwareCompositor {
    type Error = Infallible;

    fn draw(&mut self, frame: &RenderFrame) -> Result<DrawOutcome, Self::Error> {
        if self.torn_down {
            return Ok(DrawOutcome::Skipped(SkipReason::TornDown));
        }
        let Some(backdrop) = &self.backdrop else {
            return Ok(DrawOutcome::Skipped(SkipReason::BackdropPending));
        };

        self.last_frame = Some(Self::render(frame, backdrop));
        self.frames_drawn += 1;
        Ok(DrawOutcome::Presented)
    }

    fn teardown(&mut self) {
        if !self.torn_down {
            tracing::debug!(frames = self.frames_drawn, "Software compositor torn down");
        }
        self.torn_down = true;
        self.backdrop = None;
        self.last_frame = None;
    }
}
