// ABOUTME: Per-draw frame snapshot handed from the frame loop to a renderer.
// ABOUTME: Also defines the FrameSink trait that renderers implement.

use std::sync::Arc;

use crate::{GlassRegion, OpticalParameters};

/// Most regions a single draw will evaluate; excess regions are dropped
pub const MAX_REGIONS: usize = 32;

/// Pointer position in surface pixels, if the pointer is over the surface
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pointer {
    pub position: Option<(f32, f32)>,
}

impl Pointer {
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            position: Some((x, y)),
        }
    }

    pub fn none() -> Self {
        Self { position: None }
    }
}

/// Everything one draw call needs. Built once per tick and not retained.
#[derive(Debug, Clone)]
pub struct RenderFrame {
    /// Seconds since the frame loop started
    pub elapsed: f32,
    pub pointer: Pointer,
    pub device_pixel_ratio: f32,
    /// Surface size in physical pixels
    pub surface_size: (u32, u32),
    pub params: Arc<OpticalParameters>,
    /// Enabled regions in registration order, at most `MAX_REGIONS`
    pub regions: Vec<GlassRegion>,
}

impl RenderFrame {
    pub fn new(
        elapsed: f32,
        pointer: Pointer,
        device_pixel_ratio: f32,
        surface_size: (u32, u32),
        params: Arc<OpticalParameters>,
        regions: impl IntoIterator<Item = GlassRegion>,
    ) -> Self {
        let regions = regions
            .into_iter()
            .filter(|r| r.enabled)
            .take(MAX_REGIONS)
            .collect();
        Self {
            elapsed,
            pointer,
            device_pixel_ratio: if device_pixel_ratio > 0.0 {
                device_pixel_ratio
            } else {
                1.0
            },
            surface_size,
            params,
            regions,
        }
    }
}

/// Why a draw produced no image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Backdrop image still decoding, or its load failed
    BackdropPending,
    /// Program failed to build or the surface is unusable this frame
    NotReady,
    /// Rendering context was lost; re-initialization will be attempted
    ContextLost,
    TornDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawOutcome {
    Presented,
    Skipped(SkipReason),
}

/// Something that can draw a `RenderFrame`
pub trait FrameSink {
    type Error: std::error::Error;

    fn draw(&mut self, frame: &RenderFrame) -> Result<DrawOutcome, Self::Error>;

    /// Release every resource. Must be safe to call more than once.
    fn teardown(&mut self);
}
