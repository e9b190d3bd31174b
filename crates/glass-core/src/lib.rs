// ABOUTME: Shared types and configuration for liquid-glass.
// ABOUTME: Defines glass regions, optical parameters, frame snapshots and config file handling.

pub mod color;
pub mod config;
pub mod frame;
pub mod params;
pub mod region;

pub use color::Color;
pub use config::{BackdropConfig, Config, ConfigError, RegionPreset, WindowSettings};
pub use frame::{DrawOutcome, FrameSink, Pointer, RenderFrame, SkipReason, MAX_REGIONS};
pub use params::{OpticalParameters, ParamsUpdate};
pub use region::{GlassRegion, IntensityTier, Rect, RectUpdate, RegionId};
