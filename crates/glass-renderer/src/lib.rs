// ABOUTME: GPU rendering of liquid glass regions over a backdrop.
// ABOUTME: Uses wgpu to run the glass shader, load backdrops and track GPU resource lifetimes.

pub mod backdrop;
pub mod capture;
mod context;
mod glass_pipeline;
mod gpu;
pub mod program;
pub mod resources;

pub use backdrop::{BackdropError, BackdropLoader, LoadState};
pub use capture::{RecordTarget, SceneRecorder, BACKDROP_FORMAT};
pub use context::{ContextState, RenderContext, RenderError};
pub use glass_pipeline::{glass_program_description, GlassPipeline, GlassUniforms, GLASS_WGSL};
pub use resources::{GpuResource, ResourceKind, ResourceLedger, Tracked};
