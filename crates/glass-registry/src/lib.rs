// ABOUTME: Region bookkeeping between the layout owner and the renderer.
// ABOUTME: Thread-safe region registry, atomic parameter store and the per-frame loop.

mod clock;
mod frame_loop;
mod params;
mod registry;

pub use clock::{FrameClock, FrameTime};
pub use frame_loop::{FrameLoop, TickOutcome};
pub use params::ParamStore;
pub use registry::{RegionRegistry, RegionSnapshot};
