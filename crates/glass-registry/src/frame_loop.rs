// ABOUTME: Per-tick driver: snapshot regions and parameters, advance time, draw.
// ABOUTME: Never waits for fresh layout; a stopped loop ignores further ticks.

use std::sync::Arc;
use std::time::Duration;

use glass_core::{DrawOutcome, FrameSink, Pointer, RenderFrame, SkipReason};

use crate::clock::{FrameClock, FrameTime};
use crate::params::ParamStore;
use crate::registry::RegionRegistry;

/// What one tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Drawn(DrawOutcome),
    /// The sink returned an error; it was logged and the frame dropped
    Failed,
    /// `shutdown` was called; nothing was drawn
    Stopped,
}

pub struct FrameLoop<S: FrameSink> {
    registry: Arc<RegionRegistry>,
    params: Arc<ParamStore>,
    sink: S,
    clock: FrameClock,
    pointer: Pointer,
    device_pixel_ratio: f32,
    surface_size: (u32, u32),
    running: bool,
    last_skip: Option<SkipReason>,
}

impl<S: FrameSink> FrameLoop<S> {
    pub fn new(registry: Arc<RegionRegistry>, params: Arc<ParamStore>, sink: S, surface_size: (u32, u32)) -> Self {
        Self {
            registry,
            params,
            sink,
            clock: FrameClock::new(),
            pointer: Pointer::none(),
            device_pixel_ratio: 1.0,
            surface_size,
            running: true,
            last_skip: None,
        }
    }

    pub fn registry(&self) -> &Arc<RegionRegistry> {
        &self.registry
    }

    pub fn params(&self) -> &Arc<ParamStore> {
        &self.params
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn elapsed(&self) -> f32 {
        self.clock.elapsed()
    }

    pub fn set_pointer(&mut self, pointer: Pointer) {
        self.pointer = pointer;
    }

    pub fn pointer(&self) -> Pointer {
        self.pointer
    }

    /// Surface size in physical pixels and the device pixel ratio
    pub fn set_surface(&mut self, size: (u32, u32), device_pixel_ratio: f32) {
        self.surface_size = size;
        self.device_pixel_ratio = device_pixel_ratio;
    }

    /// Draw one frame using wall-clock time since the previous tick
    pub fn tick(&mut self) -> TickOutcome {
        if !self.running {
            return TickOutcome::Stopped;
        }
        let time = self.clock.tick();
        self.draw(time)
    }

    /// Draw one frame advancing time by `dt`
    pub fn tick_with(&mut self, dt: Duration) -> TickOutcome {
        if !self.running {
            return TickOutcome::Stopped;
        }
        let time = self.clock.tick_with(dt);
        self.draw(time)
    }

    /// Stop ticking and release the sink's resources. Safe to call twice.
    pub fn shutdown(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.sink.teardown();
        tracing::info!(frames = self.clock.frame_index(), "Frame loop stopped");
    }

    /// Build the frame this tick would draw, without drawing it
    pub fn build_frame(&self, elapsed: f32) -> RenderFrame {
        let snapshot = self.registry.snapshot();
        RenderFrame::new(
            elapsed,
            self.pointer,
            self.device_pixel_ratio,
            self.surface_size,
            self.params.current(),
            snapshot.regions,
        )
    }

    fn draw(&mut self, time: FrameTime) -> TickOutcome {
        let frame = self.build_frame(time.elapsed);
        tracing::trace!(
            frame = time.frame_index,
            regions = frame.regions.len(),
            elapsed = time.elapsed,
            "Drawing frame"
        );

        match self.sink.draw(&frame) {
            Ok(DrawOutcome::Presented) => {
                if self.last_skip.take().is_some() {
                    tracing::debug!(frame = time.frame_index, "Drawing resumed");
                }
                TickOutcome::Drawn(DrawOutcome::Presented)
            }
            Ok(DrawOutcome::Skipped(reason)) => {
                if self.last_skip != Some(reason) {
                    tracing::debug!(?reason, "Frame skipped");
                    self.last_skip = Some(reason);
                }
                TickOutcome::Drawn(DrawOutcome::Skipped(reason))
            }
            Err(err) => {
                tracing::warn!(error = %err, frame = time.frame_index, "Frame draw failed");
                TickOutcome::Failed
            }
        }
    }
}

impl<S: FrameSink> Drop for FrameLoop<S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
