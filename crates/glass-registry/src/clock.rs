// ABOUTME: Frame timing for the render loop.
// ABOUTME: Clamped per-frame delta, frame counter and the elapsed-time accumulator.

use std::time::{Duration, Instant};

/// Timing of one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTime {
    /// Seconds since the previous tick, clamped
    pub dt: f32,
    /// Seconds accumulated over every tick so far
    pub elapsed: f32,
    pub frame_index: u64,
}

/// Delta is clamped so a stall (debugger, minimized window) does not make
/// the wobble animation jump.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Option<Instant>,
    elapsed: f64,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        Self {
            last: None,
            elapsed: 0.0,
            frame_index: 0,
            dt_min: dt_min.min(dt_max),
            dt_max,
        }
    }

    /// Advance by the wall-clock time since the previous tick
    pub fn tick(&mut self) -> FrameTime {
        let now = Instant::now();
        let dt = match self.last {
            Some(last) => now.saturating_duration_since(last),
            None => Duration::ZERO,
        };
        self.last = Some(now);
        self.advance(dt)
    }

    /// Advance by an explicit delta
    pub fn tick_with(&mut self, dt: Duration) -> FrameTime {
        self.advance(dt)
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed as f32
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    fn advance(&mut self, dt: Duration) -> FrameTime {
        // The very first frame starts the animation at zero
        let dt = if self.frame_index == 0 && dt.is_zero() {
            Duration::ZERO
        } else {
            dt.clamp(self.dt_min, self.dt_max)
        };
        self.elapsed += dt.as_secs_f64();

        let time = FrameTime {
            dt: dt.as_secs_f32(),
            elapsed: self.elapsed as f32,
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_ticks_accumulate() {
        let mut clock = FrameClock::new();
        let first = clock.tick_with(Duration::from_millis(16));
        let second = clock.tick_with(Duration::from_millis(16));

        assert_eq!(first.frame_index, 0);
        assert_eq!(second.frame_index, 1);
        assert!((second.elapsed - 0.032).abs() < 1e-6);
    }

    #[test]
    fn long_stalls_are_clamped() {
        let mut clock = FrameClock::new();
        let time = clock.tick_with(Duration::from_secs(5));
        assert!((time.dt - 0.25).abs() < 1e-6);
        assert!((clock.elapsed() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn first_wall_clock_tick_starts_at_zero() {
        let mut clock = FrameClock::new();
        let time = clock.tick();
        assert_eq!(time.elapsed, 0.0);
        assert_eq!(clock.frame_index(), 1);
    }
}
