//! Frame clocks
//!
//! The simulation never schedules itself; whoever drives it pulls a delta
//! from a clock and hands it to `tick`.

use std::time::Instant;

use crate::consts::{MAX_FRAME_DT, SIM_DT};

/// Source of per-frame elapsed time (seconds)
pub trait Clock {
    fn delta(&mut self) -> f32;
}

/// Constant step, for deterministic runs
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    step: f32,
}

impl FixedClock {
    pub fn new(step: f32) -> Self {
        Self { step }
    }

    pub fn from_fps(fps: u32) -> Self {
        Self::new(1.0 / fps.max(1) as f32)
    }
}

impl Default for FixedClock {
    fn default() -> Self {
        Self::new(SIM_DT)
    }
}

impl Clock for FixedClock {
    fn delta(&mut self) -> f32 {
        self.step
    }
}

/// Real elapsed time since the previous call
///
/// Deltas are clamped to `max_step` so a stalled frame (debugger, tab in the
/// background) can't push every entity off the screen at once.
#[derive(Debug, Clone)]
pub struct WallClock {
    last: Instant,
    max_step: f32,
}

impl WallClock {
    pub fn new() -> Self {
        Self::with_max_step(MAX_FRAME_DT)
    }

    pub fn with_max_step(max_step: f32) -> Self {
        Self {
            last: Instant::now(),
            max_step,
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for WallClock {
    fn delta(&mut self) -> f32 {
        let now = Instant::now();
        let dt = now.duration_since(self.last).as_secs_f32();
        self.last = now;
        dt.min(self.max_step)
    }
}
