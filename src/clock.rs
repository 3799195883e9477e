//! Simulation clock
//!
//! Supplies the monotonically increasing elapsed time that drives the
//! particle field. The field never integrates frame deltas, it only compares
//! timers against this absolute value.

use std::cell::Cell;
use std::time::Instant;

/// Source of elapsed simulation time in seconds
///
/// Time is `f64` so consecutive frames stay distinct after days of uptime;
/// an `f32` second count stops resolving 60 Hz frames after about three days.
pub trait Clock {
    /// Seconds since the clock started. Never decreases.
    fn elapsed(&self) -> f64;
}

/// Wall clock backed by [`Instant`]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    /// Starts counting from now
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn elapsed(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

/// Clock advanced by hand
///
/// Used for deterministic runs: tests feed it synthetic time sequences and
/// drive the scheduler frame by frame.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<f64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves time forward by `seconds`. Negative steps are ignored.
    pub fn advance(&self, seconds: f64) {
        if seconds > 0.0 {
            self.now.set(self.now.get() + seconds);
        }
    }

    /// Jumps to an absolute time, never going backwards
    pub fn set(&self, seconds: f64) {
        if seconds > self.now.get() {
            self.now.set(seconds);
        }
    }
}

impl Clock for ManualClock {
    fn elapsed(&self) -> f64 {
        self.now.get()
    }
}
