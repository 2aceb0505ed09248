//! Frame timing and delta time.
//!
//! The world has no clock of its own: [`Schedule::run`](crate::ecs::Schedule::run)
//! takes `dt` as an argument. [`Time`] is the small helper a host loop uses to
//! produce it.
//!
//! ```
//! use stofn::prelude::*;
//!
//! let mut time = Time::new();
//! let mut world = World::new();
//! let mut schedule = Schedule::new();
//! time.tick();
//! schedule.run(&mut world, time.delta_secs()).unwrap();
//! ```

use std::time::{Duration, Instant};

/// Wall-clock frame timer.
#[derive(Debug, Clone, Copy)]
pub struct Time {
    /// When the clock was created.
    startup: Instant,
    /// When the current frame started.
    frame_start: Instant,
    /// Duration of the previous frame.
    delta: Duration,
    /// Total time since startup.
    elapsed: Duration,
    frame_count: u64,
}

impl Time {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            startup: now,
            frame_start: now,
            delta: Duration::ZERO,
            elapsed: Duration::ZERO,
            frame_count: 0,
        }
    }

    /// Call at the start of each frame to update timing.
    pub fn tick(&mut self) {
        self.advance_to(Instant::now());
    }

    /// Advance by a fixed step instead of reading the wall clock. Handy for
    /// headless runs and tests.
    pub fn tick_fixed(&mut self, step: Duration) {
        let next = self.frame_start + step;
        self.advance_to(next);
    }

    fn advance_to(&mut self, now: Instant) {
        self.delta = now.saturating_duration_since(self.frame_start);
        self.frame_start = now;
        self.elapsed = now.saturating_duration_since(self.startup);
        self.frame_count += 1;
    }

    /// Duration of the previous frame.
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Delta time in seconds (f32), the most common way to use it.
    pub fn delta_secs(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Total elapsed time since the clock was created.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn elapsed_secs(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    /// Number of ticks so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Estimated FPS based on the last frame's delta.
    pub fn fps(&self) -> f32 {
        if self.delta.as_secs_f32() > 0.0 {
            1.0 / self.delta.as_secs_f32()
        } else {
            0.0
        }
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}
