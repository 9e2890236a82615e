//! Fixed-rate tick timing.
//!
//! The director is advanced in fixed steps so fades progress identically
//! regardless of how fast the host loop spins.

use std::time::{Duration, Instant};

/// Fixed timestep driver.
#[derive(Debug)]
pub struct TickTiming {
    /// Seconds per tick
    fixed_dt: f32,
    /// Wall time of the last poll
    last_poll: Instant,
    /// Unconsumed time
    accumulator: f32,
    /// Maximum delta per poll to prevent spiral of death
    max_dt: f32,
    /// Ticks run since start
    ticks: u64,
}

impl TickTiming {
    /// Create a driver running at `tick_rate` ticks per second.
    #[must_use]
    pub fn new(tick_rate: u32) -> Self {
        Self {
            fixed_dt: 1.0 / tick_rate.max(1) as f32,
            last_poll: Instant::now(),
            accumulator: 0.0,
            max_dt: 0.25,
            ticks: 0,
        }
    }

    /// Seconds per tick.
    #[must_use]
    pub fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    /// Real time of one tick.
    #[must_use]
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f32(self.fixed_dt)
    }

    /// Ticks run so far.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Measure wall time since the last poll and return how many fixed ticks
    /// are due.
    pub fn poll(&mut self) -> u32 {
        let now = Instant::now();
        let dt = (now - self.last_poll).as_secs_f32().min(self.max_dt);
        self.last_poll = now;
        self.accumulate(dt)
    }

    /// Accumulate time for fixed timestep updates.
    /// Returns the number of fixed updates that should be performed.
    pub fn accumulate(&mut self, dt: f32) -> u32 {
        self.accumulator += dt.max(0.0);
        let mut count = 0;

        let max_updates = 10;
        while self.accumulator >= self.fixed_dt && count < max_updates {
            self.accumulator -= self.fixed_dt;
            count += 1;
        }

        // Still behind after the cap: drop the backlog.
        if self.accumulator > self.fixed_dt * 2.0 {
            self.accumulator = 0.0;
        }

        self.ticks += u64::from(count);
        count
    }
}
