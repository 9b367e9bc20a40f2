//! Frame timer for the application loop

use std::time::{Duration, Instant};

/// Measures the time between consecutive `tick()` calls
///
/// `delta_time()` is 0 until the second tick and never negative.
#[derive(Debug, Clone)]
pub struct GameTimer {
    base: Instant,
    previous: Instant,
    delta: Duration,
}

impl GameTimer {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            base: now,
            previous: now,
            delta: Duration::ZERO,
        }
    }

    /// Restart timing from now
    pub fn reset(&mut self) {
        self.reset_at(Instant::now());
    }

    /// Record a frame boundary
    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    /// Seconds between the last two ticks
    pub fn delta_time(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Seconds from the last reset to the last tick
    pub fn total_time(&self) -> f32 {
        self.previous.duration_since(self.base).as_secs_f32()
    }

    pub(crate) fn reset_at(&mut self, now: Instant) {
        self.base = now;
        self.previous = now;
        self.delta = Duration::ZERO;
    }

    pub(crate) fn tick_at(&mut self, now: Instant) {
        // saturating: Instant is monotonic, but callers may pass older instants
        self.delta = now.saturating_duration_since(self.previous);
        if now > self.previous {
            self.previous = now;
        }
    }
}

impl Default for GameTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "timer_tests.rs"]
mod tests;
