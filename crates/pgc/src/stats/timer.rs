//! GC Timer - Timing Utilities
//!
//! Utility for timing GC cycles and phases.

use std::time::{Duration, Instant};

/// GcTimer - timer for measuring GC operations
#[derive(Debug, Clone, Copy)]
pub struct GcTimer {
    start: Instant,
}

impl GcTimer {
    /// Create new timer
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed time
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Get elapsed nanoseconds
    pub fn elapsed_ns(&self) -> u64 {
        self.elapsed().as_nanos() as u64
    }

    /// Get elapsed microseconds
    pub fn elapsed_us(&self) -> u64 {
        self.elapsed().as_micros() as u64
    }

    /// Get elapsed milliseconds
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed().as_secs_f64() * 1000.0
    }

    /// Elapsed microseconds, then restart
    pub fn lap_us(&mut self) -> u64 {
        let elapsed = self.elapsed_us();
        self.start = Instant::now();
        elapsed
    }
}

impl Default for GcTimer {
    fn default() -> Self {
        Self::new()
    }
}
