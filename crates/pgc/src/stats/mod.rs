//! Stats Module - GC Performance Monitoring
//!
//! Collects cumulative GC statistics for:
//! - Performance tuning
//! - Tests that assert on reclamation totals
//! - Debugging & profiling
//!
//! Metrics:
//! - Cycle counts, split by trigger
//! - Objects and bytes reclaimed
//! - Pause time (total, max)

pub mod gc_cycle;
pub mod timer;

pub use gc_cycle::{CollectionReport, PhaseTiming};
pub use timer::GcTimer;

use crate::gc::Trigger;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// GcStats - cumulative statistics for one collector
pub struct GcStats {
    /// Total GC cycles
    total_cycles: AtomicU64,
    /// Cycles requested through `collect()`
    explicit_cycles: AtomicU64,
    /// Cycles forced by a failed allocation
    allocation_cycles: AtomicU64,
    /// Allocations that failed even after collecting
    out_of_memory: AtomicU64,
    objects_reclaimed: AtomicU64,
    bytes_reclaimed: AtomicU64,
    total_pause_us: AtomicU64,
    max_pause_us: AtomicU64,
    /// Start time
    start_time: Instant,
}

impl GcStats {
    /// Create new stats collector
    pub fn new() -> Self {
        Self {
            total_cycles: AtomicU64::new(0),
            explicit_cycles: AtomicU64::new(0),
            allocation_cycles: AtomicU64::new(0),
            out_of_memory: AtomicU64::new(0),
            objects_reclaimed: AtomicU64::new(0),
            bytes_reclaimed: AtomicU64::new(0),
            total_pause_us: AtomicU64::new(0),
            max_pause_us: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a completed collection
    pub fn record_collection(&self, report: &CollectionReport) {
        self.total_cycles.fetch_add(1, Ordering::Relaxed);

        match report.trigger {
            Trigger::Explicit => self.explicit_cycles.fetch_add(1, Ordering::Relaxed),
            Trigger::AllocationFailure => self.allocation_cycles.fetch_add(1, Ordering::Relaxed),
        };

        self.objects_reclaimed
            .fetch_add(report.reclaimed as u64, Ordering::Relaxed);
        self.bytes_reclaimed
            .fetch_add(report.bytes_reclaimed() as u64, Ordering::Relaxed);
        self.total_pause_us
            .fetch_add(report.duration_us, Ordering::Relaxed);
        self.max_pause_us
            .fetch_max(report.duration_us, Ordering::Relaxed);
    }

    pub fn record_out_of_memory(&self) {
        self.out_of_memory.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_cycles(&self) -> u64 {
        self.total_cycles.load(Ordering::Relaxed)
    }

    /// Get summary statistics
    pub fn summary(&self) -> GcSummary {
        let total_cycles = self.total_cycles();
        let total_pause_us = self.total_pause_us.load(Ordering::Relaxed);

        GcSummary {
            total_cycles,
            explicit_cycles: self.explicit_cycles.load(Ordering::Relaxed),
            allocation_cycles: self.allocation_cycles.load(Ordering::Relaxed),
            out_of_memory: self.out_of_memory.load(Ordering::Relaxed),
            objects_reclaimed: self.objects_reclaimed.load(Ordering::Relaxed),
            bytes_reclaimed: self.bytes_reclaimed.load(Ordering::Relaxed),
            avg_pause_ms: if total_cycles > 0 {
                total_pause_us as f64 / total_cycles as f64 / 1000.0
            } else {
                0.0
            },
            max_pause_ms: self.max_pause_us.load(Ordering::Relaxed) as f64 / 1000.0,
            total_pause_ms: total_pause_us as f64 / 1000.0,
            uptime_secs: self.start_time.elapsed().as_secs(),
        }
    }

    /// Reset statistics
    pub fn reset(&self) {
        for counter in [
            &self.total_cycles,
            &self.explicit_cycles,
            &self.allocation_cycles,
            &self.out_of_memory,
            &self.objects_reclaimed,
            &self.bytes_reclaimed,
            &self.total_pause_us,
            &self.max_pause_us,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for GcStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary statistics
#[derive(Debug, Default, Clone, Serialize)]
pub struct GcSummary {
    /// Total GC cycles
    pub total_cycles: u64,
    pub explicit_cycles: u64,
    pub allocation_cycles: u64,
    pub out_of_memory: u64,
    pub objects_reclaimed: u64,
    pub bytes_reclaimed: u64,
    /// Average pause time (ms)
    pub avg_pause_ms: f64,
    /// Max pause time (ms)
    pub max_pause_ms: f64,
    pub total_pause_ms: f64,
    /// Uptime (seconds)
    pub uptime_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CollectionStrategy;
    use crate::marker::MarkStats;

    fn report(trigger: Trigger, reclaimed: usize, duration_us: u64) -> CollectionReport {
        CollectionReport {
            cycle: 1,
            trigger,
            strategy: CollectionStrategy::Copying,
            workers: 1,
            objects_before: reclaimed + 1,
            objects_after: 1,
            reclaimed,
            bytes_before: 16 * (reclaimed + 1),
            bytes_after: 16,
            duration_us,
            phases: Vec::new(),
            mark: MarkStats::default(),
            sweep: None,
            evacuation: None,
        }
    }

    #[test]
    fn test_record_collection() {
        let stats = GcStats::new();
        stats.record_collection(&report(Trigger::Explicit, 3, 500));
        stats.record_collection(&report(Trigger::AllocationFailure, 1, 1500));
        stats.record_out_of_memory();

        let summary = stats.summary();
        assert_eq!(summary.total_cycles, 2);
        assert_eq!(summary.explicit_cycles, 1);
        assert_eq!(summary.allocation_cycles, 1);
        assert_eq!(summary.out_of_memory, 1);
        assert_eq!(summary.objects_reclaimed, 4);
        assert_eq!(summary.bytes_reclaimed, 64);
        assert!((summary.max_pause_ms - 1.5).abs() < 1e-9);
        assert!((summary.avg_pause_ms - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_reset() {
        let stats = GcStats::new();
        stats.record_collection(&report(Trigger::Explicit, 3, 500));
        stats.reset();
        assert_eq!(stats.summary().total_cycles, 0);
        assert_eq!(stats.summary().max_pause_ms, 0.0);
    }
}
