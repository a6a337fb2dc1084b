//! GC Cycle Statistics
//!
//! One `CollectionReport` per completed cycle: object and byte counts
//! before and after, the per-phase timings, and the statistics of whichever
//! reclaimer ran.

use crate::config::CollectionStrategy;
use crate::gc::Trigger;
use crate::gc_threads::GcPhase;
use crate::marker::MarkStats;
use crate::relocate::EvacuationStats;
use crate::sweep::SweepStats;
use serde::Serialize;
use std::fmt;

/// Wall time of one phase, barrier to barrier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PhaseTiming {
    pub phase: GcPhase,
    pub duration_us: u64,
}

/// Report of a completed collection cycle
#[derive(Debug, Clone, Serialize)]
pub struct CollectionReport {
    /// Cycle number, starting at 1
    pub cycle: u64,
    pub trigger: Trigger,
    pub strategy: CollectionStrategy,
    pub workers: usize,

    /// Object statistics
    pub objects_before: usize,
    pub objects_after: usize,
    pub reclaimed: usize,

    /// Memory statistics
    pub bytes_before: usize,
    pub bytes_after: usize,

    /// Phase timings
    pub duration_us: u64,
    pub phases: Vec<PhaseTiming>,

    pub mark: MarkStats,
    /// Present for mark-sweep cycles
    pub sweep: Option<SweepStats>,
    /// Present for copying cycles
    pub evacuation: Option<EvacuationStats>,
}

impl CollectionReport {
    /// Bytes freed by the cycle
    pub fn bytes_reclaimed(&self) -> usize {
        self.bytes_before.saturating_sub(self.bytes_after)
    }

    /// Duration of `phase`, if it ran
    pub fn phase_us(&self, phase: GcPhase) -> Option<u64> {
        self.phases
            .iter()
            .find(|timing| timing.phase == phase)
            .map(|timing| timing.duration_us)
    }

    /// Survivor ratio (0.0 - 1.0)
    pub fn survival_rate(&self) -> f64 {
        if self.objects_before == 0 {
            return 1.0;
        }
        self.objects_after as f64 / self.objects_before as f64
    }
}

impl fmt::Display for CollectionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] objects collected, [{}] objects remaining.",
            self.reclaimed, self.objects_after
        )
    }
}
