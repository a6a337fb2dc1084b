//! GC Core Module - Garbage Collection Cycle Management
//!
//! `Collector` is the orchestrator and the client surface in one value. It
//! owns the partitioned heap, the root set and the worker pool, and drives
//! every collection through the pool's barriers:
//!
//! ```text
//!          allocation failure / collect()
//!   Idle ─────────────────────────────────▶ Marking
//!    ▲                                         │ N mark reports
//!    │                     ┌───────────────────┴──────────────────┐
//!    │                     ▼ mark-sweep                           ▼ copying
//!    │                 Sweeping                               Copying
//!    │                     │ N sweep reports        N evacuate reports, then
//!    │                     │                        N fixup reports, roots remapped
//!    └─────────────────────┴──────────────────────────────────────┘
//! ```
//!
//! Collection is stop-the-world. Every client operation takes the internal
//! allocation mutex, and a cycle runs while holding it, so mutators never
//! observe a heap mid-collection.

use crate::config::{CollectionStrategy, GcConfig};
use crate::ensure_invariant;
use crate::error::{GcError, Result};
use crate::gc_threads::{Command, GcPhase, GcThreadPool, MarkJob, PhaseOutcome};
use crate::heap::{Heap, HeapStats};
use crate::logging::{GcEvent, GcLogger, GcLoggerConfig};
use crate::marker::{MarkShared, MarkStats, RootSet};
use crate::object::{HeapObject, ObjRef, ObjectKind};
use crate::relocate::{forward, EvacuationStats};
use crate::stats::{CollectionReport, GcStats, GcSummary, GcTimer, PhaseTiming};
use crate::sweep::SweepStats;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// GC cycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GcState {
    /// Idle - no GC in progress
    Idle,
    /// Marking phase - identifying live objects
    Marking,
    /// Sweeping phase - freeing dead blocks (mark-sweep)
    Sweeping,
    /// Copying phase - evacuation and fixup (copying)
    Copying,
}

impl fmt::Display for GcState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GcState::Idle => write!(f, "idle"),
            GcState::Marking => write!(f, "marking"),
            GcState::Sweeping => write!(f, "sweeping"),
            GcState::Copying => write!(f, "copying"),
        }
    }
}

/// Reason for GC trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Trigger {
    /// Explicit GC request (`collect()`)
    Explicit,
    /// An allocation found no space
    AllocationFailure,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Explicit => write!(f, "explicit"),
            Trigger::AllocationFailure => write!(f, "allocation failure"),
        }
    }
}

/// Result of a mark-only pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceReport {
    /// Every reachable object, sorted
    pub reachable: Vec<ObjRef>,
    pub visits: usize,
    pub marked: usize,
}

/// State guarded by the allocation mutex
struct MutatorState {
    roots: RootSet,
    /// Home partition for the next allocation
    next_partition: usize,
}

/// Collector - parallel tracing garbage collector
///
/// ## Thread Safety
///
/// Every method takes `&self`; `Collector` is `Send + Sync` and can be
/// shared through an `Arc`. Client operations are serialized internally.
///
/// # Examples
///
/// ```rust
/// use pgc::{Collector, GcConfig};
///
/// let gc = Collector::new(GcConfig::default()).unwrap();
/// let one = gc.create_scalar(1).unwrap();
/// let two = gc.create_scalar(2).unwrap();
/// let pair = gc.create_pair(Some(one), Some(two)).unwrap();
///
/// gc.pop_root();
/// let report = gc.collect().unwrap();
/// assert_eq!(report.reclaimed, 3);
/// # let _ = pair;
/// ```
pub struct Collector {
    config: GcConfig,
    heap: Arc<Heap>,
    pool: GcThreadPool,
    mutator: Mutex<MutatorState>,
    state: Mutex<GcState>,
    cycle_count: AtomicU64,
    stats: GcStats,
    logger: Arc<GcLogger>,
    shut_down: AtomicBool,
}

impl Collector {
    /// Create a collector and spawn its worker pool
    ///
    /// # Errors
    /// `GcError::Configuration` for an invalid config, `GcError::WorkerSpawn`
    /// if a worker thread cannot be started.
    pub fn new(config: GcConfig) -> Result<Self> {
        config.validate()?;

        let heap = Arc::new(Heap::new(&config)?);
        let logger = Arc::new(GcLogger::new(GcLoggerConfig::from_gc_config(&config)));
        let pool = GcThreadPool::new(Arc::clone(&heap), Arc::clone(&logger), config.mark_stall)?;

        log::info!(
            "pgc collector started: {}, {} bytes, {} workers",
            config.strategy,
            config.heap_size,
            config.worker_threads
        );

        Ok(Self {
            config,
            heap,
            pool,
            mutator: Mutex::new(MutatorState {
                roots: RootSet::new(),
                next_partition: 0,
            }),
            state: Mutex::new(GcState::Idle),
            cycle_count: AtomicU64::new(0),
            stats: GcStats::new(),
            logger,
            shut_down: AtomicBool::new(false),
        })
    }

    /// Allocate a scalar and push it as a root
    pub fn create_scalar(&self, value: i64) -> Result<ObjRef> {
        self.ensure_running()?;
        let mut mutator = self.mutator.lock();
        let base = mutator.roots.len();
        let r = self.allocate_with_retry(&mut mutator, base, |_| HeapObject::Scalar(value))?;
        mutator.roots.push(r);
        Ok(r)
    }

    /// Allocate a pair and push it as a root
    ///
    /// Operands sitting on top of the root stack, in order, are consumed:
    /// `create_pair(Some(a), Some(b))` with roots `[.., a, b]` leaves
    /// `[.., pair]`. Operands stay alive (and are remapped) across any
    /// collection the allocation triggers.
    pub fn create_pair(&self, first: Option<ObjRef>, second: Option<ObjRef>) -> Result<ObjRef> {
        self.ensure_running()?;
        let mut mutator = self.mutator.lock();

        let operands: Vec<ObjRef> = [first, second].into_iter().flatten().collect();
        for &operand in &operands {
            self.heap.validate(operand)?;
        }

        let consumed = consumed_operands(mutator.roots.as_slice(), &operands);
        let base = mutator.roots.len();
        for &operand in &operands {
            mutator.roots.push(operand);
        }

        let result = self.allocate_with_retry(&mut mutator, base, |current| {
            let mut current = current.iter().copied();
            let first = first.and_then(|_| current.next());
            let second = second.and_then(|_| current.next());
            HeapObject::pair(first, second)
        });

        mutator.roots.truncate(base);
        let r = result?;
        mutator.roots.truncate(base - consumed);
        mutator.roots.push(r);
        Ok(r)
    }

    /// One allocation attempt without collecting
    ///
    /// `Ok(None)` means the heap is full; the caller decides whether to
    /// `collect()`. On success the object is pushed as a root.
    pub fn try_allocate(&self, object: HeapObject) -> Result<Option<ObjRef>> {
        self.ensure_running()?;
        let mut mutator = self.mutator.lock();
        for child in object.children() {
            self.heap.validate(child)?;
        }

        let placed = self.try_place(&mut mutator, object);
        if let Some(r) = placed {
            mutator.roots.push(r);
        }
        Ok(placed)
    }

    /// Push an existing object onto the root stack
    pub fn push_root(&self, r: ObjRef) -> Result<()> {
        self.ensure_running()?;
        let mut mutator = self.mutator.lock();
        self.heap.validate(r)?;
        mutator.roots.push(r);
        Ok(())
    }

    /// Pop the topmost root
    pub fn pop_root(&self) -> Option<ObjRef> {
        self.mutator.lock().roots.pop()
    }

    /// Current root stack, bottom first
    pub fn roots(&self) -> Vec<ObjRef> {
        self.mutator.lock().roots.as_slice().to_vec()
    }

    pub fn root_count(&self) -> usize {
        self.mutator.lock().roots.len()
    }

    /// Run a full collection cycle now
    pub fn collect(&self) -> Result<CollectionReport> {
        self.ensure_running()?;
        let mut mutator = self.mutator.lock();
        self.run_cycle(&mut mutator, Trigger::Explicit)
    }

    /// Mark from the current roots without reclaiming anything
    pub fn trace(&self) -> Result<TraceReport> {
        self.ensure_running()?;
        let mutator = self.mutator.lock();
        let cycle = self.cycle_count.load(Ordering::Relaxed);

        self.set_state(GcState::Marking);
        let result = self.mark_phase(cycle, &mutator.roots).map(|(stats, _)| {
            let mut reachable = self.heap.marked_refs();
            reachable.sort();
            TraceReport {
                reachable,
                visits: stats.visits,
                marked: stats.marked,
            }
        });
        self.heap.clear_marks();
        self.set_state(GcState::Idle);

        result
    }

    /// Copy of the object behind `r`
    pub fn object(&self, r: ObjRef) -> Result<HeapObject> {
        let _mutator = self.mutator.lock();
        self.heap.get(r)
    }

    pub fn scalar_value(&self, r: ObjRef) -> Result<i64> {
        match self.object(r)? {
            HeapObject::Scalar(value) => Ok(value),
            other => Err(type_mismatch(r, ObjectKind::Scalar, other.kind())),
        }
    }

    pub fn pair_fields(&self, r: ObjRef) -> Result<(Option<ObjRef>, Option<ObjRef>)> {
        match self.object(r)? {
            HeapObject::Pair { first, second } => Ok((first, second)),
            other => Err(type_mismatch(r, ObjectKind::Pair, other.kind())),
        }
    }

    pub fn set_first(&self, pair: ObjRef, value: Option<ObjRef>) -> Result<()> {
        self.update_pair(pair, |first, _| *first = value, value)
    }

    pub fn set_second(&self, pair: ObjRef, value: Option<ObjRef>) -> Result<()> {
        self.update_pair(pair, |_, second| *second = value, value)
    }

    /// Overwrite both fields of a pair
    pub fn set_pair(&self, pair: ObjRef, first: Option<ObjRef>, second: Option<ObjRef>) -> Result<()> {
        self.ensure_running()?;
        let _mutator = self.mutator.lock();
        for value in [first, second].into_iter().flatten() {
            self.heap.validate(value)?;
        }
        self.heap.with_object_mut(pair, |object| match object {
            HeapObject::Pair {
                first: f,
                second: s,
            } => {
                *f = first;
                *s = second;
                Ok(())
            },
            other => Err(type_mismatch(pair, ObjectKind::Pair, other.kind())),
        })
    }

    fn update_pair(
        &self,
        pair: ObjRef,
        update: impl FnOnce(&mut Option<ObjRef>, &mut Option<ObjRef>),
        value: Option<ObjRef>,
    ) -> Result<()> {
        self.ensure_running()?;
        let _mutator = self.mutator.lock();
        if let Some(value) = value {
            self.heap.validate(value)?;
        }
        self.heap.with_object_mut(pair, |object| match object {
            HeapObject::Pair { first, second } => {
                update(first, second);
                Ok(())
            },
            other => Err(type_mismatch(pair, ObjectKind::Pair, other.kind())),
        })
    }

    pub fn state(&self) -> GcState {
        *self.state.lock()
    }

    /// Completed and attempted cycles
    pub fn cycle_count(&self) -> u64 {
        self.cycle_count.load(Ordering::Relaxed)
    }

    pub fn heap_stats(&self) -> HeapStats {
        self.heap.stats()
    }

    /// Cumulative statistics
    pub fn stats(&self) -> GcSummary {
        self.stats.summary()
    }

    pub fn config(&self) -> &GcConfig {
        &self.config
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn logger(&self) -> &GcLogger {
        &self.logger
    }

    /// Key/value snapshot for debugging output
    pub fn diagnostics(&self) -> IndexMap<String, String> {
        let heap_stats = self.heap.stats();
        let summary = self.stats.summary();
        let mut diagnostics = IndexMap::new();

        diagnostics.insert("state".to_string(), self.state().to_string());
        diagnostics.insert("strategy".to_string(), self.config.strategy.to_string());
        diagnostics.insert("workers".to_string(), self.pool.num_workers().to_string());
        diagnostics.insert("cycles".to_string(), self.cycle_count().to_string());
        diagnostics.insert("roots".to_string(), self.root_count().to_string());
        diagnostics.insert("objects".to_string(), heap_stats.objects.to_string());
        diagnostics.insert("heap_used".to_string(), heap_stats.used_bytes.to_string());
        diagnostics.insert("heap_capacity".to_string(), heap_stats.capacity.to_string());
        diagnostics.insert(
            "heap_utilization".to_string(),
            format!("{:.1}%", heap_stats.utilization() * 100.0),
        );
        diagnostics.insert("free_blocks".to_string(), heap_stats.free_blocks.to_string());
        diagnostics.insert(
            "objects_reclaimed".to_string(),
            summary.objects_reclaimed.to_string(),
        );
        diagnostics.insert(
            "max_pause_ms".to_string(),
            format!("{:.3}", summary.max_pause_ms),
        );

        diagnostics
    }

    /// Check heap structure, roots and edges
    ///
    /// Every root and every field of every live object must resolve.
    pub fn verify_heap(&self) -> Result<()> {
        let mutator = self.mutator.lock();
        self.heap.verify()?;

        for root in mutator.roots.iter() {
            self.heap.validate(root)?;
        }
        for r in self.heap.live_refs() {
            for child in self.heap.get(r)?.children() {
                ensure_invariant!(
                    self.heap.validate(child).is_ok(),
                    "{} points at dead object {}",
                    r,
                    child
                );
            }
        }
        Ok(())
    }

    /// Stop the worker pool; later operations fail with `ShutDown`
    pub fn shutdown(&self) -> Result<()> {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let _mutator = self.mutator.lock();
        self.pool.shutdown();
        log::info!("pgc collector shut down after {} cycles", self.cycle_count());
        Ok(())
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    fn ensure_running(&self) -> Result<()> {
        if self.is_shut_down() {
            return Err(GcError::ShutDown);
        }
        Ok(())
    }

    fn set_state(&self, state: GcState) {
        *self.state.lock() = state;
    }

    /// Place `object` in the next home partition (round-robin)
    fn try_place(&self, mutator: &mut MutatorState, object: HeapObject) -> Option<ObjRef> {
        let home = mutator.next_partition;
        mutator.next_partition = (home + 1) % self.heap.partition_count();
        self.heap.try_allocate(object, home)
    }

    /// Allocate, collecting once on failure
    ///
    /// `build` receives the roots from `base` upward and is called again
    /// after a collection, so any operands parked there are seen remapped.
    fn allocate_with_retry(
        &self,
        mutator: &mut MutatorState,
        base: usize,
        build: impl Fn(&[ObjRef]) -> HeapObject,
    ) -> Result<ObjRef> {
        let object = build(mutator.roots.from(base));
        if let Some(r) = self.try_place(mutator, object) {
            return Ok(r);
        }

        let requested = self.heap.size_classes().block_size(object.size());
        self.logger.log(GcEvent::AllocationFailure {
            requested,
            available: self.heap.stats().available_bytes,
        });
        self.run_cycle(mutator, Trigger::AllocationFailure)?;

        let object = build(mutator.roots.from(base));
        if let Some(r) = self.try_place(mutator, object) {
            return Ok(r);
        }

        let available = self.heap.stats().available_bytes;
        self.logger.log(GcEvent::OutOfMemory {
            requested,
            available,
        });
        self.stats.record_out_of_memory();
        Err(GcError::OutOfMemory {
            requested,
            available,
        })
    }

    fn run_cycle(&self, mutator: &mut MutatorState, trigger: Trigger) -> Result<CollectionReport> {
        let cycle = self.cycle_count.fetch_add(1, Ordering::Relaxed) + 1;
        let timer = GcTimer::new();
        let objects_before = self.heap.object_count();
        let bytes_before = self.heap.used_bytes();

        self.logger.log(GcEvent::CycleStart {
            cycle,
            trigger,
            strategy: self.config.strategy,
            objects: objects_before,
        });

        let result = self.run_phases(mutator, cycle);
        self.set_state(GcState::Idle);
        let (phases, mark, sweep, evacuation) = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                self.heap.clear_marks();
                log::error!("GC cycle {} failed: {}", cycle, e);
                return Err(e);
            },
        };

        let objects_after = self.heap.object_count();
        let report = CollectionReport {
            cycle,
            trigger,
            strategy: self.config.strategy,
            workers: self.pool.num_workers(),
            objects_before,
            objects_after,
            reclaimed: objects_before.saturating_sub(objects_after),
            bytes_before,
            bytes_after: self.heap.used_bytes(),
            duration_us: timer.elapsed_us(),
            phases,
            mark,
            sweep,
            evacuation,
        };

        self.stats.record_collection(&report);
        self.logger.log(GcEvent::CycleEnd {
            cycle,
            reclaimed: report.reclaimed,
            remaining: report.objects_after,
            duration_us: report.duration_us,
        });
        log::info!("{}", report);

        Ok(report)
    }

    #[allow(clippy::type_complexity)]
    fn run_phases(
        &self,
        mutator: &mut MutatorState,
        cycle: u64,
    ) -> Result<(
        Vec<PhaseTiming>,
        MarkStats,
        Option<SweepStats>,
        Option<EvacuationStats>,
    )> {
        let mut phases = Vec::new();

        self.set_state(GcState::Marking);
        let (mark, timing) = self.mark_phase(cycle, &mutator.roots)?;
        phases.push(timing);

        match self.config.strategy {
            CollectionStrategy::MarkSweep => {
                self.set_state(GcState::Sweeping);
                let commands = (0..self.pool.num_workers())
                    .map(|_| Command::Sweep { cycle })
                    .collect();
                let (outcomes, timing) = self.run_phase(cycle, GcPhase::Sweep, commands)?;
                phases.push(timing);

                let mut sweep = SweepStats::default();
                for outcome in &outcomes {
                    if let PhaseOutcome::Swept(stats) = outcome {
                        sweep.merge(stats);
                    }
                }
                self.logger.log(GcEvent::SweepStats {
                    cycle,
                    reclaimed: sweep.reclaimed,
                    bytes_reclaimed: sweep.bytes_reclaimed,
                    coalesced: sweep.coalesced,
                    free_blocks: sweep.free_blocks,
                });

                Ok((phases, mark, Some(sweep), None))
            },
            CollectionStrategy::Copying => {
                self.set_state(GcState::Copying);
                let commands = (0..self.pool.num_workers())
                    .map(|_| Command::Evacuate { cycle })
                    .collect();
                let (outcomes, timing) = self.run_phase(cycle, GcPhase::Evacuate, commands)?;
                phases.push(timing);

                let mut evacuation = EvacuationStats::default();
                let mut tables = Vec::with_capacity(outcomes.len());
                for outcome in outcomes {
                    if let PhaseOutcome::Evacuated(table, stats) = outcome {
                        evacuation.merge(&stats);
                        tables.push(table);
                    }
                }
                ensure_invariant!(
                    tables.iter().enumerate().all(|(i, t)| t.partition() == i),
                    "forwarding tables out of partition order"
                );

                let tables = Arc::new(tables);
                let commands = (0..self.pool.num_workers())
                    .map(|_| Command::Fixup {
                        cycle,
                        tables: Arc::clone(&tables),
                    })
                    .collect();
                let (outcomes, timing) = self.run_phase(cycle, GcPhase::Fixup, commands)?;
                phases.push(timing);

                for outcome in &outcomes {
                    if let PhaseOutcome::FixedUp(fixed) = outcome {
                        evacuation.references_fixed += fixed;
                    }
                }
                mutator.roots.remap(|r| forward(&tables, r))?;

                self.logger.log(GcEvent::EvacuationStats {
                    cycle,
                    evacuated: evacuation.evacuated,
                    discarded: evacuation.discarded,
                    bytes_copied: evacuation.bytes_copied,
                    references_fixed: evacuation.references_fixed,
                });

                Ok((phases, mark, None, Some(evacuation)))
            },
        }
    }

    /// Parallel mark from `roots`; marks stay set for the reclaimer
    fn mark_phase(&self, cycle: u64, roots: &RootSet) -> Result<(MarkStats, PhaseTiming)> {
        let shared = Arc::new(MarkShared::new(roots.len()));
        let commands = roots
            .split(self.pool.num_workers())
            .into_iter()
            .map(|roots| {
                Command::Mark(MarkJob {
                    cycle,
                    roots,
                    shared: Arc::clone(&shared),
                })
            })
            .collect();

        let (outcomes, timing) = self.run_phase(cycle, GcPhase::Mark, commands)?;

        let mut mark = MarkStats::default();
        for outcome in &outcomes {
            if let PhaseOutcome::Marked(stats) = outcome {
                mark.merge(stats);
            }
        }
        ensure_invariant!(
            mark.visits == mark.marked,
            "mark phase visited {} objects but marked {}",
            mark.visits,
            mark.marked
        );

        self.logger.log(GcEvent::MarkStats {
            cycle,
            roots: mark.roots,
            visits: mark.visits,
            marked: mark.marked,
            stolen: mark.stolen,
        });

        Ok((mark, timing))
    }

    fn run_phase(
        &self,
        cycle: u64,
        phase: GcPhase,
        commands: Vec<Command>,
    ) -> Result<(Vec<PhaseOutcome>, PhaseTiming)> {
        self.logger.log(GcEvent::PhaseStart { cycle, phase });
        let timer = GcTimer::new();

        let outcomes = self.pool.run_phase(commands)?;

        let duration_us = timer.elapsed_us();
        self.logger.log(GcEvent::PhaseEnd {
            cycle,
            phase,
            duration_us,
        });
        Ok((outcomes, PhaseTiming { phase, duration_us }))
    }
}

impl Drop for Collector {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            log::error!("error shutting down collector: {}", e);
        }
    }
}

fn type_mismatch(reference: ObjRef, expected: ObjectKind, actual: ObjectKind) -> GcError {
    GcError::TypeMismatch {
        reference,
        expected,
        actual,
    }
}

/// How many operands sit, in order, on top of the root stack
fn consumed_operands(roots: &[ObjRef], operands: &[ObjRef]) -> usize {
    roots
        .iter()
        .rev()
        .zip(operands.iter().rev())
        .take_while(|(root, operand)| root == operand)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collector(strategy: CollectionStrategy) -> Collector {
        Collector::new(GcConfig {
            strategy,
            heap_size: 4096,
            worker_threads: 2,
            ..Default::default()
        })
        .unwrap()
    }

    fn r(index: u32) -> ObjRef {
        ObjRef::new(0, index, 0)
    }

    #[test]
    fn test_consumed_operands() {
        assert_eq!(consumed_operands(&[r(0), r(1), r(2)], &[r(1), r(2)]), 2);
        assert_eq!(consumed_operands(&[r(0), r(1), r(2)], &[r(2)]), 1);
        assert_eq!(consumed_operands(&[r(0), r(1), r(2)], &[r(0), r(1)]), 0);
        assert_eq!(consumed_operands(&[r(1)], &[r(0), r(1)]), 1);
        assert_eq!(consumed_operands(&[], &[r(0)]), 0);
        assert_eq!(consumed_operands(&[r(0)], &[]), 0);
    }

    #[test]
    fn test_create_pair_consumes_operands() {
        let gc = collector(CollectionStrategy::MarkSweep);
        let a = gc.create_scalar(1).unwrap();
        let b = gc.create_scalar(2).unwrap();
        let pair = gc.create_pair(Some(a), Some(b)).unwrap();

        assert_eq!(gc.roots(), vec![pair]);
        assert_eq!(gc.pair_fields(pair).unwrap(), (Some(a), Some(b)));
    }

    #[test]
    fn test_state_returns_to_idle() {
        for strategy in [CollectionStrategy::MarkSweep, CollectionStrategy::Copying] {
            let gc = collector(strategy);
            gc.create_scalar(1).unwrap();
            gc.collect().unwrap();
            assert_eq!(gc.state(), GcState::Idle);
            assert_eq!(gc.cycle_count(), 1);
        }
    }

    #[test]
    fn test_type_mismatch() {
        let gc = collector(CollectionStrategy::MarkSweep);
        let scalar = gc.create_scalar(5).unwrap();

        assert!(matches!(
            gc.pair_fields(scalar),
            Err(GcError::TypeMismatch {
                expected: ObjectKind::Pair,
                actual: ObjectKind::Scalar,
                ..
            })
        ));
        assert!(gc.set_first(scalar, None).is_err());
        assert_eq!(gc.scalar_value(scalar).unwrap(), 5);
    }

    #[test]
    fn test_diagnostics_keys() {
        let gc = collector(CollectionStrategy::Copying);
        let diagnostics = gc.diagnostics();
        assert_eq!(diagnostics.get("strategy").map(String::as_str), Some("copying"));
        assert_eq!(diagnostics.get("workers").map(String::as_str), Some("2"));
        assert_eq!(diagnostics.get_index(0).map(|(k, _)| k.as_str()), Some("state"));
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let gc = collector(CollectionStrategy::MarkSweep);
        gc.shutdown().unwrap();
        gc.shutdown().unwrap();
        assert!(matches!(gc.create_scalar(1), Err(GcError::ShutDown)));
        assert!(matches!(gc.collect(), Err(GcError::ShutDown)));
    }
}
