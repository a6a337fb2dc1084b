//! Test Utilities for PGC Bug-Finding Test Suite
//!
//! This module provides test utilities that enforce STRICT assertions.
//! Graph shapes are compared structurally, so the same checks hold for the
//! mark-sweep collector (references stable) and the copying collector
//! (references rewritten every cycle).
//!
//! ============================================================================
//! CRITICAL: These utilities are designed to FIND BUGS, not to have passing tests.
//! ============================================================================

#![allow(dead_code)]

use pgc::{
    CollectionReport, CollectionStrategy, Collector, GcConfig, GcError, GcState, HeapObject,
    ObjRef,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Default heap size for tests (64KB)
pub const DEFAULT_HEAP_SIZE: usize = 64 * 1024;

/// Smallest heap the configuration accepts
pub const MIN_HEAP_SIZE: usize = 1024;

/// Size of a scalar block at the default granularity
pub const SCALAR_BLOCK: usize = 16;

/// Size of a pair block at the default granularity
pub const PAIR_BLOCK: usize = 24;

/// Maximum test duration before timeout
pub const TEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Both reclamation strategies, for parameterized tests
pub const STRATEGIES: [CollectionStrategy; 2] =
    [CollectionStrategy::MarkSweep, CollectionStrategy::Copying];

/// ============================================================================
/// GC FIXTURE
/// ============================================================================

/// Test fixture for GC operations
///
/// Provides a clean collector for each test with automatic shutdown.
pub struct GcFixture {
    pub gc: Arc<Collector>,
    pub config: GcConfig,
}

impl GcFixture {
    /// Create fixture with default configuration (mark-sweep, 2 workers)
    ///
    /// **Bug this finds:** Configuration validation bugs, initialization failures
    pub fn with_defaults() -> Self {
        Self::with_workers(CollectionStrategy::MarkSweep, 2)
    }

    /// Create fixture for one strategy with 2 workers
    pub fn with_strategy(strategy: CollectionStrategy) -> Self {
        Self::with_workers(strategy, 2)
    }

    /// Create fixture with an explicit worker count
    ///
    /// **Bug this finds:** Partitioning bugs that depend on the worker count
    pub fn with_workers(strategy: CollectionStrategy, workers: usize) -> Self {
        Self::with_config(GcConfig {
            strategy,
            heap_size: DEFAULT_HEAP_SIZE,
            worker_threads: workers,
            ..Default::default()
        })
    }

    /// Create fixture with a single small partition (for exhaustion tests)
    ///
    /// **Bug this finds:** Edge case handling, out-of-memory reporting
    pub fn with_heap_size(strategy: CollectionStrategy, heap_size: usize) -> Self {
        Self::with_config(GcConfig {
            strategy,
            heap_size,
            worker_threads: 1,
            ..Default::default()
        })
    }

    /// Create fixture that records every event and stalls mark reports
    ///
    /// **Bug this finds:** Phase barrier violations, lost worker reports
    pub fn instrumented(strategy: CollectionStrategy, workers: usize, stall: Duration) -> Self {
        Self::with_config(GcConfig {
            strategy,
            heap_size: DEFAULT_HEAP_SIZE,
            worker_threads: workers,
            record_events: true,
            mark_stall: Some(stall),
            ..Default::default()
        })
    }

    pub fn with_config(config: GcConfig) -> Self {
        let gc = Arc::new(
            Collector::new(config.clone())
                .expect("GC initialization should succeed with valid config"),
        );

        Self { gc, config }
    }

    /// Allocate a scalar (pushed as a root)
    ///
    /// **Bug this finds:** Allocation failures on a heap with room
    pub fn scalar(&self, value: i64) -> ObjRef {
        self.gc
            .create_scalar(value)
            .unwrap_or_else(|e| panic!("create_scalar({}) failed: {}", value, e))
    }

    /// Allocate a pair (pushed as a root, operands on top consumed)
    pub fn pair(&self, first: Option<ObjRef>, second: Option<ObjRef>) -> ObjRef {
        self.gc
            .create_pair(first, second)
            .unwrap_or_else(|e| panic!("create_pair failed: {}", e))
    }

    /// Run a collection and wait for completion
    ///
    /// **Bug this finds:** GC not completing, state machine bugs, deadlock
    pub fn collect(&self) -> CollectionReport {
        let report = self.gc.collect().expect("GC should complete successfully");
        assert_gc_completed(self, "collect()");
        report
    }

    /// Remove every root
    pub fn clear_roots(&self) {
        while self.gc.pop_root().is_some() {}
    }

    /// Structural description of everything reachable from `roots`
    pub fn shape(&self, roots: &[ObjRef]) -> Vec<Shape> {
        shape_of(&self.gc, roots)
    }

    /// Get current GC state
    pub fn state(&self) -> GcState {
        self.gc.state()
    }

    /// Get GC cycle count
    pub fn cycle_count(&self) -> u64 {
        self.gc.cycle_count()
    }
}

impl Drop for GcFixture {
    fn drop(&mut self) {
        // Graceful shutdown
        let _ = self.gc.shutdown();
    }
}

/// ============================================================================
/// GRAPH SHAPES
/// ============================================================================

/// One node of a reachable graph, with children named by discovery order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    Scalar(i64),
    Pair(Option<usize>, Option<usize>),
}

/// Walk the graph from `roots` depth-first and name nodes by first visit
///
/// Two heaps give equal shapes exactly when their reachable graphs are
/// isomorphic with equal payloads, sharing and cycles included.
pub fn shape_of(gc: &Collector, roots: &[ObjRef]) -> Vec<Shape> {
    let mut names: HashMap<ObjRef, usize> = HashMap::new();
    let mut order: Vec<ObjRef> = Vec::new();
    let mut stack: Vec<ObjRef> = roots.iter().rev().copied().collect();

    while let Some(r) = stack.pop() {
        if names.contains_key(&r) {
            continue;
        }
        names.insert(r, order.len());
        order.push(r);
        if let HeapObject::Pair { first, second } = object_of(gc, r) {
            stack.extend(second);
            stack.extend(first);
        }
    }

    order
        .iter()
        .map(|&r| match object_of(gc, r) {
            HeapObject::Scalar(value) => Shape::Scalar(value),
            HeapObject::Pair { first, second } => Shape::Pair(
                first.map(|child| names[&child]),
                second.map(|child| names[&child]),
            ),
        })
        .collect()
}

#[track_caller]
fn object_of(gc: &Collector, r: ObjRef) -> HeapObject {
    gc.object(r)
        .unwrap_or_else(|e| panic!("reachable object {} could not be read: {}", r, e))
}

/// ============================================================================
/// RANDOM GRAPHS
/// ============================================================================

/// Reference model of a random graph built on the heap
#[derive(Debug, Clone)]
pub struct ModelGraph {
    /// Heap reference of node `i`
    pub refs: Vec<ObjRef>,
    /// Outgoing edges of node `i` (pairs only)
    pub edges: Vec<Option<(Option<usize>, Option<usize>)>>,
    /// Indices of the rooted nodes, in root-stack order
    pub roots: Vec<usize>,
}

impl ModelGraph {
    /// Number of nodes reachable from the roots in the model
    pub fn reachable_count(&self) -> usize {
        let mut seen = vec![false; self.refs.len()];
        let mut stack: Vec<usize> = self.roots.clone();
        let mut count = 0;

        while let Some(node) = stack.pop() {
            if seen[node] {
                continue;
            }
            seen[node] = true;
            count += 1;
            if let Some((first, second)) = self.edges[node] {
                stack.extend(first);
                stack.extend(second);
            }
        }
        count
    }
}

/// Build a seeded random graph of `nodes` objects, then root `roots` of them
///
/// Pairs point at earlier nodes at creation; afterwards a few fields are
/// rewired to arbitrary nodes, which introduces cycles and self-loops. The
/// heap must be large enough that no collection runs during the build.
pub fn build_random_graph(gc: &Collector, seed: u64, nodes: usize, roots: usize) -> ModelGraph {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut refs = Vec::with_capacity(nodes);
    let mut edges = Vec::with_capacity(nodes);

    let pick = |rng: &mut StdRng, limit: usize| -> Option<usize> {
        if limit == 0 || rng.gen_bool(0.2) {
            None
        } else {
            Some(rng.gen_range(0..limit))
        }
    };

    for i in 0..nodes {
        if i < 2 || rng.gen_bool(0.4) {
            let value = rng.gen_range(-1000..1000);
            refs.push(gc.create_scalar(value).expect("scalar allocation"));
            edges.push(None);
        } else {
            let first = pick(&mut rng, i);
            let second = pick(&mut rng, i);
            let r = gc
                .create_pair(first.map(|n| refs[n]), second.map(|n| refs[n]))
                .expect("pair allocation");
            refs.push(r);
            edges.push(Some((first, second)));
        }
    }

    let pair_nodes: Vec<usize> = (0..nodes).filter(|&n| edges[n].is_some()).collect();
    for _ in 0..nodes / 8 {
        if pair_nodes.is_empty() {
            break;
        }
        let node = pair_nodes[rng.gen_range(0..pair_nodes.len())];
        let first = pick(&mut rng, nodes);
        let second = pick(&mut rng, nodes);
        gc.set_pair(refs[node], first.map(|n| refs[n]), second.map(|n| refs[n]))
            .expect("set_pair");
        edges[node] = Some((first, second));
    }

    while gc.pop_root().is_some() {}
    let mut rooted = Vec::with_capacity(roots);
    for _ in 0..roots {
        let node = rng.gen_range(0..nodes);
        gc.push_root(refs[node]).expect("push_root");
        rooted.push(node);
    }

    ModelGraph {
        refs,
        edges,
        roots: rooted,
    }
}

/// ============================================================================
/// STRICT ASSERTION HELPERS
/// ============================================================================

/// Assert that GC completed successfully
///
/// **Bug this finds:** GC not completing, state machine stuck
#[track_caller]
pub fn assert_gc_completed(fixture: &GcFixture, context: &str) {
    assert_eq!(
        fixture.gc.state(),
        GcState::Idle,
        "{}: GC state is {:?}, expected Idle - state machine bug",
        context,
        fixture.gc.state()
    );
}

/// Assert that GC cycle count increased
///
/// **Bug this finds:** GC not actually running, cycle counter bug
#[track_caller]
pub fn assert_gc_cycle_increased(before: u64, after: u64, context: &str) {
    assert!(
        after > before,
        "{}: GC cycle count did not increase (before={}, after={}) - GC did not execute",
        context,
        before,
        after
    );
}

/// Assert that a handle is rejected as stale
///
/// **Bug this finds:** Use-after-free through a reclaimed or moved object
/// **Tolerance:** ZERO - a dead handle that resolves is memory corruption
#[track_caller]
pub fn assert_stale(gc: &Collector, r: ObjRef, context: &str) {
    match gc.object(r) {
        Err(GcError::StaleReference(stale)) => assert_eq!(stale, r, "{}", context),
        other => panic!(
            "{}: expected StaleReference for {}, got {:?} - dead object still reachable",
            context, r, other
        ),
    }
}

/// Assert the heap passes its structural check
///
/// **Bug this finds:** Block tiling errors, dangling fields, stale roots
#[track_caller]
pub fn assert_heap_valid(gc: &Collector, context: &str) {
    if let Err(e) = gc.verify_heap() {
        panic!("{}: heap verification failed: {}", context, e);
    }
}

/// Assert that operation completed within timeout
///
/// **Bug this finds:** Deadlock, infinite loop, performance regression
#[track_caller]
pub fn assert_completed_within_timeout<F, R>(operation: F, timeout: Duration, context: &str) -> R
where
    F: FnOnce() -> R,
{
    let start = std::time::Instant::now();
    let result = operation();
    let elapsed = start.elapsed();

    assert!(
        elapsed < timeout,
        "{}: Operation took {:?}, exceeded timeout of {:?} - possible deadlock or performance bug",
        context,
        elapsed,
        timeout
    );

    result
}
