//! GC Stress Tests - High Load and Long Running Tests
//!
//! These tests verify GC behavior under stress:
//! - Many allocation-triggered cycles on a small heap
//! - Long churn from several mutator threads
//!
//! Note: The long-running tests are marked as `#[ignore]` by default and
//! should be run explicitly with `cargo test --test gc_stress -- --ignored`

mod common;

use common::{assert_heap_valid, GcFixture, STRATEGIES};
use pgc::{CollectionStrategy, Collector, GcConfig, HeapObject, ObjRef};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const LIST_LEN: i64 = 5;

/// Build the list (((nil . 0) . 1) ... . LIST_LEN-1) on top of the root stack
///
/// Operands are always re-read from the root stack, since any allocation
/// may run a copying cycle that moves them.
fn build_list(gc: &Collector) -> ObjRef {
    let mut node = None;
    for value in 0..LIST_LEN {
        gc.create_scalar(value).expect("scalar under churn");
        let roots = gc.roots();
        let scalar = roots[roots.len() - 1];
        let tail = node.map(|_| roots[roots.len() - 2]);
        node = Some(gc.create_pair(tail, Some(scalar)).expect("pair under churn"));
    }
    node.expect("LIST_LEN is positive")
}

/// Values of a list built by `build_list`, head first
fn list_values(gc: &Collector, mut node: Option<ObjRef>) -> Vec<i64> {
    let mut values = Vec::new();
    while let Some(r) = node {
        let (tail, scalar) = gc.pair_fields(r).expect("list node");
        values.push(gc.scalar_value(scalar.expect("list value")).expect("scalar"));
        node = tail;
    }
    values
}

/// ============================================================================
/// ALLOCATION PRESSURE TESTS
/// ============================================================================

/// Churn lists through a small heap; only the two newest stay alive
///
/// **Purpose:** Hundreds of allocation-triggered cycles with live data
/// moving (copying) or fragmenting (mark-sweep) between them
#[test]
fn test_churn_under_allocation_pressure() {
    for strategy in STRATEGIES {
        let fixture = GcFixture::with_config(GcConfig {
            strategy,
            heap_size: 4096,
            worker_threads: 4,
            ..Default::default()
        });

        // Bottom root: holds the two most recent lists
        fixture.pair(None, None);

        for i in 0..300 {
            let list = build_list(&fixture.gc);
            let keeper = fixture.gc.roots()[0];
            if i % 2 == 0 {
                fixture.gc.set_first(keeper, Some(list)).unwrap();
            } else {
                fixture.gc.set_second(keeper, Some(list)).unwrap();
            }
            assert_eq!(fixture.gc.pop_root(), Some(list));
        }

        let summary = fixture.gc.stats();
        assert!(
            summary.allocation_cycles > 5,
            "{}: expected allocation pressure, got {} cycles",
            strategy,
            summary.allocation_cycles
        );
        assert_eq!(summary.out_of_memory, 0, "{}: live set always fits", strategy);

        let keeper = fixture.gc.roots()[0];
        let (first, second) = fixture.gc.pair_fields(keeper).unwrap();
        let expected: Vec<i64> = (0..LIST_LEN).rev().collect();
        assert_eq!(list_values(&fixture.gc, first), expected, "{}", strategy);
        assert_eq!(list_values(&fixture.gc, second), expected, "{}", strategy);

        let report = fixture.collect();
        assert_eq!(report.objects_after, 1 + 4 * LIST_LEN as usize, "{}", strategy);
        assert_heap_valid(&fixture.gc, "after churn");
    }
}

/// ============================================================================
/// LONG RUNNING TESTS
/// ============================================================================

/// Several threads allocate and drop objects for a few seconds
///
/// **Purpose:** Verify the pool survives thousands of cycles without
/// deadlock, lost reports or heap corruption
/// **Duration:** ~3 seconds
#[test]
#[ignore = "Stress test - run explicitly"]
fn test_stress_multithreaded_churn() {
    for strategy in STRATEGIES {
        let fixture = GcFixture::with_config(GcConfig {
            strategy,
            heap_size: 8 * 1024,
            worker_threads: 4,
            ..Default::default()
        });
        let deadline = Instant::now() + Duration::from_millis(1500);

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let gc = Arc::clone(&fixture.gc);
                thread::spawn(move || {
                    let mut allocations = 0u64;
                    while Instant::now() < deadline {
                        let object = if allocations % 3 == 0 {
                            HeapObject::pair(None, None)
                        } else {
                            HeapObject::Scalar(t)
                        };
                        if gc.try_allocate(object).expect("try_allocate").is_none() {
                            gc.collect().expect("collect under churn");
                        }
                        gc.pop_root();
                        allocations += 1;
                    }
                    allocations
                })
            })
            .collect();

        let total: u64 = handles
            .into_iter()
            .map(|h| h.join().expect("mutator thread panicked"))
            .sum();

        println!(
            "{}: {} allocations, {} cycles",
            strategy,
            total,
            fixture.gc.cycle_count()
        );
        assert!(total > 0);
        assert_eq!(fixture.gc.stats().out_of_memory, 0);
        assert_heap_valid(&fixture.gc, "after multithreaded churn");

        let report = fixture.collect();
        assert_eq!(report.objects_after, 0, "{}: no roots, nothing survives", strategy);
    }
}

/// A copying heap with every object live survives repeated evacuation
#[test]
fn test_repeated_evacuation_of_full_live_set() {
    let fixture = GcFixture::with_heap_size(CollectionStrategy::Copying, 2048);
    let list = build_list(&fixture.gc);
    assert_eq!(fixture.gc.roots(), vec![list]);

    for _ in 0..50 {
        fixture.collect();
    }

    let head = fixture.gc.roots()[0];
    assert_eq!(
        list_values(&fixture.gc, Some(head)),
        (0..LIST_LEN).rev().collect::<Vec<_>>()
    );
    assert_eq!(fixture.gc.stats().objects_reclaimed, 0);
}
