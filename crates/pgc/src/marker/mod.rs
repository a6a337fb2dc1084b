//! Marker Module - Parallel Marking
//!
//! This module identifies which objects are still reachable from the root
//! set. Marking is stop-the-world and runs on every GC worker at once.
//!
//! Marking Algorithm:
//! - Each worker seeds its deque with its share of the roots
//! - A popped object's unmarked children are marked and pushed
//! - The mark bit is an atomic test-and-set, so whichever worker flips the
//!   bit owns the object; nothing is traced twice
//! - Idle workers steal batches from busy ones
//!
//! Termination:
//! ```text
//! pending = roots.len()
//!   root already marked      -> pending -= 1
//!   child newly marked       -> pending += 1, push
//!   item's children pushed   -> pending -= 1
//! worker exits when: own deque empty, steal failed, pending == 0
//! ```
//! `pending` counts work that exists somewhere, queued or in hand, so it can
//! only reach zero once every worker has run dry.

pub mod bitmap;
pub mod mark_queue;
pub mod roots;

pub use bitmap::MarkBitmap;
pub use mark_queue::MarkQueue;
pub use roots::RootSet;

use crate::error::Result;
use crate::heap::HeapView;
use crate::object::ObjRef;
use crossbeam::utils::Backoff;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// State shared by all workers of one mark phase
#[derive(Debug)]
pub struct MarkShared {
    /// Objects queued or being scanned, anywhere
    pending: AtomicUsize,
    /// Set when any worker fails; releases the others
    aborted: AtomicBool,
}

impl MarkShared {
    pub fn new(roots: usize) -> Self {
        Self {
            pending: AtomicUsize::new(roots),
            aborted: AtomicBool::new(false),
        }
    }

    pub fn abort(&self) {
        self.aborted.store(true, Ordering::Release);
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }

    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    #[inline]
    fn retire(&self) {
        self.pending.fetch_sub(1, Ordering::AcqRel);
    }

    #[inline]
    fn announce(&self) {
        self.pending.fetch_add(1, Ordering::AcqRel);
    }
}

/// Per-worker mark counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MarkStats {
    /// Roots handed to the worker
    pub roots: usize,
    /// Objects popped and scanned
    pub visits: usize,
    /// Mark bits this worker flipped from 0 to 1
    pub marked: usize,
    /// Successful steals
    pub stolen: usize,
}

impl MarkStats {
    pub fn merge(&mut self, other: &MarkStats) {
        self.roots += other.roots;
        self.visits += other.visits;
        self.marked += other.marked;
        self.stolen += other.stolen;
    }
}

/// Run one worker's share of a mark phase
///
/// Returns once the whole phase has terminated, not just this worker's
/// share. On error the phase is aborted for everyone.
pub(crate) fn mark(
    view: &HeapView<'_>,
    queue: &mut MarkQueue,
    roots: &[ObjRef],
    shared: &MarkShared,
) -> Result<MarkStats> {
    queue.reset_stats();
    let result = drain(view, queue, roots, shared);
    if result.is_err() {
        shared.abort();
        queue.clear();
    }
    result
}

fn drain(
    view: &HeapView<'_>,
    queue: &mut MarkQueue,
    roots: &[ObjRef],
    shared: &MarkShared,
) -> Result<MarkStats> {
    let mut stats = MarkStats {
        roots: roots.len(),
        ..Default::default()
    };

    for &root in roots {
        view.get(root)?;
        if view.try_mark(root)? {
            stats.marked += 1;
            queue.push(root);
        } else {
            shared.retire();
        }
    }

    let backoff = Backoff::new();
    loop {
        if shared.is_aborted() {
            queue.clear();
            break;
        }

        let Some(r) = queue.pop() else {
            if shared.pending() == 0 {
                break;
            }
            backoff.snooze();
            continue;
        };

        backoff.reset();
        stats.visits += 1;

        for child in view.get(r)?.children() {
            if view.try_mark(child)? {
                stats.marked += 1;
                shared.announce();
                queue.push(child);
            }
        }
        shared.retire();
    }

    stats.stolen = queue.stolen();
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CollectionStrategy, GcConfig};
    use crate::heap::Heap;
    use crate::object::HeapObject;
    use std::thread;

    fn heap(workers: usize) -> Heap {
        Heap::new(&GcConfig {
            strategy: CollectionStrategy::MarkSweep,
            heap_size: 16 * 1024,
            worker_threads: workers,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_mark_single_worker_cycle() {
        let heap = heap(1);
        let a = heap.try_allocate(HeapObject::pair(None, None), 0).unwrap();
        let b = heap.try_allocate(HeapObject::pair(Some(a), None), 0).unwrap();
        heap.with_object_mut(a, |o| {
            *o = HeapObject::pair(Some(b), Some(a));
            Ok(())
        })
        .unwrap();
        let _garbage = heap.try_allocate(HeapObject::Scalar(0), 0).unwrap();

        let mut queues = MarkQueue::create_set(1);
        let shared = MarkShared::new(2);
        let stats = {
            let view = heap.view();
            mark(&view, &mut queues[0], &[a, a], &shared).unwrap()
        };

        assert_eq!(stats.marked, 2);
        assert_eq!(stats.visits, stats.marked);
        assert_eq!(shared.pending(), 0);
        assert_eq!(heap.marked_refs(), vec![a, b]);
    }

    #[test]
    fn test_mark_stale_root_aborts() {
        let heap = heap(1);
        let a = heap.try_allocate(HeapObject::Scalar(1), 0).unwrap();
        let stale = ObjRef::new(0, a.index() as u32, a.generation() + 1);

        let mut queues = MarkQueue::create_set(1);
        let shared = MarkShared::new(1);
        let view = heap.view();
        assert!(mark(&view, &mut queues[0], &[stale], &shared).is_err());
        assert!(shared.is_aborted());
    }

    /// Long chain rooted on one worker: the others must steal to help, and
    /// every object is still marked exactly once.
    #[test]
    fn test_parallel_mark_chain() {
        let heap = heap(4);
        let mut tail = None;
        for i in 0..200 {
            let r = heap
                .try_allocate(HeapObject::pair(tail, None), i % 4)
                .unwrap();
            tail = Some(r);
        }
        let head = tail.unwrap();

        let queues = MarkQueue::create_set(4);
        let shared = MarkShared::new(1);
        let view = heap.view();

        let total = thread::scope(|scope| {
            let handles: Vec<_> = queues
                .into_iter()
                .enumerate()
                .map(|(id, mut queue)| {
                    let view = &view;
                    let shared = &shared;
                    scope.spawn(move || {
                        let roots = if id == 0 { vec![head] } else { vec![] };
                        mark(view, &mut queue, &roots, shared).unwrap()
                    })
                })
                .collect();

            let mut total = MarkStats::default();
            for handle in handles {
                total.merge(&handle.join().unwrap());
            }
            total
        });

        assert_eq!(total.marked, 200);
        assert_eq!(total.visits, 200);
        assert_eq!(shared.pending(), 0);
    }
}
