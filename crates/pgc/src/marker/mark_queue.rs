//! Mark Queue - Work-Stealing Worklist for Marking
//!
//! Every GC worker owns one `MarkQueue` for its whole lifetime. The local end
//! is a LIFO `crossbeam_deque::Worker`; the stealing ends of all queues are
//! shared so an idle worker can take a batch from a busy one.
//!
//! Architecture:
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ GC Worker 0  │   │ GC Worker 1  │   │ GC Worker N  │
//! │ Local deque  │   │ Local deque  │   │ Local deque  │
//! └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!        │    steal_batch   │    steal_batch   │
//!        └──────────────────┴──────────────────┘
//!                 Arc<[Stealer<ObjRef>]>
//! ```
//!
//! Work Stealing:
//! A worker pops from its own deque first. When that is empty it walks the
//! other stealers starting at its right-hand neighbour and moves half of the
//! first non-empty deque it finds into its own.

use crate::object::ObjRef;
use crossbeam_deque::{Steal, Stealer, Worker};
use std::sync::Arc;

/// MarkQueue - one worker's end of the shared worklist
pub struct MarkQueue {
    id: usize,
    local: Worker<ObjRef>,
    stealers: Arc<[Stealer<ObjRef>]>,
    stolen: usize,
}

impl MarkQueue {
    /// Create one connected queue per worker
    pub fn create_set(count: usize) -> Vec<MarkQueue> {
        let workers: Vec<Worker<ObjRef>> = (0..count).map(|_| Worker::new_lifo()).collect();
        let stealers: Arc<[Stealer<ObjRef>]> = workers.iter().map(Worker::stealer).collect();

        workers
            .into_iter()
            .enumerate()
            .map(|(id, local)| MarkQueue {
                id,
                local,
                stealers: Arc::clone(&stealers),
                stolen: 0,
            })
            .collect()
    }

    #[inline]
    pub fn push(&self, r: ObjRef) {
        self.local.push(r);
    }

    /// Next item: local deque first, then stolen work
    #[inline]
    pub fn pop(&mut self) -> Option<ObjRef> {
        self.local.pop().or_else(|| self.steal())
    }

    /// Try each other worker once, in ring order
    pub fn steal(&mut self) -> Option<ObjRef> {
        let count = self.stealers.len();

        for step in 1..count {
            let victim = &self.stealers[(self.id + step) % count];
            loop {
                match victim.steal_batch_and_pop(&self.local) {
                    Steal::Empty => break,
                    Steal::Success(r) => {
                        self.stolen += 1;
                        return Some(r);
                    },
                    Steal::Retry => continue,
                }
            }
        }

        None
    }

    pub fn is_empty(&self) -> bool {
        self.local.is_empty()
    }

    pub fn len(&self) -> usize {
        self.local.len()
    }

    /// Successful steals since the last `reset_stats`
    pub fn stolen(&self) -> usize {
        self.stolen
    }

    pub fn reset_stats(&mut self) {
        self.stolen = 0;
    }

    /// Drop leftover work after an aborted phase
    pub fn clear(&self) {
        while self.local.pop().is_some() {}
    }
}
