//! Heap Management Module - Partitioned Object Arena
//!
//! The heap is a fixed byte budget split evenly into one partition per GC
//! worker. Objects are owned by exactly one partition and addressed by
//! `ObjRef` handles, never by pointer.
//!
//! Heap Structure:
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                           Heap                            │
//! │  ┌─────────────┐ ┌─────────────┐       ┌─────────────┐    │
//! │  │ Partition 0 │ │ Partition 1 │  ...  │ Partition N │    │
//! │  │  RwLock     │ │  RwLock     │       │  RwLock     │    │
//! │  │  space      │ │  space      │       │  space      │    │
//! │  │  marks      │ │  marks      │       │  marks      │    │
//! │  └─────────────┘ └─────────────┘       └─────────────┘    │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! Locking protocol:
//! - Mutator operations run one at a time behind the collector's allocation
//!   mutex and take short-lived partition locks.
//! - During marking every worker holds a read guard on every partition
//!   (`HeapView`); marks are atomic.
//! - During sweep, evacuation and fixup each worker write-locks its own
//!   partition only.

pub mod partition;
pub(crate) mod slab;

pub use partition::Partition;

use crate::allocator::SizeClasses;
use crate::config::{CollectionStrategy, GcConfig};
use crate::error::{GcError, Result};
use crate::object::{HeapObject, ObjRef};
use parking_lot::{RwLock, RwLockReadGuard};
use serde::Serialize;

/// Heap - container for all partitions
pub struct Heap {
    strategy: CollectionStrategy,
    partitions: Vec<RwLock<Partition>>,
    classes: SizeClasses,
    partition_capacity: usize,
}

impl Heap {
    /// Create heap from a validated configuration
    pub fn new(config: &GcConfig) -> Result<Self> {
        config.validate()?;

        let classes = SizeClasses::new(config.size_class_granularity);
        let partition_capacity = config.partition_capacity();
        let partitions = (0..config.worker_threads)
            .map(|id| RwLock::new(Partition::new(id, config.strategy, partition_capacity, classes)))
            .collect();

        Ok(Self {
            strategy: config.strategy,
            partitions,
            classes,
            partition_capacity,
        })
    }

    pub fn strategy(&self) -> CollectionStrategy {
        self.strategy
    }

    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    pub fn size_classes(&self) -> SizeClasses {
        self.classes
    }

    pub(crate) fn partition(&self, id: usize) -> Option<&RwLock<Partition>> {
        self.partitions.get(id)
    }

    /// Single allocation attempt, no collection
    ///
    /// Tries the `home` partition first, then steals space from the others
    /// in order. Foreign partitions are only taken with `try_write`, so an
    /// allocation never waits on another partition's owner.
    pub(crate) fn try_allocate(&self, object: HeapObject, home: usize) -> Option<ObjRef> {
        let count = self.partitions.len();
        let home = home % count;

        if let Some(r) = self.partitions[home].write().allocate(object) {
            return Some(r);
        }

        (1..count)
            .map(|step| (home + step) % count)
            .find_map(|id| self.partitions[id].try_write()?.allocate(object))
    }

    /// Copy of the object behind `r`
    pub fn get(&self, r: ObjRef) -> Result<HeapObject> {
        let partition = self.lock_for(r)?.read();
        partition.resolve(r).copied()
    }

    /// Check that `r` names a live object
    pub fn validate(&self, r: ObjRef) -> Result<()> {
        self.get(r).map(|_| ())
    }

    /// Run `f` on the object behind `r` under its partition's write lock
    pub(crate) fn with_object_mut<T>(
        &self,
        r: ObjRef,
        f: impl FnOnce(&mut HeapObject) -> Result<T>,
    ) -> Result<T> {
        let mut partition = self.lock_for(r)?.write();
        f(partition.resolve_mut(r)?)
    }

    fn lock_for(&self, r: ObjRef) -> Result<&RwLock<Partition>> {
        self.partitions
            .get(r.partition())
            .ok_or(GcError::InvalidReference(r))
    }

    /// Shared view over every partition, held for a whole mark phase
    pub(crate) fn view(&self) -> HeapView<'_> {
        HeapView {
            partitions: self.partitions.iter().map(|p| p.read()).collect(),
        }
    }

    pub fn object_count(&self) -> usize {
        self.partitions.iter().map(|p| p.read().object_count()).sum()
    }

    pub fn used_bytes(&self) -> usize {
        self.partitions.iter().map(|p| p.read().used_bytes()).sum()
    }

    /// Every live object, partition by partition
    pub fn live_refs(&self) -> Vec<ObjRef> {
        self.partitions
            .iter()
            .flat_map(|p| p.read().live_refs())
            .collect()
    }

    /// Every marked object; only meaningful inside a cycle
    pub(crate) fn marked_refs(&self) -> Vec<ObjRef> {
        self.partitions
            .iter()
            .flat_map(|p| p.read().marked_refs())
            .collect()
    }

    pub(crate) fn clear_marks(&self) {
        for partition in &self.partitions {
            partition.read().marks().clear();
        }
    }

    /// Check structural invariants of every partition
    pub fn verify(&self) -> Result<()> {
        for partition in &self.partitions {
            partition.read().verify()?;
        }
        Ok(())
    }

    pub fn stats(&self) -> HeapStats {
        let mut stats = HeapStats {
            strategy: self.strategy,
            partitions: self.partitions.len(),
            capacity: self.partition_capacity * self.partitions.len(),
            ..Default::default()
        };

        for partition in &self.partitions {
            let partition = partition.read();
            stats.objects += partition.object_count();
            stats.used_bytes += partition.used_bytes();
            stats.available_bytes += partition.available_bytes();
            stats.free_blocks += partition.free_block_count();
            stats.largest_free_block = stats.largest_free_block.max(partition.largest_free_block());
        }

        stats
    }
}

/// Read guards on every partition
pub(crate) struct HeapView<'a> {
    partitions: Vec<RwLockReadGuard<'a, Partition>>,
}

impl HeapView<'_> {
    #[inline]
    pub(crate) fn get(&self, r: ObjRef) -> Result<&HeapObject> {
        self.partition(r)?.resolve(r)
    }

    /// Atomic test-and-set of the mark bit
    #[inline]
    pub(crate) fn try_mark(&self, r: ObjRef) -> Result<bool> {
        self.partition(r)?.try_mark(r)
    }

    #[inline]
    fn partition(&self, r: ObjRef) -> Result<&Partition> {
        self.partitions
            .get(r.partition())
            .map(|guard| &**guard)
            .ok_or(GcError::InvalidReference(r))
    }
}

/// Heap statistics
#[derive(Debug, Clone, Serialize)]
pub struct HeapStats {
    pub strategy: CollectionStrategy,
    /// Number of partitions (equals worker threads)
    pub partitions: usize,
    /// Total bytes (per semispace in copying mode)
    pub capacity: usize,
    /// Live objects
    pub objects: usize,
    /// Bytes occupied by live objects
    pub used_bytes: usize,
    /// Bytes on free lists plus untouched frontier
    pub available_bytes: usize,
    /// Free blocks across all size classes
    pub free_blocks: usize,
    /// Largest single free block
    pub largest_free_block: usize,
}

impl Default for HeapStats {
    fn default() -> Self {
        Self {
            strategy: CollectionStrategy::MarkSweep,
            partitions: 0,
            capacity: 0,
            objects: 0,
            used_bytes: 0,
            available_bytes: 0,
            free_blocks: 0,
            largest_free_block: 0,
        }
    }
}

impl HeapStats {
    /// Heap utilization (0.0 - 1.0)
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        self.used_bytes as f64 / self.capacity as f64
    }
}
