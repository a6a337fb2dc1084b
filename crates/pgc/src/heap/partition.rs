//! Partition - the slice of the heap owned by one worker
//!
//! A partition is the unit of ownership during reclamation: worker `i`
//! sweeps or evacuates partition `i` and nothing else. During marking every
//! worker reads every partition, which is why marks live in an atomic
//! bitmap next to the space rather than inside it.

use crate::allocator::bump::SemiSpacePair;
use crate::allocator::free_list::FreeListSpace;
use crate::allocator::SizeClasses;
use crate::config::CollectionStrategy;
use crate::error::{GcError, Result};
use crate::heap::slab::Miss;
use crate::marker::bitmap::MarkBitmap;
use crate::object::{HeapObject, ObjRef};
use crate::util::constants::MIN_OBJECT_SIZE;

/// Object storage of one partition
pub enum Space {
    FreeList(FreeListSpace),
    SemiSpace(SemiSpacePair),
}

pub struct Partition {
    id: usize,
    space: Space,
    marks: MarkBitmap,
    classes: SizeClasses,
}

impl Partition {
    pub(crate) fn new(
        id: usize,
        strategy: CollectionStrategy,
        capacity: usize,
        classes: SizeClasses,
    ) -> Self {
        let space = match strategy {
            CollectionStrategy::MarkSweep => Space::FreeList(FreeListSpace::new(capacity, classes)),
            CollectionStrategy::Copying => Space::SemiSpace(SemiSpacePair::new(capacity)),
        };

        Self {
            id,
            space,
            // Every live object takes at least MIN_OBJECT_SIZE bytes, and the
            // slab reuses vacant slots before growing.
            marks: MarkBitmap::new(capacity / MIN_OBJECT_SIZE + 1),
            classes,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Place `object` in this partition
    pub(crate) fn allocate(&mut self, object: HeapObject) -> Option<ObjRef> {
        let (index, generation) = match &mut self.space {
            Space::FreeList(space) => space.allocate(object)?,
            Space::SemiSpace(pair) => {
                let size = self.classes.block_size(object.size());
                pair.allocate(object, size)?
            },
        };
        Some(ObjRef::new(self.id as u32, index, generation))
    }

    pub(crate) fn resolve(&self, r: ObjRef) -> Result<&HeapObject> {
        let found = match &self.space {
            Space::FreeList(space) => space.get(r.index(), r.generation()),
            Space::SemiSpace(pair) => pair.get(r.index(), r.generation()).map(|p| &p.object),
        };
        found.map_err(|miss| miss_error(miss, r))
    }

    pub(crate) fn resolve_mut(&mut self, r: ObjRef) -> Result<&mut HeapObject> {
        let found = match &mut self.space {
            Space::FreeList(space) => space.get_mut(r.index(), r.generation()),
            Space::SemiSpace(pair) => pair
                .get_mut(r.index(), r.generation())
                .map(|p| &mut p.object),
        };
        found.map_err(|miss| miss_error(miss, r))
    }

    /// Atomically mark `r`; `true` if this call set the bit
    #[inline]
    pub(crate) fn try_mark(&self, r: ObjRef) -> Result<bool> {
        self.marks.try_mark(r.index()).ok_or_else(|| {
            GcError::InvariantViolation(format!(
                "slot {} of {} is outside partition {}'s mark bitmap ({} slots)",
                r.index(),
                r,
                self.id,
                self.marks.capacity()
            ))
        })
    }

    pub fn marks(&self) -> &MarkBitmap {
        &self.marks
    }

    pub(crate) fn space_mut(&mut self) -> &mut Space {
        &mut self.space
    }

    /// Split borrow used by the reclaimers: space to mutate, marks to read
    pub(crate) fn parts_mut(&mut self) -> (&mut Space, &MarkBitmap) {
        (&mut self.space, &self.marks)
    }

    /// References to every live object, in slot order
    pub(crate) fn live_refs(&self) -> Vec<ObjRef> {
        let id = self.id as u32;
        match &self.space {
            Space::FreeList(space) => space
                .objects
                .iter()
                .map(|(index, generation, _)| ObjRef::new(id, index, generation))
                .collect(),
            Space::SemiSpace(pair) => (0..pair.active().len() as u32)
                .map(|index| ObjRef::new(id, index, pair.epoch()))
                .collect(),
        }
    }

    /// References to every marked object, in slot order
    pub(crate) fn marked_refs(&self) -> Vec<ObjRef> {
        let id = self.id as u32;
        self.marks
            .marked_indices()
            .filter_map(|index| {
                let generation = match &self.space {
                    Space::FreeList(space) => space.objects.generation_of(index)?,
                    Space::SemiSpace(pair) => {
                        pair.active().get(index)?;
                        pair.epoch()
                    },
                };
                Some(ObjRef::new(id, index as u32, generation))
            })
            .collect()
    }

    pub fn object_count(&self) -> usize {
        match &self.space {
            Space::FreeList(space) => space.len(),
            Space::SemiSpace(pair) => pair.active().len(),
        }
    }

    pub fn used_bytes(&self) -> usize {
        match &self.space {
            Space::FreeList(space) => space.used_bytes(),
            Space::SemiSpace(pair) => pair.active().used_bytes(),
        }
    }

    /// Bytes a future allocation could still use
    pub fn available_bytes(&self) -> usize {
        match &self.space {
            Space::FreeList(space) => space.free_bytes() + space.untouched_bytes(),
            Space::SemiSpace(pair) => pair.active().remaining(),
        }
    }

    pub fn capacity(&self) -> usize {
        match &self.space {
            Space::FreeList(space) => space.capacity(),
            Space::SemiSpace(pair) => pair.active().capacity(),
        }
    }

    pub fn free_block_count(&self) -> usize {
        match &self.space {
            Space::FreeList(space) => space.free_block_count(),
            Space::SemiSpace(_) => 0,
        }
    }

    pub fn largest_free_block(&self) -> usize {
        match &self.space {
            Space::FreeList(space) => space.largest_free_block(),
            Space::SemiSpace(_) => 0,
        }
    }

    /// Structural check; marks must be clear between cycles
    pub(crate) fn verify(&self) -> Result<()> {
        crate::ensure_invariant!(
            self.marks.count_marked() == 0,
            "partition {} has {} mark bits set outside a collection",
            self.id,
            self.marks.count_marked()
        );

        match &self.space {
            Space::FreeList(space) => space.verify(),
            Space::SemiSpace(pair) => {
                let mut expected = 0;
                for placed in pair.active().iter() {
                    crate::ensure_invariant!(
                        placed.offset == expected,
                        "partition {}: object at {} but previous ends at {}",
                        self.id,
                        placed.offset,
                        expected
                    );
                    expected += placed.size;
                }
                crate::ensure_invariant!(
                    expected == pair.active().used_bytes(),
                    "partition {}: objects end at {} but bump top is {}",
                    self.id,
                    expected,
                    pair.active().used_bytes()
                );
                Ok(())
            },
        }
    }
}

fn miss_error(miss: Miss, r: ObjRef) -> GcError {
    match miss {
        Miss::Invalid => GcError::InvalidReference(r),
        Miss::Stale => GcError::StaleReference(r),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_and_resolve() {
        let mut partition = Partition::new(3, CollectionStrategy::MarkSweep, 1024, SizeClasses::new(8));
        let r = partition.allocate(HeapObject::Scalar(42)).unwrap();

        assert_eq!(r.partition(), 3);
        assert_eq!(partition.resolve(r).unwrap(), &HeapObject::Scalar(42));
        assert_eq!(partition.object_count(), 1);
        assert_eq!(partition.used_bytes(), 16);
    }

    #[test]
    fn test_resolve_errors() {
        let mut partition = Partition::new(0, CollectionStrategy::Copying, 1024, SizeClasses::new(8));
        let r = partition.allocate(HeapObject::Scalar(1)).unwrap();

        let bogus = ObjRef::new(0, 50, r.generation());
        assert!(matches!(partition.resolve(bogus), Err(GcError::InvalidReference(_))));

        let old_epoch = ObjRef::new(0, r.index() as u32, r.generation() + 1);
        assert!(matches!(partition.resolve(old_epoch), Err(GcError::StaleReference(_))));
    }

    #[test]
    fn test_marked_refs_round_trip() {
        let mut partition = Partition::new(1, CollectionStrategy::MarkSweep, 1024, SizeClasses::new(8));
        let a = partition.allocate(HeapObject::Scalar(1)).unwrap();
        let _b = partition.allocate(HeapObject::Scalar(2)).unwrap();
        let c = partition.allocate(HeapObject::Scalar(3)).unwrap();

        assert!(partition.try_mark(a).unwrap());
        assert!(partition.try_mark(c).unwrap());
        assert!(!partition.try_mark(c).unwrap());

        assert_eq!(partition.marked_refs(), vec![a, c]);
        assert!(partition.verify().is_err());
        partition.marks().clear();
        assert!(partition.verify().is_ok());
    }
}
