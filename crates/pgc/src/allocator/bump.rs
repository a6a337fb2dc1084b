//! Allocator Submodule - Bump Pointer Allocation
//!
//! Bump pointer allocation is the fastest allocation technique: one bounds
//! check and one add. It backs the copying collector's semispaces and the
//! never-yet-used frontier of the free-list arena.
//!
//! Offsets are relative to the start of the region; the heap is an index
//! arena, so offsets only serve the byte accounting (capacity, coalescing).

use crate::heap::slab::Miss;
use crate::object::HeapObject;

/// BumpRegion - bump pointer over `[0, end)`
#[derive(Debug, Clone)]
pub struct BumpRegion {
    top: usize,
    end: usize,
}

impl BumpRegion {
    pub fn new(capacity: usize) -> Self {
        Self {
            top: 0,
            end: capacity,
        }
    }

    /// Carve `size` bytes, returning the offset
    ///
    /// Returns `None` when the bump pointer would pass the bound.
    #[inline]
    pub fn allocate(&mut self, size: usize) -> Option<usize> {
        let new_top = self.top.checked_add(size)?;
        if new_top > self.end {
            return None;
        }

        let offset = self.top;
        self.top = new_top;
        Some(offset)
    }

    pub fn reset(&mut self) {
        self.top = 0;
    }

    pub fn top(&self) -> usize {
        self.top
    }

    pub fn remaining(&self) -> usize {
        self.end - self.top
    }

    pub fn capacity(&self) -> usize {
        self.end
    }
}

/// An object placed in a semispace
#[derive(Debug, Clone, Copy)]
pub(crate) struct Placed {
    pub(crate) offset: usize,
    pub(crate) size: usize,
    pub(crate) object: HeapObject,
}

/// SemiSpace - one half of a copying partition
///
/// Objects are addressed by their allocation position, which is also the
/// order evacuation copies them in.
pub struct SemiSpace {
    region: BumpRegion,
    objects: Vec<Placed>,
}

impl SemiSpace {
    pub fn new(capacity: usize) -> Self {
        Self {
            region: BumpRegion::new(capacity),
            objects: Vec::new(),
        }
    }

    /// Bump-allocate `size` bytes for `object`, returning its position
    pub(crate) fn allocate(&mut self, object: HeapObject, size: usize) -> Option<u32> {
        let index = u32::try_from(self.objects.len()).ok()?;
        let offset = self.region.allocate(size)?;
        self.objects.push(Placed {
            offset,
            size,
            object,
        });
        Some(index)
    }

    pub(crate) fn get(&self, index: usize) -> Option<&Placed> {
        self.objects.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Placed> {
        self.objects.get_mut(index)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Placed> {
        self.objects.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Placed> {
        self.objects.iter_mut()
    }

    /// Discard every object at once
    pub fn reset(&mut self) {
        self.objects.clear();
        self.region.reset();
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn used_bytes(&self) -> usize {
        self.region.top()
    }

    pub fn remaining(&self) -> usize {
        self.region.remaining()
    }

    pub fn capacity(&self) -> usize {
        self.region.capacity()
    }
}

/// SemiSpacePair - active space plus reserve, flipped after each evacuation
///
/// References into the active space carry the current `epoch` as their
/// generation. A flip bumps the epoch, so any reference that was not
/// forwarded during the copy is detectably stale afterwards.
pub struct SemiSpacePair {
    active: SemiSpace,
    reserve: SemiSpace,
    epoch: u32,
}

impl SemiSpacePair {
    pub fn new(capacity: usize) -> Self {
        Self {
            active: SemiSpace::new(capacity),
            reserve: SemiSpace::new(capacity),
            epoch: 0,
        }
    }

    /// Allocate into the active space, returning `(index, epoch)`
    pub(crate) fn allocate(&mut self, object: HeapObject, size: usize) -> Option<(u32, u32)> {
        let index = self.active.allocate(object, size)?;
        Some((index, self.epoch))
    }

    pub(crate) fn get(&self, index: usize, epoch: u32) -> Result<&Placed, Miss> {
        if epoch != self.epoch {
            return Err(Miss::Stale);
        }
        self.active.get(index).ok_or(Miss::Invalid)
    }

    pub(crate) fn get_mut(&mut self, index: usize, epoch: u32) -> Result<&mut Placed, Miss> {
        if epoch != self.epoch {
            return Err(Miss::Stale);
        }
        self.active.get_mut(index).ok_or(Miss::Invalid)
    }

    /// Active space (read) and reserve space (write) at the same time
    pub(crate) fn split_mut(&mut self) -> (&SemiSpace, &mut SemiSpace) {
        (&self.active, &mut self.reserve)
    }

    pub(crate) fn reserve_mut(&mut self) -> &mut SemiSpace {
        &mut self.reserve
    }

    /// Make the reserve the active space and drop the old one wholesale
    pub(crate) fn flip(&mut self) {
        std::mem::swap(&mut self.active, &mut self.reserve);
        self.reserve.reset();
        self.epoch = self.next_epoch();
    }

    pub fn active(&self) -> &SemiSpace {
        &self.active
    }

    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    pub fn next_epoch(&self) -> u32 {
        self.epoch.wrapping_add(1)
    }
}
