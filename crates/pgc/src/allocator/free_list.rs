//! Free-List Arena - Segregated Free Lists over a Bump Frontier
//!
//! The arena is tiled by blocks, kept in offset order:
//!
//! ```text
//! 0                                                  top          capacity
//! ┌──────┬────────┬──────┬──────────────┬──────┬─────┬──────────────┐
//! │ live │  free  │ live │     free     │ live │ ... │  untouched   │
//! └──────┴────────┴──────┴──────────────┴──────┴─────┴──────────────┘
//!          ▲                 ▲
//!          └── free_lists[24]└── free_lists[48]
//! ```
//!
//! Every byte below the bump frontier belongs to exactly one block. A free
//! block is listed under its exact (size-class rounded) size. Allocation
//! order:
//!
//! 1. pop the list for the requested class
//! 2. bump the frontier
//! 3. split the smallest free block that leaves a valid remainder
//!
//! The sweep in `crate::sweep` is the only code that turns live blocks into
//! free ones.

use super::bump::BumpRegion;
use super::SizeClasses;
use crate::ensure_invariant;
use crate::error::Result;
use crate::heap::slab::{Miss, Slab};
use crate::object::HeapObject;
use std::collections::BTreeMap;

/// Block state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BlockState {
    /// Holds the object in this slab slot
    Occupied(u32),
    Free,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Block {
    pub(crate) size: usize,
    pub(crate) state: BlockState,
}

/// Slab entry: the object and where its block starts
#[derive(Debug, Clone, Copy)]
pub(crate) struct Entry {
    pub(crate) offset: usize,
    pub(crate) object: HeapObject,
}

/// FreeListSpace - mark-sweep arena of one partition
pub struct FreeListSpace {
    pub(crate) classes: SizeClasses,
    pub(crate) frontier: BumpRegion,
    pub(crate) blocks: BTreeMap<usize, Block>,
    /// block size -> offsets of free blocks of that size
    pub(crate) free_lists: BTreeMap<usize, Vec<usize>>,
    pub(crate) objects: Slab<Entry>,
    pub(crate) used_bytes: usize,
    pub(crate) free_bytes: usize,
}

impl FreeListSpace {
    pub fn new(capacity: usize, classes: SizeClasses) -> Self {
        Self {
            classes,
            frontier: BumpRegion::new(capacity),
            blocks: BTreeMap::new(),
            free_lists: BTreeMap::new(),
            objects: Slab::new(),
            used_bytes: 0,
            free_bytes: 0,
        }
    }

    /// Place `object`, returning its slab `(index, generation)`
    ///
    /// Returns `None` when no free block, frontier space, or splittable block
    /// can hold it.
    pub(crate) fn allocate(&mut self, object: HeapObject) -> Option<(u32, u32)> {
        let size = self.classes.block_size(object.size());

        let offset = match self.take_exact(size) {
            Some(offset) => offset,
            None => match self.frontier.allocate(size) {
                Some(offset) => offset,
                None => self.take_split(size)?,
            },
        };

        let Some((index, generation)) = self.objects.insert(Entry { offset, object }) else {
            // Slot space exhausted; hand the block back untouched
            self.release(offset, size);
            return None;
        };

        self.blocks.insert(
            offset,
            Block {
                size,
                state: BlockState::Occupied(index),
            },
        );
        self.used_bytes += size;
        Some((index, generation))
    }

    fn take_exact(&mut self, size: usize) -> Option<usize> {
        let list = self.free_lists.get_mut(&size)?;
        let offset = list.pop()?;
        if list.is_empty() {
            self.free_lists.remove(&size);
        }
        self.free_bytes -= size;
        Some(offset)
    }

    /// First fit among larger classes: the remainder must itself be a block
    fn take_split(&mut self, size: usize) -> Option<usize> {
        let min_block = self.classes.min_block();
        let block_size = *self.free_lists.range(size + min_block..).next()?.0;
        let offset = self.take_exact(block_size)?;

        let remainder = block_size - size;
        self.blocks.insert(
            offset + size,
            Block {
                size: remainder,
                state: BlockState::Free,
            },
        );
        self.release_listed(offset + size, remainder);
        self.free_bytes += remainder;
        Some(offset)
    }

    fn release(&mut self, offset: usize, size: usize) {
        self.blocks.insert(
            offset,
            Block {
                size,
                state: BlockState::Free,
            },
        );
        self.release_listed(offset, size);
        self.free_bytes += size;
    }

    fn release_listed(&mut self, offset: usize, size: usize) {
        self.free_lists.entry(size).or_default().push(offset);
    }

    /// Rebuild every size-class list from the block map
    pub(crate) fn rebuild_free_lists(&mut self) {
        self.free_lists.clear();
        self.free_bytes = 0;
        let free = self
            .blocks
            .iter()
            .filter(|(_, block)| block.state == BlockState::Free)
            .map(|(&offset, block)| (offset, block.size))
            .collect::<Vec<_>>();

        for (offset, size) in free {
            self.release_listed(offset, size);
            self.free_bytes += size;
        }
    }

    pub(crate) fn get(&self, index: usize, generation: u32) -> std::result::Result<&HeapObject, Miss> {
        self.objects.get(index, generation).map(|entry| &entry.object)
    }

    pub(crate) fn get_mut(
        &mut self,
        index: usize,
        generation: u32,
    ) -> std::result::Result<&mut HeapObject, Miss> {
        self.objects
            .get_mut(index, generation)
            .map(|entry| &mut entry.object)
    }

    /// Live object count
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.len() == 0
    }

    pub fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    pub fn free_bytes(&self) -> usize {
        self.free_bytes
    }

    /// Bytes neither occupied nor on a free list
    pub fn untouched_bytes(&self) -> usize {
        self.frontier.remaining()
    }

    pub fn capacity(&self) -> usize {
        self.frontier.capacity()
    }

    pub fn free_block_count(&self) -> usize {
        self.free_lists.values().map(Vec::len).sum()
    }

    pub fn largest_free_block(&self) -> usize {
        self.free_lists.keys().next_back().copied().unwrap_or(0)
    }

    /// Check block tiling and free-list bookkeeping
    pub(crate) fn verify(&self) -> Result<()> {
        let min_block = self.classes.min_block();
        let mut expected_offset = 0;
        let mut used = 0;
        let mut free = 0;

        for (&offset, block) in &self.blocks {
            ensure_invariant!(
                offset == expected_offset,
                "block at {} but previous block ends at {}",
                offset,
                expected_offset
            );
            ensure_invariant!(
                block.size >= min_block,
                "block at {} is {} bytes, minimum is {}",
                offset,
                block.size,
                min_block
            );

            match block.state {
                BlockState::Occupied(index) => {
                    let generation = self.objects.generation_of(index as usize);
                    let entry = generation.and_then(|g| self.objects.get(index as usize, g).ok());
                    ensure_invariant!(
                        entry.map(|e| e.offset) == Some(offset),
                        "block at {} names slot {} which does not point back",
                        offset,
                        index
                    );
                    used += block.size;
                },
                BlockState::Free => {
                    ensure_invariant!(
                        self.free_lists
                            .get(&block.size)
                            .is_some_and(|list| list.contains(&offset)),
                        "free block at {} ({} bytes) missing from its size class",
                        offset,
                        block.size
                    );
                    free += block.size;
                },
            }

            expected_offset = offset + block.size;
        }

        ensure_invariant!(
            expected_offset == self.frontier.top(),
            "blocks end at {} but bump frontier is at {}",
            expected_offset,
            self.frontier.top()
        );
        ensure_invariant!(
            used == self.used_bytes && free == self.free_bytes,
            "accounting drift: used {} vs {}, free {} vs {}",
            used,
            self.used_bytes,
            free,
            self.free_bytes
        );
        ensure_invariant!(
            self.objects.len() == self.blocks.values().filter(|b| b.state != BlockState::Free).count(),
            "slab holds {} objects but {} blocks are occupied",
            self.objects.len(),
            self.blocks.values().filter(|b| b.state != BlockState::Free).count()
        );

        Ok(())
    }
}
