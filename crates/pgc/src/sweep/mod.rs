//! Sweep Module - Mark-Sweep Reclamation
//!
//! After marking, each worker sweeps its own partition. The sweep walks the
//! block map in offset order and frees every occupied block whose slot is
//! unmarked:
//!
//! ```text
//! before:  │ free 16 │ dead 24 │ dead 16 │ live 24 │ dead 16 │ free 24 │
//! after:   │      free 56                │ live 24 │ free 16 │ free 24 │
//!                    ▲ coalesced backward            ▲ no forward merge
//! ```
//!
//! A newly freed block merges into an immediately preceding free block.
//! A free block that follows it is left alone, and nothing is folded back
//! into the bump frontier. Allocation's first-fit split works around the
//! resulting fragmentation.
//!
//! Slot generations are bumped as objects die, so references to them go
//! stale immediately.

use crate::allocator::free_list::{Block, BlockState, FreeListSpace};
use crate::error::{GcError, Result};
use crate::heap::partition::{Partition, Space};
use crate::marker::MarkBitmap;
use serde::Serialize;

/// Result of sweeping one partition
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SweepStats {
    /// Blocks visited
    pub scanned: usize,
    /// Objects freed
    pub reclaimed: usize,
    /// Objects that survived
    pub live: usize,
    pub bytes_reclaimed: usize,
    /// Freed blocks absorbed by the free block before them
    pub coalesced: usize,
    /// Free blocks after the sweep
    pub free_blocks: usize,
}

impl SweepStats {
    pub fn merge(&mut self, other: &SweepStats) {
        self.scanned += other.scanned;
        self.reclaimed += other.reclaimed;
        self.live += other.live;
        self.bytes_reclaimed += other.bytes_reclaimed;
        self.coalesced += other.coalesced;
        self.free_blocks += other.free_blocks;
    }
}

/// Sweep a mark-sweep partition and clear its marks
pub(crate) fn sweep_partition(partition: &mut Partition) -> Result<SweepStats> {
    let id = partition.id();
    match partition.parts_mut() {
        (Space::FreeList(space), marks) => Ok(sweep(space, marks)),
        (Space::SemiSpace(_), _) => Err(GcError::InvariantViolation(format!(
            "sweep requested for copying partition {}",
            id
        ))),
    }
}

pub(crate) fn sweep(space: &mut FreeListSpace, marks: &MarkBitmap) -> SweepStats {
    let min_block = space.classes.min_block();
    let offsets: Vec<usize> = space.blocks.keys().copied().collect();
    let mut stats = SweepStats::default();
    let mut preceding_free: Option<usize> = None;

    for offset in offsets {
        let Some(block) = space.blocks.get(&offset).copied() else {
            continue;
        };
        assert!(
            block.size >= min_block,
            "heap corruption: block at {} is {} bytes, minimum is {}",
            offset,
            block.size,
            min_block
        );
        stats.scanned += 1;

        let index = match block.state {
            BlockState::Free => {
                preceding_free = Some(offset);
                continue;
            },
            BlockState::Occupied(index) => index,
        };

        if marks.is_marked(index as usize) {
            stats.live += 1;
            preceding_free = None;
            continue;
        }

        space.objects.remove(index);
        space.used_bytes -= block.size;
        stats.reclaimed += 1;
        stats.bytes_reclaimed += block.size;

        let merged = preceding_free.and_then(|prev| {
            let previous = space.blocks.get_mut(&prev)?;
            (prev + previous.size == offset).then(|| previous.size += block.size)
        });

        if merged.is_some() {
            space.blocks.remove(&offset);
            stats.coalesced += 1;
        } else {
            space.blocks.insert(
                offset,
                Block {
                    size: block.size,
                    state: BlockState::Free,
                },
            );
            preceding_free = Some(offset);
        }
    }

    marks.clear();
    space.rebuild_free_lists();
    stats.free_blocks = space.free_block_count();
    stats
}
