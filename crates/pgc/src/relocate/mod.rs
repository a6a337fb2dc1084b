//! Relocate Module - Semispace Evacuation
//!
//! Copying collection runs in two barrier-separated steps per partition:
//!
//! 1. **Evacuate**: copy every marked object of the active space, in
//!    allocation order, into the reserve space and record where it went.
//!    References inside the copies still point at the old space.
//! 2. **Fixup**: once every partition has evacuated, rewrite the pair fields
//!    of the copies through the published forwarding tables, then flip the
//!    spaces. The old active space is discarded in one reset.
//!
//! ```text
//! active (epoch 3)            reserve (epoch 4)
//! ┌────┬────┬────┬────┐       ┌────┬────┐
//! │ A  │ x  │ B  │ x  │  ──▶  │ A' │ B' │      x = unmarked, not copied
//! └────┴────┴────┴────┘       └────┴────┘
//! ```
//!
//! Each object is copied once and every edge is resolved through the same
//! table, so shared children stay shared and cycles stay cycles.

pub mod forwarding;

pub use forwarding::{forward, ForwardingTable};

use crate::allocator::bump::SemiSpacePair;
use crate::ensure_invariant;
use crate::error::{GcError, Result};
use crate::heap::partition::{Partition, Space};
use crate::marker::MarkBitmap;
use crate::object::ObjRef;
use serde::Serialize;

/// Result of evacuating (and later fixing up) one partition
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EvacuationStats {
    /// Objects copied into the reserve space
    pub evacuated: usize,
    /// Unmarked objects left behind
    pub discarded: usize,
    pub bytes_copied: usize,
    pub bytes_discarded: usize,
    /// References rewritten during fixup
    pub references_fixed: usize,
}

impl EvacuationStats {
    pub fn merge(&mut self, other: &EvacuationStats) {
        self.evacuated += other.evacuated;
        self.discarded += other.discarded;
        self.bytes_copied += other.bytes_copied;
        self.bytes_discarded += other.bytes_discarded;
        self.references_fixed += other.references_fixed;
    }
}

/// Evacuate a copying partition's marked objects
pub(crate) fn evacuate_partition(
    partition: &mut Partition,
) -> Result<(ForwardingTable, EvacuationStats)> {
    let id = partition.id();
    match partition.parts_mut() {
        (Space::SemiSpace(pair), marks) => evacuate(id, pair, marks),
        (Space::FreeList(_), _) => Err(wrong_space("evacuation", id)),
    }
}

/// Rewrite a partition's copied objects, flip its spaces and clear its marks
///
/// Returns the number of references rewritten.
pub(crate) fn fixup_partition(partition: &mut Partition, tables: &[ForwardingTable]) -> Result<usize> {
    let id = partition.id();
    match partition.parts_mut() {
        (Space::SemiSpace(pair), marks) => {
            let fixed = fixup(pair, tables)?;
            marks.clear();
            Ok(fixed)
        },
        (Space::FreeList(_), _) => Err(wrong_space("fixup", id)),
    }
}

pub(crate) fn evacuate(
    partition: usize,
    pair: &mut SemiSpacePair,
    marks: &MarkBitmap,
) -> Result<(ForwardingTable, EvacuationStats)> {
    let to_epoch = pair.next_epoch();
    let mut table = ForwardingTable::new(partition, pair.epoch(), pair.active().len());
    let mut stats = EvacuationStats::default();
    let (from, to) = pair.split_mut();

    ensure_invariant!(
        to.is_empty(),
        "reserve space of partition {} holds {} objects before evacuation",
        partition,
        to.len()
    );

    for (index, placed) in from.iter().enumerate() {
        if !marks.is_marked(index) {
            stats.discarded += 1;
            stats.bytes_discarded += placed.size;
            continue;
        }

        let Some(new_index) = to.allocate(placed.object, placed.size) else {
            let required = from
                .iter()
                .enumerate()
                .filter(|(i, _)| marks.is_marked(*i))
                .map(|(_, p)| p.size)
                .sum();
            return Err(GcError::EvacuationOverflow {
                partition,
                required,
                capacity: to.capacity(),
            });
        };

        table.insert(index, ObjRef::new(partition as u32, new_index, to_epoch));
        stats.evacuated += 1;
        stats.bytes_copied += placed.size;
    }

    Ok((table, stats))
}

pub(crate) fn fixup(pair: &mut SemiSpacePair, tables: &[ForwardingTable]) -> Result<usize> {
    let mut fixed = 0;
    for placed in pair.reserve_mut().iter_mut() {
        placed.object.try_remap(|r| {
            fixed += 1;
            forward(tables, r)
        })?;
    }
    pair.flip();
    Ok(fixed)
}

fn wrong_space(phase: &str, partition: usize) -> GcError {
    GcError::InvariantViolation(format!(
        "{} requested for mark-sweep partition {}",
        phase, partition
    ))
}
