//! Forwarding Table - Index Remap During Evacuation
//!
//! One table per copying partition, built while that partition evacuates
//! and published read-only (inside an `Arc<Vec<_>>`) once every partition
//! has finished. Fixup and root remapping resolve old references through it.
//!
//! Structure:
//! ```text
//! from-space slot:   0      1      2      3      4
//! entries:        [ #0:0 | None | #0:1 | None | #0:2 ]
//!                    ▲ new ref carries the to-space epoch
//! ```
//!
//! A lookup only succeeds for references that carry the table's from-space
//! epoch, so a reference from an earlier cycle can never be forwarded by
//! accident.

use crate::error::{GcError, Result};
use crate::object::ObjRef;

/// ForwardingTable - old slot index to new reference
#[derive(Debug, Clone)]
pub struct ForwardingTable {
    partition: usize,
    from_epoch: u32,
    entries: Vec<Option<ObjRef>>,
    forwarded: usize,
}

impl ForwardingTable {
    /// Table for a from-space holding `len` objects
    pub fn new(partition: usize, from_epoch: u32, len: usize) -> Self {
        Self {
            partition,
            from_epoch,
            entries: vec![None; len],
            forwarded: 0,
        }
    }

    /// Record that slot `index` now lives at `new_ref`
    pub(crate) fn insert(&mut self, index: usize, new_ref: ObjRef) {
        if let Some(entry) = self.entries.get_mut(index) {
            if entry.replace(new_ref).is_none() {
                self.forwarded += 1;
            }
        }
    }

    /// New location of `r`, if it was evacuated from this table's space
    #[inline]
    pub fn lookup(&self, r: ObjRef) -> Option<ObjRef> {
        if r.partition() != self.partition || r.generation() != self.from_epoch {
            return None;
        }
        self.entries.get(r.index()).copied().flatten()
    }

    pub fn partition(&self) -> usize {
        self.partition
    }

    pub fn from_epoch(&self) -> u32 {
        self.from_epoch
    }

    /// Number of forwarded objects
    pub fn len(&self) -> usize {
        self.forwarded
    }

    pub fn is_empty(&self) -> bool {
        self.forwarded == 0
    }
}

/// Resolve `r` through the table of its owning partition
///
/// A live reference without an entry means marking missed an object, which
/// is a collector bug.
pub fn forward(tables: &[ForwardingTable], r: ObjRef) -> Result<ObjRef> {
    tables
        .get(r.partition())
        .and_then(|table| table.lookup(r))
        .ok_or_else(|| GcError::InvariantViolation(format!("no forwarding entry for {}", r)))
}
