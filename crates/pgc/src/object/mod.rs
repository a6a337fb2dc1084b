//! Object Module - GC-managed object model
//!
//! Two object shapes are enough to exercise graph tracing:
//!
//! ```text
//! Scalar:  [ header | i64 payload ]              16 bytes
//! Pair:    [ header | first ref | second ref ]   24 bytes
//! ```
//!
//! Objects never hold raw pointers. Edges are `ObjRef` handles of the form
//! `(partition, index, generation)`: the partition that owns the object, the
//! slot inside that partition, and the generation the slot had when the
//! reference was handed out. A reference whose generation no longer matches
//! its slot is stale.
//!
//! The mark bit is not stored in the object; it lives in the owning
//! partition's `MarkBitmap`, indexed by slot.

use crate::util::constants::{HEADER_SIZE, WORD_SIZE};
use serde::Serialize;
use std::fmt;

/// Handle to a heap object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ObjRef {
    partition: u32,
    index: u32,
    generation: u32,
}

impl ObjRef {
    pub(crate) const fn new(partition: u32, index: u32, generation: u32) -> Self {
        Self {
            partition,
            index,
            generation,
        }
    }

    /// Partition (and therefore worker) that owns the object
    #[inline]
    pub fn partition(&self) -> usize {
        self.partition as usize
    }

    /// Slot index inside the owning partition
    #[inline]
    pub fn index(&self) -> usize {
        self.index as usize
    }

    /// Slot generation, or semispace epoch in copying mode
    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ObjRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}:{}@{}", self.partition, self.index, self.generation)
    }
}

/// Object type discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ObjectKind {
    Scalar,
    Pair,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKind::Scalar => write!(f, "scalar"),
            ObjectKind::Pair => write!(f, "pair"),
        }
    }
}

/// A heap object
///
/// Matched exhaustively by the tracer, so adding a kind is a compile error
/// everywhere references are walked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapObject {
    /// Leaf holding one integer
    Scalar(i64),
    /// Two optional outgoing edges
    Pair {
        first: Option<ObjRef>,
        second: Option<ObjRef>,
    },
}

impl HeapObject {
    /// Build a pair
    pub fn pair(first: Option<ObjRef>, second: Option<ObjRef>) -> Self {
        HeapObject::Pair { first, second }
    }

    /// Object type discriminant
    pub fn kind(&self) -> ObjectKind {
        match self {
            HeapObject::Scalar(_) => ObjectKind::Scalar,
            HeapObject::Pair { .. } => ObjectKind::Pair,
        }
    }

    /// Unrounded size in bytes (header plus payload)
    pub fn size(&self) -> usize {
        match self {
            HeapObject::Scalar(_) => HEADER_SIZE + WORD_SIZE,
            HeapObject::Pair { .. } => HEADER_SIZE + 2 * WORD_SIZE,
        }
    }

    /// Outgoing references, in field order
    #[inline]
    pub fn children(&self) -> impl Iterator<Item = ObjRef> {
        let fields = match *self {
            HeapObject::Scalar(_) => [None, None],
            HeapObject::Pair { first, second } => [first, second],
        };
        fields.into_iter().flatten()
    }

    /// Rewrite every outgoing reference through `remap`
    ///
    /// Stops at the first error, leaving earlier fields rewritten.
    pub(crate) fn try_remap<E>(
        &mut self,
        mut remap: impl FnMut(ObjRef) -> Result<ObjRef, E>,
    ) -> Result<(), E> {
        if let HeapObject::Pair { first, second } = self {
            for field in [first, second] {
                if let Some(r) = field {
                    *field = Some(remap(*r)?);
                }
            }
        }
        Ok(())
    }
}
