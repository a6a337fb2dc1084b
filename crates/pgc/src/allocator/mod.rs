//! Allocator Module - Carving Objects Out of a Partition
//!
//! Two allocation strategies, one per collection strategy:
//!
//! - **Segregated free lists** (mark-sweep): exact size-class hit first, then
//!   the bump frontier, then a first-fit split of a larger free block.
//! - **Bump pointer** (copying): a single `top` pointer over the active
//!   semispace.
//!
//! Neither allocator ever collects. Exhaustion is reported as `None` so the
//! collector can run a cycle and retry once.
//!
//! ## Size Classes
//!
//! Every request is rounded up to a multiple of the configured granularity.
//! Each multiple is one class and one free list:
//!
//! ```text
//! granularity 8:   scalar (16) -> class 16,  pair (24) -> class 24
//! granularity 16:  scalar (16) -> class 16,  pair (24) -> class 32
//! ```

pub mod bump;
pub mod free_list;

pub use bump::{BumpRegion, SemiSpace, SemiSpacePair};
pub use free_list::FreeListSpace;

use crate::util::align_up;
use crate::util::constants::MIN_OBJECT_SIZE;

/// Size-class rounding rule shared by both allocators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeClasses {
    granularity: usize,
}

impl SizeClasses {
    /// `granularity` must be a power of two; `GcConfig::validate` checks it.
    pub fn new(granularity: usize) -> Self {
        debug_assert!(granularity.is_power_of_two());
        Self { granularity }
    }

    /// Block size handed out for an object of `size` bytes
    #[inline]
    pub fn block_size(&self, size: usize) -> usize {
        align_up(size.max(MIN_OBJECT_SIZE), self.granularity)
    }

    /// Smallest block that can ever exist
    #[inline]
    pub fn min_block(&self) -> usize {
        self.block_size(MIN_OBJECT_SIZE)
    }

    pub fn granularity(&self) -> usize {
        self.granularity
    }
}
