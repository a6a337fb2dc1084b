//! Util Module - Shared Utilities
//!
//! Constants and small helpers used throughout PGC.

/// Round `value` up to the next multiple of `alignment`.
///
/// `alignment` must be a power of two.
#[inline]
pub const fn align_up(value: usize, alignment: usize) -> usize {
    (value + alignment - 1) & !(alignment - 1)
}

/// Constants for PGC
pub mod constants {
    /// 1 Kilobyte
    pub const KB: usize = 1024;
    /// 1 Megabyte
    pub const MB: usize = 1024 * 1024;

    /// Object header: kind tag plus bookkeeping word
    pub const HEADER_SIZE: usize = 8;
    /// Word size of one payload field
    pub const WORD_SIZE: usize = 8;
    /// Smallest object the heap ever hands out (a scalar)
    pub const MIN_OBJECT_SIZE: usize = HEADER_SIZE + WORD_SIZE;

    /// Default arena size (bytes per semispace in copying mode): 1MB
    pub const DEFAULT_HEAP_SIZE: usize = MB;
    /// Smallest heap accepted by configuration validation
    pub const MIN_HEAP_SIZE: usize = KB;
    /// Default size-class granularity: 8 bytes
    pub const DEFAULT_SIZE_CLASS_GRANULARITY: usize = 8;
    /// Coarsest size-class granularity accepted
    pub const MAX_SIZE_CLASS_GRANULARITY: usize = 64;
    /// Upper bound on GC worker threads
    pub const MAX_WORKER_THREADS: usize = 64;
    /// Each partition must fit at least this many minimum blocks
    pub const MIN_BLOCKS_PER_PARTITION: usize = 4;
}
