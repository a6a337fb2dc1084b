//! Mark Bitmap - Tracking Marked Objects
//!
//! One bit per slab slot of a partition. Bits are set with an atomic
//! `fetch_or`, which doubles as test-and-set: exactly one worker observes the
//! 0 -> 1 transition for a given object, and only that worker enqueues it.
//!
//! Bitmap Structure:
//! ```text
//! Partition: 64KB, smallest object 16 bytes
//! Max slots: 64KB / 16 = 4096
//! Bitmap size: 4096 bits = 64 words
//!
//! Slot 130:
//! - Word index: 130 / 64 = 2
//! - Bit offset: 130 % 64 = 2
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// MarkBitmap - bitmap tracking marked slots of one partition
pub struct MarkBitmap {
    /// 1 bit per slot
    bits: Vec<AtomicU64>,

    /// Number of slots covered
    capacity: usize,
}

impl MarkBitmap {
    /// Create a bitmap covering `capacity` slots
    pub fn new(capacity: usize) -> Self {
        let word_count = capacity.div_ceil(64);
        let bits = (0..word_count).map(|_| AtomicU64::new(0)).collect();

        Self { bits, capacity }
    }

    /// Set the bit for `index`
    ///
    /// # Returns
    /// `Some(true)` if this call marked the slot, `Some(false)` if it was
    /// already marked, `None` if `index` is outside the bitmap.
    #[inline]
    pub fn try_mark(&self, index: usize) -> Option<bool> {
        if index >= self.capacity {
            return None;
        }
        let (word_index, bit) = Self::calculate_indices(index);
        let previous = self.bits[word_index].fetch_or(bit, Ordering::AcqRel);
        Some(previous & bit == 0)
    }

    /// Check if slot `index` is marked
    #[inline]
    pub fn is_marked(&self, index: usize) -> bool {
        if index >= self.capacity {
            return false;
        }
        let (word_index, bit) = Self::calculate_indices(index);
        self.bits[word_index].load(Ordering::Acquire) & bit != 0
    }

    /// Clear all bits
    pub fn clear(&self) {
        for word in &self.bits {
            word.store(0, Ordering::Relaxed);
        }
    }

    /// Count marked slots
    pub fn count_marked(&self) -> usize {
        self.bits
            .iter()
            .map(|word| word.load(Ordering::Relaxed).count_ones() as usize)
            .sum()
    }

    /// Indices of all marked slots, ascending
    pub fn marked_indices(&self) -> MarkedIndices<'_> {
        MarkedIndices {
            bitmap: self,
            current_word: 0,
            pending: 0,
        }
    }

    /// Number of slots covered
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    fn calculate_indices(index: usize) -> (usize, u64) {
        (index / 64, 1u64 << (index % 64))
    }
}

/// Word-at-a-time scan over the marked slots
pub struct MarkedIndices<'a> {
    bitmap: &'a MarkBitmap,
    current_word: usize,
    /// Bits of the current word not yet yielded
    pending: u64,
}

impl Iterator for MarkedIndices<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        while self.pending == 0 {
            let word = self.bitmap.bits.get(self.current_word)?;
            self.pending = word.load(Ordering::Relaxed);
            self.current_word += 1;
        }

        let bit = self.pending.trailing_zeros() as usize;
        self.pending &= self.pending - 1;
        Some((self.current_word - 1) * 64 + bit)
    }
}
