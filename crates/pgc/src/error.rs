//! Error Module - PGC Error Types
//!
//! Defines all error types used in PGC.
//!
//! # Error Categories
//!
//! ## Memory Errors
//! - `OutOfMemory` - Allocation still fails after a full collection
//! - `EvacuationOverflow` - Live set does not fit the reserve semispace
//!
//! ## Reference Errors
//! - `StaleReference` - Reference to a reclaimed or moved object
//! - `InvalidReference` - Reference that never named a heap slot
//! - `TypeMismatch` - Pair operation on a scalar (or vice versa)
//!
//! ## Internal Errors
//! - `InvariantViolation` - Heap structure corrupted, a bug in PGC
//! - `WorkerPanicked` / `WorkerDisconnected` - Worker pool failure
//!
//! ## Lifecycle and Configuration Errors
//! - `ShutDown` - Collector already shut down
//! - `WorkerSpawn` - Could not start GC worker threads
//! - `Configuration` - Invalid configuration
//!
//! Soft allocation failure is deliberately absent: inside the heap it is a
//! plain `None`, and the orchestrator answers it with a collection.

use crate::config::ConfigError;
use crate::object::{ObjRef, ObjectKind};
use thiserror::Error;

/// Main error type for all PGC operations
///
/// # Examples
///
/// ```rust
/// use pgc::GcError;
///
/// fn handle_error(err: GcError) {
///     match err {
///         GcError::OutOfMemory { requested, available } => {
///             eprintln!("OOM: requested {}, available {}", requested, available);
///         }
///         GcError::StaleReference(r) => {
///             eprintln!("object {} is gone", r);
///         }
///         _ => {
///             eprintln!("Other error: {}", err);
///         }
///     }
/// }
/// ```
#[derive(Debug, Error)]
pub enum GcError {
    /// Out of memory - heap exhaustion
    ///
    /// **When returned:** Allocation failed, a full collection ran, and the
    /// single retry failed as well.
    ///
    /// **Recovery strategy:** None inside the collector. The live set does not
    /// fit the configured heap.
    #[error("Out of memory: requested {requested} bytes, available {available} bytes")]
    OutOfMemory { requested: usize, available: usize },

    /// Evacuation would overflow the reserve semispace
    ///
    /// **When returned:** Copying the marked objects of a partition needs
    /// more room than its reserve space has.
    ///
    /// **Recovery strategy:** None. Never retried.
    #[error("Evacuation overflow in partition {partition}: need {required} bytes, semispace holds {capacity}")]
    EvacuationOverflow {
        partition: usize,
        required: usize,
        capacity: usize,
    },

    /// Stale reference
    ///
    /// **When returned:** The slot named by the reference was reclaimed, or
    /// the object was moved by a semispace flip while not rooted.
    ///
    /// **Recovery strategy:** Drop the reference; keep objects rooted while
    /// they are needed.
    #[error("Stale reference: {0}")]
    StaleReference(ObjRef),

    /// Invalid reference
    ///
    /// **When returned:** Partition or slot index outside the heap.
    #[error("Invalid reference: {0}")]
    InvalidReference(ObjRef),

    /// Object kind mismatch
    ///
    /// **Example scenario:** `set_first` on a scalar.
    #[error("Type mismatch on {reference}: expected {expected}, found {actual}")]
    TypeMismatch {
        reference: ObjRef,
        expected: ObjectKind,
        actual: ObjectKind,
    },

    /// Internal error - heap invariant violated
    ///
    /// **When returned:** A forwarding entry missing for a live object, a
    /// mark bit outside the slab, and similar corruption.
    ///
    /// **Recovery strategy:** Cannot recover - this is a bug
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// A GC worker panicked while executing a phase
    #[error("GC worker {worker} panicked: {message}")]
    WorkerPanicked { worker: usize, message: String },

    /// A GC worker's channel closed unexpectedly
    #[error("GC worker {0} disconnected")]
    WorkerDisconnected(usize),

    /// Spawning the worker threads failed
    #[error("Failed to spawn GC worker thread: {0}")]
    WorkerSpawn(#[from] std::io::Error),

    /// Operation on a collector that was shut down
    #[error("Collector has been shut down")]
    ShutDown,

    /// Configuration error
    ///
    /// **When returned:** `GcConfig::validate` rejected the configuration.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

impl GcError {
    /// Check if the caller can continue using the collector after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            GcError::StaleReference(_)
                | GcError::InvalidReference(_)
                | GcError::TypeMismatch { .. }
        )
    }

    /// Check if this error is a terminal memory failure
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            GcError::OutOfMemory { .. } | GcError::EvacuationOverflow { .. }
        )
    }

    /// Check if this error indicates a bug in the code
    pub fn is_bug(&self) -> bool {
        matches!(
            self,
            GcError::InvariantViolation(_)
                | GcError::WorkerPanicked { .. }
                | GcError::WorkerDisconnected(_)
        )
    }
}

/// Result type alias for PGC operations
pub type Result<T> = std::result::Result<T, GcError>;

/// Return an `InvariantViolation` unless the condition holds
#[macro_export]
macro_rules! ensure_invariant {
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            return Err($crate::error::GcError::InvariantViolation(format!($($arg)*)));
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let oom = GcError::OutOfMemory {
            requested: 16,
            available: 0,
        };
        assert!(oom.is_fatal());
        assert!(!oom.is_bug());
        assert!(!oom.is_recoverable());

        let stale = GcError::StaleReference(ObjRef::new(0, 3, 1));
        assert!(stale.is_recoverable());
        assert!(!stale.is_fatal());

        let bug = GcError::InvariantViolation("free block too small".into());
        assert!(bug.is_bug());
    }

    #[test]
    fn test_ensure_invariant() {
        fn check(n: usize) -> Result<()> {
            ensure_invariant!(n > 2, "n = {} too small", n);
            Ok(())
        }

        assert!(check(3).is_ok());
        let err = check(1).unwrap_err();
        assert!(err.is_bug());
        assert!(err.to_string().contains("n = 1 too small"));
    }
}
