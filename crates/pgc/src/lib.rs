//! # PGC - Parallel Tracing Garbage Collector
//!
//! PGC manages a heap of small objects (integer scalars and pairs of
//! references) and reclaims the unreachable ones with a pool of worker
//! threads. Two strategies are available per collector:
//!
//! - **Mark-Sweep**: parallel mark, then each worker sweeps its own
//!   partition into size-classed free lists with backward coalescing
//! - **Copying**: parallel mark, then each worker evacuates its partition's
//!   survivors into the reserve semispace and fixes up every reference
//!
//! ## Quick Start
//!
//! ```rust
//! use pgc::{Collector, GcConfig};
//!
//! fn main() -> Result<(), pgc::GcError> {
//!     let gc = Collector::new(GcConfig::default())?;
//!
//!     // New objects are pushed onto the root stack
//!     let one = gc.create_scalar(1)?;
//!     let two = gc.create_scalar(2)?;
//!
//!     // Operands on top of the root stack are consumed by create_pair
//!     let pair = gc.create_pair(Some(one), Some(two))?;
//!     assert_eq!(gc.roots(), vec![pair]);
//!
//!     gc.pop_root();
//!     let report = gc.collect()?;
//!     assert_eq!(report.to_string(), "[3] objects collected, [0] objects remaining.");
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        Collector                          │
//! │   root stack ── allocation mutex ── state / cycle count   │
//! └─────────────┬────────────────────────────┬───────────────┘
//!               │ commands                   ▲ reports (barrier)
//!               ▼                            │
//! ┌──────────────────────────────────────────────────────────┐
//! │                      GcThreadPool                         │
//! │  ┌───────────┐   ┌───────────┐         ┌───────────┐     │
//! │  │ worker 0  │◀─▶│ worker 1  │◀─ ... ─▶│ worker N-1│     │
//! │  │ MarkQueue │   │ MarkQueue │  steal  │ MarkQueue │     │
//! │  └─────┬─────┘   └─────┬─────┘         └─────┬─────┘     │
//! └────────┼───────────────┼─────────────────────┼───────────┘
//!          ▼               ▼                     ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │  Heap: partition 0 │ partition 1 │ ... │ partition N-1    │
//! │  (free-list space or semispace pair, plus a mark bitmap)  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ### GC Cycle Phases
//!
//! 1. **Mark**: roots are split across workers; each traces through its
//!    own queue and steals from the others once it runs dry
//! 2. **Sweep** (mark-sweep): each worker frees the unmarked blocks of its
//!    partition and rebuilds the free lists
//! 3. **Evacuate** (copying): each worker copies its marked objects into the
//!    reserve space and builds a forwarding table
//! 4. **Fixup** (copying): each worker rewrites the fields of its copies
//!    through every forwarding table, then flips its semispaces
//!
//! Every phase ends at a barrier: the collector waits for a report from
//! all workers before starting the next one.
//!
//! ## References
//!
//! Objects are addressed by [`ObjRef`] handles, not raw pointers. A handle
//! carries its partition, slot and generation; once the object dies (or is
//! moved by a copying cycle) the old handle is rejected with
//! [`GcError::StaleReference`].
//!
//! ## Limitations
//!
//! - **Stop-the-world**: mutators wait for the whole cycle
//! - **Non-generational**: every cycle traces the full heap
//! - **Precise roots only**: anything not on the root stack or reachable
//!   from it is garbage

// Core GC modules
pub mod config;
pub mod error;
pub mod gc;
pub mod gc_threads;

// Heap and allocation
pub mod allocator;
pub mod heap;
pub mod object;

// GC algorithm components
pub mod marker;
pub mod relocate;
pub mod sweep;

// Monitoring
pub mod logging;
pub mod stats;

// Utilities
pub mod util;

// Re-export main types for convenience
pub use config::{CollectionStrategy, ConfigError, GcConfig};
pub use error::{GcError, Result};
pub use gc::{Collector, GcState, TraceReport, Trigger};
pub use gc_threads::GcPhase;
pub use heap::HeapStats;
pub use logging::{GcEvent, GcLogger, GcLoggerConfig, LogLevel};
pub use object::{HeapObject, ObjRef, ObjectKind};
pub use stats::{CollectionReport, GcSummary};

/// PGC version string from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Create a collector with the default configuration
///
/// # Examples
///
/// ```rust
/// let gc = pgc::init()?;
/// assert_eq!(gc.cycle_count(), 0);
/// # Ok::<(), pgc::GcError>(())
/// ```
pub fn init() -> Result<Collector> {
    Collector::new(GcConfig::default())
}

/// Create a collector from `PGC_*` environment variables
///
/// Unset or unparsable variables fall back to the defaults.
pub fn init_from_env() -> Result<Collector> {
    Collector::new(GcConfig::from_env())
}
