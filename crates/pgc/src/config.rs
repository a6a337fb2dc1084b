//! Configuration Module - GC Tuning Parameters
//!
//! Manages all configuration parameters for PGC. The collector has few knobs:
//! which reclamation strategy to run, how large the arena is, how many worker
//! threads share it, and how coarse the allocator's size classes are.

use crate::util::constants::{
    DEFAULT_HEAP_SIZE, DEFAULT_SIZE_CLASS_GRANULARITY, MAX_SIZE_CLASS_GRANULARITY,
    MAX_WORKER_THREADS, MIN_BLOCKS_PER_PARTITION, MIN_HEAP_SIZE, MIN_OBJECT_SIZE,
};
use crate::util::align_up;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Reclamation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CollectionStrategy {
    /// Mark, then sweep dead blocks onto segregated free lists
    MarkSweep,
    /// Mark, then evacuate live objects into the reserve semispace
    Copying,
}

impl fmt::Display for CollectionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionStrategy::MarkSweep => write!(f, "mark-sweep"),
            CollectionStrategy::Copying => write!(f, "copying"),
        }
    }
}

impl FromStr for CollectionStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mark-sweep" | "marksweep" | "mark_sweep" => Ok(CollectionStrategy::MarkSweep),
            "copying" | "copy" | "semispace" => Ok(CollectionStrategy::Copying),
            other => Err(ConfigError::InvalidStrategy(other.to_string())),
        }
    }
}

/// Main configuration for the collector
///
/// # Examples
///
/// ```rust
/// use pgc::{CollectionStrategy, GcConfig};
///
/// // Use default configuration
/// let config = GcConfig::default();
///
/// // Small copying heap with two workers
/// let config = GcConfig {
///     strategy: CollectionStrategy::Copying,
///     heap_size: 64 * 1024,
///     worker_threads: 2,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct GcConfig {
    /// Reclamation strategy
    ///
    /// Default: MarkSweep
    pub strategy: CollectionStrategy,

    /// Arena size in bytes
    ///
    /// For mark-sweep this is the whole arena. For copying it is the size of
    /// each of the two semispaces. The budget is split evenly between worker
    /// partitions; the heap never grows.
    ///
    /// Default: 1MB
    pub heap_size: usize,

    /// Number of GC worker threads (and heap partitions)
    ///
    /// Default: min(4, num_cpus / 2), at least 1
    pub worker_threads: usize,

    /// Size-class granularity in bytes
    ///
    /// Object sizes are rounded up to a multiple of this value, and each
    /// multiple is one segregated free list. Must be a power of two in 8..=64.
    ///
    /// Default: 8
    pub size_class_granularity: usize,

    /// Enable verbose GC logging
    ///
    /// Prints events to stdout in addition to the `log` facade.
    /// Default: false
    pub verbose: bool,

    /// Keep every GC event in memory
    ///
    /// Readable through `GcLogger::events`. Used by instrumentation tests.
    /// Default: false
    pub record_events: bool,

    /// Artificial delay before a worker reports mark completion
    ///
    /// Worker `i` sleeps `(i + 1) * mark_stall`. Stress tests use this to
    /// widen the window between the first and last mark report.
    ///
    /// Default: None
    pub mark_stall: Option<Duration>,
}

impl Default for GcConfig {
    fn default() -> Self {
        let num_cpus = num_cpus::get();

        GcConfig {
            strategy: CollectionStrategy::MarkSweep,
            heap_size: DEFAULT_HEAP_SIZE,
            worker_threads: (num_cpus / 2).clamp(1, 4),
            size_class_granularity: DEFAULT_SIZE_CLASS_GRANULARITY,
            verbose: false,
            record_events: false,
            mark_stall: None,
        }
    }
}

impl GcConfig {
    /// Validate configuration
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pgc::GcConfig;
    ///
    /// let config = GcConfig {
    ///     worker_threads: 0,  // Invalid!
    ///     ..Default::default()
    /// };
    ///
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_threads == 0 || self.worker_threads > MAX_WORKER_THREADS {
            return Err(ConfigError::InvalidWorkerThreads(format!(
                "worker_threads must be in 1..={}, got {}",
                MAX_WORKER_THREADS, self.worker_threads
            )));
        }

        let granularity = self.size_class_granularity;
        if !granularity.is_power_of_two()
            || granularity < DEFAULT_SIZE_CLASS_GRANULARITY
            || granularity > MAX_SIZE_CLASS_GRANULARITY
        {
            return Err(ConfigError::InvalidSizeClass(format!(
                "size_class_granularity must be a power of two in {}..={}, got {}",
                DEFAULT_SIZE_CLASS_GRANULARITY, MAX_SIZE_CLASS_GRANULARITY, granularity
            )));
        }

        if self.heap_size < MIN_HEAP_SIZE {
            return Err(ConfigError::InvalidHeapSize(format!(
                "heap_size must be at least {} bytes, got {}",
                MIN_HEAP_SIZE, self.heap_size
            )));
        }

        let min_partition = MIN_BLOCKS_PER_PARTITION * self.min_block_size();
        if self.partition_capacity() < min_partition {
            return Err(ConfigError::InvalidHeapSize(format!(
                "heap_size {} split across {} workers leaves {} bytes per partition, need {}",
                self.heap_size,
                self.worker_threads,
                self.partition_capacity(),
                min_partition
            )));
        }

        Ok(())
    }

    /// Build configuration from environment variables
    ///
    /// Overrides defaults with environment variables:
    /// - PGC_STRATEGY (`mark-sweep` or `copying`)
    /// - PGC_HEAP_SIZE
    /// - PGC_WORKER_THREADS
    /// - PGC_SIZE_CLASS_GRANULARITY
    /// - PGC_VERBOSE
    /// - PGC_RECORD_EVENTS
    ///
    /// Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(strategy) = env_parse::<CollectionStrategy>("PGC_STRATEGY") {
            config.strategy = strategy;
        }

        if let Some(size) = env_parse::<usize>("PGC_HEAP_SIZE") {
            config.heap_size = size;
        }

        if let Some(threads) = env_parse::<usize>("PGC_WORKER_THREADS") {
            config.worker_threads = threads;
        }

        if let Some(granularity) = env_parse::<usize>("PGC_SIZE_CLASS_GRANULARITY") {
            config.size_class_granularity = granularity;
        }

        if let Ok(val) = std::env::var("PGC_VERBOSE") {
            config.verbose = env_flag(&val);
        }

        if let Ok(val) = std::env::var("PGC_RECORD_EVENTS") {
            config.record_events = env_flag(&val);
        }

        config
    }

    /// Bytes owned by each worker partition
    pub fn partition_capacity(&self) -> usize {
        self.heap_size / self.worker_threads.max(1)
    }

    /// Smallest block the allocator carves, after size-class rounding
    pub fn min_block_size(&self) -> usize {
        align_up(MIN_OBJECT_SIZE, self.size_class_granularity)
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let val = std::env::var(key).ok()?;
    match val.parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            log::warn!("ignoring unparseable {}={:?}", key, val);
            None
        },
    }
}

fn env_flag(val: &str) -> bool {
    val == "1" || val.eq_ignore_ascii_case("true")
}

/// Error types for configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid heap size: {0}")]
    InvalidHeapSize(String),

    #[error("Invalid worker threads: {0}")]
    InvalidWorkerThreads(String),

    #[error("Invalid size class: {0}")]
    InvalidSizeClass(String),

    #[error("Invalid strategy: {0}")]
    InvalidStrategy(String),
}
