//! GC Logging and Tracing
//!
//! Structured logging for GC operations, useful for:
//! - Performance analysis
//! - Debugging
//! - Instrumentation tests that check phase ordering
//!
//! Every event goes to the `log` facade. With `console` set it is also
//! printed, as text or JSON; with `record` set it is appended to an in-memory
//! log whose order is the order the events happened in.
//!
//! Log Levels:
//! - ERROR: out of memory
//! - WARN: allocation failures that trigger a collection
//! - INFO: GC cycles
//! - DEBUG: phases and per-phase statistics
//! - TRACE: per-worker phase boundaries
//!
//! There is no global logger; each `Collector` owns one.

use crate::config::{CollectionStrategy, GcConfig};
use crate::gc::Trigger;
use crate::gc_threads::GcPhase;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Log level for GC operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}

/// GC event types
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GcEvent {
    /// GC cycle started
    CycleStart {
        cycle: u64,
        trigger: Trigger,
        strategy: CollectionStrategy,
        objects: usize,
    },

    /// Orchestrator entered a phase
    PhaseStart { cycle: u64, phase: GcPhase },

    /// Orchestrator collected every worker's report for a phase
    PhaseEnd {
        cycle: u64,
        phase: GcPhase,
        duration_us: u64,
    },

    /// A worker picked up a phase command
    WorkerPhaseStart {
        cycle: u64,
        worker: usize,
        phase: GcPhase,
    },

    /// A worker finished a phase, before reporting it
    WorkerPhaseEnd {
        cycle: u64,
        worker: usize,
        phase: GcPhase,
        duration_us: u64,
    },

    /// GC cycle completed
    CycleEnd {
        cycle: u64,
        reclaimed: usize,
        remaining: usize,
        duration_us: u64,
    },

    /// Allocation found no space; a collection follows
    AllocationFailure { requested: usize, available: usize },

    /// Allocation failed again after collecting
    OutOfMemory { requested: usize, available: usize },

    /// Marking statistics, summed over workers
    MarkStats {
        cycle: u64,
        roots: usize,
        visits: usize,
        marked: usize,
        stolen: usize,
    },

    /// Sweep statistics, summed over partitions
    SweepStats {
        cycle: u64,
        reclaimed: usize,
        bytes_reclaimed: usize,
        coalesced: usize,
        free_blocks: usize,
    },

    /// Evacuation statistics, summed over partitions
    EvacuationStats {
        cycle: u64,
        evacuated: usize,
        discarded: usize,
        bytes_copied: usize,
        references_fixed: usize,
    },
}

impl GcEvent {
    /// Log level for event
    pub fn level(&self) -> LogLevel {
        match self {
            GcEvent::OutOfMemory { .. } => LogLevel::Error,
            GcEvent::AllocationFailure { .. } => LogLevel::Warn,
            GcEvent::CycleStart { .. } | GcEvent::CycleEnd { .. } => LogLevel::Info,
            GcEvent::PhaseStart { .. }
            | GcEvent::PhaseEnd { .. }
            | GcEvent::MarkStats { .. }
            | GcEvent::SweepStats { .. }
            | GcEvent::EvacuationStats { .. } => LogLevel::Debug,
            GcEvent::WorkerPhaseStart { .. } | GcEvent::WorkerPhaseEnd { .. } => LogLevel::Trace,
        }
    }
}

/// GC Logger configuration
#[derive(Debug, Clone)]
pub struct GcLoggerConfig {
    /// Minimum level printed to the console
    pub level: LogLevel,

    /// Enable console output
    pub console: bool,

    /// Enable JSON format
    pub json: bool,

    /// Enable timestamps
    pub timestamps: bool,

    /// Keep every event in memory, regardless of `level`
    pub record: bool,
}

impl Default for GcLoggerConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            console: false,
            json: false,
            timestamps: true,
            record: false,
        }
    }
}

impl GcLoggerConfig {
    pub fn from_gc_config(config: &GcConfig) -> Self {
        Self {
            level: if config.verbose { LogLevel::Debug } else { LogLevel::Info },
            console: config.verbose,
            record: config.record_events,
            ..Default::default()
        }
    }
}

/// GC Logger - per-collector event sink
pub struct GcLogger {
    config: GcLoggerConfig,
    events: Mutex<Vec<(Instant, GcEvent)>>,
    enabled: AtomicBool,
}

impl GcLogger {
    /// Create new GC logger
    pub fn new(config: GcLoggerConfig) -> Self {
        Self {
            config,
            events: Mutex::new(Vec::new()),
            enabled: AtomicBool::new(true),
        }
    }

    /// Enable logging
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    /// Disable logging
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }

    /// Check if logging is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn config(&self) -> &GcLoggerConfig {
        &self.config
    }

    /// Log a GC event
    pub fn log(&self, event: GcEvent) {
        if !self.is_enabled() {
            return;
        }

        let level = event.level();
        let facade_level = log::Level::from(level);
        if log::log_enabled!(target: "pgc", facade_level) {
            log::log!(target: "pgc", facade_level, "{}", human(&event));
        }

        if self.config.console && level <= self.config.level {
            self.output_console(&event);
        }

        if self.config.record {
            self.events.lock().push((Instant::now(), event));
        }
    }

    /// Output to console
    fn output_console(&self, event: &GcEvent) {
        let line = if self.config.json {
            match serde_json::to_string(event) {
                Ok(json) => json,
                Err(e) => {
                    log::error!("failed to serialize GC event: {}", e);
                    return;
                },
            }
        } else {
            human(event)
        };

        if self.config.timestamps {
            let now = chrono::Local::now();
            println!("[{}] {}", now.format("%Y-%m-%d %H:%M:%S%.3f"), line);
        } else {
            println!("{}", line);
        }
    }

    /// Recorded events, oldest first
    pub fn events(&self) -> Vec<(Instant, GcEvent)> {
        self.events.lock().clone()
    }

    /// Clear all events
    pub fn clear_events(&self) {
        self.events.lock().clear();
    }

    /// Get event count
    pub fn event_count(&self) -> usize {
        self.events.lock().len()
    }
}

impl Default for GcLogger {
    fn default() -> Self {
        Self::new(GcLoggerConfig::default())
    }
}

/// Human-readable form of an event
fn human(event: &GcEvent) -> String {
    match event {
        GcEvent::CycleStart {
            cycle,
            trigger,
            strategy,
            objects,
        } => format!(
            "[GC] Cycle {} started ({}, trigger: {}, {} objects)",
            cycle, strategy, trigger, objects
        ),
        GcEvent::PhaseStart { cycle, phase } => {
            format!("[GC] Cycle {}: {} phase started", cycle, phase)
        },
        GcEvent::PhaseEnd {
            cycle,
            phase,
            duration_us,
        } => format!(
            "[GC] Cycle {}: {} phase completed ({} us)",
            cycle, phase, duration_us
        ),
        GcEvent::WorkerPhaseStart {
            cycle,
            worker,
            phase,
        } => format!("[GC] Cycle {}: worker {} started {}", cycle, worker, phase),
        GcEvent::WorkerPhaseEnd {
            cycle,
            worker,
            phase,
            duration_us,
        } => format!(
            "[GC] Cycle {}: worker {} finished {} ({} us)",
            cycle, worker, phase, duration_us
        ),
        GcEvent::CycleEnd {
            cycle,
            reclaimed,
            remaining,
            duration_us,
        } => format!(
            "[GC] Cycle {} completed ({} us): {} objects collected, {} objects remaining",
            cycle, duration_us, reclaimed, remaining
        ),
        GcEvent::AllocationFailure {
            requested,
            available,
        } => format!(
            "[GC] Allocation failure: {} bytes (available: {})",
            requested, available
        ),
        GcEvent::OutOfMemory {
            requested,
            available,
        } => format!(
            "[GC] Out of memory: {} bytes requested, {} available after collection",
            requested, available
        ),
        GcEvent::MarkStats {
            cycle,
            roots,
            visits,
            marked,
            stolen,
        } => format!(
            "[GC] Cycle {}: marked {} objects from {} roots ({} visits, {} steals)",
            cycle, marked, roots, visits, stolen
        ),
        GcEvent::SweepStats {
            cycle,
            reclaimed,
            bytes_reclaimed,
            coalesced,
            free_blocks,
        } => format!(
            "[GC] Cycle {}: swept {} objects ({} bytes), {} coalesced, {} free blocks",
            cycle, reclaimed, bytes_reclaimed, coalesced, free_blocks
        ),
        GcEvent::EvacuationStats {
            cycle,
            evacuated,
            discarded,
            bytes_copied,
            references_fixed,
        } => format!(
            "[GC] Cycle {}: evacuated {} objects ({} bytes), discarded {}, fixed {} references",
            cycle, evacuated, bytes_copied, discarded, references_fixed
        ),
    }
}
