//! GC Threads - Long-Lived Worker Pool
//!
//! One worker per heap partition. Workers are named `gc-worker-{id}`, block
//! on their own command channel while idle, and answer every command with a
//! `PhaseReport` on one shared report channel.
//!
//! ## Barrier
//!
//! ```text
//! orchestrator            worker 0        worker 1   ...   worker N-1
//!     │── Mark ──────────────▶│               │                 │
//!     │── Mark ───────────────┼──────────────▶│                 │
//!     │── Mark ───────────────┼───────────────┼────────────────▶│
//!     │◀───────── report ─────┘               │                 │
//!     │◀───────── report ─────────────────────┘                 │
//!     │◀───────── report ───────────────────────────────────────┘
//!     │  (N reports: every partition is marked)
//!     │── Sweep / Evacuate ──▶ ...
//! ```
//!
//! `run_phase` returns only after it has one report per worker, so no
//! partition is swept or evacuated while another worker is still marking,
//! and no fixup starts before every partition has evacuated.
//!
//! A panicking phase is caught and reported as `GcError::WorkerPanicked`;
//! the barrier never waits on a dead worker.

use crate::error::{GcError, Result};
use crate::heap::{Heap, Partition};
use crate::logging::{GcEvent, GcLogger};
use crate::marker::{self, MarkQueue, MarkShared, MarkStats};
use crate::object::ObjRef;
use crate::relocate::{self, EvacuationStats, ForwardingTable};
use crate::stats::GcTimer;
use crate::sweep::{self, SweepStats};
use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Worker-side phases of a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum GcPhase {
    Mark,
    Sweep,
    Evacuate,
    Fixup,
}

impl fmt::Display for GcPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GcPhase::Mark => write!(f, "mark"),
            GcPhase::Sweep => write!(f, "sweep"),
            GcPhase::Evacuate => write!(f, "evacuate"),
            GcPhase::Fixup => write!(f, "fixup"),
        }
    }
}

/// One worker's share of a mark phase
pub(crate) struct MarkJob {
    pub(crate) cycle: u64,
    pub(crate) roots: Vec<ObjRef>,
    pub(crate) shared: Arc<MarkShared>,
}

pub(crate) enum Command {
    Mark(MarkJob),
    Sweep { cycle: u64 },
    Evacuate { cycle: u64 },
    Fixup {
        cycle: u64,
        tables: Arc<Vec<ForwardingTable>>,
    },
    Shutdown,
}

impl Command {
    fn phase(&self) -> Option<GcPhase> {
        match self {
            Command::Mark(_) => Some(GcPhase::Mark),
            Command::Sweep { .. } => Some(GcPhase::Sweep),
            Command::Evacuate { .. } => Some(GcPhase::Evacuate),
            Command::Fixup { .. } => Some(GcPhase::Fixup),
            Command::Shutdown => None,
        }
    }

    fn cycle(&self) -> u64 {
        match self {
            Command::Mark(job) => job.cycle,
            Command::Sweep { cycle } | Command::Evacuate { cycle } | Command::Fixup { cycle, .. } => {
                *cycle
            },
            Command::Shutdown => 0,
        }
    }
}

/// What a worker produced for one phase
pub(crate) enum PhaseOutcome {
    Marked(MarkStats),
    Swept(SweepStats),
    Evacuated(ForwardingTable, EvacuationStats),
    FixedUp(usize),
}

pub(crate) struct PhaseReport {
    worker: usize,
    result: Result<PhaseOutcome>,
}

/// GC Worker Thread
pub struct GcWorker {
    /// Worker ID, also the partition it reclaims
    id: usize,
    heap: Arc<Heap>,
    logger: Arc<GcLogger>,
    queue: MarkQueue,
    mark_stall: Option<Duration>,
    commands: Receiver<Command>,
    reports: Sender<PhaseReport>,
}

impl GcWorker {
    fn run(mut self) {
        while let Ok(command) = self.commands.recv() {
            let Some(phase) = command.phase() else {
                break;
            };
            let cycle = command.cycle();
            let abort = match &command {
                Command::Mark(job) => Some(Arc::clone(&job.shared)),
                _ => None,
            };

            self.logger.log(GcEvent::WorkerPhaseStart {
                cycle,
                worker: self.id,
                phase,
            });
            let timer = GcTimer::new();

            let result = panic::catch_unwind(AssertUnwindSafe(|| self.execute(command)))
                .unwrap_or_else(|payload| {
                    if let Some(shared) = &abort {
                        shared.abort();
                    }
                    self.queue.clear();
                    Err(GcError::WorkerPanicked {
                        worker: self.id,
                        message: panic_message(payload.as_ref()),
                    })
                });

            if let Err(e) = &result {
                log::error!("[gc-worker-{}] {} phase failed: {}", self.id, phase, e);
            }

            if phase == GcPhase::Mark {
                if let Some(stall) = self.mark_stall {
                    thread::sleep(stall * (self.id as u32 + 1));
                }
            }

            self.logger.log(GcEvent::WorkerPhaseEnd {
                cycle,
                worker: self.id,
                phase,
                duration_us: timer.elapsed_us(),
            });

            let report = PhaseReport {
                worker: self.id,
                result,
            };
            if self.reports.send(report).is_err() {
                break;
            }
        }

        log::debug!("[gc-worker-{}] exiting", self.id);
    }

    fn execute(&mut self, command: Command) -> Result<PhaseOutcome> {
        match command {
            Command::Mark(job) => {
                let view = self.heap.view();
                let stats = marker::mark(&view, &mut self.queue, &job.roots, &job.shared)?;
                Ok(PhaseOutcome::Marked(stats))
            },
            Command::Sweep { .. } => {
                let mut partition = self.own_partition()?.write();
                Ok(PhaseOutcome::Swept(sweep::sweep_partition(&mut partition)?))
            },
            Command::Evacuate { .. } => {
                let mut partition = self.own_partition()?.write();
                let (table, stats) = relocate::evacuate_partition(&mut partition)?;
                Ok(PhaseOutcome::Evacuated(table, stats))
            },
            Command::Fixup { tables, .. } => {
                let mut partition = self.own_partition()?.write();
                Ok(PhaseOutcome::FixedUp(relocate::fixup_partition(
                    &mut partition,
                    &tables,
                )?))
            },
            Command::Shutdown => Err(GcError::ShutDown),
        }
    }

    fn own_partition(&self) -> Result<&RwLock<Partition>> {
        self.heap.partition(self.id).ok_or_else(|| {
            GcError::InvariantViolation(format!("worker {} has no partition", self.id))
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// GC Thread Pool
pub struct GcThreadPool {
    senders: Vec<Sender<Command>>,
    reports: Receiver<PhaseReport>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl GcThreadPool {
    /// Spawn one worker per heap partition
    pub(crate) fn new(
        heap: Arc<Heap>,
        logger: Arc<GcLogger>,
        mark_stall: Option<Duration>,
    ) -> Result<Self> {
        let count = heap.partition_count();
        let (report_tx, report_rx) = channel::unbounded();
        let mut senders = Vec::with_capacity(count);
        let mut handles = Vec::with_capacity(count);

        for (id, queue) in MarkQueue::create_set(count).into_iter().enumerate() {
            let (command_tx, command_rx) = channel::unbounded();
            let worker = GcWorker {
                id,
                heap: Arc::clone(&heap),
                logger: Arc::clone(&logger),
                queue,
                mark_stall,
                commands: command_rx,
                reports: report_tx.clone(),
            };

            let handle = thread::Builder::new()
                .name(format!("gc-worker-{}", id))
                .spawn(move || worker.run())?;

            senders.push(command_tx);
            handles.push(handle);
        }

        Ok(Self {
            senders,
            reports: report_rx,
            handles: Mutex::new(handles),
        })
    }

    /// Get number of workers in the pool
    pub fn num_workers(&self) -> usize {
        self.senders.len()
    }

    /// Check if the pool still has running threads
    pub fn is_active(&self) -> bool {
        !self.handles.lock().is_empty()
    }

    /// Send one command per worker and wait for every report
    ///
    /// Outcomes come back indexed by worker. If any worker failed, the first
    /// error (by worker id) is returned, but only after all reports are in.
    pub(crate) fn run_phase(&self, commands: Vec<Command>) -> Result<Vec<PhaseOutcome>> {
        if !self.is_active() {
            return Err(GcError::ShutDown);
        }

        let mut first_error = None;
        let mut sent = 0;
        for (id, (sender, command)) in self.senders.iter().zip(commands).enumerate() {
            if sender.send(command).is_err() {
                first_error.get_or_insert(GcError::WorkerDisconnected(id));
                continue;
            }
            sent += 1;
        }

        let mut outcomes: Vec<Option<Result<PhaseOutcome>>> =
            (0..self.senders.len()).map(|_| None).collect();
        for _ in 0..sent {
            let Ok(report) = self.reports.recv() else {
                break;
            };
            if let Some(slot) = outcomes.get_mut(report.worker) {
                *slot = Some(report.result);
            }
        }

        let mut results = Vec::with_capacity(outcomes.len());
        for (id, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Some(Ok(outcome)) => results.push(outcome),
                Some(Err(e)) => {
                    first_error.get_or_insert(e);
                },
                None => {
                    first_error.get_or_insert(GcError::WorkerDisconnected(id));
                },
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(results),
        }
    }

    /// Stop and join every worker; idempotent
    pub fn shutdown(&self) {
        let mut handles = self.handles.lock();
        if handles.is_empty() {
            return;
        }

        for sender in &self.senders {
            let _ = sender.send(Command::Shutdown);
        }
        for handle in handles.drain(..) {
            if handle.join().is_err() {
                log::error!("GC worker thread terminated abnormally");
            }
        }
    }
}

impl Drop for GcThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
