// src/miner/worker.rs
//! Worker thread implementation
//!
//! Each worker is a long-lived OS thread with two unidirectional channels:
//! commands come in over a crossbeam channel, events go out over the
//! coordinator's tokio channel. Workers never touch the queue or counters;
//! they search the range they were handed and say when they are ready for
//! the next one.

use crate::miner::algorithm::{HashSearch, SearchOutcome};
use crate::types::SharedJob;
use crate::utils::error::MinerError;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

/// One unit of work handed to a worker
#[derive(Debug, Clone)]
pub struct MineOrder {
    /// Job snapshot (header, difficulty, token)
    pub job: SharedJob,
    /// First nonce to try
    pub start_nonce: u64,
    /// Nonce at which to give up (exclusive)
    pub end_nonce: u64,
}

/// Coordinator → worker messages
#[derive(Debug, Clone)]
pub enum WorkerCommand {
    /// Start the worker and have it announce itself
    Init {
        /// Identifier assigned by the pool
        thread_id: u32,
    },
    /// Search one workload unit
    Mine(MineOrder),
    /// No work right now; wait and announce ready again
    Reready {
        /// How long to idle before re-announcing
        delay: Duration,
    },
}

/// Outcome of one searched unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkReport {
    /// Winning nonce and hash, if the range held one
    pub share: Option<(u64, [u8; 32])>,
    /// First nonce of the searched range
    pub start_nonce: u64,
    /// End of the searched range (exclusive)
    pub end_nonce: u64,
    /// Token of the job the range belonged to
    pub job_token: String,
}

/// Worker → coordinator messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    /// Worker wants its next unit
    Ready {
        /// Reporting worker
        thread_id: u32,
    },
    /// Worker finished a unit
    Result {
        /// Reporting worker
        thread_id: u32,
        /// What the search produced
        report: WorkReport,
    },
    /// The search backend failed on the current unit
    Failed {
        /// Reporting worker
        thread_id: u32,
        /// Error text from the backend
        error: String,
    },
}

/// Creates workers for the pool
///
/// Returns the command side of the new worker's channel pair.
pub trait WorkerSpawner: Send {
    /// Starts worker `thread_id`
    fn spawn(&mut self, thread_id: u32) -> Result<Sender<WorkerCommand>, MinerError>;
}

/// Spawns real OS threads running [`Worker::run`]
pub struct ThreadSpawner {
    searcher: Arc<dyn HashSearch>,
    events: UnboundedSender<WorkerEvent>,
}

impl ThreadSpawner {
    /// Creates a spawner whose workers report to `events`
    pub fn new(searcher: Arc<dyn HashSearch>, events: UnboundedSender<WorkerEvent>) -> Self {
        ThreadSpawner { searcher, events }
    }
}

impl WorkerSpawner for ThreadSpawner {
    fn spawn(&mut self, thread_id: u32) -> Result<Sender<WorkerCommand>, MinerError> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let worker = Worker::new(thread_id, self.searcher.clone(), rx, self.events.clone());

        std::thread::Builder::new()
            .name(format!("worker-{}", thread_id))
            .spawn(move || worker.run())?;

        Ok(tx)
    }
}

/// Thread-side state of one worker
pub struct Worker {
    thread_id: u32,
    searcher: Arc<dyn HashSearch>,
    commands: Receiver<WorkerCommand>,
    events: UnboundedSender<WorkerEvent>,
}

impl Worker {
    /// Creates a new Worker instance
    ///
    /// # Arguments
    /// * `thread_id` - Identifier assigned by the pool
    /// * `searcher` - Hash search backend
    /// * `commands` - Inbound command channel
    /// * `events` - Outbound event channel
    pub fn new(
        thread_id: u32,
        searcher: Arc<dyn HashSearch>,
        commands: Receiver<WorkerCommand>,
        events: UnboundedSender<WorkerEvent>,
    ) -> Self {
        Worker {
            thread_id,
            searcher,
            commands,
            events,
        }
    }

    /// Runs the command loop until the pool drops the command sender
    /// or the coordinator goes away.
    pub fn run(self) {
        log::debug!("Worker {} started", self.thread_id);

        while let Ok(command) = self.commands.recv() {
            if !self.handle(command) {
                break;
            }
        }

        log::debug!("Worker {} exiting", self.thread_id);
    }

    /// Returns false once the coordinator side is gone
    fn handle(&self, command: WorkerCommand) -> bool {
        match command {
            WorkerCommand::Init { thread_id } => {
                log::debug!("Worker {} initialised as thread {}", self.thread_id, thread_id);
                self.ready()
            }
            WorkerCommand::Mine(order) => self.mine(&order) && self.ready(),
            WorkerCommand::Reready { delay } => match self.commands.recv_timeout(delay) {
                Ok(next) => self.handle(next),
                Err(RecvTimeoutError::Timeout) => self.ready(),
                Err(RecvTimeoutError::Disconnected) => false,
            },
        }
    }

    fn mine(&self, order: &MineOrder) -> bool {
        let job = &order.job;
        let event = match self.searcher.search(
            &job.header,
            job.difficulty,
            order.start_nonce,
            order.end_nonce,
        ) {
            Ok(outcome) => WorkerEvent::Result {
                thread_id: self.thread_id,
                report: WorkReport {
                    share: match outcome {
                        SearchOutcome::Found { nonce, hash } => Some((nonce, hash)),
                        SearchOutcome::Exhausted => None,
                    },
                    start_nonce: order.start_nonce,
                    end_nonce: order.end_nonce,
                    job_token: job.token.clone(),
                },
            },
            Err(e) => WorkerEvent::Failed {
                thread_id: self.thread_id,
                error: e.to_string(),
            },
        };
        self.events.send(event).is_ok()
    }

    fn ready(&self) -> bool {
        self.events
            .send(WorkerEvent::Ready {
                thread_id: self.thread_id,
            })
            .is_ok()
    }
}
