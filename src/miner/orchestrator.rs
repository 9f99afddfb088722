// src/miner/orchestrator.rs
//! Coordination core
//!
//! [`Coordinator`] is the single owner of the workload queue, the pool
//! session, the worker pool and the accounting counters. Everything that
//! happens to the miner arrives as a [`CoordinatorEvent`] through
//! [`Coordinator::handle`]; nothing here blocks or spawns async tasks, so the
//! whole state machine can be driven with a simulated clock.

use crate::config::Config;
use crate::miner::pool::{ReadyOutcome, WorkerPool};
use crate::miner::worker::{WorkReport, WorkerEvent, WorkerSpawner};
use crate::miner::workload::{WorkloadQueue, unit_range};
use crate::network::protocol::{ClientMessage, Registration, ServerMessage};
use crate::network::session::{PoolSession, SessionEvent};
use crate::stats::hashrate::HashrateTracker;
use crate::types::{MiningState, PROTOCOL_VERSION, WORKLOAD_SIZE, platform_string};
use serde::Serialize;
use std::time::Instant;

/// Inputs to the coordination core
#[derive(Debug, Clone)]
pub enum CoordinatorEvent {
    /// Transport to the pool server is up
    Connected,
    /// Transport to the pool server is gone
    Disconnected,
    /// Decoded message from the pool server
    Server(ServerMessage),
    /// Message from a worker thread
    Worker(WorkerEvent),
    /// Hashrate sampling interval elapsed
    HashrateTick,
    /// Periodic timer for retries and timeouts
    Housekeeping,
}

/// Snapshot exposed to observers
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MinerStatus {
    /// Current session state
    pub state: MiningState,
    /// Smoothed hashes per second
    pub hashrate: f64,
    /// Live worker threads
    pub active_workers: usize,
    /// Shares found since start
    pub shares_found: u64,
    /// Workload units mined since start
    pub workloads_mined: u64,
}

/// Queue sizing knobs taken from the configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tuning {
    /// Units seeded per job and requested per pull
    pub pull_workloads: u64,
    /// Units per full commit
    pub commit_workloads: u64,
    /// Queue depth below which a pull is requested
    pub refill_threshold: u64,
}

impl From<&Config> for Tuning {
    fn from(config: &Config) -> Self {
        Tuning {
            pull_workloads: config.pull_workloads,
            commit_workloads: config.commit_workloads.max(1),
            refill_threshold: config.refill_threshold(),
        }
    }
}

/// Owns all mutable mining state
pub struct Coordinator {
    session: PoolSession,
    queue: WorkloadQueue,
    workers: WorkerPool,
    hashrate: HashrateTracker,
    tuning: Tuning,
    mined_since_commit: u64,
    pool_started: bool,
    shares_found: u64,
    workloads_mined: u64,
}

impl Coordinator {
    /// Builds the core from a validated configuration
    pub fn new(config: &Config, spawner: Box<dyn WorkerSpawner>, now: Instant) -> Self {
        let registration = Registration {
            address: config.address.clone(),
            display_name: config.display_name.clone(),
            protocol_version: PROTOCOL_VERSION,
            platform: platform_string(),
            pull_workloads: config.pull_workloads,
            commit_workloads: config.commit_workloads,
        };

        Coordinator {
            session: PoolSession::new(registration),
            queue: WorkloadQueue::new(),
            workers: WorkerPool::new(config.threads, spawner),
            hashrate: HashrateTracker::new(now),
            tuning: Tuning::from(config),
            mined_since_commit: 0,
            pool_started: false,
            shares_found: 0,
            workloads_mined: 0,
        }
    }

    /// Applies one event
    pub fn handle(&mut self, event: CoordinatorEvent, now: Instant) {
        match event {
            CoordinatorEvent::Connected => self.session.on_connected(now),
            CoordinatorEvent::Disconnected => self.session.on_disconnected(),
            CoordinatorEvent::Server(message) => match self.session.handle(message, now) {
                Some(_) if self.stopped() => {
                    log::debug!("Ignoring new work: mining stopped");
                }
                Some(SessionEvent::JobAssigned(_)) => self.on_job_assigned(),
                Some(SessionEvent::Workload { base_nonce }) => {
                    self.queue.seed(base_nonce, self.tuning.pull_workloads);
                }
                None => {}
            },
            CoordinatorEvent::Worker(WorkerEvent::Ready { thread_id }) => {
                self.on_ready(thread_id, now)
            }
            CoordinatorEvent::Worker(WorkerEvent::Result { thread_id, report }) => {
                self.on_result(thread_id, report)
            }
            CoordinatorEvent::Worker(WorkerEvent::Failed { thread_id, error }) => {
                self.on_worker_error(thread_id, &error)
            }
            CoordinatorEvent::HashrateTick => self.hashrate.tick(now),
            CoordinatorEvent::Housekeeping => self.session.poll(now),
        }
    }

    fn on_job_assigned(&mut self) {
        // Work done under the previous job must reach the server first
        if self.mined_since_commit > 0 {
            self.session.push_partial(self.mined_since_commit);
            self.mined_since_commit = 0;
        }

        self.queue.clear();
        if let Some(job) = self.session.job() {
            self.queue.seed(job.base_nonce, self.tuning.pull_workloads);
        }

        if !self.pool_started {
            self.pool_started = true;
            self.workers.start();
        }
    }

    fn on_ready(&mut self, thread_id: u32, now: Instant) {
        if self.workers.is_mining() && (self.queue.size() as u64) < self.tuning.refill_threshold {
            self.session.pull(now);
        }

        match self
            .workers
            .on_ready(thread_id, &mut self.queue, self.session.job())
        {
            ReadyOutcome::Dispatched(_) => self.session.resume_mining(),
            ReadyOutcome::Paused => self.session.enter_waiting_for_work(),
            ReadyOutcome::Retired => {
                log::debug!("{} workers left", self.workers.active_count())
            }
            ReadyOutcome::Unknown => {}
        }
    }

    fn on_result(&mut self, thread_id: u32, report: WorkReport) {
        if !self.workers.is_mining() {
            log::debug!("Ignoring result from worker {}: mining stopped", thread_id);
            return;
        }
        self.workers.complete(thread_id);

        self.hashrate.record_hashes(WORKLOAD_SIZE);
        self.mined_since_commit += 1;
        self.workloads_mined += 1;

        if let Some((nonce, hash)) = report.share {
            self.shares_found += 1;
            self.session.submit_share(&report.job_token, nonce, hash);
        }

        // Pushes sent while disconnected would be lost; keep counting instead
        while self.session.is_connected()
            && self.mined_since_commit >= self.tuning.commit_workloads
        {
            self.session.push_full();
            self.mined_since_commit -= self.tuning.commit_workloads;
        }
    }

    /// True once the pool was started and then shut down
    fn stopped(&self) -> bool {
        self.pool_started && !self.workers.is_mining()
    }

    fn on_worker_error(&mut self, thread_id: u32, error: &str) {
        let Some(lost) = self.workers.complete(thread_id) else {
            log::warn!("Worker {} reported an error: {}", thread_id, error);
            return;
        };
        let range = unit_range(lost.unit);
        log::warn!(
            "Worker {} failed on nonces {}..{}: {}",
            thread_id,
            range.start,
            range.end,
            error
        );

        let current = self.session.job().map(|job| job.token.as_str());
        if self.workers.is_mining() && current == Some(lost.job_token.as_str()) {
            self.queue.requeue(lost.unit);
        }
    }

    /// Tears everything down; safe to call more than once
    ///
    /// Unreported partial progress is flushed first while the session is
    /// still connected.
    pub fn shutdown(&mut self) {
        if self.mined_since_commit > 0 && self.session.is_connected() {
            self.session.push_partial(self.mined_since_commit);
            self.mined_since_commit = 0;
        }
        self.workers.shutdown();
        self.queue.clear();
    }

    /// Closes the session from our side after [`Coordinator::shutdown`]
    pub fn disconnect(&mut self) {
        self.session.disconnect();
    }

    /// Messages waiting to be written to the pool server
    pub fn take_outbound(&mut self) -> Vec<ClientMessage> {
        self.session.drain_outbox()
    }

    /// Observer snapshot at `now`
    pub fn status(&self, now: Instant) -> MinerStatus {
        MinerStatus {
            state: self.session.state(),
            hashrate: self.hashrate.current_rate(now),
            active_workers: self.workers.active_count(),
            shares_found: self.shares_found,
            workloads_mined: self.workloads_mined,
        }
    }

    /// Current session state
    pub fn state(&self) -> MiningState {
        self.session.state()
    }

    /// Pending units in the queue
    pub fn queue_len(&self) -> usize {
        self.queue.size()
    }

    /// Units mined since the last push
    pub fn mined_since_commit(&self) -> u64 {
        self.mined_since_commit
    }

    /// Hashes recorded since the last hashrate tick
    pub fn hashes_since_last_tick(&self) -> u64 {
        self.hashrate.hashes_since_last_tick()
    }

    /// Live worker count
    pub fn active_workers(&self) -> usize {
        self.workers.active_count()
    }
}
