// src/miner/pool.rs
//! Worker pool
//!
//! Bookkeeping for up to `capacity` worker slots. The pool is owned by the
//! coordination context; it never blocks and only talks to workers through
//! their command channels.

use crate::miner::workload::{WorkloadQueue, unit_range};
use crate::miner::worker::{MineOrder, WorkerCommand, WorkerSpawner};
use crate::types::{REREADY_DELAY, SharedJob};
use crossbeam_channel::Sender;
use std::collections::BTreeMap;

/// Lifecycle of a worker slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerLifecycle {
    /// Spawned, has not asked for work yet
    Starting,
    /// Has received at least one unit
    Active,
    /// Being torn down
    Exiting,
}

/// Unit currently held by a worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InFlight {
    /// Unit index
    pub unit: u64,
    /// Token of the job the unit was cut from
    pub job_token: String,
}

struct WorkerSlot {
    commands: Sender<WorkerCommand>,
    lifecycle: WorkerLifecycle,
    in_flight: Option<InFlight>,
}

/// What happened to a worker that announced ready
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadyOutcome {
    /// Unit handed to the worker
    Dispatched(u64),
    /// Queue empty; worker told to retry later
    Paused,
    /// Mining stopped; worker terminated
    Retired,
    /// Worker is not (or no longer) part of the pool
    Unknown,
}

/// Fixed-capacity set of hash-search workers
pub struct WorkerPool {
    capacity: usize,
    mining: bool,
    next_thread_id: u32,
    slots: BTreeMap<u32, WorkerSlot>,
    spawner: Box<dyn WorkerSpawner>,
}

impl WorkerPool {
    /// Creates an idle pool
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of concurrent workers
    /// * `spawner` - Creates the worker threads
    pub fn new(capacity: usize, spawner: Box<dyn WorkerSpawner>) -> Self {
        WorkerPool {
            capacity,
            mining: false,
            next_thread_id: 0,
            slots: BTreeMap::new(),
            spawner,
        }
    }

    /// Whether the pool is accepting work
    pub fn is_mining(&self) -> bool {
        self.mining
    }

    /// Number of live workers
    pub fn active_count(&self) -> usize {
        self.slots.len()
    }

    /// Lifecycle of worker `thread_id`, if it exists
    pub fn lifecycle(&self, thread_id: u32) -> Option<WorkerLifecycle> {
        self.slots.get(&thread_id).map(|s| s.lifecycle)
    }

    /// Switches to mining and fills every free slot
    ///
    /// Returns the number of workers actually started.
    pub fn start(&mut self) -> usize {
        self.mining = true;
        let mut started = 0;
        while self.slots.len() < self.capacity {
            if self.spawn().is_none() {
                break;
            }
            started += 1;
        }
        if started < self.capacity {
            log::warn!(
                "Only {} of {} workers could be started",
                started,
                self.capacity
            );
        } else {
            log::info!("Started {} workers", started);
        }
        started
    }

    /// Spawns one worker
    ///
    /// Refuses (with a log line) when not mining or already at capacity.
    pub fn spawn(&mut self) -> Option<u32> {
        if !self.mining {
            log::warn!("Refusing to spawn worker: not mining");
            return None;
        }
        if self.slots.len() >= self.capacity {
            log::warn!("Refusing to spawn worker: pool full ({})", self.capacity);
            return None;
        }

        let thread_id = self.next_thread_id;
        self.next_thread_id += 1;

        let commands = match self.spawner.spawn(thread_id) {
            Ok(commands) => commands,
            Err(e) => {
                log::error!("Failed to spawn worker {}: {}", thread_id, e);
                return None;
            }
        };
        if let Err(e) = commands.send(WorkerCommand::Init { thread_id }) {
            log::error!("Worker {} died during startup: {}", thread_id, e);
            return None;
        }

        self.slots.insert(
            thread_id,
            WorkerSlot {
                commands,
                lifecycle: WorkerLifecycle::Starting,
                in_flight: None,
            },
        );
        Some(thread_id)
    }

    /// Hands worker `thread_id` its next unit, or tells it to wait
    ///
    /// Terminates the worker instead when mining has stopped. A unit that
    /// cannot be delivered goes back to the front of the queue.
    pub fn on_ready(
        &mut self,
        thread_id: u32,
        queue: &mut WorkloadQueue,
        job: Option<&SharedJob>,
    ) -> ReadyOutcome {
        if !self.mining {
            return if self.retire(thread_id) {
                ReadyOutcome::Retired
            } else {
                ReadyOutcome::Unknown
            };
        }
        if !self.slots.contains_key(&thread_id) {
            return ReadyOutcome::Unknown;
        }

        let next = job.and_then(|job| queue.take().map(|unit| (job, unit)));
        match next {
            Some((job, unit)) => {
                if self.dispatch(thread_id, job, unit) {
                    ReadyOutcome::Dispatched(unit)
                } else {
                    queue.requeue(unit);
                    ReadyOutcome::Unknown
                }
            }
            None => {
                self.reready(thread_id);
                ReadyOutcome::Paused
            }
        }
    }

    /// Sends unit `unit` of `job` to worker `thread_id`
    pub fn dispatch(&mut self, thread_id: u32, job: &SharedJob, unit: u64) -> bool {
        let Some(slot) = self.slots.get_mut(&thread_id) else {
            return false;
        };
        let range = unit_range(unit);
        let order = MineOrder {
            job: job.clone(),
            start_nonce: range.start,
            end_nonce: range.end,
        };

        match slot.commands.send(WorkerCommand::Mine(order)) {
            Ok(()) => {
                slot.lifecycle = WorkerLifecycle::Active;
                slot.in_flight = Some(InFlight {
                    unit,
                    job_token: job.token.clone(),
                });
                true
            }
            Err(e) => {
                log::error!("Dispatch to worker {} failed: {}", thread_id, e);
                false
            }
        }
    }

    fn reready(&mut self, thread_id: u32) {
        if let Some(slot) = self.slots.get(&thread_id) {
            if let Err(e) = slot.commands.send(WorkerCommand::Reready {
                delay: REREADY_DELAY,
            }) {
                log::error!("Reready to worker {} failed: {}", thread_id, e);
            }
        }
    }

    /// Clears and returns the unit worker `thread_id` was holding
    pub fn complete(&mut self, thread_id: u32) -> Option<InFlight> {
        self.slots
            .get_mut(&thread_id)
            .and_then(|slot| slot.in_flight.take())
    }

    /// Removes worker `thread_id`; dropping its command sender ends the thread
    pub fn retire(&mut self, thread_id: u32) -> bool {
        match self.slots.remove(&thread_id) {
            Some(slot) => {
                log::debug!(
                    "Worker {}: {:?} -> {:?}",
                    thread_id,
                    slot.lifecycle,
                    WorkerLifecycle::Exiting
                );
                true
            }
            None => false,
        }
    }

    /// Stops mining and terminates every worker
    ///
    /// In-flight searches finish on their own; their results are ignored.
    pub fn shutdown(&mut self) {
        if self.mining || !self.slots.is_empty() {
            log::info!("Stopping {} workers", self.slots.len());
        }
        self.mining = false;
        self.slots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Job;
    use crate::utils::error::MinerError;
    use crossbeam_channel::Receiver;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recorder {
        receivers: Arc<Mutex<Vec<Receiver<WorkerCommand>>>>,
        fail: bool,
    }

    impl WorkerSpawner for Recorder {
        fn spawn(&mut self, _thread_id: u32) -> Result<Sender<WorkerCommand>, MinerError> {
            if self.fail {
                return Err(MinerError::TaskError("no threads".into()));
            }
            let (tx, rx) = crossbeam_channel::unbounded();
            self.receivers.lock().unwrap().push(rx);
            Ok(tx)
        }
    }

    fn job() -> SharedJob {
        Arc::new(Job {
            header: vec![9; 4],
            difficulty: 0x1d00ffff,
            token: "t".into(),
            base_nonce: 0,
        })
    }

    #[test]
    fn spawn_respects_capacity_and_mining_flag() {
        let rec = Recorder::default();
        let mut pool = WorkerPool::new(2, Box::new(rec.clone()));
        assert_eq!(pool.spawn(), None);

        assert_eq!(pool.start(), 2);
        assert_eq!(pool.active_count(), 2);
        assert_eq!(pool.spawn(), None);
        assert_eq!(pool.lifecycle(0), Some(WorkerLifecycle::Starting));

        let rx = rec.receivers.lock().unwrap();
        assert!(matches!(
            rx[1].try_recv(),
            Ok(WorkerCommand::Init { thread_id: 1 })
        ));
    }

    #[test]
    fn failing_spawner_leaves_pool_short() {
        let rec = Recorder {
            fail: true,
            ..Default::default()
        };
        let mut pool = WorkerPool::new(4, Box::new(rec));
        assert_eq!(pool.start(), 0);
        assert!(pool.is_mining());
        assert_eq!(pool.active_count(), 0);
    }

    #[test]
    fn ready_dispatches_then_pauses() {
        let rec = Recorder::default();
        let mut pool = WorkerPool::new(1, Box::new(rec.clone()));
        pool.start();
        let mut queue = WorkloadQueue::new();
        queue.seed(5 * 1024, 1);
        let job = job();

        assert_eq!(
            pool.on_ready(0, &mut queue, Some(&job)),
            ReadyOutcome::Dispatched(5)
        );
        assert_eq!(pool.lifecycle(0), Some(WorkerLifecycle::Active));
        assert_eq!(pool.on_ready(0, &mut queue, Some(&job)), ReadyOutcome::Paused);
        assert_eq!(pool.on_ready(7, &mut queue, Some(&job)), ReadyOutcome::Unknown);

        let rx = rec.receivers.lock().unwrap();
        let sent: Vec<_> = rx[0].try_iter().collect();
        assert!(matches!(sent[0], WorkerCommand::Init { .. }));
        match &sent[1] {
            WorkerCommand::Mine(order) => {
                assert_eq!(order.start_nonce, 5120);
                assert_eq!(order.end_nonce, 6144);
                assert_eq!(order.job.token, "t");
            }
            other => panic!("expected mine, got {:?}", other),
        }
        assert!(matches!(sent[2], WorkerCommand::Reready { delay } if delay == REREADY_DELAY));
    }

    #[test]
    fn undeliverable_unit_returns_to_queue() {
        let rec = Recorder::default();
        let mut pool = WorkerPool::new(1, Box::new(rec.clone()));
        pool.start();
        rec.receivers.lock().unwrap().clear();

        let mut queue = WorkloadQueue::new();
        queue.seed(0, 2);
        assert_eq!(
            pool.on_ready(0, &mut queue, Some(&job())),
            ReadyOutcome::Unknown
        );
        assert_eq!(queue.size(), 2);
        assert_eq!(queue.take(), Some(0));
    }

    #[test]
    fn shutdown_is_idempotent_and_retires_on_ready() {
        let rec = Recorder::default();
        let mut pool = WorkerPool::new(3, Box::new(rec.clone()));
        pool.start();
        pool.shutdown();
        pool.shutdown();
        assert_eq!(pool.active_count(), 0);
        assert!(!pool.is_mining());

        let mut queue = WorkloadQueue::new();
        queue.seed(0, 4);
        assert_eq!(
            pool.on_ready(0, &mut queue, Some(&job())),
            ReadyOutcome::Unknown
        );
        assert_eq!(queue.size(), 4);

        // Command channels were dropped: workers see a disconnect
        for rx in rec.receivers.lock().unwrap().iter() {
            let _ = rx.try_recv();
            assert!(rx.recv().is_err());
        }
    }
}
