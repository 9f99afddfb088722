// src/miner/mod.rs
//! Core mining functionality
//!
//! This module contains all components related to the mining process:
//! - Hash search backends and difficulty decoding
//! - The workload queue and the worker pool
//! - The coordination core and the runtime driving it

/// Hash search implementations
///
/// Contains the [`HashSearch`] boundary plus the bundled CryptoNight
/// backend and compact target decoding.
pub mod algorithm;

/// Workload unit queue
pub mod workload;

/// Worker thread implementation
///
/// Contains the worker thread logic that performs actual hash computations.
/// Workers receive ranges from the pool and report results and readiness.
pub mod worker;

/// Worker pool bookkeeping
pub mod pool;

/// Coordination core
///
/// Single owner of queue, session, pool and counters.
pub mod orchestrator;

/// Async runtime around the coordination core
pub mod runtime;

// Re-export main components for cleaner imports
pub use self::algorithm::{HashSearch, SearchOutcome};
pub use self::orchestrator::{Coordinator, CoordinatorEvent, MinerStatus};
pub use self::pool::WorkerPool;
pub use self::runtime::{Miner, StatusHandle};
pub use self::worker::{ThreadSpawner, Worker, WorkerCommand, WorkerEvent, WorkerSpawner};
pub use self::workload::WorkloadQueue;
