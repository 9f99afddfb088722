//! Workload Miner - pool-coordinated CPU mining client in Rust
//!
//! This crate provides a mining client that receives jobs from a pool server
//! over WebSocket, splits each job's nonce space into fixed-size workload
//! units, farms those units out to a pool of worker threads and reports
//! progress and found shares back to the server. It includes:
//! - A synchronous coordination core that can be driven by a simulated clock
//! - A tokio runtime wrapper with reconnection and periodic timers
//! - Performance benchmarking
//! - Hardware monitoring

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Miner core implementation including algorithms, workers and coordination
pub mod miner;

/// Network communication components for the pool server
pub mod network;

/// Statistics collection and reporting functionality
pub mod stats;

/// Utility functions and error handling
pub mod utils;

/// Command-line interface definitions
pub mod cli;

/// Configuration management
pub mod config;

/// Shared type definitions
pub mod types;

// Core exports
pub use cli::Commands;
pub use config::Config;
pub use miner::{Coordinator, CoordinatorEvent, HashSearch, Miner, MinerStatus, SearchOutcome};
pub use network::{PoolConnection, PoolSession};
pub use stats::{HardwareStats, HashrateTracker, StatsReporter};
pub use types::{AlgorithmType, Job, MiningState};
pub use utils::{MinerError, init_logging};
