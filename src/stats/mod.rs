//! Statistics collection and reporting module
//!
//! This module provides functionality for tracking and reporting mining statistics,
//! including:
//! - Hashrate estimation over a sliding window
//! - Hardware monitoring (CPU, memory, temperature)
//!
//! [`HashrateTracker`] is owned by the coordination core; [`StatsReporter`]
//! only reads the status the miner publishes and logs it periodically.
//!

/// Sliding-window hashrate estimate
pub mod hashrate;

/// Submodule containing the statistics reporter implementation
///
/// The reporter handles:
/// - Hardware monitoring
/// - Periodic logging of the published miner status
pub mod reporter;

// Re-export main components
pub use hashrate::HashrateTracker;
pub use reporter::{HardwareStats, ReporterHandle, StatsReporter};
