// src/miner/algorithm/mod.rs
//! Hash search collaborators
//!
//! The orchestrator never hashes anything itself. Workers call a
//! [`HashSearch`] implementation for one workload unit at a time and report
//! the outcome back over their event channel.

/// CryptoNight binding backed by the native `cryptonight` library
pub mod cryptonight;

/// Compact difficulty decoding
pub mod difficulty;

use crate::utils::error::MinerError;

/// Result of searching one nonce range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// A nonce whose hash meets the target
    Found {
        /// Winning nonce
        nonce: u64,
        /// Hash produced by that nonce
        hash: [u8; 32],
    },
    /// The range was searched up to its end without a solution
    Exhausted,
}

/// Common interface for hash search backends
///
/// Implementations run synchronously on a worker thread for the duration of
/// one unit.
pub trait HashSearch: Send + Sync {
    /// Searches `[start, end)` for a nonce meeting `difficulty`
    ///
    /// # Arguments
    /// * `header` - The block header the nonce is appended to
    /// * `difficulty` - Compact encoded target
    /// * `start` - First nonce to try
    /// * `end` - Nonce at which the search gives up (exclusive)
    fn search(
        &self,
        header: &[u8],
        difficulty: u32,
        start: u64,
        end: u64,
    ) -> Result<SearchOutcome, MinerError>;

    /// Short name used in logs
    fn name(&self) -> &'static str;
}
