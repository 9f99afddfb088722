// src/miner/workload.rs
//! Workload queue
//!
//! A workload unit is an index `i` covering nonces `[i*K, i*K + K)` with
//! `K = WORKLOAD_SIZE`. Units are handed out FIFO and leave the queue the
//! moment they are dispatched, so an outstanding unit can never be issued
//! twice.

use crate::types::WORKLOAD_SIZE;
use std::collections::VecDeque;

/// Nonce range of one workload unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NonceRange {
    /// First nonce (inclusive)
    pub start: u64,
    /// Last nonce (exclusive)
    pub end: u64,
}

/// Units past this index would run beyond `u64::MAX`
pub const UNIT_LIMIT: u64 = u64::MAX / WORKLOAD_SIZE;

/// Returns the nonce range covered by `unit`
///
/// Saturates at `u64::MAX` for units at or past [`UNIT_LIMIT`]; the queue
/// never hands those out.
pub fn unit_range(unit: u64) -> NonceRange {
    let start = unit.saturating_mul(WORKLOAD_SIZE);
    NonceRange {
        start,
        end: start.saturating_add(WORKLOAD_SIZE),
    }
}

/// Ordered queue of pending workload units
#[derive(Debug, Default)]
pub struct WorkloadQueue {
    units: VecDeque<u64>,
}

impl WorkloadQueue {
    /// Creates an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `count` sequential units starting at the unit holding `base_nonce`
    ///
    /// Units whose range would overflow the nonce space are dropped.
    ///
    /// # Returns
    /// The number of units actually queued
    pub fn seed(&mut self, base_nonce: u64, count: u64) -> u64 {
        let first = base_nonce / WORKLOAD_SIZE;
        let end = first.saturating_add(count).min(UNIT_LIMIT);
        let added = end.saturating_sub(first);
        if added < count {
            log::warn!(
                "Base nonce {} leaves room for {} of {} units",
                base_nonce,
                added,
                count
            );
        }
        self.units.extend(first..first + added);
        added
    }

    /// Removes and returns the earliest pending unit
    ///
    /// Never blocks; `None` means there is no work right now.
    pub fn take(&mut self) -> Option<u64> {
        self.units.pop_front()
    }

    /// Puts an undelivered unit back at the head of the queue
    pub fn requeue(&mut self, unit: u64) {
        self.units.push_front(unit);
    }

    /// Number of pending units
    pub fn size(&self) -> usize {
        self.units.len()
    }

    /// True when nothing is pending
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Drops every pending unit (job superseded)
    pub fn clear(&mut self) {
        self.units.clear();
    }
}
