// src/stats/hashrate.rs
//! Sliding-window hashrate tracker
//!
//! Keeps the last [`HASHRATE_SAMPLES`] samples of completed hashes. Each
//! sample is stamped with the instant its accumulation window *started*, so
//! the rate is simply the summed count over the time elapsed since the
//! oldest stamp.

use crate::types::HASHRATE_SAMPLES;
use std::collections::VecDeque;
use std::time::Instant;

#[derive(Debug, Clone, Copy)]
struct Sample {
    since: Instant,
    count: u64,
}

/// Converts completed-nonce counts into a smoothed hashes/second figure
#[derive(Debug)]
pub struct HashrateTracker {
    ring: VecDeque<Sample>,
    hashes_since_last_tick: u64,
    last_tick: Instant,
}

impl HashrateTracker {
    /// Creates a tracker whose window starts at `now`
    pub fn new(now: Instant) -> Self {
        let ring = std::iter::repeat(Sample {
            since: now,
            count: 0,
        })
        .take(HASHRATE_SAMPLES)
        .collect();

        HashrateTracker {
            ring,
            hashes_since_last_tick: 0,
            last_tick: now,
        }
    }

    /// Adds `n` completed hashes to the current interval
    pub fn record_hashes(&mut self, n: u64) {
        self.hashes_since_last_tick += n;
    }

    /// Hashes recorded since the last tick
    pub fn hashes_since_last_tick(&self) -> u64 {
        self.hashes_since_last_tick
    }

    /// Closes the current interval and rotates the ring
    pub fn tick(&mut self, now: Instant) {
        self.ring.push_back(Sample {
            since: self.last_tick,
            count: self.hashes_since_last_tick,
        });
        self.ring.pop_front();
        self.hashes_since_last_tick = 0;
        self.last_tick = now;
    }

    /// Hashes per second over the current window
    pub fn current_rate(&self, now: Instant) -> f64 {
        let Some(oldest) = self.ring.front() else {
            return 0.0;
        };
        let elapsed = now.saturating_duration_since(oldest.since).as_secs_f64();
        if elapsed <= 0.0 {
            return 0.0;
        }
        let total: u64 = self.ring.iter().map(|s| s.count).sum();
        total as f64 / elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HASHRATE_TICK;

    #[test]
    fn fresh_tracker_reports_zero() {
        let now = Instant::now();
        let t = HashrateTracker::new(now);
        assert_eq!(t.current_rate(now), 0.0);
        assert_eq!(t.current_rate(now + HASHRATE_TICK), 0.0);
    }

    #[test]
    fn converges_to_steady_rate() {
        let start = Instant::now();
        let mut t = HashrateTracker::new(start);
        let rate = 2048.0;
        let per_tick = (rate * HASHRATE_TICK.as_secs_f64()) as u64;

        let mut now = start;
        for _ in 0..(HASHRATE_SAMPLES * 2) {
            t.record_hashes(per_tick);
            now += HASHRATE_TICK;
            t.tick(now);
            let r = t.current_rate(now);
            assert!((r - rate).abs() < 1e-6, "rate {} != {}", r, rate);
        }
    }

    #[test]
    fn tick_resets_interval_counter() {
        let start = Instant::now();
        let mut t = HashrateTracker::new(start);
        t.record_hashes(1024);
        t.record_hashes(1024);
        assert_eq!(t.hashes_since_last_tick(), 2048);
        t.tick(start + HASHRATE_TICK);
        assert_eq!(t.hashes_since_last_tick(), 0);
    }

    #[test]
    fn old_samples_fall_out_of_window() {
        let start = Instant::now();
        let mut t = HashrateTracker::new(start);
        let mut now = start;

        t.record_hashes(1_000_000);
        now += HASHRATE_TICK;
        t.tick(now);
        assert!(t.current_rate(now) > 0.0);

        for _ in 0..HASHRATE_SAMPLES {
            now += HASHRATE_TICK;
            t.tick(now);
        }
        assert_eq!(t.current_rate(now), 0.0);
    }
}
