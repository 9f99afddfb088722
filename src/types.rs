// src/types.rs
use crate::miner::algorithm::cryptonight::{VARIANT_R, VARIANT_V7};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Number of nonces covered by one workload unit
pub const WORKLOAD_SIZE: u64 = 1024;

/// Protocol version announced during registration
pub const PROTOCOL_VERSION: u32 = 1;

/// Expected length of a payout address
pub const ADDRESS_LEN: usize = 44;

/// Longest display name the server accepts
pub const MAX_DISPLAY_NAME_LEN: usize = 24;

/// Delay before a failed registration is retried
pub const REGISTER_RETRY_DELAY: Duration = Duration::from_secs(10);

/// Minimum gap between two outbound pull requests
pub const PULL_MIN_GAP: Duration = Duration::from_secs(5);

/// A pull left unanswered for this long is considered lost
pub const PULL_TIMEOUT: Duration = Duration::from_secs(30);

/// Backoff handed to an idle worker when the queue is empty
pub const REREADY_DELAY: Duration = Duration::from_millis(500);

/// Interval between hashrate samples
pub const HASHRATE_TICK: Duration = Duration::from_secs(5);

/// Number of samples kept by the hashrate ring
pub const HASHRATE_SAMPLES: usize = 10;

/// Platform string sent to the server on registration
pub fn platform_string() -> String {
    format!(
        "workload_miner-rs/{} ({}; {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

/// Hash search backends bundled with the miner
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum AlgorithmType {
    /// CryptoNight variant 1
    #[value(name = "cryptonight-v7")]
    #[serde(rename = "cryptonight-v7")]
    CryptoNightV7,

    /// CryptoNight variant 4
    #[value(name = "cryptonight-r")]
    #[serde(rename = "cryptonight-r")]
    CryptoNightR,
}

impl AlgorithmType {
    /// Variant number understood by the native library
    pub fn variant(self) -> i32 {
        match self {
            AlgorithmType::CryptoNightV7 => VARIANT_V7,
            AlgorithmType::CryptoNightR => VARIANT_R,
        }
    }
}

impl fmt::Display for AlgorithmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlgorithmType::CryptoNightV7 => write!(f, "cryptonight-v7"),
            AlgorithmType::CryptoNightR => write!(f, "cryptonight-r"),
        }
    }
}

impl FromStr for AlgorithmType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cnv7" | "cryptonight-v7" => Ok(AlgorithmType::CryptoNightV7),
            "cnr" | "cryptonight-r" => Ok(AlgorithmType::CryptoNightR),
            _ => Err(format!("Unknown algorithm: {}", s)),
        }
    }
}

/// Mining job assigned by the pool server
///
/// Immutable once received. Workers get it behind an `Arc` so the header
/// buffer is shared rather than copied per unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Block header the nonce is appended to
    pub header: Vec<u8>,
    /// Compact encoded target
    pub difficulty: u32,
    /// Token identifying this job's nonce space
    pub token: String,
    /// First nonce handed out for this job
    pub base_nonce: u64,
}

/// Shared, read-only job snapshot
pub type SharedJob = Arc<Job>;

/// Externally observable mining state
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MiningState {
    /// No connection to the pool server
    #[default]
    Disconnected,
    /// Registration request sent, waiting for the answer
    Registering,
    /// Server rejected the registration
    RegisterFailed,
    /// Server reported it is unable to take miners
    ServerUnable,
    /// Server has no free slot
    ServerFull,
    /// Server requires a newer protocol version
    VersionTooOld,
    /// Registered but no workload available
    WaitingForWork,
    /// Workers are hashing
    Mining,
}

impl fmt::Display for MiningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MiningState::Disconnected => "disconnected",
            MiningState::Registering => "registering",
            MiningState::RegisterFailed => "register failed",
            MiningState::ServerUnable => "server unable",
            MiningState::ServerFull => "server full",
            MiningState::VersionTooOld => "version too old",
            MiningState::WaitingForWork => "waiting for work",
            MiningState::Mining => "mining",
        };
        f.write_str(name)
    }
}

/// Encodes an integer in lowercase base36
pub fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".into();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// Decodes a base36 integer (case-insensitive)
pub fn from_base36(s: &str) -> Option<u64> {
    if s.is_empty() {
        return None;
    }
    u64::from_str_radix(s, 36).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base36_known_values() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(1024), "sg");
        assert_eq!(from_base36("sg"), Some(1024));
        assert_eq!(from_base36("SG"), Some(1024));
        assert_eq!(from_base36(""), None);
        assert_eq!(from_base36("!"), None);
    }

    #[test]
    fn algorithm_names() {
        assert_eq!("cnr".parse::<AlgorithmType>(), Ok(AlgorithmType::CryptoNightR));
        assert_eq!(AlgorithmType::CryptoNightV7.to_string(), "cryptonight-v7");
        assert!("randomx".parse::<AlgorithmType>().is_err());
    }

    #[test]
    fn base36_large_value() {
        let v = u64::MAX / 3;
        assert_eq!(from_base36(&to_base36(v)), Some(v));
    }
}
