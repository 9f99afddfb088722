// src/config/config.rs
use crate::types::{ADDRESS_LEN, AlgorithmType, MAX_DISPLAY_NAME_LEN};
use crate::utils::error::MinerError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

/// Main configuration structure for the mining application
///
/// Holds the pool endpoint, the miner's identity, the worker count and the
/// queue sizing knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Pool server WebSocket URL (e.g. "wss://pool.example.com:8443")
    pub server_url: String,

    /// Payout address
    pub address: String,

    /// Name shown on the pool dashboard
    pub display_name: String,

    /// Hash search backend
    #[serde(default = "default_algorithm")]
    pub algorithm: AlgorithmType,

    /// Number of worker threads
    /// (default: number of CPU cores)
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Units seeded per job and requested per pull
    #[serde(default = "default_pull_workloads")]
    pub pull_workloads: u64,

    /// Mined units per full commit
    #[serde(default = "default_commit_workloads")]
    pub commit_workloads: u64,

    /// Queue depth that triggers a pull (default: half of `pull_workloads`)
    #[serde(default)]
    pub refill_threshold: Option<u64>,

    /// Seconds between reconnection attempts
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: u64,

    /// Seconds between status log lines
    #[serde(default = "default_report_interval")]
    pub report_interval_secs: u64,
}

fn default_algorithm() -> AlgorithmType {
    AlgorithmType::CryptoNightV7
}

fn default_threads() -> usize {
    num_cpus::get()
}

fn default_pull_workloads() -> u64 {
    40
}

fn default_commit_workloads() -> u64 {
    20
}

fn default_reconnect_delay() -> u64 {
    5
}

fn default_report_interval() -> u64 {
    30
}

impl Config {
    /// Loads configuration from a file
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file (TOML format)
    ///
    /// # Returns
    /// * `Ok(Config)` - Successfully loaded configuration
    /// * `Err(MinerError)` - If file couldn't be read or parsed
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, MinerError> {
        let path = path.into();
        let config_str = std::fs::read_to_string(&path).map_err(|e| {
            MinerError::ConfigError(format!(
                "Failed to read config at {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::parse(&config_str)
    }

    /// Parses configuration from TOML text
    pub fn parse(text: &str) -> Result<Self, MinerError> {
        toml::from_str(text)
            .map_err(|e| MinerError::ConfigError(format!("Invalid config format: {}", e)))
    }

    /// Effective pull threshold
    pub fn refill_threshold(&self) -> u64 {
        self.refill_threshold.unwrap_or(self.pull_workloads / 2)
    }

    /// Checks every field before mining is allowed to start
    ///
    /// # Errors
    /// `MinerError::InvalidConfig` naming the first offending field.
    pub fn validate(&self) -> Result<(), MinerError> {
        let url = Url::parse(&self.server_url)
            .map_err(|e| MinerError::invalid("server_url", e.to_string()))?;
        if url.scheme() != "ws" && url.scheme() != "wss" {
            return Err(MinerError::invalid(
                "server_url",
                format!("expected ws:// or wss://, got {}://", url.scheme()),
            ));
        }

        if self.address.trim().is_empty() {
            return Err(MinerError::invalid("address", "must not be empty"));
        }
        let address_len = self.address.chars().count();
        if address_len != ADDRESS_LEN {
            return Err(MinerError::invalid(
                "address",
                format!("expected {} characters, got {}", ADDRESS_LEN, address_len),
            ));
        }

        if self.display_name.trim().is_empty() {
            return Err(MinerError::invalid("display_name", "must not be empty"));
        }
        let name_len = self.display_name.chars().count();
        if name_len > MAX_DISPLAY_NAME_LEN {
            return Err(MinerError::invalid(
                "display_name",
                format!(
                    "at most {} characters allowed, got {}",
                    MAX_DISPLAY_NAME_LEN, name_len
                ),
            ));
        }

        if self.threads == 0 {
            return Err(MinerError::invalid("threads", "must be at least 1"));
        }
        if self.pull_workloads == 0 {
            return Err(MinerError::invalid("pull_workloads", "must be at least 1"));
        }
        if self.commit_workloads == 0 {
            return Err(MinerError::invalid("commit_workloads", "must be at least 1"));
        }
        Ok(())
    }

    /// Generates a commented configuration template
    pub fn generate_template() -> String {
        let mut template = String::new();
        template.push_str("# Workload Miner Configuration\n\n");
        template.push_str("# Pool server WebSocket endpoint\n");
        template.push_str("server_url = \"wss://pool.example.com:8443\"\n");
        template.push_str(&format!(
            "# Payout address ({} characters)\n",
            ADDRESS_LEN
        ));
        template.push_str("address = \"NQ00 0000 0000 0000 0000 0000 0000 0000 0000\"\n");
        template.push_str(&format!(
            "# Dashboard name (1-{} characters)\n",
            MAX_DISPLAY_NAME_LEN
        ));
        template.push_str("display_name = \"rig01\"\n\n");
        template.push_str("# Supported algorithms: cryptonight-v7, cryptonight-r\n");
        template.push_str("algorithm = \"cryptonight-v7\"\n");
        template.push_str("# Number of worker threads\n");
        template.push_str(&format!("threads = {}\n", num_cpus::get()));
        template.push_str("# Units per job seed / pull, and per full commit\n");
        template.push_str("pull_workloads = 40\n");
        template.push_str("commit_workloads = 20\n");
        template.push_str("# Pull when fewer units than this are queued\n");
        template.push_str("# refill_threshold = 20\n");
        template.push_str("reconnect_delay_secs = 5\n");
        template.push_str("report_interval_secs = 30\n");
        template
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const ADDRESS: &str = "NQ07 0000 0000 0000 0000 0000 0000 0000 0000";

    fn valid() -> Config {
        Config::parse(&format!(
            r#"
            server_url = "ws://127.0.0.1:9000"
            address = "{}"
            display_name = "rig"
            threads = 2
            "#,
            ADDRESS
        ))
        .unwrap()
    }

    fn field_of(err: MinerError) -> &'static str {
        match err {
            MinerError::InvalidConfig { field, .. } => field,
            other => panic!("expected validation error, got {}", other),
        }
    }

    #[test]
    fn defaults_are_applied() {
        let cfg = valid();
        assert_eq!(cfg.pull_workloads, 40);
        assert_eq!(cfg.commit_workloads, 20);
        assert_eq!(cfg.refill_threshold(), 20);
        assert_eq!(cfg.algorithm, AlgorithmType::CryptoNightV7);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_bad_fields_by_name() {
        let mut cfg = valid();
        cfg.address = "short".into();
        assert_eq!(field_of(cfg.validate().unwrap_err()), "address");

        let mut cfg = valid();
        cfg.address = " ".repeat(ADDRESS_LEN);
        assert_eq!(field_of(cfg.validate().unwrap_err()), "address");

        let mut cfg = valid();
        cfg.display_name = "   ".into();
        assert_eq!(field_of(cfg.validate().unwrap_err()), "display_name");

        let mut cfg = valid();
        cfg.display_name = "x".repeat(MAX_DISPLAY_NAME_LEN + 1);
        assert_eq!(field_of(cfg.validate().unwrap_err()), "display_name");

        let mut cfg = valid();
        cfg.threads = 0;
        assert_eq!(field_of(cfg.validate().unwrap_err()), "threads");

        let mut cfg = valid();
        cfg.server_url = "http://pool.example.com".into();
        assert_eq!(field_of(cfg.validate().unwrap_err()), "server_url");
    }

    #[test]
    fn template_parses_and_validates() {
        let cfg = Config::parse(&Config::generate_template()).unwrap();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "server_url = \"wss://p.example\"\naddress = \"{}\"\ndisplay_name = \"a\"\nrefill_threshold = 3\n",
            ADDRESS
        )
        .unwrap();
        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(cfg.refill_threshold(), 3);

        assert!(matches!(
            Config::load("/nonexistent/miner.toml"),
            Err(MinerError::ConfigError(_))
        ));
    }
}
