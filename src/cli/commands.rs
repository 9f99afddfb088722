// src/cli/commands.rs
use crate::types::AlgorithmType;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Workload miner CLI - pool-coordinated CPU mining client
#[derive(Parser, Debug)]
#[command(name = "workload-miner")]
#[command(version, about, long_about = None)]
pub struct Commands {
    /// The action to perform (start mining, run benchmarks, or generate config)
    #[command(subcommand)]
    pub action: Action,
}

/// Top-level commands for the miner application
#[derive(Subcommand, Debug)]
pub enum Action {
    /// Connect to the pool server and start mining
    Start(StartOptions),

    /// Measure local hashrate without a server
    Benchmark(BenchmarkOptions),

    /// Generate configuration file template
    Config(ConfigOptions),
}

/// Options for starting the mining operation
#[derive(Parser, Debug)]
pub struct StartOptions {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Number of worker threads to use (overrides config)
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Display name shown by the pool (overrides config)
    #[arg(short, long)]
    pub name: Option<String>,

    /// Hash search backend (overrides config)
    #[arg(short, long)]
    pub algorithm: Option<AlgorithmType>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long)]
    pub verbose: bool,
}

/// Options for running mining benchmarks
#[derive(Parser, Debug)]
pub struct BenchmarkOptions {
    /// Algorithm to benchmark
    #[arg(short, long, default_value = "cryptonight-v7")]
    pub algorithm: AlgorithmType,

    /// Duration of benchmark in seconds
    #[arg(short, long, default_value_t = 60)]
    pub duration: u64,

    /// Number of threads to use
    #[arg(short, long, default_value_t = num_cpus::get())]
    pub threads: usize,
}

/// Options for generating configuration files
#[derive(Parser, Debug)]
pub struct ConfigOptions {
    /// Output file path
    #[arg(short, long, default_value = "config.toml")]
    pub output: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_overrides_parse() {
        let cli = Commands::try_parse_from([
            "workload-miner",
            "start",
            "--config",
            "miner.toml",
            "--threads",
            "3",
            "--name",
            "rig-7",
            "--algorithm",
            "cryptonight-r",
            "-v",
        ])
        .unwrap();

        let Action::Start(opts) = cli.action else {
            panic!("expected start");
        };
        assert_eq!(opts.config, PathBuf::from("miner.toml"));
        assert_eq!(opts.threads, Some(3));
        assert_eq!(opts.name.as_deref(), Some("rig-7"));
        assert_eq!(opts.algorithm, Some(AlgorithmType::CryptoNightR));
        assert!(opts.verbose);
    }

    #[test]
    fn benchmark_defaults() {
        let cli = Commands::try_parse_from(["workload-miner", "benchmark", "-d", "5"]).unwrap();
        let Action::Benchmark(opts) = cli.action else {
            panic!("expected benchmark");
        };
        assert_eq!(opts.algorithm, AlgorithmType::CryptoNightV7);
        assert_eq!(opts.duration, 5);
        assert!(opts.threads >= 1);
    }
}
