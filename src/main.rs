// src/main.rs
use clap::Parser;
use crossbeam_channel::{RecvTimeoutError, unbounded};
use log::LevelFilter;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;
use workload_miner_rs::miner::algorithm::cryptonight::CryptoNightSearch;
use workload_miner_rs::types::HASHRATE_TICK;
use workload_miner_rs::{self, *};

/// Nonces per search call in the benchmark
const BENCH_CHUNK: u64 = 16;

/// Main entry point for the workload miner
///
/// # Returns
/// - `Ok(())` on successful execution
/// - `Err(MinerError)` if any operation fails
///
/// # Flow
/// 1. Parses command line arguments
/// 2. Delegates to appropriate subcommand handler
/// 3. Propagates any errors upward
fn main() -> Result<(), MinerError> {
    let cli = cli::Commands::parse();

    match cli.action {
        cli::Action::Start(opts) => start_mining(opts),
        cli::Action::Benchmark(opts) => run_benchmark(opts),
        cli::Action::Config(opts) => generate_config(opts),
    }
}

/// Starts the mining operation with given configuration options
///
/// # Arguments
/// * `opts` - Command line options for mining operation
///
/// # Operations
/// 1. Initializes logging
/// 2. Loads the configuration and applies CLI overrides
/// 3. Validates the result before anything is started
/// 4. Runs the miner and the stats reporter until Ctrl-C
fn start_mining(opts: cli::StartOptions) -> Result<(), MinerError> {
    if opts.verbose {
        utils::init_with_default(LevelFilter::Debug);
    } else {
        utils::init_logging();
    }

    let mut config = config::load(opts.config)?;
    // Apply CLI overrides
    if let Some(threads) = opts.threads {
        config.threads = threads;
    }
    if let Some(name) = opts.name {
        config.display_name = name;
    }
    if let Some(algo) = opts.algorithm {
        config.algorithm = algo;
    }
    config.validate()?;

    let searcher = create_searcher(config.algorithm)?;
    let report_interval = Duration::from_secs(config.report_interval_secs);

    let rt = Runtime::new()?;
    rt.block_on(async {
        let mut miner = Miner::new(searcher);
        miner.start(config)?;

        let reporter = StatsReporter::new(miner.status_handle(), report_interval)
            .start_reporting()?;

        tokio::signal::ctrl_c().await?;
        log::info!("Interrupted, shutting down");

        miner.stop().await;
        reporter.stop();
        Ok(())
    })
}

/// Runs mining algorithm benchmarks
///
/// # Arguments
/// * `opts` - Benchmark configuration options
///
/// # Operations
/// 1. Initializes benchmark-specific logging
/// 2. Creates specified searcher instance
/// 3. Spawns worker threads over disjoint nonce ranges
/// 4. Feeds completed hashes into a [`HashrateTracker`] and reports it
fn run_benchmark(opts: cli::BenchmarkOptions) -> Result<(), MinerError> {
    utils::init_with_default(LevelFilter::Debug);

    let searcher = create_searcher(opts.algorithm)?;
    let threads = opts.threads.max(1);
    let deadline = Instant::now() + Duration::from_secs(opts.duration);
    let (hash_sender, hash_receiver) = unbounded::<u64>();

    log::info!(
        "Starting {} benchmark for {} seconds on {} threads",
        opts.algorithm,
        opts.duration,
        threads
    );

    let handles: Vec<_> = (0..threads as u64)
        .map(|t| {
            let searcher = searcher.clone();
            let sender = hash_sender.clone();
            std::thread::spawn(move || -> Result<(), MinerError> {
                let header = vec![0u8; 76];
                let mut nonce = t << 40;
                while Instant::now() < deadline {
                    // Compact difficulty 0 decodes to a zero target
                    searcher.search(&header, 0, nonce, nonce + BENCH_CHUNK)?;
                    nonce += BENCH_CHUNK;
                    if sender.send(BENCH_CHUNK).is_err() {
                        break;
                    }
                }
                Ok(())
            })
        })
        .collect();
    drop(hash_sender);

    let started = Instant::now();
    let mut tracker = HashrateTracker::new(started);
    let mut next_tick = started + HASHRATE_TICK;
    let mut total = 0u64;
    loop {
        let wait = next_tick.saturating_duration_since(Instant::now());
        match hash_receiver.recv_timeout(wait) {
            Ok(count) => {
                tracker.record_hashes(count);
                total += count;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        let now = Instant::now();
        if now >= next_tick {
            tracker.tick(now);
            next_tick += HASHRATE_TICK;
            log::info!("Hashrate: {:.2} H/s", tracker.current_rate(now));
        }
    }

    // Wait for all threads to complete
    for handle in handles {
        handle
            .join()
            .map_err(|_| MinerError::TaskError("Benchmark thread panicked".into()))??;
    }

    let now = Instant::now();
    tracker.tick(now);
    log::info!("Benchmark results:");
    log::info!("Total hashes: {}", total);
    log::info!(
        "Average hashrate: {:.2} H/s",
        total as f64 / now.duration_since(started).as_secs_f64().max(f64::EPSILON)
    );
    log::info!("Windowed hashrate: {:.2} H/s", tracker.current_rate(now));
    log::logger().flush(); // Ensure final results appear

    Ok(())
}

/// Generates configuration template file
///
/// # Arguments
/// * `opts` - Configuration generation options
fn generate_config(opts: cli::ConfigOptions) -> Result<(), MinerError> {
    std::fs::write(&opts.output, config::generate_template())?;
    println!("Wrote configuration template to {}", opts.output.display());
    Ok(())
}

/// Creates the hash search backend for `algorithm`
///
/// # Returns
/// - `Ok(Arc<dyn HashSearch>)` on success
/// - `Err(MinerError)` if the backend rejects the variant
fn create_searcher(algorithm: AlgorithmType) -> Result<Arc<dyn HashSearch>, MinerError> {
    Ok(Arc::new(CryptoNightSearch::new(algorithm.variant())?))
}
