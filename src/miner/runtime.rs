// src/miner/runtime.rs
//! Miner runtime
//!
//! [`Miner`] is the observer-facing handle: `start`, `stop` and
//! `current_state`. Starting spawns one tokio task, the coordination
//! context, which owns the [`Coordinator`] and the pool connection and
//! multiplexes socket frames, worker events and timers into it.

use crate::config::Config;
use crate::miner::algorithm::HashSearch;
use crate::miner::orchestrator::{Coordinator, CoordinatorEvent, MinerStatus};
use crate::miner::worker::{ThreadSpawner, WorkerEvent};
use crate::network::pool::PoolConnection;
use crate::network::protocol::ServerMessage;
use crate::types::HASHRATE_TICK;
use crate::utils::error::MinerError;
use arc_swap::ArcSwap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time;

/// Upper bound for one connection attempt
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Housekeeping timer period
const HOUSEKEEPING_INTERVAL: Duration = Duration::from_secs(1);

/// Lock-free, shareable view of the latest [`MinerStatus`]
pub type StatusHandle = Arc<ArcSwap<MinerStatus>>;

struct Running {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Observer-facing miner handle
pub struct Miner {
    searcher: Arc<dyn HashSearch>,
    status: StatusHandle,
    running: Option<Running>,
}

impl Miner {
    /// Creates a stopped miner using `searcher` for the actual hashing
    pub fn new(searcher: Arc<dyn HashSearch>) -> Self {
        Miner {
            searcher,
            status: Arc::new(ArcSwap::from_pointee(MinerStatus::default())),
            running: None,
        }
    }

    /// Validates `config` and starts mining
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// `MinerError::InvalidConfig` when validation fails (nothing is started),
    /// `MinerError::InputError` when already running.
    pub fn start(&mut self, config: Config) -> Result<(), MinerError> {
        if self.running.is_some() {
            return Err(MinerError::InputError("Miner already started".into()));
        }
        config.validate()?;

        log::info!(
            "Starting {} workers ({}) against {}",
            config.threads,
            self.searcher.name(),
            config.server_url
        );

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let spawner = ThreadSpawner::new(self.searcher.clone(), events_tx);
        let core = Coordinator::new(&config, Box::new(spawner), Instant::now());
        let (stop_tx, stop_rx) = oneshot::channel();

        let driver = Driver {
            core,
            conn: None,
            server_url: config.server_url.clone(),
            reconnect_delay: Duration::from_secs(config.reconnect_delay_secs),
            reconnect_at: Instant::now(),
            status: self.status.clone(),
        };
        let task = tokio::spawn(driver.run(events_rx, stop_rx));

        self.running = Some(Running {
            stop: stop_tx,
            task,
        });
        Ok(())
    }

    /// Stops mining: closes the session, terminates workers, stops timers
    ///
    /// A no-op when the miner is not running.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        let _ = running.stop.send(());
        if let Err(e) = running.task.await {
            log::error!("{}", MinerError::from(e));
        }
        self.status.store(Arc::new(MinerStatus::default()));
        log::info!("Miner stopped");
    }

    /// Whether `start` has been called without a matching `stop`
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Latest state and hashrate
    pub fn current_state(&self) -> MinerStatus {
        **self.status.load()
    }

    /// Shared status handle for reporters
    pub fn status_handle(&self) -> StatusHandle {
        self.status.clone()
    }
}

/// Things the coordination loop can wake up for
enum Wake {
    Stop,
    Frame(Option<Result<ServerMessage, MinerError>>),
    Worker(WorkerEvent),
    Housekeeping,
    HashrateTick,
}

struct Driver {
    core: Coordinator,
    conn: Option<PoolConnection>,
    server_url: String,
    reconnect_delay: Duration,
    reconnect_at: Instant,
    status: StatusHandle,
}

impl Driver {
    async fn run(
        mut self,
        mut worker_events: mpsc::UnboundedReceiver<WorkerEvent>,
        mut stop: oneshot::Receiver<()>,
    ) {
        let mut housekeeping = time::interval(HOUSEKEEPING_INTERVAL);
        let mut hashrate_tick =
            time::interval_at(time::Instant::now() + HASHRATE_TICK, HASHRATE_TICK);

        loop {
            if self.conn.is_none() && Instant::now() >= self.reconnect_at {
                tokio::select! {
                    _ = &mut stop => break,
                    _ = self.connect() => {}
                }
            }

            let wake = tokio::select! {
                _ = &mut stop => Wake::Stop,
                frame = next_frame(&mut self.conn) => Wake::Frame(frame),
                Some(event) = worker_events.recv() => Wake::Worker(event),
                _ = housekeeping.tick() => Wake::Housekeeping,
                _ = hashrate_tick.tick() => Wake::HashrateTick,
            };

            let now = Instant::now();
            match wake {
                Wake::Stop => break,
                Wake::Frame(Some(Ok(message))) => {
                    self.core.handle(CoordinatorEvent::Server(message), now)
                }
                Wake::Frame(Some(Err(
                    e @ (MinerError::ProtocolError(_)
                    | MinerError::JsonError(_)
                    | MinerError::InputError(_)),
                ))) => log::warn!("Skipping bad frame: {}", e),
                Wake::Frame(Some(Err(e))) => {
                    log::warn!("Connection error: {}", e);
                    self.drop_connection(now);
                }
                Wake::Frame(None) => self.drop_connection(now),
                Wake::Worker(event) => self.core.handle(CoordinatorEvent::Worker(event), now),
                Wake::Housekeeping => self.core.handle(CoordinatorEvent::Housekeeping, now),
                Wake::HashrateTick => self.core.handle(CoordinatorEvent::HashrateTick, now),
            }

            self.flush().await;
            self.publish(Instant::now());
        }

        self.core.shutdown();
        self.flush().await;
        self.core.disconnect();
        if let Some(conn) = self.conn.take() {
            conn.close().await;
        }
        self.publish(Instant::now());
    }

    async fn connect(&mut self) {
        let attempt = time::timeout(CONNECT_TIMEOUT, PoolConnection::connect(&self.server_url));
        match attempt.await {
            Ok(Ok(conn)) => {
                self.conn = Some(conn);
                self.core
                    .handle(CoordinatorEvent::Connected, Instant::now());
                self.flush().await;
            }
            Ok(Err(e)) => {
                log::warn!(
                    "Connection failed: {}; retrying in {}s",
                    e,
                    self.reconnect_delay.as_secs()
                );
                self.reconnect_at = Instant::now() + self.reconnect_delay;
            }
            Err(_) => {
                log::warn!(
                    "Connection to {} timed out; retrying in {}s",
                    self.server_url,
                    self.reconnect_delay.as_secs()
                );
                self.reconnect_at = Instant::now() + self.reconnect_delay;
            }
        }
        self.publish(Instant::now());
    }

    fn drop_connection(&mut self, now: Instant) {
        self.conn = None;
        self.core.handle(CoordinatorEvent::Disconnected, now);
        self.reconnect_at = now + self.reconnect_delay;
    }

    async fn flush(&mut self) {
        for message in self.core.take_outbound() {
            let Some(conn) = self.conn.as_mut() else {
                log::warn!("Not connected, dropping {:?}", message);
                continue;
            };
            if let Err(e) = conn.send(&message).await {
                log::warn!("Send to {} failed: {}", conn.url(), e);
                self.drop_connection(Instant::now());
            }
        }
    }

    fn publish(&self, now: Instant) {
        self.status.store(Arc::new(self.core.status(now)));
    }
}

async fn next_frame(
    conn: &mut Option<PoolConnection>,
) -> Option<Result<ServerMessage, MinerError>> {
    match conn {
        Some(conn) => conn.next_message().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MiningState;

    struct IdleSearch;

    impl HashSearch for IdleSearch {
        fn search(
            &self,
            _header: &[u8],
            _difficulty: u32,
            _start: u64,
            _end: u64,
        ) -> Result<crate::miner::algorithm::SearchOutcome, MinerError> {
            Ok(crate::miner::algorithm::SearchOutcome::Exhausted)
        }

        fn name(&self) -> &'static str {
            "idle"
        }
    }

    fn config(server_url: &str) -> Config {
        Config::parse(&format!(
            r#"
            server_url = "{}"
            address = "NQ07 0000 0000 0000 0000 0000 0000 0000 0000"
            display_name = "rig"
            threads = 1
            reconnect_delay_secs = 60
            "#,
            server_url
        ))
        .unwrap()
    }

    #[tokio::test]
    async fn invalid_config_is_rejected_before_anything_starts() {
        let mut miner = Miner::new(Arc::new(IdleSearch));
        let mut cfg = config("ws://127.0.0.1:1");
        cfg.threads = 0;

        match miner.start(cfg) {
            Err(MinerError::InvalidConfig { field, .. }) => assert_eq!(field, "threads"),
            other => panic!("expected threads validation error, got {:?}", other),
        }
        assert!(!miner.is_running());
        assert_eq!(miner.current_state(), MinerStatus::default());
    }

    #[tokio::test]
    async fn stop_without_start_is_a_no_op() {
        let mut miner = Miner::new(Arc::new(IdleSearch));
        miner.stop().await;
        miner.stop().await;
        assert!(!miner.is_running());
        assert_eq!(miner.current_state().state, MiningState::Disconnected);
    }

    #[tokio::test]
    async fn start_twice_fails_and_stop_is_prompt() {
        let mut miner = Miner::new(Arc::new(IdleSearch));
        // Nothing listens on port 1, so the miner keeps retrying
        miner.start(config("ws://127.0.0.1:1")).unwrap();
        assert!(miner.is_running());
        assert!(matches!(
            miner.start(config("ws://127.0.0.1:1")),
            Err(MinerError::InputError(_))
        ));

        time::timeout(Duration::from_secs(5), miner.stop())
            .await
            .unwrap();
        assert!(!miner.is_running());
        assert_eq!(miner.current_state().active_workers, 0);
        assert_eq!(miner.current_state().state, MiningState::Disconnected);
    }
}
