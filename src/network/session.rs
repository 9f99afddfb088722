// src/network/session.rs
//! Pool session state machine
//!
//! Transport independent: the session consumes connection events and decoded
//! server messages, and queues [`ClientMessage`]s in an outbox that the
//! runtime flushes to the socket. Time is always passed in, which keeps the
//! retry and rate-limit timers testable.

use crate::network::protocol::{ClientMessage, RegisterOutcome, Registration, ServerMessage};
use crate::types::{
    Job, MiningState, PULL_MIN_GAP, PULL_TIMEOUT, REGISTER_RETRY_DELAY, SharedJob,
};
use std::sync::Arc;
use std::time::Instant;

/// What the coordinator has to act on after a server message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A new job replaced the previous one
    JobAssigned(SharedJob),
    /// A pull was answered for the current job
    Workload {
        /// First nonce of the new batch
        base_nonce: u64,
    },
}

/// Client side of the pool session
pub struct PoolSession {
    registration: Registration,
    state: MiningState,
    connected: bool,
    job: Option<SharedJob>,
    register_retry_at: Option<Instant>,
    pull_sent_at: Option<Instant>,
    last_pull_at: Option<Instant>,
    outbox: Vec<ClientMessage>,
}

impl PoolSession {
    /// Creates a disconnected session that will register with `registration`
    pub fn new(registration: Registration) -> Self {
        PoolSession {
            registration,
            state: MiningState::Disconnected,
            connected: false,
            job: None,
            register_retry_at: None,
            pull_sent_at: None,
            last_pull_at: None,
            outbox: Vec::new(),
        }
    }

    /// Current observable state
    pub fn state(&self) -> MiningState {
        self.state
    }

    /// Whether a transport connection is up
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Job currently being mined
    pub fn job(&self) -> Option<&SharedJob> {
        self.job.as_ref()
    }

    /// Whether a pull is awaiting its answer
    pub fn pull_in_flight(&self) -> bool {
        self.pull_sent_at.is_some()
    }

    /// Transport connected: send registration
    pub fn on_connected(&mut self, _now: Instant) {
        self.connected = true;
        self.register();
    }

    /// Transport lost
    pub fn on_disconnected(&mut self) {
        if self.connected {
            log::warn!("Connection to pool server lost");
        }
        self.connected = false;
        self.register_retry_at = None;
        self.pull_sent_at = None;
        self.set_state(MiningState::Disconnected);
    }

    /// Applies one server message
    pub fn handle(&mut self, message: ServerMessage, now: Instant) -> Option<SessionEvent> {
        match message {
            ServerMessage::RegisterResult(outcome) => {
                self.on_register_result(outcome, now);
                None
            }
            ServerMessage::JobAssign(job) => Some(self.on_job_assigned(job)),
            ServerMessage::PullResult {
                job_token,
                base_nonce,
            } => self.on_pull_result(&job_token, base_nonce),
        }
    }

    fn on_register_result(&mut self, outcome: RegisterOutcome, now: Instant) {
        let failed = match outcome {
            RegisterOutcome::Accepted => {
                log::info!("Registered with pool server");
                self.register_retry_at = None;
                if self.state == MiningState::Registering {
                    self.set_state(MiningState::WaitingForWork);
                }
                return;
            }
            RegisterOutcome::RegisterFailed => MiningState::RegisterFailed,
            RegisterOutcome::ServerUnable => MiningState::ServerUnable,
            RegisterOutcome::ServerFull => MiningState::ServerFull,
            RegisterOutcome::VersionTooOld => MiningState::VersionTooOld,
            RegisterOutcome::Unknown => {
                log::warn!("Unknown registration response, treating as failure");
                MiningState::RegisterFailed
            }
        };

        log::warn!(
            "Registration refused ({}), retrying in {}s",
            failed,
            REGISTER_RETRY_DELAY.as_secs()
        );
        self.set_state(failed);
        self.register_retry_at = Some(now + REGISTER_RETRY_DELAY);
    }

    fn on_job_assigned(&mut self, job: Job) -> SessionEvent {
        log::info!(
            "New job {} (difficulty {:#010x}, base nonce {})",
            job.token,
            job.difficulty,
            job.base_nonce
        );
        let job = Arc::new(job);
        self.job = Some(job.clone());
        self.register_retry_at = None;
        self.set_state(MiningState::Mining);
        SessionEvent::JobAssigned(job)
    }

    fn on_pull_result(&mut self, job_token: &str, base_nonce: u64) -> Option<SessionEvent> {
        self.pull_sent_at = None;

        match &self.job {
            Some(job) if job.token == job_token => {
                log::debug!("Pull answered: base nonce {}", base_nonce);
                if self.state == MiningState::WaitingForWork {
                    self.set_state(MiningState::Mining);
                }
                Some(SessionEvent::Workload { base_nonce })
            }
            _ => {
                log::debug!("Discarding stale pull response for job {}", job_token);
                None
            }
        }
    }

    /// Timer hook: registration retry and pull timeout
    pub fn poll(&mut self, now: Instant) {
        if let Some(at) = self.register_retry_at {
            if now >= at && self.connected {
                self.register_retry_at = None;
                self.register();
            }
        }

        if let Some(sent) = self.pull_sent_at {
            if now.saturating_duration_since(sent) >= PULL_TIMEOUT {
                log::warn!("Pull unanswered for {}s, giving up on it", PULL_TIMEOUT.as_secs());
                self.pull_sent_at = None;
            }
        }
    }

    /// Requests more workload unless a pull is pending or one went out recently
    ///
    /// Returns true when a pull message was queued.
    pub fn pull(&mut self, now: Instant) -> bool {
        if !self.connected || self.job.is_none() || self.pull_sent_at.is_some() {
            return false;
        }
        if let Some(last) = self.last_pull_at {
            if now.saturating_duration_since(last) < PULL_MIN_GAP {
                return false;
            }
        }
        self.pull_sent_at = Some(now);
        self.last_pull_at = Some(now);
        self.send(ClientMessage::Pull);
        true
    }

    /// Reports a full commit
    pub fn push_full(&mut self) {
        self.send(ClientMessage::PushFull);
    }

    /// Reports `workloads` mined units short of a full commit
    pub fn push_partial(&mut self, workloads: u64) {
        self.send(ClientMessage::PushPartial { workloads });
    }

    /// Submits a found share
    ///
    /// Sent twice as a best-effort guard against message loss; the server
    /// deduplicates.
    pub fn submit_share(&mut self, job_token: &str, nonce: u64, hash: [u8; 32]) {
        log::info!("Share found for job {}: nonce {}", job_token, nonce);
        let message = ClientMessage::SubmitShare {
            job_token: job_token.to_string(),
            nonce,
            hash,
        };
        self.send(message.clone());
        self.send(message);
    }

    /// Queue ran dry while mining
    pub fn enter_waiting_for_work(&mut self) {
        if self.state == MiningState::Mining {
            self.set_state(MiningState::WaitingForWork);
        }
    }

    /// A unit was dispatched again after starvation
    pub fn resume_mining(&mut self) {
        if self.state == MiningState::WaitingForWork && self.job.is_some() {
            self.set_state(MiningState::Mining);
        }
    }

    /// Closes the session from our side
    pub fn disconnect(&mut self) {
        self.on_disconnected();
        self.outbox.clear();
    }

    /// Takes every message queued since the last call
    pub fn drain_outbox(&mut self) -> Vec<ClientMessage> {
        std::mem::take(&mut self.outbox)
    }

    fn register(&mut self) {
        log::info!(
            "Registering as '{}' (protocol v{})",
            self.registration.display_name,
            self.registration.protocol_version
        );
        self.set_state(MiningState::Registering);
        self.send(ClientMessage::Register(self.registration.clone()));
    }

    fn send(&mut self, message: ClientMessage) {
        if self.connected {
            self.outbox.push(message);
        } else {
            log::warn!("Not connected, dropping {:?}", message);
        }
    }

    fn set_state(&mut self, state: MiningState) {
        if self.state != state {
            log::info!("State: {} -> {}", self.state, state);
            self.state = state;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn registration() -> Registration {
        Registration {
            address: "a".repeat(44),
            display_name: "rig".into(),
            protocol_version: 1,
            platform: "test".into(),
            pull_workloads: 40,
            commit_workloads: 20,
        }
    }

    fn job(token: &str) -> ServerMessage {
        ServerMessage::JobAssign(Job {
            header: vec![0; 8],
            difficulty: 0x1d00ffff,
            token: token.into(),
            base_nonce: 0,
        })
    }

    fn connected(now: Instant) -> PoolSession {
        let mut s = PoolSession::new(registration());
        s.on_connected(now);
        s
    }

    fn count_registers(msgs: &[ClientMessage]) -> usize {
        msgs.iter()
            .filter(|m| matches!(m, ClientMessage::Register(_)))
            .count()
    }

    #[test]
    fn connect_sends_registration() {
        let now = Instant::now();
        let mut s = connected(now);
        assert_eq!(s.state(), MiningState::Registering);
        assert_eq!(
            s.drain_outbox(),
            vec![ClientMessage::Register(registration())]
        );
    }

    #[test]
    fn server_full_retries_once_after_delay() {
        let now = Instant::now();
        let mut s = connected(now);
        s.drain_outbox();

        s.handle(ServerMessage::RegisterResult(RegisterOutcome::ServerFull), now);
        assert_eq!(s.state(), MiningState::ServerFull);

        s.poll(now + Duration::from_secs(9));
        assert!(s.drain_outbox().is_empty());

        s.poll(now + REGISTER_RETRY_DELAY);
        s.poll(now + REGISTER_RETRY_DELAY + Duration::from_secs(1));
        s.poll(now + REGISTER_RETRY_DELAY * 3);
        assert_eq!(count_registers(&s.drain_outbox()), 1);
        assert_eq!(s.state(), MiningState::Registering);
    }

    #[test]
    fn unknown_register_code_is_a_failure() {
        let now = Instant::now();
        let mut s = connected(now);
        s.handle(ServerMessage::RegisterResult(RegisterOutcome::Unknown), now);
        assert_eq!(s.state(), MiningState::RegisterFailed);
        s.handle(ServerMessage::RegisterResult(RegisterOutcome::VersionTooOld), now);
        assert_eq!(s.state(), MiningState::VersionTooOld);
    }

    #[test]
    fn accepted_then_job_moves_to_mining() {
        let now = Instant::now();
        let mut s = connected(now);
        s.handle(ServerMessage::RegisterResult(RegisterOutcome::Accepted), now);
        assert_eq!(s.state(), MiningState::WaitingForWork);

        let ev = s.handle(job("t1"), now);
        assert!(matches!(ev, Some(SessionEvent::JobAssigned(j)) if j.token == "t1"));
        assert_eq!(s.state(), MiningState::Mining);
    }

    #[test]
    fn pull_is_rate_limited_and_single_flight() {
        let now = Instant::now();
        let mut s = connected(now);
        s.handle(job("t1"), now);
        s.drain_outbox();

        for i in 0..10 {
            s.pull(now + Duration::from_millis(i * 100));
        }
        let pulls = s
            .drain_outbox()
            .into_iter()
            .filter(|m| *m == ClientMessage::Pull)
            .count();
        assert_eq!(pulls, 1);

        // Answered, but the gap has not elapsed yet
        s.handle(
            ServerMessage::PullResult {
                job_token: "t1".into(),
                base_nonce: 40 * 1024,
            },
            now,
        );
        assert!(!s.pull(now + Duration::from_secs(4)));
        assert!(s.pull(now + PULL_MIN_GAP));
    }

    #[test]
    fn stale_pull_result_is_discarded() {
        let now = Instant::now();
        let mut s = connected(now);
        s.handle(job("old"), now);
        assert!(s.pull(now));
        s.handle(job("new"), now);

        let ev = s.handle(
            ServerMessage::PullResult {
                job_token: "old".into(),
                base_nonce: 4096,
            },
            now,
        );
        assert_eq!(ev, None);
        assert!(!s.pull_in_flight());
    }

    #[test]
    fn lost_pull_times_out() {
        let now = Instant::now();
        let mut s = connected(now);
        s.handle(job("t1"), now);
        assert!(s.pull(now));
        assert!(!s.pull(now + PULL_MIN_GAP));

        s.poll(now + PULL_TIMEOUT);
        assert!(!s.pull_in_flight());
        assert!(s.pull(now + PULL_TIMEOUT));
    }

    #[test]
    fn share_is_sent_twice() {
        let now = Instant::now();
        let mut s = connected(now);
        s.drain_outbox();
        s.submit_share("t1", 77, [1; 32]);
        let out = s.drain_outbox();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], out[1]);
    }

    #[test]
    fn disconnect_clears_timers_and_drops_outbound() {
        let now = Instant::now();
        let mut s = connected(now);
        s.handle(ServerMessage::RegisterResult(RegisterOutcome::ServerUnable), now);
        s.drain_outbox();

        s.on_disconnected();
        assert_eq!(s.state(), MiningState::Disconnected);
        s.poll(now + REGISTER_RETRY_DELAY);
        s.push_full();
        assert!(s.drain_outbox().is_empty());
    }
}
