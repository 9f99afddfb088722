// src/network/mod.rs
//! Network communication components
//!
//! Everything needed to talk to the work-distribution server:
//! - `protocol`: the message set and its wire encoding
//! - `session`: the register/assign/pull/push state machine
//! - `pool`: the WebSocket transport underneath

/// Wire messages and codec
pub mod protocol;

/// Pool session state machine
///
/// Transport independent; consumes decoded messages and produces outbound
/// ones.
pub mod session;

/// WebSocket connection to the pool server
pub mod pool;

// Re-export main components for cleaner imports
pub use pool::PoolConnection;
pub use protocol::{ClientMessage, RegisterOutcome, ServerMessage};
pub use session::PoolSession;
