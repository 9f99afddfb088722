// src/utils/error.rs
use serde_json;
use std::io;
use thiserror::Error;
use tokio_tungstenite::tungstenite;
use url;

/// Main error type for the mining application
///
/// Covers configuration validation, pool connectivity, wire protocol
/// decoding and worker communication failures.
#[derive(Error, Debug)]
pub enum MinerError {
    /// Errors raised by the hash search collaborator
    #[error("Hash search error: {0}")]
    SearchError(String),

    /// Errors related to network connectivity
    #[error("Network connection error: {0}")]
    ConnectionError(String),

    /// Errors in protocol handling or invalid protocol messages
    #[error("Protocol violation: {0}")]
    ProtocolError(String),

    /// Standard I/O operation errors
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL parse error: {0}")]
    UrlError(#[from] url::ParseError),

    /// WebSocket communication errors
    #[error("WebSocket error: {0}")]
    WsError(#[from] tungstenite::Error),

    /// Configuration file errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A configuration value failed validation
    #[error("Invalid configuration value for `{field}`: {reason}")]
    InvalidConfig {
        /// Name of the offending field
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },

    /// Invalid user input or parameter errors
    #[error("Invalid input: {0}")]
    InputError(String),

    /// Async task execution errors
    #[error("Task execution error: {0}")]
    TaskError(String),
}

impl MinerError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        MinerError::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

/// Converts hex decoding errors into MinerError
///
/// Used when a job header or share hash on the wire is not valid hex.
impl From<hex::FromHexError> for MinerError {
    fn from(e: hex::FromHexError) -> Self {
        MinerError::InputError(format!("Hex conversion failed: {}", e))
    }
}

/// Converts async task join errors into MinerError
///
/// Used when the coordination task panics or is cancelled.
impl From<tokio::task::JoinError> for MinerError {
    fn from(e: tokio::task::JoinError) -> Self {
        MinerError::TaskError(format!("Async task failed: {}", e))
    }
}
