//! Error types for the rqlite client.
//!
//! This module provides a unified error type [`RqliteError`] for all client
//! operations, along with a convenient [`Result`] type alias.
//!
//! # Error Categories
//!
//! - **Cluster**: no known peers, every peer unreachable, or a status reply
//!   that names a leader the member map does not contain
//! - **Configuration**: malformed connection strings or option values
//! - **Network**: per-peer transport failures; the dispatcher swallows these
//!   while it still has peers left to try
//! - **Serialization**: request encoding and response decoding failures
//!
//! Errors reported by the database for a single statement are *not* errors
//! of this type. They are carried in the `error` field of each entry in a
//! successful [`QueryResponse`](crate::types::QueryResponse) or
//! [`ExecuteResponse`](crate::types::ExecuteResponse).
//!
//! # Example
//!
//! ```rust
//! use rqlite_client::error::{Result, RqliteError};
//!
//! fn handle_error(err: &RqliteError) {
//!     if err.is_retryable() {
//!         println!("Retrying operation...");
//!     } else {
//!         println!("Fatal error: {}", err);
//!     }
//! }
//!
//! handle_error(&RqliteError::PeersUnavailable);
//! ```

use thiserror::Error;

/// Main error type for rqlite client operations.
#[derive(Error, Debug)]
pub enum RqliteError {
    // Cluster errors
    #[error("no peers on cluster")]
    NoPeers,

    #[error("no peers available")]
    PeersUnavailable,

    #[error("could not find the cluster leader")]
    LeaderNotFound,

    // Configuration errors
    #[error("Invalid connection string: {0}")]
    InvalidDsn(String),

    #[error("Invalid configuration: {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    // Network errors
    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected status code {status}: {body}")]
    HttpStatus { status: u16, body: String },

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RqliteError {
    /// Check if the failed call may succeed when issued again.
    pub fn is_retryable(&self) -> bool {
        match self {
            RqliteError::PeersUnavailable | RqliteError::Network(_) => true,
            RqliteError::HttpStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Whether this error came from configuration parsing rather than the cluster.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            RqliteError::InvalidDsn(_) | RqliteError::InvalidConfig { .. } | RqliteError::Config(_)
        )
    }
}

impl From<serde_json::Error> for RqliteError {
    fn from(e: serde_json::Error) -> Self {
        RqliteError::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for RqliteError {
    fn from(e: reqwest::Error) -> Self {
        RqliteError::Network(e.to_string())
    }
}

/// Result type alias for rqlite client operations.
pub type Result<T> = std::result::Result<T, RqliteError>;
