//! Error types for bridge operations
//!
//! This module defines the error taxonomy shared by the cache, the session
//! and the call orchestrator. None of these errors are retried by this crate.

use thiserror::Error;

/// Main error type for bridge operations
#[derive(Error, Debug)]
pub enum BridgeError {
    /// A required setting is missing or malformed. Fatal, surfaced before any
    /// connection attempt.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The transport could not be established or was lost
    #[error("Connection error: {0}")]
    Connection(String),

    /// The remote side rejected an otherwise well-formed call
    #[error("Remote error from {operation}: {message}")]
    Remote { operation: String, message: String },

    /// Operation timeout
    #[error("Operation timed out after {timeout_seconds}s: {context}")]
    Timeout {
        timeout_seconds: u64,
        context: String,
    },

    /// The session was shut down and will not reconnect on its own
    #[error("Session is closed")]
    SessionClosed,

    /// The peer sent something that does not follow the wire protocol
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Serialization/Deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// An invalidation pattern failed to compile
    #[error("Invalid invalidation pattern: {0}")]
    InvalidPattern(String),

    /// The operation is not present in the catalog
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    /// Generic error with context
    #[error("Error: {0}")]
    Other(String),
}

impl BridgeError {
    /// Build a remote error for the given operation
    pub fn remote(operation: impl Into<String>, message: impl Into<String>) -> Self {
        BridgeError::Remote {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Whether this error came from configuration rather than the wire
    pub fn is_configuration(&self) -> bool {
        matches!(self, BridgeError::Configuration(_))
    }
}

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

impl From<serde_json::Error> for BridgeError {
    fn from(e: serde_json::Error) -> Self {
        BridgeError::Serialization(e.to_string())
    }
}

impl From<regex::Error> for BridgeError {
    fn from(e: regex::Error) -> Self {
        BridgeError::InvalidPattern(e.to_string())
    }
}

impl From<String> for BridgeError {
    fn from(s: String) -> Self {
        BridgeError::Other(s)
    }
}

impl From<&str> for BridgeError {
    fn from(s: &str) -> Self {
        BridgeError::Other(s.to_string())
    }
}
