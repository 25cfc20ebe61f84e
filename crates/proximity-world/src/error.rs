//! Error types for world model and aggregator feeds.

use thiserror::Error;

/// Result type for proximity-world operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur talking to the world model or the aggregator.
#[derive(Debug, Error)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Payload decode error
    #[error("Payload error: {0}")]
    Core(#[from] proximity_core::Error),

    /// The remote side went away
    #[error("Disconnected: {0}")]
    Disconnected(String),

    /// Unexpected message
    #[error("Protocol error: {0}")]
    Protocol(String),
}
