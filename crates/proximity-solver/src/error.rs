//! Error types for the solver service.

use thiserror::Error;

/// Result type for solver operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that stop the solver.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad command line or environment configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// World model or aggregator failure
    #[error("Feed error: {0}")]
    World(#[from] proximity_world::Error),

    /// A solver task panicked or was cancelled
    #[error("Task error: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
