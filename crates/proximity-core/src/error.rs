//! Error types for the proximity engine.

use thiserror::Error;

/// Result type for proximity-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while decoding feed data.
#[derive(Debug, Error, PartialEq)]
pub enum Error {
    /// An identifier or value payload had the wrong number of bytes.
    #[error("invalid payload length: expected {expected} bytes, got {actual}")]
    PayloadLength { expected: usize, actual: usize },

    /// A link key did not have the `<root>.<txid>.<rxid>` shape.
    #[error("malformed link key: {0}")]
    MalformedLinkKey(String),

    /// Receiver id 0 is reserved for "no receiver".
    #[error("receiver id 0 is reserved")]
    ReservedReceiver,

    /// A signal-strength value was NaN or infinite.
    #[error("non-finite rss value: {0}")]
    NonFiniteRss(f64),
}
