//! Identifier and record types shared by every stage of the engine.

use std::fmt;

use crate::error::{Error, Result};

/// Hierarchical entity name a transmitter is attached to.
pub type EntityName = String;

/// Received signal strength of one (transmitter, receiver) link.
pub type Rss = f64;

/// RSS floor a fresh [`ProximityRecord`] starts from.
///
/// Far below any plausible reading, so the first real sample always
/// replaces it.
pub const RSS_FLOOR: Rss = -200.0;

/// 128-bit transmitter identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransmitterId(pub u128);

impl TransmitterId {
    /// Raw identifier value.
    pub const fn get(self) -> u128 {
        self.0
    }
}

impl From<u128> for TransmitterId {
    fn from(id: u128) -> Self {
        Self(id)
    }
}

impl fmt::Display for TransmitterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 128-bit receiver identifier. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReceiverId(u128);

impl ReceiverId {
    /// Create a receiver id, rejecting the reserved value 0.
    pub fn new(id: u128) -> Result<Self> {
        if id == 0 {
            Err(Error::ReservedReceiver)
        } else {
            Ok(Self(id))
        }
    }

    /// Raw identifier value.
    pub const fn get(self) -> u128 {
        self.0
    }
}

impl TryFrom<u128> for ReceiverId {
    type Error = Error;

    fn try_from(id: u128) -> Result<Self> {
        Self::new(id)
    }
}

impl fmt::Display for ReceiverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One signal-strength observation for a (transmitter, receiver) pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RssObservation {
    pub txid: TransmitterId,
    pub rxid: ReceiverId,
    pub rss: Rss,
}

impl RssObservation {
    pub fn new(txid: TransmitterId, rxid: ReceiverId, rss: Rss) -> Self {
        Self { txid, rxid, rss }
    }
}

/// Current proximity decision for one transmitter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityRecord {
    /// Receiver the transmitter is currently closest to, if any.
    pub closest_receiver: Option<ReceiverId>,
    /// RSS of `closest_receiver`, or the best RSS seen while out of proximity.
    pub best_rss: Rss,
}

impl ProximityRecord {
    /// Out of proximity, at the RSS floor.
    pub const fn initial() -> Self {
        Self {
            closest_receiver: None,
            best_rss: RSS_FLOOR,
        }
    }

    pub fn in_proximity(&self) -> bool {
        self.closest_receiver.is_some()
    }
}

impl Default for ProximityRecord {
    fn default() -> Self {
        Self::initial()
    }
}

/// A changed proximity decision for a transmitter whose name is known.
#[derive(Debug, Clone, PartialEq)]
pub struct ProximityEvent {
    pub txid: TransmitterId,
    pub name: EntityName,
    pub closest_receiver: Option<ReceiverId>,
    pub best_rss: Rss,
    /// Evaluation time in milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
