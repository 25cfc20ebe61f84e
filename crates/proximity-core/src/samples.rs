//! Latest RSS per (transmitter, receiver) pair, plus the dirty set.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::warn;

use crate::types::{ReceiverId, Rss, RssObservation, TransmitterId};

/// Latest RSS reported by each receiver for one transmitter.
///
/// Ordered by receiver id so scans are deterministic.
pub type ReceiverRow = BTreeMap<ReceiverId, Rss>;

/// Transmitters whose samples changed since they were last evaluated.
pub type DirtySet = BTreeSet<TransmitterId>;

/// Most recent sample for every pair seen so far. Older values are
/// overwritten, never merged.
#[derive(Debug, Default)]
pub struct SampleTable {
    rows: HashMap<TransmitterId, ReceiverRow>,
}

impl SampleTable {
    pub fn new() -> Self {
        Self {
            rows: HashMap::new(),
        }
    }

    /// Store an observation, replacing any earlier value for the pair.
    ///
    /// Non-finite readings are dropped. Returns whether the value was stored.
    pub fn record(&mut self, obs: RssObservation) -> bool {
        if !obs.rss.is_finite() {
            warn!(txid = %obs.txid, rxid = %obs.rxid, rss = obs.rss, "Dropping non-finite sample");
            return false;
        }
        self.rows.entry(obs.txid).or_default().insert(obs.rxid, obs.rss);
        true
    }

    /// Store a batch of observations and return the transmitters they touched.
    pub fn record_batch<I>(&mut self, observations: I) -> DirtySet
    where
        I: IntoIterator<Item = RssObservation>,
    {
        let mut dirty = DirtySet::new();
        for obs in observations {
            if self.record(obs) {
                dirty.insert(obs.txid);
            }
        }
        dirty
    }

    /// All known samples for a transmitter.
    pub fn row(&self, txid: TransmitterId) -> Option<&ReceiverRow> {
        self.rows.get(&txid)
    }

    /// Latest sample for one pair.
    pub fn get(&self, txid: TransmitterId, rxid: ReceiverId) -> Option<Rss> {
        self.rows.get(&txid).and_then(|row| row.get(&rxid)).copied()
    }

    /// Number of transmitters with at least one sample.
    pub fn transmitter_count(&self) -> usize {
        self.rows.len()
    }
}
