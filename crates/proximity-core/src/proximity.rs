//! Per-transmitter proximity state machine.
//!
//! Each transmitter is either out of proximity or in proximity of exactly
//! one receiver. A pass over the transmitter's latest samples moves it
//! between those states:
//!
//! 1. The current receiver's fresh sample is checked first. Above the
//!    threshold it only refreshes `best_rss`; at or below, the transmitter
//!    drops out of proximity and `best_rss` takes the measured value.
//! 2. Every receiver is then scanned in ascending id order. A sample above
//!    the threshold that beats `best_rss` takes over as closest; a sample
//!    below the threshold that beats `best_rss` is kept for diagnostics.
//!
//! Both steps work on the record's live `best_rss`, so a transmitter that
//! drops out of one receiver is picked up by a stronger one in the same
//! pass. Strict comparisons mean the lowest receiver id wins exact ties and
//! the current receiver is never displaced by an equal reading.

use std::collections::HashMap;

use tracing::debug;

use crate::samples::ReceiverRow;
use crate::types::{ProximityRecord, ReceiverId, Rss, TransmitterId};

/// Outcome of evaluating one transmitter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    /// Record after the pass.
    pub record: ProximityRecord,
    /// Closest receiver before the pass (`None` for a new record).
    pub previous: Option<ReceiverId>,
    /// Whether this pass should be reported.
    pub changed: bool,
}

/// Proximity records for every transmitter that has been evaluated.
#[derive(Debug)]
pub struct ProximityTable {
    threshold: Rss,
    records: HashMap<TransmitterId, ProximityRecord>,
}

impl ProximityTable {
    /// Create an empty table. Samples strictly above `threshold` count as
    /// "in proximity".
    pub fn new(threshold: Rss) -> Self {
        Self {
            threshold,
            records: HashMap::new(),
        }
    }

    pub fn threshold(&self) -> Rss {
        self.threshold
    }

    /// Current record for a transmitter.
    pub fn get(&self, txid: TransmitterId) -> Option<&ProximityRecord> {
        self.records.get(&txid)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Re-evaluate a transmitter against its latest samples.
    ///
    /// The record is created on first use; its first evaluation is always
    /// reported. Afterwards a pass is reported only when the closest
    /// receiver changes.
    pub fn evaluate(&mut self, txid: TransmitterId, row: &ReceiverRow) -> Evaluation {
        let threshold = self.threshold;
        let mut created = false;
        let record = self.records.entry(txid).or_insert_with(|| {
            created = true;
            ProximityRecord::initial()
        });

        let previous = record.closest_receiver;
        step(txid, record, row, threshold);

        Evaluation {
            record: *record,
            previous,
            changed: created || record.closest_receiver != previous,
        }
    }
}

fn step(txid: TransmitterId, record: &mut ProximityRecord, row: &ReceiverRow, threshold: Rss) {
    if let Some(current) = record.closest_receiver {
        if let Some(&rss) = row.get(&current).filter(|rss| rss.is_finite()) {
            if rss > threshold {
                debug!(%txid, rxid = %current, rss, "Updating cur closest");
            } else {
                debug!(%txid, rxid = %current, rss, "Updating out of proximity");
                record.closest_receiver = None;
            }
            record.best_rss = rss;
        }
    }

    for (&rxid, &rss) in row {
        if !rss.is_finite() || rss <= record.best_rss {
            continue;
        }
        if rss > threshold {
            debug!(%txid, %rxid, rss, "Updating new cur closest");
            record.closest_receiver = Some(rxid);
        }
        record.best_rss = rss;
    }
}
