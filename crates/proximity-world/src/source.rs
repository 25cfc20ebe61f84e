//! Signal-strength feeds.
//!
//! The evaluation loop only sees [`SampleSource`]; it does not know whether
//! samples come from the world model's link medians or straight from the
//! packet aggregator.

use async_trait::async_trait;
use proximity_core::payload;
use proximity_core::{ReceiverId, RssObservation, TransmitterId};
use tokio::sync::mpsc;
use tracing::warn;

use crate::error::{Error, Result};
use crate::stream::{AttributeStream, StreamBatch};
use crate::wire::{AggregatorSample, QueryResults};

/// Result of polling a sample source once.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleBatch {
    /// New observations, in arrival order.
    Samples(Vec<RssObservation>),
    /// Nothing ready yet.
    Pending,
    /// The feed finished.
    Completed,
}

/// A feed of (transmitter, receiver, rss) observations.
#[async_trait]
pub trait SampleSource: Send {
    async fn next_samples(&mut self) -> Result<SampleBatch>;
}

/// Samples decoded from `link median` attributes.
///
/// Entity names encode the pair as `<root>.<txid>.<rxid>` and the first
/// attribute carries a big-endian double.
pub struct LinkMedianSource<S> {
    stream: S,
}

impl<S: AttributeStream> LinkMedianSource<S> {
    pub fn new(stream: S) -> Self {
        Self { stream }
    }
}

/// Decode link median results, skipping malformed entries.
pub fn decode_link_medians(results: &QueryResults) -> Vec<RssObservation> {
    let mut observations = Vec::with_capacity(results.len());
    for (uri, attributes) in results {
        let (txid, rxid) = match payload::parse_link_key(uri) {
            Ok(pair) => pair,
            Err(e) => {
                warn!(%uri, "Ignoring link: {}", e);
                continue;
            }
        };
        let Some(attr) = attributes.first() else {
            warn!(%uri, "Ignoring link without attributes");
            continue;
        };
        match payload::decode_rss(&attr.data) {
            Ok(rss) => observations.push(RssObservation::new(txid, rxid, rss)),
            Err(e) => warn!(%uri, payload = %hex::encode(&attr.data), "Ignoring link median: {}", e),
        }
    }
    observations
}

#[async_trait]
impl<S: AttributeStream> SampleSource for LinkMedianSource<S> {
    async fn next_samples(&mut self) -> Result<SampleBatch> {
        match self.stream.next_batch().await? {
            StreamBatch::Data(results) => Ok(SampleBatch::Samples(decode_link_medians(&results))),
            StreamBatch::Pending => Ok(SampleBatch::Pending),
            StreamBatch::Completed => Ok(SampleBatch::Completed),
        }
    }
}

/// Samples forwarded packet by packet from the aggregator.
///
/// Each poll drains whatever has arrived (up to `max_batch`) into one batch.
pub struct AggregatorSource {
    rx: mpsc::Receiver<AggregatorSample>,
    max_batch: usize,
}

impl AggregatorSource {
    /// Default cap on samples folded into one cycle.
    pub const DEFAULT_MAX_BATCH: usize = 4096;

    pub fn new(rx: mpsc::Receiver<AggregatorSample>) -> Self {
        Self {
            rx,
            max_batch: Self::DEFAULT_MAX_BATCH,
        }
    }

    /// Set the cap on samples folded into one cycle.
    #[must_use]
    pub fn with_max_batch(mut self, max_batch: usize) -> Self {
        self.max_batch = max_batch.max(1);
        self
    }
}

fn observation(sample: &AggregatorSample) -> Option<RssObservation> {
    match ReceiverId::new(sample.receiver_id) {
        Ok(rxid) => Some(RssObservation::new(TransmitterId(sample.device_id), rxid, sample.rssi)),
        Err(e) => {
            warn!(txid = sample.device_id, "Ignoring aggregator sample: {}", e);
            None
        }
    }
}

#[async_trait]
impl SampleSource for AggregatorSource {
    async fn next_samples(&mut self) -> Result<SampleBatch> {
        let mut observations = Vec::new();
        let mut received = 0;
        while received < self.max_batch {
            match self.rx.try_recv() {
                Ok(sample) => {
                    received += 1;
                    observations.extend(observation(&sample));
                }
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    if received == 0 {
                        return Err(Error::Disconnected("aggregator feed closed".into()));
                    }
                    break;
                }
            }
        }

        if received == 0 {
            Ok(SampleBatch::Pending)
        } else {
            Ok(SampleBatch::Samples(observations))
        }
    }
}
