//! Lock-guarded engine state shared by the identity and evaluation loops.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::payload;
use crate::proximity::ProximityTable;
use crate::registry::NameRegistry;
use crate::samples::{DirtySet, SampleTable};
use crate::types::{EntityName, ProximityEvent, ProximityRecord, Rss, RssObservation, TransmitterId};

struct EngineState {
    names: NameRegistry,
    samples: SampleTable,
    proximity: ProximityTable,
}

/// Counts for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineStats {
    pub named_transmitters: usize,
    pub sampled_transmitters: usize,
    pub tracked_transmitters: usize,
}

/// Proximity resolution engine.
///
/// All three tables live behind one mutex. Callers only get atomic
/// operations (register a name, record samples, evaluate a transmitter),
/// never the maps themselves. Cloning shares the same state.
#[derive(Clone)]
pub struct ProximityEngine {
    state: Arc<Mutex<EngineState>>,
}

impl ProximityEngine {
    /// Create an engine that treats RSS strictly above `threshold` as close.
    pub fn new(threshold: Rss) -> Self {
        Self {
            state: Arc::new(Mutex::new(EngineState {
                names: NameRegistry::new(),
                samples: SampleTable::new(),
                proximity: ProximityTable::new(threshold),
            })),
        }
    }

    /// Map a transmitter to the entity it is attached to.
    pub async fn register_name(&self, txid: TransmitterId, name: impl Into<EntityName>) {
        let name = name.into();
        info!("Mapping {} to {}", txid, name);
        let mut state = self.state.lock().await;
        if let Some(old) = state.names.insert(txid, name) {
            debug!(%txid, old = %old, "Replaced transmitter name");
        }
    }

    /// Decode a sensor attribute payload and register the transmitter it names.
    ///
    /// Malformed payloads are logged and rejected without touching state.
    pub async fn register_sensor(&self, name: &str, data: &[u8]) -> Result<TransmitterId> {
        let txid = payload::decode_transmitter(data).map_err(|e| {
            warn!(uri = %name, payload = %hex::encode(data), "Ignoring sensor attribute: {}", e);
            e
        })?;
        self.register_name(txid, name).await;
        Ok(txid)
    }

    /// Record a batch of samples and return the transmitters to re-evaluate.
    pub async fn ingest<I>(&self, observations: I) -> DirtySet
    where
        I: IntoIterator<Item = RssObservation>,
    {
        let mut state = self.state.lock().await;
        state.samples.record_batch(observations)
    }

    /// Evaluate one transmitter as a single critical section.
    ///
    /// Returns an event only when the decision changed and the transmitter's
    /// name is known; decisions for unnamed transmitters still update the
    /// record but are dropped.
    pub async fn evaluate(&self, txid: TransmitterId, timestamp_ms: u64) -> Option<ProximityEvent> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let row = state.samples.row(txid)?;
        let eval = state.proximity.evaluate(txid, row);
        if !eval.changed {
            return None;
        }

        let Some(name) = state.names.get(txid) else {
            debug!(%txid, "Dropping proximity change for unresolved transmitter");
            return None;
        };

        match eval.record.closest_receiver {
            Some(rxid) => info!("{} is in close proximity to {}.", name, rxid),
            None => info!(
                "{} is not in proximity of any receiver (best rss: {}).",
                name, eval.record.best_rss
            ),
        }

        Some(ProximityEvent {
            txid,
            name: name.to_string(),
            closest_receiver: eval.record.closest_receiver,
            best_rss: eval.record.best_rss,
            timestamp_ms,
        })
    }

    /// Evaluate every dirty transmitter, locking once per transmitter.
    pub async fn evaluate_dirty(&self, dirty: DirtySet, timestamp_ms: u64) -> Vec<ProximityEvent> {
        let mut events = Vec::new();
        for txid in dirty {
            if let Some(event) = self.evaluate(txid, timestamp_ms).await {
                events.push(event);
            }
        }
        events
    }

    /// One processing cycle: record samples, then evaluate what they touched.
    pub async fn process<I>(&self, observations: I, timestamp_ms: u64) -> Vec<ProximityEvent>
    where
        I: IntoIterator<Item = RssObservation>,
    {
        let dirty = self.ingest(observations).await;
        self.evaluate_dirty(dirty, timestamp_ms).await
    }

    /// Current proximity record of a transmitter.
    pub async fn record(&self, txid: TransmitterId) -> Option<ProximityRecord> {
        self.state.lock().await.proximity.get(txid).copied()
    }

    /// Name a transmitter resolves to.
    pub async fn name_of(&self, txid: TransmitterId) -> Option<EntityName> {
        self.state.lock().await.names.get(txid).map(str::to_string)
    }

    pub async fn threshold(&self) -> Rss {
        self.state.lock().await.proximity.threshold()
    }

    pub async fn stats(&self) -> EngineStats {
        let state = self.state.lock().await;
        EngineStats {
            named_transmitters: state.names.len(),
            sampled_transmitters: state.samples.transmitter_count(),
            tracked_transmitters: state.proximity.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ReceiverId;

    fn obs(tx: u128, rx: u128, rss: Rss) -> RssObservation {
        RssObservation::new(TransmitterId(tx), ReceiverId::new(rx).unwrap(), rss)
    }

    #[tokio::test]
    async fn named_transmitter_emits_on_first_crossing() {
        let engine = ProximityEngine::new(-70.0);
        engine.register_name(TransmitterId(5), "lab.mug").await;

        let events = engine.process(vec![obs(5, 2, -60.0)], 1_000).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, "lab.mug");
        assert_eq!(events[0].closest_receiver, ReceiverId::new(2).ok());
        assert_eq!(events[0].timestamp_ms, 1_000);
    }

    #[tokio::test]
    async fn unresolved_transmitter_updates_record_but_emits_nothing() {
        let engine = ProximityEngine::new(-70.0);

        let events = engine.process(vec![obs(5, 2, -60.0)], 1_000).await;
        assert!(events.is_empty());

        let record = engine.record(TransmitterId(5)).await.unwrap();
        assert_eq!(record.closest_receiver, ReceiverId::new(2).ok());

        // Naming it later does not replay the lost decision.
        engine.register_name(TransmitterId(5), "lab.mug").await;
        let events = engine.process(vec![obs(5, 2, -58.0)], 2_000).await;
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn samples_coalesce_into_one_evaluation() {
        let engine = ProximityEngine::new(-70.0);
        engine.register_name(TransmitterId(5), "lab.mug").await;

        let events = engine
            .process(vec![obs(5, 2, -60.0), obs(5, 3, -55.0), obs(5, 2, -50.0)], 1_000)
            .await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].closest_receiver, ReceiverId::new(2).ok());
        assert_eq!(events[0].best_rss, -50.0);
    }

    #[tokio::test]
    async fn non_finite_sample_does_not_hand_over_to_weaker_receiver() {
        let engine = ProximityEngine::new(-70.0);
        engine.register_name(TransmitterId(5), "lab.mug").await;

        let events = engine.process(vec![obs(5, 2, -50.0), obs(5, 4, -60.0)], 1_000).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].closest_receiver, ReceiverId::new(2).ok());

        let events = engine.process(vec![obs(5, 3, f64::NAN)], 2_000).await;
        assert!(events.is_empty());

        // Later cycles see no trace of the dropped reading either.
        let events = engine.process(vec![obs(5, 4, -61.0)], 3_000).await;
        assert!(events.is_empty());

        let record = engine.record(TransmitterId(5)).await.unwrap();
        assert_eq!(record.closest_receiver, ReceiverId::new(2).ok());
        assert_eq!(record.best_rss, -50.0);
    }

    #[tokio::test]
    async fn register_sensor_decodes_payload() {
        let engine = ProximityEngine::new(-70.0);
        let data = payload::encode_id(1, 77);

        let txid = engine.register_sensor("lab.chair", &data).await.unwrap();
        assert_eq!(txid, TransmitterId(77));
        assert_eq!(engine.name_of(txid).await.as_deref(), Some("lab.chair"));
    }

    #[tokio::test]
    async fn register_sensor_rejects_short_payload() {
        let engine = ProximityEngine::new(-70.0);
        assert!(engine.register_sensor("lab.chair", &[0, 1, 2]).await.is_err());
        assert_eq!(engine.stats().await.named_transmitters, 0);
    }

    #[tokio::test]
    async fn evaluating_unknown_transmitter_is_a_no_op() {
        let engine = ProximityEngine::new(-70.0);
        assert!(engine.evaluate(TransmitterId(1), 0).await.is_none());
        assert_eq!(engine.stats().await, EngineStats::default());
    }

    #[tokio::test]
    async fn clones_share_state() {
        let engine = ProximityEngine::new(-70.0);
        let resolver = engine.clone();
        resolver.register_name(TransmitterId(1), "lab.cart").await;

        engine.ingest(vec![obs(1, 4, -40.0)]).await;
        let stats = engine.stats().await;
        assert_eq!(stats.named_transmitters, 1);
        assert_eq!(stats.sampled_transmitters, 1);
        assert_eq!(stats.tracked_transmitters, 0);
        assert_eq!(engine.threshold().await, -70.0);
    }
}
