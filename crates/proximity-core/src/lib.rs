//! Proximity resolution engine.
//!
//! Infers which fixed receiver each wireless transmitter is closest to from
//! streaming signal-strength samples.
//!
//! # Architecture
//!
//! - **Registry**: transmitter id → entity name, fed by sensor announcements
//! - **Samples**: latest RSS per (transmitter, receiver) pair and the dirty set
//! - **Proximity**: per-transmitter state machine with threshold hysteresis
//! - **Engine**: the three tables behind one lock, exposed as atomic operations
//! - **Emitter**: changed decisions → one batch of `proximity` solutions per cycle
//!
//! # Example
//!
//! ```
//! use proximity_core::{ProximityEngine, ReceiverId, RssObservation, SolutionBatch, TransmitterId};
//!
//! # tokio_test::block_on(async {
//! let engine = ProximityEngine::new(-70.0);
//! engine.register_name(TransmitterId(5), "lab.mug").await;
//!
//! let rx = ReceiverId::new(2).unwrap();
//! let events = engine.process(vec![RssObservation::new(TransmitterId(5), rx, -60.0)], 0).await;
//! let batch = SolutionBatch::from_events(&events).unwrap();
//! assert_eq!(batch.len(), 1);
//! # });
//! ```

pub mod emitter;
pub mod engine;
pub mod error;
pub mod payload;
pub mod proximity;
pub mod registry;
pub mod samples;
pub mod types;

pub use emitter::{ProximitySolution, SolutionBatch, PROXIMITY_ATTRIBUTE};
pub use engine::{EngineStats, ProximityEngine};
pub use error::{Error, Result};
pub use proximity::{Evaluation, ProximityTable};
pub use registry::NameRegistry;
pub use samples::{DirtySet, ReceiverRow, SampleTable};
pub use types::{
    now_millis, EntityName, ProximityEvent, ProximityRecord, ReceiverId, Rss, RssObservation, TransmitterId,
    RSS_FLOOR,
};
