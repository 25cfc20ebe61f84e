//! World model and aggregator feeds for the proximity solver.
//!
//! # Overview
//!
//! - [`AttributeStream`]: a streaming world model query, polled batch by batch
//! - [`SampleSource`]: signal-strength observations, from either
//!   [`LinkMedianSource`] (world model `link median` attributes) or
//!   [`AggregatorSource`] (raw packets from the aggregator)
//! - [`SolutionSink`]: where each cycle's proximity batch goes
//!
//! The TCP implementations speak newline-delimited JSON (see [`wire`]);
//! the channel and memory implementations back the tests.

pub mod aggregator;
pub mod client;
pub mod error;
pub mod publisher;
pub mod sink;
pub mod source;
pub mod stream;
pub mod wire;

pub use client::WorldModelClient;
pub use error::{Error, Result};
pub use publisher::SolutionPublisher;
pub use sink::{MemorySink, SolutionSink};
pub use source::{decode_link_medians, AggregatorSource, LinkMedianSource, SampleBatch, SampleSource};
pub use stream::{AttributeStream, ChannelAttributeStream, StreamBatch, StreamEvent};
pub use wire::{AggregatorSample, QueryResults, SubscriptionRule, WireAttribute, WireSolution};
