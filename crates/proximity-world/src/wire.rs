//! Line-delimited JSON messages exchanged with the world model gateway and
//! the packet aggregator.
//!
//! Every message is one JSON object followed by `\n`. Binary attribute
//! payloads travel as lowercase hex strings.

use std::collections::BTreeMap;

use bytes::Bytes;
use proximity_core::{ProximitySolution, PROXIMITY_ATTRIBUTE};
use serde::{Deserialize, Serialize};

/// Attribute attached to a world model entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireAttribute {
    /// Attribute name, e.g. `sensor.pipsqueak` or `link median`
    pub name: String,
    /// Raw payload
    #[serde(with = "hex_bytes")]
    pub data: Bytes,
    /// Creation time in milliseconds since the Unix epoch
    #[serde(default)]
    pub creation: u64,
    /// Origin that produced the attribute
    #[serde(default)]
    pub origin: String,
}

impl WireAttribute {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>, creation: u64) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            creation,
            origin: String::new(),
        }
    }
}

/// Query results: entity name → matching attributes.
pub type QueryResults = BTreeMap<String, Vec<WireAttribute>>;

/// Client-port requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientRequest {
    /// Open a streaming query.
    StreamRequest {
        ticket: u32,
        uri: String,
        attributes: Vec<String>,
        interval_ms: u64,
    },
}

/// Client-port responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientResponse {
    /// A batch of results for a streaming query.
    Data { ticket: u32, results: QueryResults },
    /// The streaming query has finished.
    Complete { ticket: u32 },
}

/// One entity and the attributes pushed to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireSolution {
    pub uri: String,
    pub attributes: Vec<WireAttribute>,
}

impl WireSolution {
    /// Wrap a proximity solution as a `proximity` attribute from `origin`.
    pub fn from_proximity(solution: ProximitySolution, origin: &str) -> Self {
        Self {
            uri: solution.name,
            attributes: vec![WireAttribute {
                name: PROXIMITY_ATTRIBUTE.to_string(),
                data: Bytes::copy_from_slice(&solution.data),
                creation: solution.timestamp_ms,
                origin: origin.to_string(),
            }],
        }
    }
}

/// Solver-port messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SolverMessage {
    /// Sent once after connecting.
    Handshake {
        origin: String,
        solution_types: Vec<String>,
    },
    /// Attach attributes to entities.
    Push {
        create_uris: bool,
        data: Vec<WireSolution>,
    },
}

/// Aggregator subscription rule, sent as the first line on connect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRule {
    /// Physical layer filter; 0 matches any.
    pub phy: u8,
    /// Transmitter ids to forward; empty forwards all.
    pub txers: Vec<u128>,
    /// How often the aggregator forwards samples.
    pub update_interval_ms: u64,
}

impl SubscriptionRule {
    /// Every transmitter on every physical layer.
    pub fn all(update_interval_ms: u64) -> Self {
        Self {
            phy: 0,
            txers: Vec::new(),
            update_interval_ms,
        }
    }
}

/// One packet observation forwarded by the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatorSample {
    pub device_id: u128,
    pub receiver_id: u128,
    #[serde(default)]
    pub phy: u8,
    pub rssi: f64,
}

mod hex_bytes {
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map(Bytes::from).map_err(serde::de::Error::custom)
    }
}
