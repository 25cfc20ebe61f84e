//! Turns proximity events into batched world-model solutions.

use crate::payload::{self, ID_PAYLOAD_LEN};
use crate::types::{EntityName, ProximityEvent};

/// Attribute name proximity solutions are published under.
pub const PROXIMITY_ATTRIBUTE: &str = "proximity";

/// One `proximity` attribute to attach to an existing entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProximitySolution {
    pub name: EntityName,
    pub data: [u8; ID_PAYLOAD_LEN],
    pub timestamp_ms: u64,
}

impl From<&ProximityEvent> for ProximitySolution {
    fn from(event: &ProximityEvent) -> Self {
        Self {
            name: event.name.clone(),
            data: payload::encode_proximity(event.closest_receiver),
            timestamp_ms: event.timestamp_ms,
        }
    }
}

/// All solutions from one evaluation cycle, pushed in a single call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolutionBatch {
    solutions: Vec<ProximitySolution>,
}

impl SolutionBatch {
    /// Build the batch for one cycle. Returns `None` when there is nothing
    /// to push.
    pub fn from_events(events: &[ProximityEvent]) -> Option<Self> {
        if events.is_empty() {
            return None;
        }
        Some(Self {
            solutions: events.iter().map(ProximitySolution::from).collect(),
        })
    }

    /// Pushes only attach attributes; they never create entities.
    pub const fn create_entities(&self) -> bool {
        false
    }

    pub fn solutions(&self) -> &[ProximitySolution] {
        &self.solutions
    }

    pub fn len(&self) -> usize {
        self.solutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solutions.is_empty()
    }
}

impl IntoIterator for SolutionBatch {
    type Item = ProximitySolution;
    type IntoIter = std::vec::IntoIter<ProximitySolution>;

    fn into_iter(self) -> Self::IntoIter {
        self.solutions.into_iter()
    }
}
