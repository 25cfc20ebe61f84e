//! Transmitter id to entity name mapping.

use std::collections::HashMap;

use crate::types::{EntityName, TransmitterId};

/// Names learned from sensor announcements.
///
/// Grows monotonically; a later announcement for the same transmitter
/// overwrites the earlier name.
#[derive(Debug, Default)]
pub struct NameRegistry {
    names: HashMap<TransmitterId, EntityName>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self {
            names: HashMap::new(),
        }
    }

    /// Map a transmitter to a name. Returns the name it replaced, if any.
    pub fn insert(&mut self, txid: TransmitterId, name: EntityName) -> Option<EntityName> {
        self.names.insert(txid, name)
    }

    /// Look up the name of a transmitter.
    pub fn get(&self, txid: TransmitterId) -> Option<&str> {
        self.names.get(&txid).map(String::as_str)
    }

    pub fn contains(&self, txid: TransmitterId) -> bool {
        self.names.contains_key(&txid)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
