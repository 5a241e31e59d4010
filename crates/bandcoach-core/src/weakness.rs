//! Active weakness registry.

use serde::{Deserialize, Serialize};

use crate::model::WeaknessRecord;

/// Ordered set of active weaknesses keyed by topic.
///
/// Insertion order is display order. Serialises as a plain JSON array;
/// duplicate topics in input keep their first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<WeaknessRecord>", into = "Vec<WeaknessRecord>")]
pub struct WeaknessRegistry {
    records: Vec<WeaknessRecord>,
}

impl WeaknessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert records whose topic is not yet active. Returns how many were added.
    pub fn ingest(&mut self, records: impl IntoIterator<Item = WeaknessRecord>) -> usize {
        let mut added = 0;
        for record in records {
            if self.contains(&record.topic) {
                tracing::debug!(topic = %record.topic, "weakness already active, ignoring");
                continue;
            }
            self.records.push(record);
            added += 1;
        }
        added
    }

    /// Drop every record and ingest `records` in their place.
    pub fn replace(&mut self, records: impl IntoIterator<Item = WeaknessRecord>) -> usize {
        self.records.clear();
        self.ingest(records)
    }

    /// Remove the record for `topic`. An absent topic counts as already resolved.
    pub fn remove_by_topic(&mut self, topic: &str) -> bool {
        let before = self.records.len();
        self.records.retain(|r| r.topic != topic);
        self.records.len() != before
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.records.iter().any(|r| r.topic == topic)
    }

    pub fn list_active(&self) -> &[WeaknessRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl From<Vec<WeaknessRecord>> for WeaknessRegistry {
    fn from(records: Vec<WeaknessRecord>) -> Self {
        let mut registry = WeaknessRegistry::new();
        registry.ingest(records);
        registry
    }
}

impl From<WeaknessRegistry> for Vec<WeaknessRecord> {
    fn from(registry: WeaknessRegistry) -> Self {
        registry.records
    }
}
