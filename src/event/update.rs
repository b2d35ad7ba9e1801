//! Broadcast payloads
//!
//! Both producers (ingestion and polling) publish a `TrafficUpdate`, so every
//! frame a subscriber receives carries an explicit `kind` tag:
//!
//! ```text
//! {"kind":"single","data":{"traffic_id":7,...}}
//! {"kind":"batch","data":[{"traffic_id":9,...},{"traffic_id":8,...}]}
//! ```

use serde::{Deserialize, Serialize};

use super::record::TrafficRecord;

/// A payload pushed to live subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum TrafficUpdate {
    /// A measurement that was just recorded
    Single(TrafficRecord),
    /// The most recent measurements, newest first
    Batch(Vec<TrafficRecord>),
}

impl TrafficUpdate {
    /// Number of records carried by this update
    pub fn len(&self) -> usize {
        match self {
            TrafficUpdate::Single(_) => 1,
            TrafficUpdate::Batch(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wire tag of this update
    pub fn kind(&self) -> &'static str {
        match self {
            TrafficUpdate::Single(_) => "single",
            TrafficUpdate::Batch(_) => "batch",
        }
    }
}

impl From<TrafficRecord> for TrafficUpdate {
    fn from(record: TrafficRecord) -> Self {
        TrafficUpdate::Single(record)
    }
}

impl From<Vec<TrafficRecord>> for TrafficUpdate {
    fn from(records: Vec<TrafficRecord>) -> Self {
        TrafficUpdate::Batch(records)
    }
}
