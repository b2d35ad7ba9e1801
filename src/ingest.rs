//! Ingestion hook
//!
//! The write path for new measurements. A record is stored first; only a
//! successful write is announced to live subscribers, and announcing can
//! never fail or undo the write.

use std::sync::Arc;

use crate::broadcast::Broadcaster;
use crate::event::{NewTrafficRecord, TrafficRecord, TrafficUpdate};
use crate::store::{StoreError, TrafficStore};

/// Stores measurements and announces each one as it lands
#[derive(Clone)]
pub struct Ingestor {
    store: Arc<dyn TrafficStore>,
    broadcaster: Arc<Broadcaster>,
}

impl Ingestor {
    /// Create a new ingestor
    pub fn new(store: Arc<dyn TrafficStore>, broadcaster: Arc<Broadcaster>) -> Self {
        Self { store, broadcaster }
    }

    /// Get the backing store
    pub fn store(&self) -> &Arc<dyn TrafficStore> {
        &self.store
    }

    /// Record a measurement, then publish it
    ///
    /// The publish is issued before this returns, but delivery is not
    /// awaited. Only a store failure is reported to the caller.
    pub async fn record(&self, new: NewTrafficRecord) -> Result<TrafficRecord, StoreError> {
        let record = self.store.record(new).await?;

        tracing::debug!(
            traffic_id = record.traffic_id,
            sensor_id = record.sensor_id,
            "Traffic data recorded"
        );

        self.announce(&record);
        Ok(record)
    }

    /// Publish a single recorded measurement to live subscribers
    ///
    /// Returns the number of deliveries dispatched; failures are logged and
    /// reported as zero.
    pub fn announce(&self, record: &TrafficRecord) -> usize {
        match self.broadcaster.publish(&TrafficUpdate::Single(record.clone())) {
            Ok(subscribers) => subscribers,
            Err(e) => {
                tracing::error!(
                    traffic_id = record.traffic_id,
                    error = %e,
                    "Failed to broadcast traffic update"
                );
                0
            }
        }
    }
}

impl std::fmt::Debug for Ingestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ingestor")
            .field("broadcaster", &self.broadcaster)
            .finish()
    }
}
