//! Fan-out broadcaster implementation

use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use tokio::sync::Semaphore;

use super::config::BroadcastConfig;
use crate::error::{DeliveryError, Result};
use crate::registry::{SubscriberHandle, SubscriberRegistry};
use crate::stats::BroadcastStats;

/// Pushes payloads to every live subscriber
///
/// `publish` serializes once, snapshots the registry and spawns one detached
/// delivery task per subscriber. It returns as soon as the tasks are spawned.
/// A subscriber whose delivery fails or exceeds the delivery timeout is
/// removed from the registry; nobody else is affected.
///
/// Must be used from within a Tokio runtime.
pub struct Broadcaster {
    registry: Arc<SubscriberRegistry>,
    config: BroadcastConfig,
    stats: Arc<BroadcastStats>,
    delivery_limit: Option<Arc<Semaphore>>,
}

impl Broadcaster {
    /// Create a broadcaster with default configuration
    pub fn new(registry: Arc<SubscriberRegistry>) -> Self {
        Self::with_config(registry, BroadcastConfig::default())
    }

    /// Create a broadcaster with custom configuration
    pub fn with_config(registry: Arc<SubscriberRegistry>, config: BroadcastConfig) -> Self {
        let delivery_limit = if config.max_concurrent_deliveries > 0 {
            Some(Arc::new(Semaphore::new(config.max_concurrent_deliveries)))
        } else {
            None
        };

        Self {
            registry,
            config,
            stats: Arc::new(BroadcastStats::new()),
            delivery_limit,
        }
    }

    /// Get a reference to the subscriber registry
    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    /// Get the broadcaster configuration
    pub fn config(&self) -> &BroadcastConfig {
        &self.config
    }

    /// Get the shared counters
    pub fn stats(&self) -> &Arc<BroadcastStats> {
        &self.stats
    }

    /// Serialize `payload` once and deliver it to every live subscriber
    ///
    /// Returns the number of deliveries dispatched. A serialization failure
    /// is returned before anything is dispatched.
    pub fn publish<T>(&self, payload: &T) -> Result<usize>
    where
        T: Serialize + ?Sized,
    {
        self.stats.record_publish();

        let encoded = match serde_json::to_vec(payload) {
            Ok(encoded) => Bytes::from(encoded),
            Err(e) => {
                self.stats.record_serialization_failure();
                return Err(e.into());
            }
        };
        self.stats.record_serialized();

        Ok(self.publish_bytes(encoded))
    }

    /// Deliver already-serialized bytes to every live subscriber
    ///
    /// All deliveries share the same allocation; `Bytes` clones are reference
    /// counted.
    pub fn publish_bytes(&self, payload: Bytes) -> usize {
        let subscribers = self.registry.snapshot();
        if subscribers.is_empty() {
            tracing::trace!("No subscribers, skipping dispatch");
            return 0;
        }

        let count = subscribers.len();
        self.stats.record_dispatched(count);

        for handle in subscribers {
            self.dispatch(handle, payload.clone());
        }

        tracing::trace!(subscribers = count, bytes = payload.len(), "Payload dispatched");
        count
    }

    fn dispatch(&self, handle: SubscriberHandle, payload: Bytes) {
        let registry = Arc::clone(&self.registry);
        let stats = Arc::clone(&self.stats);
        let limit = self.delivery_limit.clone();
        let timeout = self.config.delivery_timeout;

        tokio::spawn(async move {
            let _permit = match limit {
                Some(sem) => match sem.acquire_owned().await {
                    Ok(permit) => Some(permit),
                    Err(_) => return,
                },
                None => None,
            };

            let result = match tokio::time::timeout(timeout, handle.send(payload)).await {
                Ok(result) => result,
                Err(_) => Err(DeliveryError::TimedOut(timeout)),
            };

            match result {
                Ok(()) => stats.record_delivered(),
                Err(e) => {
                    let evicted = registry.unregister(&handle);
                    stats.record_delivery_failure(evicted);

                    if evicted {
                        tracing::warn!(
                            subscriber = %handle.id(),
                            error = %e,
                            "Delivery failed, subscriber evicted"
                        );
                    } else {
                        tracing::debug!(
                            subscriber = %handle.id(),
                            error = %e,
                            "Delivery failed for subscriber already removed"
                        );
                    }
                }
            }
        });
    }
}

impl std::fmt::Debug for Broadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcaster")
            .field("subscribers", &self.registry.len())
            .field("config", &self.config)
            .finish()
    }
}
