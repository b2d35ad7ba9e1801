//! Broadcaster configuration

use std::time::Duration;

/// Broadcaster configuration options
#[derive(Debug, Clone)]
pub struct BroadcastConfig {
    /// Maximum time a single delivery may take before the subscriber is evicted
    pub delivery_timeout: Duration,

    /// Maximum deliveries in flight across all subscribers (0 = unlimited)
    pub max_concurrent_deliveries: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            delivery_timeout: Duration::from_secs(5),
            max_concurrent_deliveries: 0, // Unlimited
        }
    }
}

impl BroadcastConfig {
    /// Set the per-delivery timeout
    pub fn delivery_timeout(mut self, timeout: Duration) -> Self {
        self.delivery_timeout = timeout;
        self
    }

    /// Set the in-flight delivery limit
    pub fn max_concurrent_deliveries(mut self, max: usize) -> Self {
        self.max_concurrent_deliveries = max;
        self
    }
}
