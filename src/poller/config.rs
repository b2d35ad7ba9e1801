//! Poller configuration

use std::time::Duration;

/// Shortest tick interval the poller will run with
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Poller configuration options
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Time between ticks
    pub interval: Duration,

    /// Number of recent records fetched per tick
    pub fetch_limit: usize,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            fetch_limit: 20,
        }
    }
}

impl PollerConfig {
    /// Set the tick interval (clamped to at least 1ms)
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(MIN_INTERVAL);
        self
    }

    /// Set the number of records fetched per tick
    pub fn fetch_limit(mut self, limit: usize) -> Self {
        self.fetch_limit = limit;
        self
    }
}
