//! Fan-out statistics

pub mod metrics;

pub use metrics::{BroadcastStats, StatsSnapshot};
