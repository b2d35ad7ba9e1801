//! Real-time traffic update fan-out
//!
//! Pushes traffic measurements to every connected subscriber as they are
//! recorded, and periodically republishes the most recent measurements.
//!
//! # Architecture
//!
//! ```text
//!   POST /record ──► Ingestor ──► TrafficStore
//!                       │
//!                       │ Single
//!                       ▼
//!   Poller (every N s) ──Batch──► Broadcaster ──► SubscriberRegistry
//!        │                            │                 ▲
//!        └── store.fetch_recent()     │                 │ register /
//!                                     ▼                 │ unregister
//!                         one task per subscriber   /ws/traffic
//!                         timeout(sink.send)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use traffic_fanout::{MemoryStore, ServerConfig, TrafficServer};
//!
//! # async fn run() -> traffic_fanout::Result<()> {
//! let config = ServerConfig::from_env()?;
//! let server = TrafficServer::new(config, Arc::new(MemoryStore::new()));
//! server.run().await
//! # }
//! ```

pub mod broadcast;
pub mod error;
pub mod event;
pub mod ingest;
pub mod poller;
pub mod registry;
pub mod server;
pub mod stats;
pub mod store;

#[cfg(test)]
mod testing;

pub use broadcast::{BroadcastConfig, Broadcaster};
pub use error::{DeliveryError, Error, Result};
pub use event::{CongestionLevel, NewTrafficRecord, TrafficRecord, TrafficUpdate};
pub use ingest::Ingestor;
pub use poller::{PollOutcome, Poller, PollerConfig, PollerState};
pub use registry::{ChannelSink, SubscriberHandle, SubscriberId, SubscriberRegistry, SubscriberSink};
pub use server::{ServerConfig, TrafficServer};
pub use stats::{BroadcastStats, StatsSnapshot};
pub use store::{MemoryStore, StoreError, TrafficStore};
