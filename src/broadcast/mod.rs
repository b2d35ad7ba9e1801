//! Fan-out of traffic updates to live subscribers
//!
//! # Serialize once, deliver many
//!
//! ```text
//!   publish(&update)
//!         │
//!         ├──→ serde_json::to_vec ──→ Bytes (one allocation)
//!         │
//!         ├──→ registry.snapshot()
//!         │
//!         └──→ tokio::spawn per subscriber
//!                   │
//!                   ├── timeout(sink.send(bytes.clone()))
//!                   │
//!                   └── on error: registry.unregister(handle)
//! ```
//!
//! Deliveries are detached: `publish` never waits for them, and a slow or
//! broken subscriber cannot delay anyone else. There is no retry and no
//! ordering guarantee between racing `publish` calls.

pub mod broadcaster;
pub mod config;

pub use broadcaster::Broadcaster;
pub use config::BroadcastConfig;
