//! Periodic republishing of recent traffic data
//!
//! ```text
//!   Stopped ──start()──► Running ──stop()──► Stopped
//!                           │
//!                     every interval
//!                           │
//!                           ▼
//!              store.fetch_recent(limit)
//!                 │         │         │
//!               error     empty    records
//!                 │         │         │
//!                log     nothing   broadcaster.publish(Batch)
//! ```

pub mod config;
pub mod task;

pub use config::PollerConfig;
pub use task::{poll_once, PollOutcome, Poller, PollerState};
