//! Live subscriber registry
//!
//! The registry holds the canonical set of connected subscribers. The
//! transport adds a handle when a connection opens and removes it when the
//! connection closes; the broadcaster removes it after a failed delivery.
//!
//! # Architecture
//!
//! ```text
//!                     Arc<SubscriberRegistry>
//!                 ┌─────────────────────────────┐
//!                 │ subscribers: RwLock<HashMap< │
//!                 │   SubscriberId,              │
//!                 │   SubscriberHandle {         │
//!                 │     sink: dyn SubscriberSink │
//!                 │   }                          │
//!                 │ >>                           │
//!                 └──────────────┬──────────────┘
//!                                │
//!        ┌───────────────────────┼───────────────────────┐
//!        │                       │                       │
//!        ▼                       ▼                       ▼
//!   [Connection]           [Broadcaster]            [Connection]
//!   register() on open     snapshot() + evict       unregister() on close
//! ```

pub mod handle;
pub mod store;

pub use handle::{ChannelSink, SubscriberHandle, SubscriberId, SubscriberSink};
pub use store::SubscriberRegistry;
