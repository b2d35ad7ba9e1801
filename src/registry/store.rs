//! Subscriber registry implementation
//!
//! The live set of subscribers. Connections add themselves on open and remove
//! themselves on close; the broadcaster removes any subscriber whose delivery
//! fails.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::handle::{SubscriberHandle, SubscriberId};

/// Concurrency-safe set of live subscribers
///
/// Thread-safe via `RwLock`. Snapshots take the read lock only long enough to
/// clone the handles, so dispatch never holds a lock while writing to peers.
#[derive(Debug, Default)]
pub struct SubscriberRegistry {
    /// Live subscribers keyed by id
    subscribers: RwLock<HashMap<SubscriberId, SubscriberHandle>>,
}

impl SubscriberRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber to the live set
    ///
    /// Registering a handle that is already present leaves the set unchanged.
    /// A handle that has been unregistered is retired and is not added again.
    /// Returns `true` if the handle was newly added.
    pub fn register(&self, handle: SubscriberHandle) -> bool {
        let mut subscribers = self.subscribers.write();

        if handle.is_retired() {
            tracing::warn!(subscriber = %handle.id(), "Refusing to register retired subscriber");
            return false;
        }

        let id = handle.id();
        let added = subscribers.insert(id, handle).is_none();

        tracing::debug!(
            subscriber = %id,
            subscribers = subscribers.len(),
            added,
            "Subscriber registered"
        );

        added
    }

    /// Remove a subscriber from the live set
    ///
    /// Safe to call any number of times and from any task; removing a handle
    /// that is absent is a no-op. The handle is retired either way. Returns
    /// `true` if this call removed it.
    pub fn unregister(&self, handle: &SubscriberHandle) -> bool {
        let mut subscribers = self.subscribers.write();
        handle.retire();

        let removed = subscribers.remove(&handle.id()).is_some();
        if removed {
            tracing::debug!(
                subscriber = %handle.id(),
                subscribers = subscribers.len(),
                "Subscriber unregistered"
            );
        }

        removed
    }

    /// Point-in-time copy of the live set
    ///
    /// The lock is released before this returns; iterating the result never
    /// blocks registration or removal.
    pub fn snapshot(&self) -> Vec<SubscriberHandle> {
        self.subscribers.read().values().cloned().collect()
    }

    /// Check whether a subscriber is live
    pub fn contains(&self, id: SubscriberId) -> bool {
        self.subscribers.read().contains_key(&id)
    }

    /// Get number of live subscribers
    pub fn len(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Check if there are no live subscribers
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.subscribers.read().is_empty()
    }
}
