//! Subscriber handles and sinks
//!
//! A `SubscriberHandle` is the registry's view of one live connection: a
//! unique id plus the sink that writes bytes to the peer. Handles compare by
//! id, never by what the sink points at.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{mpsc, watch};

use crate::error::DeliveryError;

/// Counter for generating unique subscriber IDs
static SUBSCRIBER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier of a live subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    fn next() -> Self {
        Self(SUBSCRIBER_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Transport end of a subscriber
///
/// Implementations write one serialized payload to the peer. An error means
/// the subscriber can no longer be served and will be evicted.
#[async_trait]
pub trait SubscriberSink: Send + Sync + 'static {
    async fn send(&self, payload: Bytes) -> Result<(), DeliveryError>;
}

#[async_trait]
impl<T: SubscriberSink + ?Sized> SubscriberSink for Arc<T> {
    async fn send(&self, payload: Bytes) -> Result<(), DeliveryError> {
        (**self).send(payload).await
    }
}

struct HandleInner {
    id: SubscriberId,
    sink: Box<dyn SubscriberSink>,
    /// Flips to `true` once the handle leaves the registry; a retired handle
    /// is never registered again
    retired: watch::Sender<bool>,
}

/// Shared handle to one live subscriber
///
/// Cheap to clone; all clones refer to the same subscriber.
#[derive(Clone)]
pub struct SubscriberHandle {
    inner: Arc<HandleInner>,
}

impl SubscriberHandle {
    /// Wrap a sink in a new handle with a fresh id
    pub fn new(sink: impl SubscriberSink) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                id: SubscriberId::next(),
                sink: Box::new(sink),
                retired: watch::channel(false).0,
            }),
        }
    }

    /// Get the subscriber ID
    #[inline]
    pub fn id(&self) -> SubscriberId {
        self.inner.id
    }

    /// Whether this handle has been removed from a registry
    #[inline]
    pub fn is_retired(&self) -> bool {
        *self.inner.retired.borrow()
    }

    /// Resolves once the handle has been removed from its registry
    ///
    /// The transport waits on this to close a connection the broadcaster
    /// evicted. Resolves immediately if the handle is already retired.
    pub async fn retired(&self) {
        let mut rx = self.inner.retired.subscribe();
        // The sender lives as long as `self`, so this cannot fail
        let _ = rx.wait_for(|retired| *retired).await;
    }

    /// Mark the handle retired. Returns `true` on the first call only.
    pub(super) fn retire(&self) -> bool {
        !self.inner.retired.send_replace(true)
    }

    /// Write a payload through the underlying sink
    pub async fn send(&self, payload: Bytes) -> Result<(), DeliveryError> {
        self.inner.sink.send(payload).await
    }
}

impl PartialEq for SubscriberHandle {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for SubscriberHandle {}

impl fmt::Debug for SubscriberHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberHandle")
            .field("id", &self.inner.id)
            .field("retired", &self.is_retired())
            .finish()
    }
}

/// Sink backed by a bounded channel
///
/// Used for in-process subscribers. Delivery waits for channel capacity, so a
/// consumer that stops reading is evicted once the delivery timeout fires.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::Sender<Bytes>,
}

impl ChannelSink {
    /// Create a sink and the receiver its payloads arrive on
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Bytes>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    /// Check if the receiving side is still alive
    #[inline]
    pub fn is_connected(&self) -> bool {
        !self.sender.is_closed()
    }
}

#[async_trait]
impl SubscriberSink for ChannelSink {
    async fn send(&self, payload: Bytes) -> Result<(), DeliveryError> {
        self.sender
            .send(payload)
            .await
            .map_err(|_| DeliveryError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let (a, _rx_a) = ChannelSink::new(1);
        let (b, _rx_b) = ChannelSink::new(1);
        let first = SubscriberHandle::new(a);
        let second = SubscriberHandle::new(b);

        assert_ne!(first.id(), second.id());
        assert_ne!(first, second);
    }

    #[test]
    fn test_clones_share_identity() {
        let (sink, _rx) = ChannelSink::new(1);
        let handle = SubscriberHandle::new(sink);
        let clone = handle.clone();

        assert_eq!(handle, clone);
        assert!(clone.retire());
        assert!(handle.is_retired());
        assert!(!handle.retire());
    }

    #[tokio::test]
    async fn test_retired_resolves_on_retire() {
        let (sink, _rx) = ChannelSink::new(1);
        let handle = SubscriberHandle::new(sink);

        let waiter = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.retired().await })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        handle.retire();
        tokio::time::timeout(std::time::Duration::from_secs(2), waiter)
            .await
            .unwrap()
            .unwrap();

        // Already retired: resolves at once
        tokio::time::timeout(std::time::Duration::from_millis(50), handle.retired())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_channel_sink_delivers() {
        let (sink, mut rx) = ChannelSink::new(4);
        let handle = SubscriberHandle::new(sink);

        handle.send(Bytes::from_static(b"hello")).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn test_channel_sink_closed() {
        let (sink, rx) = ChannelSink::new(4);
        assert!(sink.is_connected());
        drop(rx);
        assert!(!sink.is_connected());

        let handle = SubscriberHandle::new(sink);
        let result = handle.send(Bytes::from_static(b"lost")).await;
        assert_eq!(result, Err(DeliveryError::Closed));
    }

    #[test]
    fn test_display_id() {
        let (sink, _rx) = ChannelSink::new(1);
        let handle = SubscriberHandle::new(sink);
        assert_eq!(handle.id().to_string(), format!("sub-{}", handle.id().as_u64()));
    }
}
