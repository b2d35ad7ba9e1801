//! Shared handler state

use std::sync::Arc;

use tokio::sync::{watch, OwnedSemaphorePermit, Semaphore};

use crate::ingest::Ingestor;
use crate::registry::SubscriberRegistry;

/// Held by a WebSocket connection for as long as it is open
#[derive(Debug)]
pub struct ConnectionPermit(#[allow(dead_code)] Option<OwnedSemaphorePermit>);

/// State shared by every HTTP and WebSocket handler
#[derive(Clone)]
pub struct AppState {
    pub(crate) registry: Arc<SubscriberRegistry>,
    pub(crate) ingestor: Ingestor,
    pub(crate) latest_default_limit: usize,
    connection_semaphore: Option<Arc<Semaphore>>,
    closing: watch::Receiver<bool>,
}

impl AppState {
    pub fn new(
        registry: Arc<SubscriberRegistry>,
        ingestor: Ingestor,
        latest_default_limit: usize,
        max_connections: usize,
        closing: watch::Receiver<bool>,
    ) -> Self {
        let connection_semaphore = if max_connections > 0 {
            Some(Arc::new(Semaphore::new(max_connections)))
        } else {
            None
        };

        Self {
            registry,
            ingestor,
            latest_default_limit,
            connection_semaphore,
            closing,
        }
    }

    /// Reserve a subscriber slot
    ///
    /// Returns `None` when the connection limit is reached. The slot is
    /// released when the returned permit is dropped.
    pub fn try_acquire_connection(&self) -> Option<ConnectionPermit> {
        match self.connection_semaphore {
            Some(ref sem) => sem
                .clone()
                .try_acquire_owned()
                .ok()
                .map(|permit| ConnectionPermit(Some(permit))),
            None => Some(ConnectionPermit(None)),
        }
    }

    /// Receiver that flips to `true` when the server starts shutting down
    pub fn closing(&self) -> watch::Receiver<bool> {
        self.closing.clone()
    }
}
