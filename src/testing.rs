//! Shared fixtures for unit tests

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::DeliveryError;
use crate::event::{CongestionLevel, NewTrafficRecord, TrafficRecord};
use crate::registry::SubscriberSink;
use crate::store::{StoreError, TrafficStore};

/// Sink that forwards payloads to a channel and can be told to start failing
#[derive(Clone)]
pub struct RecordingSink {
    tx: mpsc::UnboundedSender<Bytes>,
    failing: Arc<AtomicBool>,
}

impl RecordingSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Bytes>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = Self {
            tx,
            failing: Arc::new(AtomicBool::new(false)),
        };
        (sink, rx)
    }

    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl SubscriberSink for RecordingSink {
    async fn send(&self, payload: Bytes) -> Result<(), DeliveryError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DeliveryError::Transport("sink failing".into()));
        }
        self.tx.send(payload).map_err(|_| DeliveryError::Closed)
    }
}

/// Sink whose writes never complete
pub struct StallingSink;

#[async_trait]
impl SubscriberSink for StallingSink {
    async fn send(&self, _payload: Bytes) -> Result<(), DeliveryError> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

/// Store that replays scripted `fetch_recent` results and counts reads
pub struct ScriptedStore {
    responses: Mutex<VecDeque<Result<Vec<TrafficRecord>, StoreError>>>,
    fallback: Vec<TrafficRecord>,
    fetches: AtomicUsize,
    fail_writes: AtomicBool,
}

impl ScriptedStore {
    /// Store that answers every read with `fallback` once the script runs out
    pub fn new(
        script: Vec<Result<Vec<TrafficRecord>, StoreError>>,
        fallback: Vec<TrafficRecord>,
    ) -> Self {
        Self {
            responses: Mutex::new(script.into()),
            fallback,
            fetches: AtomicUsize::new(0),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    pub fn failing_writes(self) -> Self {
        self.fail_writes.store(true, Ordering::SeqCst);
        self
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TrafficStore for ScriptedStore {
    async fn record(&self, new: NewTrafficRecord) -> Result<TrafficRecord, StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("write refused".into()));
        }
        Ok(TrafficRecord::from_new(1, Utc::now(), new))
    }

    async fn fetch_recent(&self, limit: usize) -> Result<Vec<TrafficRecord>, StoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let next = self.responses.lock().pop_front();
        match next {
            Some(result) => result.map(|records| records.into_iter().take(limit).collect()),
            None => Ok(self.fallback.iter().take(limit).cloned().collect()),
        }
    }
}

pub fn record(traffic_id: i64, volume: i32) -> TrafficRecord {
    TrafficRecord::from_new(
        traffic_id,
        Utc::now(),
        NewTrafficRecord::new(1, volume, 48.0, CongestionLevel::Moderate),
    )
}

/// Poll `check` until it holds, failing the test after two seconds
pub async fn eventually(mut check: impl FnMut() -> bool) {
    let waited = tokio::time::timeout(Duration::from_secs(2), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "condition not reached within 2s");
}

/// Await a future, failing the test after two seconds
pub async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(2), future)
        .await
        .expect("future did not complete within 2s")
}
