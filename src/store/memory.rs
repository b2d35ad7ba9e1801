//! In-process traffic store
//!
//! Keeps a bounded window of the newest records. Oldest records are dropped
//! once `capacity` is reached.

use std::collections::VecDeque;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use super::{StoreError, TrafficStore};
use crate::event::{NewTrafficRecord, TrafficRecord};

/// Default number of records retained
const DEFAULT_CAPACITY: usize = 10_000;

#[derive(Debug)]
struct Inner {
    /// Oldest at the front, newest at the back
    records: VecDeque<TrafficRecord>,
    next_id: i64,
}

/// Bounded in-memory [`TrafficStore`]
#[derive(Debug)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    capacity: usize,
}

impl MemoryStore {
    /// Create a store with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a store retaining at most `capacity` records
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(Inner {
                records: VecDeque::with_capacity(capacity.min(1024)),
                next_id: 1,
            }),
            capacity,
        }
    }

    /// Number of records currently retained
    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TrafficStore for MemoryStore {
    async fn record(&self, new: NewTrafficRecord) -> Result<TrafficRecord, StoreError> {
        new.validate().map_err(|e| StoreError::Invalid(e.0))?;

        let mut inner = self.inner.lock();
        let record = TrafficRecord::from_new(inner.next_id, Utc::now(), new);
        inner.next_id += 1;

        if inner.records.len() == self.capacity {
            inner.records.pop_front();
        }
        inner.records.push_back(record.clone());

        Ok(record)
    }

    async fn fetch_recent(&self, limit: usize) -> Result<Vec<TrafficRecord>, StoreError> {
        let inner = self.inner.lock();
        Ok(inner.records.iter().rev().take(limit).cloned().collect())
    }
}
