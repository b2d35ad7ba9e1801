//! Traffic record storage
//!
//! The fan-out core only needs two things from persistence: the write path
//! (`record`) that feeds the ingestion hook, and a read of the most recent
//! records (`fetch_recent`) that feeds the poller. Anything that can do both
//! can back the server.

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::event::{NewTrafficRecord, TrafficRecord};

pub use memory::MemoryStore;

/// Error type for store operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store could not be reached or failed the query
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store refused the record
    #[error("invalid record: {0}")]
    Invalid(String),
}

/// Persistence capability consumed by the ingestion hook and the poller
#[async_trait]
pub trait TrafficStore: Send + Sync + 'static {
    /// Durably record a measurement and return the stored row
    async fn record(&self, new: NewTrafficRecord) -> Result<TrafficRecord, StoreError>;

    /// Fetch up to `limit` of the most recent records, newest first
    async fn fetch_recent(&self, limit: usize) -> Result<Vec<TrafficRecord>, StoreError>;
}
