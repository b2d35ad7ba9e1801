//! Error types
//!
//! Errors that escape the fan-out core. Per-subscriber delivery failures
//! never reach callers; they are contained by the broadcaster and only
//! surface as [`DeliveryError`] values inside the dispatch tasks.

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::store::StoreError;

/// Crate-level error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error (bind, accept)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Payload could not be serialized; nothing was dispatched
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Store operation failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Invalid configuration value
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result type for fan-out operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failure delivering a payload to a single subscriber
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The subscriber's connection is gone
    #[error("subscriber connection closed")]
    Closed,

    /// The transport rejected the write
    #[error("transport error: {0}")]
    Transport(String),

    /// The write did not complete within the delivery timeout
    #[error("delivery timed out after {0:?}")]
    TimedOut(Duration),
}
