//! Traffic events and broadcast payloads

pub mod record;
pub mod update;

pub use record::{CongestionLevel, InvalidRecord, NewTrafficRecord, TrafficRecord};
pub use update::TrafficUpdate;
