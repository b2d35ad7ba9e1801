//! Traffic measurement records
//!
//! A record is what a roadside sensor reports and what subscribers receive.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Congestion classification reported with each measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CongestionLevel {
    Low,
    Moderate,
    High,
}

impl CongestionLevel {
    /// Wire name of the level
    pub fn as_str(&self) -> &'static str {
        match self {
            CongestionLevel::Low => "low",
            CongestionLevel::Moderate => "moderate",
            CongestionLevel::High => "high",
        }
    }
}

impl std::fmt::Display for CongestionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CongestionLevel {
    type Err = InvalidRecord;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(CongestionLevel::Low),
            "moderate" => Ok(CongestionLevel::Moderate),
            "high" => Ok(CongestionLevel::High),
            other => Err(InvalidRecord(format!(
                "congestion_level must be one of low, moderate, high (got {other:?})"
            ))),
        }
    }
}

/// Validation failure for an incoming measurement
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct InvalidRecord(pub String);

/// A measurement as submitted by a sensor, before it is stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTrafficRecord {
    pub sensor_id: i32,
    pub traffic_volume: i32,
    pub average_speed: f64,
    pub congestion_level: CongestionLevel,
}

impl NewTrafficRecord {
    /// Create a new measurement
    pub fn new(
        sensor_id: i32,
        traffic_volume: i32,
        average_speed: f64,
        congestion_level: CongestionLevel,
    ) -> Self {
        Self {
            sensor_id,
            traffic_volume,
            average_speed,
            congestion_level,
        }
    }

    /// Reject measurements no sensor could have produced
    pub fn validate(&self) -> Result<(), InvalidRecord> {
        if self.sensor_id < 1 {
            return Err(InvalidRecord(format!(
                "sensor_id must be at least 1 (got {})",
                self.sensor_id
            )));
        }
        if self.traffic_volume < 0 {
            return Err(InvalidRecord(format!(
                "traffic_volume must not be negative (got {})",
                self.traffic_volume
            )));
        }
        if !self.average_speed.is_finite() || self.average_speed < 0.0 {
            return Err(InvalidRecord(format!(
                "average_speed must be a non-negative number (got {})",
                self.average_speed
            )));
        }
        Ok(())
    }
}

/// A stored measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficRecord {
    /// Store-assigned identifier
    pub traffic_id: i64,
    pub sensor_id: i32,
    /// When the measurement was recorded
    pub timestamp: DateTime<Utc>,
    pub traffic_volume: i32,
    pub average_speed: f64,
    pub congestion_level: CongestionLevel,
}

impl TrafficRecord {
    /// Build a stored record from a submitted measurement
    pub fn from_new(traffic_id: i64, timestamp: DateTime<Utc>, new: NewTrafficRecord) -> Self {
        Self {
            traffic_id,
            sensor_id: new.sensor_id,
            timestamp,
            traffic_volume: new.traffic_volume,
            average_speed: new.average_speed,
            congestion_level: new.congestion_level,
        }
    }
}
