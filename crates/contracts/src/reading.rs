//! SensorReading - sensor output, ingestion input

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One timestamped sensor sample
///
/// Produced by a `TimedSensor` and consumed exactly once by the ingestion loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorReading {
    /// Sensor that produced the reading
    pub sensor_id: String,

    /// Capture time
    pub captured_at: DateTime<Utc>,

    /// Opaque multi-point payload (zero-copy)
    pub payload: Bytes,
}

impl SensorReading {
    pub fn new(sensor_id: impl Into<String>, captured_at: DateTime<Utc>, payload: Bytes) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            captured_at,
            payload,
        }
    }
}
