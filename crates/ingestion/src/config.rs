//! Ingestion loop configuration and metrics

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use contracts::{ServiceConfig, DEFAULT_DATA_RATE_MS};

/// Ingestion loop configuration
#[derive(Debug, Clone)]
pub struct IngestionConfig {
    /// Primary sensor name, used for logs and metrics labels
    pub sensor_name: String,

    /// Cadence between two reads
    pub data_rate: Duration,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            sensor_name: "lidar".to_string(),
            data_rate: Duration::from_millis(DEFAULT_DATA_RATE_MS),
        }
    }
}

impl IngestionConfig {
    /// Derive the loop configuration from the service configuration
    pub fn from_service_config(config: &ServiceConfig) -> Self {
        Self {
            sensor_name: config.primary_sensor().to_string(),
            data_rate: config.data_rate(),
        }
    }
}

/// Ingestion metrics
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Readings returned by the sensor
    pub readings_read: AtomicU64,

    /// Readings accepted by the engine
    pub readings_ingested: AtomicU64,

    /// Readings the engine did not accept in time
    pub readings_dropped: AtomicU64,

    /// Failed sensor reads
    pub sensor_errors: AtomicU64,
}

impl IngestionMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_read(&self) {
        self.readings_read.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ingested(&self) {
        self.readings_ingested.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.readings_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sensor_error(&self) {
        self.sensor_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            readings_read: self.readings_read.load(Ordering::Relaxed),
            readings_ingested: self.readings_ingested.load(Ordering::Relaxed),
            readings_dropped: self.readings_dropped.load(Ordering::Relaxed),
            sensor_errors: self.sensor_errors.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub readings_read: u64,
    pub readings_ingested: u64,
    pub readings_dropped: u64,
    pub sensor_errors: u64,
}
