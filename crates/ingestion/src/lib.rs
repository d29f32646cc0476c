//! # Ingestion
//!
//! Sensor data ingestion into the engine.
//!
//! Responsibilities:
//! - Check at startup that the primary sensor produces data
//! - Run the ingestion loop: read at a fixed cadence, feed the facade client
//! - Detect the end of a recorded dataset (job done)
//! - Provide replay and mock sensors
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{run_ingestion, validate_get_data, IngestionConfig, ReplaySensor};
//!
//! let sensor = ReplaySensor::load(Path::new("dataset"), "rplidar")?;
//! validate_get_data(&cancel, &sensor, Duration::from_secs(30), Duration::from_secs(1)).await?;
//!
//! let outcome = run_ingestion(cancel, client, sensor, config, metrics).await;
//! if outcome.is_job_done() {
//!     // Whole dataset ingested
//! }
//! ```

mod config;
mod error;
mod mock;
mod pipeline;
mod replay;
mod validate;

// Re-exports
pub use config::{IngestionConfig, IngestionMetrics, MetricsSnapshot};
pub use error::{IngestionError, Result};
pub use mock::{MockSensor, MockSensorConfig};
pub use pipeline::{run_ingestion, IngestionOutcome};
pub use replay::{ReplaySensor, READINGS_INDEX_FILE};
pub use validate::validate_get_data;
