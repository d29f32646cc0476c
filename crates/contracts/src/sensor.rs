//! TimedSensor trait - pollable sensor abstraction
//!
//! Unifies live sensors, recorded datasets and test doubles behind one
//! pull-based interface. A recorded source signals the end of its data with
//! `SensorError::Exhausted`.

use crate::{SensorError, SensorReading};

/// Pollable timestamped sensor
///
/// # Example
///
/// ```ignore
/// let reading = sensor.timed_reading().await?;
/// println!("{} @ {}", reading.sensor_id, reading.captured_at);
/// ```
#[trait_variant::make(TimedSensor: Send)]
pub trait LocalTimedSensor {
    /// Sensor name, used as the component reference for poses
    fn name(&self) -> &str;

    /// Read the next reading
    ///
    /// # Errors
    /// `SensorError::Exhausted` once a finite source has no more data,
    /// `SensorError::Unavailable` when a reading could not be produced.
    async fn timed_reading(&self) -> Result<SensorReading, SensorError>;
}
