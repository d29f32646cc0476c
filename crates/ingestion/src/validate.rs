//! Startup sensor check

use std::time::Duration;

use contracts::{SensorError, SlamError, TimedSensor};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Poll `sensor` every `interval` until it yields one reading
///
/// Fails with `SensorValidationFailed` once `max_timeout` has passed without
/// a reading, when the sensor reports the end of its data, or when `cancel`
/// fires. The reading obtained here is discarded.
#[instrument(
    name = "ingestion_validate_get_data",
    skip(cancel, sensor),
    fields(sensor = %sensor.name())
)]
pub async fn validate_get_data<S>(
    cancel: &CancellationToken,
    sensor: &S,
    max_timeout: Duration,
    interval: Duration,
) -> Result<(), SlamError>
where
    S: TimedSensor + Sync,
{
    let deadline = Instant::now() + max_timeout;
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(SlamError::sensor_validation(sensor.name(), "cancelled"));
            }
            read = tokio::time::timeout_at(deadline, sensor.timed_reading()) => read,
        };

        let last_error = match read {
            Ok(Ok(_)) => {
                info!(attempts, "sensor validated");
                return Ok(());
            }
            Ok(Err(e @ SensorError::Exhausted { .. })) => {
                return Err(SlamError::sensor_validation(sensor.name(), e.to_string()));
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => "timed out waiting for a reading".to_string(),
        };

        if Instant::now() + interval > deadline {
            warn!(attempts, error = %last_error, "sensor validation timed out");
            return Err(SlamError::sensor_validation(
                sensor.name(),
                format!(
                    "no reading within {}ms: {last_error}",
                    max_timeout.as_millis()
                ),
            ));
        }

        debug!(attempts, error = %last_error, "sensor not ready, retrying");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(SlamError::sensor_validation(sensor.name(), "cancelled"));
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::mock::{MockSensor, MockSensorConfig};

    #[tokio::test]
    async fn test_ready_sensor_passes() {
        let sensor = MockSensor::new(MockSensorConfig::endless("lidar"));
        validate_get_data(
            &CancellationToken::new(),
            &sensor,
            Duration::from_secs(1),
            Duration::from_millis(10),
        )
        .await
        .unwrap();
        assert_eq!(sensor.attempts(), 1);
    }

    #[tokio::test]
    async fn test_retries_until_reading() {
        let sensor = MockSensor::new(MockSensorConfig {
            unavailable_first: 3,
            ..MockSensorConfig::endless("lidar")
        });
        validate_get_data(
            &CancellationToken::new(),
            &sensor,
            Duration::from_secs(1),
            Duration::from_millis(5),
        )
        .await
        .unwrap();
        assert_eq!(sensor.attempts(), 4);
    }

    #[tokio::test]
    async fn test_times_out() {
        let sensor = MockSensor::new(MockSensorConfig {
            unavailable_first: u64::MAX,
            ..MockSensorConfig::endless("lidar")
        });
        let err = validate_get_data(
            &CancellationToken::new(),
            &sensor,
            Duration::from_millis(50),
            Duration::from_millis(10),
        )
        .await
        .unwrap_err();

        match err {
            SlamError::SensorValidationFailed { sensor, message } => {
                assert_eq!(sensor, "lidar");
                assert!(message.contains("no reading within 50ms"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_empty_dataset_fails_fast() {
        let sensor = MockSensor::new(MockSensorConfig::finite("lidar", 0));
        let err = validate_get_data(
            &CancellationToken::new(),
            &sensor,
            Duration::from_secs(30),
            Duration::from_secs(1),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SlamError::SensorValidationFailed { .. }));
        assert_eq!(sensor.attempts(), 1);
    }

    #[tokio::test]
    async fn test_cancelled() {
        let sensor = MockSensor::new(MockSensorConfig {
            unavailable_first: u64::MAX,
            ..MockSensorConfig::endless("lidar")
        });
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = validate_get_data(&cancel, &sensor, Duration::from_secs(30), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("cancelled"));
    }
}
