//! Ingestion loop - pulls readings at a fixed cadence and feeds the engine

use std::sync::Arc;

use contracts::{SensorError, TimedSensor};
use engine_facade::FacadeClient;
use observability::{record_reading_dropped, record_reading_ingested};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::config::{IngestionConfig, IngestionMetrics};

/// Why the ingestion loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionOutcome {
    /// The sensor ran out of data; the whole dataset was ingested
    JobDone,
    /// The loop's cancellation scope fired
    Cancelled,
    /// An unrecoverable sensor or engine error ended the loop
    Failed,
}

impl IngestionOutcome {
    pub fn is_job_done(&self) -> bool {
        matches!(self, Self::JobDone)
    }
}

/// Run the ingestion loop until cancellation, sensor exhaustion or an
/// unrecoverable error
///
/// Each tick reads one reading and hands it to the facade client.
///
/// An `add_sensor_reading` that times out does not end the loop: the reading
/// is dropped without retry, counted in `readings_dropped`, and the next tick
/// carries on. Any other engine error, or a sensor that becomes unavailable,
/// ends the loop. Errors are logged, never returned.
#[instrument(
    name = "ingestion_loop",
    skip(cancel, client, sensor, config, metrics),
    fields(sensor = %config.sensor_name)
)]
pub async fn run_ingestion<S>(
    cancel: CancellationToken,
    client: Arc<FacadeClient>,
    sensor: S,
    config: IngestionConfig,
    metrics: Arc<IngestionMetrics>,
) -> IngestionOutcome
where
    S: TimedSensor + Sync,
{
    info!(data_rate_ms = config.data_rate.as_millis() as u64, "ingestion loop started");

    let mut ticker = tokio::time::interval(config.data_rate);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let outcome = loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break IngestionOutcome::Cancelled,
            _ = ticker.tick() => {}
        }

        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => break IngestionOutcome::Cancelled,
            read = sensor.timed_reading() => read,
        };

        let reading = match read {
            Ok(reading) => {
                metrics.record_read();
                reading
            }
            Err(SensorError::Exhausted { .. }) => {
                info!("sensor reached end of dataset");
                break IngestionOutcome::JobDone;
            }
            Err(e) => {
                metrics.record_sensor_error();
                error!(error = %e, "sensor read failed, stopping ingestion");
                break IngestionOutcome::Failed;
            }
        };

        let captured_at = reading.captured_at;
        let added = tokio::select! {
            biased;
            _ = cancel.cancelled() => break IngestionOutcome::Cancelled,
            added = client.add_sensor_reading(reading) => added,
        };

        match added {
            Ok(()) => {
                metrics.record_ingested();
                record_reading_ingested(&config.sensor_name);
                debug!(captured_at = %captured_at, "reading ingested");
            }
            Err(e) if e.is_timeout() => {
                metrics.record_dropped();
                record_reading_dropped(&config.sensor_name, "timeout");
                warn!(captured_at = %captured_at, error = %e, "reading dropped");
            }
            Err(e) => {
                record_reading_dropped(&config.sensor_name, "engine_error");
                error!(error = %e, "engine rejected reading, stopping ingestion");
                break IngestionOutcome::Failed;
            }
        }
    };

    let snapshot = metrics.snapshot();
    info!(
        outcome = ?outcome,
        read = snapshot.readings_read,
        ingested = snapshot.readings_ingested,
        dropped = snapshot.readings_dropped,
        "ingestion loop stopped"
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use contracts::{EngineOp, SlamEngine};
    use engine_facade::{CallRecorder, MockEngine, MockEngineConfig};

    use crate::mock::{MockSensor, MockSensorConfig};

    fn config() -> IngestionConfig {
        IngestionConfig {
            sensor_name: "lidar".into(),
            data_rate: Duration::from_millis(1),
        }
    }

    async fn started_client(
        engine: impl SlamEngine + 'static,
        timeout: Duration,
    ) -> (Arc<FacadeClient>, CancellationToken) {
        let workers = CancellationToken::new();
        let client = FacadeClient::spawn(engine, timeout, workers.clone());
        client.initialize_and_start().await.unwrap();
        (Arc::new(client), workers)
    }

    #[tokio::test]
    async fn test_exhaustion_reports_job_done() {
        let recorder = Arc::new(CallRecorder::new());
        let engine = MockEngine::new(MockEngineConfig::default(), Arc::clone(&recorder));
        let (client, workers) = started_client(engine, Duration::from_secs(1)).await;
        let metrics = Arc::new(IngestionMetrics::new());

        let sensor = MockSensor::new(MockSensorConfig::finite("lidar", 5));
        let outcome = run_ingestion(
            CancellationToken::new(),
            Arc::clone(&client),
            sensor,
            config(),
            Arc::clone(&metrics),
        )
        .await;

        assert_eq!(outcome, IngestionOutcome::JobDone);
        assert_eq!(metrics.snapshot().readings_ingested, 5);
        assert_eq!(recorder.calls(EngineOp::AddSensorReading), 5);

        workers.cancel();
        client.join_worker().await;
    }

    #[tokio::test]
    async fn test_cancellation_stops_loop() {
        let engine = MockEngine::new(MockEngineConfig::default(), Arc::new(CallRecorder::new()));
        let (client, workers) = started_client(engine, Duration::from_secs(1)).await;
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run_ingestion(
            cancel.clone(),
            Arc::clone(&client),
            MockSensor::new(MockSensorConfig::endless("lidar")),
            config(),
            Arc::new(IngestionMetrics::new()),
        ));

        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();
        assert_eq!(task.await.unwrap(), IngestionOutcome::Cancelled);

        workers.cancel();
        client.join_worker().await;
    }

    #[tokio::test]
    async fn test_unavailable_sensor_ends_loop() {
        let engine = MockEngine::new(MockEngineConfig::default(), Arc::new(CallRecorder::new()));
        let (client, workers) = started_client(engine, Duration::from_secs(1)).await;
        let metrics = Arc::new(IngestionMetrics::new());

        let sensor = MockSensor::new(MockSensorConfig {
            fail_at_end: true,
            ..MockSensorConfig::finite("lidar", 2)
        });
        let outcome = run_ingestion(
            CancellationToken::new(),
            Arc::clone(&client),
            sensor,
            config(),
            Arc::clone(&metrics),
        )
        .await;

        assert_eq!(outcome, IngestionOutcome::Failed);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.readings_ingested, 2);
        assert_eq!(snapshot.sensor_errors, 1);

        workers.cancel();
        client.join_worker().await;
    }

    #[tokio::test]
    async fn test_engine_failure_ends_loop() {
        let engine = MockEngine::new(
            MockEngineConfig {
                fail_on: vec![EngineOp::AddSensorReading],
                ..Default::default()
            },
            Arc::new(CallRecorder::new()),
        );
        let (client, workers) = started_client(engine, Duration::from_secs(1)).await;

        let outcome = run_ingestion(
            CancellationToken::new(),
            Arc::clone(&client),
            MockSensor::new(MockSensorConfig::endless("lidar")),
            config(),
            Arc::new(IngestionMetrics::new()),
        )
        .await;

        assert_eq!(outcome, IngestionOutcome::Failed);

        workers.cancel();
        client.join_worker().await;
    }

    #[tokio::test]
    async fn test_engine_timeout_drops_reading_and_continues() {
        let engine = MockEngine::new(
            MockEngineConfig {
                hang_on: vec![EngineOp::AddSensorReading],
                ..Default::default()
            },
            Arc::new(CallRecorder::new()),
        );
        let (client, workers) = started_client(engine, Duration::from_millis(10)).await;
        let metrics = Arc::new(IngestionMetrics::new());

        // The first reading hangs the engine; the second waits in the queue
        // and times out too. Neither ends the loop.
        let outcome = run_ingestion(
            CancellationToken::new(),
            Arc::clone(&client),
            MockSensor::new(MockSensorConfig::finite("lidar", 2)),
            config(),
            Arc::clone(&metrics),
        )
        .await;

        assert_eq!(outcome, IngestionOutcome::JobDone);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.readings_dropped, 2);
        assert_eq!(snapshot.readings_ingested, 0);

        workers.cancel();
        client.join_worker().await;
    }
}
