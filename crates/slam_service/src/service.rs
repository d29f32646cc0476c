//! SlamService - public query surface over the running engine

use chrono::{DateTime, Utc};
use contracts::{EngineLibrary, EngineMode, Pose, Result, ServiceConfig, SlamError, TimedSensor};
use ingestion::MetricsSnapshot;
use observability::{record_chunks_streamed, EngineCallAggregator};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::chunk::ChunkStream;
use crate::lifecycle::LifecycleManager;
use crate::position::check_quaternion;

/// `do_command` key reporting whether the dataset was fully ingested
pub const JOB_DONE_COMMAND: &str = "job_done";

#[derive(Debug)]
struct ServiceState {
    closed: bool,
    map_timestamp: DateTime<Utc>,
}

/// SLAM service
///
/// Created running; stays usable until [`SlamService::close`]. After close
/// every query fails with `ServiceClosed`.
pub struct SlamService {
    primary_sensor: String,
    lifecycle: LifecycleManager,
    /// Shared with the shutdown sequence
    state: Mutex<ServiceState>,
}

impl SlamService {
    /// Validate the sensor, bring the engine up and start ingestion
    #[instrument(name = "slam_service_new", skip(library, config, sensor))]
    pub async fn new<L, S>(library: &L, config: ServiceConfig, sensor: S) -> Result<Self>
    where
        L: EngineLibrary,
        S: TimedSensor + Sync + 'static,
    {
        let lifecycle = LifecycleManager::bring_up(library, &config, sensor).await?;

        Ok(Self {
            primary_sensor: config.primary_sensor().to_string(),
            lifecycle,
            state: Mutex::new(ServiceState {
                closed: false,
                map_timestamp: Utc::now(),
            }),
        })
    }

    /// Fail with `ServiceClosed` once closed
    async fn ensure_open(&self, operation: &'static str) -> Result<()> {
        if self.state.lock().await.closed {
            warn!(operation, "called after close");
            return Err(SlamError::ServiceClosed);
        }
        Ok(())
    }

    /// Current pose and the component it refers to
    #[instrument(name = "slam_service_get_position", skip(self))]
    pub async fn get_position(&self) -> Result<(Pose, String)> {
        self.ensure_open("get_position").await?;

        let position = self.lifecycle.client().get_position().await?;
        let pose = check_quaternion(&position)?;
        Ok((pose, self.primary_sensor.clone()))
    }

    /// Current point cloud map as a chunk stream
    ///
    /// Refreshes the map timestamp unless the engine is localizing against
    /// a fixed map.
    #[instrument(name = "slam_service_get_point_cloud_map", skip(self))]
    pub async fn get_point_cloud_map(&self) -> Result<ChunkStream> {
        self.ensure_open("get_point_cloud_map").await?;

        let map = self.lifecycle.client().get_point_cloud_map().await?;
        if self.lifecycle.mode() != EngineMode::Localizing {
            self.state.lock().await.map_timestamp = Utc::now();
        }

        let stream = ChunkStream::new(map);
        record_chunks_streamed("point_cloud_map", stream.remaining_chunks(), stream.total_len());
        Ok(stream)
    }

    /// Engine internal state as a chunk stream
    #[instrument(name = "slam_service_get_internal_state", skip(self))]
    pub async fn get_internal_state(&self) -> Result<ChunkStream> {
        self.ensure_open("get_internal_state").await?;

        let state = self.lifecycle.client().get_internal_state().await?;
        let stream = ChunkStream::new(state);
        record_chunks_streamed("internal_state", stream.remaining_chunks(), stream.total_len());
        Ok(stream)
    }

    /// Timestamp of the latest map
    ///
    /// When localizing this is the session start time.
    pub async fn get_latest_map_info(&self) -> Result<DateTime<Utc>> {
        let state = self.state.lock().await;
        if state.closed {
            warn!(operation = "get_latest_map_info", "called after close");
            return Err(SlamError::ServiceClosed);
        }
        Ok(state.map_timestamp)
    }

    /// Answer a generic command
    ///
    /// Only `job_done` is understood.
    pub async fn do_command(&self, request: &Map<String, Value>) -> Result<Map<String, Value>> {
        self.ensure_open("do_command").await?;

        if request.contains_key(JOB_DONE_COMMAND) {
            let mut response = Map::new();
            response.insert(JOB_DONE_COMMAND.to_string(), Value::Bool(self.job_done()));
            return Ok(response);
        }

        let command = request.keys().cloned().collect::<Vec<_>>().join(",");
        Err(SlamError::unimplemented(command))
    }

    /// Shut the service down
    ///
    /// Idempotent: later calls log and succeed without tearing down again.
    /// Returns the engine terminate error, if any.
    #[instrument(name = "slam_service_close", skip(self))]
    pub async fn close(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.closed {
            warn!("close called multiple times");
            return Ok(());
        }

        let result = self.lifecycle.tear_down().await;
        state.closed = true;

        match &result {
            Ok(()) => info!("service closed"),
            Err(e) => warn!(error = %e, "service closed with errors"),
        }
        result
    }

    // ===== Introspection =====

    /// Whether the ingestion loop consumed the whole dataset
    pub fn job_done(&self) -> bool {
        self.lifecycle.job_done()
    }

    /// False once ingestion ended, for any reason
    pub fn ingestion_running(&self) -> bool {
        self.lifecycle.ingestion_running()
    }

    pub fn mode(&self) -> EngineMode {
        self.lifecycle.mode()
    }

    pub fn primary_sensor(&self) -> &str {
        &self.primary_sensor
    }

    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.closed
    }

    pub fn ingestion_metrics(&self) -> MetricsSnapshot {
        self.lifecycle.ingestion_metrics().snapshot()
    }

    /// Per-operation engine call statistics
    pub fn engine_stats(&self) -> EngineCallAggregator {
        self.lifecycle.client().stats()
    }

    /// Number of full teardowns run (at most one)
    pub fn teardown_count(&self) -> u64 {
        self.lifecycle.teardown_count()
    }
}
