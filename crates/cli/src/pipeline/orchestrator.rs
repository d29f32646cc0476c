//! Session orchestrator - drives one service from bring-up to export.
//!
//! The engine is the in-process mock library; readings come from a
//! recorded dataset replayed through the primary sensor.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{EngineLibrary, EngineMode, ServiceConfig};
use engine_facade::{MockEngineConfig, MockEngineLibrary};
use ingestion::ReplaySensor;
use serde_json::{Map, Value};
use slam_service::{ChunkStream, SlamService, JOB_DONE_COMMAND};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::{ExportedArtifact, SessionEnd, SessionStats};
use crate::error::CliError;

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Resolved service configuration
    pub service: ServiceConfig,

    /// Recorded dataset directory
    pub dataset: PathBuf,

    /// Mode the engine reports after initialization
    pub mode: EngineMode,

    /// Session timeout (None = until the dataset is consumed)
    pub timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// One SLAM session
pub struct Session {
    config: SessionConfig,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Run until the dataset is consumed, the timeout fires or `shutdown`
    /// resolves, then export the map and internal state
    ///
    /// The service is closed and the library terminated on every path past
    /// construction.
    pub async fn run<F>(self, shutdown: F) -> Result<SessionStats>
    where
        F: Future<Output = ()>,
    {
        let start_time = Instant::now();
        let service_config = &self.config.service;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let sensor = ReplaySensor::load(&self.config.dataset, service_config.primary_sensor())
            .with_context(|| {
                format!("Failed to load dataset from {}", self.config.dataset.display())
            })?;
        info!(
            sensor = service_config.primary_sensor(),
            readings = sensor.len(),
            "Dataset loaded"
        );

        let library = MockEngineLibrary::new(MockEngineConfig {
            mode: Some(self.config.mode),
            ..MockEngineConfig::default()
        });

        let service = SlamService::new(&library, service_config.clone(), sensor)
            .await
            .context("Failed to bring up SLAM service")?;
        info!(mode = %service.mode(), "Service running");

        let end = self.wait_for_end(&service, shutdown).await;
        info!(end = %end, "Session ended, exporting");

        let exported = export_all(&service, &service_config.data_dir).await;

        let final_pose = match service.get_position().await {
            Ok((pose, component)) => {
                debug!(component = %component, "Final pose captured");
                Some(pose)
            }
            Err(e) => {
                warn!(error = %e, "Failed to read final pose");
                None
            }
        };

        let stats = SessionStats {
            end,
            mode: service.mode(),
            duration: start_time.elapsed(),
            ingestion: service.ingestion_metrics(),
            engine_calls: service.engine_stats(),
            final_pose,
            exports: Vec::new(),
        };

        let closed = service.close().await;
        let terminated = library.terminate();

        let exports = exported?;
        closed.context("Failed to close SLAM service")?;
        terminated.context("Failed to terminate engine library")?;

        if end == SessionEnd::IngestionStopped {
            return Err(CliError::session_incomplete(
                "ingestion stopped before the dataset was consumed",
            )
            .into());
        }

        Ok(SessionStats { exports, ..stats })
    }

    async fn wait_for_end<F>(&self, service: &SlamService, shutdown: F) -> SessionEnd
    where
        F: Future<Output = ()>,
    {
        let deadline = async {
            match self.config.timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(shutdown);
        tokio::pin!(deadline);

        let mut poll = tokio::time::interval(self.config.service.data_rate());
        let mut request = Map::new();
        request.insert(JOB_DONE_COMMAND.to_string(), Value::Bool(true));

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    warn!("Received shutdown signal, stopping session...");
                    return SessionEnd::Interrupted;
                }
                _ = &mut deadline => {
                    warn!("Session timeout reached");
                    return SessionEnd::TimedOut;
                }
                _ = poll.tick() => {
                    let running = service.ingestion_running();
                    if job_done(service, &request).await {
                        return SessionEnd::JobDone;
                    }
                    if !running {
                        return SessionEnd::IngestionStopped;
                    }
                }
            }
        }
    }
}

async fn job_done(service: &SlamService, request: &Map<String, Value>) -> bool {
    match service.do_command(request).await {
        Ok(response) => response
            .get(JOB_DONE_COMMAND)
            .and_then(Value::as_bool)
            .unwrap_or(false),
        Err(e) => {
            warn!(error = %e, "job_done query failed");
            false
        }
    }
}

/// Export the point cloud map and the internal state under `data_dir`
async fn export_all(service: &SlamService, data_dir: &Path) -> Result<Vec<ExportedArtifact>> {
    tokio::fs::create_dir_all(data_dir)
        .await
        .map_err(|e| CliError::export(data_dir, e))?;

    let map = service
        .get_point_cloud_map()
        .await
        .context("Failed to fetch point cloud map")?;
    let stamp = service
        .get_latest_map_info()
        .await
        .context("Failed to read map timestamp")?
        .format("%Y%m%dT%H%M%S%.3fZ")
        .to_string();
    let map_path = data_dir.join(format!("map_{stamp}.pcd"));
    let map_artifact = write_chunks("point_cloud_map", map, &map_path).await?;

    let state = service
        .get_internal_state()
        .await
        .context("Failed to fetch internal state")?;
    let state_path = data_dir.join(format!("internal_state_{stamp}.pbstream"));
    let state_artifact = write_chunks("internal_state", state, &state_path).await?;

    Ok(vec![map_artifact, state_artifact])
}

/// Write a chunk stream to `path`, one chunk at a time
async fn write_chunks(
    kind: &'static str,
    stream: ChunkStream,
    path: &Path,
) -> crate::error::Result<ExportedArtifact> {
    let bytes = stream.total_len();
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| CliError::export(path, e))?;

    let mut chunks = 0;
    for chunk in stream {
        file.write_all(&chunk)
            .await
            .map_err(|e| CliError::export(path, e))?;
        chunks += 1;
    }
    file.flush().await.map_err(|e| CliError::export(path, e))?;

    info!(kind, path = %path.display(), chunks, bytes, "Artifact exported");
    Ok(ExportedArtifact {
        kind,
        path: path.to_path_buf(),
        chunks,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{AlgoConfig, SensorValidationConfig, SubAlgo};
    use std::io::Write;

    fn write_dataset(dir: &Path, sensor: &str, count: usize) {
        let mut index = std::fs::File::create(dir.join("readings.jsonl")).unwrap();
        for i in 0..count {
            let data_file = format!("{sensor}_{i}.bin");
            std::fs::write(dir.join(&data_file), vec![i as u8; 128]).unwrap();
            writeln!(
                index,
                r#"{{"sensor_id":"{sensor}","captured_at":"2024-01-01T00:00:{i:02}Z","data_file":"{data_file}"}}"#
            )
            .unwrap();
        }
    }

    fn service_config(data_dir: PathBuf) -> ServiceConfig {
        ServiceConfig {
            sensors: vec!["rplidar".into()],
            sub_algo: SubAlgo::Dim2d,
            data_dir,
            data_rate_ms: 5,
            map_rate_sec: 60,
            facade_timeout_ms: 1_000,
            sensor_validation: SensorValidationConfig {
                max_timeout_sec: 1,
                interval_sec: 1,
            },
            algo: AlgoConfig::default(),
        }
    }

    #[tokio::test]
    async fn test_session_runs_to_job_done_and_exports() {
        let dataset = tempfile::tempdir().unwrap();
        let data_dir = tempfile::tempdir().unwrap();
        write_dataset(dataset.path(), "rplidar", 6);

        let session = Session::new(SessionConfig {
            service: service_config(data_dir.path().to_path_buf()),
            dataset: dataset.path().to_path_buf(),
            mode: EngineMode::Mapping,
            timeout: Some(Duration::from_secs(10)),
            metrics_port: None,
        });

        let stats = session.run(std::future::pending()).await.unwrap();
        assert_eq!(stats.end, SessionEnd::JobDone);
        // One reading is consumed by the startup check
        assert_eq!(stats.ingestion.readings_ingested, 5);
        assert_eq!(stats.exports.len(), 2);

        let map = &stats.exports[0];
        assert_eq!(map.bytes, 5 * 128);
        assert_eq!(std::fs::read(&map.path).unwrap().len(), map.bytes);
        assert!(stats.final_pose.is_some());
    }

    #[tokio::test]
    async fn test_session_interrupted() {
        let dataset = tempfile::tempdir().unwrap();
        let data_dir = tempfile::tempdir().unwrap();
        write_dataset(dataset.path(), "rplidar", 3);

        let mut config = service_config(data_dir.path().to_path_buf());
        config.data_rate_ms = 60_000;

        let session = Session::new(SessionConfig {
            service: config,
            dataset: dataset.path().to_path_buf(),
            mode: EngineMode::Localizing,
            timeout: None,
            metrics_port: None,
        });

        let stats = session.run(async {}).await.unwrap();
        assert_eq!(stats.end, SessionEnd::Interrupted);
        assert_eq!(stats.mode, EngineMode::Localizing);
    }

    #[tokio::test]
    async fn test_missing_dataset() {
        let data_dir = tempfile::tempdir().unwrap();
        let session = Session::new(SessionConfig {
            service: service_config(data_dir.path().to_path_buf()),
            dataset: PathBuf::from("/nonexistent/dataset"),
            mode: EngineMode::Mapping,
            timeout: None,
            metrics_port: None,
        });

        assert!(session.run(std::future::pending()).await.is_err());
    }
}
