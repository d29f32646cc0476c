//! Lifecycle manager - ordered bring-up and teardown of engine and ingestion
//!
//! Two cancellation scopes are kept apart so ingestion can always be shut
//! down before the engine it feeds:
//!
//! ```text
//! bring-up:  validate sensor -> create engine -> initialize -> start -> spawn ingestion
//! teardown:  cancel ingestion -> join ingestion -> stop -> terminate -> cancel facade -> join facade
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use contracts::{EngineLibrary, EngineMode, EngineOp, Result, ServiceConfig, SlamError, TimedSensor};
use engine_facade::FacadeClient;
use ingestion::{run_ingestion, validate_get_data, IngestionConfig, IngestionMetrics};
use observability::record_job_done;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

/// Engine plus ingestion worker, with their cancellation scopes
pub struct LifecycleManager {
    client: Arc<FacadeClient>,
    mode: EngineMode,
    ingestion_scope: CancellationToken,
    facade_scope: CancellationToken,
    ingestion_worker: Mutex<Option<JoinHandle<()>>>,
    /// Written by the ingestion worker only; read without any lock
    job_done: Arc<AtomicBool>,
    ingestion_metrics: Arc<IngestionMetrics>,
    teardowns: AtomicU64,
}

impl LifecycleManager {
    /// Bring the engine up and start ingesting from `sensor`
    ///
    /// Anything brought up before a failure is torn down again before the
    /// error is returned. A failed or timed-out `initialize` is not followed
    /// by `terminate`: the facade worker is cancelled, which abandons a hung
    /// call, and the engine is dropped as it stands.
    #[instrument(
        name = "lifecycle_bring_up",
        skip(library, config, sensor),
        fields(sensor = %config.primary_sensor())
    )]
    pub async fn bring_up<L, S>(library: &L, config: &ServiceConfig, sensor: S) -> Result<Self>
    where
        L: EngineLibrary,
        S: TimedSensor + Sync + 'static,
    {
        let ingestion_scope = CancellationToken::new();
        let facade_scope = CancellationToken::new();

        validate_get_data(
            &ingestion_scope,
            &sensor,
            config.sensor_validation.max_timeout(),
            config.sensor_validation.interval(),
        )
        .await?;

        let engine = library
            .create_engine(&config.engine_config(), &config.algo)
            .map_err(|source| SlamError::EngineFailure {
                operation: EngineOp::Initialize,
                source,
            })?;

        let client = Arc::new(FacadeClient::spawn(
            engine,
            config.facade_timeout(),
            facade_scope.clone(),
        ));

        let mode = match client.initialize_and_start().await {
            Ok(mode) => mode,
            Err(e) => {
                error!(error = %e, "engine bring-up failed, releasing facade workers");
                // Start failures were rolled back by the client; after a
                // failed initialize the engine is dropped untouched.
                facade_scope.cancel();
                client.join_worker().await;
                return Err(e);
            }
        };

        let manager = Self {
            client,
            mode,
            ingestion_scope,
            facade_scope,
            ingestion_worker: Mutex::new(None),
            job_done: Arc::new(AtomicBool::new(false)),
            ingestion_metrics: Arc::new(IngestionMetrics::new()),
            teardowns: AtomicU64::new(0),
        };
        manager.spawn_ingestion(sensor, IngestionConfig::from_service_config(config));

        info!(mode = %mode, "service brought up");
        Ok(manager)
    }

    /// Launch the ingestion loop as a tracked worker
    ///
    /// On end of data the worker raises `job_done` first, then cancels its
    /// own scope.
    fn spawn_ingestion<S>(&self, sensor: S, config: IngestionConfig)
    where
        S: TimedSensor + Sync + 'static,
    {
        let scope = self.ingestion_scope.clone();
        let client = Arc::clone(&self.client);
        let job_done = Arc::clone(&self.job_done);
        let metrics = Arc::clone(&self.ingestion_metrics);

        let handle = tokio::spawn(async move {
            let outcome = run_ingestion(scope.clone(), client, sensor, config, metrics).await;
            if outcome.is_job_done() {
                job_done.store(true, Ordering::SeqCst);
                record_job_done(true);
                scope.cancel();
            }
        });

        if let Ok(mut worker) = self.ingestion_worker.lock() {
            *worker = Some(handle);
        }
    }

    /// Tear everything down, ingestion first
    ///
    /// Never stops early: stop and terminate are both attempted, and both
    /// scopes are always cancelled and joined. Returns the terminate error;
    /// a stop error is only logged.
    #[instrument(name = "lifecycle_tear_down", skip(self))]
    pub async fn tear_down(&self) -> Result<()> {
        self.teardowns.fetch_add(1, Ordering::SeqCst);

        self.ingestion_scope.cancel();
        let worker = self.ingestion_worker.lock().ok().and_then(|mut w| w.take());
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                error!(error = ?e, "ingestion worker panicked");
            }
        }
        debug!("ingestion worker joined");

        if let Err(e) = self.client.stop().await {
            error!(error = %e, "engine stop failed");
        }
        let terminated = self.client.terminate().await.inspect_err(|e| {
            error!(error = %e, "engine terminate failed");
        });

        self.facade_scope.cancel();
        self.client.join_worker().await;
        debug!("facade workers joined");

        terminated
    }

    pub fn client(&self) -> &Arc<FacadeClient> {
        &self.client
    }

    /// Mode the engine reported at initialize
    pub fn mode(&self) -> EngineMode {
        self.mode
    }

    /// Whether the ingestion loop consumed the whole dataset
    pub fn job_done(&self) -> bool {
        self.job_done.load(Ordering::SeqCst)
    }

    /// Whether the ingestion worker is still feeding the engine
    pub fn ingestion_running(&self) -> bool {
        self.ingestion_worker
            .lock()
            .map(|worker| worker.as_ref().is_some_and(|handle| !handle.is_finished()))
            .unwrap_or(false)
    }

    pub fn ingestion_metrics(&self) -> &Arc<IngestionMetrics> {
        &self.ingestion_metrics
    }

    /// Number of teardowns run so far
    pub fn teardown_count(&self) -> u64 {
        self.teardowns.load(Ordering::SeqCst)
    }
}
