//! FacadeClient - bounded, single-flight engine client

use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use bytes::Bytes;
use contracts::{
    EngineMode, EngineOp, EngineState, Position, Result, SensorReading, SlamEngine, SlamError,
};
use observability::{record_engine_call, CallOutcome, EngineCallAggregator};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::worker::{engine_worker, EngineRequest};

/// Queue depth between callers and the engine worker
const REQUEST_QUEUE_CAPACITY: usize = 16;

#[derive(Debug)]
struct Lifecycle {
    state: EngineState,
    initialize_attempted: bool,
    mode: Option<EngineMode>,
}

/// Bounded facade client
///
/// The engine lives on a dedicated worker task; every call is queued to it,
/// so engine calls are totally ordered no matter how many tasks call in.
/// Each call is bounded by `timeout`, measured from the moment the caller
/// starts waiting (queueing included).
pub struct FacadeClient {
    tx: mpsc::Sender<EngineRequest>,
    timeout: Duration,
    /// Held across lifecycle calls so transitions never interleave
    lifecycle: Mutex<Lifecycle>,
    worker: StdMutex<Option<JoinHandle<()>>>,
    stats: Arc<StdMutex<EngineCallAggregator>>,
}

impl FacadeClient {
    /// Move `engine` onto a new worker task
    ///
    /// The worker runs until `workers` is cancelled; wait for it with
    /// [`FacadeClient::join_worker`].
    pub fn spawn<E>(engine: E, timeout: Duration, workers: CancellationToken) -> Self
    where
        E: SlamEngine + 'static,
    {
        let (tx, rx) = mpsc::channel(REQUEST_QUEUE_CAPACITY);
        let worker = tokio::spawn(engine_worker(engine, rx, workers));

        Self {
            tx,
            timeout,
            lifecycle: Mutex::new(Lifecycle {
                state: EngineState::Constructed,
                initialize_attempted: false,
                mode: None,
            }),
            worker: StdMutex::new(Some(worker)),
            stats: Arc::new(StdMutex::new(EngineCallAggregator::new())),
        }
    }

    /// Per-call deadline
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Current lifecycle state
    pub async fn state(&self) -> EngineState {
        self.lifecycle.lock().await.state
    }

    /// Mode reported by a successful `initialize`
    pub async fn mode(&self) -> Option<EngineMode> {
        self.lifecycle.lock().await.mode
    }

    /// Snapshot of per-operation call statistics
    pub fn stats(&self) -> EngineCallAggregator {
        self.stats
            .lock()
            .map(|stats| stats.clone())
            .unwrap_or_default()
    }

    // ===== Lifecycle =====

    /// `Constructed -> Initialized`; only one attempt is allowed
    #[instrument(name = "facade_initialize", skip(self))]
    pub async fn initialize(&self) -> Result<EngineMode> {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.state != EngineState::Constructed || lifecycle.initialize_attempted {
            return Err(SlamError::InvalidState {
                operation: EngineOp::Initialize,
                state: lifecycle.state,
            });
        }
        lifecycle.initialize_attempted = true;

        let mode = self
            .call(EngineOp::Initialize, EngineRequest::Initialize)
            .await?;
        lifecycle.state = EngineState::Initialized;
        lifecycle.mode = Some(mode);
        info!(mode = %mode, "engine initialized");
        Ok(mode)
    }

    /// `Initialized -> Started`
    #[instrument(name = "facade_start", skip(self))]
    pub async fn start(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.state != EngineState::Initialized {
            return Err(SlamError::InvalidState {
                operation: EngineOp::Start,
                state: lifecycle.state,
            });
        }

        self.call(EngineOp::Start, EngineRequest::Start).await?;
        lifecycle.state = EngineState::Started;
        info!("engine started");
        Ok(())
    }

    /// `Started -> Stopped`; a no-op unless the engine is running
    #[instrument(name = "facade_stop", skip(self))]
    pub async fn stop(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.state != EngineState::Started {
            debug!(state = %lifecycle.state, "stop skipped, engine not started");
            return Ok(());
        }

        self.call(EngineOp::Stop, EngineRequest::Stop).await?;
        lifecycle.state = EngineState::Stopped;
        info!("engine stopped");
        Ok(())
    }

    /// `Initialized | Started | Stopped -> Terminated`
    ///
    /// A no-op when the engine was never initialized or is already terminated.
    #[instrument(name = "facade_terminate", skip(self))]
    pub async fn terminate(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock().await;
        match lifecycle.state {
            EngineState::Constructed | EngineState::Terminated => {
                debug!(state = %lifecycle.state, "terminate skipped");
                return Ok(());
            }
            EngineState::Initialized | EngineState::Started | EngineState::Stopped => {}
        }

        self.call(EngineOp::Terminate, EngineRequest::Terminate)
            .await?;
        lifecycle.state = EngineState::Terminated;
        info!("engine terminated");
        Ok(())
    }

    /// Initialize then start, terminating the engine if start fails
    ///
    /// On start failure the start error is returned even when the rollback
    /// terminate fails too; the terminate error is only logged.
    #[instrument(name = "facade_initialize_and_start", skip(self))]
    pub async fn initialize_and_start(&self) -> Result<EngineMode> {
        let mode = self.initialize().await.inspect_err(|e| {
            error!(error = %e, "engine initialize failed");
        })?;

        if let Err(start_err) = self.start().await {
            error!(error = %start_err, "engine start failed, terminating");
            if let Err(term_err) = self.terminate().await {
                error!(error = %term_err, "engine terminate failed during rollback");
            }
            return Err(start_err);
        }

        Ok(mode)
    }

    // ===== Data =====

    /// Feed one reading to the engine
    pub async fn add_sensor_reading(&self, reading: SensorReading) -> Result<()> {
        self.ensure_started(EngineOp::AddSensorReading)?;
        self.call(EngineOp::AddSensorReading, |tx| {
            EngineRequest::AddSensorReading(reading, tx)
        })
        .await
    }

    pub async fn get_position(&self) -> Result<Position> {
        self.ensure_started(EngineOp::GetPosition)?;
        self.call(EngineOp::GetPosition, EngineRequest::GetPosition)
            .await
    }

    pub async fn get_point_cloud_map(&self) -> Result<Bytes> {
        self.ensure_started(EngineOp::GetPointCloudMap)?;
        self.call(EngineOp::GetPointCloudMap, EngineRequest::GetPointCloudMap)
            .await
    }

    pub async fn get_internal_state(&self) -> Result<Bytes> {
        self.ensure_started(EngineOp::GetInternalState)?;
        self.call(EngineOp::GetInternalState, EngineRequest::GetInternalState)
            .await
    }

    /// Fail fast when the engine is visibly not started
    ///
    /// Never waits on the lifecycle lock. While a transition holds it the
    /// request goes through and the worker, which sees calls in execution
    /// order, refuses it if the engine is no longer started.
    fn ensure_started(&self, operation: EngineOp) -> Result<()> {
        let Ok(lifecycle) = self.lifecycle.try_lock() else {
            return Ok(());
        };
        if lifecycle.state != EngineState::Started {
            return Err(SlamError::InvalidState {
                operation,
                state: lifecycle.state,
            });
        }
        Ok(())
    }

    // ===== Worker =====

    /// Wait for the engine worker to exit
    ///
    /// Call after cancelling the worker token. Later calls return immediately.
    #[instrument(name = "facade_join_worker", skip(self))]
    pub async fn join_worker(&self) {
        let handle = self.worker.lock().ok().and_then(|mut worker| worker.take());
        let Some(handle) = handle else {
            return;
        };
        if let Err(e) = handle.await {
            error!(error = ?e, "Engine worker panicked");
        }
        debug!("engine worker joined");
    }

    /// Queue one request and wait for its reply under the deadline
    async fn call<T>(
        &self,
        op: EngineOp,
        make_request: impl FnOnce(oneshot::Sender<Result<T>>) -> EngineRequest,
    ) -> Result<T> {
        let started = Instant::now();
        debug!(operation = %op, "engine call started");

        let (reply_tx, reply_rx) = oneshot::channel();
        let exchange = async {
            self.tx
                .send(make_request(reply_tx))
                .await
                .map_err(|_| SlamError::WorkerGone { operation: op })?;
            reply_rx
                .await
                .map_err(|_| SlamError::WorkerGone { operation: op })?
        };

        let result = match tokio::time::timeout(self.timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(SlamError::EngineTimeout {
                operation: op,
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        };

        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        let outcome = match &result {
            Ok(_) => CallOutcome::Ok,
            Err(SlamError::EngineTimeout { .. }) => CallOutcome::Timeout,
            Err(_) => CallOutcome::Failed,
        };
        record_engine_call(op, outcome, latency_ms);
        if let Ok(mut stats) = self.stats.lock() {
            stats.update(op, outcome, latency_ms);
        }

        match &result {
            Ok(_) => debug!(operation = %op, latency_ms, "engine call finished"),
            Err(e) => warn!(operation = %op, latency_ms, error = %e, "engine call failed"),
        }

        result
    }
}
