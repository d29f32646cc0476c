//! Engine worker - owns the engine and executes one request at a time

use bytes::Bytes;
use contracts::{
    EngineError, EngineMode, EngineOp, EngineState, Position, SensorReading, SlamEngine, SlamError,
};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace};

type Reply<T> = oneshot::Sender<Result<T, SlamError>>;

/// One queued engine call
pub(crate) enum EngineRequest {
    Initialize(Reply<EngineMode>),
    Start(Reply<()>),
    Stop(Reply<()>),
    Terminate(Reply<()>),
    AddSensorReading(SensorReading, Reply<()>),
    GetPosition(Reply<Position>),
    GetPointCloudMap(Reply<Bytes>),
    GetInternalState(Reply<Bytes>),
}

impl EngineRequest {
    pub(crate) fn op(&self) -> EngineOp {
        match self {
            Self::Initialize(_) => EngineOp::Initialize,
            Self::Start(_) => EngineOp::Start,
            Self::Stop(_) => EngineOp::Stop,
            Self::Terminate(_) => EngineOp::Terminate,
            Self::AddSensorReading(..) => EngineOp::AddSensorReading,
            Self::GetPosition(_) => EngineOp::GetPosition,
            Self::GetPointCloudMap(_) => EngineOp::GetPointCloudMap,
            Self::GetInternalState(_) => EngineOp::GetInternalState,
        }
    }

    /// The caller stopped waiting (deadline passed while queued)
    fn is_abandoned(&self) -> bool {
        match self {
            Self::Initialize(tx) => tx.is_closed(),
            Self::Start(tx) | Self::Stop(tx) | Self::Terminate(tx) => tx.is_closed(),
            Self::AddSensorReading(_, tx) => tx.is_closed(),
            Self::GetPosition(tx) => tx.is_closed(),
            Self::GetPointCloudMap(tx) | Self::GetInternalState(tx) => tx.is_closed(),
        }
    }

    /// Answer without touching the engine
    fn reject(self, error: SlamError) {
        match self {
            Self::Initialize(tx) => {
                let _ = tx.send(Err(error));
            }
            Self::Start(tx) | Self::Stop(tx) | Self::Terminate(tx) => {
                let _ = tx.send(Err(error));
            }
            Self::AddSensorReading(_, tx) => {
                let _ = tx.send(Err(error));
            }
            Self::GetPosition(tx) => {
                let _ = tx.send(Err(error));
            }
            Self::GetPointCloudMap(tx) | Self::GetInternalState(tx) => {
                let _ = tx.send(Err(error));
            }
        }
    }
}

/// Worker loop
///
/// Requests are executed strictly in arrival order, so the engine never sees
/// two calls at once. Data requests only reach the engine while it is
/// started; the state is tracked here, in execution order, so a query queued
/// behind `Terminate` is refused rather than run on a dead engine. Exits when
/// `cancel` fires or every sender is dropped.
#[instrument(name = "engine_worker_loop", skip(engine, rx, cancel))]
pub(crate) async fn engine_worker<E: SlamEngine>(
    mut engine: E,
    mut rx: mpsc::Receiver<EngineRequest>,
    cancel: CancellationToken,
) {
    debug!("Engine worker started");
    let mut state = EngineState::Constructed;

    loop {
        let request = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            request = rx.recv() => match request {
                Some(request) => request,
                None => break,
            },
        };

        if request.is_abandoned() {
            trace!(operation = %request.op(), "skipping request abandoned by caller");
            continue;
        }

        let operation = request.op();
        if operation.is_data() && state != EngineState::Started {
            debug!(operation = %operation, state = %state, "refusing data call, engine not started");
            request.reject(SlamError::InvalidState { operation, state });
            continue;
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            accepted = execute(&mut engine, request) => {
                if accepted {
                    state = advance(state, operation);
                }
            }
        }
    }

    debug!("Engine worker stopped");
}

/// State after `operation` succeeded
fn advance(state: EngineState, operation: EngineOp) -> EngineState {
    match operation {
        EngineOp::Initialize => EngineState::Initialized,
        EngineOp::Start => EngineState::Started,
        EngineOp::Stop => EngineState::Stopped,
        EngineOp::Terminate => EngineState::Terminated,
        _ => state,
    }
}

/// Run one request and send its reply; returns whether the engine call succeeded
async fn execute<E: SlamEngine>(engine: &mut E, request: EngineRequest) -> bool {
    // A send error means the caller gave up mid-call; nothing left to do.
    match request {
        EngineRequest::Initialize(tx) => reply(tx, EngineOp::Initialize, engine.initialize().await),
        EngineRequest::Start(tx) => reply(tx, EngineOp::Start, engine.start().await),
        EngineRequest::Stop(tx) => reply(tx, EngineOp::Stop, engine.stop().await),
        EngineRequest::Terminate(tx) => reply(tx, EngineOp::Terminate, engine.terminate().await),
        EngineRequest::AddSensorReading(reading, tx) => reply(
            tx,
            EngineOp::AddSensorReading,
            engine.add_sensor_reading(&reading).await,
        ),
        EngineRequest::GetPosition(tx) => {
            reply(tx, EngineOp::GetPosition, engine.get_position().await)
        }
        EngineRequest::GetPointCloudMap(tx) => {
            reply(tx, EngineOp::GetPointCloudMap, engine.get_point_cloud_map().await)
        }
        EngineRequest::GetInternalState(tx) => {
            reply(tx, EngineOp::GetInternalState, engine.get_internal_state().await)
        }
    }
}

fn reply<T>(tx: Reply<T>, operation: EngineOp, result: Result<T, EngineError>) -> bool {
    let ok = result.is_ok();
    let _ = tx.send(result.map_err(|source| SlamError::EngineFailure { operation, source }));
    ok
}
