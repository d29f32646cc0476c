//! Mock SLAM 引擎
//!
//! 用于测试与 dry run 的 `SlamEngine` 实现，支持故障注入与调用区间记录。

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use contracts::{
    AlgoConfig, EngineConfig, EngineError, EngineLibrary, EngineMode, EngineOp, Position,
    Quaternion, SensorReading, SlamEngine,
};
use tracing::{debug, instrument};

/// 累积地图负载的大小上限
const MAX_ACCUMULATED_MAP_BYTES: usize = 64 * 1024 * 1024;

/// Mock 引擎配置
#[derive(Debug, Clone, Default)]
pub struct MockEngineConfig {
    /// `initialize` 返回的模式
    pub mode: Option<EngineMode>,
    /// 每次调用耗时
    pub call_delay: Duration,
    /// 返回引擎错误的操作
    pub fail_on: Vec<EngineOp>,
    /// 永不完成的操作
    pub hang_on: Vec<EngineOp>,
    /// 固定位姿；默认由读数数量推导
    pub position: Option<Position>,
    /// 固定地图；默认为读数负载的拼接
    pub point_cloud_map: Option<Bytes>,
    /// 固定内部状态；默认为 JSON 摘要
    pub internal_state: Option<Bytes>,
}

/// Start and end of one engine call
#[derive(Debug, Clone, Copy)]
pub struct CallSpan {
    pub op: EngineOp,
    pub started: Instant,
    pub ended: Instant,
}

impl CallSpan {
    fn overlaps(&self, other: &CallSpan) -> bool {
        self.started < other.ended && other.started < self.ended
    }
}

#[derive(Debug, Default)]
struct RecorderState {
    spans: Vec<CallSpan>,
    calls: HashMap<EngineOp, u64>,
    in_flight: usize,
    max_in_flight: usize,
}

/// 记录 Mock 引擎收到的所有调用（共享）
#[derive(Debug, Default)]
pub struct CallRecorder {
    state: Mutex<RecorderState>,
}

impl CallRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// `op` 的调用次数（包括失败和被放弃的调用）
    pub fn calls(&self, op: EngineOp) -> u64 {
        self.state
            .lock()
            .map(|s| s.calls.get(&op).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// 观察到的最大并发调用数
    pub fn max_in_flight(&self) -> usize {
        self.state.lock().map(|s| s.max_in_flight).unwrap_or(0)
    }

    /// 已完成的调用区间，按完成顺序
    pub fn spans(&self) -> Vec<CallSpan> {
        self.state
            .lock()
            .map(|s| s.spans.clone())
            .unwrap_or_default()
    }

    /// 第一对时间上重叠的调用区间（如有）
    pub fn overlapping_spans(&self) -> Option<(CallSpan, CallSpan)> {
        let mut spans = self.spans();
        spans.sort_by_key(|s| s.started);
        spans
            .windows(2)
            .find(|pair| pair[0].overlaps(&pair[1]))
            .map(|pair| (pair[0], pair[1]))
    }

    fn enter(&self, op: EngineOp) -> CallGuard<'_> {
        if let Ok(mut state) = self.state.lock() {
            *state.calls.entry(op).or_insert(0) += 1;
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
        }
        CallGuard {
            recorder: self,
            op,
            started: Instant::now(),
        }
    }
}

/// Records the end of a call, also when the call future is dropped mid-way
struct CallGuard<'a> {
    recorder: &'a CallRecorder,
    op: EngineOp,
    started: Instant,
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.recorder.state.lock() {
            state.in_flight = state.in_flight.saturating_sub(1);
            state.spans.push(CallSpan {
                op: self.op,
                started: self.started,
                ended: Instant::now(),
            });
        }
    }
}

/// Mock 引擎
pub struct MockEngine {
    config: MockEngineConfig,
    recorder: Arc<CallRecorder>,
    readings: u64,
    last_reading_at: Option<DateTime<Utc>>,
    map: BytesMut,
}

impl MockEngine {
    pub fn new(config: MockEngineConfig, recorder: Arc<CallRecorder>) -> Self {
        Self {
            config,
            recorder,
            readings: 0,
            last_reading_at: None,
            map: BytesMut::new(),
        }
    }

    /// 模拟一次调用：记录、等待，然后应用故障注入
    async fn simulate(&self, op: EngineOp) -> Result<(), EngineError> {
        let _guard = self.recorder.enter(op);

        if self.config.hang_on.contains(&op) {
            std::future::pending::<()>().await;
        }
        if !self.config.call_delay.is_zero() {
            tokio::time::sleep(self.config.call_delay).await;
        }
        if self.config.fail_on.contains(&op) {
            return Err(EngineError::new(format!("mock {op} failure")));
        }
        Ok(())
    }
}

impl SlamEngine for MockEngine {
    async fn initialize(&mut self) -> Result<EngineMode, EngineError> {
        self.simulate(EngineOp::Initialize).await?;
        Ok(self.config.mode.unwrap_or(EngineMode::Mapping))
    }

    async fn start(&mut self) -> Result<(), EngineError> {
        self.simulate(EngineOp::Start).await
    }

    async fn stop(&mut self) -> Result<(), EngineError> {
        self.simulate(EngineOp::Stop).await
    }

    async fn terminate(&mut self) -> Result<(), EngineError> {
        self.simulate(EngineOp::Terminate).await
    }

    async fn add_sensor_reading(&mut self, reading: &SensorReading) -> Result<(), EngineError> {
        self.simulate(EngineOp::AddSensorReading).await?;
        self.readings += 1;
        self.last_reading_at = Some(reading.captured_at);
        if self.map.len() + reading.payload.len() <= MAX_ACCUMULATED_MAP_BYTES {
            self.map.extend_from_slice(&reading.payload);
        }
        Ok(())
    }

    async fn get_position(&mut self) -> Result<Position, EngineError> {
        self.simulate(EngineOp::GetPosition).await?;
        Ok(self.config.position.clone().unwrap_or_else(|| {
            Position::with_quaternion(self.readings as f64 * 0.1, 0.0, 0.0, Quaternion::identity())
        }))
    }

    async fn get_point_cloud_map(&mut self) -> Result<Bytes, EngineError> {
        self.simulate(EngineOp::GetPointCloudMap).await?;
        Ok(self
            .config
            .point_cloud_map
            .clone()
            .unwrap_or_else(|| Bytes::copy_from_slice(&self.map)))
    }

    async fn get_internal_state(&mut self) -> Result<Bytes, EngineError> {
        self.simulate(EngineOp::GetInternalState).await?;
        if let Some(state) = &self.config.internal_state {
            return Ok(state.clone());
        }
        let summary = serde_json::json!({
            "readings": self.readings,
            "map_bytes": self.map.len(),
            "last_reading_at": self.last_reading_at,
        });
        serde_json::to_vec(&summary)
            .map(Bytes::from)
            .map_err(|e| EngineError::new(format!("encode internal state: {e}")))
    }
}

/// Mock 引擎库
///
/// 创建共享同一个 `CallRecorder` 的 `MockEngine`。
pub struct MockEngineLibrary {
    config: MockEngineConfig,
    recorder: Arc<CallRecorder>,
    fail_create: bool,
    created: AtomicUsize,
    terminated: AtomicBool,
}

impl MockEngineLibrary {
    pub fn new(config: MockEngineConfig) -> Self {
        Self {
            config,
            recorder: Arc::new(CallRecorder::new()),
            fail_create: false,
            created: AtomicUsize::new(0),
            terminated: AtomicBool::new(false),
        }
    }

    /// `create_engine` 总是失败的引擎库
    pub fn failing(config: MockEngineConfig) -> Self {
        Self {
            fail_create: true,
            ..Self::new(config)
        }
    }

    pub fn recorder(&self) -> Arc<CallRecorder> {
        Arc::clone(&self.recorder)
    }

    pub fn engines_created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }
}

impl EngineLibrary for MockEngineLibrary {
    type Engine = MockEngine;

    #[instrument(
        name = "mock_library_create_engine",
        skip(self, config, algo),
        fields(component = %config.component_reference)
    )]
    fn create_engine(
        &self,
        config: &EngineConfig,
        algo: &AlgoConfig,
    ) -> Result<MockEngine, EngineError> {
        if self.fail_create {
            return Err(EngineError::new("mock library refused to create engine"));
        }
        if self.is_terminated() {
            return Err(EngineError::new("engine library already terminated"));
        }
        debug!(
            sensors = ?config.sensors,
            max_range = algo.max_range,
            "creating mock engine"
        );
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(MockEngine::new(self.config.clone(), Arc::clone(&self.recorder)))
    }

    fn terminate(&self) -> Result<(), EngineError> {
        if self.terminated.swap(true, Ordering::SeqCst) {
            return Err(EngineError::new("engine library terminated twice"));
        }
        Ok(())
    }
}
