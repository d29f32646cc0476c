//! 引擎调用与数据摄取指标模块
//!
//! 基于 `metrics` facade 记录指标，并在内存中按操作聚合引擎调用统计。

use std::collections::HashMap;

use contracts::EngineOp;
use metrics::{counter, gauge, histogram};

/// 单次引擎调用的结果（facade client 视角）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallOutcome {
    Ok,
    Timeout,
    Failed,
}

impl CallOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Timeout => "timeout",
            Self::Failed => "failed",
        }
    }
}

/// 记录一次引擎调用
///
/// 每次调用结束（成功、失败或超时）时由 facade client 调用。
///
/// # Example
///
/// ```ignore
/// use observability::metrics::{record_engine_call, CallOutcome};
///
/// record_engine_call(EngineOp::GetPosition, CallOutcome::Ok, 3.2);
/// ```
pub fn record_engine_call(op: EngineOp, outcome: CallOutcome, latency_ms: f64) {
    counter!(
        "carto_bridge_engine_calls_total",
        "operation" => op.as_str(),
        "outcome" => outcome.as_str()
    )
    .increment(1);

    histogram!("carto_bridge_engine_call_latency_ms", "operation" => op.as_str())
        .record(latency_ms);
}

/// 记录被引擎接收的读数
pub fn record_reading_ingested(sensor: &str) {
    counter!(
        "carto_bridge_readings_ingested_total",
        "sensor" => sensor.to_string()
    )
    .increment(1);
}

/// 记录未送达引擎的读数
pub fn record_reading_dropped(sensor: &str, reason: &'static str) {
    counter!(
        "carto_bridge_readings_dropped_total",
        "sensor" => sensor.to_string(),
        "reason" => reason
    )
    .increment(1);
}

/// 记录摄取任务是否已读完数据集
pub fn record_job_done(done: bool) {
    gauge!("carto_bridge_job_done").set(if done { 1.0 } else { 0.0 });
}

/// 记录分块输出的负载
pub fn record_chunks_streamed(kind: &'static str, chunks: usize, bytes: usize) {
    counter!("carto_bridge_chunks_streamed_total", "kind" => kind).increment(chunks as u64);
    counter!("carto_bridge_bytes_streamed_total", "kind" => kind).increment(bytes as u64);
}

/// 引擎调用指标聚合器
///
/// 在内存中按操作聚合指标，便于 CLI 和测试输出会话摘要。
#[derive(Debug, Clone, Default)]
pub struct EngineCallAggregator {
    latency: HashMap<EngineOp, RunningStats>,
    outcomes: HashMap<(EngineOp, CallOutcome), u64>,
}

impl EngineCallAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, op: EngineOp, outcome: CallOutcome, latency_ms: f64) {
        self.latency.entry(op).or_default().push(latency_ms);
        *self.outcomes.entry((op, outcome)).or_insert(0) += 1;
    }

    /// `op` 以 `outcome` 结束的调用次数
    pub fn count(&self, op: EngineOp, outcome: CallOutcome) -> u64 {
        self.outcomes.get(&(op, outcome)).copied().unwrap_or(0)
    }

    /// `op` 的调用总数（不区分结果）
    pub fn total(&self, op: EngineOp) -> u64 {
        self.latency.get(&op).map(RunningStats::count).unwrap_or(0)
    }

    pub fn summary(&self) -> Vec<OperationSummary> {
        EngineOp::ALL
            .iter()
            .filter_map(|op| {
                let stats = self.latency.get(op)?;
                Some(OperationSummary {
                    operation: *op,
                    ok: self.count(*op, CallOutcome::Ok),
                    timeouts: self.count(*op, CallOutcome::Timeout),
                    failures: self.count(*op, CallOutcome::Failed),
                    latency_ms: StatsSummary::from(stats),
                })
            })
            .collect()
    }
}

/// 单个引擎操作的摘要
#[derive(Debug, Clone)]
pub struct OperationSummary {
    pub operation: EngineOp,
    pub ok: u64,
    pub timeouts: u64,
    pub failures: u64,
    pub latency_ms: StatsSummary,
}

impl std::fmt::Display for OperationSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: ok={} timeout={} failed={} latency_ms[{}]",
            self.operation, self.ok, self.timeouts, self.failures, self.latency_ms
        )
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }

        self.min = self.min.min(value);
        self.max = self.max.max(value);

        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}
