//! 回放传感器：读取录制的数据集
//!
//! 数据集目录包含一个 `readings.jsonl` 索引（每行一条记录），以及每个读数对应的
//! 二进制负载文件：
//!
//! ```text
//! {"sensor_id":"rplidar","captured_at":"2024-01-01T00:00:00Z","data_file":"frames/000001.pcd"}
//! ```
//!
//! 读数按采集时间顺序输出；最后一个读数之后返回 `SensorError::Exhausted`。

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use contracts::{SensorError, SensorReading, TimedSensor};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{IngestionError, Result};

/// 数据集目录中的索引文件名
pub const READINGS_INDEX_FILE: &str = "readings.jsonl";

/// 数据集索引中的一行
#[derive(Debug, Clone, Deserialize)]
struct ReadingRecord {
    sensor_id: String,
    captured_at: DateTime<Utc>,
    data_file: String,
}

/// 回放传感器
pub struct ReplaySensor {
    name: String,
    dataset_dir: PathBuf,
    records: Vec<ReadingRecord>,
    cursor: AtomicUsize,
}

impl ReplaySensor {
    /// 从数据集目录加载 `sensor_name` 的读数
    pub fn load(dataset_dir: &Path, sensor_name: &str) -> Result<Self> {
        let index_path = dataset_dir.join(READINGS_INDEX_FILE);
        let file = File::open(&index_path).map_err(|source| IngestionError::DatasetIo {
            path: index_path.clone(),
            source,
        })?;

        let mut records = Vec::new();
        let mut skipped = 0usize;

        for (i, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|source| IngestionError::DatasetIo {
                path: index_path.clone(),
                source,
            })?;
            if line.trim().is_empty() {
                continue;
            }

            let record: ReadingRecord = serde_json::from_str(&line)
                .map_err(|e| IngestionError::invalid_record(&index_path, i + 1, e.to_string()))?;

            if record.sensor_id == sensor_name {
                records.push(record);
            } else {
                skipped += 1;
            }
        }

        // 稳定排序：时间戳相同时保持文件顺序
        records.sort_by_key(|r| r.captured_at);

        info!(
            sensor = %sensor_name,
            records = records.len(),
            skipped,
            "Loaded replay dataset"
        );

        Ok(Self {
            name: sensor_name.to_string(),
            dataset_dir: dataset_dir.to_path_buf(),
            records,
            cursor: AtomicUsize::new(0),
        })
    }

    /// 数据集中的读数总数
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 尚未输出的读数数量
    pub fn remaining(&self) -> usize {
        self.records
            .len()
            .saturating_sub(self.cursor.load(Ordering::SeqCst))
    }
}

impl TimedSensor for ReplaySensor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn timed_reading(&self) -> std::result::Result<SensorReading, SensorError> {
        let index = self.cursor.fetch_add(1, Ordering::SeqCst);
        let Some(record) = self.records.get(index) else {
            // Keep the cursor pinned at the end
            self.cursor.store(self.records.len(), Ordering::SeqCst);
            return Err(SensorError::exhausted(&self.name));
        };

        let path = self.dataset_dir.join(&record.data_file);
        let payload = tokio::fs::read(&path).await.map_err(|e| {
            warn!(path = %path.display(), error = %e, "Failed to read payload file");
            SensorError::unavailable(&self.name, format!("{}: {e}", path.display()))
        })?;

        debug!(index, captured_at = %record.captured_at, bytes = payload.len(), "replayed reading");
        Ok(SensorReading::new(
            &self.name,
            record.captured_at,
            Bytes::from(payload),
        ))
    }
}
