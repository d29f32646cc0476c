//! Mock 传感器
//!
//! 可编排的 `TimedSensor`，用于测试与 dry run。

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use contracts::{SensorError, SensorReading, TimedSensor};
use tracing::trace;

/// Mock 传感器配置
#[derive(Debug, Clone)]
pub struct MockSensorConfig {
    /// 传感器名称
    pub name: String,

    /// 数据结束前的读数数量；`None` 表示永不结束
    pub readings: Option<u64>,

    /// 每个读数的负载大小
    pub payload_len: usize,

    /// 第一个读数之前以 `Unavailable` 失败的读取次数
    pub unavailable_first: u64,

    /// 每次读取耗时
    pub read_delay: Duration,

    /// 数据结束时报告 `Unavailable` 而非 `Exhausted`
    pub fail_at_end: bool,
}

impl Default for MockSensorConfig {
    fn default() -> Self {
        Self {
            name: "mock_lidar".to_string(),
            readings: None,
            payload_len: 64,
            unavailable_first: 0,
            read_delay: Duration::ZERO,
            fail_at_end: false,
        }
    }
}

impl MockSensorConfig {
    /// 产生 `readings` 个读数后返回 `Exhausted`
    pub fn finite(name: &str, readings: u64) -> Self {
        Self {
            name: name.to_string(),
            readings: Some(readings),
            ..Default::default()
        }
    }

    /// 永不耗尽数据的传感器
    pub fn endless(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }
}

/// Mock 传感器
pub struct MockSensor {
    config: MockSensorConfig,
    attempts: AtomicU64,
    produced: AtomicU64,
}

impl MockSensor {
    pub fn new(config: MockSensorConfig) -> Self {
        Self {
            config,
            attempts: AtomicU64::new(0),
            produced: AtomicU64::new(0),
        }
    }

    /// 目前为止 `timed_reading` 的调用次数
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// 目前为止已产出的读数数量
    pub fn produced(&self) -> u64 {
        self.produced.load(Ordering::SeqCst)
    }
}

impl TimedSensor for MockSensor {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn timed_reading(&self) -> Result<SensorReading, SensorError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.config.read_delay.is_zero() {
            tokio::time::sleep(self.config.read_delay).await;
        }

        if attempt <= self.config.unavailable_first {
            return Err(SensorError::unavailable(
                &self.config.name,
                format!("no data yet (attempt {attempt})"),
            ));
        }

        let index = self.produced.load(Ordering::SeqCst);
        if self.config.readings.is_some_and(|limit| index >= limit) {
            return Err(if self.config.fail_at_end {
                SensorError::unavailable(&self.config.name, "sensor disconnected")
            } else {
                SensorError::exhausted(&self.config.name)
            });
        }
        self.produced.fetch_add(1, Ordering::SeqCst);

        trace!(sensor = %self.config.name, index, "mock reading");
        let payload = Bytes::from(vec![(index % 256) as u8; self.config.payload_len]);
        Ok(SensorReading::new(&self.config.name, Utc::now(), payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_finite_sensor_exhausts() {
        let sensor = MockSensor::new(MockSensorConfig::finite("lidar", 2));
        assert!(sensor.timed_reading().await.is_ok());
        assert!(sensor.timed_reading().await.is_ok());

        let err = sensor.timed_reading().await.unwrap_err();
        assert!(err.is_exhausted());
        assert_eq!(sensor.produced(), 2);
        assert_eq!(sensor.attempts(), 3);
    }

    #[tokio::test]
    async fn test_unavailable_first() {
        let sensor = MockSensor::new(MockSensorConfig {
            unavailable_first: 2,
            ..MockSensorConfig::endless("lidar")
        });
        assert!(matches!(
            sensor.timed_reading().await,
            Err(SensorError::Unavailable { .. })
        ));
        assert!(sensor.timed_reading().await.is_err());

        let reading = sensor.timed_reading().await.unwrap();
        assert_eq!(reading.sensor_id, "lidar");
        assert_eq!(reading.payload.len(), 64);
    }
}
