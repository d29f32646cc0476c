//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 配置文件到运行中服务
//! - 模拟 e2e 会话（无需真实引擎）
//! - 并发负载下的单飞调用与关闭顺序保证

#[cfg(test)]
mod contract_tests {
    use contracts::{EngineError, SensorError, SlamError};

    fn assert_error_bounds<E: std::error::Error + Send + Sync + 'static>() {}

    /// Every error crossing a task boundary or wrapped by anyhow
    #[test]
    fn test_errors_are_thread_safe() {
        assert_error_bounds::<SlamError>();
        assert_error_bounds::<EngineError>();
        assert_error_bounds::<SensorError>();
        assert_error_bounds::<ingestion::IngestionError>();
    }
}

#[cfg(test)]
mod test_support {
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    use contracts::{AlgoConfig, SensorValidationConfig, ServiceConfig, SubAlgo};
    use serde_json::{Map, Value};
    use slam_service::{SlamService, JOB_DONE_COMMAND};

    pub fn service_config(sensor: &str, data_rate_ms: u64, facade_timeout_ms: u64) -> ServiceConfig {
        ServiceConfig {
            sensors: vec![sensor.to_string()],
            sub_algo: SubAlgo::Dim2d,
            data_dir: PathBuf::from("/tmp/carto-bridge-e2e"),
            data_rate_ms,
            map_rate_sec: 60,
            facade_timeout_ms,
            sensor_validation: SensorValidationConfig {
                max_timeout_sec: 1,
                interval_sec: 1,
            },
            algo: AlgoConfig::default(),
        }
    }

    pub fn job_done_request() -> Map<String, Value> {
        let mut request = Map::new();
        request.insert(JOB_DONE_COMMAND.to_string(), Value::Bool(true));
        request
    }

    /// Poll `job_done` through the command surface until it turns true
    pub async fn wait_for_job_done(service: &SlamService, limit: Duration) -> bool {
        let request = job_done_request();
        let polled = tokio::time::timeout(limit, async {
            loop {
                let response = service.do_command(&request).await.unwrap();
                if response[JOB_DONE_COMMAND] == Value::Bool(true) {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        polled.is_ok()
    }

    /// Write a replay dataset with `count` readings of `payload_len` bytes
    pub fn write_dataset(dir: &Path, sensor: &str, count: usize, payload_len: usize) -> Vec<Vec<u8>> {
        use std::io::Write;

        let mut index = std::fs::File::create(dir.join(ingestion::READINGS_INDEX_FILE)).unwrap();
        let mut payloads = Vec::with_capacity(count);
        for i in 0..count {
            let payload = vec![(i % 251) as u8; payload_len];
            let data_file = format!("{sensor}_{i:04}.bin");
            std::fs::write(dir.join(&data_file), &payload).unwrap();
            writeln!(
                index,
                r#"{{"sensor_id":"{sensor}","captured_at":"2024-03-01T12:00:{:02}.{:03}Z","data_file":"{data_file}"}}"#,
                i / 1000,
                i % 1000
            )
            .unwrap();
            payloads.push(payload);
        }
        payloads
    }
}

#[cfg(test)]
mod config_tests {
    use std::io::Write;
    use std::time::Duration;

    use config_loader::ConfigLoader;
    use contracts::EngineLibrary;
    use engine_facade::{MockEngineConfig, MockEngineLibrary};
    use ingestion::{MockSensor, MockSensorConfig};
    use slam_service::SlamService;

    use super::test_support::wait_for_job_done;

    /// Config file -> ConfigLoader -> running service
    #[tokio::test]
    async fn test_config_file_to_running_service() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(
            br#"
sensors = ["rplidar", "imu"]
data_dir = "/tmp/carto-bridge-e2e"
data_rate_msec = 5
facade_timeout_ms = 1000

[sensor_validation]
max_timeout_sec = 1

[config_params]
mode = "2d"
num_range_data = "50"
"#,
        )
        .unwrap();

        let config = ConfigLoader::load_from_path(file.path()).unwrap();
        assert_eq!(config.algo.num_range_data, 50);

        let library = MockEngineLibrary::new(MockEngineConfig::default());
        let sensor = MockSensor::new(MockSensorConfig::finite("rplidar", 4));
        let service = SlamService::new(&library, config, sensor).await.unwrap();

        let (_, component) = service.get_position().await.unwrap();
        assert_eq!(component, "rplidar");
        assert!(wait_for_job_done(&service, Duration::from_secs(5)).await);
        assert_eq!(service.ingestion_metrics().readings_ingested, 3);

        service.close().await.unwrap();
        library.terminate().unwrap();
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use bytes::{Bytes, BytesMut};
    use contracts::{EngineLibrary, EngineMode, EngineOp, SlamError};
    use engine_facade::{MockEngineConfig, MockEngineLibrary};
    use ingestion::{MockSensor, MockSensorConfig, ReplaySensor};
    use rand::Rng;
    use slam_service::{SlamService, CHUNK_SIZE_BYTES};

    use super::test_support::{job_done_request, service_config, wait_for_job_done, write_dataset};

    /// Ingestion plus many concurrent queriers never put two calls on the
    /// engine at once
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_no_overlapping_engine_calls_under_load() {
        let library = MockEngineLibrary::new(MockEngineConfig {
            call_delay: Duration::from_millis(1),
            ..Default::default()
        });
        let recorder = library.recorder();
        let sensor = MockSensor::new(MockSensorConfig::endless("lidar"));
        let service = Arc::new(
            SlamService::new(&library, service_config("lidar", 1, 2_000), sensor)
                .await
                .unwrap(),
        );

        let mut queriers = Vec::new();
        for worker in 0..8 {
            let service = Arc::clone(&service);
            queriers.push(tokio::spawn(async move {
                for round in 0..10 {
                    match (worker + round) % 3 {
                        0 => {
                            service.get_position().await.unwrap();
                        }
                        1 => {
                            service.get_point_cloud_map().await.unwrap();
                        }
                        _ => {
                            service.get_internal_state().await.unwrap();
                        }
                    }
                }
            }));
        }
        for querier in queriers {
            querier.await.unwrap();
        }

        service.close().await.unwrap();

        assert!(recorder.calls(EngineOp::AddSensorReading) > 0);
        assert_eq!(
            recorder.calls(EngineOp::GetPosition)
                + recorder.calls(EngineOp::GetPointCloudMap)
                + recorder.calls(EngineOp::GetInternalState),
            80
        );
        assert_eq!(recorder.max_in_flight(), 1);
        assert!(
            recorder.overlapping_spans().is_none(),
            "overlap: {:?}",
            recorder.overlapping_spans()
        );
        library.terminate().unwrap();
    }

    /// End-to-end test: ReplaySensor -> SlamService -> chunked map
    ///
    /// 验证完整的数据流：
    /// 1. ReplaySensor 按索引回放数据集
    /// 2. 读完数据集后 job_done 置为 true
    /// 3. 导出的地图与摄取的负载一致
    #[tokio::test]
    async fn test_replay_dataset_to_job_done() {
        let dataset = tempfile::tempdir().unwrap();
        let payloads = write_dataset(dataset.path(), "rplidar", 12, 256);

        let library = MockEngineLibrary::new(MockEngineConfig::default());
        let sensor = ReplaySensor::load(dataset.path(), "rplidar").unwrap();
        assert_eq!(sensor.len(), 12);

        let service = SlamService::new(&library, service_config("rplidar", 2, 1_000), sensor)
            .await
            .unwrap();
        assert!(wait_for_job_done(&service, Duration::from_secs(5)).await);
        assert!(service.job_done());

        // The startup check consumed the first reading
        let metrics = service.ingestion_metrics();
        assert_eq!(metrics.readings_ingested, 11);
        assert_eq!(metrics.readings_dropped, 0);

        let mut map = BytesMut::new();
        for chunk in service.get_point_cloud_map().await.unwrap() {
            map.extend_from_slice(&chunk);
        }
        let expected: Vec<u8> = payloads[1..].concat();
        assert_eq!(&map[..], &expected[..]);

        let state: Vec<u8> = service.get_internal_state().await.unwrap().flat_map(|c| c.to_vec()).collect();
        let state: serde_json::Value = serde_json::from_slice(&state).unwrap();
        assert_eq!(state["readings"], 11);

        service.close().await.unwrap();
        library.terminate().unwrap();
    }

    /// Maps larger than one chunk arrive as ordered, bounded chunks
    #[tokio::test]
    async fn test_large_map_streamed_in_chunks() {
        let mut rng = rand::rng();
        let len = rng.random_range(2 * CHUNK_SIZE_BYTES + 1..4 * CHUNK_SIZE_BYTES);
        let mut payload = vec![0u8; len];
        rng.fill(&mut payload[..]);
        let map = Bytes::from(payload);

        let library = MockEngineLibrary::new(MockEngineConfig {
            point_cloud_map: Some(map.clone()),
            ..Default::default()
        });
        let sensor = MockSensor::new(MockSensorConfig::endless("lidar"));
        let service = SlamService::new(&library, service_config("lidar", 50, 1_000), sensor)
            .await
            .unwrap();

        let stream = service.get_point_cloud_map().await.unwrap();
        assert_eq!(stream.len(), len.div_ceil(CHUNK_SIZE_BYTES));

        let chunks: Vec<Bytes> = stream.collect();
        assert!(chunks.iter().all(|c| !c.is_empty() && c.len() <= CHUNK_SIZE_BYTES));
        assert_eq!(chunks.concat(), map.to_vec());

        service.close().await.unwrap();
        library.terminate().unwrap();
    }

    /// Concurrent closes tear down exactly once; everything after fails closed
    #[tokio::test]
    async fn test_close_is_idempotent_under_concurrency() {
        let library = MockEngineLibrary::new(MockEngineConfig::default());
        let recorder = library.recorder();
        let sensor = MockSensor::new(MockSensorConfig::endless("lidar"));
        let service = Arc::new(
            SlamService::new(&library, service_config("lidar", 5, 1_000), sensor)
                .await
                .unwrap(),
        );

        let closers: Vec<_> = (0..4)
            .map(|_| {
                let service = Arc::clone(&service);
                tokio::spawn(async move { service.close().await })
            })
            .collect();
        for closer in closers {
            closer.await.unwrap().unwrap();
        }

        assert_eq!(service.teardown_count(), 1);
        assert_eq!(recorder.calls(EngineOp::Stop), 1);
        assert_eq!(recorder.calls(EngineOp::Terminate), 1);
        assert!(!service.ingestion_running());

        assert!(matches!(service.get_position().await, Err(SlamError::ServiceClosed)));
        assert!(matches!(
            service.get_point_cloud_map().await,
            Err(SlamError::ServiceClosed)
        ));
        assert!(matches!(
            service.get_internal_state().await,
            Err(SlamError::ServiceClosed)
        ));
        assert!(matches!(
            service.get_latest_map_info().await,
            Err(SlamError::ServiceClosed)
        ));
        assert!(matches!(
            service.do_command(&job_done_request()).await,
            Err(SlamError::ServiceClosed)
        ));

        library.terminate().unwrap();
        assert!(library.is_terminated());
    }

    /// Close ordering
    ///
    /// 验证关闭顺序：
    /// 1. 所有 AddSensorReading 在 Stop 开始前结束
    /// 2. Terminate 在 Stop 结束后才开始
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_close_orders_teardown_after_ingestion() {
        let library = MockEngineLibrary::new(MockEngineConfig {
            call_delay: Duration::from_millis(2),
            ..Default::default()
        });
        let recorder = library.recorder();
        let sensor = MockSensor::new(MockSensorConfig::endless("lidar"));
        let service = SlamService::new(&library, service_config("lidar", 1, 1_000), sensor)
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(service.ingestion_running());
        service.close().await.unwrap();

        let spans = recorder.spans();
        let of = |op: EngineOp| spans.iter().filter(|s| s.op == op).copied().collect::<Vec<_>>();
        let adds = of(EngineOp::AddSensorReading);
        let stops = of(EngineOp::Stop);
        let terminates = of(EngineOp::Terminate);
        assert!(!adds.is_empty());
        assert_eq!(stops.len(), 1);
        assert_eq!(terminates.len(), 1);

        let stop = stops[0];
        for add in &adds {
            assert!(add.ended <= stop.started, "reading still in the engine when stop began");
        }
        assert!(terminates[0].started >= stop.ended);
        assert!(recorder.overlapping_spans().is_none());

        library.terminate().unwrap();
    }

    /// A failed start is rolled back before construction reports the error
    #[tokio::test]
    async fn test_start_failure_rolls_back() {
        let library = MockEngineLibrary::new(MockEngineConfig {
            fail_on: vec![EngineOp::Start],
            ..Default::default()
        });
        let recorder = library.recorder();
        let sensor = MockSensor::new(MockSensorConfig::endless("lidar"));

        let result = SlamService::new(&library, service_config("lidar", 5, 1_000), sensor).await;
        assert!(matches!(
            result,
            Err(SlamError::EngineFailure {
                operation: EngineOp::Start,
                ..
            })
        ));
        assert_eq!(recorder.calls(EngineOp::Terminate), 1);
        assert_eq!(recorder.calls(EngineOp::AddSensorReading), 0);

        library.terminate().unwrap();
    }

    /// A hung engine call bounds close instead of blocking it
    #[tokio::test]
    async fn test_hung_engine_does_not_block_close() {
        let library = MockEngineLibrary::new(MockEngineConfig {
            hang_on: vec![EngineOp::GetPosition],
            ..Default::default()
        });
        let sensor = MockSensor::new(MockSensorConfig::endless("lidar"));
        let service = SlamService::new(&library, service_config("lidar", 5, 50), sensor)
            .await
            .unwrap();

        let err = service.get_position().await.unwrap_err();
        assert!(err.is_timeout());

        // The engine is still stuck, so stop and terminate time out too
        let closed = tokio::time::timeout(Duration::from_secs(5), service.close())
            .await
            .expect("close must not hang");
        assert!(closed.unwrap_err().is_timeout());
        assert!(service.is_closed().await);

        library.terminate().unwrap();
    }

    /// Localizing reports the session start as the map time, no matter how
    /// often the map is fetched
    #[tokio::test]
    async fn test_localizing_map_time_is_fixed() {
        let library = MockEngineLibrary::new(MockEngineConfig {
            mode: Some(EngineMode::Localizing),
            ..Default::default()
        });
        let sensor = MockSensor::new(MockSensorConfig::endless("lidar"));
        let service = SlamService::new(&library, service_config("lidar", 5, 1_000), sensor)
            .await
            .unwrap();
        assert_eq!(service.mode(), EngineMode::Localizing);

        let started = service.get_latest_map_info().await.unwrap();
        for _ in 0..3 {
            tokio::time::sleep(Duration::from_millis(5)).await;
            service.get_point_cloud_map().await.unwrap();
        }
        assert_eq!(service.get_latest_map_info().await.unwrap(), started);

        service.close().await.unwrap();
        library.terminate().unwrap();
    }

    /// The library refuses new engines once terminated
    #[tokio::test]
    async fn test_library_terminated_after_all_services() {
        let library = MockEngineLibrary::new(MockEngineConfig::default());

        let first = SlamService::new(
            &library,
            service_config("lidar", 5, 1_000),
            MockSensor::new(MockSensorConfig::endless("lidar")),
        )
        .await
        .unwrap();
        first.close().await.unwrap();
        library.terminate().unwrap();

        let second = SlamService::new(
            &library,
            service_config("lidar", 5, 1_000),
            MockSensor::new(MockSensorConfig::endless("lidar")),
        )
        .await;
        assert!(matches!(
            second,
            Err(SlamError::EngineFailure {
                operation: EngineOp::Initialize,
                ..
            })
        ));
        assert_eq!(library.engines_created(), 1);
    }
}
