//! ServiceConfig - Config Loader output
//!
//! Resolved, immutable service configuration: sensors, cadences, data
//! directory, facade timeout and algorithm tuning.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Default ingestion cadence
pub const DEFAULT_DATA_RATE_MS: u64 = 200;
/// Default map refresh cadence
pub const DEFAULT_MAP_RATE_SEC: u64 = 60;
/// Default per-call engine deadline
pub const DEFAULT_FACADE_TIMEOUT_MS: u64 = 5_000;

/// Sub-algorithm run by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SubAlgo {
    /// 2D LIDAR only
    #[default]
    #[serde(rename = "2d")]
    Dim2d,
}

impl SubAlgo {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "2d" => Some(Self::Dim2d),
            _ => None,
        }
    }
}

/// Complete service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServiceConfig {
    /// Sensor names; the first entry is the primary sensor
    #[validate(length(min = 1, message = "at least one sensor is required"))]
    pub sensors: Vec<String>,

    /// Sub-algorithm
    #[serde(default)]
    pub sub_algo: SubAlgo,

    /// Directory holding maps and internal state
    pub data_dir: PathBuf,

    /// Ingestion cadence (ms)
    #[validate(range(min = 1))]
    pub data_rate_ms: u64,

    /// Map refresh cadence (s)
    #[validate(range(min = 1))]
    pub map_rate_sec: u64,

    /// Per-call engine deadline (ms)
    #[validate(range(min = 1))]
    pub facade_timeout_ms: u64,

    /// Startup sensor check
    #[validate(nested)]
    pub sensor_validation: SensorValidationConfig,

    /// Algorithm tuning
    #[validate(nested)]
    pub algo: AlgoConfig,
}

impl ServiceConfig {
    /// Primary sensor name (component reference for poses)
    pub fn primary_sensor(&self) -> &str {
        self.sensors.first().map(String::as_str).unwrap_or_default()
    }

    pub fn data_rate(&self) -> Duration {
        Duration::from_millis(self.data_rate_ms)
    }

    pub fn map_rate(&self) -> Duration {
        Duration::from_secs(self.map_rate_sec)
    }

    pub fn facade_timeout(&self) -> Duration {
        Duration::from_millis(self.facade_timeout_ms)
    }

    /// Engine-facing subset of the configuration
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            sensors: self.sensors.clone(),
            map_rate_sec: self.map_rate_sec,
            data_dir: self.data_dir.clone(),
            component_reference: self.primary_sensor().to_string(),
            lidar: match self.sub_algo {
                SubAlgo::Dim2d => LidarDimension::TwoD,
            },
        }
    }
}

/// Startup sensor reachability check
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SensorValidationConfig {
    /// Give up after this long without a reading (s)
    #[validate(range(min = 1))]
    pub max_timeout_sec: u64,

    /// Poll interval (s)
    #[validate(range(min = 1))]
    pub interval_sec: u64,
}

impl SensorValidationConfig {
    pub fn max_timeout(&self) -> Duration {
        Duration::from_secs(self.max_timeout_sec)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_sec)
    }
}

impl Default for SensorValidationConfig {
    fn default() -> Self {
        Self {
            max_timeout_sec: 30,
            interval_sec: 1,
        }
    }
}

/// Algorithm tuning parameters, passed through to the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct AlgoConfig {
    pub optimize_on_start: bool,
    #[validate(range(min = 0))]
    pub optimize_every_n_nodes: i32,
    #[validate(range(min = 1))]
    pub num_range_data: i32,
    pub missing_data_ray_length: f32,
    #[validate(range(min = 0.0))]
    pub max_range: f32,
    #[validate(range(min = 0.0))]
    pub min_range: f32,
    #[validate(range(min = 1))]
    pub max_submaps_to_keep: i32,
    #[validate(range(min = 1))]
    pub fresh_submaps_count: i32,
    pub min_covered_area: f64,
    #[validate(range(min = 0))]
    pub min_added_submaps_count: i32,
    pub occupied_space_weight: f64,
    pub translation_weight: f64,
    pub rotation_weight: f64,
}

impl Default for AlgoConfig {
    fn default() -> Self {
        Self {
            optimize_on_start: false,
            optimize_every_n_nodes: 3,
            num_range_data: 30,
            missing_data_ray_length: 25.0,
            max_range: 25.0,
            min_range: 0.2,
            max_submaps_to_keep: 3,
            fresh_submaps_count: 3,
            min_covered_area: 1.0,
            min_added_submaps_count: 1,
            occupied_space_weight: 20.0,
            translation_weight: 10.0,
            rotation_weight: 1.0,
        }
    }
}

/// LIDAR dimensionality handed to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LidarDimension {
    TwoD,
    ThreeD,
}

/// Engine construction parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub sensors: Vec<String>,
    pub map_rate_sec: u64,
    pub data_dir: PathBuf,
    pub component_reference: String,
    pub lidar: LidarDimension,
}
