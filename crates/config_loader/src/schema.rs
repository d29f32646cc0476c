//! On-disk configuration schema
//!
//! ```toml
//! sensors = ["rplidar"]
//! data_dir = "/var/lib/carto-bridge"
//! data_rate_msec = 200
//! map_rate_sec = 60
//! facade_timeout_ms = 5000
//!
//! [sensor_validation]
//! max_timeout_sec = 30
//! interval_sec = 1
//!
//! [config_params]
//! mode = "2d"
//! max_range = "25"
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Service configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceFileConfig {
    /// Sensor names; the first one is the primary sensor
    pub sensors: Vec<String>,

    /// Directory for maps and internal state
    pub data_dir: PathBuf,

    /// Ingestion cadence; zero or negative means default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_rate_msec: Option<i64>,

    /// Map refresh cadence; zero or negative means default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_rate_sec: Option<i64>,

    /// Per-call engine deadline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facade_timeout_ms: Option<u64>,

    #[serde(default)]
    pub sensor_validation: SensorValidationSection,

    /// Free-form string parameters: `mode` plus algorithm tuning
    #[serde(default)]
    pub config_params: BTreeMap<String, String>,
}

/// `[sensor_validation]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorValidationSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_timeout_sec: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_sec: Option<u64>,
}
