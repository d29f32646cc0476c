//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Resolve optional parameters and algorithm tuning
//! - Validate configuration legality
//! - Generate `ServiceConfig`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("carto.toml")).unwrap();
//! println!("Primary sensor: {}", config.primary_sensor());
//! ```

mod params;
mod parser;
mod schema;
mod validator;

pub use contracts::ServiceConfig;
pub use params::{parse_algo_config, parse_sub_algo, to_params, MODE_KEY};
pub use parser::ConfigFormat;
pub use schema::{SensorValidationSection, ServiceFileConfig};

use contracts::{
    SensorValidationConfig, SlamError, DEFAULT_DATA_RATE_MS, DEFAULT_FACADE_TIMEOUT_MS,
    DEFAULT_MAP_RATE_SEC,
};
use std::path::Path;
use tracing::warn;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<ServiceConfig, SlamError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<ServiceConfig, SlamError> {
        let file = parser::parse(content, format)?;
        let config = Self::resolve(file)?;
        validator::validate(&config)?;
        Ok(config)
    }

    /// Turn the file schema into a complete ServiceConfig
    ///
    /// Missing optional values take their defaults; a zero or negative
    /// cadence falls back to the default with a warning.
    pub fn resolve(file: ServiceFileConfig) -> Result<ServiceConfig, SlamError> {
        let sub_algo = parse_sub_algo(&file.config_params)?;
        let algo = parse_algo_config(&file.config_params)?;

        let validation_defaults = SensorValidationConfig::default();

        Ok(ServiceConfig {
            sensors: file.sensors,
            sub_algo,
            data_dir: file.data_dir,
            data_rate_ms: positive_or_default(
                "data_rate_msec",
                file.data_rate_msec,
                DEFAULT_DATA_RATE_MS,
            ),
            map_rate_sec: positive_or_default(
                "map_rate_sec",
                file.map_rate_sec,
                DEFAULT_MAP_RATE_SEC,
            ),
            facade_timeout_ms: file.facade_timeout_ms.unwrap_or(DEFAULT_FACADE_TIMEOUT_MS),
            sensor_validation: SensorValidationConfig {
                max_timeout_sec: file
                    .sensor_validation
                    .max_timeout_sec
                    .unwrap_or(validation_defaults.max_timeout_sec),
                interval_sec: file
                    .sensor_validation
                    .interval_sec
                    .unwrap_or(validation_defaults.interval_sec),
            },
            algo,
        })
    }

    /// Inverse of [`ConfigLoader::resolve`]
    pub fn to_file_config(config: &ServiceConfig) -> ServiceFileConfig {
        ServiceFileConfig {
            sensors: config.sensors.clone(),
            data_dir: config.data_dir.clone(),
            data_rate_msec: Some(config.data_rate_ms as i64),
            map_rate_sec: Some(config.map_rate_sec as i64),
            facade_timeout_ms: Some(config.facade_timeout_ms),
            sensor_validation: SensorValidationSection {
                max_timeout_sec: Some(config.sensor_validation.max_timeout_sec),
                interval_sec: Some(config.sensor_validation.interval_sec),
            },
            config_params: to_params(config.sub_algo, &config.algo),
        }
    }

    /// Serialize ServiceConfig to TOML string
    pub fn to_toml(config: &ServiceConfig) -> Result<String, SlamError> {
        toml::to_string_pretty(&Self::to_file_config(config))
            .map_err(|e| SlamError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize ServiceConfig to JSON string
    pub fn to_json(config: &ServiceConfig) -> Result<String, SlamError> {
        serde_json::to_string_pretty(&Self::to_file_config(config))
            .map_err(|e| SlamError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, SlamError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            SlamError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext)
            .ok_or_else(|| SlamError::config_parse(format!("unsupported config format: .{ext}")))
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, SlamError> {
        Ok(std::fs::read_to_string(path)?)
    }
}

fn positive_or_default(key: &str, value: Option<i64>, default: u64) -> u64 {
    match value {
        None => default,
        Some(v) if v > 0 => v as u64,
        Some(v) => {
            warn!(key, value = v, default, "non-positive value, using default");
            default
        }
    }
}
