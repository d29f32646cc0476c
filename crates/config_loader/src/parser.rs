//! 配置解析模块
//!
//! 支持 TOML (主要) 和 JSON (可选) 格式。

use contracts::SlamError;

use crate::schema::ServiceFileConfig;

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// 解析 TOML 格式配置
pub fn parse_toml(content: &str) -> Result<ServiceFileConfig, SlamError> {
    toml::from_str(content).map_err(|e| SlamError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 解析 JSON 格式配置
pub fn parse_json(content: &str) -> Result<ServiceFileConfig, SlamError> {
    serde_json::from_str(content).map_err(|e| SlamError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<ServiceFileConfig, SlamError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
sensors = ["rplidar"]
data_dir = "/tmp/slam"

[config_params]
mode = "2d"
"#;
        let result = parse_toml(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let file = result.unwrap();
        assert_eq!(file.sensors, vec!["rplidar".to_string()]);
        assert_eq!(file.data_rate_msec, None);
        assert_eq!(file.sensor_validation.max_timeout_sec, None);
        assert_eq!(file.config_params.get("mode").map(String::as_str), Some("2d"));
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "sensors": ["rplidar"],
            "data_dir": "/tmp/slam",
            "data_rate_msec": -1,
            "sensor_validation": { "interval_sec": 2 },
            "config_params": { "mode": "2d", "num_range_data": "50" }
        }"#;
        let file = parse_json(content).unwrap();
        assert_eq!(file.data_rate_msec, Some(-1));
        assert_eq!(file.sensor_validation.interval_sec, Some(2));
        assert_eq!(file.config_params.len(), 2);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let result = parse_toml("invalid toml [[[");
        assert!(matches!(result, Err(SlamError::ConfigParse { .. })));
    }

    #[test]
    fn test_parse_missing_sensors() {
        let result = parse_toml(r#"data_dir = "/tmp/slam""#);
        assert!(result.unwrap_err().to_string().contains("sensors"));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_extension("toml"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("TOML"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("json"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
