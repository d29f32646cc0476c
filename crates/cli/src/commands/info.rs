//! `info` command implementation.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use contracts::ServiceConfig;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    sensors: SensorsInfo,
    cadence: CadenceInfo,
    sensor_validation: ValidationInfo,
    data_dir: String,
    mode: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    algo: BTreeMap<String, String>,
}

#[derive(Serialize)]
struct SensorsInfo {
    primary: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    ignored: Vec<String>,
}

#[derive(Serialize)]
struct CadenceInfo {
    data_rate_ms: u64,
    map_rate_sec: u64,
    facade_timeout_ms: u64,
}

#[derive(Serialize)]
struct ValidationInfo {
    max_timeout_sec: u64,
    interval_sec: u64,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        return Err(CliError::config_not_found(&args.config).into());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let info = build_config_info(&config, args);
    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(config: &ServiceConfig, args: &InfoArgs) -> ConfigInfo {
    let mut params = config_loader::to_params(config.sub_algo, &config.algo);
    let mode = params.remove(config_loader::MODE_KEY).unwrap_or_default();

    ConfigInfo {
        sensors: SensorsInfo {
            primary: config.primary_sensor().to_string(),
            ignored: config.sensors.iter().skip(1).cloned().collect(),
        },
        cadence: CadenceInfo {
            data_rate_ms: config.data_rate_ms,
            map_rate_sec: config.map_rate_sec,
            facade_timeout_ms: config.facade_timeout_ms,
        },
        sensor_validation: ValidationInfo {
            max_timeout_sec: config.sensor_validation.max_timeout_sec,
            interval_sec: config.sensor_validation.interval_sec,
        },
        data_dir: config.data_dir.display().to_string(),
        mode,
        algo: if args.algo { params } else { BTreeMap::new() },
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               carto-bridge Configuration                     ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📡 Sensors");
    if info.sensors.ignored.is_empty() {
        println!("   └─ Primary: {}", info.sensors.primary);
    } else {
        println!("   ├─ Primary: {}", info.sensors.primary);
        println!("   └─ Ignored: {}", info.sensors.ignored.join(", "));
    }

    println!("\n⏱  Cadence");
    println!("   ├─ Data rate: {} ms", info.cadence.data_rate_ms);
    println!("   ├─ Map rate: {} s", info.cadence.map_rate_sec);
    println!("   └─ Facade timeout: {} ms", info.cadence.facade_timeout_ms);

    println!("\n🔎 Sensor Validation");
    println!("   ├─ Max timeout: {} s", info.sensor_validation.max_timeout_sec);
    println!("   └─ Interval: {} s", info.sensor_validation.interval_sec);

    println!("\n⚙️  Algorithm");
    println!("   ├─ Mode: {}", info.mode);
    println!("   └─ Data dir: {}", info.data_dir);

    if !info.algo.is_empty() {
        println!("\n🔧 Tuning ({})", info.algo.len());
        for (i, (key, value)) in info.algo.iter().enumerate() {
            let prefix = if i == info.algo.len() - 1 { "└─" } else { "├─" };
            println!("   {} {} = {}", prefix, key, value);
        }
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const CONFIG: &str = r#"
sensors = ["rplidar", "imu"]
data_dir = "/tmp/slam"

[config_params]
mode = "2d"
max_range = "12"
"#;

    #[test]
    fn test_build_info() {
        let config =
            config_loader::ConfigLoader::load_from_str(CONFIG, config_loader::ConfigFormat::Toml)
                .unwrap();
        let args = InfoArgs {
            config: PathBuf::from("carto.toml"),
            json: true,
            algo: true,
        };

        let info = build_config_info(&config, &args);
        assert_eq!(info.sensors.primary, "rplidar");
        assert_eq!(info.sensors.ignored, vec!["imu".to_string()]);
        assert_eq!(info.mode, "2d");
        assert_eq!(info.algo.get("max_range").map(String::as_str), Some("12"));
        assert!(!info.algo.contains_key(config_loader::MODE_KEY));
    }

    #[test]
    fn test_algo_hidden_by_default() {
        let config =
            config_loader::ConfigLoader::load_from_str(CONFIG, config_loader::ConfigFormat::Toml)
                .unwrap();
        let args = InfoArgs {
            config: PathBuf::from("carto.toml"),
            json: true,
            algo: false,
        };

        let json = serde_json::to_value(build_config_info(&config, &args)).unwrap();
        assert!(json.get("algo").is_none());
        assert_eq!(json["cadence"]["data_rate_ms"], 200);
    }
}
