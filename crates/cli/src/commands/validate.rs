//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    primary_sensor: String,
    sensor_count: usize,
    mode: String,
    data_rate_ms: u64,
    facade_timeout_ms: u64,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            let mode = config_loader::to_params(config.sub_algo, &config.algo)
                .remove(config_loader::MODE_KEY)
                .unwrap_or_default();

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    primary_sensor: config.primary_sensor().to_string(),
                    sensor_count: config.sensors.len(),
                    mode,
                    data_rate_ms: config.data_rate_ms,
                    facade_timeout_ms: config.facade_timeout_ms,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &contracts::ServiceConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.sensors.len() > 1 {
        warnings.push(format!(
            "Only the primary sensor '{}' is ingested; {} other sensor(s) are ignored",
            config.primary_sensor(),
            config.sensors.len() - 1
        ));
    }

    if config.facade_timeout_ms < config.data_rate_ms {
        warnings.push(format!(
            "facade_timeout_ms ({}) is shorter than data_rate_msec ({}) - slow engine calls will drop readings",
            config.facade_timeout_ms, config.data_rate_ms
        ));
    }

    if config.sensor_validation.interval_sec > config.sensor_validation.max_timeout_sec {
        warnings.push(
            "sensor_validation.interval_sec exceeds max_timeout_sec - only one read attempt will be made"
                .to_string(),
        );
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Primary sensor: {}", summary.primary_sensor);
            println!("  Sensors: {}", summary.sensor_count);
            println!("  Mode: {}", summary.mode);
            println!("  Data rate: {} ms", summary.data_rate_ms);
            println!("  Facade timeout: {} ms", summary.facade_timeout_ms);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
