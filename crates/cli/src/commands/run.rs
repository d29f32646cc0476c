//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Session, SessionConfig};

/// Execute the `run` command
pub async fn run_session(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(&args.config).into());
    }
    if !args.dataset.is_dir() {
        return Err(CliError::dataset_not_found(&args.dataset).into());
    }

    let mut config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if let Some(ref data_dir) = args.data_dir {
        info!(data_dir = %data_dir.display(), "Overriding data directory from CLI");
        config.data_dir = data_dir.clone();
    }

    info!(
        primary_sensor = config.primary_sensor(),
        sensors = config.sensors.len(),
        data_rate_ms = config.data_rate_ms,
        facade_timeout_ms = config.facade_timeout_ms,
        data_dir = %config.data_dir.display(),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&config);
        return Ok(());
    }

    let session = Session::new(SessionConfig {
        service: config,
        dataset: args.dataset.clone(),
        mode: args.mode.into(),
        timeout: if args.timeout == 0 {
            None
        } else {
            Some(Duration::from_secs(args.timeout))
        },
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    });

    info!("Starting session...");
    let stats = session
        .run(shutdown_signal())
        .await
        .context("Session failed")?;

    info!(
        end = %stats.end,
        readings_ingested = stats.ingestion.readings_ingested,
        readings_dropped = stats.ingestion.readings_dropped,
        duration_secs = stats.duration.as_secs_f64(),
        "Session completed"
    );
    stats.print_summary();

    info!("carto-bridge finished");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
///
/// A handler that cannot be installed never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(config: &contracts::ServiceConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("Sensors:");
    for (i, sensor) in config.sensors.iter().enumerate() {
        let marker = if i == 0 { " (primary)" } else { "" };
        println!("  - {}{}", sensor, marker);
    }
    println!("\nCadence:");
    println!("  Data rate: {} ms", config.data_rate_ms);
    println!("  Map rate: {} s", config.map_rate_sec);
    println!("  Facade timeout: {} ms", config.facade_timeout_ms);
    println!("\nData directory: {}", config.data_dir.display());
    println!();
}
