//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use contracts::EngineMode;
use std::path::PathBuf;

/// carto-bridge - SLAM service over a recorded sensor dataset
#[derive(Parser, Debug)]
#[command(
    name = "carto-bridge",
    author,
    version,
    about = "SLAM service bridge: ingest sensor data, serve pose and map queries",
    long_about = "Runs a SLAM engine behind a bounded, single-flight facade.\n\n\
                  Validates the primary sensor, feeds its readings to the engine at a \n\
                  fixed cadence, and exports the point cloud map and internal state \n\
                  once the session ends."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "CARTO_BRIDGE_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "CARTO_BRIDGE_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Default log level derived from `-v` / `-q`
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a SLAM session against a recorded dataset
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display resolved configuration
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "carto.toml",
        env = "CARTO_BRIDGE_CONFIG"
    )]
    pub config: PathBuf,

    /// Recorded dataset directory (contains readings.jsonl)
    #[arg(short, long, env = "CARTO_BRIDGE_DATASET")]
    pub dataset: PathBuf,

    /// Override the data directory from configuration
    #[arg(long, env = "CARTO_BRIDGE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Mode the engine reports after initialization
    #[arg(long, value_enum, default_value = "mapping")]
    pub mode: ModeArg,

    /// Session timeout in seconds (0 = until the dataset is consumed)
    #[arg(long, default_value = "0", env = "CARTO_BRIDGE_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and dataset, then exit
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "CARTO_BRIDGE_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "carto.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "carto.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show algorithm tuning parameters
    #[arg(long)]
    pub algo: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

/// Engine mode selectable from the command line
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ModeArg {
    #[default]
    Mapping,
    Localizing,
    Updating,
}

impl From<ModeArg> for EngineMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Mapping => Self::Mapping,
            ModeArg::Localizing => Self::Localizing,
            ModeArg::Updating => Self::Updating,
        }
    }
}
