//! Session statistics.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use contracts::{EngineMode, Pose};
use ingestion::MetricsSnapshot;
use observability::EngineCallAggregator;

/// Why a session stopped waiting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Dataset fully ingested
    JobDone,
    /// Session timeout fired
    TimedOut,
    /// Ctrl+C / SIGTERM
    Interrupted,
    /// Ingestion ended without reaching the end of the dataset
    IngestionStopped,
}

impl fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::JobDone => "job_done",
            Self::TimedOut => "timed_out",
            Self::Interrupted => "interrupted",
            Self::IngestionStopped => "ingestion_stopped",
        };
        f.write_str(s)
    }
}

/// A payload written to disk through the chunk streamer
#[derive(Debug, Clone)]
pub struct ExportedArtifact {
    pub kind: &'static str,
    pub path: PathBuf,
    pub chunks: usize,
    pub bytes: usize,
}

/// Statistics from a session run
#[derive(Debug, Clone)]
pub struct SessionStats {
    pub end: SessionEnd,
    pub mode: EngineMode,
    /// Bring-up to export
    pub duration: Duration,
    pub ingestion: MetricsSnapshot,
    pub engine_calls: EngineCallAggregator,
    pub final_pose: Option<Pose>,
    pub exports: Vec<ExportedArtifact>,
}

impl SessionStats {
    /// Readings accepted by the engine per second
    pub fn ingest_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.ingestion.readings_ingested as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Dropped readings as a percentage of readings read
    pub fn drop_rate(&self) -> f64 {
        if self.ingestion.readings_read > 0 {
            (self.ingestion.readings_dropped as f64 / self.ingestion.readings_read as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Session Statistics                        ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Ended: {}", self.end);
        println!("   ├─ Mode: {}", self.mode);
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   └─ Ingest rate: {:.2} readings/s", self.ingest_rate());

        println!("\n📥 Ingestion");
        println!("   ├─ Read: {}", self.ingestion.readings_read);
        println!("   ├─ Ingested: {}", self.ingestion.readings_ingested);
        println!(
            "   ├─ Dropped: {} ({:.2}%)",
            self.ingestion.readings_dropped,
            self.drop_rate()
        );
        println!("   └─ Sensor errors: {}", self.ingestion.sensor_errors);

        let summary = self.engine_calls.summary();
        if !summary.is_empty() {
            println!("\n⚙️  Engine Calls");
            for (i, op) in summary.iter().enumerate() {
                let prefix = if i == summary.len() - 1 { "└─" } else { "├─" };
                println!("   {} {}", prefix, op);
            }
        }

        if let Some(ref pose) = self.final_pose {
            println!("\n📍 Final Pose");
            println!(
                "   ├─ Point: ({:.3}, {:.3}, {:.3})",
                pose.point.x, pose.point.y, pose.point.z
            );
            println!(
                "   └─ Orientation: ({:.3}, {:.3}, {:.3}, {:.3})",
                pose.orientation.real,
                pose.orientation.imag,
                pose.orientation.jmag,
                pose.orientation.kmag
            );
        }

        if !self.exports.is_empty() {
            println!("\n📤 Exports");
            for (i, artifact) in self.exports.iter().enumerate() {
                let prefix = if i == self.exports.len() - 1 { "└─" } else { "├─" };
                println!(
                    "   {} {}: {} ({} bytes, {} chunks)",
                    prefix,
                    artifact.kind,
                    artifact.path.display(),
                    artifact.bytes,
                    artifact.chunks
                );
            }
        }

        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(read: u64, ingested: u64, dropped: u64, duration: Duration) -> SessionStats {
        SessionStats {
            end: SessionEnd::JobDone,
            mode: EngineMode::Mapping,
            duration,
            ingestion: MetricsSnapshot {
                readings_read: read,
                readings_ingested: ingested,
                readings_dropped: dropped,
                sensor_errors: 0,
            },
            engine_calls: EngineCallAggregator::new(),
            final_pose: None,
            exports: Vec::new(),
        }
    }

    #[test]
    fn test_rates() {
        let s = stats(10, 8, 2, Duration::from_secs(2));
        assert_eq!(s.ingest_rate(), 4.0);
        assert_eq!(s.drop_rate(), 20.0);
    }

    #[test]
    fn test_rates_without_data() {
        let s = stats(0, 0, 0, Duration::ZERO);
        assert_eq!(s.ingest_rate(), 0.0);
        assert_eq!(s.drop_rate(), 0.0);
    }

    #[test]
    fn test_end_display() {
        assert_eq!(SessionEnd::IngestionStopped.to_string(), "ingestion_stopped");
    }
}
