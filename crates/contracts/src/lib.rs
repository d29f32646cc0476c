//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace:
//! sensor readings, engine and sensor traits, the engine library resource,
//! service configuration and the error taxonomy.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Readings carry their capture time as a UTC wall-clock instant
//! - Map timestamps reported by the service use the same clock

mod config;
mod engine;
mod error;
mod library;
mod pose;
mod reading;
mod sensor;

pub use config::*;
pub use engine::*;
pub use error::*;
pub use library::EngineLibrary;
pub use pose::*;
pub use reading::SensorReading;
pub use sensor::{LocalTimedSensor, TimedSensor};
