//! # Engine Facade
//!
//! Bounded, serialized access to the external SLAM engine.
//!
//! Responsibilities:
//! - Own the engine handle on a single worker task (single-flight execution)
//! - Bound every call with the configured deadline
//! - Enforce the engine lifecycle state machine
//! - Roll back a half-started engine
//! - Provide mock engine and library for tests and dry runs
//!
//! ## Usage Example
//!
//! ```ignore
//! use engine_facade::FacadeClient;
//!
//! let workers = CancellationToken::new();
//! let client = FacadeClient::spawn(engine, Duration::from_secs(5), workers.clone());
//! let mode = client.initialize_and_start().await?;
//! let position = client.get_position().await?;
//! ```

mod client;
pub mod mock_engine;
mod worker;

pub use client::FacadeClient;
pub use contracts::{EngineMode, EngineOp, EngineState, Result, SlamEngine, SlamError};
pub use mock_engine::{CallSpan, CallRecorder, MockEngine, MockEngineConfig, MockEngineLibrary};
