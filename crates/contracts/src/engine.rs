//! SlamEngine trait - the wrapped mapping/localization algorithm
//!
//! The engine is non-reentrant: every method takes `&mut self`, and the
//! facade client owns the only handle.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{EngineError, Position, SensorReading};

/// Mode the engine selected during `initialize`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineMode {
    /// Building a new map
    Mapping,
    /// Localizing against a fixed, previously built map
    Localizing,
    /// Extending a previously built map
    Updating,
}

impl fmt::Display for EngineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Mapping => "mapping",
            Self::Localizing => "localizing",
            Self::Updating => "updating",
        };
        f.write_str(s)
    }
}

/// Engine operation names, used to tag errors, spans and metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineOp {
    Initialize,
    Start,
    Stop,
    Terminate,
    AddSensorReading,
    GetPosition,
    GetPointCloudMap,
    GetInternalState,
}

impl EngineOp {
    pub const ALL: [EngineOp; 8] = [
        Self::Initialize,
        Self::Start,
        Self::Stop,
        Self::Terminate,
        Self::AddSensorReading,
        Self::GetPosition,
        Self::GetPointCloudMap,
        Self::GetInternalState,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Terminate => "terminate",
            Self::AddSensorReading => "add_sensor_reading",
            Self::GetPosition => "get_position",
            Self::GetPointCloudMap => "get_point_cloud_map",
            Self::GetInternalState => "get_internal_state",
        }
    }

    /// Reading and query calls, valid only on a started engine
    pub fn is_data(&self) -> bool {
        matches!(
            self,
            Self::AddSensorReading | Self::GetPosition | Self::GetPointCloudMap | Self::GetInternalState
        )
    }
}

impl fmt::Display for EngineOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of one engine instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Constructed,
    Initialized,
    Started,
    Stopped,
    Terminated,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Constructed => "constructed",
            Self::Initialized => "initialized",
            Self::Started => "started",
            Self::Stopped => "stopped",
            Self::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

/// External SLAM engine
///
/// Calls may block for an unbounded time; callers bound them with a deadline.
#[trait_variant::make(SlamEngine: Send)]
pub trait LocalSlamEngine {
    /// Load configuration and report which mode the engine runs in
    async fn initialize(&mut self) -> Result<EngineMode, EngineError>;

    /// Start the engine's internal processing
    async fn start(&mut self) -> Result<(), EngineError>;

    /// Stop internal processing
    async fn stop(&mut self) -> Result<(), EngineError>;

    /// Release every resource held by the engine
    async fn terminate(&mut self) -> Result<(), EngineError>;

    /// Feed one sensor reading
    async fn add_sensor_reading(&mut self, reading: &SensorReading) -> Result<(), EngineError>;

    /// Current pose estimate
    async fn get_position(&mut self) -> Result<Position, EngineError>;

    /// Serialized point cloud map (opaque)
    async fn get_point_cloud_map(&mut self) -> Result<Bytes, EngineError>;

    /// Serialized internal state (opaque)
    async fn get_internal_state(&mut self) -> Result<Bytes, EngineError>;
}
