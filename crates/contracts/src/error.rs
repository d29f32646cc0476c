//! Layered error definitions
//!
//! Categorized by source: service / sensor / engine / config

use thiserror::Error;

use crate::{EngineOp, EngineState};

/// Unified service error
#[derive(Debug, Error)]
pub enum SlamError {
    // ===== Service Errors =====
    /// Operation invoked after `close`
    #[error("slam service is closed")]
    ServiceClosed,

    /// Engine returned a pose without a usable quaternion
    #[error("error getting SLAM position: {message}")]
    MalformedPositionExtension { message: String },

    /// Unrecognized `do_command` request
    #[error("unimplemented command: {command}")]
    Unimplemented { command: String },

    // ===== Sensor Errors =====
    /// No readable data at startup
    #[error("failed to get data from sensor '{sensor}': {message}")]
    SensorValidationFailed { sensor: String, message: String },

    // ===== Engine Errors =====
    /// Deadline exceeded on a specific engine operation
    #[error("engine {operation} timed out after {timeout_ms}ms")]
    EngineTimeout { operation: EngineOp, timeout_ms: u64 },

    /// Engine-reported failure, passed through
    #[error("engine {operation} failed: {source}")]
    EngineFailure {
        operation: EngineOp,
        #[source]
        source: EngineError,
    },

    /// Operation not permitted from the engine's current lifecycle state
    #[error("engine {operation} not allowed in state {state}")]
    InvalidState {
        operation: EngineOp,
        state: EngineState,
    },

    /// The facade worker stopped before answering
    #[error("engine worker stopped before {operation} completed")]
    WorkerGone { operation: EngineOp },

    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SlamError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create sensor validation error
    pub fn sensor_validation(sensor: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SensorValidationFailed {
            sensor: sensor.into(),
            message: message.into(),
        }
    }

    /// Create malformed position error
    pub fn malformed_position(message: impl Into<String>) -> Self {
        Self::MalformedPositionExtension {
            message: message.into(),
        }
    }

    /// Create unimplemented command error
    pub fn unimplemented(command: impl Into<String>) -> Self {
        Self::Unimplemented {
            command: command.into(),
        }
    }

    /// Whether this error is a deadline on an engine call
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::EngineTimeout { .. })
    }
}

/// Opaque engine-reported failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct EngineError {
    message: String,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Sensor read failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SensorError {
    /// The source has no more data (e.g. end of a recorded dataset)
    #[error("sensor '{sensor}' reached end of dataset")]
    Exhausted { sensor: String },

    /// The source could not produce a reading
    #[error("sensor '{sensor}' unavailable: {message}")]
    Unavailable { sensor: String, message: String },
}

impl SensorError {
    pub fn exhausted(sensor: impl Into<String>) -> Self {
        Self::Exhausted {
            sensor: sensor.into(),
        }
    }

    pub fn unavailable(sensor: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unavailable {
            sensor: sensor.into(),
            message: message.into(),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, SlamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_operation() {
        let err = SlamError::EngineTimeout {
            operation: EngineOp::GetPosition,
            timeout_ms: 50,
        };
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "engine get_position timed out after 50ms");

        let err = SlamError::EngineFailure {
            operation: EngineOp::Start,
            source: EngineError::new("boom"),
        };
        assert!(!err.is_timeout());
        assert_eq!(err.to_string(), "engine start failed: boom");
    }

    #[test]
    fn test_sensor_error_exhausted() {
        assert!(SensorError::exhausted("lidar").is_exhausted());
        assert!(!SensorError::unavailable("lidar", "unplugged").is_exhausted());
    }
}
