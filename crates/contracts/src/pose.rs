//! Position types
//!
//! The engine reports a point plus an untyped extension map; the service
//! turns the extension into a typed orientation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Untyped extension payload reported alongside a position
pub type PositionExtension = Map<String, Value>;

/// Raw position as reported by the engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,

    /// Expected to contain `"quat": {"real", "imag", "jmag", "kmag"}`
    #[serde(default)]
    pub extra: PositionExtension,
}

impl Position {
    /// Build a position whose extension carries the given quaternion
    pub fn with_quaternion(x: f64, y: f64, z: f64, q: Quaternion) -> Self {
        let mut quat = Map::new();
        quat.insert("real".into(), Value::from(q.real));
        quat.insert("imag".into(), Value::from(q.imag));
        quat.insert("jmag".into(), Value::from(q.jmag));
        quat.insert("kmag".into(), Value::from(q.kmag));

        let mut extra = Map::new();
        extra.insert("quat".into(), Value::Object(quat));

        Self { x, y, z, extra }
    }

    pub fn point(&self) -> Vector3 {
        Vector3 {
            x: self.x,
            y: self.y,
            z: self.z,
        }
    }
}

/// 3D vector
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Orientation quaternion (real + i/j/k components)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub real: f64,
    pub imag: f64,
    pub jmag: f64,
    pub kmag: f64,
}

impl Quaternion {
    pub const fn identity() -> Self {
        Self {
            real: 1.0,
            imag: 0.0,
            jmag: 0.0,
            kmag: 0.0,
        }
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

/// Typed pose returned to callers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub point: Vector3,
    pub orientation: Quaternion,
}
