//! Engine position to typed pose

use contracts::{Pose, Position, Quaternion, SlamError};
use serde_json::Value;

/// Build a pose from the engine's position, reading the orientation from
/// the `quat` entry of its extension
///
/// The four components `real`, `imag`, `jmag` and `kmag` must all be present
/// and numeric; there is no default orientation.
pub fn check_quaternion(position: &Position) -> Result<Pose, SlamError> {
    let Some(quat) = position.extra.get("quat") else {
        return Err(SlamError::malformed_position(format!(
            "quaternion not given, {}",
            Value::Object(position.extra.clone())
        )));
    };

    let component = |name: &str| quat.get(name).and_then(Value::as_f64);
    match (
        component("real"),
        component("imag"),
        component("jmag"),
        component("kmag"),
    ) {
        (Some(real), Some(imag), Some(jmag), Some(kmag)) => Ok(Pose {
            point: position.point(),
            orientation: Quaternion {
                real,
                imag,
                jmag,
                kmag,
            },
        }),
        _ => Err(SlamError::malformed_position(format!(
            "quaternion given, but invalid format detected, {quat}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn position(extra: Value) -> Position {
        Position {
            x: 1.0,
            y: 2.0,
            z: 0.0,
            extra: extra.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn test_identity_quaternion() {
        let pose = check_quaternion(&position(
            json!({"quat": {"real": 1.0, "imag": 0.0, "jmag": 0.0, "kmag": 0.0}}),
        ))
        .unwrap();
        assert_eq!(pose.orientation, Quaternion::identity());
        assert_eq!(pose.point.x, 1.0);
        assert_eq!(pose.point.y, 2.0);
    }

    #[test]
    fn test_missing_component() {
        for missing in ["real", "imag", "jmag", "kmag"] {
            let mut quat = json!({"real": 1.0, "imag": 0.0, "jmag": 0.0, "kmag": 0.0});
            quat.as_object_mut().unwrap().remove(missing);

            let err = check_quaternion(&position(json!({ "quat": quat }))).unwrap_err();
            assert!(
                matches!(err, SlamError::MalformedPositionExtension { .. }),
                "missing {missing}"
            );
        }
    }

    #[test]
    fn test_missing_quat() {
        let err = check_quaternion(&position(json!({}))).unwrap_err();
        assert!(err.to_string().contains("quaternion not given"));
    }

    #[test]
    fn test_non_numeric_component() {
        let err = check_quaternion(&position(
            json!({"quat": {"real": "1", "imag": 0.0, "jmag": 0.0, "kmag": 0.0}}),
        ))
        .unwrap_err();
        assert!(err.to_string().contains("invalid format"));
    }
}
