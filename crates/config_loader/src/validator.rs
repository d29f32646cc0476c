//! 配置校验模块
//!
//! 校验规则：
//! - 至少一个传感器，传感器名不能为空
//! - data_dir 不能为空
//! - 各周期与超时 > 0
//! - 算法计数与范围在界限内
//! - min_range <= max_range

use contracts::{ServiceConfig, SlamError};
use ::validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// 校验解析后的 ServiceConfig
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &ServiceConfig) -> Result<(), SlamError> {
    if let Err(errors) = config.validate() {
        let (field, message) = first_violation(&errors, "")
            .unwrap_or_else(|| ("config".to_string(), errors.to_string()));
        return Err(SlamError::config_validation(field, message));
    }

    validate_sensors(config)?;
    validate_data_dir(config)?;
    validate_range(config)?;
    Ok(())
}

/// 按字段名顺序，返回第一个违规项的点分路径与消息
fn first_violation(errors: &ValidationErrors, prefix: &str) -> Option<(String, String)> {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));
    let (name, kind) = fields.into_iter().next()?;

    let path = if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    };

    match kind {
        ValidationErrorsKind::Field(violations) => {
            let message = violations
                .first()
                .map(|v| match &v.message {
                    Some(message) => message.to_string(),
                    None => format!("failed '{}' check", v.code),
                })
                .unwrap_or_default();
            Some((path, message))
        }
        ValidationErrorsKind::Struct(inner) => first_violation(inner, &path),
        ValidationErrorsKind::List(items) => {
            let (index, inner) = items.iter().next()?;
            first_violation(inner, &format!("{path}[{index}]"))
        }
    }
}

fn validate_sensors(config: &ServiceConfig) -> Result<(), SlamError> {
    for (idx, sensor) in config.sensors.iter().enumerate() {
        if sensor.trim().is_empty() {
            return Err(SlamError::config_validation(
                format!("sensors[{idx}]"),
                "sensor name cannot be empty",
            ));
        }
    }
    Ok(())
}

fn validate_data_dir(config: &ServiceConfig) -> Result<(), SlamError> {
    if config.data_dir.as_os_str().is_empty() {
        return Err(SlamError::config_validation(
            "data_dir",
            "data_dir cannot be empty",
        ));
    }
    Ok(())
}

fn validate_range(config: &ServiceConfig) -> Result<(), SlamError> {
    let algo = &config.algo;
    if algo.min_range > algo.max_range {
        return Err(SlamError::config_validation(
            "config_params.min_range / config_params.max_range",
            format!(
                "min_range ({}) must be <= max_range ({})",
                algo.min_range, algo.max_range
            ),
        ));
    }
    Ok(())
}
