//! `config_params` - sub-algorithm selection and algorithm tuning
//!
//! Every value arrives as a string. Known keys override the defaults of
//! `AlgoConfig`; unknown keys are logged and ignored.

use std::collections::BTreeMap;
use std::str::FromStr;

use contracts::{AlgoConfig, SlamError, SubAlgo};
use tracing::warn;

/// Key selecting the sub-algorithm
pub const MODE_KEY: &str = "mode";

/// Sub-algorithm named by `mode`
pub fn parse_sub_algo(params: &BTreeMap<String, String>) -> Result<SubAlgo, SlamError> {
    let mode = params.get(MODE_KEY).map(String::as_str).unwrap_or_default();
    SubAlgo::parse(mode).ok_or_else(|| {
        SlamError::config_validation(
            "config_params.mode",
            format!("unsupported mode '{mode}', expected '2d'"),
        )
    })
}

fn parse_value<T>(key: &str, value: &str) -> Result<T, SlamError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| {
        SlamError::config_parse(format!("config_params.{key}: invalid value '{value}': {e}"))
    })
}

/// Algorithm tuning from `config_params`
pub fn parse_algo_config(params: &BTreeMap<String, String>) -> Result<AlgoConfig, SlamError> {
    let mut algo = AlgoConfig::default();

    for (key, value) in params {
        match key.as_str() {
            "optimize_on_start" => algo.optimize_on_start = value.trim() == "true",
            "optimize_every_n_nodes" => algo.optimize_every_n_nodes = parse_value(key, value)?,
            "num_range_data" => algo.num_range_data = parse_value(key, value)?,
            "missing_data_ray_length" => algo.missing_data_ray_length = parse_value(key, value)?,
            "max_range" => algo.max_range = parse_value(key, value)?,
            "min_range" => algo.min_range = parse_value(key, value)?,
            "max_submaps_to_keep" => algo.max_submaps_to_keep = parse_value(key, value)?,
            "fresh_submaps_count" => algo.fresh_submaps_count = parse_value(key, value)?,
            "min_covered_area" => algo.min_covered_area = parse_value(key, value)?,
            "min_added_submaps_count" => algo.min_added_submaps_count = parse_value(key, value)?,
            "occupied_space_weight" => algo.occupied_space_weight = parse_value(key, value)?,
            "translation_weight" => algo.translation_weight = parse_value(key, value)?,
            "rotation_weight" => algo.rotation_weight = parse_value(key, value)?,
            MODE_KEY => {}
            _ => warn!(key = %key, value = %value, "unused config param"),
        }
    }

    Ok(algo)
}

/// Inverse of [`parse_sub_algo`] + [`parse_algo_config`]
pub fn to_params(sub_algo: SubAlgo, algo: &AlgoConfig) -> BTreeMap<String, String> {
    let mode = match sub_algo {
        SubAlgo::Dim2d => "2d",
    };

    [
        (MODE_KEY, mode.to_string()),
        ("optimize_on_start", algo.optimize_on_start.to_string()),
        ("optimize_every_n_nodes", algo.optimize_every_n_nodes.to_string()),
        ("num_range_data", algo.num_range_data.to_string()),
        ("missing_data_ray_length", algo.missing_data_ray_length.to_string()),
        ("max_range", algo.max_range.to_string()),
        ("min_range", algo.min_range.to_string()),
        ("max_submaps_to_keep", algo.max_submaps_to_keep.to_string()),
        ("fresh_submaps_count", algo.fresh_submaps_count.to_string()),
        ("min_covered_area", algo.min_covered_area.to_string()),
        ("min_added_submaps_count", algo.min_added_submaps_count.to_string()),
        ("occupied_space_weight", algo.occupied_space_weight.to_string()),
        ("translation_weight", algo.translation_weight.to_string()),
        ("rotation_weight", algo.rotation_weight.to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}
