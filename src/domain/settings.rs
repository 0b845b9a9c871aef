//! Application settings and their validation.
//!
//! ```ini
//! [storage]
//! data_file = ratesheet.json
//!
//! [calculation]
//! volumetric_divisor = 6000
//! overflow_tolerance = 0.001
//! default_model = fixed
//! ```

use crate::domain::calculation::DEFAULT_VOLUMETRIC_DIVISOR;
use crate::domain::error::RatesheetError;
use crate::domain::model_key::ModelKey;
use crate::domain::tariff::{Tariff, DEFAULT_OVERFLOW_TOLERANCE};
use crate::ports::config_port::ConfigPort;
use std::path::PathBuf;

pub const DEFAULT_DATA_FILE: &str = "ratesheet.json";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub data_file: PathBuf,
    pub volumetric_divisor: f64,
    pub overflow_tolerance: f64,
    pub default_model: ModelKey,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
            volumetric_divisor: DEFAULT_VOLUMETRIC_DIVISOR,
            overflow_tolerance: DEFAULT_OVERFLOW_TOLERANCE,
            default_model: ModelKey::Fixed,
        }
    }
}

impl Settings {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, RatesheetError> {
        let defaults = Settings::default();
        Ok(Self {
            data_file: config
                .get_string("storage", "data_file")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.data_file),
            volumetric_divisor: validate_divisor(config)?,
            overflow_tolerance: validate_tolerance(config)?,
            default_model: validate_default_model(config)?,
        })
    }

    pub fn tariff(&self) -> Tariff {
        Tariff {
            overflow_tolerance: self.overflow_tolerance,
        }
    }
}

fn invalid(key: &str, reason: &str) -> RatesheetError {
    RatesheetError::ConfigInvalid {
        section: "calculation".to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn validate_divisor(config: &dyn ConfigPort) -> Result<f64, RatesheetError> {
    if config.is_non_numeric("calculation", "volumetric_divisor") {
        return Err(invalid("volumetric_divisor", "volumetric_divisor must be a number"));
    }
    let value = config.get_double(
        "calculation",
        "volumetric_divisor",
        DEFAULT_VOLUMETRIC_DIVISOR,
    );
    if !(value > 0.0) {
        return Err(invalid(
            "volumetric_divisor",
            "volumetric_divisor must be positive",
        ));
    }
    Ok(value)
}

fn validate_tolerance(config: &dyn ConfigPort) -> Result<f64, RatesheetError> {
    if config.is_non_numeric("calculation", "overflow_tolerance") {
        return Err(invalid("overflow_tolerance", "overflow_tolerance must be a number"));
    }
    let value = config.get_double(
        "calculation",
        "overflow_tolerance",
        DEFAULT_OVERFLOW_TOLERANCE,
    );
    if !(value >= 0.0) {
        return Err(invalid(
            "overflow_tolerance",
            "overflow_tolerance must be non-negative",
        ));
    }
    Ok(value)
}

fn validate_default_model(config: &dyn ConfigPort) -> Result<ModelKey, RatesheetError> {
    match config.get_string("calculation", "default_model") {
        None => Ok(ModelKey::Fixed),
        Some(s) => s
            .parse()
            .map_err(|e: crate::domain::model_key::UnknownModelKey| {
                invalid("default_model", &e.to_string())
            }),
    }
}
