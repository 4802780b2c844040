//! Controller tuning knobs

use std::collections::BTreeSet;

use thiserror::Error;

/// State of charge below which a tracked vehicle is sent to a charger
pub const DEFAULT_SOC_THRESHOLD: f64 = 0.47;

/// Vehicle types the controller manages by default
pub const DEFAULT_EV_TYPES: [&str; 3] = ["ev_car", "ev_truck", "ev_bus"];

pub const ACTUAL_CAPACITY_PARAM: &str = "device.battery.actualBatteryCapacity";
pub const MAXIMUM_CAPACITY_PARAM: &str = "device.battery.maximumBatteryCapacity";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("state of charge threshold must be in (0, 1], got {0}")]
    ThresholdOutOfRange(f64),

    #[error("at least one EV type must be tracked")]
    NoEvTypes,

    #[error("battery parameter names must not be empty")]
    EmptyParameterName,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    pub soc_threshold: f64,
    pub ev_types: BTreeSet<String>,
    pub actual_capacity_param: String,
    pub maximum_capacity_param: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            soc_threshold: DEFAULT_SOC_THRESHOLD,
            ev_types: DEFAULT_EV_TYPES.iter().map(|t| t.to_string()).collect(),
            actual_capacity_param: ACTUAL_CAPACITY_PARAM.to_string(),
            maximum_capacity_param: MAXIMUM_CAPACITY_PARAM.to_string(),
        }
    }
}

impl ControllerConfig {
    pub fn with_threshold(mut self, soc_threshold: f64) -> Self {
        self.soc_threshold = soc_threshold;
        self
    }

    pub fn with_ev_types<I, S>(mut self, ev_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ev_types = ev_types.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.soc_threshold > 0.0 && self.soc_threshold <= 1.0) {
            return Err(ConfigError::ThresholdOutOfRange(self.soc_threshold));
        }
        if self.ev_types.is_empty() {
            return Err(ConfigError::NoEvTypes);
        }
        if self.actual_capacity_param.is_empty() || self.maximum_capacity_param.is_empty() {
            return Err(ConfigError::EmptyParameterName);
        }
        Ok(())
    }

    pub fn is_tracked_type(&self, type_id: &str) -> bool {
        self.ev_types.contains(type_id)
    }
}
