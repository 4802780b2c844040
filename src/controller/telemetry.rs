//! Fail-soft reads of vehicle telemetry

use log::warn;

use super::config::ControllerConfig;
use super::simulator::{SimResult, Simulator, VehicleId};

/// Reads a numeric vehicle parameter.
///
/// `Ok(None)` when the call fails for this vehicle or the value is empty or
/// not a finite number. Only a fatal simulator error is returned.
pub fn try_read_numeric_parameter<S: Simulator + ?Sized>(
    sim: &S,
    vehicle: &VehicleId,
    name: &str,
) -> SimResult<Option<f64>> {
    let raw = match sim.read_parameter(vehicle, name) {
        Ok(raw) => raw,
        Err(err) if err.is_fatal() => return Err(err),
        Err(err) => {
            warn!("Reading parameter {} of {} failed: {}", name, vehicle, err);
            return Ok(None);
        }
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        warn!("Parameter {} of {} is not set", name, vehicle);
        return Ok(None);
    }

    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => {
            warn!("Parameter {} of {} is not numeric: '{}'", name, vehicle, trimmed);
            Ok(None)
        }
    }
}

/// Reads a numeric vehicle parameter, falling back to `0.0`.
///
/// A returned zero may be a real reading or a missing one; use
/// [`try_read_numeric_parameter`] where the difference matters.
pub fn read_numeric_parameter<S: Simulator + ?Sized>(
    sim: &S,
    vehicle: &VehicleId,
    name: &str,
) -> SimResult<f64> {
    Ok(try_read_numeric_parameter(sim, vehicle, name)?.unwrap_or(0.0))
}

/// Battery levels read fresh from the simulator for a single step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatterySnapshot {
    pub current_capacity: f64,
    pub maximum_capacity: f64,
}

impl BatterySnapshot {
    /// `Ok(None)` when either level is unavailable or the maximum is not
    /// positive
    pub fn read<S: Simulator + ?Sized>(
        sim: &S,
        vehicle: &VehicleId,
        config: &ControllerConfig,
    ) -> SimResult<Option<Self>> {
        let Some(current_capacity) =
            try_read_numeric_parameter(sim, vehicle, &config.actual_capacity_param)?
        else {
            return Ok(None);
        };
        let Some(maximum_capacity) =
            try_read_numeric_parameter(sim, vehicle, &config.maximum_capacity_param)?
        else {
            return Ok(None);
        };

        if maximum_capacity <= 0.0 {
            warn!(
                "Maximum battery capacity of {} is {}, state of charge undefined",
                vehicle, maximum_capacity
            );
            return Ok(None);
        }

        Ok(Some(Self {
            current_capacity,
            maximum_capacity,
        }))
    }

    /// Ratio of current to maximum energy, clamped to [0, 1]
    pub fn state_of_charge(&self) -> f64 {
        (self.current_capacity / self.maximum_capacity).clamp(0.0, 1.0)
    }
}
