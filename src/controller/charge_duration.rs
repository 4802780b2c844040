//! Charging stop duration estimate

use thiserror::Error;

use super::config::ControllerConfig;
use super::simulator::{Simulator, SimulatorError, StationId, VehicleId};
use super::telemetry::read_numeric_parameter;

const SECONDS_PER_HOUR: f64 = 3600.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DurationError {
    #[error("station {station} has unusable charging power {power}")]
    UnusablePower { station: StationId, power: f64 },

    #[error(transparent)]
    Simulator(#[from] SimulatorError),
}

/// Seconds needed to fill the missing energy at `power` W, rounded down.
///
/// Capacities are in Wh. A battery already at or above its maximum needs no
/// time at all.
pub fn duration_for(
    station: &StationId,
    current_capacity: f64,
    maximum_capacity: f64,
    power: f64,
) -> Result<u32, DurationError> {
    if !power.is_finite() || power <= 0.0 {
        return Err(DurationError::UnusablePower {
            station: station.clone(),
            power,
        });
    }

    let energy_needed = (maximum_capacity - current_capacity).max(0.0);
    let seconds = (energy_needed * SECONDS_PER_HOUR / power).floor();
    Ok(seconds.min(u32::MAX as f64) as u32)
}

/// Seconds `vehicle` must stay at `station` to charge to full
pub fn duration_seconds<S: Simulator + ?Sized>(
    sim: &S,
    vehicle: &VehicleId,
    station: &StationId,
    config: &ControllerConfig,
) -> Result<u32, DurationError> {
    let current = read_numeric_parameter(sim, vehicle, &config.actual_capacity_param)?;
    let maximum = read_numeric_parameter(sim, vehicle, &config.maximum_capacity_param)?;
    let power = sim.station_power(station)?;
    duration_for(station, current, maximum, power)
}
