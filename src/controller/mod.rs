//! Online EV charging controller
//!
//! Watches every electric vehicle in a running simulation, sends vehicles low
//! on charge to the nearest reachable charging station and schedules a stop
//! long enough to fill the battery once they get there.

mod charge_duration;
mod config;
mod orchestrator;
mod route_composer;
mod simulator;
mod station_locator;
mod stats;
mod telemetry;
mod tracker;

pub use charge_duration::{duration_for, duration_seconds, DurationError};
pub use config::{
    ConfigError, ControllerConfig, ACTUAL_CAPACITY_PARAM, DEFAULT_EV_TYPES, DEFAULT_SOC_THRESHOLD,
    MAXIMUM_CAPACITY_PARAM,
};
pub use orchestrator::Orchestrator;
pub use route_composer::{compose_detour, splice_legs, ComposeError};
pub use simulator::{
    EdgeId, LaneId, Position, SimResult, Simulator, SimulatorError, StationId, VehicleId,
};
pub use station_locator::{find_nearest_reachable, StationAssignment};
pub use stats::RunStats;
pub use telemetry::{read_numeric_parameter, try_read_numeric_parameter, BatterySnapshot};
pub use tracker::{FailureReason, VehicleRecord, VehicleState, VehicleTracker};
