//! Contract between the controller and the traffic simulation it steers
//!
//! The controller never advances vehicles itself. Everything it knows about
//! the world comes through [`Simulator`], and every command it issues goes
//! back through it.

use std::fmt;

use thiserror::Error;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

string_id!(
    /// Opaque vehicle identifier, stable for the vehicle's lifetime
    VehicleId
);
string_id!(
    /// Road segment identifier
    EdgeId
);
string_id!(
    /// Lane identifier (a lane belongs to exactly one edge)
    LaneId
);
string_id!(
    /// Charging station identifier
    StationId
);

/// A 2D position in network coordinates (meters)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Position) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn lerp(&self, other: &Position, t: f64) -> Position {
        Position {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }
}

/// Errors a simulator call can report
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulatorError {
    #[error("vehicle '{0}' is not known to the simulation")]
    UnknownVehicle(VehicleId),

    #[error("edge '{0}' is not known to the simulation")]
    UnknownEdge(EdgeId),

    #[error("lane '{0}' is not known to the simulation")]
    UnknownLane(LaneId),

    #[error("charging station '{0}' is not known to the simulation")]
    UnknownStation(StationId),

    #[error("route for vehicle '{vehicle}' rejected: {reason}")]
    InvalidRoute { vehicle: VehicleId, reason: String },

    #[error("stop for vehicle '{vehicle}' at '{station}' rejected: {reason}")]
    StopRejected {
        vehicle: VehicleId,
        station: StationId,
        reason: String,
    },

    #[error("connection to the simulation lost: {0}")]
    Disconnected(String),
}

impl SimulatorError {
    /// Only a lost connection ends the run. Everything else concerns a single
    /// vehicle or station and is absorbed by the controller.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SimulatorError::Disconnected(_))
    }
}

pub type SimResult<T> = Result<T, SimulatorError>;

/// Query and command surface of a step-driven traffic simulation.
///
/// Calls are synchronous and the controller issues them from a single
/// thread between two `advance_time` calls.
pub trait Simulator {
    /// Advance simulated time by one step
    fn advance_time(&mut self) -> SimResult<()>;

    /// Whether any vehicle is still live or waiting to depart
    fn pending_activity(&self) -> SimResult<bool>;

    /// Live vehicles, in the simulation's enumeration order
    fn list_live_vehicles(&self) -> SimResult<Vec<VehicleId>>;

    fn vehicle_type(&self, vehicle: &VehicleId) -> SimResult<String>;
    fn vehicle_position(&self, vehicle: &VehicleId) -> SimResult<Position>;
    fn vehicle_current_segment(&self, vehicle: &VehicleId) -> SimResult<EdgeId>;
    fn vehicle_lane(&self, vehicle: &VehicleId) -> SimResult<LaneId>;
    fn vehicle_route(&self, vehicle: &VehicleId) -> SimResult<Vec<EdgeId>>;

    /// Raw parameter value; an empty string means the parameter is not set
    fn read_parameter(&self, vehicle: &VehicleId, name: &str) -> SimResult<String>;

    fn set_route(&mut self, vehicle: &VehicleId, route: &[EdgeId]) -> SimResult<()>;

    /// Ask the vehicle to halt at `station` for `duration_secs`
    fn schedule_stop(
        &mut self,
        vehicle: &VehicleId,
        station: &StationId,
        duration_secs: u32,
    ) -> SimResult<()>;

    fn list_stations(&self) -> SimResult<Vec<StationId>>;
    fn station_segment(&self, station: &StationId) -> SimResult<EdgeId>;
    fn station_lane(&self, station: &StationId) -> SimResult<LaneId>;
    fn station_position(&self, station: &StationId) -> SimResult<Position>;

    /// Rated charging power in W
    fn station_power(&self, station: &StationId) -> SimResult<f64>;

    /// Ordered edges from `from` to `to`, both included. Empty when no route
    /// exists.
    fn find_route(&self, from: &EdgeId, to: &EdgeId) -> SimResult<Vec<EdgeId>>;
}
