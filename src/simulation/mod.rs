//! Standalone traffic simulation
//!
//! A small step-driven traffic world with electric vehicles and charging
//! stations. It implements the controller's `Simulator` contract so the
//! controller can be run and tested without an external traffic engine.

mod charging_station;
mod control;
mod road_network;
mod types;
mod vehicle;
mod world;

pub use charging_station::SimChargingStation;
pub use road_network::{RoadEdge, SimRoadNetwork};
pub use types::{
    lane_for, Battery, JunctionId, SimRoad, TripSpec, SAFE_FOLLOWING_MULTIPLIER, VEHICLE_LENGTH,
};
pub use vehicle::{ChargingStop, SimVehicle, VehicleUpdateResult};
pub use world::{SimWorld, DEFAULT_STEP_SECS, GRID_SPACING, TEST_STATION_POWER};
