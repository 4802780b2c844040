//! Core types for the in-process traffic simulation

use crate::controller::{EdgeId, LaneId, Position};

/// A junction in the road network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JunctionId(pub usize);

/// A one-way road between two junctions, carrying a single lane
#[derive(Debug, Clone)]
pub struct SimRoad {
    pub id: EdgeId,
    pub lane: LaneId,
    pub from: JunctionId,
    pub to: JunctionId,
    pub length: f64,
}

impl SimRoad {
    pub fn new(
        id: EdgeId,
        from: JunctionId,
        to: JunctionId,
        from_pos: &Position,
        to_pos: &Position,
    ) -> Self {
        let lane = lane_for(&id);
        Self {
            id,
            lane,
            from,
            to,
            length: from_pos.distance(to_pos),
        }
    }
}

/// Lane naming follows `<edge>_<index>`; every road has lane 0 only
pub fn lane_for(edge: &EdgeId) -> LaneId {
    LaneId(format!("{}_0", edge))
}

/// Battery device of an electric vehicle. Energies in Wh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Battery {
    pub actual_wh: f64,
    pub maximum_wh: f64,
    pub consumption_wh_per_m: f64,
}

impl Battery {
    pub fn new(actual_wh: f64, maximum_wh: f64, consumption_wh_per_m: f64) -> Self {
        Self {
            actual_wh: actual_wh.clamp(0.0, maximum_wh),
            maximum_wh,
            consumption_wh_per_m,
        }
    }

    pub fn drain(&mut self, meters: f64) {
        self.actual_wh = (self.actual_wh - meters * self.consumption_wh_per_m).max(0.0);
    }

    pub fn charge(&mut self, power_w: f64, secs: f64) {
        self.actual_wh = (self.actual_wh + power_w * secs / 3600.0).min(self.maximum_wh);
    }
}

/// A trip waiting for its departure time
#[derive(Debug, Clone)]
pub struct TripSpec {
    pub type_id: String,
    pub from: EdgeId,
    pub to: EdgeId,
    pub depart: f64,
    pub speed: f64,
    pub battery: Option<Battery>,
}

/// Length reserved per vehicle when following another one, in meters
pub const VEHICLE_LENGTH: f64 = 5.0;

/// Minimum gap kept to the vehicle ahead, as a multiple of VEHICLE_LENGTH
pub const SAFE_FOLLOWING_MULTIPLIER: f64 = 1.5;
