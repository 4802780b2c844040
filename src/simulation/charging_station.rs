//! Charging stations placed along lanes

use crate::controller::{EdgeId, LaneId, StationId};

#[derive(Debug, Clone)]
pub struct SimChargingStation {
    pub id: StationId,
    pub lane: LaneId,
    pub edge: EdgeId,
    /// Offsets along the lane, in meters
    pub start_pos: f64,
    pub end_pos: f64,
    /// Rated power in W
    pub power: f64,
    /// Vehicles that have completed a stop here
    pub sessions: u32,
}

impl SimChargingStation {
    pub fn new(
        id: StationId,
        lane: LaneId,
        edge: EdgeId,
        start_pos: f64,
        end_pos: f64,
        power: f64,
    ) -> Self {
        Self {
            id,
            lane,
            edge,
            start_pos,
            end_pos,
            power,
            sessions: 0,
        }
    }
}
