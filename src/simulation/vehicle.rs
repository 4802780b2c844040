//! Vehicle movement and charging for the in-process simulation

use anyhow::{Context, Result};
use log::debug;
use ordered_float::OrderedFloat;
use std::collections::BTreeMap;

use super::charging_station::SimChargingStation;
use super::road_network::SimRoadNetwork;
use super::types::{Battery, SAFE_FOLLOWING_MULTIPLIER, VEHICLE_LENGTH};
use crate::controller::{
    EdgeId, Position, StationId, VehicleId, ACTUAL_CAPACITY_PARAM, MAXIMUM_CAPACITY_PARAM,
};

/// Result of a vehicle update indicating what the world should do with it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleUpdateResult {
    Continue, // Still driving or halted
    Arrived,  // Reached the end of its route
}

/// A charging stop the vehicle has accepted
#[derive(Debug, Clone, PartialEq)]
pub struct ChargingStop {
    pub station: StationId,
    /// Index into the route of the edge the stop is on
    pub route_position: usize,
    /// Offset along that edge where the vehicle halts
    pub position: f64,
    pub duration_secs: u32,
    /// Set once the vehicle has halted
    pub remaining_secs: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct SimVehicle {
    pub id: VehicleId,
    pub type_id: String,
    pub route: Vec<EdgeId>,
    pub route_index: usize,
    pub distance_along_road: OrderedFloat<f64>,
    /// Free-flow speed in m/s
    pub speed: f64,
    pub position: Position,
    /// Only electric vehicles carry a battery device
    pub battery: Option<Battery>,
    pub stop: Option<ChargingStop>,
    pub distance_travelled: f64,
}

impl SimVehicle {
    pub fn new(
        id: VehicleId,
        type_id: String,
        route: Vec<EdgeId>,
        speed: f64,
        position: Position,
        battery: Option<Battery>,
    ) -> Self {
        Self {
            id,
            type_id,
            route,
            route_index: 0,
            distance_along_road: OrderedFloat(0.0),
            speed,
            position,
            battery,
            stop: None,
            distance_travelled: 0.0,
        }
    }

    pub fn current_edge(&self) -> Option<&EdgeId> {
        self.route.get(self.route_index)
    }

    pub fn is_charging(&self) -> bool {
        self.stop
            .as_ref()
            .is_some_and(|stop| stop.remaining_secs.is_some())
    }

    /// Device parameter as text; empty when the vehicle has no such device
    pub fn parameter(&self, name: &str) -> String {
        match (&self.battery, name) {
            (Some(battery), ACTUAL_CAPACITY_PARAM) => format!("{:.2}", battery.actual_wh),
            (Some(battery), MAXIMUM_CAPACITY_PARAM) => format!("{:.2}", battery.maximum_wh),
            _ => String::new(),
        }
    }

    /// Swap in a new route starting at the current edge. A stop that has not
    /// been reached yet is dropped since its route index no longer applies.
    pub fn replace_route(&mut self, route: Vec<EdgeId>) {
        self.route = route;
        self.route_index = 0;
        if self.stop.as_ref().is_some_and(|stop| stop.remaining_secs.is_none()) {
            debug!("{} dropped its pending stop after a reroute", self.id);
            self.stop = None;
        }
    }

    /// Accept a charging stop at `station` if its edge is still ahead
    pub fn accept_stop(
        &mut self,
        station: &SimChargingStation,
        duration_secs: u32,
    ) -> Result<(), String> {
        if self.stop.is_some() {
            return Err("vehicle already has a charging stop".to_string());
        }

        let distance = self.distance_along_road.into_inner();
        let route_position = self
            .route
            .iter()
            .enumerate()
            .skip(self.route_index)
            .find(|(index, edge)| {
                **edge == station.edge
                    && (*index > self.route_index || distance <= station.end_pos)
            })
            .map(|(index, _)| index)
            .ok_or_else(|| format!("edge {} is not ahead on the route", station.edge))?;

        let position = if route_position == self.route_index {
            station.start_pos.max(distance)
        } else {
            station.start_pos
        };

        self.stop = Some(ChargingStop {
            station: station.id.clone(),
            route_position,
            position,
            duration_secs,
            remaining_secs: None,
        });
        Ok(())
    }

    /// Advance the vehicle by `delta_secs`
    pub fn update(
        &mut self,
        delta_secs: f64,
        road_network: &mut SimRoadNetwork,
        stations: &mut BTreeMap<StationId, SimChargingStation>,
    ) -> Result<VehicleUpdateResult> {
        if self.charge_at_stop(delta_secs, stations)? {
            return Ok(VehicleUpdateResult::Continue);
        }

        let edge = self.current_edge().context("Route is exhausted")?.clone();
        let road_length = road_network
            .get_road(&edge)
            .context("Road not found")?
            .length;
        let prev_distance = self.distance_along_road;

        let mut distance_delta = self.speed * delta_secs;

        if let Some(gap) = road_network.gap_ahead(&self.id, &edge, prev_distance) {
            let safe_following_distance = VEHICLE_LENGTH * SAFE_FOLLOWING_MULTIPLIER;
            distance_delta = distance_delta.min((gap - safe_following_distance).max(0.0));
        }

        // Halt at a pending stop on this edge instead of driving past it
        let mut halted = false;
        if let Some(stop) = self.stop.as_mut() {
            if stop.remaining_secs.is_none() && stop.route_position == self.route_index {
                let to_stop = stop.position - prev_distance.into_inner();
                if to_stop <= distance_delta {
                    distance_delta = to_stop.max(0.0);
                    stop.remaining_secs = Some(f64::from(stop.duration_secs));
                    halted = true;
                    debug!("{} halted at {} for {}s", self.id, stop.station, stop.duration_secs);
                }
            }
        }

        self.distance_along_road = OrderedFloat(prev_distance.into_inner() + distance_delta);
        self.distance_travelled += distance_delta;
        if let Some(battery) = self.battery.as_mut() {
            battery.drain(distance_delta);
        }

        if !halted && self.distance_along_road >= OrderedFloat(road_length) {
            if self.route_index + 1 >= self.route.len() {
                road_network.remove_vehicle_at(&self.id, &edge, prev_distance);
                if let Some(end) = road_network.position_on_road(&edge, road_length) {
                    self.position = end;
                }
                return Ok(VehicleUpdateResult::Arrived);
            }

            self.route_index += 1;
            self.distance_along_road = OrderedFloat(0.0);
        }

        let current = self.current_edge().context("No next road")?.clone();
        self.position = road_network
            .position_on_road(&current, self.distance_along_road.into_inner())
            .context("Road geometry not found")?;

        road_network.update_vehicle_road_position(
            &self.id,
            &current,
            self.distance_along_road,
            Some((&edge, prev_distance)),
        );

        Ok(VehicleUpdateResult::Continue)
    }

    /// Charge while halted at a stop. Returns whether the vehicle stays put
    /// this step.
    fn charge_at_stop(
        &mut self,
        delta_secs: f64,
        stations: &mut BTreeMap<StationId, SimChargingStation>,
    ) -> Result<bool> {
        let Some(stop) = self.stop.as_mut() else {
            return Ok(false);
        };
        let Some(remaining) = stop.remaining_secs else {
            return Ok(false);
        };

        let station = stations
            .get_mut(&stop.station)
            .context("Charging station not found")?;
        if let Some(battery) = self.battery.as_mut() {
            battery.charge(station.power, delta_secs.min(remaining));
        }

        let remaining = remaining - delta_secs;
        if remaining > 0.0 {
            stop.remaining_secs = Some(remaining);
            return Ok(true);
        }

        station.sessions += 1;
        debug!("{} finished charging at {}", self.id, station.id);
        self.stop = None;
        Ok(true)
    }
}
