//! Controller access to the in-process world
//!
//! Exposes [`SimWorld`] through the same query and command surface an
//! external traffic engine would offer.

use log::debug;

use super::charging_station::SimChargingStation;
use super::vehicle::SimVehicle;
use super::world::SimWorld;
use crate::controller::{
    EdgeId, LaneId, Position, SimResult, Simulator, SimulatorError, StationId, VehicleId,
};

impl SimWorld {
    fn live_vehicle(&self, vehicle: &VehicleId) -> SimResult<&SimVehicle> {
        self.vehicles
            .get(vehicle)
            .ok_or_else(|| SimulatorError::UnknownVehicle(vehicle.clone()))
    }

    fn station(&self, station: &StationId) -> SimResult<&SimChargingStation> {
        self.stations
            .get(station)
            .ok_or_else(|| SimulatorError::UnknownStation(station.clone()))
    }

    fn ensure_edge(&self, edge: &EdgeId) -> SimResult<()> {
        match self.road_network.get_road(edge) {
            Some(_) => Ok(()),
            None => Err(SimulatorError::UnknownEdge(edge.clone())),
        }
    }
}

impl Simulator for SimWorld {
    fn advance_time(&mut self) -> SimResult<()> {
        if self.horizon_reached() {
            return Err(SimulatorError::Disconnected(format!(
                "simulation ended after {} steps",
                self.steps
            )));
        }
        self.tick();
        Ok(())
    }

    fn pending_activity(&self) -> SimResult<bool> {
        Ok(!self.horizon_reached()
            && (self.live_vehicle_count() > 0 || self.pending_trip_count() > 0))
    }

    fn list_live_vehicles(&self) -> SimResult<Vec<VehicleId>> {
        Ok(self.vehicle_order.clone())
    }

    fn vehicle_type(&self, vehicle: &VehicleId) -> SimResult<String> {
        Ok(self.live_vehicle(vehicle)?.type_id.clone())
    }

    fn vehicle_position(&self, vehicle: &VehicleId) -> SimResult<Position> {
        Ok(self.live_vehicle(vehicle)?.position)
    }

    fn vehicle_current_segment(&self, vehicle: &VehicleId) -> SimResult<EdgeId> {
        self.live_vehicle(vehicle)?
            .current_edge()
            .cloned()
            .ok_or_else(|| SimulatorError::UnknownVehicle(vehicle.clone()))
    }

    fn vehicle_lane(&self, vehicle: &VehicleId) -> SimResult<LaneId> {
        let edge = self.vehicle_current_segment(vehicle)?;
        self.road_network
            .get_road(&edge)
            .map(|road| road.lane.clone())
            .ok_or(SimulatorError::UnknownEdge(edge))
    }

    fn vehicle_route(&self, vehicle: &VehicleId) -> SimResult<Vec<EdgeId>> {
        Ok(self.live_vehicle(vehicle)?.route.clone())
    }

    fn read_parameter(&self, vehicle: &VehicleId, name: &str) -> SimResult<String> {
        Ok(self.live_vehicle(vehicle)?.parameter(name))
    }

    fn set_route(&mut self, vehicle: &VehicleId, route: &[EdgeId]) -> SimResult<()> {
        let current = self.vehicle_current_segment(vehicle)?;
        let invalid = |reason: String| SimulatorError::InvalidRoute {
            vehicle: vehicle.clone(),
            reason,
        };

        for edge in route {
            self.ensure_edge(edge)?;
        }
        match route.first() {
            Some(first) if *first == current => {}
            Some(first) => {
                return Err(invalid(format!(
                    "route starts on {} but vehicle is on {}",
                    first, current
                )))
            }
            None => return Err(invalid("route is empty".to_string())),
        }
        if let Some(pair) = route
            .windows(2)
            .find(|pair| !self.road_network.connects(&pair[0], &pair[1]))
        {
            return Err(invalid(format!("{} does not lead to {}", pair[0], pair[1])));
        }

        let target = self
            .vehicles
            .get_mut(vehicle)
            .ok_or_else(|| SimulatorError::UnknownVehicle(vehicle.clone()))?;
        target.replace_route(route.to_vec());
        debug!("{} rerouted over {} edges", vehicle, route.len());
        Ok(())
    }

    fn schedule_stop(
        &mut self,
        vehicle: &VehicleId,
        station: &StationId,
        duration_secs: u32,
    ) -> SimResult<()> {
        let charging_station = self.station(station)?.clone();
        let target = self
            .vehicles
            .get_mut(vehicle)
            .ok_or_else(|| SimulatorError::UnknownVehicle(vehicle.clone()))?;

        target
            .accept_stop(&charging_station, duration_secs)
            .map_err(|reason| SimulatorError::StopRejected {
                vehicle: vehicle.clone(),
                station: station.clone(),
                reason,
            })
    }

    fn list_stations(&self) -> SimResult<Vec<StationId>> {
        Ok(self.stations.keys().cloned().collect())
    }

    fn station_segment(&self, station: &StationId) -> SimResult<EdgeId> {
        Ok(self.station(station)?.edge.clone())
    }

    fn station_lane(&self, station: &StationId) -> SimResult<LaneId> {
        Ok(self.station(station)?.lane.clone())
    }

    fn station_position(&self, station: &StationId) -> SimResult<Position> {
        let station = self.station(station)?;
        self.road_network
            .position_on_road(&station.edge, station.start_pos)
            .ok_or_else(|| SimulatorError::UnknownEdge(station.edge.clone()))
    }

    fn station_power(&self, station: &StationId) -> SimResult<f64> {
        Ok(self.station(station)?.power)
    }

    fn find_route(&self, from: &EdgeId, to: &EdgeId) -> SimResult<Vec<EdgeId>> {
        self.ensure_edge(from)?;
        self.ensure_edge(to)?;

        match self.road_network.find_route(from, to) {
            Ok(route) => Ok(route.unwrap_or_default()),
            Err(err) => {
                debug!("Routing {} -> {} failed: {:#}", from, to, err);
                Ok(Vec::new())
            }
        }
    }
}
