//! Scripted simulator double shared by the integration tests
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;

use ev_detour::controller::{
    EdgeId, LaneId, Position, SimResult, Simulator, SimulatorError, StationId, VehicleId,
    ACTUAL_CAPACITY_PARAM, MAXIMUM_CAPACITY_PARAM,
};

/// Every call the controller made, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    AdvanceTime,
    PendingActivity,
    ListLiveVehicles,
    VehicleType(VehicleId),
    VehiclePosition(VehicleId),
    VehicleSegment(VehicleId),
    VehicleLane(VehicleId),
    VehicleRoute(VehicleId),
    ReadParameter(VehicleId, String),
    SetRoute(VehicleId, Vec<EdgeId>),
    ScheduleStop(VehicleId, StationId, u32),
    ListStations,
    StationSegment(StationId),
    StationLane(StationId),
    StationPosition(StationId),
    StationPower(StationId),
    FindRoute(EdgeId, EdgeId),
}

impl Call {
    /// Name of the trait method that produced this call
    pub fn method(&self) -> &'static str {
        match self {
            Call::AdvanceTime => "advance_time",
            Call::PendingActivity => "pending_activity",
            Call::ListLiveVehicles => "list_live_vehicles",
            Call::VehicleType(_) => "vehicle_type",
            Call::VehiclePosition(_) => "vehicle_position",
            Call::VehicleSegment(_) => "vehicle_current_segment",
            Call::VehicleLane(_) => "vehicle_lane",
            Call::VehicleRoute(_) => "vehicle_route",
            Call::ReadParameter(..) => "read_parameter",
            Call::SetRoute(..) => "set_route",
            Call::ScheduleStop(..) => "schedule_stop",
            Call::ListStations => "list_stations",
            Call::StationSegment(_) => "station_segment",
            Call::StationLane(_) => "station_lane",
            Call::StationPosition(_) => "station_position",
            Call::StationPower(_) => "station_power",
            Call::FindRoute(..) => "find_route",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScriptedVehicle {
    pub type_id: String,
    pub position: Position,
    pub edge: EdgeId,
    pub lane: LaneId,
    pub route: Vec<EdgeId>,
    pub params: HashMap<String, String>,
}

impl ScriptedVehicle {
    /// An EV on `edge` with the given battery levels in Wh
    pub fn ev(type_id: &str, edge: &str, route: &[&str], actual: f64, maximum: f64) -> Self {
        let mut params = HashMap::new();
        params.insert(ACTUAL_CAPACITY_PARAM.to_string(), actual.to_string());
        params.insert(MAXIMUM_CAPACITY_PARAM.to_string(), maximum.to_string());
        Self {
            type_id: type_id.to_string(),
            position: Position::new(0.0, 0.0),
            edge: EdgeId::from(edge),
            lane: lane(edge),
            route: route.iter().map(|e| EdgeId::from(*e)).collect(),
            params,
        }
    }

    /// A vehicle without a battery device
    pub fn conventional(type_id: &str, edge: &str, route: &[&str]) -> Self {
        Self {
            params: HashMap::new(),
            ..Self::ev(type_id, edge, route, 0.0, 0.0)
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScriptedStation {
    pub edge: EdgeId,
    pub lane: LaneId,
    pub position: Position,
    pub power: f64,
    /// Geometry lookups for this station fail
    pub broken: bool,
}

impl ScriptedStation {
    pub fn new(edge: &str, x: f64, y: f64, power: f64) -> Self {
        Self {
            edge: EdgeId::from(edge),
            lane: lane(edge),
            position: Position::new(x, y),
            power,
            broken: false,
        }
    }
}

pub fn lane(edge: &str) -> LaneId {
    LaneId(format!("{}_0", edge))
}

pub fn edges(ids: &[&str]) -> Vec<EdgeId> {
    ids.iter().map(|e| EdgeId::from(*e)).collect()
}

#[derive(Default)]
pub struct ScriptedSimulator {
    vehicle_order: Vec<VehicleId>,
    vehicles: HashMap<VehicleId, ScriptedVehicle>,
    station_order: Vec<StationId>,
    stations: HashMap<StationId, ScriptedStation>,
    routes: HashMap<(EdgeId, EdgeId), Vec<EdgeId>>,
    /// Steps left before the simulation reports no activity
    pub steps_remaining: u32,
    pub reject_stops: bool,
    pub reject_routes: bool,
    /// Fail `advance_time` once this many steps have run
    pub disconnect_after: Option<u32>,
    pub advances: u32,
    /// Method name to the call number (1-based) from which it reports a
    /// lost connection
    disconnect_on: HashMap<&'static str, usize>,
    call_counts: RefCell<HashMap<&'static str, usize>>,
    calls: RefCell<Vec<Call>>,
}

impl ScriptedSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vehicle(&mut self, id: &str, vehicle: ScriptedVehicle) -> VehicleId {
        let id = VehicleId::from(id);
        self.vehicle_order.push(id.clone());
        self.vehicles.insert(id.clone(), vehicle);
        id
    }

    /// Lists a vehicle the simulation cannot answer queries about
    pub fn add_ghost_vehicle(&mut self, id: &str) -> VehicleId {
        let id = VehicleId::from(id);
        self.vehicle_order.push(id.clone());
        id
    }

    pub fn add_station(&mut self, id: &str, station: ScriptedStation) -> StationId {
        let id = StationId::from(id);
        self.station_order.push(id.clone());
        self.stations.insert(id.clone(), station);
        id
    }

    pub fn add_route(&mut self, from: &str, to: &str, route: &[&str]) {
        self.routes
            .insert((EdgeId::from(from), EdgeId::from(to)), edges(route));
    }

    /// Put the vehicle on `edge` and its lane
    pub fn move_vehicle(&mut self, id: &VehicleId, edge: &str) {
        if let Some(vehicle) = self.vehicles.get_mut(id) {
            vehicle.edge = EdgeId::from(edge);
            vehicle.lane = lane(edge);
        }
    }

    pub fn set_param(&mut self, id: &VehicleId, name: &str, value: &str) {
        if let Some(vehicle) = self.vehicles.get_mut(id) {
            vehicle.params.insert(name.to_string(), value.to_string());
        }
    }

    /// Make the `nth` and every later call of `method` fail with a lost
    /// connection
    pub fn disconnect_on(&mut self, method: &'static str, nth: usize) {
        self.disconnect_on.insert(method, nth);
    }

    pub fn vehicle(&self, id: &VehicleId) -> &ScriptedVehicle {
        &self.vehicles[id]
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn count_calls(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls.borrow().iter().filter(|call| predicate(call)).count()
    }

    pub fn set_route_calls(&self) -> Vec<Vec<EdgeId>> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                Call::SetRoute(_, route) => Some(route.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn schedule_stop_calls(&self) -> Vec<(StationId, u32)> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                Call::ScheduleStop(_, station, duration) => Some((station.clone(), *duration)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    fn check_link(&self, method: &'static str) -> SimResult<()> {
        let mut counts = self.call_counts.borrow_mut();
        let count = counts.entry(method).or_insert(0);
        *count += 1;
        match self.disconnect_on.get(method) {
            Some(&from) if *count >= from => Err(SimulatorError::Disconnected(format!(
                "{} call {} dropped",
                method, count
            ))),
            _ => Ok(()),
        }
    }

    fn vehicle_entry(&self, id: &VehicleId) -> SimResult<&ScriptedVehicle> {
        self.vehicles
            .get(id)
            .ok_or_else(|| SimulatorError::UnknownVehicle(id.clone()))
    }

    fn station_entry(&self, id: &StationId) -> SimResult<&ScriptedStation> {
        match self.stations.get(id) {
            Some(station) if !station.broken => Ok(station),
            _ => Err(SimulatorError::UnknownStation(id.clone())),
        }
    }
}

impl Simulator for ScriptedSimulator {
    fn advance_time(&mut self) -> SimResult<()> {
        self.record(Call::AdvanceTime);
        if self.disconnect_after.is_some_and(|limit| self.advances >= limit) {
            return Err(SimulatorError::Disconnected("socket closed".to_string()));
        }
        self.advances += 1;
        self.steps_remaining = self.steps_remaining.saturating_sub(1);
        Ok(())
    }

    fn pending_activity(&self) -> SimResult<bool> {
        self.record(Call::PendingActivity);
        Ok(self.steps_remaining > 0)
    }

    fn list_live_vehicles(&self) -> SimResult<Vec<VehicleId>> {
        self.record(Call::ListLiveVehicles);
        self.check_link("list_live_vehicles")?;
        Ok(self.vehicle_order.clone())
    }

    fn vehicle_type(&self, vehicle: &VehicleId) -> SimResult<String> {
        self.record(Call::VehicleType(vehicle.clone()));
        Ok(self.vehicle_entry(vehicle)?.type_id.clone())
    }

    fn vehicle_position(&self, vehicle: &VehicleId) -> SimResult<Position> {
        self.record(Call::VehiclePosition(vehicle.clone()));
        Ok(self.vehicle_entry(vehicle)?.position)
    }

    fn vehicle_current_segment(&self, vehicle: &VehicleId) -> SimResult<EdgeId> {
        self.record(Call::VehicleSegment(vehicle.clone()));
        Ok(self.vehicle_entry(vehicle)?.edge.clone())
    }

    fn vehicle_lane(&self, vehicle: &VehicleId) -> SimResult<LaneId> {
        self.record(Call::VehicleLane(vehicle.clone()));
        Ok(self.vehicle_entry(vehicle)?.lane.clone())
    }

    fn vehicle_route(&self, vehicle: &VehicleId) -> SimResult<Vec<EdgeId>> {
        self.record(Call::VehicleRoute(vehicle.clone()));
        Ok(self.vehicle_entry(vehicle)?.route.clone())
    }

    fn read_parameter(&self, vehicle: &VehicleId, name: &str) -> SimResult<String> {
        self.record(Call::ReadParameter(vehicle.clone(), name.to_string()));
        self.check_link("read_parameter")?;
        Ok(self
            .vehicle_entry(vehicle)?
            .params
            .get(name)
            .cloned()
            .unwrap_or_default())
    }

    fn set_route(&mut self, vehicle: &VehicleId, route: &[EdgeId]) -> SimResult<()> {
        self.record(Call::SetRoute(vehicle.clone(), route.to_vec()));
        self.check_link("set_route")?;
        if self.reject_routes {
            return Err(SimulatorError::InvalidRoute {
                vehicle: vehicle.clone(),
                reason: "scripted rejection".to_string(),
            });
        }
        let entry = self
            .vehicles
            .get_mut(vehicle)
            .ok_or_else(|| SimulatorError::UnknownVehicle(vehicle.clone()))?;
        entry.route = route.to_vec();
        Ok(())
    }

    fn schedule_stop(
        &mut self,
        vehicle: &VehicleId,
        station: &StationId,
        duration_secs: u32,
    ) -> SimResult<()> {
        self.record(Call::ScheduleStop(
            vehicle.clone(),
            station.clone(),
            duration_secs,
        ));
        self.check_link("schedule_stop")?;
        if self.reject_stops {
            return Err(SimulatorError::StopRejected {
                vehicle: vehicle.clone(),
                station: station.clone(),
                reason: "scripted rejection".to_string(),
            });
        }
        Ok(())
    }

    fn list_stations(&self) -> SimResult<Vec<StationId>> {
        self.record(Call::ListStations);
        Ok(self.station_order.clone())
    }

    fn station_segment(&self, station: &StationId) -> SimResult<EdgeId> {
        self.record(Call::StationSegment(station.clone()));
        Ok(self.station_entry(station)?.edge.clone())
    }

    fn station_lane(&self, station: &StationId) -> SimResult<LaneId> {
        self.record(Call::StationLane(station.clone()));
        Ok(self.station_entry(station)?.lane.clone())
    }

    fn station_position(&self, station: &StationId) -> SimResult<Position> {
        self.record(Call::StationPosition(station.clone()));
        Ok(self.station_entry(station)?.position)
    }

    fn station_power(&self, station: &StationId) -> SimResult<f64> {
        self.record(Call::StationPower(station.clone()));
        self.check_link("station_power")?;
        Ok(self.station_entry(station)?.power)
    }

    fn find_route(&self, from: &EdgeId, to: &EdgeId) -> SimResult<Vec<EdgeId>> {
        self.record(Call::FindRoute(from.clone(), to.clone()));
        self.check_link("find_route")?;
        if let Some(route) = self.routes.get(&(from.clone(), to.clone())) {
            return Ok(route.clone());
        }
        if from == to {
            return Ok(vec![from.clone()]);
        }
        Ok(Vec::new())
    }
}
