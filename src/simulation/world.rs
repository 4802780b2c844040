//! Main simulation world that ties everything together
//!
//! This is the stand-in for an external traffic engine: it owns the road
//! network, the charging stations and the fleet, and advances them in fixed
//! time steps.

use anyhow::{Context, Result};
use log::{debug, warn};
use ordered_float::OrderedFloat;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::Rng;
use rand::SeedableRng;
use std::collections::{BTreeMap, HashMap};

use super::charging_station::SimChargingStation;
use super::road_network::SimRoadNetwork;
use super::types::{Battery, JunctionId, SimRoad, TripSpec};
use super::vehicle::{SimVehicle, VehicleUpdateResult};
use crate::controller::{EdgeId, Position, StationId, VehicleId};

/// Default length of one simulation step in seconds
pub const DEFAULT_STEP_SECS: f64 = 1.0;

/// Distance between neighbouring junctions of the test grid, in meters
pub const GRID_SPACING: f64 = 200.0;

/// Charging power of stations in the test world, in W
pub const TEST_STATION_POWER: f64 = 150_000.0;

/// Vehicle types spawned by [`SimWorld::spawn_random_trips`] with their
/// relative weight, battery size (Wh) and consumption (Wh/m). Types without a
/// battery are conventional vehicles.
const FLEET_MIX: [(&str, u32, Option<(f64, f64)>); 4] = [
    ("ev_car", 5, Some((20_000.0, 0.2))),
    ("ev_truck", 2, Some((60_000.0, 0.8))),
    ("ev_bus", 1, Some((90_000.0, 1.1))),
    ("passenger", 4, None),
];

pub struct SimWorld {
    pub road_network: SimRoadNetwork,

    pub stations: BTreeMap<StationId, SimChargingStation>,

    pub(crate) vehicles: HashMap<VehicleId, SimVehicle>,

    /// Live vehicles in departure order
    pub(crate) vehicle_order: Vec<VehicleId>,

    /// Trips not yet departed, ordered by departure time
    pending: Vec<(VehicleId, TripSpec)>,

    next_id: usize,

    /// Simulation time in seconds
    pub time: f64,

    pub step_secs: f64,

    pub steps: u64,

    /// Simulation ends after this many steps even with vehicles left
    step_limit: Option<u64>,

    pub arrived: u32,

    /// Optional seeded RNG for reproducible simulations
    rng: Option<StdRng>,
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl SimWorld {
    fn new_internal(rng: Option<StdRng>) -> Self {
        Self {
            road_network: SimRoadNetwork::new(),
            stations: BTreeMap::new(),
            vehicles: HashMap::new(),
            vehicle_order: Vec::new(),
            pending: Vec::new(),
            next_id: 0,
            time: 0.0,
            step_secs: DEFAULT_STEP_SECS,
            steps: 0,
            step_limit: None,
            arrived: 0,
            rng,
        }
    }

    pub fn new() -> Self {
        Self::new_internal(None)
    }

    /// Create a new SimWorld with a seeded RNG for reproducible simulations
    pub fn new_with_seed(seed: u64) -> Self {
        Self::new_internal(Some(StdRng::seed_from_u64(seed)))
    }

    pub fn with_step_secs(mut self, step_secs: f64) -> Self {
        self.step_secs = step_secs;
        self
    }

    pub fn with_step_limit(mut self, step_limit: u64) -> Self {
        self.step_limit = Some(step_limit);
        self
    }

    /// Get a random value in the given range, using seeded RNG if available
    fn random_range(&mut self, range: std::ops::Range<f64>) -> f64 {
        match &mut self.rng {
            Some(rng) => rng.random_range(range),
            None => rand::rng().random_range(range),
        }
    }

    /// Choose a random element from a slice, using seeded RNG if available
    fn choose_random<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        if slice.is_empty() {
            return None;
        }
        match &mut self.rng {
            Some(rng) => slice.choose(rng),
            None => slice.choose(&mut rand::rng()),
        }
    }

    fn next_sim_id(&mut self) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn add_junction(&mut self, position: Position) -> JunctionId {
        let id = JunctionId(self.next_sim_id());
        self.road_network.add_junction(id, position);
        id
    }

    /// Add a one-way road between two junctions
    pub fn add_road(&mut self, start: JunctionId, end: JunctionId) -> Result<EdgeId> {
        let start_pos = *self
            .road_network
            .junction_position(start)
            .context("Start junction not found")?;
        let end_pos = *self
            .road_network
            .junction_position(end)
            .context("End junction not found")?;

        let id = EdgeId(format!("E{}", self.next_sim_id()));
        let road = SimRoad::new(id.clone(), start, end, &start_pos, &end_pos);
        self.road_network.add_road(road)?;
        Ok(id)
    }

    /// Add a two-way road between junctions (creates two one-way roads)
    pub fn add_two_way_road(
        &mut self,
        start: JunctionId,
        end: JunctionId,
    ) -> Result<(EdgeId, EdgeId)> {
        let forward = self.add_road(start, end)?;
        let backward = self.add_road(end, start)?;
        Ok((forward, backward))
    }

    /// Place a charging station on the lane of `edge`
    pub fn add_charging_station(
        &mut self,
        edge: &EdgeId,
        start_pos: f64,
        end_pos: f64,
        power: f64,
    ) -> Result<StationId> {
        let road = self
            .road_network
            .get_road(edge)
            .with_context(|| format!("Road {} not found", edge))?;

        if !(0.0..=road.length).contains(&start_pos) || end_pos < start_pos || end_pos > road.length
        {
            anyhow::bail!(
                "Station range {}..{} does not fit on road {} of length {:.1}",
                start_pos,
                end_pos,
                edge,
                road.length
            );
        }

        let lane = road.lane.clone();
        let id = StationId(format!("cs_{}", self.next_sim_id()));
        let station = SimChargingStation::new(
            id.clone(),
            lane,
            edge.clone(),
            start_pos,
            end_pos,
            power,
        );
        self.stations.insert(id.clone(), station);
        Ok(id)
    }

    /// Queue a trip; it departs on the first step at or after `trip.depart`
    pub fn add_trip(&mut self, trip: TripSpec) -> Result<VehicleId> {
        for edge in [&trip.from, &trip.to] {
            self.road_network
                .get_road(edge)
                .with_context(|| format!("Trip edge {} not found", edge))?;
        }

        let id = VehicleId(format!("veh{}", self.next_sim_id()));
        let index = self
            .pending
            .partition_point(|(_, queued)| queued.depart <= trip.depart);
        self.pending.insert(index, (id.clone(), trip));
        Ok(id)
    }

    /// Queue up to `count` random trips departing within `depart_window`
    /// seconds. Draws with identical origin and destination are skipped.
    pub fn spawn_random_trips(&mut self, count: usize, depart_window: f64) -> Result<Vec<VehicleId>> {
        let edges: Vec<EdgeId> = self.road_network.roads().map(|road| road.id.clone()).collect();
        if edges.len() < 2 {
            anyhow::bail!("Need at least two roads to generate trips");
        }

        let weighted_types: Vec<usize> = FLEET_MIX
            .iter()
            .enumerate()
            .flat_map(|(index, (_, weight, _))| std::iter::repeat(index).take(*weight as usize))
            .collect();

        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            let Some(&type_index) = self.choose_random(&weighted_types) else {
                break;
            };
            let (type_id, _, battery_spec) = FLEET_MIX[type_index];

            let Some(from) = self.choose_random(&edges).cloned() else {
                break;
            };
            let Some(to) = self.choose_random(&edges).cloned() else {
                break;
            };
            if from == to {
                continue;
            }

            let depart = self.random_range(0.0..depart_window.max(f64::EPSILON));
            let speed = self.random_range(8.0..14.0);
            let battery = match battery_spec {
                Some((maximum_wh, consumption)) => {
                    let soc = self.random_range(0.25..0.9);
                    Some(Battery::new(maximum_wh * soc, maximum_wh, consumption))
                }
                None => None,
            };

            ids.push(self.add_trip(TripSpec {
                type_id: type_id.to_string(),
                from,
                to,
                depart,
                speed,
                battery,
            })?);
        }

        Ok(ids)
    }

    pub fn vehicle(&self, id: &VehicleId) -> Option<&SimVehicle> {
        self.vehicles.get(id)
    }

    pub fn live_vehicle_count(&self) -> usize {
        self.vehicle_order.len()
    }

    pub fn pending_trip_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether the step limit, if any, has been reached
    pub fn horizon_reached(&self) -> bool {
        self.step_limit.is_some_and(|limit| self.steps >= limit)
    }

    /// Insert every pending trip whose departure time has come
    fn depart_due_trips(&mut self) {
        let due = self
            .pending
            .partition_point(|(_, trip)| trip.depart <= self.time);

        let due_trips: Vec<(VehicleId, TripSpec)> = self.pending.drain(..due).collect();
        for (id, trip) in due_trips {
            if let Err(err) = self.insert_vehicle(id.clone(), trip) {
                warn!("Trip of {} discarded: {:#}", id, err);
            }
        }
    }

    fn insert_vehicle(&mut self, id: VehicleId, trip: TripSpec) -> Result<()> {
        let route = self
            .road_network
            .find_route(&trip.from, &trip.to)?
            .with_context(|| format!("No connection from {} to {}", trip.from, trip.to))?;

        let start = self
            .road_network
            .position_on_road(&trip.from, 0.0)
            .context("Departure road geometry not found")?;

        self.road_network
            .update_vehicle_road_position(&id, &trip.from, OrderedFloat(0.0), None);

        debug!("{} ({}) departs on {} for {}", id, trip.type_id, trip.from, trip.to);
        let vehicle = SimVehicle::new(id.clone(), trip.type_id, route, trip.speed, start, trip.battery);
        self.vehicles.insert(id.clone(), vehicle);
        self.vehicle_order.push(id);
        Ok(())
    }

    /// Update all vehicles and remove the ones that arrived
    fn update_vehicles(&mut self) {
        let mut departed = Vec::new();

        for id in &self.vehicle_order {
            let Some(vehicle) = self.vehicles.get_mut(id) else {
                continue;
            };

            match vehicle.update(self.step_secs, &mut self.road_network, &mut self.stations) {
                Ok(VehicleUpdateResult::Continue) => {}
                Ok(VehicleUpdateResult::Arrived) => {
                    debug!("{} arrived after {:.0} m", id, vehicle.distance_travelled);
                    self.arrived += 1;
                    departed.push(id.clone());
                }
                Err(err) => {
                    warn!("Removing {}: {:#}", id, err);
                    if let Some(edge) = vehicle.current_edge() {
                        self.road_network
                            .remove_vehicle_at(id, edge, vehicle.distance_along_road);
                    }
                    departed.push(id.clone());
                }
            }
        }

        for id in &departed {
            self.vehicles.remove(id);
        }
        self.vehicle_order.retain(|id| self.vehicles.contains_key(id));
    }

    /// Main simulation tick
    pub fn tick(&mut self) {
        self.steps += 1;
        self.time += self.step_secs;
        self.depart_due_trips();
        self.update_vehicles();
    }

    /// Create a test world: a grid of two-way roads with a charging station
    /// on every fifth road
    pub fn create_test_world_with_seed(seed: u64, grid: usize) -> Result<Self> {
        Self::build_test_world(SimWorld::new_with_seed(seed), grid)
    }

    pub fn build_test_world(mut world: SimWorld, grid: usize) -> Result<Self> {
        if grid < 2 {
            anyhow::bail!("Grid must be at least 2x2, got {}", grid);
        }

        let mut junctions = vec![vec![JunctionId(0); grid]; grid];
        for (row, junction_row) in junctions.iter_mut().enumerate() {
            for (col, junction) in junction_row.iter_mut().enumerate() {
                let position = Position::new(col as f64 * GRID_SPACING, row as f64 * GRID_SPACING);
                *junction = world.add_junction(position);
            }
        }

        let mut station_roads = Vec::new();
        for row in 0..grid {
            for col in 0..grid {
                if col + 1 < grid {
                    let (forward, _) =
                        world.add_two_way_road(junctions[row][col], junctions[row][col + 1])?;
                    station_roads.push(forward);
                }
                if row + 1 < grid {
                    world.add_two_way_road(junctions[row][col], junctions[row + 1][col])?;
                }
            }
        }

        for edge in station_roads.iter().step_by(5) {
            world.add_charging_station(
                edge,
                GRID_SPACING * 0.4,
                GRID_SPACING * 0.6,
                TEST_STATION_POWER,
            )?;
        }

        Ok(world)
    }

    /// Print a summary of the world state
    pub fn print_summary(&self) {
        println!("=== EV Charging Simulation Summary ===");
        println!("Time: {:.0}s ({} steps)", self.time, self.steps);
        println!(
            "Junctions: {}, Roads: {}",
            self.road_network.junction_count(),
            self.road_network.road_count()
        );
        println!(
            "Vehicles: {} live, {} pending, {} arrived",
            self.vehicle_order.len(),
            self.pending.len(),
            self.arrived
        );

        println!("--- Charging Stations ---");
        for station in self.stations.values() {
            println!(
                "  {} on {}: {:.0} kW, sessions={}, vehicles on lane={}",
                station.id,
                station.lane,
                station.power / 1000.0,
                station.sessions,
                self.road_network.vehicles_on_road(&station.edge)
            );
        }

        let charging: Vec<&SimVehicle> = self
            .vehicle_order
            .iter()
            .filter_map(|id| self.vehicles.get(id))
            .filter(|vehicle| vehicle.is_charging())
            .collect();
        if !charging.is_empty() {
            println!("--- Charging Now ---");
            for vehicle in charging {
                let soc = vehicle
                    .battery
                    .map(|battery| battery.actual_wh / battery.maximum_wh * 100.0)
                    .unwrap_or(0.0);
                println!("  {} ({}): {:.0}%", vehicle.id, vehicle.type_id, soc);
            }
        }
    }
}
