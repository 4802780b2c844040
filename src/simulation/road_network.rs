//! Road network graph for routing and vehicle placement

use anyhow::{Context, Result};
use ordered_float::OrderedFloat;
use petgraph::algo::astar;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;

use super::types::{JunctionId, SimRoad};
use crate::controller::{EdgeId, Position, VehicleId};

/// Edge data for the road network graph
#[derive(Debug, Clone)]
pub struct RoadEdge {
    pub edge_id: EdgeId,
    pub weight: u32, // Road length in centimeters
}

impl RoadEdge {
    pub fn from_road(road: &SimRoad) -> Self {
        let weight = (road.length * 100.0) as u32;
        Self {
            edge_id: road.id.clone(),
            weight: weight.max(1),
        }
    }
}

type OccupancyKey = (OrderedFloat<f64>, VehicleId);

#[derive(Default)]
pub struct SimRoadNetwork {
    /// Directed graph of junctions; every graph edge is one road
    graph: DiGraph<JunctionId, RoadEdge>,

    junction_to_node: HashMap<JunctionId, NodeIndex>,

    junction_positions: HashMap<JunctionId, Position>,

    /// Roads keyed by id, ordered so enumeration is stable
    roads: BTreeMap<EdgeId, SimRoad>,

    /// Vehicles on each road ordered by distance along it
    vehicles_on_roads: HashMap<EdgeId, BTreeSet<OccupancyKey>>,
}

impl SimRoadNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_junction(&mut self, junction_id: JunctionId, position: Position) {
        if self.junction_to_node.contains_key(&junction_id) {
            return;
        }

        let node_index = self.graph.add_node(junction_id);
        self.junction_to_node.insert(junction_id, node_index);
        self.junction_positions.insert(junction_id, position);
    }

    pub fn junction_position(&self, junction_id: JunctionId) -> Option<&Position> {
        self.junction_positions.get(&junction_id)
    }

    pub fn add_road(&mut self, road: SimRoad) -> Result<()> {
        let start_node = *self
            .junction_to_node
            .get(&road.from)
            .with_context(|| format!("Junction {:?} not found", road.from))?;
        let end_node = *self
            .junction_to_node
            .get(&road.to)
            .with_context(|| format!("Junction {:?} not found", road.to))?;

        if self.roads.contains_key(&road.id) {
            anyhow::bail!("Road {} already exists", road.id);
        }

        self.graph
            .add_edge(start_node, end_node, RoadEdge::from_road(&road));
        self.roads.insert(road.id.clone(), road);
        Ok(())
    }

    pub fn get_road(&self, edge: &EdgeId) -> Option<&SimRoad> {
        self.roads.get(edge)
    }

    pub fn roads(&self) -> impl Iterator<Item = &SimRoad> {
        self.roads.values()
    }

    pub fn road_count(&self) -> usize {
        self.roads.len()
    }

    pub fn junction_count(&self) -> usize {
        self.junction_to_node.len()
    }

    /// Whether a vehicle leaving `from` can continue directly onto `to`
    pub fn connects(&self, from: &EdgeId, to: &EdgeId) -> bool {
        match (self.roads.get(from), self.roads.get(to)) {
            (Some(from), Some(to)) => from.to == to.from,
            _ => false,
        }
    }

    /// Point `offset` meters along `edge`
    pub fn position_on_road(&self, edge: &EdgeId, offset: f64) -> Option<Position> {
        let road = self.roads.get(edge)?;
        let start = self.junction_positions.get(&road.from)?;
        let end = self.junction_positions.get(&road.to)?;
        if road.length <= 0.0 {
            return Some(*start);
        }
        let t = (offset / road.length).clamp(0.0, 1.0);
        Some(start.lerp(end, t))
    }

    /// Shortest road sequence from `from` to `to`, both included.
    ///
    /// Returns `Ok(None)` when `to` cannot be reached.
    pub fn find_route(&self, from: &EdgeId, to: &EdgeId) -> Result<Option<Vec<EdgeId>>> {
        let from_road = self
            .roads
            .get(from)
            .with_context(|| format!("Road {} not found", from))?;
        let to_road = self
            .roads
            .get(to)
            .with_context(|| format!("Road {} not found", to))?;

        if from == to {
            return Ok(Some(vec![from.clone()]));
        }

        let start_node = *self
            .junction_to_node
            .get(&from_road.to)
            .context("Route start junction not found")?;
        let end_node = *self
            .junction_to_node
            .get(&to_road.from)
            .context("Route end junction not found")?;

        let Some((_, node_path)) = astar(
            &self.graph,
            start_node,
            |node| node == end_node,
            |edge| edge.weight().weight,
            |_| 0, // Null heuristic = Dijkstra
        ) else {
            return Ok(None);
        };

        let mut route = Vec::with_capacity(node_path.len() + 1);
        route.push(from.clone());
        for pair in node_path.windows(2) {
            let edge = self
                .graph
                .edges(pair[0])
                .filter(|edge| edge.target() == pair[1])
                .min_by_key(|edge| edge.weight().weight)
                .context("Path step has no connecting road")?;
            route.push(edge.weight().edge_id.clone());
        }
        route.push(to.clone());

        Ok(Some(route))
    }

    /// Move a vehicle's occupancy entry, optionally removing it from its
    /// previous road position
    pub fn update_vehicle_road_position(
        &mut self,
        vehicle: &VehicleId,
        edge: &EdgeId,
        distance: OrderedFloat<f64>,
        previous: Option<(&EdgeId, OrderedFloat<f64>)>,
    ) {
        if let Some((prev_edge, prev_distance)) = previous {
            self.remove_vehicle_at(vehicle, prev_edge, prev_distance);
        }

        self.vehicles_on_roads
            .entry(edge.clone())
            .or_default()
            .insert((distance, vehicle.clone()));
    }

    pub fn remove_vehicle_at(
        &mut self,
        vehicle: &VehicleId,
        edge: &EdgeId,
        distance: OrderedFloat<f64>,
    ) {
        if let Some(occupants) = self.vehicles_on_roads.get_mut(edge) {
            occupants.remove(&(distance, vehicle.clone()));
        }
    }

    /// Distance from `distance` to the next vehicle ahead on `edge`
    pub fn gap_ahead(
        &self,
        vehicle: &VehicleId,
        edge: &EdgeId,
        distance: OrderedFloat<f64>,
    ) -> Option<f64> {
        let occupants = self.vehicles_on_roads.get(edge)?;
        occupants
            .range((Bound::Excluded((distance, vehicle.clone())), Bound::Unbounded))
            .next()
            .map(|(ahead, _)| ahead.0 - distance.0)
    }

    pub fn vehicles_on_road(&self, edge: &EdgeId) -> usize {
        self.vehicles_on_roads.get(edge).map_or(0, BTreeSet::len)
    }
}
