//! Nearest reachable charging station lookup

use log::debug;

use super::simulator::{EdgeId, Position, SimResult, Simulator, StationId, VehicleId};

/// A charging station chosen for a vehicle, with the edge it sits on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationAssignment {
    pub station: StationId,
    pub edge: EdgeId,
}

struct Candidate {
    assignment: StationAssignment,
    distance: f64,
}

/// Finds the station closest (straight-line) to `vehicle` among those the
/// route finder can reach from the vehicle's current edge.
///
/// Ties keep the station enumerated first. Stations whose lookups fail are
/// skipped unless the failure is fatal.
pub fn find_nearest_reachable<S: Simulator + ?Sized>(
    sim: &S,
    vehicle: &VehicleId,
) -> SimResult<Option<StationAssignment>> {
    let position = sim.vehicle_position(vehicle)?;
    let current_edge = sim.vehicle_current_segment(vehicle)?;

    let mut best: Option<Candidate> = None;

    for station in sim.list_stations()? {
        let candidate = match evaluate_station(sim, &station, &position, &current_edge) {
            Ok(Some(candidate)) => candidate,
            Ok(None) => continue,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                debug!("Skipping station {} for {}: {}", station, vehicle, err);
                continue;
            }
        };

        let closer = best
            .as_ref()
            .map_or(true, |current| candidate.distance < current.distance);
        if closer {
            best = Some(candidate);
        }
    }

    Ok(best.map(|candidate| candidate.assignment))
}

fn evaluate_station<S: Simulator + ?Sized>(
    sim: &S,
    station: &StationId,
    vehicle_position: &Position,
    current_edge: &EdgeId,
) -> SimResult<Option<Candidate>> {
    let edge = sim.station_segment(station)?;
    let distance = vehicle_position.distance(&sim.station_position(station)?);
    if !distance.is_finite() {
        return Ok(None);
    }

    if sim.find_route(current_edge, &edge)?.is_empty() {
        return Ok(None);
    }

    Ok(Some(Candidate {
        assignment: StationAssignment {
            station: station.clone(),
            edge,
        },
        distance,
    }))
}
