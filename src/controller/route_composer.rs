//! Round-trip detour composition
//!
//! A detour is three legs: current edge to the station, station back to the
//! current edge, and current edge on to the original destination. Each leg
//! starts with the edge the previous one ended on, so that junction edge is
//! dropped from the earlier leg when the legs are joined.

use thiserror::Error;

use super::simulator::{EdgeId, Simulator, SimulatorError};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ComposeError {
    #[error("no route from {from} to {to}")]
    EmptyLeg { from: EdgeId, to: EdgeId },

    #[error(transparent)]
    Simulator(#[from] SimulatorError),
}

/// Joins route legs in order, dropping the last edge of every leg but the
/// final one.
pub fn splice_legs(legs: &[Vec<EdgeId>]) -> Vec<EdgeId> {
    let mut route = Vec::with_capacity(legs.iter().map(Vec::len).sum());
    if let Some((last, leading)) = legs.split_last() {
        for leg in leading {
            route.extend_from_slice(&leg[..leg.len().saturating_sub(1)]);
        }
        route.extend_from_slice(last);
    }
    route
}

/// Builds the full detour route through `station_edge` and on to
/// `destination`. Fails if any leg has no route.
pub fn compose_detour<S: Simulator + ?Sized>(
    sim: &S,
    current: &EdgeId,
    station_edge: &EdgeId,
    destination: &EdgeId,
) -> Result<Vec<EdgeId>, ComposeError> {
    let legs = [
        (current, station_edge),
        (station_edge, current),
        (current, destination),
    ];

    let routes = legs
        .iter()
        .map(|(from, to)| find_leg(sim, from, to))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(splice_legs(&routes))
}

fn find_leg<S: Simulator + ?Sized>(
    sim: &S,
    from: &EdgeId,
    to: &EdgeId,
) -> Result<Vec<EdgeId>, ComposeError> {
    let leg = sim.find_route(from, to)?;
    if leg.is_empty() {
        return Err(ComposeError::EmptyLeg {
            from: from.clone(),
            to: to.clone(),
        });
    }
    Ok(leg)
}
