//! Per-vehicle charging state machine
//!
//! Each tracked EV moves through
//!
//! ```text
//! Idle -> DetourPlanned -> ArrivedCharging -> Done
//!   \            \
//!    `-> DetourFailed <-'
//! ```
//!
//! once per simulation step. `Done` and `DetourFailed` are terminal: a vehicle
//! in either state causes no further simulator calls.

use std::collections::{HashMap, HashSet};
use std::fmt;

use log::{debug, info, warn};

use super::charge_duration::{duration_seconds, DurationError};
use super::config::ControllerConfig;
use super::route_composer::{compose_detour, ComposeError};
use super::simulator::{EdgeId, SimResult, Simulator, VehicleId};
use super::station_locator::{find_nearest_reachable, StationAssignment};
use super::stats::RunStats;
use super::telemetry::BatterySnapshot;

/// Why a vehicle gave up on charging
#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    /// No charging station can be reached from the vehicle's edge
    NoReachableStation,
    /// A leg of the detour has no route, or the simulator refused it
    RouteUnavailable(String),
    /// The stop length could not be computed at the station the vehicle
    /// reached
    UnschedulableStop(StationAssignment, String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::NoReachableStation => f.write_str("no reachable charging station"),
            FailureReason::RouteUnavailable(reason) => write!(f, "route unavailable: {}", reason),
            FailureReason::UnschedulableStop(assignment, reason) => {
                write!(
                    f,
                    "charging stop at {} unschedulable: {}",
                    assignment.station, reason
                )
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum VehicleState {
    Idle,
    DetourPlanned(StationAssignment),
    DetourFailed(FailureReason),
    ArrivedCharging(StationAssignment),
    Done(StationAssignment),
}

impl VehicleState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, VehicleState::DetourFailed(_) | VehicleState::Done(_))
    }

    /// The station this vehicle was sent to, if a detour was committed.
    /// Kept once set, even when the stop later fails.
    pub fn assigned_station(&self) -> Option<&StationAssignment> {
        match self {
            VehicleState::DetourPlanned(assignment)
            | VehicleState::ArrivedCharging(assignment)
            | VehicleState::Done(assignment)
            | VehicleState::DetourFailed(FailureReason::UnschedulableStop(assignment, _)) => {
                Some(assignment)
            }
            VehicleState::Idle | VehicleState::DetourFailed(_) => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            VehicleState::Idle => "IDLE",
            VehicleState::DetourPlanned(_) => "DETOUR_PLANNED",
            VehicleState::DetourFailed(_) => "DETOUR_FAILED",
            VehicleState::ArrivedCharging(_) => "ARRIVED_CHARGING",
            VehicleState::Done(_) => "DONE",
        }
    }
}

impl fmt::Display for VehicleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Controller-side record of one tracked EV
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleRecord {
    pub vehicle_id: VehicleId,
    pub state: VehicleState,
    /// Last edge of the route the vehicle had when first seen
    pub original_destination: EdgeId,
}

impl VehicleRecord {
    pub fn new(vehicle_id: VehicleId, original_destination: EdgeId) -> Self {
        Self {
            vehicle_id,
            state: VehicleState::Idle,
            original_destination,
        }
    }

    fn transition(&mut self, next: VehicleState) {
        debug!("{}: {} -> {}", self.vehicle_id, self.state, next);
        self.state = next;
    }

    fn fail(&mut self, reason: FailureReason, stats: &mut RunStats) {
        stats.detours_failed += 1;
        self.transition(VehicleState::DetourFailed(reason));
    }

    /// Sends the vehicle to the nearest reachable station once its state of
    /// charge drops below the threshold.
    fn plan_detour<S: Simulator + ?Sized>(
        &mut self,
        sim: &mut S,
        config: &ControllerConfig,
        stats: &mut RunStats,
    ) -> SimResult<()> {
        let Some(battery) = BatterySnapshot::read(&*sim, &self.vehicle_id, config)? else {
            return Ok(());
        };
        let soc = battery.state_of_charge();
        if soc >= config.soc_threshold {
            return Ok(());
        }

        let Some(assignment) = find_nearest_reachable(&*sim, &self.vehicle_id)? else {
            warn!("No reachable charging station for {}", self.vehicle_id);
            self.fail(FailureReason::NoReachableStation, stats);
            return Ok(());
        };

        let current = sim.vehicle_current_segment(&self.vehicle_id)?;
        let route = match compose_detour(
            &*sim,
            &current,
            &assignment.edge,
            &self.original_destination,
        ) {
            Ok(route) => route,
            Err(ComposeError::Simulator(err)) if err.is_fatal() => return Err(err),
            Err(err) => {
                warn!(
                    "Detour of {} via {} failed: {}",
                    self.vehicle_id, assignment.station, err
                );
                self.fail(FailureReason::RouteUnavailable(err.to_string()), stats);
                return Ok(());
            }
        };

        if let Err(err) = sim.set_route(&self.vehicle_id, &route) {
            if err.is_fatal() {
                return Err(err);
            }
            warn!(
                "Detour of {} via {} failed: {}",
                self.vehicle_id, assignment.station, err
            );
            self.fail(FailureReason::RouteUnavailable(err.to_string()), stats);
            return Ok(());
        }

        info!(
            "{} detouring via charging station {} | SoC: {:.2}",
            self.vehicle_id, assignment.station, soc
        );
        stats.detours_planned += 1;
        self.transition(VehicleState::DetourPlanned(assignment));
        Ok(())
    }

    /// Schedules the charging stop once the vehicle is on the station's lane
    fn check_arrival<S: Simulator + ?Sized>(
        &mut self,
        sim: &mut S,
        assignment: StationAssignment,
        config: &ControllerConfig,
        stats: &mut RunStats,
    ) -> SimResult<()> {
        let station_lane = sim.station_lane(&assignment.station)?;
        if sim.vehicle_lane(&self.vehicle_id)? != station_lane {
            return Ok(());
        }

        match BatterySnapshot::read(&*sim, &self.vehicle_id, config)? {
            Some(battery) => info!(
                "{} reached charging lane {} | SoC: {:.2}",
                self.vehicle_id,
                station_lane,
                battery.state_of_charge()
            ),
            None => info!("{} reached charging lane {}", self.vehicle_id, station_lane),
        }
        self.transition(VehicleState::ArrivedCharging(assignment.clone()));

        let duration = match duration_seconds(&*sim, &self.vehicle_id, &assignment.station, config)
        {
            Ok(duration) => duration,
            Err(DurationError::Simulator(err)) if err.is_fatal() => return Err(err),
            Err(err) => {
                warn!("Cannot schedule charging for {}: {}", self.vehicle_id, err);
                stats.stops_unschedulable += 1;
                self.transition(VehicleState::DetourFailed(FailureReason::UnschedulableStop(
                    assignment,
                    err.to_string(),
                )));
                return Ok(());
            }
        };

        match sim.schedule_stop(&self.vehicle_id, &assignment.station, duration) {
            Ok(()) => {
                info!(
                    "{} charging at {} for {} sec",
                    self.vehicle_id, assignment.station, duration
                );
                stats.stops_scheduled += 1;
            }
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                warn!(
                    "Failed to set charging stop for {} | Reason: {}",
                    self.vehicle_id, err
                );
                stats.stops_rejected += 1;
            }
        }

        self.transition(VehicleState::Done(assignment));
        Ok(())
    }
}

/// Keyed store of vehicle records, advanced once per vehicle per step
#[derive(Debug)]
pub struct VehicleTracker {
    config: ControllerConfig,
    records: HashMap<VehicleId, VehicleRecord>,
    /// Vehicles seen whose type is not managed
    untracked: HashSet<VehicleId>,
    stats: RunStats,
}

impl VehicleTracker {
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            config,
            records: HashMap::new(),
            untracked: HashSet::new(),
            stats: RunStats::default(),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn record(&self, vehicle: &VehicleId) -> Option<&VehicleRecord> {
        self.records.get(vehicle)
    }

    pub fn records(&self) -> impl Iterator<Item = &VehicleRecord> {
        self.records.values()
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut RunStats {
        &mut self.stats
    }

    /// Runs one step of the state machine for `vehicle`.
    ///
    /// Per-vehicle simulator errors are logged and leave the vehicle where it
    /// was; only fatal errors are returned.
    pub fn evaluate<S: Simulator + ?Sized>(
        &mut self,
        sim: &mut S,
        vehicle: &VehicleId,
    ) -> SimResult<()> {
        match self.step(sim, vehicle) {
            Err(err) if !err.is_fatal() => {
                warn!("Skipping {} this step: {}", vehicle, err);
                Ok(())
            }
            result => result,
        }
    }

    /// Drops records of vehicles that have left the simulation
    pub fn retain_live(&mut self, live: &[VehicleId]) {
        let live: HashSet<&VehicleId> = live.iter().collect();
        self.records.retain(|id, _| live.contains(id));
        self.untracked.retain(|id| live.contains(id));
    }

    fn step<S: Simulator + ?Sized>(&mut self, sim: &mut S, vehicle: &VehicleId) -> SimResult<()> {
        if self.untracked.contains(vehicle) {
            return Ok(());
        }
        if !self.records.contains_key(vehicle) && !self.register(&*sim, vehicle)? {
            return Ok(());
        }

        let Some(record) = self.records.get_mut(vehicle) else {
            return Ok(());
        };

        if record.state == VehicleState::Idle {
            record.plan_detour(sim, &self.config, &mut self.stats)?;
        }

        // A detour planned while already on the station lane is charged in
        // the same step.
        if let VehicleState::DetourPlanned(assignment) = &record.state {
            let assignment = assignment.clone();
            record.check_arrival(sim, assignment, &self.config, &mut self.stats)?;
        }

        Ok(())
    }

    /// Creates a record on first sight of a managed EV. Returns whether the
    /// vehicle is tracked.
    fn register<S: Simulator + ?Sized>(&mut self, sim: &S, vehicle: &VehicleId) -> SimResult<bool> {
        let type_id = sim.vehicle_type(vehicle)?;
        if !self.config.is_tracked_type(&type_id) {
            self.untracked.insert(vehicle.clone());
            return Ok(false);
        }

        let Some(destination) = sim.vehicle_route(vehicle)?.last().cloned() else {
            warn!("{} has an empty route, not tracking it yet", vehicle);
            return Ok(false);
        };

        debug!("Tracking {} ({}) bound for {}", vehicle, type_id, destination);
        self.records
            .insert(vehicle.clone(), VehicleRecord::new(vehicle.clone(), destination));
        self.stats.vehicles_tracked += 1;
        Ok(true)
    }
}
