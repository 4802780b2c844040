//! Lock-step driver that runs the tracker against a live simulation

use anyhow::{Context, Result};
use log::{debug, info};

use super::config::{ConfigError, ControllerConfig};
use super::simulator::{SimResult, Simulator};
use super::stats::RunStats;
use super::tracker::VehicleTracker;

pub struct Orchestrator {
    tracker: VehicleTracker,
}

impl Orchestrator {
    pub fn new(config: ControllerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            tracker: VehicleTracker::new(config),
        })
    }

    pub fn tracker(&self) -> &VehicleTracker {
        &self.tracker
    }

    /// Advances the simulation one step, then evaluates every live vehicle
    /// in the simulation's enumeration order.
    pub fn step<S: Simulator + ?Sized>(&mut self, sim: &mut S) -> SimResult<()> {
        sim.advance_time()?;
        self.tracker.stats_mut().steps += 1;

        let live = sim.list_live_vehicles()?;
        self.tracker.retain_live(&live);

        for vehicle in &live {
            self.tracker.evaluate(sim, vehicle)?;
        }

        debug!(
            "Step {} processed {} live vehicles",
            self.tracker.stats().steps,
            live.len()
        );
        Ok(())
    }

    /// Steps until the simulation reports no further activity. Only a lost
    /// simulator connection ends the run early.
    pub fn run<S: Simulator + ?Sized>(&mut self, sim: &mut S) -> Result<RunStats> {
        while sim
            .pending_activity()
            .context("Failed to query pending simulation activity")?
        {
            self.step(sim).with_context(|| {
                format!("Simulation step {} failed", self.tracker.stats().steps + 1)
            })?;
        }

        let stats = self.tracker.stats().clone();
        info!("=== SIMULATION COMPLETE ===");
        stats.log_summary();
        Ok(stats)
    }
}
