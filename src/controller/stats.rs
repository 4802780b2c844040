use log::info;

/// Counters collected over one controller run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub steps: u64,
    pub vehicles_tracked: u32,
    pub detours_planned: u32,
    pub detours_failed: u32,
    pub stops_scheduled: u32,
    pub stops_rejected: u32,
    /// Vehicles that reached their station but got no stop duration
    pub stops_unschedulable: u32,
}

impl RunStats {
    /// Share of planned detours that ended in a scheduled charging stop
    pub fn charge_rate(&self) -> f32 {
        if self.detours_planned > 0 {
            (self.stops_scheduled as f32 / self.detours_planned as f32) * 100.0
        } else {
            0.0
        }
    }

    pub fn log_summary(&self) {
        info!("Steps: {}", self.steps);
        info!("Vehicles tracked: {}", self.vehicles_tracked);
        info!("Detours planned: {}", self.detours_planned);
        info!("Detours failed: {}", self.detours_failed);
        info!("Charging stops scheduled: {}", self.stops_scheduled);
        info!("Charging stops rejected: {}", self.stops_rejected);
        info!("Charging stops unschedulable: {}", self.stops_unschedulable);
        info!("Charge rate: {:.1}%", self.charge_rate());
    }
}
