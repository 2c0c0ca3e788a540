//! Phase and run counter state
//!
//! `RunCounters` is created with the engine and only the engine mutates
//! it, through the region bookkeeping methods below. Everything else reads
//! it after the fact.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Execution phase of a managed run. Exactly one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Outside the workload's region of interest
    #[default]
    NoWork,
    /// One-off fast-forward right after workload begin
    InitialFastForward,
    /// Fast-forwarding between regions
    FastForward,
    /// Detailed warmup before a region
    Warmup,
    /// Measured region of interest
    RegionOfInterest,
}

impl Phase {
    /// Returns the snake-case phase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoWork => "no_work",
            Self::InitialFastForward => "initial_fast_forward",
            Self::FastForward => "fast_forward",
            Self::Warmup => "warmup",
            Self::RegionOfInterest => "region_of_interest",
        }
    }

    /// Whether sampling managers run this phase on the detailed model.
    #[must_use]
    pub const fn is_detailed(self) -> bool {
        matches!(self, Self::Warmup | Self::RegionOfInterest)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters accumulated over one run.
#[derive(Debug, Clone)]
pub struct RunCounters {
    completed_regions: u32,
    cumulative_region_ticks: u64,
    region_start_tick: Option<u64>,
    phase_started_at: Instant,
    region_ticks: Vec<u64>,
    uncounted_regions: Vec<usize>,
    checkpoints: Vec<PathBuf>,
    stats_dumps: u32,
}

impl Default for RunCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl RunCounters {
    /// Creates zeroed counters with the phase clock started now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            completed_regions: 0,
            cumulative_region_ticks: 0,
            region_start_tick: None,
            phase_started_at: Instant::now(),
            region_ticks: Vec::new(),
            uncounted_regions: Vec::new(),
            checkpoints: Vec::new(),
            stats_dumps: 0,
        }
    }

    /// Regions counted as completed since the last workload begin.
    #[must_use]
    pub const fn completed_regions(&self) -> u32 {
        self.completed_regions
    }

    /// Total ticks spent inside regions of interest.
    #[must_use]
    pub const fn cumulative_region_ticks(&self) -> u64 {
        self.cumulative_region_ticks
    }

    /// Tick the current region started at. `Some` only inside a region.
    #[must_use]
    pub const fn region_start_tick(&self) -> Option<u64> {
        self.region_start_tick
    }

    /// Wall-clock instant the current phase was entered.
    #[must_use]
    pub const fn phase_started_at(&self) -> Instant {
        self.phase_started_at
    }

    /// Tick delta of every exited region, in order.
    #[must_use]
    pub fn region_ticks(&self) -> &[u64] {
        &self.region_ticks
    }

    /// Indices into [`region_ticks`](Self::region_ticks) of regions that
    /// closed without counting toward the completed total.
    #[must_use]
    pub fn uncounted_regions(&self) -> &[usize] {
        &self.uncounted_regions
    }

    /// Checkpoints created, in order.
    #[must_use]
    pub fn checkpoints(&self) -> &[PathBuf] {
        &self.checkpoints
    }

    /// Statistics dumps performed.
    #[must_use]
    pub const fn stats_dumps(&self) -> u32 {
        self.stats_dumps
    }

    pub(crate) const fn enter_region(&mut self, tick: u64) {
        self.region_start_tick = Some(tick);
    }

    /// Closes the current region and returns its tick delta.
    pub(crate) fn exit_region(&mut self, tick: u64) -> Option<u64> {
        let start = self.region_start_tick.take()?;
        let delta = tick.saturating_sub(start);
        self.cumulative_region_ticks = self.cumulative_region_ticks.saturating_add(delta);
        self.region_ticks.push(delta);
        Some(delta)
    }

    /// Drops the current region without accumulating it.
    pub(crate) const fn discard_region(&mut self) -> Option<u64> {
        self.region_start_tick.take()
    }

    pub(crate) const fn complete_region(&mut self) {
        self.completed_regions = self.completed_regions.saturating_add(1);
    }

    /// Flags the most recently exited region as uncounted.
    pub(crate) fn mark_last_uncounted(&mut self) {
        if let Some(last) = self.region_ticks.len().checked_sub(1) {
            self.uncounted_regions.push(last);
        }
    }

    pub(crate) const fn reset_region_count(&mut self) {
        self.completed_regions = 0;
    }

    pub(crate) const fn record_dump(&mut self) {
        self.stats_dumps = self.stats_dumps.saturating_add(1);
    }

    pub(crate) fn record_checkpoint(&mut self, path: &Path) {
        self.checkpoints.push(path.to_path_buf());
    }

    /// Restarts the phase clock and returns how long the previous phase ran.
    pub(crate) fn restart_phase_clock(&mut self) -> Duration {
        let elapsed = self.phase_started_at.elapsed();
        self.phase_started_at = Instant::now();
        elapsed
    }
}
