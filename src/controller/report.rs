//! End-of-run report

use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::config::schema::ManagerKind;

/// Why the run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitCause {
    /// A handler returned `Terminate`
    Terminated,
    /// The simulated workload ran to completion
    WorkloadExited,
}

impl ExitCause {
    /// Returns the snake-case cause name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Terminated => "terminated",
            Self::WorkloadExited => "workload_exited",
        }
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Manager that drove the run
    pub manager: ManagerKind,
    /// Why the run ended
    pub exit_cause: ExitCause,
    /// Simulated tick at the end
    pub final_tick: u64,
    /// Regions counted as completed
    pub completed_regions: u32,
    /// Total ticks inside regions of interest
    pub cumulative_region_ticks: u64,
    /// Tick delta of every region, in order
    pub region_ticks: Vec<u64>,
    /// Indices into `region_ticks` of regions cut short by a workload end
    pub uncounted_regions: Vec<usize>,
    /// Statistics dumps performed
    pub stats_dumps: u32,
    /// Checkpoints written
    pub checkpoints: Vec<PathBuf>,
    /// Host wall-clock time of the run, in milliseconds
    pub wall_clock_ms: u64,
}

impl RunReport {
    /// Host wall-clock duration.
    #[must_use]
    pub const fn wall_clock(&self) -> Duration {
        Duration::from_millis(self.wall_clock_ms)
    }

    /// Renders the report for a terminal.
    #[must_use]
    pub fn render_human(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "manager:          {}", self.manager);
        let _ = writeln!(out, "exit cause:       {}", self.exit_cause.as_str());
        let _ = writeln!(out, "final tick:       {}", self.final_tick);
        if self.uncounted_regions.is_empty() {
            let _ = writeln!(out, "regions:          {}", self.completed_regions);
        } else {
            let _ = writeln!(
                out,
                "regions:          {} (+{} uncounted)",
                self.completed_regions,
                self.uncounted_regions.len()
            );
        }
        let _ = writeln!(out, "region ticks:     {}", self.cumulative_region_ticks);
        let _ = writeln!(out, "stats dumps:      {}", self.stats_dumps);
        let _ = writeln!(
            out,
            "wall clock:       {}",
            humantime::format_duration(self.wall_clock())
        );
        for (i, ticks) in self.region_ticks.iter().enumerate() {
            let mark = if self.uncounted_regions.contains(&i) {
                " (uncounted)"
            } else {
                ""
            };
            let _ = writeln!(out, "  region {:>3}:     {ticks}{mark}", i + 1);
        }
        for path in &self.checkpoints {
            let _ = writeln!(out, "  checkpoint:     {}", path.display());
        }
        out
    }
}
