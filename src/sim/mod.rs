//! Simulator capability
//!
//! The managers never touch simulator globals directly. Everything they
//! can observe or command goes through the [`Simulator`] trait, which is
//! handed to the phase engine for the duration of one run.

pub mod scripted;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use scripted::{ScriptedSimulator, StatsDump};

// ============================================================================
// Milestones
// ============================================================================

/// Discrete events raised by the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneKind {
    /// A scheduled instruction-count target was reached
    MaxInsts,
    /// The workload marked the start of its region of interest
    WorkBegin,
    /// The workload marked the end of its region of interest
    WorkEnd,
    /// The guest requested a checkpoint (e.g. after OS boot)
    Checkpoint,
}

impl MilestoneKind {
    /// Returns the snake-case name used in configuration and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MaxInsts => "max_insts",
            Self::WorkBegin => "work_begin",
            Self::WorkEnd => "work_end",
            Self::Checkpoint => "checkpoint",
        }
    }
}

impl fmt::Display for MilestoneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Execution Models
// ============================================================================

/// Which CPU model is executing instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionModel {
    /// Functional, cheap per instruction
    #[default]
    Fast,
    /// Cycle-accurate
    Detailed,
}

impl ExecutionModel {
    /// Returns the other model.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Fast => Self::Detailed,
            Self::Detailed => Self::Fast,
        }
    }

    /// Returns the snake-case model name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Detailed => "detailed",
        }
    }
}

impl fmt::Display for ExecutionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cores an instruction-count target applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoreSelector {
    /// Only core 0 counts toward the target
    #[default]
    Core0Only,
    /// Every core counts toward the target
    AllCores,
}

// ============================================================================
// Simulator Trait
// ============================================================================

/// Control surface of a running simulation.
///
/// Implementations advance simulated time only inside
/// [`next_milestone`](Self::next_milestone); every other call takes effect
/// at the current tick.
pub trait Simulator {
    /// Current simulated tick. Never decreases.
    fn current_tick(&self) -> u64;

    /// Model currently executing instructions.
    fn execution_model(&self) -> ExecutionModel;

    /// Zeroes the statistics window.
    fn reset_statistics(&mut self);

    /// Emits the statistics accumulated since the last reset.
    fn dump_statistics(&mut self);

    /// Writes a checkpoint into `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O failure.
    fn create_checkpoint(&mut self, path: &Path) -> std::io::Result<()>;

    /// Swaps the fast and detailed models.
    fn switch_execution_model(&mut self);

    /// Raises `MaxInsts` once `count` more instructions have retired.
    ///
    /// A new target supersedes any outstanding one. `already_running` is
    /// `false` only while the run is being set up.
    fn schedule_instruction_count_target(
        &mut self,
        count: u64,
        cores: CoreSelector,
        already_running: bool,
    );

    /// Simulates until the next milestone and returns it, or `None` once
    /// the workload has exited.
    fn next_milestone(&mut self) -> Option<MilestoneKind>;
}

/// A control call issued to a simulator, with the tick it happened at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum SimCall {
    /// `reset_statistics`
    ResetStats {
        /// Tick of the call
        tick: u64,
    },
    /// `dump_statistics`
    DumpStats {
        /// Tick of the call
        tick: u64,
    },
    /// `create_checkpoint`
    Checkpoint {
        /// Tick of the call
        tick: u64,
        /// Checkpoint location
        path: PathBuf,
    },
    /// `switch_execution_model`
    Switch {
        /// Tick of the call
        tick: u64,
        /// Model active after the switch
        to: ExecutionModel,
    },
    /// `schedule_instruction_count_target`
    Schedule {
        /// Tick of the call
        tick: u64,
        /// Relative instruction count
        count: u64,
        /// Cores the target applies to
        cores: CoreSelector,
        /// Whether the simulation was already running
        already_running: bool,
    },
}
