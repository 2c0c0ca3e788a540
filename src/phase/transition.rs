//! Transition descriptors
//!
//! Policies never call the simulator. They return a [`Transition`] that
//! lists which effects to apply; the engine applies them in a fixed order.

use std::path::PathBuf;

use super::state::Phase;

/// What the run does after a handler returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Continuation {
    /// Keep simulating
    #[default]
    Continue,
    /// End the run
    Terminate,
}

/// How the current region of interest is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionExit {
    /// Accumulate ticks and count the region as completed
    Counted,
    /// Accumulate ticks without counting the region
    Uncounted,
    /// Drop the region without accumulating
    Discarded,
}

/// Where a checkpoint is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckpointTarget {
    /// `<dir>/chkpt.<tick>`
    TickStamped(PathBuf),
    /// Exactly this directory
    Exact(PathBuf),
}

impl CheckpointTarget {
    /// Resolves the checkpoint path for the given tick.
    #[must_use]
    pub fn resolve(&self, tick: u64) -> PathBuf {
        match self {
            Self::TickStamped(dir) => dir.join(format!("chkpt.{tick}")),
            Self::Exact(path) => path.clone(),
        }
    }
}

/// Effects of one milestone, applied by the engine in field order.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct Transition {
    /// Phase committed after the effects
    pub next_phase: Phase,
    /// Dump statistics
    pub dump_stats: bool,
    /// Close the current region
    pub exit_region: Option<RegionExit>,
    /// Zero the completed-region count
    pub reset_region_count: bool,
    /// Reset statistics before any model switch
    pub reset_stats: bool,
    /// Open a region at the current tick
    pub enter_region: bool,
    /// Swap execution models
    pub switch_model: bool,
    /// Reset statistics after the switch
    pub reset_after_switch: bool,
    /// Checkpoint to create
    pub checkpoint: Option<CheckpointTarget>,
    /// Relative instruction-count target to schedule
    pub schedule: Option<u64>,
    /// Continue or end the run
    pub continuation: Continuation,
    /// The handler for this milestone kind has nothing left to do
    pub exhausted: bool,
}

impl Transition {
    /// A transition that stays in `phase` with no effects.
    #[must_use]
    pub const fn stay(phase: Phase) -> Self {
        Self {
            next_phase: phase,
            dump_stats: false,
            exit_region: None,
            reset_region_count: false,
            reset_stats: false,
            enter_region: false,
            switch_model: false,
            reset_after_switch: false,
            checkpoint: None,
            schedule: None,
            continuation: Continuation::Continue,
            exhausted: false,
        }
    }

    /// Sets the phase to commit.
    #[must_use]
    pub const fn to_phase(mut self, phase: Phase) -> Self {
        self.next_phase = phase;
        self
    }

    #[must_use]
    pub const fn dump(mut self) -> Self {
        self.dump_stats = true;
        self
    }

    #[must_use]
    pub const fn exit_region(mut self, exit: RegionExit) -> Self {
        self.exit_region = Some(exit);
        self
    }

    #[must_use]
    pub const fn reset_region_count(mut self) -> Self {
        self.reset_region_count = true;
        self
    }

    #[must_use]
    pub const fn reset(mut self) -> Self {
        self.reset_stats = true;
        self
    }

    #[must_use]
    pub const fn enter_region(mut self) -> Self {
        self.enter_region = true;
        self
    }

    #[must_use]
    pub const fn switch_model(mut self) -> Self {
        self.switch_model = true;
        self
    }

    #[must_use]
    pub const fn reset_after_switch(mut self) -> Self {
        self.reset_after_switch = true;
        self
    }

    #[must_use]
    pub fn checkpoint(mut self, target: CheckpointTarget) -> Self {
        self.checkpoint = Some(target);
        self
    }

    /// Schedules a target `count` instructions ahead.
    #[must_use]
    pub const fn schedule(mut self, count: u64) -> Self {
        self.schedule = Some(count);
        self
    }

    #[must_use]
    pub const fn terminate(mut self) -> Self {
        self.continuation = Continuation::Terminate;
        self
    }

    /// Marks the handler for this milestone kind as finished.
    #[must_use]
    pub const fn exhaust(mut self) -> Self {
        self.exhausted = true;
        self
    }

    /// Whether applying this transition from `current` changes nothing.
    #[must_use]
    pub fn is_noop(&self, current: Phase) -> bool {
        *self == Self::stay(current)
    }
}
