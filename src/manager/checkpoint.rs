//! Checkpoint-creating policies
//!
//! `TakeCheckpointsPolicy` writes tick-named checkpoints at a fixed
//! instruction interval inside the workload's region of interest.
//! `PostBootCheckpointPolicy` writes a single checkpoint when the guest
//! asks for one after booting, then ends the run.

use std::path::{Path, PathBuf};

use crate::config::schema::{ManagerConfig, PostBootCheckpointConfig, TakeCheckpointsConfig};
use crate::error::ConfigError;
use crate::phase::{CheckpointTarget, Phase, RegionExit, Transition};
use crate::sim::MilestoneKind;

use super::{instructions, validate_section};

// ============================================================================
// Periodic Checkpoints
// ============================================================================

/// Progress of a periodic checkpoint run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TakeStep {
    /// Waiting for the workload to begin
    AwaitWorkBegin,
    /// Checkpointing every interval
    Checkpointing,
    /// Run ended
    Done,
}

/// Periodic checkpoint creation.
///
/// Checkpoint #1 is written at workload begin; every later checkpoint
/// increments the count before it is written. The run ends as soon as the
/// count reaches the maximum.
#[derive(Debug, Clone)]
pub struct TakeCheckpointsPolicy {
    interval: u64,
    checkpoints_dir: PathBuf,
    max_checkpoints: Option<u32>,
    taken: u32,
    step: TakeStep,
}

impl TakeCheckpointsPolicy {
    /// Builds the policy.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] for a non-positive interval,
    /// an empty directory, or a maximum below 1.
    pub fn new(config: &TakeCheckpointsConfig) -> Result<Self, ConfigError> {
        validate_section(&ManagerConfig::TakeCheckpoints(config.clone()))?;
        Ok(Self {
            interval: instructions(config.interval),
            checkpoints_dir: config.checkpoints_dir.clone(),
            max_checkpoints: config
                .max_checkpoints
                .and_then(|m| u32::try_from(m).ok()),
            taken: 0,
            step: TakeStep::AwaitWorkBegin,
        })
    }

    /// Directory the `chkpt.<tick>` directories go under.
    #[must_use]
    pub fn checkpoints_dir(&self) -> &Path {
        &self.checkpoints_dir
    }

    /// Checkpoints decided so far.
    #[must_use]
    pub const fn taken(&self) -> u32 {
        self.taken
    }

    /// Current step.
    #[must_use]
    pub const fn step(&self) -> TakeStep {
        self.step
    }

    /// Decides the transition for a milestone.
    pub fn decide(&mut self, phase: Phase, milestone: MilestoneKind) -> Transition {
        let t = Transition::stay(phase);
        match (milestone, self.step) {
            (MilestoneKind::WorkBegin, TakeStep::AwaitWorkBegin) => {
                self.take_next(t.reset().exhaust(), true)
            }
            (MilestoneKind::MaxInsts, TakeStep::Checkpointing) => self.take_next(t, false),
            (MilestoneKind::WorkEnd, TakeStep::AwaitWorkBegin | TakeStep::Checkpointing) => {
                self.step = TakeStep::Done;
                let t = if phase == Phase::RegionOfInterest {
                    t.dump().exit_region(RegionExit::Counted)
                } else {
                    t
                };
                t.reset().to_phase(Phase::NoWork).terminate().exhaust()
            }
            _ => t,
        }
    }

    /// Writes the next checkpoint. `starting` is set when the region opens
    /// with this checkpoint.
    fn take_next(&mut self, t: Transition, starting: bool) -> Transition {
        self.taken = self.taken.saturating_add(1);
        let t = t.checkpoint(CheckpointTarget::TickStamped(self.checkpoints_dir.clone()));

        if self.max_checkpoints.is_some_and(|max| self.taken >= max) {
            self.step = TakeStep::Done;
            let t = if starting {
                t
            } else {
                t.exit_region(RegionExit::Counted)
            };
            t.to_phase(Phase::NoWork).terminate()
        } else {
            self.step = TakeStep::Checkpointing;
            let t = t.schedule(self.interval);
            if starting {
                t.to_phase(Phase::RegionOfInterest).enter_region()
            } else {
                t
            }
        }
    }
}

// ============================================================================
// Post-Boot Checkpoint
// ============================================================================

/// Single checkpoint when the guest signals it has booted.
#[derive(Debug, Clone)]
pub struct PostBootCheckpointPolicy {
    checkpoint_dir: PathBuf,
}

impl PostBootCheckpointPolicy {
    /// Builds the policy.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] for an empty directory.
    pub fn new(config: &PostBootCheckpointConfig) -> Result<Self, ConfigError> {
        validate_section(&ManagerConfig::PostBootCheckpoint(config.clone()))?;
        Ok(Self {
            checkpoint_dir: config.checkpoint_dir.clone(),
        })
    }

    /// Checkpoint directory.
    #[must_use]
    pub fn checkpoint_dir(&self) -> &Path {
        &self.checkpoint_dir
    }

    /// Decides the transition for a milestone.
    #[must_use]
    pub fn decide(&self, phase: Phase, milestone: MilestoneKind) -> Transition {
        match milestone {
            MilestoneKind::Checkpoint => Transition::stay(phase)
                .checkpoint(CheckpointTarget::Exact(self.checkpoint_dir.clone()))
                .terminate()
                .exhaust(),
            MilestoneKind::MaxInsts | MilestoneKind::WorkBegin | MilestoneKind::WorkEnd => {
                Transition::stay(phase)
            }
        }
    }
}
