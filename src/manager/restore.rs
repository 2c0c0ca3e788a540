//! Restore-checkpoint policy
//!
//! The simulation starts from a restored checkpoint, so the policy sets up
//! its first interval before the run begins. Its `MaxInsts` handler walks
//! two steps: end of warmup, then end of the region.

use crate::config::schema::{ManagerConfig, RestoreCheckpointConfig};
use crate::error::ConfigError;
use crate::phase::{Phase, RegionExit, Transition};
use crate::sim::MilestoneKind;

use super::{instructions, validate_section};

/// Position of the restore `MaxInsts` handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreStep {
    /// Not initialized yet
    Pending,
    /// Next `MaxInsts` ends warmup
    AwaitWarmupEnd,
    /// Next `MaxInsts` ends the region
    AwaitRoiEnd,
    /// Run ended
    Done,
}

/// Warmup and region after restoring a checkpoint.
#[derive(Debug, Clone)]
pub struct RestoreCheckpointPolicy {
    warmup: u64,
    roi: u64,
    step: RestoreStep,
}

impl RestoreCheckpointPolicy {
    /// Builds the policy. A zero region length runs the region until the
    /// workload ends.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] for negative lengths.
    pub fn new(config: &RestoreCheckpointConfig) -> Result<Self, ConfigError> {
        validate_section(&ManagerConfig::RestoreCheckpoint(config.clone()))?;
        Ok(Self {
            warmup: instructions(config.warmup),
            roi: instructions(config.roi),
            step: RestoreStep::Pending,
        })
    }

    /// Current step.
    #[must_use]
    pub const fn step(&self) -> RestoreStep {
        self.step
    }

    /// Pre-run transition: start warmup, or the region when warmup is 0.
    pub fn initialize(&mut self) -> Transition {
        let t = Transition::stay(Phase::NoWork);
        if self.warmup > 0 {
            self.step = RestoreStep::AwaitWarmupEnd;
            t.to_phase(Phase::Warmup).schedule(self.warmup)
        } else {
            self.enter_region(t)
        }
    }

    /// Decides the transition for a milestone.
    pub fn decide(&mut self, phase: Phase, milestone: MilestoneKind) -> Transition {
        let t = Transition::stay(phase);
        match (milestone, self.step) {
            (MilestoneKind::MaxInsts, RestoreStep::AwaitWarmupEnd) => self.enter_region(t),
            (MilestoneKind::MaxInsts, RestoreStep::AwaitRoiEnd) => {
                self.step = RestoreStep::Done;
                t.dump()
                    .exit_region(RegionExit::Counted)
                    .reset()
                    .to_phase(Phase::NoWork)
                    .terminate()
                    .exhaust()
            }
            (MilestoneKind::WorkEnd, RestoreStep::Done) => t,
            (MilestoneKind::WorkEnd, _) => {
                self.step = RestoreStep::Done;
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

    fn enter_region(&mut self, t: Transition) -> Transition {
        self.step = RestoreStep::AwaitRoiEnd;
        let t = t.to_phase(Phase::RegionOfInterest).reset().enter_region();
        if self.roi > 0 { t.schedule(self.roi) } else { t }
    }
}
