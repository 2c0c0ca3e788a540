//! Event manager policies
//!
//! A policy maps `(phase, milestone, counters)` to a [`Transition`]. It
//! never touches the simulator; the phase engine applies what it decides.
//! Each manager kind is one variant of [`Policy`].

pub mod checkpoint;
pub mod restore;
pub mod sampling;
pub mod simple;

use std::path::Path;

use tracing::warn;

use crate::config::schema::{ManagerConfig, ManagerKind};
use crate::config::validation::Validator;
use crate::error::ConfigError;
use crate::phase::{Phase, RunCounters, Transition};
use crate::sim::MilestoneKind;

pub use checkpoint::{PostBootCheckpointPolicy, TakeCheckpointsPolicy};
pub use restore::RestoreCheckpointPolicy;
pub use sampling::{IntervalLengths, SamplingPolicy, StopPolicy};
pub use simple::SimpleRoiPolicy;

/// Interval policy for one run, tagged by manager kind.
#[derive(Debug, Clone)]
pub enum Policy {
    /// Periodic fast-forward / warmup / ROI sampling
    Sampling(SamplingPolicy),
    /// Single ROI bracketed by work begin/end
    SimpleRoi(SimpleRoiPolicy),
    /// Periodic checkpoints inside the workload ROI
    TakeCheckpoints(TakeCheckpointsPolicy),
    /// Warmup and ROI after restoring a checkpoint
    RestoreCheckpoint(RestoreCheckpointPolicy),
    /// One checkpoint after OS boot
    PostBootCheckpoint(PostBootCheckpointPolicy),
}

impl Policy {
    /// Builds the policy for a manager section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] listing every structural
    /// problem in the section.
    pub fn from_config(config: &ManagerConfig) -> Result<Self, ConfigError> {
        Ok(match config {
            ManagerConfig::Sampling(c) => Self::Sampling(SamplingPolicy::new(c)?),
            ManagerConfig::SimpleRoi => Self::SimpleRoi(SimpleRoiPolicy::new()),
            ManagerConfig::TakeCheckpoints(c) => {
                Self::TakeCheckpoints(TakeCheckpointsPolicy::new(c)?)
            }
            ManagerConfig::RestoreCheckpoint(c) => {
                Self::RestoreCheckpoint(RestoreCheckpointPolicy::new(c)?)
            }
            ManagerConfig::PostBootCheckpoint(c) => {
                Self::PostBootCheckpoint(PostBootCheckpointPolicy::new(c)?)
            }
        })
    }

    /// Manager kind of this policy.
    #[must_use]
    pub const fn kind(&self) -> ManagerKind {
        match self {
            Self::Sampling(_) => ManagerKind::Sampling,
            Self::SimpleRoi(_) => ManagerKind::SimpleRoi,
            Self::TakeCheckpoints(_) => ManagerKind::TakeCheckpoints,
            Self::RestoreCheckpoint(_) => ManagerKind::RestoreCheckpoint,
            Self::PostBootCheckpoint(_) => ManagerKind::PostBootCheckpoint,
        }
    }

    /// Milestone kinds this policy registers handlers for.
    #[must_use]
    pub const fn handled_milestones(&self) -> &'static [MilestoneKind] {
        match self {
            Self::Sampling(_) => &[
                MilestoneKind::WorkBegin,
                MilestoneKind::WorkEnd,
                MilestoneKind::MaxInsts,
            ],
            Self::SimpleRoi(_) => &[MilestoneKind::WorkBegin, MilestoneKind::WorkEnd],
            Self::TakeCheckpoints(_) => &[
                MilestoneKind::WorkBegin,
                MilestoneKind::MaxInsts,
                MilestoneKind::WorkEnd,
            ],
            Self::RestoreCheckpoint(_) => &[MilestoneKind::MaxInsts, MilestoneKind::WorkEnd],
            Self::PostBootCheckpoint(_) => &[MilestoneKind::Checkpoint],
        }
    }

    /// Directory checkpoints are written under, if the policy writes any.
    #[must_use]
    pub fn checkpoint_dir(&self) -> Option<&Path> {
        match self {
            Self::TakeCheckpoints(p) => Some(p.checkpoints_dir()),
            Self::PostBootCheckpoint(p) => Some(p.checkpoint_dir()),
            Self::Sampling(_) | Self::SimpleRoi(_) | Self::RestoreCheckpoint(_) => None,
        }
    }

    /// Transition to apply before the first milestone, if any.
    pub fn initialize(&mut self) -> Option<Transition> {
        match self {
            Self::RestoreCheckpoint(p) => Some(p.initialize()),
            Self::Sampling(_)
            | Self::SimpleRoi(_)
            | Self::TakeCheckpoints(_)
            | Self::PostBootCheckpoint(_) => None,
        }
    }

    /// Decides the transition for `milestone` raised in `phase`.
    pub fn decide(
        &mut self,
        phase: Phase,
        milestone: MilestoneKind,
        counters: &RunCounters,
    ) -> Transition {
        match self {
            Self::Sampling(p) => p.decide(phase, milestone, counters),
            Self::SimpleRoi(p) => p.decide(phase, milestone),
            Self::TakeCheckpoints(p) => p.decide(phase, milestone),
            Self::RestoreCheckpoint(p) => p.decide(phase, milestone),
            Self::PostBootCheckpoint(p) => p.decide(phase, milestone),
        }
    }
}

/// Runs the manager checks for a section, logging warnings.
pub(crate) fn validate_section(config: &ManagerConfig) -> Result<(), ConfigError> {
    let warnings = Validator::new()
        .validate_manager(config)
        .into_result(&format!("<{} manager>", config.kind()))?;
    for issue in warnings {
        warn!(path = %issue.path, "{}", issue.message);
    }
    Ok(())
}

/// Converts a validated, non-negative instruction count.
pub(crate) fn instructions(value: crate::config::schema::InstructionCount) -> u64 {
    value.to_count().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{InstructionCount, SamplingConfig};

    #[test]
    fn test_from_config_rejects_invalid_section() {
        let config = ManagerConfig::Sampling(SamplingConfig {
            fast_forward: InstructionCount(-1),
            warmup: InstructionCount(0),
            roi: InstructionCount(0),
            initial_fast_forward: None,
            max_regions: Some(0),
            continue_after_max: false,
        });
        let Err(ConfigError::ValidationError { errors, .. }) = Policy::from_config(&config)
        else {
            panic!("expected validation error");
        };
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_handled_milestones_per_kind() {
        let simple = Policy::from_config(&ManagerConfig::SimpleRoi).unwrap();
        assert_eq!(simple.kind(), ManagerKind::SimpleRoi);
        assert!(!simple.handled_milestones().contains(&MilestoneKind::MaxInsts));

        let boot = Policy::from_config(&ManagerConfig::PostBootCheckpoint(
            crate::config::schema::PostBootCheckpointConfig::default(),
        ))
        .unwrap();
        assert_eq!(boot.handled_milestones(), &[MilestoneKind::Checkpoint]);
        assert!(boot.checkpoint_dir().is_some());
    }

    #[test]
    fn test_only_restore_initializes() {
        let mut simple = Policy::from_config(&ManagerConfig::SimpleRoi).unwrap();
        assert!(simple.initialize().is_none());

        let mut restore = Policy::from_config(&ManagerConfig::RestoreCheckpoint(
            crate::config::schema::RestoreCheckpointConfig {
                warmup: InstructionCount(0),
                roi: InstructionCount(10),
            },
        ))
        .unwrap();
        assert!(restore.initialize().is_some());
    }
}
