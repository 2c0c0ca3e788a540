//! Simple ROI policy
//!
//! The workload's begin/end markers bracket one detailed region. The
//! policy never terminates the run.

use crate::phase::{Phase, RegionExit, Transition};
use crate::sim::MilestoneKind;

/// One region of interest per workload begin/end pair.
#[derive(Debug, Clone, Default)]
pub struct SimpleRoiPolicy;

impl SimpleRoiPolicy {
    /// Creates the policy. It has no configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decides the transition for a milestone.
    #[must_use]
    pub fn decide(&self, phase: Phase, milestone: MilestoneKind) -> Transition {
        let t = Transition::stay(phase);
        match (milestone, phase) {
            // a repeated begin restarts the region on the model already active
            (MilestoneKind::WorkBegin, Phase::RegionOfInterest) => t
                .exit_region(RegionExit::Discarded)
                .reset()
                .enter_region(),
            (MilestoneKind::WorkBegin, _) => t
                .to_phase(Phase::RegionOfInterest)
                .enter_region()
                .switch_model()
                .reset_after_switch(),
            (MilestoneKind::WorkEnd, Phase::RegionOfInterest) => t
                .to_phase(Phase::NoWork)
                .dump()
                .exit_region(RegionExit::Counted)
                .reset()
                .switch_model(),
            _ => t,
        }
    }
}
