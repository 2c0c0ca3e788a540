//! Periodic sampling policy
//!
//! Cycles `FastForward → Warmup → RegionOfInterest` between workload
//! begin and end. Fast-forward runs on the fast model, warmup and the
//! region on the detailed model. A zero fast-forward or warmup interval
//! skips that phase.

use crate::config::schema::{ManagerConfig, SamplingConfig};
use crate::phase::{Phase, RegionExit, RunCounters, Transition};
use crate::sim::MilestoneKind;

use super::{instructions, validate_section};

/// Interval lengths, in instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalLengths {
    /// Fast-forward between regions (0 skips)
    pub fast_forward: u64,
    /// Warmup before each region (0 skips)
    pub warmup: u64,
    /// Region length (never 0)
    pub roi: u64,
    /// Fast-forward right after workload begin
    pub initial_fast_forward: Option<u64>,
}

/// What happens once the maximum region count is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StopPolicy {
    /// Maximum regions per workload begin
    pub max_regions: Option<u32>,
    /// Keep fast-forwarding instead of terminating
    pub continue_after_max: bool,
}

impl StopPolicy {
    /// Whether `completed` regions reach the maximum.
    #[must_use]
    pub fn reached(&self, completed: u32) -> bool {
        self.max_regions.is_some_and(|max| completed >= max)
    }
}

/// Periodic fast-forward / warmup / ROI sampling.
#[derive(Debug, Clone)]
pub struct SamplingPolicy {
    intervals: IntervalLengths,
    stop: StopPolicy,
}

impl SamplingPolicy {
    /// Builds a sampling policy.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::ConfigError::ValidationError`] for negative
    /// intervals, a zero region length, a non-positive initial
    /// fast-forward, or a maximum below 1.
    pub fn new(config: &SamplingConfig) -> Result<Self, crate::error::ConfigError> {
        validate_section(&ManagerConfig::Sampling(config.clone()))?;

        Ok(Self {
            intervals: IntervalLengths {
                fast_forward: instructions(config.fast_forward),
                warmup: instructions(config.warmup),
                roi: instructions(config.roi),
                initial_fast_forward: config.initial_fast_forward.map(instructions),
            },
            stop: StopPolicy {
                max_regions: config.max_regions.and_then(|m| u32::try_from(m).ok()),
                continue_after_max: config.continue_after_max,
            },
        })
    }

    /// Decides the transition for a milestone.
    #[must_use]
    pub fn decide(&self, phase: Phase, milestone: MilestoneKind, counters: &RunCounters) -> Transition {
        match milestone {
            MilestoneKind::WorkBegin => self.on_work_begin(phase),
            MilestoneKind::WorkEnd => Self::on_work_end(phase),
            MilestoneKind::MaxInsts => self.on_max_insts(phase, counters),
            MilestoneKind::Checkpoint => Transition::stay(phase),
        }
    }

    fn on_work_begin(&self, phase: Phase) -> Transition {
        let detailed = phase.is_detailed();
        let mut t = Transition::stay(phase).reset_region_count();
        if phase == Phase::RegionOfInterest {
            t = t.exit_region(RegionExit::Discarded);
        }

        match self.intervals.initial_fast_forward {
            Some(init) => {
                let t = t.to_phase(Phase::InitialFastForward).schedule(init);
                if detailed { t.switch_model() } else { t }
            }
            None => self.start_fast_forward(t, detailed),
        }
    }

    fn on_work_end(phase: Phase) -> Transition {
        let t = Transition::stay(phase).to_phase(Phase::NoWork);
        let t = match phase {
            Phase::RegionOfInterest => t
                .dump()
                .exit_region(RegionExit::Uncounted)
                .switch_model(),
            Phase::Warmup => t.switch_model(),
            Phase::NoWork | Phase::InitialFastForward | Phase::FastForward => t,
        };
        t.reset_after_switch()
    }

    fn on_max_insts(&self, phase: Phase, counters: &RunCounters) -> Transition {
        let t = Transition::stay(phase);
        match phase {
            Phase::NoWork => t,
            Phase::InitialFastForward => self.start_fast_forward(t, false),
            Phase::FastForward => {
                if self.stop.continue_after_max && self.stop.reached(counters.completed_regions())
                {
                    t.schedule(self.intervals.fast_forward)
                } else {
                    self.start_warmup(t, false)
                }
            }
            Phase::Warmup => self.start_region(t, true),
            Phase::RegionOfInterest => {
                let t = t.dump().exit_region(RegionExit::Counted);
                let completed = counters.completed_regions().saturating_add(1);
                if !self.stop.reached(completed) {
                    self.start_fast_forward(t, true)
                } else if !self.stop.continue_after_max {
                    t.reset().to_phase(Phase::NoWork).terminate()
                } else if self.intervals.fast_forward > 0 {
                    self.start_fast_forward(t, true)
                } else {
                    // nothing left to sample; run the rest on the fast model
                    t.switch_model().to_phase(Phase::NoWork)
                }
            }
        }
    }

    /// Starts the next fast-forward interval, or the phase after it when
    /// the interval is zero.
    fn start_fast_forward(&self, t: Transition, detailed: bool) -> Transition {
        if self.intervals.fast_forward == 0 {
            return self.start_warmup(t, detailed);
        }
        let t = t
            .to_phase(Phase::FastForward)
            .schedule(self.intervals.fast_forward);
        if detailed { t.switch_model() } else { t }
    }

    fn start_warmup(&self, t: Transition, detailed: bool) -> Transition {
        if self.intervals.warmup == 0 {
            return self.start_region(t, detailed);
        }
        let t = t.to_phase(Phase::Warmup).schedule(self.intervals.warmup);
        if detailed { t } else { t.switch_model() }
    }

    fn start_region(&self, t: Transition, detailed: bool) -> Transition {
        let t = t
            .to_phase(Phase::RegionOfInterest)
            .enter_region()
            .schedule(self.intervals.roi);
        if detailed {
            t.reset()
        } else {
            t.switch_model().reset_after_switch()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::InstructionCount;
    use crate::phase::Continuation;

    fn policy(ff: i64, warmup: i64, roi: i64) -> SamplingPolicy {
        SamplingPolicy::new(&SamplingConfig {
            fast_forward: InstructionCount(ff),
            warmup: InstructionCount(warmup),
            roi: InstructionCount(roi),
            initial_fast_forward: None,
            max_regions: None,
            continue_after_max: false,
        })
        .unwrap()
    }

    fn with_max(ff: i64, max: i64, continue_after_max: bool) -> SamplingPolicy {
        SamplingPolicy::new(&SamplingConfig {
            fast_forward: InstructionCount(ff),
            warmup: InstructionCount(10),
            roi: InstructionCount(10),
            initial_fast_forward: None,
            max_regions: Some(max),
            continue_after_max,
        })
        .unwrap()
    }

    fn counters_with(completed: u32) -> RunCounters {
        let mut counters = RunCounters::new();
        for _ in 0..completed {
            counters.complete_region();
        }
        counters
    }

    fn max_insts(policy: &SamplingPolicy, phase: Phase) -> Transition {
        policy.decide(phase, MilestoneKind::MaxInsts, &RunCounters::new())
    }

    #[test]
    fn test_initial_fast_forward_to_fast_forward() {
        let t = max_insts(&policy(100, 10, 20), Phase::InitialFastForward);
        assert_eq!(t.next_phase, Phase::FastForward);
        assert!(!t.switch_model && !t.reset_stats && !t.dump_stats);
        assert_eq!(t.schedule, Some(100));
    }

    #[test]
    fn test_fast_forward_to_warmup_switches() {
        let t = max_insts(&policy(100, 10, 20), Phase::FastForward);
        assert_eq!(t.next_phase, Phase::Warmup);
        assert!(t.switch_model);
        assert!(!t.reset_stats && !t.dump_stats);
        assert_eq!(t.schedule, Some(10));
    }

    #[test]
    fn test_warmup_to_region_resets() {
        let t = max_insts(&policy(100, 10, 20), Phase::Warmup);
        assert_eq!(t.next_phase, Phase::RegionOfInterest);
        assert!(t.reset_stats && t.enter_region);
        assert!(!t.switch_model && !t.dump_stats);
        assert_eq!(t.schedule, Some(20));
    }

    #[test]
    fn test_region_to_fast_forward_dumps() {
        let t = max_insts(&policy(100, 10, 20), Phase::RegionOfInterest);
        assert_eq!(t.next_phase, Phase::FastForward);
        assert!(t.dump_stats && t.switch_model);
        assert!(!t.reset_stats);
        assert_eq!(t.exit_region, Some(RegionExit::Counted));
        assert_eq!(t.schedule, Some(100));
    }

    #[test]
    fn test_region_at_max_terminates() {
        let policy = with_max(100, 2, false);
        let t = policy.decide(Phase::RegionOfInterest, MilestoneKind::MaxInsts, &counters_with(1));
        assert_eq!(t.next_phase, Phase::NoWork);
        assert_eq!(t.continuation, Continuation::Terminate);
        assert!(t.dump_stats && t.reset_stats);
        assert!(!t.switch_model);
        assert_eq!(t.schedule, None);
    }

    #[test]
    fn test_region_at_max_continues() {
        let policy = with_max(100, 1, true);
        let t = policy.decide(Phase::RegionOfInterest, MilestoneKind::MaxInsts, &counters_with(0));
        assert_eq!(t.next_phase, Phase::FastForward);
        assert_eq!(t.continuation, Continuation::Continue);
        assert!(t.dump_stats && t.switch_model);

        // later fast-forwards just reschedule
        let t = policy.decide(Phase::FastForward, MilestoneKind::MaxInsts, &counters_with(1));
        assert_eq!(t.next_phase, Phase::FastForward);
        assert!(!t.switch_model);
        assert_eq!(t.schedule, Some(100));
    }

    #[test]
    fn test_continue_without_fast_forward_goes_idle() {
        let policy = with_max(0, 1, true);
        let t = policy.decide(Phase::RegionOfInterest, MilestoneKind::MaxInsts, &counters_with(0));
        assert_eq!(t.next_phase, Phase::NoWork);
        assert!(t.switch_model);
        assert_eq!(t.schedule, None);
        assert_eq!(t.continuation, Continuation::Continue);
    }

    #[test]
    fn test_zero_fast_forward_skips_to_warmup() {
        let t = max_insts(&policy(0, 10, 20), Phase::RegionOfInterest);
        assert_eq!(t.next_phase, Phase::Warmup);
        assert!(!t.switch_model);
        assert_eq!(t.schedule, Some(10));
    }

    #[test]
    fn test_zero_warmup_skips_to_region() {
        let t = max_insts(&policy(100, 0, 20), Phase::FastForward);
        assert_eq!(t.next_phase, Phase::RegionOfInterest);
        assert!(t.switch_model && t.reset_after_switch && t.enter_region);
        assert_eq!(t.schedule, Some(20));
    }

    #[test]
    fn test_back_to_back_regions() {
        let t = max_insts(&policy(0, 0, 20), Phase::RegionOfInterest);
        assert_eq!(t.next_phase, Phase::RegionOfInterest);
        assert_eq!(t.exit_region, Some(RegionExit::Counted));
        assert!(t.dump_stats && t.reset_stats && t.enter_region);
        assert!(!t.switch_model);
    }

    #[test]
    fn test_work_begin_enters_fast_forward() {
        let t = policy(100, 10, 20).decide(Phase::NoWork, MilestoneKind::WorkBegin, &RunCounters::new());
        assert_eq!(t.next_phase, Phase::FastForward);
        assert!(t.reset_region_count);
        assert!(!t.switch_model);
        assert_eq!(t.schedule, Some(100));
    }

    #[test]
    fn test_work_begin_uses_initial_fast_forward() {
        let policy = SamplingPolicy::new(&SamplingConfig {
            fast_forward: InstructionCount(100),
            warmup: InstructionCount(10),
            roi: InstructionCount(20),
            initial_fast_forward: Some(InstructionCount(5_000)),
            max_regions: None,
            continue_after_max: false,
        })
        .unwrap();
        let t = policy.decide(Phase::NoWork, MilestoneKind::WorkBegin, &RunCounters::new());
        assert_eq!(t.next_phase, Phase::InitialFastForward);
        assert_eq!(t.schedule, Some(5_000));
    }

    #[test]
    fn test_work_begin_mid_region_discards_and_switches_back() {
        let t = policy(100, 10, 20).decide(
            Phase::RegionOfInterest,
            MilestoneKind::WorkBegin,
            &counters_with(3),
        );
        assert_eq!(t.exit_region, Some(RegionExit::Discarded));
        assert!(t.switch_model && t.reset_region_count);
        assert_eq!(t.next_phase, Phase::FastForward);
    }

    #[test]
    fn test_work_end_mid_region() {
        let t = policy(100, 10, 20).decide(
            Phase::RegionOfInterest,
            MilestoneKind::WorkEnd,
            &RunCounters::new(),
        );
        assert_eq!(t.next_phase, Phase::NoWork);
        assert!(t.dump_stats && t.switch_model && t.reset_after_switch);
        assert_eq!(t.exit_region, Some(RegionExit::Uncounted));
        assert_eq!(t.schedule, None);
        assert_eq!(t.continuation, Continuation::Continue);
    }

    #[test]
    fn test_work_end_outside_region_never_dumps() {
        let policy = policy(100, 10, 20);
        for phase in [Phase::NoWork, Phase::InitialFastForward, Phase::FastForward, Phase::Warmup] {
            let t = policy.decide(phase, MilestoneKind::WorkEnd, &RunCounters::new());
            assert!(!t.dump_stats, "dumped in {phase}");
            assert!(t.reset_after_switch);
            assert_eq!(t.switch_model, phase == Phase::Warmup);
        }
    }

    #[test]
    fn test_stop_policy_reached() {
        let stop = StopPolicy {
            max_regions: Some(2),
            continue_after_max: false,
        };
        assert!(!stop.reached(1));
        assert!(stop.reached(2));
        assert!(!StopPolicy::default().reached(u32::MAX));
    }
}
