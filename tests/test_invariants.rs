#![allow(clippy::unwrap_used)]

// Property tests for the run-level invariants of the sampling manager

mod common;

use std::sync::Arc;

use proptest::prelude::*;

use common::{run, sampling, workload};
use roisampler::config::schema::ManagerConfig;
use roisampler::manager::Policy;
use roisampler::observability::EventEmitter;
use roisampler::phase::{Continuation, Phase, PhaseEngine, Step};
use roisampler::sim::{MilestoneKind, ScriptedSimulator, SimCall, Simulator};

fn marker_strategy() -> impl Strategy<Value = (i64, MilestoneKind)> {
    (
        0i64..600,
        prop_oneof![Just(MilestoneKind::WorkBegin), Just(MilestoneKind::WorkEnd)],
    )
}

fn call_tick(call: &SimCall) -> u64 {
    match call {
        SimCall::ResetStats { tick }
        | SimCall::DumpStats { tick }
        | SimCall::Checkpoint { tick, .. }
        | SimCall::Switch { tick, .. }
        | SimCall::Schedule { tick, .. } => *tick,
    }
}

proptest! {
    /// Property: the per-region deltas add up to the reported total
    #[test]
    fn region_ticks_sum_to_total(
        ff in 0i64..40,
        warmup in 0i64..40,
        roi in 1i64..40,
        max in proptest::option::of(1i64..5),
        cont in any::<bool>(),
        markers in proptest::collection::vec(marker_strategy(), 0..8),
    ) {
        let (report, _) = run(&sampling(ff, warmup, roi, max, cont), &workload(500, &markers));
        prop_assert_eq!(report.region_ticks.iter().sum::<u64>(), report.cumulative_region_ticks);
        prop_assert!(report.completed_regions as usize <= report.region_ticks.len());
    }

    /// Property: the completed-region count never passes the maximum
    #[test]
    fn completed_regions_bounded_by_max(
        ff in 0i64..40,
        roi in 1i64..40,
        max in 1i64..5,
        cont in any::<bool>(),
        markers in proptest::collection::vec(marker_strategy(), 1..8),
    ) {
        let (report, _) = run(&sampling(ff, 5, roi, Some(max), cont), &workload(500, &markers));
        prop_assert!(i64::from(report.completed_regions) <= max);
    }

    /// Property: simulated time never runs backwards across control calls
    #[test]
    fn control_calls_are_tick_ordered(
        ff in 0i64..40,
        warmup in 0i64..40,
        roi in 1i64..40,
        markers in proptest::collection::vec(marker_strategy(), 0..8),
    ) {
        let (report, sim) = run(&sampling(ff, warmup, roi, None, false), &workload(500, &markers));
        let ticks: Vec<u64> = sim.calls().iter().map(call_tick).collect();
        prop_assert!(ticks.windows(2).all(|w| w[0] <= w[1]));
        prop_assert_eq!(sim.dumps().len(), report.stats_dumps as usize);
    }

    /// Property: the completed-region count moves by one only when a
    /// region ends on its target, and drops only to zero on work begin
    #[test]
    fn completed_regions_step_by_one_per_region(
        ff in 1i64..40,
        warmup in 0i64..40,
        roi in 1i64..40,
        max in proptest::option::of(1i64..5),
        cont in any::<bool>(),
        markers in proptest::collection::vec(marker_strategy(), 0..8),
    ) {
        let mut engine = PhaseEngine::new(
            ScriptedSimulator::new(&workload(500, &markers)),
            Policy::from_config(&sampling(ff, warmup, roi, max, cont)).unwrap(),
            Arc::new(EventEmitter::noop()),
        );
        engine.initialize().unwrap();

        while let Some(kind) = engine.simulator_mut().next_milestone() {
            let (phase_before, before) = (engine.phase(), engine.counters().completed_regions());
            let step = engine.handle(kind).unwrap();
            let (phase_after, after) = (engine.phase(), engine.counters().completed_regions());

            let region_ended = kind == MilestoneKind::MaxInsts
                && phase_before == Phase::RegionOfInterest
                && matches!(phase_after, Phase::FastForward | Phase::NoWork);

            if kind == MilestoneKind::WorkBegin {
                prop_assert_eq!(after, 0);
            } else if region_ended {
                prop_assert_eq!(after, before + 1);
            } else {
                prop_assert_eq!(after, before, "{:?} in {:?}", kind, phase_before);
            }

            if step.continuation == Continuation::Terminate {
                break;
            }
        }
    }

    /// Property: dumps happen only at the end of a detailed region
    #[test]
    fn dumps_only_close_regions(
        ff in 1i64..40,
        warmup in 1i64..40,
        roi in 1i64..40,
        markers in proptest::collection::vec(marker_strategy(), 0..8),
    ) {
        let (report, _) = run(&sampling(ff, warmup, roi, None, false), &workload(500, &markers));
        prop_assert_eq!(report.stats_dumps as usize, report.region_ticks.len());
    }
}

#[test]
fn stray_max_insts_is_noop_for_every_manager() {
    let tmp = tempfile::tempdir().unwrap();
    let configs = [
        sampling(10, 10, 10, None, false),
        ManagerConfig::SimpleRoi,
        ManagerConfig::TakeCheckpoints(roisampler::config::schema::TakeCheckpointsConfig {
            interval: 10.into(),
            checkpoints_dir: tmp.path().join("cpts"),
            max_checkpoints: None,
        }),
        ManagerConfig::PostBootCheckpoint(roisampler::config::schema::PostBootCheckpointConfig {
            checkpoint_dir: tmp.path().join("boot"),
        }),
    ];

    for config in &configs {
        let mut engine = PhaseEngine::new(
            ScriptedSimulator::new(&workload(100, &[])),
            Policy::from_config(config).unwrap(),
            Arc::new(EventEmitter::noop()),
        );
        let step = engine.handle(MilestoneKind::MaxInsts).unwrap();

        assert_eq!(step, Step::default(), "{:?}", config.kind());
        assert_eq!(engine.phase(), Phase::NoWork);
        assert!(engine.simulator().calls().is_empty());
        assert_eq!(engine.counters().completed_regions(), 0);
        assert_eq!(engine.counters().stats_dumps(), 0);
    }
}
