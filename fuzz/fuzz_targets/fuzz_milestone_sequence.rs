#![no_main]

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use roisampler::config::schema::{InstructionCount, ManagerConfig, SamplingConfig};
use roisampler::config::schema::{ProcessorKind, TickCosts, WorkloadScript};
use roisampler::manager::Policy;
use roisampler::observability::EventEmitter;
use roisampler::phase::PhaseEngine;
use roisampler::sim::{ExecutionModel, MilestoneKind, ScriptedSimulator};

const KINDS: [MilestoneKind; 4] = [
    MilestoneKind::MaxInsts,
    MilestoneKind::WorkBegin,
    MilestoneKind::WorkEnd,
    MilestoneKind::Checkpoint,
];

fuzz_target!(|data: &[u8]| {
    let Some((head, rest)) = data.split_first_chunk::<4>() else {
        return;
    };

    let config = ManagerConfig::Sampling(SamplingConfig {
        fast_forward: InstructionCount(i64::from(head[0] % 4)),
        warmup: InstructionCount(i64::from(head[1] % 4)),
        roi: InstructionCount(i64::from(head[2] % 4) + 1),
        initial_fast_forward: None,
        max_regions: (head[3] % 4 > 0).then_some(i64::from(head[3] % 4)),
        continue_after_max: head[3] & 0x80 != 0,
    });
    let Ok(policy) = Policy::from_config(&config) else {
        return;
    };

    let sim = ScriptedSimulator::new(&WorkloadScript {
        total_instructions: InstructionCount(1_000),
        processor: ProcessorKind::Switchable,
        initial_model: ExecutionModel::Fast,
        ticks_per_instruction: TickCosts::default(),
        milestones: Vec::new(),
    });
    let mut engine = PhaseEngine::new(sim, policy, Arc::new(EventEmitter::noop()));

    // Arbitrary milestone orders must never panic or lose region ticks
    for byte in rest {
        let _ = engine.handle(KINDS[usize::from(byte % 4)]);
    }
    let counters = engine.counters();
    assert_eq!(
        counters.region_ticks().iter().sum::<u64>(),
        counters.cumulative_region_ticks()
    );
});
