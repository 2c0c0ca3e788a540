//! Shared integration-test harness: scripted workloads, manager configs,
//! and helpers for running the `roisampler` binary.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Output;
use std::sync::Arc;

use roisampler::config::schema::{
    InstructionCount, ManagerConfig, ProcessorKind, SamplingConfig, ScriptedMilestone, TickCosts,
    WorkloadScript,
};
use roisampler::controller::{RunController, RunReport};
use roisampler::observability::EventEmitter;
use roisampler::sim::{ExecutionModel, MilestoneKind, ScriptedSimulator};

/// Builds a switchable workload with default tick costs.
pub fn workload(total: i64, milestones: &[(i64, MilestoneKind)]) -> WorkloadScript {
    WorkloadScript {
        total_instructions: InstructionCount(total),
        processor: ProcessorKind::Switchable,
        initial_model: ExecutionModel::Fast,
        ticks_per_instruction: TickCosts::default(),
        milestones: milestones
            .iter()
            .map(|(at, kind)| ScriptedMilestone {
                at: InstructionCount(*at),
                kind: *kind,
            })
            .collect(),
    }
}

/// Sampling manager section.
pub fn sampling(
    ff: i64,
    warmup: i64,
    roi: i64,
    max_regions: Option<i64>,
    continue_after_max: bool,
) -> ManagerConfig {
    ManagerConfig::Sampling(SamplingConfig {
        fast_forward: InstructionCount(ff),
        warmup: InstructionCount(warmup),
        roi: InstructionCount(roi),
        initial_fast_forward: None,
        max_regions,
        continue_after_max,
    })
}

/// Initializes and runs a controller to completion.
#[allow(clippy::missing_panics_doc)]
pub fn run(config: &ManagerConfig, workload: &WorkloadScript) -> (RunReport, ScriptedSimulator) {
    let mut controller = RunController::from_config(
        ScriptedSimulator::new(workload),
        config,
        Arc::new(EventEmitter::noop()),
    )
    .expect("valid manager config");
    controller.initialize().expect("initialize");
    let report = controller.run().expect("run");
    (report, controller.into_simulator())
}

/// Helpers for spawning the `roisampler` binary.
pub struct RoiSamplerProcess;

impl RoiSamplerProcess {
    /// Runs `roisampler` with the given arguments and collects its output.
    #[allow(clippy::missing_panics_doc)]
    pub fn spawn_command(args: &[&str]) -> Output {
        Self::spawn_in(args, Path::new(env!("CARGO_MANIFEST_DIR")))
    }

    /// Like [`spawn_command`](Self::spawn_command) with a working directory.
    #[allow(clippy::missing_panics_doc)]
    pub fn spawn_in(args: &[&str], cwd: &Path) -> Output {
        std::process::Command::new(env!("CARGO_BIN_EXE_roisampler"))
            .args(args)
            .current_dir(cwd)
            .env_remove("ROISAMPLER_CONFIG")
            .env_remove("ROISAMPLER_LOG_LEVEL")
            .env("ROISAMPLER_COLOR", "never")
            .output()
            .expect("failed to spawn roisampler")
    }

    /// Absolute path of a file under `tests/fixtures`.
    pub fn fixture_path(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name)
    }
}
