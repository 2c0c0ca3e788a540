//! Trace-driven simulator
//!
//! `ScriptedSimulator` replays a [`WorkloadScript`]: workload milestones sit
//! at fixed retired-instruction positions on core 0, and simulated time
//! advances by a per-model tick cost for every retired instruction. It is
//! deterministic, so runs against it are reproducible dry runs of a
//! manager configuration.

use std::collections::VecDeque;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, trace, warn};

use super::{CoreSelector, ExecutionModel, MilestoneKind, SimCall, Simulator};
use crate::config::schema::{ProcessorKind, TickCosts, WorkloadScript};

/// File written inside every checkpoint directory.
pub const CHECKPOINT_MANIFEST: &str = "checkpoint.json";

/// One statistics dump: the window since the last reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsDump {
    /// Tick the dump happened at
    pub tick: u64,
    /// Ticks covered by the window
    pub ticks: u64,
    /// Instructions retired in the window
    pub instructions: u64,
}

#[derive(Debug, Serialize)]
struct CheckpointManifest {
    tick: u64,
    instructions: u64,
    model: ExecutionModel,
}

/// Deterministic [`Simulator`] driven by a workload script.
#[derive(Debug)]
pub struct ScriptedSimulator {
    milestones: VecDeque<(u64, MilestoneKind)>,
    total_instructions: u64,
    costs: TickCosts,
    processor: ProcessorKind,
    model: ExecutionModel,
    tick: u64,
    retired: u64,
    target: Option<u64>,
    window_start: (u64, u64),
    exited: bool,
    calls: Vec<SimCall>,
    dumps: Vec<StatsDump>,
}

impl ScriptedSimulator {
    /// Builds a simulator positioned at instruction 0, tick 0.
    ///
    /// Milestones are ordered by position; equal positions keep their
    /// script order. Negative positions are dropped.
    #[must_use]
    pub fn new(script: &WorkloadScript) -> Self {
        let mut milestones: Vec<(u64, MilestoneKind)> = script
            .milestones
            .iter()
            .filter_map(|m| m.at.to_count().map(|at| (at, m.kind)))
            .collect();
        milestones.sort_by_key(|(at, _)| *at);

        Self {
            milestones: milestones.into(),
            total_instructions: script.total_instructions.to_count().unwrap_or(0),
            costs: script.ticks_per_instruction,
            processor: script.processor,
            model: script.initial_model,
            tick: 0,
            retired: 0,
            target: None,
            window_start: (0, 0),
            exited: false,
            calls: Vec::new(),
            dumps: Vec::new(),
        }
    }

    /// Control calls issued so far, in order.
    #[must_use]
    pub fn calls(&self) -> &[SimCall] {
        &self.calls
    }

    /// Statistics dumps taken so far.
    #[must_use]
    pub fn dumps(&self) -> &[StatsDump] {
        &self.dumps
    }

    /// Instructions retired on core 0.
    #[must_use]
    pub const fn retired_instructions(&self) -> u64 {
        self.retired
    }

    /// Absolute instruction position of the outstanding target, if any.
    #[must_use]
    pub const fn pending_target(&self) -> Option<u64> {
        self.target
    }

    /// Whether the workload has exited.
    #[must_use]
    pub const fn has_exited(&self) -> bool {
        self.exited
    }

    /// Relative counts of every scheduled target, in order.
    #[must_use]
    pub fn scheduled_counts(&self) -> Vec<u64> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                SimCall::Schedule { count, .. } => Some(*count),
                _ => None,
            })
            .collect()
    }

    const fn tick_cost(&self) -> u64 {
        match self.model {
            ExecutionModel::Fast => self.costs.fast,
            ExecutionModel::Detailed => self.costs.detailed,
        }
    }

    fn advance_to(&mut self, position: u64) {
        let delta = position.saturating_sub(self.retired);
        self.tick = self
            .tick
            .saturating_add(delta.saturating_mul(self.tick_cost()));
        self.retired = self.retired.max(position);
        trace!(tick = self.tick, retired = self.retired, "advanced");
    }
}

impl Simulator for ScriptedSimulator {
    fn current_tick(&self) -> u64 {
        self.tick
    }

    fn execution_model(&self) -> ExecutionModel {
        self.model
    }

    fn reset_statistics(&mut self) {
        self.window_start = (self.tick, self.retired);
        self.calls.push(SimCall::ResetStats { tick: self.tick });
    }

    fn dump_statistics(&mut self) {
        let (start_tick, start_insts) = self.window_start;
        let dump = StatsDump {
            tick: self.tick,
            ticks: self.tick - start_tick,
            instructions: self.retired - start_insts,
        };
        debug!(tick = dump.tick, ticks = dump.ticks, insts = dump.instructions, "stats dump");
        self.dumps.push(dump);
        self.calls.push(SimCall::DumpStats { tick: self.tick });
    }

    fn create_checkpoint(&mut self, path: &Path) -> std::io::Result<()> {
        std::fs::create_dir_all(path)?;
        let manifest = CheckpointManifest {
            tick: self.tick,
            instructions: self.retired,
            model: self.model,
        };
        let body = serde_json::to_vec_pretty(&manifest).map_err(std::io::Error::other)?;
        std::fs::write(path.join(CHECKPOINT_MANIFEST), body)?;

        self.calls.push(SimCall::Checkpoint {
            tick: self.tick,
            path: path.to_path_buf(),
        });
        Ok(())
    }

    fn switch_execution_model(&mut self) {
        if self.processor == ProcessorKind::Fixed {
            warn!("processor cannot switch execution models; ignoring switch");
            return;
        }
        self.model = self.model.toggled();
        self.calls.push(SimCall::Switch {
            tick: self.tick,
            to: self.model,
        });
    }

    fn schedule_instruction_count_target(
        &mut self,
        count: u64,
        cores: CoreSelector,
        already_running: bool,
    ) {
        self.target = Some(self.retired.saturating_add(count));
        self.calls.push(SimCall::Schedule {
            tick: self.tick,
            count,
            cores,
            already_running,
        });
    }

    fn next_milestone(&mut self) -> Option<MilestoneKind> {
        if self.exited {
            return None;
        }

        let total = self.total_instructions;
        let scripted = self
            .milestones
            .front()
            .map(|(at, _)| *at)
            .filter(|at| *at <= total);
        let target = self.target.filter(|t| *t <= total);

        match (scripted, target) {
            // workload milestones win ties with the scheduled target
            (Some(at), t) if t.is_none_or(|t| at <= t) => {
                let (_, kind) = self.milestones.pop_front()?;
                self.advance_to(at);
                Some(kind)
            }
            (_, Some(t)) => {
                self.target = None;
                self.advance_to(t);
                Some(MilestoneKind::MaxInsts)
            }
            _ => {
                self.advance_to(total);
                self.exited = true;
                debug!(tick = self.tick, "workload exited");
                None
            }
        }
    }
}
