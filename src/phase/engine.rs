//! Phase engine
//!
//! The `PhaseEngine` owns the simulator capability, the active policy, the
//! current phase and the run counters. For each milestone it asks the
//! policy for a [`Transition`] and applies its effects in a fixed order:
//!
//! 1. dump statistics
//! 2. region exit bookkeeping
//! 3. reset statistics
//! 4. region enter bookkeeping
//! 5. execution-model switch
//! 6. reset statistics after the switch
//! 7. checkpoint creation
//! 8. schedule the next instruction-count target
//!
//! and then commits the phase.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::error::ManagerError;
use crate::manager::Policy;
use crate::observability::events::{Event, EventEmitter};
use crate::observability::metrics;
use crate::sim::{CoreSelector, MilestoneKind, Simulator};

use super::state::{Phase, RunCounters};
use super::transition::{Continuation, RegionExit, Transition};

/// Result of applying one transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Step {
    /// Whether the run continues
    pub continuation: Continuation,
    /// Whether the handler that produced it is finished
    pub exhausted: bool,
}

/// Phase state machine for one run.
pub struct PhaseEngine<S: Simulator> {
    sim: S,
    policy: Policy,
    phase: Phase,
    counters: RunCounters,
    terminated: bool,
    events: Arc<EventEmitter>,
}

impl<S: Simulator> std::fmt::Debug for PhaseEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseEngine")
            .field("policy", &self.policy.kind())
            .field("phase", &self.phase)
            .field("terminated", &self.terminated)
            .finish_non_exhaustive()
    }
}

impl<S: Simulator> PhaseEngine<S> {
    /// Creates an engine in [`Phase::NoWork`] with zeroed counters.
    #[must_use]
    pub fn new(sim: S, policy: Policy, events: Arc<EventEmitter>) -> Self {
        metrics::set_current_phase(Phase::NoWork, None);
        Self {
            sim,
            policy,
            phase: Phase::NoWork,
            counters: RunCounters::new(),
            terminated: false,
            events,
        }
    }

    /// Runs the policy's pre-run step, scheduling with
    /// `already_running = false`.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Checkpoint`] if a checkpoint cannot be written.
    pub fn initialize(&mut self) -> Result<Step, ManagerError> {
        match self.policy.initialize() {
            Some(transition) => self.apply(transition, false),
            None => Ok(Step::default()),
        }
    }

    /// Handles one milestone.
    ///
    /// `MaxInsts` while idle, and anything after termination, are no-ops.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Checkpoint`] if a checkpoint cannot be written.
    pub fn handle(&mut self, milestone: MilestoneKind) -> Result<Step, ManagerError> {
        if self.terminated {
            debug!(%milestone, "run already terminated; ignoring milestone");
            return Ok(Step {
                continuation: Continuation::Terminate,
                exhausted: false,
            });
        }
        if milestone == MilestoneKind::MaxInsts && self.phase == Phase::NoWork {
            debug!(tick = self.sim.current_tick(), "stray max_insts while idle");
            return Ok(Step::default());
        }

        let transition = self.policy.decide(self.phase, milestone, &self.counters);
        if transition.is_noop(self.phase) {
            debug!(%milestone, phase = %self.phase, "milestone has no effect");
        }
        self.apply(transition, true)
    }

    #[allow(clippy::cognitive_complexity)]
    fn apply(&mut self, t: Transition, already_running: bool) -> Result<Step, ManagerError> {
        if t.dump_stats {
            self.sim.dump_statistics();
            self.counters.record_dump();
            metrics::record_stats_dump();
            self.events.emit(Event::StatsDumped {
                timestamp: Utc::now(),
                tick: self.sim.current_tick(),
                phase: self.phase.to_string(),
            });
        }

        match t.exit_region {
            Some(RegionExit::Counted | RegionExit::Uncounted) => {
                let counted = t.exit_region == Some(RegionExit::Counted);
                if let Some(ticks) = self.counters.exit_region(self.sim.current_tick()) {
                    if counted {
                        self.counters.complete_region();
                    } else {
                        self.counters.mark_last_uncounted();
                    }
                    info!(
                        ticks,
                        counted,
                        completed = self.counters.completed_regions(),
                        "region of interest closed"
                    );
                    metrics::record_region(ticks, counted);
                    self.events.emit(Event::RegionCompleted {
                        timestamp: Utc::now(),
                        ticks,
                        counted,
                        completed_regions: self.counters.completed_regions(),
                    });
                }
            }
            Some(RegionExit::Discarded) => {
                if let Some(start) = self.counters.discard_region() {
                    debug!(start, "discarding in-flight region");
                }
            }
            None => {}
        }
        if t.reset_region_count {
            self.counters.reset_region_count();
        }

        if t.reset_stats {
            self.sim.reset_statistics();
        }

        if t.enter_region {
            self.counters.enter_region(self.sim.current_tick());
        }

        if t.switch_model {
            self.sim.switch_execution_model();
            info!(model = %self.sim.execution_model(), "switched execution model");
        }

        if t.reset_after_switch {
            self.sim.reset_statistics();
        }

        if let Some(target) = &t.checkpoint {
            let tick = self.sim.current_tick();
            let path = target.resolve(tick);
            self.sim
                .create_checkpoint(&path)
                .map_err(|source| ManagerError::Checkpoint {
                    path: path.clone(),
                    source,
                })?;
            info!(tick, path = %path.display(), "checkpoint created");
            self.counters.record_checkpoint(&path);
            metrics::record_checkpoint();
            self.events.emit(Event::CheckpointCreated {
                timestamp: Utc::now(),
                tick,
                path: path.display().to_string(),
            });
        }

        if let Some(count) = t.schedule {
            self.sim
                .schedule_instruction_count_target(count, CoreSelector::Core0Only, already_running);
        }

        self.commit(t.next_phase);

        if t.continuation == Continuation::Terminate {
            self.terminated = true;
            info!(
                tick = self.sim.current_tick(),
                regions = self.counters.completed_regions(),
                "manager requested termination"
            );
        }

        Ok(Step {
            continuation: t.continuation,
            exhausted: t.exhausted,
        })
    }

    fn commit(&mut self, next: Phase) {
        if next == self.phase {
            return;
        }
        let previous = self.phase;
        let elapsed = self.counters.restart_phase_clock();
        self.phase = next;

        info!(
            from = %previous,
            to = %next,
            tick = self.sim.current_tick(),
            elapsed = %humantime::format_duration(elapsed),
            "phase transition"
        );
        metrics::record_phase_transition(previous, next);
        metrics::set_current_phase(next, Some(previous));
        self.events.emit(Event::PhaseEntered {
            timestamp: Utc::now(),
            from: previous.to_string(),
            to: next.to_string(),
            tick: self.sim.current_tick(),
        });
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Counters accumulated so far.
    #[must_use]
    pub const fn counters(&self) -> &RunCounters {
        &self.counters
    }

    /// Active policy.
    #[must_use]
    pub const fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Whether a transition has terminated the run.
    #[must_use]
    pub const fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Total ticks spent inside regions of interest.
    #[must_use]
    pub const fn total_region_ticks(&self) -> u64 {
        self.counters.cumulative_region_ticks()
    }

    /// Simulator capability.
    #[must_use]
    pub const fn simulator(&self) -> &S {
        &self.sim
    }

    /// Simulator capability, mutably. Used to advance the simulation.
    pub const fn simulator_mut(&mut self) -> &mut S {
        &mut self.sim
    }

    /// Consumes the engine and returns the simulator.
    #[must_use]
    pub fn into_simulator(self) -> S {
        self.sim
    }
}
