//! Run controller
//!
//! Owns the phase engine (and through it the simulator) for one run.
//! `initialize` prepares the checkpoint directory and applies the policy's
//! pre-run step; `run` pulls milestones one at a time and resumes the
//! matching handler until a handler terminates or the workload exits.

pub mod handlers;
pub mod report;

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{info, warn};

use crate::config::schema::ManagerConfig;
use crate::error::{ConfigError, ManagerError, RoiSamplerError};
use crate::manager::Policy;
use crate::observability::events::{Event, EventEmitter};
use crate::phase::{Continuation, PhaseEngine};
use crate::sim::Simulator;

pub use handlers::{HandlerCursor, HandlerTable, ResumableHandler};
pub use report::{ExitCause, RunReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Created,
    Initialized,
    Finished,
}

/// Drives one managed run.
#[derive(Debug)]
pub struct RunController<S: Simulator> {
    engine: PhaseEngine<S>,
    handlers: HandlerTable,
    events: Arc<EventEmitter>,
    state: RunState,
    started_at: Option<Instant>,
}

impl<S: Simulator> RunController<S> {
    /// Creates a controller with one handler per milestone kind the
    /// policy handles.
    #[must_use]
    pub fn new(sim: S, policy: Policy, events: Arc<EventEmitter>) -> Self {
        let handlers = HandlerTable::for_kinds(policy.handled_milestones());
        Self {
            engine: PhaseEngine::new(sim, policy, Arc::clone(&events)),
            handlers,
            events,
            state: RunState::Created,
            started_at: None,
        }
    }

    /// Builds the policy for `config` and a controller around it.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a structurally invalid section.
    pub fn from_config(
        sim: S,
        config: &ManagerConfig,
        events: Arc<EventEmitter>,
    ) -> Result<Self, ConfigError> {
        Ok(Self::new(sim, Policy::from_config(config)?, events))
    }

    /// Pre-run step: create the checkpoint directory and apply the
    /// policy's initial transition with `already_running = false`.
    ///
    /// # Errors
    ///
    /// - [`ManagerError::AlreadyInitialized`] when called twice
    /// - [`ManagerError::OutputDir`] if the checkpoint directory cannot be created
    /// - [`ManagerError::Checkpoint`] if an initial checkpoint fails
    pub fn initialize(&mut self) -> Result<(), ManagerError> {
        if self.state != RunState::Created {
            return Err(ManagerError::AlreadyInitialized);
        }

        if let Some(dir) = self.engine.policy().checkpoint_dir() {
            std::fs::create_dir_all(dir).map_err(|source| ManagerError::OutputDir {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let kind = self.engine.policy().kind();
        let tick = self.engine.simulator().current_tick();
        info!(manager = %kind, tick, "run initialized");
        self.events.emit(Event::RunStarted {
            timestamp: Utc::now(),
            manager: kind.to_string(),
            tick,
        });

        self.started_at = Some(Instant::now());
        self.state = RunState::Initialized;

        let step = self.engine.initialize()?;
        if step.continuation == Continuation::Terminate {
            warn!("manager terminated during initialization");
        }
        Ok(())
    }

    /// Drives the milestone loop to the end of the run.
    ///
    /// # Errors
    ///
    /// - [`ManagerError::NotInitialized`] before [`initialize`](Self::initialize)
    /// - [`ManagerError::AlreadyFinished`] on a second call
    /// - [`ManagerError::Checkpoint`] if a checkpoint cannot be written
    pub fn run(&mut self) -> Result<RunReport, RoiSamplerError> {
        match self.state {
            RunState::Created => return Err(ManagerError::NotInitialized.into()),
            RunState::Finished => return Err(ManagerError::AlreadyFinished.into()),
            RunState::Initialized => {}
        }
        self.state = RunState::Finished;

        let exit_cause = if self.engine.is_terminated() {
            ExitCause::Terminated
        } else {
            self.drive()?
        };

        let report = self.report(exit_cause);
        info!(
            exit_cause = exit_cause.as_str(),
            final_tick = report.final_tick,
            regions = report.completed_regions,
            region_ticks = report.cumulative_region_ticks,
            "run finished"
        );
        self.events.emit(Event::RunFinished {
            timestamp: Utc::now(),
            exit_cause: exit_cause.as_str().to_string(),
            final_tick: report.final_tick,
            completed_regions: report.completed_regions,
            cumulative_region_ticks: report.cumulative_region_ticks,
        });
        Ok(report)
    }

    fn drive(&mut self) -> Result<ExitCause, ManagerError> {
        while let Some(milestone) = self.engine.simulator_mut().next_milestone() {
            let continuation = self.handlers.resume(milestone, &mut self.engine)?;
            if continuation == Some(Continuation::Terminate) {
                return Ok(ExitCause::Terminated);
            }
        }
        Ok(ExitCause::WorkloadExited)
    }

    fn report(&self, exit_cause: ExitCause) -> RunReport {
        let counters = self.engine.counters();
        let wall_clock = self.started_at.map(|s| s.elapsed()).unwrap_or_default();
        RunReport {
            manager: self.engine.policy().kind(),
            exit_cause,
            final_tick: self.engine.simulator().current_tick(),
            completed_regions: counters.completed_regions(),
            cumulative_region_ticks: counters.cumulative_region_ticks(),
            region_ticks: counters.region_ticks().to_vec(),
            uncounted_regions: counters.uncounted_regions().to_vec(),
            stats_dumps: counters.stats_dumps(),
            checkpoints: counters.checkpoints().to_vec(),
            wall_clock_ms: u64::try_from(wall_clock.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Total ticks spent inside regions of interest so far.
    #[must_use]
    pub const fn total_region_ticks(&self) -> u64 {
        self.engine.total_region_ticks()
    }

    /// Phase engine.
    #[must_use]
    pub const fn engine(&self) -> &PhaseEngine<S> {
        &self.engine
    }

    /// Handler table.
    #[must_use]
    pub const fn handlers(&self) -> &HandlerTable {
        &self.handlers
    }

    /// Simulator capability.
    #[must_use]
    pub const fn simulator(&self) -> &S {
        self.engine.simulator()
    }

    /// Consumes the controller and returns the simulator.
    #[must_use]
    pub fn into_simulator(self) -> S {
        self.engine.into_simulator()
    }
}
