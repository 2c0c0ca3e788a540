//! Resumable milestone handlers
//!
//! Each registered milestone kind gets one handler object. A handler is
//! resumed once per milestone of its kind, runs to completion, and yields a
//! [`Continuation`]. Once its policy reports it exhausted it stays
//! finished and further milestones of that kind are dropped.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::ManagerError;
use crate::phase::{Continuation, PhaseEngine};
use crate::sim::{MilestoneKind, Simulator};

/// Lifecycle of a resumable handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerCursor {
    /// Never resumed
    Ready,
    /// Resumed at least once and can be resumed again
    Suspended,
    /// Exhausted
    Finished,
}

/// Handler for one milestone kind.
#[derive(Debug, Clone)]
pub struct ResumableHandler {
    kind: MilestoneKind,
    cursor: HandlerCursor,
    resumes: u64,
}

impl ResumableHandler {
    /// Creates a handler in the [`HandlerCursor::Ready`] state.
    #[must_use]
    pub const fn new(kind: MilestoneKind) -> Self {
        Self {
            kind,
            cursor: HandlerCursor::Ready,
            resumes: 0,
        }
    }

    /// Milestone kind served by this handler.
    #[must_use]
    pub const fn kind(&self) -> MilestoneKind {
        self.kind
    }

    /// Current cursor.
    #[must_use]
    pub const fn cursor(&self) -> HandlerCursor {
        self.cursor
    }

    /// Times the handler has run.
    #[must_use]
    pub const fn resumes(&self) -> u64 {
        self.resumes
    }

    /// Runs the handler for one milestone.
    ///
    /// Returns `None` when the handler is already finished.
    ///
    /// # Errors
    ///
    /// Propagates checkpoint failures from the engine.
    pub fn resume<S: Simulator>(
        &mut self,
        engine: &mut PhaseEngine<S>,
    ) -> Result<Option<Continuation>, ManagerError> {
        if self.cursor == HandlerCursor::Finished {
            debug!(kind = %self.kind, "handler finished; dropping milestone");
            return Ok(None);
        }

        let step = engine.handle(self.kind)?;
        self.resumes += 1;
        self.cursor = if step.exhausted {
            HandlerCursor::Finished
        } else {
            HandlerCursor::Suspended
        };
        Ok(Some(step.continuation))
    }
}

/// Map from milestone kind to its handler.
#[derive(Debug, Clone, Default)]
pub struct HandlerTable {
    handlers: BTreeMap<MilestoneKind, ResumableHandler>,
}

impl HandlerTable {
    /// Registers one handler per kind.
    #[must_use]
    pub fn for_kinds(kinds: &[MilestoneKind]) -> Self {
        Self {
            handlers: kinds
                .iter()
                .map(|k| (*k, ResumableHandler::new(*k)))
                .collect(),
        }
    }

    /// Handler registered for `kind`.
    #[must_use]
    pub fn get(&self, kind: MilestoneKind) -> Option<&ResumableHandler> {
        self.handlers.get(&kind)
    }

    /// Registered kinds, in order.
    pub fn kinds(&self) -> impl Iterator<Item = MilestoneKind> + '_ {
        self.handlers.keys().copied()
    }

    /// Resumes the handler for `kind`.
    ///
    /// Returns `None` for unregistered kinds and finished handlers.
    ///
    /// # Errors
    ///
    /// Propagates checkpoint failures from the engine.
    pub fn resume<S: Simulator>(
        &mut self,
        kind: MilestoneKind,
        engine: &mut PhaseEngine<S>,
    ) -> Result<Option<Continuation>, ManagerError> {
        match self.handlers.get_mut(&kind) {
            Some(handler) => handler.resume(engine),
            None => {
                debug!(%kind, "no handler registered; ignoring milestone");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::schema::{
        InstructionCount, PostBootCheckpointConfig, ProcessorKind, TickCosts, WorkloadScript,
    };
    use crate::manager::{Policy, PostBootCheckpointPolicy, SimpleRoiPolicy};
    use crate::observability::EventEmitter;
    use crate::sim::{ExecutionModel, ScriptedSimulator};

    fn sim() -> ScriptedSimulator {
        ScriptedSimulator::new(&WorkloadScript {
            total_instructions: InstructionCount(100),
            processor: ProcessorKind::Switchable,
            initial_model: ExecutionModel::Fast,
            ticks_per_instruction: TickCosts::default(),
            milestones: Vec::new(),
        })
    }

    #[test]
    fn test_table_registers_kinds() {
        let table = HandlerTable::for_kinds(&[MilestoneKind::WorkEnd, MilestoneKind::WorkBegin]);
        let kinds: Vec<_> = table.kinds().collect();
        assert_eq!(kinds, vec![MilestoneKind::WorkBegin, MilestoneKind::WorkEnd]);
        assert_eq!(
            table.get(MilestoneKind::WorkBegin).map(ResumableHandler::cursor),
            Some(HandlerCursor::Ready)
        );
        assert!(table.get(MilestoneKind::MaxInsts).is_none());
    }

    #[test]
    fn test_unregistered_kind_is_ignored() {
        let mut engine = PhaseEngine::new(
            sim(),
            Policy::SimpleRoi(SimpleRoiPolicy::new()),
            Arc::new(EventEmitter::noop()),
        );
        let mut table = HandlerTable::for_kinds(&[MilestoneKind::WorkBegin]);
        assert_eq!(table.resume(MilestoneKind::Checkpoint, &mut engine).unwrap(), None);
    }

    #[test]
    fn test_cursor_moves_to_suspended() {
        let mut engine = PhaseEngine::new(
            sim(),
            Policy::SimpleRoi(SimpleRoiPolicy::new()),
            Arc::new(EventEmitter::noop()),
        );
        let mut handler = ResumableHandler::new(MilestoneKind::WorkBegin);
        let result = handler.resume(&mut engine).unwrap();
        assert_eq!(result, Some(Continuation::Continue));
        assert_eq!(handler.cursor(), HandlerCursor::Suspended);
        assert_eq!(handler.resumes(), 1);
    }

    #[test]
    fn test_exhausted_handler_finishes() {
        let dir = tempfile::tempdir().unwrap();
        let policy = PostBootCheckpointPolicy::new(&PostBootCheckpointConfig {
            checkpoint_dir: dir.path().join("boot"),
        })
        .unwrap();
        let mut engine = PhaseEngine::new(
            sim(),
            Policy::PostBootCheckpoint(policy),
            Arc::new(EventEmitter::noop()),
        );
        let mut handler = ResumableHandler::new(MilestoneKind::Checkpoint);

        assert_eq!(
            handler.resume(&mut engine).unwrap(),
            Some(Continuation::Terminate)
        );
        assert_eq!(handler.cursor(), HandlerCursor::Finished);
        assert_eq!(handler.resume(&mut engine).unwrap(), None);
        assert_eq!(handler.resumes(), 1);
    }
}
