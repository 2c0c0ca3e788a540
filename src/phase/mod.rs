//! Phase state machine
//!
//! Phases, run counters, transition descriptors, and the engine that
//! applies them to a simulator.

pub mod engine;
pub mod state;
pub mod transition;

pub use engine::{PhaseEngine, Step};
pub use state::{Phase, RunCounters};
pub use transition::{CheckpointTarget, Continuation, RegionExit, Transition};
