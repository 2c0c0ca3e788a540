//! `roisampler` - milestone-driven sampling and checkpoint event manager
//!
//! A simulation raises milestones (instruction-count targets, workload
//! begin/end markers, guest checkpoint requests). An event manager reacts
//! to each one by resetting or dumping statistics, switching between the
//! fast and detailed execution models, writing checkpoints and scheduling
//! the next instruction-count target.
//!
//! The crate is organised as:
//!
//! - [`manager`]: interval policies, one per manager kind
//! - [`phase`]: the phase state machine that applies policy decisions
//! - [`controller`]: handler table and the run loop
//! - [`sim`]: the simulator capability and a scripted implementation
//! - [`config`], [`observability`], [`cli`]: ambient plumbing

pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod manager;
pub mod observability;
pub mod phase;
pub mod sim;
