//! Configuration loading, schema, and validation
//!
//! Run configurations are YAML files with a `manager` section selecting the
//! event manager and an optional scripted `workload` section.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{ConfigLimits, ConfigLoader, LoadResult, LoadWarning, LoaderOptions};
pub use schema::{InstructionCount, ManagerConfig, ManagerKind, RunConfig, WorkloadScript};
pub use validation::{ValidationResult, Validator, check_supported};
