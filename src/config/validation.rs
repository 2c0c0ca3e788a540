//! Configuration validation
//!
//! Semantic checks on a deserialized [`RunConfig`]. Validation collects
//! every issue instead of stopping at the first one, so a user fixing a
//! sampling configuration sees all bad intervals at once.
//!
//! Manager constructors run the same manager checks, which keeps
//! programmatically built configurations under identical rules.

use crate::config::loader::ConfigLimits;
use crate::config::schema::{
    InstructionCount, ManagerConfig, ManagerKind, PostBootCheckpointConfig, ProcessorKind,
    RestoreCheckpointConfig, RunConfig, SamplingConfig, TakeCheckpointsConfig, WorkloadScript,
};
use crate::error::{ConfigError, Severity, ValidationIssue};
use crate::sim::MilestoneKind;

// ============================================================================
// Public API
// ============================================================================

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Validation errors (prevent loading).
    pub errors: Vec<ValidationIssue>,

    /// Validation warnings (informational).
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Returns `true` if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns `true` if validation passed (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Converts a failed result into a [`ConfigError::ValidationError`].
    ///
    /// # Errors
    ///
    /// Returns the collected errors when any are present.
    pub fn into_result(self, path: &str) -> Result<Vec<ValidationIssue>, ConfigError> {
        if self.errors.is_empty() {
            Ok(self.warnings)
        } else {
            Err(ConfigError::ValidationError {
                path: path.to_string(),
                errors: self.errors,
            })
        }
    }
}

/// Configuration validator.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Validator {
    /// Creates a new validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a whole configuration file and returns the result.
    pub fn validate(&mut self, config: &RunConfig, limits: &ConfigLimits) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();

        self.check_manager(&config.manager);
        if let Some(workload) = &config.workload {
            self.check_workload(workload, limits);
        }

        self.finish()
    }

    /// Validates only a manager section.
    pub fn validate_manager(&mut self, manager: &ManagerConfig) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();
        self.check_manager(manager);
        self.finish()
    }

    fn finish(&mut self) -> ValidationResult {
        ValidationResult {
            errors: std::mem::take(&mut self.errors),
            warnings: std::mem::take(&mut self.warnings),
        }
    }

    // ========================================================================
    // Manager Validation
    // ========================================================================

    fn check_manager(&mut self, manager: &ManagerConfig) {
        match manager {
            ManagerConfig::Sampling(sampling) => self.check_sampling(sampling),
            ManagerConfig::SimpleRoi => {}
            ManagerConfig::TakeCheckpoints(take) => self.check_take_checkpoints(take),
            ManagerConfig::RestoreCheckpoint(restore) => self.check_restore(restore),
            ManagerConfig::PostBootCheckpoint(boot) => self.check_post_boot(boot),
        }
    }

    fn check_sampling(&mut self, config: &SamplingConfig) {
        self.require_non_negative(config.fast_forward, "manager.fast_forward", "FF interval");
        self.require_non_negative(config.warmup, "manager.warmup", "WARMUP interval");
        self.require_positive(config.roi, "manager.roi", "ROI length");

        if let Some(init_ff) = config.initial_fast_forward {
            self.require_positive(init_ff, "manager.initial_fast_forward", "INIT_FF interval");
        }

        match config.max_regions {
            Some(max) if max < 1 => {
                self.add_error("manager.max_regions", "MAX_ROIS must be positive");
            }
            Some(max) if u32::try_from(max).is_err() => {
                self.add_error("manager.max_regions", "MAX_ROIS is too large");
            }
            None if config.continue_after_max => {
                self.add_warning(
                    "manager.continue_after_max",
                    "continue_after_max has no effect without max_regions",
                );
            }
            _ => {}
        }

        if config.fast_forward.get() == 0 && config.warmup.get() == 0 {
            self.add_warning(
                "manager",
                "fast_forward and warmup are both zero; regions will run back to back",
            );
        }
    }

    fn check_take_checkpoints(&mut self, config: &TakeCheckpointsConfig) {
        self.require_positive(config.interval, "manager.interval", "INTERVAL");

        if config.checkpoints_dir.as_os_str().is_empty() {
            self.add_error(
                "manager.checkpoints_dir",
                "Checkpoint directory cannot be empty",
            );
        }

        if let Some(max) = config.max_checkpoints {
            if max < 1 {
                self.add_error("manager.max_checkpoints", "MAX_CHECKPOINTS must be positive");
            } else if u32::try_from(max).is_err() {
                self.add_error("manager.max_checkpoints", "MAX_CHECKPOINTS is too large");
            }
        }
    }

    fn check_restore(&mut self, config: &RestoreCheckpointConfig) {
        self.require_non_negative(config.warmup, "manager.warmup", "WARMUP");
        self.require_non_negative(config.roi, "manager.roi", "ROI");

        if config.roi.get() == 0 {
            self.add_warning(
                "manager.roi",
                "ROI is zero; the region runs until the workload ends",
            );
        }
    }

    fn check_post_boot(&mut self, config: &PostBootCheckpointConfig) {
        if config.checkpoint_dir.as_os_str().is_empty() {
            self.add_error(
                "manager.checkpoint_dir",
                "Checkpoint directory cannot be empty",
            );
        }
    }

    // ========================================================================
    // Workload Validation
    // ========================================================================

    fn check_workload(&mut self, workload: &WorkloadScript, limits: &ConfigLimits) {
        self.require_positive(
            workload.total_instructions,
            "workload.total_instructions",
            "Total instruction count",
        );

        if workload.ticks_per_instruction.fast == 0 {
            self.add_error(
                "workload.ticks_per_instruction.fast",
                "Ticks per instruction must be positive",
            );
        }
        if workload.ticks_per_instruction.detailed == 0 {
            self.add_error(
                "workload.ticks_per_instruction.detailed",
                "Ticks per instruction must be positive",
            );
        }

        if workload.milestones.len() > limits.max_milestones {
            self.add_error(
                "workload.milestones",
                &format!(
                    "Too many scripted milestones: {} (max {})",
                    workload.milestones.len(),
                    limits.max_milestones
                ),
            );
        }

        let mut previous: Option<i64> = None;
        let mut unsorted = false;
        for (i, milestone) in workload.milestones.iter().enumerate() {
            let path = format!("workload.milestones[{i}]");

            if milestone.kind == MilestoneKind::MaxInsts {
                self.add_error(
                    &format!("{path}.kind"),
                    "max_insts milestones are raised by scheduled targets, not scripted",
                );
            }
            if milestone.at.get() < 0 {
                self.add_error(&format!("{path}.at"), "Milestone position cannot be negative");
            } else if milestone.at > workload.total_instructions {
                self.add_warning(
                    &format!("{path}.at"),
                    "Milestone lies beyond total_instructions and will never be raised",
                );
            }
            if previous.is_some_and(|p| p > milestone.at.get()) {
                unsorted = true;
            }
            previous = Some(milestone.at.get());
        }

        if unsorted {
            self.add_warning(
                "workload.milestones",
                "Milestones are not in instruction order; they will be sorted",
            );
        }
    }

    // ========================================================================
    // Helper Methods
    // ========================================================================

    fn require_non_negative(&mut self, value: InstructionCount, path: &str, label: &str) {
        if value.get() < 0 {
            self.add_error(path, &format!("{label} cannot be negative"));
        }
    }

    fn require_positive(&mut self, value: InstructionCount, path: &str, label: &str) {
        if value.get() < 1 {
            self.add_error(path, &format!("{label} must be positive"));
        }
    }

    /// Adds an error to the collection.
    fn add_error(&mut self, path: &str, message: &str) {
        self.errors.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Error,
        });
    }

    /// Adds a warning to the collection.
    fn add_warning(&mut self, path: &str, message: &str) {
        self.warnings.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Warning,
        });
    }
}

// ============================================================================
// Combination Checks
// ============================================================================

/// Rejects manager/workload pairings that cannot run.
///
/// - Managers that switch execution models need a switchable processor.
/// - A manager's activating milestone must occur in the scripted workload.
///
/// # Errors
///
/// Returns [`ConfigError::UnsupportedCombination`] for the first problem.
pub fn check_supported(
    manager: &ManagerConfig,
    workload: &WorkloadScript,
) -> Result<(), ConfigError> {
    let kind = manager.kind();

    if kind.switches_models() && workload.processor == ProcessorKind::Fixed {
        return Err(unsupported(
            kind,
            "this manager switches execution models but the processor is fixed",
        ));
    }

    let activating = match kind {
        ManagerKind::Sampling | ManagerKind::SimpleRoi | ManagerKind::TakeCheckpoints => {
            Some(MilestoneKind::WorkBegin)
        }
        ManagerKind::PostBootCheckpoint => Some(MilestoneKind::Checkpoint),
        ManagerKind::RestoreCheckpoint => None,
    };

    if let Some(required) = activating {
        let reachable = workload
            .milestones
            .iter()
            .any(|m| m.kind == required && m.at <= workload.total_instructions);
        if !reachable {
            return Err(unsupported(
                kind,
                &format!("the workload never raises a {required} milestone"),
            ));
        }
    }

    Ok(())
}

fn unsupported(kind: ManagerKind, reason: &str) -> ConfigError {
    ConfigError::UnsupportedCombination {
        manager: kind.to_string(),
        reason: reason.to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================
