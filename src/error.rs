//! Error types for `roisampler`
//!
//! Configuration problems are detected before a run starts and are always
//! fatal. Once a run is underway the only fatal condition is a failed
//! checkpoint write; everything else ends through a terminate continuation.

use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Exit Codes
// ============================================================================

/// Process exit codes for the `roisampler` CLI.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Configuration error (invalid YAML, validation failure, unsupported combination)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, checkpoint directory not writable)
    pub const IO_ERROR: i32 = 3;

    /// Manager error (handler misuse during a run)
    pub const MANAGER_ERROR: i32 = 5;

    /// Usage error (invalid arguments, missing required options)
    pub const USAGE_ERROR: i32 = 64;

    /// Interrupted by SIGINT (Ctrl+C)
    pub const INTERRUPTED: i32 = 130;

    /// Terminated by SIGTERM
    pub const TERMINATED: i32 = 143;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `roisampler` operations.
#[derive(Debug, Error)]
pub enum RoiSamplerError {
    /// Configuration loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Event manager error raised while a run is in progress
    #[error(transparent)]
    Manager(#[from] ManagerError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl RoiSamplerError {
    /// Returns the process exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Json(_) | Self::Yaml(_) => ExitCode::CONFIG_ERROR,
            Self::Manager(ManagerError::Checkpoint { .. } | ManagerError::OutputDir { .. })
            | Self::Io(_) => ExitCode::IO_ERROR,
            Self::Manager(_) => ExitCode::MANAGER_ERROR,
        }
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// YAML parsing failed
    #[error("parse error in {path}: {message}")]
    ParseError {
        /// Path to the configuration file
        path: PathBuf,
        /// Line number where the error occurred (if available)
        line: Option<usize>,
        /// Error message from the parser
        message: String,
    },

    /// Configuration validation failed
    #[error("validation failed for {path}: {}", summarize(errors))]
    ValidationError {
        /// Path to the configuration file (or `<inline>` for programmatic configs)
        path: String,
        /// List of validation issues found
        errors: Vec<ValidationIssue>,
    },

    /// Referenced configuration file not found
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },

    /// Field has an invalid value
    #[error("invalid value for '{field}': got '{value}', expected {expected}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The actual value provided
        value: String,
        /// Description of what was expected
        expected: String,
    },

    /// Environment variable referenced in configuration is not set
    #[error("environment variable '{var}' not set (referenced at {location})")]
    EnvVarNotSet {
        /// Name of the environment variable
        var: String,
        /// Location in the configuration where it was referenced
        location: String,
    },

    /// Manager cannot be used with the configured workload or processor
    #[error("unsupported combination for {manager} manager: {reason}")]
    UnsupportedCombination {
        /// Manager kind name
        manager: String,
        /// Why the combination cannot run
        reason: String,
    },
}

fn summarize(errors: &[ValidationIssue]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// ============================================================================
// Validation Types
// ============================================================================

/// A single validation issue found during configuration validation.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Path to the problematic field (e.g., "manager.roi")
    pub path: String,
    /// Description of the validation issue
    pub message: String,
    /// Severity level of the issue
    pub severity: Severity,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {} at {}", prefix, self.message, self.path)
    }
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Validation failure that prevents the configuration from being used
    Error,
    /// Potential issue that does not prevent the configuration from loading
    Warning,
}

// ============================================================================
// Manager Errors
// ============================================================================

/// Errors raised while a manager is driving a run.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// The simulator could not create a checkpoint
    #[error("failed to create checkpoint at {}: {source}", path.display())]
    Checkpoint {
        /// Target checkpoint path
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// The checkpoint output directory could not be created
    #[error("cannot create checkpoint directory {}: {source}", path.display())]
    OutputDir {
        /// Directory that could not be created
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// `run()` was called before the pre-run initialization step
    #[error("run controller was not initialized before run()")]
    NotInitialized,

    /// `initialize()` was called twice
    #[error("run controller is already initialized")]
    AlreadyInitialized,

    /// `run()` was called on a controller whose run already ended
    #[error("run has already finished")]
    AlreadyFinished,
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Result type alias for `roisampler` operations.
pub type Result<T> = std::result::Result<T, RoiSamplerError>;

// ============================================================================
// Tests
// ============================================================================
