//! `validate` command
//!
//! Loads every file through the full configuration pipeline and reports
//! all problems at once. A file with a `workload` section is also checked
//! for manager/workload combinations that cannot run.

use std::path::Path;

use serde::Serialize;

use crate::cli::args::{OutputFormat, ValidateArgs};
use crate::config::schema::ManagerKind;
use crate::config::{ConfigLoader, check_supported};
use crate::error::{ConfigError, RoiSamplerError, Severity, ValidationIssue};

/// Validation outcome for one file.
#[derive(Debug, Serialize)]
struct FileReport {
    file: String,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    manager: Option<ManagerKind>,
    errors: Vec<String>,
    warnings: Vec<String>,
}

/// Validate configuration files without running them.
///
/// # Errors
///
/// Returns the first failure after every file has been reported.
pub fn run(args: &ValidateArgs, quiet: bool) -> Result<(), RoiSamplerError> {
    let loader = ConfigLoader::with_defaults();
    let mut reports = Vec::with_capacity(args.files.len());
    let mut first_failure: Option<ConfigError> = None;

    for path in &args.files {
        tracing::info!(file = %path.display(), "validating configuration");
        let (report, failure) = check_file(&loader, path, args.strict);
        if first_failure.is_none() {
            first_failure = failure;
        }
        reports.push(report);
    }

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
        OutputFormat::Human if !quiet => {
            for report in &reports {
                print_human(report);
            }
        }
        OutputFormat::Human => {}
    }

    first_failure.map_or(Ok(()), |e| Err(e.into()))
}

fn check_file(loader: &ConfigLoader, path: &Path, strict: bool) -> (FileReport, Option<ConfigError>) {
    let mut report = FileReport {
        file: path.display().to_string(),
        valid: false,
        manager: None,
        errors: Vec::new(),
        warnings: Vec::new(),
    };

    let loaded = match loader.load(path) {
        Ok(loaded) => loaded,
        Err(err) => {
            report.errors = match &err {
                ConfigError::ValidationError { errors, .. } => {
                    errors.iter().map(ToString::to_string).collect()
                }
                other => vec![other.to_string()],
            };
            return (report, Some(err));
        }
    };

    report.manager = Some(loaded.config.manager.kind());
    report.warnings = loaded
        .warnings
        .iter()
        .map(|w| match &w.location {
            Some(location) => format!("{} at {location}", w.message),
            None => w.message.clone(),
        })
        .collect();

    if let Some(workload) = &loaded.config.workload {
        if let Err(err) = check_supported(&loaded.config.manager, workload) {
            report.errors.push(err.to_string());
            return (report, Some(err));
        }
    }

    if strict && !loaded.warnings.is_empty() {
        let errors = loaded
            .warnings
            .iter()
            .map(|w| ValidationIssue {
                path: w.location.clone().unwrap_or_default(),
                message: w.message.clone(),
                severity: Severity::Error,
            })
            .collect();
        report.errors.clone_from(&report.warnings);
        return (
            report,
            Some(ConfigError::ValidationError {
                path: path.display().to_string(),
                errors,
            }),
        );
    }

    report.valid = true;
    (report, None)
}

fn print_human(report: &FileReport) {
    let status = if report.valid { "ok" } else { "invalid" };
    match report.manager {
        Some(kind) => println!("{status}: {} ({kind})", report.file),
        None => println!("{status}: {}", report.file),
    }
    for error in &report.errors {
        println!("  error: {error}");
    }
    for warning in &report.warnings {
        println!("  warning: {warning}");
    }
}
