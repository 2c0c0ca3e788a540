//! `run` command
//!
//! Loads a configuration, builds the manager and a scripted simulator from
//! its `workload` section, drives the run to completion and prints the
//! report.

use std::path::Path;
use std::sync::Arc;

use crate::cli::args::{OutputFormat, RunArgs};
use crate::config::{ConfigLoader, LoadWarning, check_supported};
use crate::controller::{RunController, RunReport};
use crate::error::{ConfigError, RoiSamplerError};
use crate::observability::{EventEmitter, init_metrics};
use crate::sim::ScriptedSimulator;

/// Path that selects stderr for the event stream.
const STDERR_PATH: &str = "-";

/// Drive the configured manager against the scripted workload.
///
/// # Errors
///
/// Returns a config error for an invalid or unsupported configuration,
/// or an I/O error if a checkpoint or the event file cannot be written.
pub async fn run(args: &RunArgs, quiet: bool) -> Result<(), RoiSamplerError> {
    if let Some(port) = args.metrics_port {
        init_metrics(Some(port))?;
        tracing::info!(port, "Prometheus metrics endpoint started");
    }

    tracing::info!(config = %args.config.display(), "loading configuration");
    let load_result = ConfigLoader::with_defaults().load(&args.config)?;
    log_warnings(&load_result.warnings);

    let config = load_result.config;
    let Some(workload) = config.workload.as_ref() else {
        return Err(ConfigError::InvalidValue {
            field: "workload".to_string(),
            value: "<missing>".to_string(),
            expected: "a workload section describing the milestones to replay".to_string(),
        }
        .into());
    };
    check_supported(&config.manager, workload)?;

    let events = Arc::new(open_event_stream(args.events_file.as_deref())?);
    let mut controller =
        RunController::from_config(ScriptedSimulator::new(workload), &config.manager, events)?;

    // the run loop is synchronous
    let report = tokio::task::spawn_blocking(move || -> Result<RunReport, RoiSamplerError> {
        controller.initialize()?;
        controller.run()
    })
    .await
    .map_err(|e| RoiSamplerError::Io(std::io::Error::other(e)))??;

    print_report(&report, args.format, quiet)
}

fn log_warnings(warnings: &[LoadWarning]) {
    for warning in warnings {
        tracing::warn!(
            location = warning.location.as_deref().unwrap_or("<unknown>"),
            "{}",
            warning.message
        );
    }
}

fn open_event_stream(path: Option<&Path>) -> Result<EventEmitter, RoiSamplerError> {
    match path {
        None => Ok(EventEmitter::noop()),
        Some(p) if p.as_os_str() == STDERR_PATH => Ok(EventEmitter::stderr()),
        Some(p) => Ok(EventEmitter::from_file(p)?),
    }
}

fn print_report(
    report: &RunReport,
    format: OutputFormat,
    quiet: bool,
) -> Result<(), RoiSamplerError> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Human if !quiet => print!("{}", report.render_human()),
        OutputFormat::Human => {}
    }
    Ok(())
}
