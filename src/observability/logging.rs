//! Logging setup.
//!
//! Two thresholds apply: one for events under this crate's target and a
//! stricter one for everything else. At the default verbosity the manager's
//! progress (phase changes, region closes, checkpoints) is visible while
//! dependencies stay at `warn`. `ROISAMPLER_LOG_LEVEL` replaces both with a
//! full `EnvFilter` directive.

use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;

use crate::cli::args::ColorChoice;

/// Environment variable that overrides the verbosity flags.
pub const LOG_LEVEL_ENV: &str = "ROISAMPLER_LOG_LEVEL";

/// Target prefix of every event this crate emits.
const CRATE_TARGET: &str = env!("CARGO_CRATE_NAME");

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable, optionally colored
    #[default]
    Human,
    /// Newline-delimited JSON
    Json,
}

/// Level for this crate's own events.
const fn crate_level(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Level for dependencies. Trails the crate level by two steps.
const fn dependency_level(verbosity: u8) -> &'static str {
    match verbosity {
        0 | 1 => "warn",
        2 => "info",
        3 => "debug",
        _ => "trace",
    }
}

/// Filter directive used when `ROISAMPLER_LOG_LEVEL` is unset.
#[must_use]
pub fn default_directive(verbosity: u8) -> String {
    format!(
        "{},{CRATE_TARGET}={}",
        dependency_level(verbosity),
        crate_level(verbosity)
    )
}

fn ansi_enabled(color: ColorChoice) -> bool {
    match color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => {
            std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
        }
    }
}

/// Installs the global subscriber, writing to stderr.
///
/// Calling it again is a no-op.
pub fn init_logging(format: LogFormat, verbosity: u8, color: ColorChoice) {
    let filter = EnvFilter::try_from_env(LOG_LEVEL_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    // targets only matter once dependency output is mixed in
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbosity >= 2)
        .with_writer(std::io::stderr);

    let _ = match format {
        LogFormat::Human => builder.with_ansi(ansi_enabled(color)).try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
