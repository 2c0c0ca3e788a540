//! Prometheus-compatible run metrics.
//!
//! Recording functions are cheap no-ops until [`init_metrics`] installs a
//! recorder, so the engine records unconditionally.

use std::sync::atomic::{AtomicBool, Ordering};

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::RoiSamplerError;
use crate::phase::Phase;

/// Guard against double-initialization of the metrics recorder.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initializes the global metrics recorder.
///
/// When `port` is `Some`, a Prometheus HTTP listener is started on
/// `127.0.0.1:<port>`. When `None`, the recorder is installed without an
/// HTTP endpoint.
///
/// # Errors
///
/// Returns `RoiSamplerError::Io` if the recorder or listener cannot be
/// installed (e.g. port already in use).
pub fn init_metrics(port: Option<u16>) -> Result<(), RoiSamplerError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(());
    }
    port.map_or_else(
        || PrometheusBuilder::new().install_recorder().map(|_| ()),
        |p| {
            PrometheusBuilder::new()
                .with_http_listener(([127, 0, 0, 1], p))
                .install()
        },
    )
    .map_err(|e| RoiSamplerError::Io(std::io::Error::other(e.to_string())))?;

    describe_metrics();
    Ok(())
}

fn describe_metrics() {
    describe_counter!(
        "roisampler_phase_transitions_total",
        "Total number of committed phase transitions"
    );
    describe_counter!(
        "roisampler_regions_completed_total",
        "Regions of interest closed and accumulated"
    );
    describe_counter!(
        "roisampler_stats_dumps_total",
        "Statistics dumps requested"
    );
    describe_counter!("roisampler_checkpoints_total", "Checkpoints created");
    describe_histogram!(
        "roisampler_region_ticks",
        "Simulated ticks spent in each region of interest"
    );
    describe_gauge!(
        "roisampler_current_phase",
        "Currently active phase (1 = active)"
    );
}

/// Records a committed phase transition.
pub fn record_phase_transition(from: Phase, to: Phase) {
    counter!(
        "roisampler_phase_transitions_total",
        "from" => from.as_str(),
        "to" => to.as_str()
    )
    .increment(1);
}

/// Sets the active phase gauge, zeroing the previous phase's label.
pub fn set_current_phase(phase: Phase, previous: Option<Phase>) {
    if let Some(prev) = previous {
        gauge!("roisampler_current_phase", "phase" => prev.as_str()).set(0.0);
    }
    gauge!("roisampler_current_phase", "phase" => phase.as_str()).set(1.0);
}

/// Records a closed region and its tick delta.
#[allow(clippy::cast_precision_loss)]
pub fn record_region(ticks: u64, counted: bool) {
    counter!(
        "roisampler_regions_completed_total",
        "counted" => if counted { "true" } else { "false" }
    )
    .increment(1);
    histogram!("roisampler_region_ticks").record(ticks as f64);
}

/// Records a statistics dump.
pub fn record_stats_dump() {
    counter!("roisampler_stats_dumps_total").increment(1);
}

/// Records a created checkpoint.
pub fn record_checkpoint() {
    counter!("roisampler_checkpoints_total").increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_functions_do_not_panic_without_recorder() {
        record_phase_transition(Phase::NoWork, Phase::FastForward);
        set_current_phase(Phase::FastForward, Some(Phase::NoWork));
        record_region(1_000, true);
        record_stats_dump();
        record_checkpoint();
    }
}
