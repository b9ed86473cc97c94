//! Phase metrics.
//!
//! [`MetricsObserver`] records phase transitions through the `metrics`
//! facade. [`init_metrics`] installs a Prometheus recorder whose handle
//! renders the text exposition format, e.g. for a node-exporter textfile.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::error::PhaselogError;
use crate::observability::PhaseObserver;
use crate::phase::PhaseId;

/// Installed recorder handle; set once per process.
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Phases started.
pub const PHASES_STARTED: &str = "phaselog_phases_started_total";
/// Phases stopped.
pub const PHASES_STOPPED: &str = "phaselog_phases_stopped_total";
/// Elapsed seconds per stopped phase.
pub const PHASE_DURATION: &str = "phaselog_phase_duration_seconds";

/// Installs the global Prometheus recorder and returns its handle.
///
/// Later calls return the handle installed by the first one.
///
/// # Errors
///
/// Returns `PhaselogError::Io` if another global recorder is already
/// installed.
pub fn init_metrics() -> Result<PrometheusHandle, PhaselogError> {
    if let Some(handle) = METRICS_HANDLE.get() {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(handle.clone());
    }
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| PhaselogError::Io(std::io::Error::other(e.to_string())))?;
    describe_metrics();
    Ok(METRICS_HANDLE.get_or_init(|| handle).clone())
}

/// Registers metric descriptions with the current recorder.
pub fn describe_metrics() {
    describe_counter!(PHASES_STARTED, "Total number of phase starts");
    describe_counter!(PHASES_STOPPED, "Total number of phase stops");
    describe_histogram!(
        PHASE_DURATION,
        metrics::Unit::Seconds,
        "Elapsed time of stopped phases"
    );
}

/// Records phase transitions as metrics labelled by phase id.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsObserver;

impl PhaseObserver for MetricsObserver {
    fn on_phase_started(&self, phase_id: &PhaseId, _start_time: DateTime<Utc>) {
        counter!(PHASES_STARTED, "phase" => phase_id.to_string()).increment(1);
    }

    fn on_phase_stopped(&self, phase_id: &PhaseId, _end_time: DateTime<Utc>, elapsed_seconds: f64) {
        counter!(PHASES_STOPPED, "phase" => phase_id.to_string()).increment(1);
        histogram!(PHASE_DURATION, "phase" => phase_id.to_string()).record(elapsed_seconds);
    }
}
