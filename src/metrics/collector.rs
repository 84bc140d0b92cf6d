//! Metrics collection and registry.

use crate::scanner::{ScanStats, ScannerState};
use prometheus::{Encoder, IntCounter, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

const STATES: [&str; 6] = [
    "idle",
    "requesting_permission",
    "scanning",
    "processing",
    "success",
    "error",
];

pub(crate) fn state_label(state: ScannerState) -> &'static str {
    match state {
        ScannerState::Idle => "idle",
        ScannerState::RequestingPermission => "requesting_permission",
        ScannerState::Scanning => "scanning",
        ScannerState::Processing => "processing",
        ScannerState::Success => "success",
        ScannerState::Error(_) => "error",
    }
}

/// A snapshot of scanner state for metrics update.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    /// Current controller state.
    pub state: ScannerState,
    /// Lifetime counters.
    pub stats: ScanStats,
}

impl MetricsSnapshot {
    /// Creates a snapshot from a state and its counters.
    pub fn new(state: ScannerState, stats: ScanStats) -> Self {
        Self { state, stats }
    }
}

/// Prometheus metrics registry for the scan pipeline.
pub struct MetricsRegistry {
    registry: Registry,

    // Controller
    state: IntGaugeVec,
    attempts_total: IntCounter,
    errors_total: IntCounter,

    // Camera
    session_open: IntGauge,
    sessions_opened_total: IntCounter,
    camera_switches_total: IntCounter,

    // Sampling and decoding
    frames_sampled_total: IntCounter,
    frames_skipped_total: IntCounter,
    decode_hits_total: IntCounter,
    decode_failures_total: IntCounter,
    suppressed_hits_total: IntCounter,
    invalid_payloads_total: IntCounter,

    // Verification
    verifications_total: IntCounter,
    verified_total: IntCounter,
    verification_failures_total: IntCounter,
    verification_timeouts_total: IntCounter,
}

fn counter(registry: &Registry, name: &str, help: &str) -> Result<IntCounter, MetricsError> {
    let counter = IntCounter::new(name, help)?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

/// Raises a counter to `target`; counters never go down.
fn advance(counter: &IntCounter, target: u64) {
    let current = counter.get();
    if target > current {
        counter.inc_by(target - current);
    }
}

impl MetricsRegistry {
    /// Creates a new registry with every scanner metric registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let state = IntGaugeVec::new(
            Opts::new(
                "status_scanner_state",
                "Current controller state (1 for the active state, 0 otherwise)",
            ),
            &["state"],
        )?;
        registry.register(Box::new(state.clone()))?;
        for label in STATES {
            state.with_label_values(&[label]).set(0);
        }

        let session_open = IntGauge::new(
            "status_scanner_camera_session_open",
            "Whether a capture session is open (1=open, 0=released)",
        )?;
        registry.register(Box::new(session_open.clone()))?;

        Ok(Self {
            attempts_total: counter(
                &registry,
                "status_scanner_attempts_total",
                "Scan attempts started",
            )?,
            errors_total: counter(
                &registry,
                "status_scanner_errors_total",
                "Errors reported to the host",
            )?,
            sessions_opened_total: counter(
                &registry,
                "status_scanner_camera_sessions_opened_total",
                "Capture sessions opened",
            )?,
            camera_switches_total: counter(
                &registry,
                "status_scanner_camera_switches_total",
                "Camera switches performed",
            )?,
            frames_sampled_total: counter(
                &registry,
                "status_scanner_frames_sampled_total",
                "Frames sampled and decoded",
            )?,
            frames_skipped_total: counter(
                &registry,
                "status_scanner_frames_skipped_total",
                "Sampling ticks skipped because no frame was ready",
            )?,
            decode_hits_total: counter(
                &registry,
                "status_scanner_decode_hits_total",
                "Frames in which a QR code was decoded",
            )?,
            decode_failures_total: counter(
                &registry,
                "status_scanner_decode_failures_total",
                "Frames the decoder failed on",
            )?,
            suppressed_hits_total: counter(
                &registry,
                "status_scanner_suppressed_hits_total",
                "Decoded codes ignored during the rescan cooldown",
            )?,
            invalid_payloads_total: counter(
                &registry,
                "status_scanner_invalid_payloads_total",
                "Decoded codes that were not teacher codes",
            )?,
            verifications_total: counter(
                &registry,
                "status_scanner_verifications_total",
                "Verification calls issued",
            )?,
            verified_total: counter(
                &registry,
                "status_scanner_verified_total",
                "Successful verifications",
            )?,
            verification_failures_total: counter(
                &registry,
                "status_scanner_verification_failures_total",
                "Failed verifications, timeouts included",
            )?,
            verification_timeouts_total: counter(
                &registry,
                "status_scanner_verification_timeouts_total",
                "Verifications abandoned after the deadline",
            )?,
            registry,
            state,
            session_open,
        })
    }

    /// Updates all metrics from a snapshot.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        let active = state_label(snapshot.state);
        for label in STATES {
            self.state
                .with_label_values(&[label])
                .set(i64::from(label == active));
        }

        let stats = &snapshot.stats;
        self.session_open.set(i64::from(stats.session_open));

        advance(&self.attempts_total, stats.attempts);
        advance(&self.errors_total, stats.errors_reported);
        advance(&self.sessions_opened_total, stats.sessions_opened);
        advance(&self.camera_switches_total, stats.camera_switches);
        advance(&self.frames_sampled_total, stats.frames_sampled);
        advance(&self.frames_skipped_total, stats.frames_skipped);
        advance(&self.decode_hits_total, stats.decode_hits);
        advance(&self.decode_failures_total, stats.decode_failures);
        advance(&self.suppressed_hits_total, stats.suppressed_hits);
        advance(&self.invalid_payloads_total, stats.invalid_payloads);
        advance(&self.verifications_total, stats.verifications);
        advance(&self.verified_total, stats.verified);
        advance(&self.verification_failures_total, stats.verification_failures);
        advance(&self.verification_timeouts_total, stats.verification_timeouts);
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
