//! Prometheus metrics for the scan pipeline.
//!
//! [`MetricsRegistry`] is always available. The HTTP exporter needs the
//! `metrics` feature.
//!
//! # Metrics Exposed
//!
//! ## Controller
//! - `status_scanner_state{state}` - 1 for the current state, 0 for the others
//! - `status_scanner_attempts_total` - Scan attempts started
//! - `status_scanner_errors_total` - Errors reported to the host
//!
//! ## Camera
//! - `status_scanner_camera_session_open` - Whether a capture session is open
//! - `status_scanner_camera_sessions_opened_total` - Sessions opened
//! - `status_scanner_camera_switches_total` - Camera switches
//!
//! ## Sampling and decoding
//! - `status_scanner_frames_sampled_total`, `status_scanner_frames_skipped_total`
//! - `status_scanner_decode_hits_total`, `status_scanner_decode_failures_total`
//! - `status_scanner_suppressed_hits_total`, `status_scanner_invalid_payloads_total`
//!
//! ## Verification
//! - `status_scanner_verifications_total` - Calls issued
//! - `status_scanner_verified_total` - Successes
//! - `status_scanner_verification_failures_total` - Failures, timeouts included
//! - `status_scanner_verification_timeouts_total` - Timeouts
//!
//! # Example
//!
//! ```no_run
//! use status_scanner::metrics::{MetricsRegistry, MetricsSnapshot};
//! use status_scanner::{ScanStats, ScannerState};
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//!
//! let stats = ScanStats {
//!     attempts: 1,
//!     session_open: true,
//!     frames_sampled: 12,
//!     ..ScanStats::default()
//! };
//! registry.update(&MetricsSnapshot::new(ScannerState::Scanning, stats));
//!
//! println!("{}", registry.encode().unwrap());
//! ```

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, MetricsServerConfig, MetricsState, ServerError};
