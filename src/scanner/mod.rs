//! Scan orchestration.
//!
//! [`ScanController`] ties the pipeline together:
//!
//! ```text
//!            start()                 camera granted
//!   Idle ──────────────► Requesting ──────────────► Scanning ◄──────┐
//!    ▲                   Permission                    │            │
//!    │ stop()                 │ denied/busy/missing    │ code read  │ failed
//!    │                        ▼                        ▼            │ verification
//!    └──────────────────── Error(kind) ◄──────── Processing ────────┘
//!                                                      │ verified
//!                                                      ▼
//!                                                   Success
//! ```
//!
//! Every state returns to `Idle` on `stop()`, and the camera is released
//! on every path out of an attempt.

mod callbacks;
mod config;
mod controller;
mod guard;
mod state;
mod stats;

pub use callbacks::ScanCallbacks;
pub use config::{
    CameraConfig, ConfigError, OutputConfig, SamplingConfig, ScannerConfig, VerificationConfig,
};
pub use controller::{ScanController, ScanControllerBuilder};
pub use guard::RescanGuard;
pub use state::{ErrorKind, ScanResult, ScannerState};
pub use stats::ScanStats;
