//! Status Scanner Library
//!
//! Camera capture and QR decoding for a teacher availability directory.
//! A student points the camera at a teacher's personal code; the scanner
//! decodes it, checks it against the directory and reports the teacher's
//! current status.
//!
//! # Architecture
//!
//! The system follows an explicit data flow:
//!
//! ```text
//! camera → sampling → decode → scanner → payload
//!                                 ↓
//!                        host callbacks / metrics
//! ```
//!
//! # Design Principles
//!
//! - **One session at a time**: the camera is released on every path out
//!   of an attempt, including errors, cancellation and drop
//! - **First code wins**: a hit stops sampling, so a code held in view
//!   produces exactly one verification call
//! - **Bad frames are not errors**: decoder failures are counted and
//!   treated as misses
//! - **Pluggable edges**: camera backend, symbol decoder and verifier are
//!   traits, with mock implementations for tests
//!
//! # Example
//!
//! ```no_run
//! use status_scanner::{
//!     camera::MockBackend,
//!     decode::FixedDecoder,
//!     payload::{DirectoryVerifier, StructuredPayload},
//!     ScanController, ScanResult,
//! };
//!
//! # async fn demo() {
//! let code = StructuredPayload::new("T-1001").encode();
//! let directory = DirectoryVerifier::from_file("directory.toml").unwrap();
//!
//! let mut scanner = ScanController::builder(
//!     MockBackend::new(),
//!     FixedDecoder::new(code).after(10),
//!     directory,
//! )
//! .on_verified(|status| println!("{}", status))
//! .on_error(|kind, reason| eprintln!("{}: {}", kind, reason))
//! .build();
//!
//! scanner.start().unwrap();
//! while let Some(result) = scanner.next_result().await {
//!     if let ScanResult::Verified(status) = result {
//!         println!("verified {}", status.teacher_id);
//!     }
//! }
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod camera;
pub mod decode;
pub mod metrics;
pub mod payload;
pub mod sampling;
pub mod scanner;

// Re-export commonly used types at crate root
pub use camera::{CameraBackend, CameraDevice, CameraSessionManager, DevicePreference, FacingHint};
pub use decode::{DecodeEngine, QrDecoder, SymbolDecoder};
pub use payload::{StatusVerifier, StructuredPayload, TeacherStatus};
pub use sampling::FrameSampler;
pub use scanner::{ErrorKind, ScanController, ScanResult, ScanStats, ScannerConfig, ScannerState};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
