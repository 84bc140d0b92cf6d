//! Platform camera abstraction.
//!
//! The session manager is the only component that talks to a
//! [`CameraBackend`]. Implementations exist for native devices
//! (behind the `camera` feature) and for tests.

use super::{CameraDevice, FacingHint, FrameBuffer};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failures reported by the platform camera layer.
///
/// Mirrors the error names media-device APIs use, so every backend
/// can translate into one taxonomy before the manager classifies it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error("camera access was not allowed: {0}")]
    NotAllowed(String),
    #[error("camera access blocked by security policy: {0}")]
    Security(String),
    #[error("camera could not be read (in use by another application?): {0}")]
    NotReadable(String),
    #[error("camera start was aborted: {0}")]
    Aborted(String),
    #[error("no camera matches the request: {0}")]
    NotFound(String),
    #[error("camera constraints cannot be satisfied: {0}")]
    Overconstrained(String),
    #[error("camera platform error: {0}")]
    Other(String),
}

/// Negotiated or requested stream resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Resolution {
    /// Creates a resolution.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns true if either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Which device the platform should open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceConstraint {
    /// Exactly this device.
    Exact(String),
    /// Let the platform pick a camera facing this side.
    Facing(FacingHint),
    /// Any available camera.
    Any,
}

/// A request to acquire a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    /// Device selection.
    pub device: DeviceConstraint,
    /// Ideal resolution; the platform may negotiate something else.
    pub resolution: Resolution,
}

/// An open video stream.
pub trait VideoStream {
    /// Identifier of the device this stream was opened on.
    fn device_id(&self) -> &str;

    /// Current frame dimensions. Zero until the stream delivers frames.
    fn dimensions(&self) -> Resolution;

    /// Reads the current frame.
    fn read_frame(&mut self) -> Result<FrameBuffer, PlatformError>;

    /// Stops all tracks. Must be safe to call more than once.
    fn stop(&mut self);
}

/// Platform camera implementation.
pub trait CameraBackend {
    /// Stream type produced by [`CameraBackend::acquire`].
    type Stream: VideoStream;

    /// Enumerates capture devices.
    fn enumerate(&mut self) -> Result<Vec<CameraDevice>, PlatformError>;

    /// Acquires a stream. This is where permission prompts happen.
    fn acquire(&mut self, request: &StreamRequest) -> Result<Self::Stream, PlatformError>;
}
