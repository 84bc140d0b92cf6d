//! Camera session management.
//!
//! This module owns everything that touches capture hardware:
//! device enumeration, preference resolution, acquiring and releasing
//! streams, and switching between front and back cameras. Platform
//! specifics sit behind [`CameraBackend`] so the rest of the pipeline
//! can run against [`MockBackend`] in tests.

mod backend;
mod device;
mod frame;
mod manager;
mod mock;
#[cfg(feature = "camera")]
mod native;
mod session;

pub use backend::{
    CameraBackend, DeviceConstraint, PlatformError, Resolution, StreamRequest, VideoStream,
};
pub use device::{CameraDevice, DevicePreference, FacingHint};
pub use frame::FrameBuffer;
pub use manager::{CameraError, CameraSessionManager};
pub use mock::{MockBackend, MockStream, StreamProbe};
#[cfg(feature = "camera")]
pub use native::{NativeBackend, NativeStream};
pub use session::CaptureSession;
