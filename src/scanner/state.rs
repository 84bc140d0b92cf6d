//! Scanner states, results and the host-facing error taxonomy.

use crate::camera::CameraError;
use crate::payload::{TeacherStatus, VerificationError};
use serde::Serialize;
use std::fmt;

/// Failure kinds surfaced to the host screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The user or a policy refused camera access.
    PermissionDenied,
    /// The camera could not be started, usually because something else holds it.
    DeviceBusy,
    /// The requested camera does not exist.
    DeviceNotFound,
    /// The device has no camera at all.
    NoDevicesFound,
    /// A code was read but is not a teacher code.
    MalformedPayload,
    /// The directory could not be reached in time.
    VerificationUnreachable,
    /// The directory did not recognise the code.
    VerificationRejected,
}

impl ErrorKind {
    /// User-facing message for this kind.
    pub fn message(self) -> &'static str {
        match self {
            ErrorKind::PermissionDenied => {
                "Camera access was denied. Allow camera access and try again."
            }
            ErrorKind::DeviceBusy => {
                "The camera is in use by another application. Close it and try again."
            }
            ErrorKind::DeviceNotFound => "The selected camera is not available.",
            ErrorKind::NoDevicesFound => "No camera was found on this device.",
            ErrorKind::MalformedPayload => "This QR code is not a teacher code.",
            ErrorKind::VerificationUnreachable => {
                "Could not reach the teacher directory. Check your connection and scan again."
            }
            ErrorKind::VerificationRejected => "This teacher code was not recognised.",
        }
    }

    /// Whether the user can recover by trying again.
    pub fn is_retryable(self) -> bool {
        !matches!(self, ErrorKind::NoDevicesFound)
    }

    /// Whether this kind comes from device acquisition.
    pub fn is_device_error(self) -> bool {
        matches!(
            self,
            ErrorKind::PermissionDenied
                | ErrorKind::DeviceBusy
                | ErrorKind::DeviceNotFound
                | ErrorKind::NoDevicesFound
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl From<&CameraError> for ErrorKind {
    fn from(error: &CameraError) -> Self {
        match error {
            CameraError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            CameraError::DeviceBusy(_)
            | CameraError::SessionActive { .. }
            | CameraError::Platform(_) => ErrorKind::DeviceBusy,
            CameraError::DeviceNotFound(_) => ErrorKind::DeviceNotFound,
            CameraError::NoDevicesFound => ErrorKind::NoDevicesFound,
        }
    }
}

impl From<&VerificationError> for ErrorKind {
    fn from(error: &VerificationError) -> Self {
        match error {
            VerificationError::Unreachable(_) => ErrorKind::VerificationUnreachable,
            VerificationError::Rejected(_) => ErrorKind::VerificationRejected,
        }
    }
}

/// Lifecycle state of a scan controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "kind", rename_all = "snake_case")]
pub enum ScannerState {
    /// No camera held.
    #[default]
    Idle,
    /// Waiting for the camera to open.
    RequestingPermission,
    /// Sampling frames.
    Scanning,
    /// A decoded code is being verified.
    Processing,
    /// A code was verified.
    Success,
    /// The attempt failed.
    Error(ErrorKind),
}

impl ScannerState {
    /// Returns true for `Success` and `Error`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScannerState::Success | ScannerState::Error(_))
    }
}

/// Outcome of one processed event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanResult {
    /// No code in the sampled frame.
    Miss,
    /// A code was decoded and handed to verification.
    Hit(String),
    /// A code was decoded but is not a teacher payload.
    Invalid(String),
    /// The payload was verified.
    Verified(TeacherStatus),
    /// Verification failed or timed out.
    VerificationFailed(String),
}

impl ScanResult {
    /// The error kind this result represents, if any.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            ScanResult::Invalid(_) => Some(ErrorKind::MalformedPayload),
            _ => None,
        }
    }
}
