//! Camera session manager.
//!
//! Owns the one [`CaptureSession`] a scanner may hold and is the only
//! code that touches the platform backend.

use super::backend::{CameraBackend, DeviceConstraint, PlatformError, Resolution, StreamRequest};
use super::session::CaptureSession;
use super::{CameraDevice, DevicePreference, FacingHint};
use thiserror::Error;

/// Errors that can occur during camera operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraError {
    #[error("camera permission denied: {0}")]
    PermissionDenied(String),
    #[error("camera is busy: {0}")]
    DeviceBusy(String),
    #[error("camera device not found: {0}")]
    DeviceNotFound(String),
    #[error("no camera devices found")]
    NoDevicesFound,
    #[error("a capture session is already open on {device_id}")]
    SessionActive { device_id: String },
    #[error("camera platform error: {0}")]
    Platform(String),
}

impl From<PlatformError> for CameraError {
    fn from(error: PlatformError) -> Self {
        match error {
            PlatformError::NotAllowed(msg) | PlatformError::Security(msg) => {
                CameraError::PermissionDenied(msg)
            }
            PlatformError::NotReadable(msg) | PlatformError::Aborted(msg) => {
                CameraError::DeviceBusy(msg)
            }
            PlatformError::NotFound(msg) | PlatformError::Overconstrained(msg) => {
                CameraError::DeviceNotFound(msg)
            }
            PlatformError::Other(msg) => CameraError::Platform(msg),
        }
    }
}

/// Acquires, releases and switches capture devices.
///
/// At most one session is open at a time: a second [`open`](Self::open)
/// without an intervening [`close`](Self::close) is refused.
pub struct CameraSessionManager<B: CameraBackend> {
    backend: B,
    devices: Vec<CameraDevice>,
    enumerated: bool,
    session: Option<CaptureSession<B::Stream>>,
    resolution: Resolution,
    sessions_opened: u64,
}

impl<B: CameraBackend> CameraSessionManager<B> {
    /// Creates a manager requesting 640x480 streams.
    pub fn new(backend: B) -> Self {
        Self::with_resolution(backend, Resolution::new(640, 480))
    }

    /// Creates a manager requesting the given ideal resolution.
    pub fn with_resolution(backend: B, resolution: Resolution) -> Self {
        Self {
            backend,
            devices: Vec::new(),
            enumerated: false,
            session: None,
            resolution,
            sessions_opened: 0,
        }
    }

    /// Enumerates capture devices, replacing the cached snapshot.
    pub fn list_devices(&mut self) -> Result<&[CameraDevice], CameraError> {
        let devices = self.backend.enumerate()?;
        self.enumerated = true;
        self.devices = devices;
        if self.devices.is_empty() {
            return Err(CameraError::NoDevicesFound);
        }
        Ok(&self.devices)
    }

    /// The device snapshot from the last enumeration.
    pub fn devices(&self) -> &[CameraDevice] {
        &self.devices
    }

    /// Returns the open session, if any.
    pub fn session(&self) -> Option<&CaptureSession<B::Stream>> {
        self.session.as_ref()
    }

    /// Returns the open session mutably, if any.
    pub fn session_mut(&mut self) -> Option<&mut CaptureSession<B::Stream>> {
        self.session.as_mut()
    }

    /// Returns true while a session is open.
    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Total sessions opened by this manager.
    pub fn sessions_opened(&self) -> u64 {
        self.sessions_opened
    }

    /// The platform backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The platform backend, mutably.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Opens a capture session according to `preference`.
    ///
    /// Resolution order: explicit device id; a device whose facing or
    /// label matches the facing hint; a platform facing constraint; any
    /// device. Only "not found" style failures fall through to the next
    /// candidate; permission and busy errors are returned immediately.
    pub fn open(
        &mut self,
        preference: &DevicePreference,
    ) -> Result<&mut CaptureSession<B::Stream>, CameraError> {
        if let Some(session) = &self.session {
            return Err(CameraError::SessionActive {
                device_id: session.device_id().to_string(),
            });
        }

        if !self.enumerated {
            match self.backend.enumerate() {
                Ok(devices) => {
                    self.devices = devices;
                    self.enumerated = true;
                }
                // Some platforms refuse to enumerate before permission is granted
                Err(e) => tracing::debug!(error = %e, "Device enumeration before open failed"),
            }
        }

        let candidates = self.candidates(preference);
        let last = candidates.len() - 1;
        let mut acquired = None;

        for (i, constraint) in candidates.into_iter().enumerate() {
            let request = StreamRequest {
                device: constraint,
                resolution: self.resolution,
            };
            tracing::debug!(device = ?request.device, "Requesting camera stream");

            match self.backend.acquire(&request) {
                Ok(stream) => {
                    acquired = Some(stream);
                    break;
                }
                Err(e @ (PlatformError::NotFound(_) | PlatformError::Overconstrained(_)))
                    if i < last =>
                {
                    tracing::debug!(error = %e, "Camera candidate unavailable, trying next");
                }
                Err(PlatformError::NotFound(_))
                    if request.device == DeviceConstraint::Any && self.devices.is_empty() =>
                {
                    return Err(CameraError::NoDevicesFound);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Camera acquisition failed");
                    return Err(e.into());
                }
            }
        }

        let Some(stream) = acquired else {
            return Err(CameraError::NoDevicesFound);
        };

        // Labels are often withheld until the first grant
        if self.devices.is_empty() || self.devices.iter().any(|d| d.label.is_empty()) {
            match self.backend.enumerate() {
                Ok(devices) => self.devices = devices,
                Err(e) => tracing::debug!(error = %e, "Re-enumeration after grant failed"),
            }
        }

        self.sessions_opened += 1;
        let session = CaptureSession::new(self.sessions_opened, stream, self.resolution);
        tracing::info!(
            session = session.number(),
            device = %session.device_id(),
            resolution = %session.resolution(),
            "Capture session opened"
        );
        Ok(self.session.insert(session))
    }

    /// Closes the open session. Safe to call when nothing is open.
    ///
    /// Returns true if a session was released by this call.
    pub fn close(&mut self) -> bool {
        match self.session.take() {
            Some(mut session) => session.close(),
            None => false,
        }
    }

    /// Closes the current session, then opens `device_id`.
    ///
    /// The old session is always released before the new device is
    /// requested, so a failed switch leaves nothing open.
    pub fn switch_to(
        &mut self,
        device_id: &str,
    ) -> Result<&mut CaptureSession<B::Stream>, CameraError> {
        let previous = self
            .session
            .as_ref()
            .map(|s| s.device_id().to_string());
        self.close();
        tracing::info!(from = ?previous, to = %device_id, "Switching camera");
        self.open(&DevicePreference::device(device_id))
    }

    /// Picks the device a front/back toggle should move to from `current`.
    ///
    /// Prefers a device with the opposite facing; otherwise the next
    /// device in enumeration order. `None` if there is nothing else to
    /// switch to.
    pub fn next_device(&self, current: Option<&str>) -> Option<&CameraDevice> {
        let Some(current_id) = current else {
            return self.devices.first();
        };
        let position = self.devices.iter().position(|d| d.id == current_id);

        if let Some(facing) = position.and_then(|p| facing_of(&self.devices[p]).opposite()) {
            if let Some(device) = self.devices.iter().find(|d| d.matches_facing(facing)) {
                return Some(device);
            }
        }

        let start = position.map_or(0, |p| p + 1);
        (0..self.devices.len())
            .map(|offset| &self.devices[(start + offset) % self.devices.len()])
            .find(|d| d.id != current_id)
    }

    fn candidates(&self, preference: &DevicePreference) -> Vec<DeviceConstraint> {
        if let Some(id) = &preference.device_id {
            return vec![DeviceConstraint::Exact(id.clone())];
        }

        match preference.facing {
            Some(facing) if facing != FacingHint::Unknown => {
                match self.devices.iter().find(|d| d.matches_facing(facing)) {
                    Some(device) => vec![
                        DeviceConstraint::Exact(device.id.clone()),
                        DeviceConstraint::Any,
                    ],
                    None => vec![DeviceConstraint::Facing(facing), DeviceConstraint::Any],
                }
            }
            _ => vec![DeviceConstraint::Any],
        }
    }
}

fn facing_of(device: &CameraDevice) -> FacingHint {
    match device.facing {
        FacingHint::Unknown => FacingHint::from_label(&device.label),
        facing => facing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{MockBackend, VideoStream};

    #[test]
    fn test_open_close_lifecycle() {
        let backend = MockBackend::new();
        let probe = backend.probe();
        let mut manager = CameraSessionManager::new(backend);

        assert!(!manager.is_open());
        let session = manager.open(&DevicePreference::default()).unwrap();
        assert_eq!(session.device_id(), "front");
        assert_eq!(probe.open_streams(), 1);

        assert!(manager.close());
        assert!(!manager.close());
        assert_eq!(probe.open_streams(), 0);
        assert_eq!(probe.releases(), 1);
    }

    #[test]
    fn test_second_open_refused() {
        let backend = MockBackend::new();
        let probe = backend.probe();
        let mut manager = CameraSessionManager::new(backend);

        manager.open(&DevicePreference::default()).unwrap();
        assert!(matches!(
            manager.open(&DevicePreference::facing(FacingHint::Back)),
            Err(CameraError::SessionActive { .. })
        ));
        assert_eq!(probe.peak_open(), 1);
        assert_eq!(probe.attempts(), 1);
    }

    #[test]
    fn test_explicit_device_wins() {
        let mut manager = CameraSessionManager::new(MockBackend::new());
        let preference = DevicePreference {
            device_id: Some("back".into()),
            facing: Some(FacingHint::Front),
        };
        assert_eq!(manager.open(&preference).unwrap().device_id(), "back");
    }

    #[test]
    fn test_unknown_explicit_device_fails() {
        let mut manager = CameraSessionManager::new(MockBackend::new());
        assert!(matches!(
            manager.open(&DevicePreference::device("usb-3")),
            Err(CameraError::DeviceNotFound(_))
        ));
        assert!(!manager.is_open());
    }

    #[test]
    fn test_facing_resolved_by_label() {
        let backend = MockBackend::with_devices(vec![
            CameraDevice::with_facing("a", "Integrated Webcam", FacingHint::Unknown),
            CameraDevice::with_facing("b", "Rear Camera", FacingHint::Unknown),
        ]);
        let mut manager = CameraSessionManager::new(backend);

        let session = manager.open(&DevicePreference::facing(FacingHint::Back)).unwrap();
        assert_eq!(session.device_id(), "b");
    }

    #[test]
    fn test_unmatched_facing_falls_back_to_any() {
        let backend = MockBackend::with_devices(vec![CameraDevice::with_facing(
            "usb",
            "HD Webcam",
            FacingHint::Unknown,
        )]);
        let probe = backend.probe();
        let mut manager = CameraSessionManager::new(backend);

        let session = manager.open(&DevicePreference::facing(FacingHint::Back)).unwrap();
        assert_eq!(session.device_id(), "usb");
        // facing constraint, then any
        assert_eq!(probe.attempts(), 2);
    }

    #[test]
    fn test_platform_errors_are_classified() {
        let cases = [
            (PlatformError::NotAllowed("x".into()), "PermissionDenied"),
            (PlatformError::Security("x".into()), "PermissionDenied"),
            (PlatformError::NotReadable("x".into()), "DeviceBusy"),
            (PlatformError::Aborted("x".into()), "DeviceBusy"),
            (PlatformError::Overconstrained("x".into()), "DeviceNotFound"),
        ];
        for (platform, expected) in cases {
            let backend = MockBackend::new().fail_next(platform);
            let mut manager = CameraSessionManager::new(backend);
            let error = manager.open(&DevicePreference::default()).unwrap_err();
            assert!(format!("{:?}", error).starts_with(expected), "{:?}", error);
            assert!(!manager.is_open());
        }
    }

    #[test]
    fn test_permission_error_does_not_fall_through() {
        let backend = MockBackend::new().fail_device("back", PlatformError::NotAllowed("no".into()));
        let probe = backend.probe();
        let mut manager = CameraSessionManager::new(backend);

        let result = manager.open(&DevicePreference::facing(FacingHint::Back));
        assert!(matches!(result, Err(CameraError::PermissionDenied(_))));
        assert_eq!(probe.attempts(), 1);
    }

    #[test]
    fn test_no_devices() {
        let mut manager = CameraSessionManager::new(MockBackend::with_devices(Vec::new()));
        assert!(matches!(
            manager.list_devices(),
            Err(CameraError::NoDevicesFound)
        ));
        assert!(matches!(
            manager.open(&DevicePreference::default()),
            Err(CameraError::NoDevicesFound)
        ));
    }

    #[test]
    fn test_switch_releases_old_session_first() {
        let backend = MockBackend::new();
        let probe = backend.probe();
        let mut manager = CameraSessionManager::new(backend);

        manager.open(&DevicePreference::default()).unwrap();
        let session = manager.switch_to("back").unwrap();
        assert_eq!(session.device_id(), "back");
        assert_eq!(probe.peak_open(), 1);
        assert_eq!(probe.open_streams(), 1);
    }

    #[test]
    fn test_failed_switch_leaves_nothing_open() {
        let backend = MockBackend::new().fail_device("back", PlatformError::NotReadable("in use".into()));
        let probe = backend.probe();
        let mut manager = CameraSessionManager::new(backend);

        manager.open(&DevicePreference::default()).unwrap();
        let result = manager.switch_to("back");

        assert!(matches!(result, Err(CameraError::DeviceBusy(_))));
        assert!(!manager.is_open());
        assert_eq!(probe.open_streams(), 0);
    }

    #[test]
    fn test_labels_refreshed_after_grant() {
        let backend = MockBackend::new().hide_labels_until_granted();
        let mut manager = CameraSessionManager::new(backend);

        manager.open(&DevicePreference::default()).unwrap();
        assert_eq!(manager.devices()[0].label, "Front Camera");
    }

    #[test]
    fn test_next_device_toggles_facing() {
        let backend = MockBackend::with_devices(vec![
            CameraDevice::with_facing("f", "Front", FacingHint::Front),
            CameraDevice::with_facing("w", "Wide", FacingHint::Unknown),
            CameraDevice::with_facing("b", "Back", FacingHint::Back),
        ]);
        let mut manager = CameraSessionManager::new(backend);
        manager.list_devices().unwrap();

        assert_eq!(manager.next_device(Some("f")).unwrap().id, "b");
        assert_eq!(manager.next_device(Some("b")).unwrap().id, "f");
        assert_eq!(manager.next_device(Some("w")).unwrap().id, "b");
        assert_eq!(manager.next_device(None).unwrap().id, "f");
    }

    #[test]
    fn test_next_device_single_camera() {
        let backend = MockBackend::with_devices(vec![CameraDevice::new("only", "Webcam")]);
        let mut manager = CameraSessionManager::new(backend);
        manager.list_devices().unwrap();

        assert!(manager.next_device(Some("only")).is_none());
    }

    #[test]
    fn test_session_stream_reads_frames() {
        let mut manager = CameraSessionManager::new(MockBackend::new());
        let session = manager.open(&DevicePreference::default()).unwrap();
        let frame = session.stream_mut().unwrap().read_frame().unwrap();
        assert!(frame.is_valid());
    }
}
