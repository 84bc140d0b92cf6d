//! Native camera backend built on `nokhwa`.

use super::backend::{CameraBackend, DeviceConstraint, PlatformError, Resolution, StreamRequest, VideoStream};
use super::{CameraDevice, FrameBuffer};
use nokhwa::pixel_format::LumaFormat;
use nokhwa::utils::{
    ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
    Resolution as NativeResolution,
};
use nokhwa::{Camera, NokhwaError};

/// Camera backend for locally attached devices.
#[derive(Debug, Default)]
pub struct NativeBackend {
    devices: Vec<CameraDevice>,
}

impl NativeBackend {
    /// Creates a native backend.
    pub fn new() -> Self {
        Self::default()
    }

    fn open_index(
        &self,
        index: CameraIndex,
        resolution: Resolution,
    ) -> Result<NativeStream, PlatformError> {
        // Try the ideal resolution first, then whatever the driver offers
        let formats = [
            RequestedFormat::new::<LumaFormat>(RequestedFormatType::Closest(CameraFormat::new(
                NativeResolution::new(resolution.width, resolution.height),
                FrameFormat::MJPEG,
                30,
            ))),
            RequestedFormat::new::<LumaFormat>(RequestedFormatType::None),
        ];

        let mut last_error = None;
        for requested in formats {
            match Camera::new(index.clone(), requested) {
                Ok(mut camera) => match camera.open_stream() {
                    Ok(()) => {
                        return Ok(NativeStream {
                            device_id: index.as_string(),
                            camera,
                            sequence: 0,
                            open: true,
                        })
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, device = %index.as_string(), "Camera stream failed to start");
                        last_error = Some(e);
                    }
                },
                Err(e) => {
                    tracing::debug!(error = %e, device = %index.as_string(), "Camera format rejected");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .map(classify)
            .unwrap_or_else(|| PlatformError::NotFound(index.as_string())))
    }
}

impl CameraBackend for NativeBackend {
    type Stream = NativeStream;

    fn enumerate(&mut self) -> Result<Vec<CameraDevice>, PlatformError> {
        let infos = nokhwa::query(ApiBackend::Auto).map_err(classify)?;
        self.devices = infos
            .iter()
            .map(|info| CameraDevice::new(info.index().as_string(), info.human_name()))
            .collect();
        Ok(self.devices.clone())
    }

    fn acquire(&mut self, request: &StreamRequest) -> Result<NativeStream, PlatformError> {
        let index = match &request.device {
            DeviceConstraint::Exact(id) => match id.parse::<u32>() {
                Ok(n) => CameraIndex::Index(n),
                Err(_) => CameraIndex::String(id.clone()),
            },
            // No facing constraint at this layer; let the manager fall through
            DeviceConstraint::Facing(facing) => {
                return Err(PlatformError::Overconstrained(format!(
                    "facing {} is not reported by native devices",
                    facing
                )))
            }
            DeviceConstraint::Any => match self.devices.first() {
                Some(device) => match device.id.parse::<u32>() {
                    Ok(n) => CameraIndex::Index(n),
                    Err(_) => CameraIndex::String(device.id.clone()),
                },
                None => CameraIndex::Index(0),
            },
        };
        self.open_index(index, request.resolution)
    }
}

/// An open `nokhwa` stream.
pub struct NativeStream {
    device_id: String,
    camera: Camera,
    sequence: u64,
    open: bool,
}

impl VideoStream for NativeStream {
    fn device_id(&self) -> &str {
        &self.device_id
    }

    fn dimensions(&self) -> Resolution {
        if !self.open {
            return Resolution::new(0, 0);
        }
        let native = self.camera.resolution();
        Resolution::new(native.width(), native.height())
    }

    fn read_frame(&mut self) -> Result<FrameBuffer, PlatformError> {
        let buffer = self.camera.frame().map_err(classify)?;
        let image = buffer.decode_image::<LumaFormat>().map_err(classify)?;
        self.sequence += 1;
        let (width, height) = (image.width(), image.height());
        Ok(FrameBuffer::new(image.into_raw(), width, height, self.sequence))
    }

    fn stop(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        if let Err(e) = self.camera.stop_stream() {
            tracing::warn!(error = %e, device = %self.device_id, "Failed to stop camera stream");
        }
    }
}

impl Drop for NativeStream {
    fn drop(&mut self) {
        self.stop();
    }
}

fn classify(error: NokhwaError) -> PlatformError {
    let message = error.to_string();
    let lower = message.to_lowercase();
    if ["permission", "denied", "not authorized", "unauthorized"]
        .iter()
        .any(|k| lower.contains(k))
    {
        PlatformError::NotAllowed(message)
    } else if ["busy", "in use", "ebusy"].iter().any(|k| lower.contains(k)) {
        PlatformError::NotReadable(message)
    } else if matches!(error, NokhwaError::OpenDeviceError(..)) {
        PlatformError::NotFound(message)
    } else {
        PlatformError::Other(message)
    }
}

