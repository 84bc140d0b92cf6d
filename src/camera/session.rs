//! A single open camera acquisition.

use super::backend::{Resolution, VideoStream};
use std::time::Instant;

/// An open handle to a live camera stream.
///
/// Owned by the session manager. Closing stops every track of the
/// underlying stream; it is idempotent and also runs on drop, so a
/// session cannot outlive its owner with the camera still on.
pub struct CaptureSession<S: VideoStream> {
    number: u64,
    device_id: String,
    resolution: Resolution,
    opened_at: Instant,
    stream: Option<S>,
}

impl<S: VideoStream> CaptureSession<S> {
    pub(crate) fn new(number: u64, stream: S, requested: Resolution) -> Self {
        let negotiated = stream.dimensions();
        let resolution = if negotiated.is_empty() {
            requested
        } else {
            negotiated
        };
        Self {
            number,
            device_id: stream.device_id().to_string(),
            resolution,
            opened_at: Instant::now(),
            stream: Some(stream),
        }
    }

    /// Sequence number of this session within its manager.
    pub fn number(&self) -> u64 {
        self.number
    }

    /// Device the session was opened with.
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Resolution negotiated at open time.
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// When the session was opened.
    pub fn opened_at(&self) -> Instant {
        self.opened_at
    }

    /// Returns true until the session has been closed.
    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Mutable access to the live stream, if still open.
    pub fn stream_mut(&mut self) -> Option<&mut S> {
        self.stream.as_mut()
    }

    /// Stops the stream. Returns true if this call released it.
    pub fn close(&mut self) -> bool {
        match self.stream.take() {
            Some(mut stream) => {
                stream.stop();
                tracing::info!(
                    session = self.number,
                    device = %self.device_id,
                    open_for_ms = self.opened_at.elapsed().as_millis() as u64,
                    "Capture session closed"
                );
                true
            }
            None => false,
        }
    }
}

impl<S: VideoStream> Drop for CaptureSession<S> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<S: VideoStream> std::fmt::Debug for CaptureSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSession")
            .field("number", &self.number)
            .field("device_id", &self.device_id)
            .field("resolution", &self.resolution)
            .field("open", &self.is_open())
            .finish()
    }
}
