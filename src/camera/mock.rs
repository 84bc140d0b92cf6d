//! Scripted camera backend for tests and demos.

use super::backend::{CameraBackend, DeviceConstraint, PlatformError, Resolution, StreamRequest, VideoStream};
use super::{CameraDevice, FacingHint, FrameBuffer};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

#[derive(Debug, Default)]
struct Ledger {
    open: usize,
    peak: usize,
    attempts: u64,
    acquisitions: u64,
    releases: u64,
}

/// Read-only view of the streams a [`MockBackend`] has handed out.
///
/// Clones share the same ledger, so a test can keep a probe while the
/// backend is moved into a session manager.
#[derive(Debug, Clone, Default)]
pub struct StreamProbe {
    ledger: Rc<RefCell<Ledger>>,
}

impl StreamProbe {
    /// Streams currently open.
    pub fn open_streams(&self) -> usize {
        self.ledger.borrow().open
    }

    /// Highest number of streams ever open at the same time.
    pub fn peak_open(&self) -> usize {
        self.ledger.borrow().peak
    }

    /// Acquire calls, successful or not.
    pub fn attempts(&self) -> u64 {
        self.ledger.borrow().attempts
    }

    /// Successful acquisitions.
    pub fn acquisitions(&self) -> u64 {
        self.ledger.borrow().acquisitions
    }

    /// Streams stopped.
    pub fn releases(&self) -> u64 {
        self.ledger.borrow().releases
    }
}

/// Mock camera backend that produces synthetic frames.
///
/// By default it exposes a front and a back camera, both of which
/// open successfully and deliver frames immediately.
#[derive(Debug)]
pub struct MockBackend {
    devices: Vec<CameraDevice>,
    failures: VecDeque<PlatformError>,
    device_failures: HashMap<String, PlatformError>,
    warmup_ticks: u32,
    image: Option<FrameBuffer>,
    native: Resolution,
    hide_labels_until_granted: bool,
    granted: bool,
    probe: StreamProbe,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Creates a backend with a front and a back camera.
    pub fn new() -> Self {
        Self::with_devices(vec![
            CameraDevice::with_facing("front", "Front Camera", FacingHint::Front),
            CameraDevice::with_facing("back", "Back Camera", FacingHint::Back),
        ])
    }

    /// Creates a backend exposing the given devices.
    pub fn with_devices(devices: Vec<CameraDevice>) -> Self {
        Self {
            devices,
            failures: VecDeque::new(),
            device_failures: HashMap::new(),
            warmup_ticks: 0,
            image: None,
            native: Resolution::new(640, 480),
            hide_labels_until_granted: false,
            granted: false,
            probe: StreamProbe::default(),
        }
    }

    /// Makes the next acquire attempt fail with `error`. Queued failures
    /// are consumed in order.
    pub fn fail_next(mut self, error: PlatformError) -> Self {
        self.failures.push_back(error);
        self
    }

    /// Makes every attempt to open `device_id` fail with `error`.
    pub fn fail_device(mut self, device_id: impl Into<String>, error: PlatformError) -> Self {
        self.device_failures.insert(device_id.into(), error);
        self
    }

    /// Streams report zero dimensions for the first `ticks` queries.
    pub fn with_warmup(mut self, ticks: u32) -> Self {
        self.warmup_ticks = ticks;
        self
    }

    /// Streams deliver copies of `image` instead of a synthetic pattern.
    pub fn with_image(mut self, image: FrameBuffer) -> Self {
        self.native = Resolution::new(image.width(), image.height());
        self.image = Some(image);
        self
    }

    /// Enumeration returns blank labels until a stream has been granted.
    pub fn hide_labels_until_granted(mut self) -> Self {
        self.hide_labels_until_granted = true;
        self
    }

    /// Queues another failure on a backend already in use.
    pub fn push_failure(&mut self, error: PlatformError) {
        self.failures.push_back(error);
    }

    /// Returns a probe sharing this backend's stream ledger.
    pub fn probe(&self) -> StreamProbe {
        self.probe.clone()
    }

    fn resolve(&self, constraint: &DeviceConstraint) -> Result<&CameraDevice, PlatformError> {
        match constraint {
            DeviceConstraint::Exact(id) => self
                .devices
                .iter()
                .find(|d| &d.id == id)
                .ok_or_else(|| PlatformError::NotFound(id.clone())),
            DeviceConstraint::Facing(facing) => self
                .devices
                .iter()
                .find(|d| d.facing == *facing)
                .ok_or_else(|| PlatformError::Overconstrained(format!("facingMode {}", facing))),
            DeviceConstraint::Any => self
                .devices
                .first()
                .ok_or_else(|| PlatformError::NotFound("no video input".to_string())),
        }
    }
}

impl CameraBackend for MockBackend {
    type Stream = MockStream;

    fn enumerate(&mut self) -> Result<Vec<CameraDevice>, PlatformError> {
        if self.hide_labels_until_granted && !self.granted {
            return Ok(self
                .devices
                .iter()
                .map(|d| CameraDevice::with_facing(d.id.clone(), "", FacingHint::Unknown))
                .collect());
        }
        Ok(self.devices.clone())
    }

    fn acquire(&mut self, request: &StreamRequest) -> Result<MockStream, PlatformError> {
        self.probe.ledger.borrow_mut().attempts += 1;

        if let Some(error) = self.failures.pop_front() {
            return Err(error);
        }

        let device = self.resolve(&request.device)?;
        if let Some(error) = self.device_failures.get(&device.id) {
            return Err(error.clone());
        }
        let device_id = device.id.clone();

        self.granted = true;
        {
            let mut ledger = self.probe.ledger.borrow_mut();
            ledger.open += 1;
            ledger.peak = ledger.peak.max(ledger.open);
            ledger.acquisitions += 1;
        }

        let resolution = if request.resolution.is_empty() || self.image.is_some() {
            self.native
        } else {
            request.resolution
        };

        tracing::debug!(device = %device_id, %resolution, "MockBackend acquired stream");

        Ok(MockStream {
            device_id,
            resolution,
            warmup: Cell::new(self.warmup_ticks),
            sequence: 0,
            image: self.image.clone(),
            ledger: Rc::clone(&self.probe.ledger),
            stopped: false,
        })
    }
}

/// Stream handed out by [`MockBackend`].
///
/// Dropping it without calling [`VideoStream::stop`] leaves it counted
/// as open, which is what lets tests catch leaked sessions.
#[derive(Debug)]
pub struct MockStream {
    device_id: String,
    resolution: Resolution,
    warmup: Cell<u32>,
    sequence: u64,
    image: Option<FrameBuffer>,
    ledger: Rc<RefCell<Ledger>>,
    stopped: bool,
}

impl VideoStream for MockStream {
    fn device_id(&self) -> &str {
        &self.device_id
    }

    fn dimensions(&self) -> Resolution {
        if self.stopped {
            return Resolution::new(0, 0);
        }
        let remaining = self.warmup.get();
        if remaining > 0 {
            self.warmup.set(remaining - 1);
            return Resolution::new(0, 0);
        }
        self.resolution
    }

    fn read_frame(&mut self) -> Result<FrameBuffer, PlatformError> {
        if self.stopped {
            return Err(PlatformError::Other("stream stopped".to_string()));
        }
        self.sequence += 1;

        if let Some(image) = &self.image {
            return Ok(FrameBuffer::new(
                image.pixels().to_vec(),
                image.width(),
                image.height(),
                self.sequence,
            ));
        }

        // Deterministic pattern, never a decodable symbol
        let Resolution { width, height } = self.resolution;
        let pixels = (0..(width as usize * height as usize))
            .map(|i| ((i as u64 ^ self.sequence) % 256) as u8)
            .collect();
        Ok(FrameBuffer::new(pixels, width, height, self.sequence))
    }

    fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        let mut ledger = self.ledger.borrow_mut();
        ledger.open -= 1;
        ledger.releases += 1;
    }
}
