//! Pixel snapshot taken from a live stream.

use std::time::Instant;

/// A single grayscale frame sampled from the camera.
///
/// One buffer is produced per sampling tick, handed to the decoder
/// and discarded. Color input is reduced to luma on construction.
#[derive(Clone)]
pub struct FrameBuffer {
    /// Luma pixel data, row-major, one byte per pixel.
    pixels: Vec<u8>,
    /// Frame width in pixels.
    width: u32,
    /// Frame height in pixels.
    height: u32,
    /// Capture timestamp.
    timestamp: Instant,
    /// Monotonic sequence number within a stream.
    sequence: u64,
}

impl FrameBuffer {
    /// Creates a frame from luma pixel data.
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, sequence: u64) -> Self {
        Self {
            pixels,
            width,
            height,
            timestamp: Instant::now(),
            sequence,
        }
    }

    /// Creates a frame from packed RGB data.
    pub fn from_rgb(rgb: &[u8], width: u32, height: u32, sequence: u64) -> Self {
        Self::new(to_luma(rgb, 3), width, height, sequence)
    }

    /// Creates a frame from packed RGBA data, as read back from a canvas.
    pub fn from_rgba(rgba: &[u8], width: u32, height: u32, sequence: u64) -> Self {
        Self::new(to_luma(rgba, 4), width, height, sequence)
    }

    /// Returns the luma pixel data.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Returns the frame width.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the frame height.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the capture timestamp.
    #[inline]
    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    /// Returns the sequence number.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Returns the total number of pixels (width * height).
    #[inline]
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Returns the luma value at `(x, y)`, or 0 outside the buffer.
    #[inline]
    pub fn luma(&self, x: usize, y: usize) -> u8 {
        self.pixels
            .get(y * self.width as usize + x)
            .copied()
            .unwrap_or(0)
    }

    /// Validates that the pixel buffer size matches dimensions.
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0 && self.pixels.len() == self.pixel_count()
    }
}

impl std::fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("sequence", &self.sequence)
            .field("pixel_bytes", &self.pixels.len())
            .finish()
    }
}

// BT.601 integer weights.
fn to_luma(data: &[u8], channels: usize) -> Vec<u8> {
    data.chunks_exact(channels)
        .map(|px| {
            ((px[0] as u32 * 299 + px[1] as u32 * 587 + px[2] as u32 * 114) / 1000) as u8
        })
        .collect()
}
