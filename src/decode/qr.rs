//! QR decoding with `rqrr`.

use super::{DecodeError, SymbolDecoder};
use crate::camera::FrameBuffer;

/// Frames larger than this on either side are downscaled before detection.
pub const DEFAULT_MAX_DIMENSION: u32 = 800;

/// QR decoder backed by `rqrr`.
///
/// Detection cost grows with pixel count while phone-held codes are
/// large in frame, so oversized frames are downscaled first.
#[derive(Debug, Clone)]
pub struct QrDecoder {
    max_dimension: u32,
}

impl Default for QrDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl QrDecoder {
    /// Creates a decoder with the default maximum dimension.
    pub fn new() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }

    /// Creates a decoder with a custom maximum dimension.
    pub fn with_max_dimension(max_dimension: u32) -> Self {
        Self {
            max_dimension: max_dimension.max(64),
        }
    }

    /// The maximum processed dimension.
    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }

    fn target_size(&self, width: u32, height: u32) -> (usize, usize) {
        let longest = width.max(height);
        if longest <= self.max_dimension {
            return (width as usize, height as usize);
        }
        let scale = self.max_dimension as f64 / longest as f64;
        (
            ((width as f64 * scale) as usize).max(1),
            ((height as f64 * scale) as usize).max(1),
        )
    }
}

impl SymbolDecoder for QrDecoder {
    fn decode(&mut self, frame: &FrameBuffer) -> Result<Option<String>, DecodeError> {
        if !frame.is_valid() {
            return Err(DecodeError::InvalidFrame);
        }

        let (src_w, src_h) = (frame.width() as usize, frame.height() as usize);
        let (width, height) = self.target_size(frame.width(), frame.height());

        // Nearest-neighbour sampling; identity when no downscale is needed
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(width, height, |x, y| {
            frame.luma(x * src_w / width, y * src_h / height)
        });

        let grids = prepared.detect_grids();
        if grids.is_empty() {
            return Ok(None);
        }

        let mut last_error = None;
        for grid in grids {
            match grid.decode() {
                Ok((meta, content)) => {
                    tracing::trace!(
                        ecc_level = meta.ecc_level,
                        mask = meta.mask,
                        width,
                        height,
                        "QR grid decoded"
                    );
                    return Ok(Some(content));
                }
                Err(e) => last_error = Some(format!("{:?}", e)),
            }
        }

        Err(DecodeError::Undecodable(
            last_error.unwrap_or_else(|| "no decodable grid".to_string()),
        ))
    }
}
