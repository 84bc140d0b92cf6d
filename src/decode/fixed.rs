//! Decoder that yields a fixed text.

use super::{DecodeError, SymbolDecoder};
use crate::camera::FrameBuffer;

/// Yields `text` for every frame after an initial run of misses.
///
/// Used by the demo binary with the mock camera, whose synthetic
/// frames never contain a real symbol.
#[derive(Debug, Clone)]
pub struct FixedDecoder {
    text: String,
    misses_left: u64,
    calls: u64,
}

impl FixedDecoder {
    /// Yields `text` from the first frame on.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            misses_left: 0,
            calls: 0,
        }
    }

    /// Misses the first `frames` frames.
    pub fn after(mut self, frames: u64) -> Self {
        self.misses_left = frames;
        self
    }

    /// Number of frames seen.
    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl SymbolDecoder for FixedDecoder {
    fn decode(&mut self, _frame: &FrameBuffer) -> Result<Option<String>, DecodeError> {
        self.calls += 1;
        if self.misses_left > 0 {
            self.misses_left -= 1;
            return Ok(None);
        }
        Ok(Some(self.text.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_misses_then_hits() {
        let frame = FrameBuffer::new(vec![0u8; 4], 2, 2, 1);
        let mut decoder = FixedDecoder::new("T-1").after(2);

        assert_eq!(decoder.decode(&frame), Ok(None));
        assert_eq!(decoder.decode(&frame), Ok(None));
        assert_eq!(decoder.decode(&frame), Ok(Some("T-1".to_string())));
        assert_eq!(decoder.calls(), 3);
    }
}
