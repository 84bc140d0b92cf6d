//! QR decoding.
//!
//! The symbology algorithm itself comes from `rqrr`; this module wraps
//! it behind [`SymbolDecoder`] and adds [`DecodeEngine`], the boundary
//! that turns every decoder failure, including panics, into a miss so
//! one bad frame can never take the scan loop down.

mod fixed;
mod qr;

pub use fixed::FixedDecoder;
pub use qr::{QrDecoder, DEFAULT_MAX_DIMENSION};

use crate::camera::FrameBuffer;
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;

/// Errors a decoder may report for a single frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("frame is empty or inconsistent with its dimensions")]
    InvalidFrame,
    #[error("symbol found but could not be decoded: {0}")]
    Undecodable(String),
    #[error("decoder failure: {0}")]
    Internal(String),
}

/// A symbology implementation.
pub trait SymbolDecoder {
    /// Decodes the first readable symbol in `frame`.
    ///
    /// `Ok(None)` means nothing was found.
    fn decode(&mut self, frame: &FrameBuffer) -> Result<Option<String>, DecodeError>;
}

/// Result of decoding one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// No symbol in this frame.
    Miss,
    /// Raw decoded text.
    Hit(String),
}

/// Decode counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    /// Frames passed to the engine.
    pub frames: u64,
    /// Frames that produced text.
    pub hits: u64,
    /// Frames the decoder reported an error for.
    pub failures: u64,
    /// Frames during which the decoder panicked.
    pub panics: u64,
}

/// Fault-tolerant wrapper around a [`SymbolDecoder`].
#[derive(Debug)]
pub struct DecodeEngine<D> {
    decoder: D,
    stats: DecodeStats,
}

impl Default for DecodeEngine<QrDecoder> {
    fn default() -> Self {
        Self::new(QrDecoder::default())
    }
}

impl<D: SymbolDecoder> DecodeEngine<D> {
    /// Wraps `decoder`.
    pub fn new(decoder: D) -> Self {
        Self {
            decoder,
            stats: DecodeStats::default(),
        }
    }

    /// Returns the decode counters.
    pub fn stats(&self) -> DecodeStats {
        self.stats
    }

    /// The wrapped decoder.
    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Decodes `frame`, absorbing every failure as [`Decoded::Miss`].
    pub fn decode(&mut self, frame: &FrameBuffer) -> Decoded {
        self.stats.frames += 1;

        if !frame.is_valid() {
            self.stats.failures += 1;
            tracing::debug!(?frame, "Skipping malformed frame");
            return Decoded::Miss;
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.decoder.decode(frame)));
        match outcome {
            Ok(Ok(Some(text))) => {
                self.stats.hits += 1;
                tracing::debug!(sequence = frame.sequence(), bytes = text.len(), "Symbol decoded");
                Decoded::Hit(text)
            }
            Ok(Ok(None)) => Decoded::Miss,
            Ok(Err(e)) => {
                self.stats.failures += 1;
                tracing::debug!(error = %e, sequence = frame.sequence(), "Decode failed, treating as miss");
                Decoded::Miss
            }
            Err(payload) => {
                self.stats.panics += 1;
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::warn!(
                    panic = %message,
                    sequence = frame.sequence(),
                    total_panics = self.stats.panics,
                    "Decoder panicked, treating as miss"
                );
                Decoded::Miss
            }
        }
    }
}
