//! Frame sampling.
//!
//! Pulls frames out of a live stream on a fixed cadence. Sampling is
//! cooperative: each tick runs to completion (read, decode, handle)
//! before the next one is awaited.

mod sampler;

pub use crate::camera::FrameBuffer;
pub use sampler::{FrameSampler, SamplerStats, DEFAULT_INTERVAL};
