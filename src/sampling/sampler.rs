//! Timer-driven frame sampler.

use crate::camera::{FrameBuffer, VideoStream};
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior};

/// Default sampling cadence.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);

/// Counters describing sampler activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplerStats {
    /// Timer ticks observed.
    pub ticks: u64,
    /// Frames handed to the caller.
    pub sampled: u64,
    /// Ticks skipped because the stream had no dimensions yet.
    pub skipped: u64,
    /// Ticks skipped because the frame could not be read.
    pub read_failures: u64,
}

/// Samples frames from a stream on a repeating timer.
///
/// Starting only arms the sampler; the timer itself is created on the
/// first await, so arming and disarming never need a runtime. Missed
/// ticks are delayed rather than bursted, and ticks are only awaited
/// through `&mut self`, so two samples can never overlap.
#[derive(Debug)]
pub struct FrameSampler {
    period: Duration,
    armed: bool,
    ticker: Option<Interval>,
    stats: SamplerStats,
}

impl Default for FrameSampler {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL)
    }
}

impl FrameSampler {
    /// Creates a sampler with the given period (at least 1 ms).
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
            armed: false,
            ticker: None,
            stats: SamplerStats::default(),
        }
    }

    /// The sampling period.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Arms the sampler. No-op if already running.
    pub fn start(&mut self) {
        if !self.armed {
            self.armed = true;
            tracing::debug!(period_ms = self.period.as_millis() as u64, "Sampling started");
        }
    }

    /// Disarms the sampler and drops its timer. Idempotent.
    pub fn stop(&mut self) {
        if self.armed {
            tracing::debug!(
                ticks = self.stats.ticks,
                sampled = self.stats.sampled,
                "Sampling stopped"
            );
        }
        self.armed = false;
        self.ticker = None;
    }

    /// Returns true while armed.
    pub fn is_running(&self) -> bool {
        self.armed
    }

    /// Returns the activity counters.
    pub fn stats(&self) -> SamplerStats {
        self.stats
    }

    /// Waits for the next tick. Returns false immediately if not armed.
    pub async fn tick(&mut self) -> bool {
        if !self.armed {
            return false;
        }
        let period = self.period;
        let ticker = self.ticker.get_or_insert_with(|| {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        ticker.tick().await;
        self.stats.ticks += 1;
        true
    }

    /// Copies the stream's current frame, if the stream is ready.
    ///
    /// A stream reporting zero dimensions has not delivered its first
    /// frame yet; that tick is skipped without error.
    pub fn sample<S: VideoStream>(&mut self, stream: &mut S) -> Option<FrameBuffer> {
        if stream.dimensions().is_empty() {
            self.stats.skipped += 1;
            tracing::trace!("Stream not ready, skipping tick");
            return None;
        }

        match stream.read_frame() {
            Ok(frame) => {
                self.stats.sampled += 1;
                tracing::trace!(
                    sequence = frame.sequence(),
                    width = frame.width(),
                    height = frame.height(),
                    "Sampled frame"
                );
                Some(frame)
            }
            Err(e) => {
                self.stats.read_failures += 1;
                tracing::debug!(error = %e, "Frame read failed, skipping tick");
                None
            }
        }
    }

    /// Waits for ticks until a frame can be sampled.
    ///
    /// Returns `None` once the sampler is disarmed.
    pub async fn next_frame<S: VideoStream>(&mut self, stream: &mut S) -> Option<FrameBuffer> {
        while self.tick().await {
            if let Some(frame) = self.sample(stream) {
                return Some(frame);
            }
        }
        None
    }
}
