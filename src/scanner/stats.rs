//! Counters describing a controller's lifetime activity.

/// A snapshot of scan activity, suitable for metrics export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Scan attempts started.
    pub attempts: u64,
    /// Capture sessions opened.
    pub sessions_opened: u64,
    /// Whether a capture session is open right now.
    pub session_open: bool,
    /// Camera switches performed.
    pub camera_switches: u64,
    /// Frames sampled and decoded.
    pub frames_sampled: u64,
    /// Ticks skipped because the stream was not ready or unreadable.
    pub frames_skipped: u64,
    /// Frames in which a code was decoded.
    pub decode_hits: u64,
    /// Frames the decoder failed on (errors and panics).
    pub decode_failures: u64,
    /// Decoded codes ignored because they were recently rejected.
    pub suppressed_hits: u64,
    /// Decoded codes that were not teacher payloads.
    pub invalid_payloads: u64,
    /// Verification calls issued.
    pub verifications: u64,
    /// Successful verifications.
    pub verified: u64,
    /// Failed verifications, timeouts included.
    pub verification_failures: u64,
    /// Verifications that timed out.
    pub verification_timeouts: u64,
    /// Error notifications delivered to the host.
    pub errors_reported: u64,
}
