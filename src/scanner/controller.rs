//! The scan controller state machine.

use super::callbacks::ScanCallbacks;
use super::config::ScannerConfig;
use super::guard::RescanGuard;
use super::{ErrorKind, ScanResult, ScanStats, ScannerState};
use crate::camera::{CameraBackend, CameraSessionManager, DevicePreference};
use crate::decode::{DecodeEngine, Decoded, SymbolDecoder};
use crate::payload::{
    ResultInterpreter, StatusVerifier, TeacherStatus, VerificationError, VerifyFuture,
};
use crate::sampling::FrameSampler;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::Timeout;

/// The one verification call a controller may have outstanding.
struct InFlight {
    text: String,
    teacher: String,
    call: Pin<Box<Timeout<VerifyFuture>>>,
}

/// Builder for [`ScanController`].
pub struct ScanControllerBuilder<B, D, V> {
    backend: B,
    decoder: D,
    verifier: V,
    config: ScannerConfig,
    preference: Option<DevicePreference>,
    callbacks: ScanCallbacks,
}

impl<B, D, V> ScanControllerBuilder<B, D, V>
where
    B: CameraBackend,
    D: SymbolDecoder,
    V: StatusVerifier,
{
    /// Applies a configuration. Its camera section supplies the device
    /// preference unless [`preference`](Self::preference) is also set.
    pub fn config(mut self, config: ScannerConfig) -> Self {
        self.config = config;
        self
    }

    /// Overrides the device preference.
    pub fn preference(mut self, preference: DevicePreference) -> Self {
        self.preference = Some(preference);
        self
    }

    /// See [`ScanCallbacks::on_state_change`].
    pub fn on_state_change(mut self, hook: impl FnMut(&ScannerState) + 'static) -> Self {
        self.callbacks = self.callbacks.on_state_change(hook);
        self
    }

    /// See [`ScanCallbacks::on_detected`].
    pub fn on_detected(mut self, hook: impl FnMut(&str) + 'static) -> Self {
        self.callbacks = self.callbacks.on_detected(hook);
        self
    }

    /// See [`ScanCallbacks::on_verified`].
    pub fn on_verified(mut self, hook: impl FnMut(&TeacherStatus) + 'static) -> Self {
        self.callbacks = self.callbacks.on_verified(hook);
        self
    }

    /// See [`ScanCallbacks::on_error`].
    pub fn on_error(mut self, hook: impl FnMut(ErrorKind, &str) + 'static) -> Self {
        self.callbacks = self.callbacks.on_error(hook);
        self
    }

    /// Builds an idle controller. Nothing is acquired until `start()`.
    pub fn build(self) -> ScanController<B, D, V> {
        let config = self.config;
        ScanController {
            camera: CameraSessionManager::with_resolution(
                self.backend,
                config.camera.resolution(),
            ),
            sampler: FrameSampler::new(config.sampling.interval()),
            engine: DecodeEngine::new(self.decoder),
            interpreter: ResultInterpreter::new(self.verifier),
            callbacks: self.callbacks,
            guard: RescanGuard::new(config.verification.cooldown()),
            preference: self
                .preference
                .unwrap_or_else(|| config.camera.preference()),
            last_device: None,
            verify_timeout: config.verification.timeout(),
            close_on_success: config.camera.close_on_success,
            state: ScannerState::Idle,
            in_flight: None,
            switch_queued: false,
            stats: ScanStats::default(),
        }
    }
}

/// Orchestrates camera, sampler, decoder and verification.
///
/// The first decoded code wins: a hit stops sampling and moves the
/// controller to `Processing`, so one physical code held in view for
/// many ticks yields exactly one verification call. `stop()` releases
/// everything from any state, and dropping the controller does the same.
///
/// Driving is cooperative: the host awaits [`next_result`](Self::next_result)
/// (typically in a `select!` with its own events) and calls the
/// synchronous mutators in between.
pub struct ScanController<B, D, V>
where
    B: CameraBackend,
    D: SymbolDecoder,
    V: StatusVerifier,
{
    camera: CameraSessionManager<B>,
    sampler: FrameSampler,
    engine: DecodeEngine<D>,
    interpreter: ResultInterpreter<V>,
    callbacks: ScanCallbacks,
    guard: RescanGuard,
    preference: DevicePreference,
    last_device: Option<String>,
    verify_timeout: Duration,
    close_on_success: bool,
    state: ScannerState,
    in_flight: Option<InFlight>,
    switch_queued: bool,
    stats: ScanStats,
}

impl<B, D, V> ScanController<B, D, V>
where
    B: CameraBackend,
    D: SymbolDecoder,
    V: StatusVerifier,
{
    /// Starts building a controller from its collaborators.
    pub fn builder(backend: B, decoder: D, verifier: V) -> ScanControllerBuilder<B, D, V> {
        ScanControllerBuilder {
            backend,
            decoder,
            verifier,
            config: ScannerConfig::default(),
            preference: None,
            callbacks: ScanCallbacks::default(),
        }
    }

    /// Current state.
    pub fn state(&self) -> ScannerState {
        self.state
    }

    /// Returns true while the controller holds or is acquiring the camera
    /// for an unfinished attempt.
    pub fn is_active(&self) -> bool {
        matches!(
            self.state,
            ScannerState::RequestingPermission | ScannerState::Scanning | ScannerState::Processing
        )
    }

    /// The camera session manager.
    pub fn camera(&self) -> &CameraSessionManager<B> {
        &self.camera
    }

    /// The camera session manager, mutably (device enumeration).
    pub fn camera_mut(&mut self) -> &mut CameraSessionManager<B> {
        &mut self.camera
    }

    /// The device preference the next `start()` will use.
    pub fn preference(&self) -> &DevicePreference {
        &self.preference
    }

    /// Activity counters.
    pub fn stats(&self) -> ScanStats {
        let sampler = self.sampler.stats();
        let decode = self.engine.stats();
        ScanStats {
            sessions_opened: self.camera.sessions_opened(),
            session_open: self.camera.is_open(),
            frames_sampled: sampler.sampled,
            frames_skipped: sampler.skipped + sampler.read_failures,
            decode_hits: decode.hits,
            decode_failures: decode.failures + decode.panics,
            ..self.stats
        }
    }

    /// Starts a scan attempt.
    ///
    /// From `Success` or `Error` this begins a fresh attempt. While an
    /// attempt is already running it does nothing. Acquisition errors are
    /// reported through `on_error` and returned.
    pub fn start(&mut self) -> Result<(), ErrorKind> {
        match self.state {
            ScannerState::RequestingPermission
            | ScannerState::Scanning
            | ScannerState::Processing => {
                tracing::debug!(state = ?self.state, "start() ignored, attempt already running");
                return Ok(());
            }
            ScannerState::Success | ScannerState::Error(_) => self.release(),
            ScannerState::Idle => {}
        }

        self.stats.attempts += 1;
        self.guard.clear();
        self.transition(ScannerState::RequestingPermission);

        match self.camera.open(&self.preference) {
            Ok(session) => {
                tracing::info!(
                    attempt = self.stats.attempts,
                    device = %session.device_id(),
                    "Scanning started"
                );
                self.last_device = Some(session.device_id().to_string());
                self.transition(ScannerState::Scanning);
                self.sampler.start();
                Ok(())
            }
            Err(e) => {
                let kind = ErrorKind::from(&e);
                self.fail(kind, &e.to_string());
                Err(kind)
            }
        }
    }

    /// Stops scanning and releases the camera, from any state.
    ///
    /// An in-flight verification is abandoned. Calling this when already
    /// idle does nothing.
    pub fn stop(&mut self) {
        let queued = self.switch_queued;
        self.release();
        if self.state != ScannerState::Idle {
            tracing::info!(from = ?self.state, "Scanner stopped");
            self.transition(ScannerState::Idle);
        }
        // A switch requested mid-verification still applies to the next start
        if queued {
            self.rotate_preference();
        }
    }

    /// Alias for [`stop`](Self::stop).
    pub fn cancel(&mut self) {
        self.stop();
    }

    /// Toggles between cameras (front/back where known).
    ///
    /// While scanning this switches immediately. While a code is being
    /// verified the request is queued until scanning resumes. Otherwise
    /// it only changes which camera the next `start()` opens.
    pub fn switch_camera(&mut self) -> Result<(), ErrorKind> {
        match self.state {
            ScannerState::Scanning => self.perform_switch(),
            ScannerState::Processing | ScannerState::RequestingPermission => {
                tracing::debug!("Camera switch queued until scanning resumes");
                self.switch_queued = true;
                Ok(())
            }
            ScannerState::Idle | ScannerState::Success | ScannerState::Error(_) => {
                self.rotate_preference();
                Ok(())
            }
        }
    }

    /// Processes the next event of the running attempt.
    ///
    /// While scanning this waits for the next sampled frame and decodes
    /// it; while processing it waits for the verification outcome.
    /// Returns `None` when nothing is running. Dropping the returned
    /// future never loses or repeats a verification call.
    pub async fn next_result(&mut self) -> Option<ScanResult> {
        match self.state {
            ScannerState::Scanning => self.scan_tick().await,
            ScannerState::Processing => self.settle().await,
            _ => None,
        }
    }

    /// Drives the attempt until it succeeds, fails terminally or is stopped.
    pub async fn run_until_settled(&mut self) -> ScannerState {
        while self.next_result().await.is_some() {}
        self.state
    }

    async fn scan_tick(&mut self) -> Option<ScanResult> {
        let stream = self.camera.session_mut()?.stream_mut()?;
        let frame = self.sampler.next_frame(stream).await?;
        let decoded = self.engine.decode(&frame);
        Some(self.handle_decoded(decoded))
    }

    fn handle_decoded(&mut self, decoded: Decoded) -> ScanResult {
        let text = match decoded {
            Decoded::Miss => return ScanResult::Miss,
            Decoded::Hit(text) => text,
        };

        if self.guard.is_blocked(&text) {
            self.stats.suppressed_hits += 1;
            tracing::trace!("Ignoring recently rejected code");
            return ScanResult::Miss;
        }

        self.sampler.stop();
        self.transition(ScannerState::Processing);

        match self.interpreter.interpret(&text) {
            Ok(payload) => {
                self.callbacks.detected(&text);
                self.stats.verifications += 1;
                tracing::info!(teacher = %payload.id, "Teacher code detected");
                let teacher = payload.id.clone();
                let call = tokio::time::timeout(self.verify_timeout, self.interpreter.verify(payload));
                self.in_flight = Some(InFlight {
                    text: text.clone(),
                    teacher,
                    call: Box::pin(call),
                });
                ScanResult::Hit(text)
            }
            Err(reason) => {
                self.stats.invalid_payloads += 1;
                tracing::debug!(reason = %reason, "Decoded code is not a teacher code");
                self.guard.block(&text);
                self.resume_scanning();
                ScanResult::Invalid(reason.to_string())
            }
        }
    }

    async fn settle(&mut self) -> Option<ScanResult> {
        let outcome = self.in_flight.as_mut()?.call.as_mut().await;
        let InFlight { text, teacher, .. } = self.in_flight.take()?;

        let error = match outcome {
            Ok(Ok(status)) => return Some(self.succeed(status)),
            Ok(Err(e)) => e,
            Err(_elapsed) => {
                self.stats.verification_timeouts += 1;
                VerificationError::Unreachable(format!(
                    "no response within {} ms",
                    self.verify_timeout.as_millis()
                ))
            }
        };

        self.stats.verification_failures += 1;
        tracing::warn!(teacher = %teacher, error = %error, "Verification failed");
        let reason = error.to_string();
        self.guard.block(&text);
        self.fail(ErrorKind::from(&error), &reason);
        // The camera stays open; the user can simply scan again
        self.resume_scanning();
        Some(ScanResult::VerificationFailed(reason))
    }

    fn succeed(&mut self, status: TeacherStatus) -> ScanResult {
        self.stats.verified += 1;
        tracing::info!(
            teacher = %status.teacher_id,
            availability = %status.availability,
            "Teacher code verified"
        );
        if self.switch_queued {
            tracing::debug!("Dropping queued camera switch, scan finished");
            self.switch_queued = false;
        }
        if self.close_on_success {
            self.camera.close();
        }
        self.transition(ScannerState::Success);
        self.callbacks.verified(&status);
        ScanResult::Verified(status)
    }

    fn resume_scanning(&mut self) {
        self.transition(ScannerState::Scanning);
        self.sampler.start();
        if std::mem::take(&mut self.switch_queued) {
            // failure is already reported through on_error
            let _ = self.perform_switch();
        }
    }

    fn perform_switch(&mut self) -> Result<(), ErrorKind> {
        let current = self.camera.session().map(|s| s.device_id().to_string());
        let Some(next) = self
            .camera
            .next_device(current.as_deref())
            .map(|d| d.id.clone())
        else {
            tracing::debug!(current = ?current, "No other camera to switch to");
            return Ok(());
        };

        self.sampler.stop();
        self.stats.camera_switches += 1;

        match self.camera.switch_to(&next) {
            Ok(_) => {
                self.last_device = Some(next.clone());
                self.preference = DevicePreference::device(next);
                self.sampler.start();
                Ok(())
            }
            Err(e) => {
                let kind = ErrorKind::from(&e);
                self.fail(kind, &e.to_string());
                Err(kind)
            }
        }
    }

    fn rotate_preference(&mut self) {
        if self.camera.devices().is_empty() {
            if let Err(e) = self.camera.list_devices() {
                tracing::debug!(error = %e, "Cannot enumerate cameras to switch");
            }
        }

        let current = self.preference.device_id.clone();
        let flipped = self.preference.facing.and_then(|f| f.opposite());
        self.preference = match (current, flipped) {
            (Some(id), _) => match self.camera.next_device(Some(&id)) {
                Some(device) => DevicePreference::device(device.id.clone()),
                None => return,
            },
            (None, Some(facing)) => DevicePreference::facing(facing),
            // Toggle away from whichever camera the platform picked last
            (None, None) => match self.camera.next_device(self.last_device.as_deref()) {
                Some(device) => DevicePreference::device(device.id.clone()),
                None => return,
            },
        };
        tracing::debug!(preference = ?self.preference, "Camera preference changed");
    }

    /// Enters `Error(kind)`, releasing the camera first for device errors.
    fn fail(&mut self, kind: ErrorKind, reason: &str) {
        if kind.is_device_error() {
            self.release();
        }
        self.stats.errors_reported += 1;
        tracing::warn!(kind = ?kind, reason = %reason, "Scan error");
        self.transition(ScannerState::Error(kind));
        self.callbacks.error(kind, reason);
    }

    fn release(&mut self) {
        self.sampler.stop();
        if self.in_flight.take().is_some() {
            tracing::debug!("Abandoning in-flight verification");
        }
        self.switch_queued = false;
        self.camera.close();
    }

    fn transition(&mut self, next: ScannerState) {
        if self.state == next {
            return;
        }
        tracing::debug!(from = ?self.state, to = ?next, "Scanner state change");
        self.state = next;
        self.callbacks.state_changed(&next);
    }
}

impl<B, D, V> Drop for ScanController<B, D, V>
where
    B: CameraBackend,
    D: SymbolDecoder,
    V: StatusVerifier,
{
    fn drop(&mut self) {
        self.release();
    }
}
