//! Host notification hooks.

use super::{ErrorKind, ScannerState};
use crate::payload::TeacherStatus;

type StateHook = Box<dyn FnMut(&ScannerState)>;
type DetectedHook = Box<dyn FnMut(&str)>;
type VerifiedHook = Box<dyn FnMut(&TeacherStatus)>;
type ErrorHook = Box<dyn FnMut(ErrorKind, &str)>;

/// Callbacks a host screen registers on a controller.
///
/// Every hook is optional. Hooks run synchronously on the controller's
/// task and must not block.
#[derive(Default)]
pub struct ScanCallbacks {
    on_state_change: Option<StateHook>,
    on_detected: Option<DetectedHook>,
    on_verified: Option<VerifiedHook>,
    on_error: Option<ErrorHook>,
}

impl ScanCallbacks {
    /// Called on every state transition.
    pub fn on_state_change(mut self, hook: impl FnMut(&ScannerState) + 'static) -> Self {
        self.on_state_change = Some(Box::new(hook));
        self
    }

    /// Called once when a teacher code is read, for a haptic or visual
    /// cue. Codes that are not teacher codes never trigger it.
    pub fn on_detected(mut self, hook: impl FnMut(&str) + 'static) -> Self {
        self.on_detected = Some(Box::new(hook));
        self
    }

    /// Called once per verified scan.
    pub fn on_verified(mut self, hook: impl FnMut(&TeacherStatus) + 'static) -> Self {
        self.on_verified = Some(Box::new(hook));
        self
    }

    /// Called once per transition into an error. The string is a
    /// diagnostic reason; [`ErrorKind::message`] is the text to show.
    pub fn on_error(mut self, hook: impl FnMut(ErrorKind, &str) + 'static) -> Self {
        self.on_error = Some(Box::new(hook));
        self
    }

    pub(crate) fn state_changed(&mut self, state: &ScannerState) {
        if let Some(hook) = self.on_state_change.as_mut() {
            hook(state);
        }
    }

    pub(crate) fn detected(&mut self, text: &str) {
        if let Some(hook) = self.on_detected.as_mut() {
            hook(text);
        }
    }

    pub(crate) fn verified(&mut self, status: &TeacherStatus) {
        if let Some(hook) = self.on_verified.as_mut() {
            hook(status);
        }
    }

    pub(crate) fn error(&mut self, kind: ErrorKind, reason: &str) {
        if let Some(hook) = self.on_error.as_mut() {
            hook(kind, reason);
        }
    }
}

impl std::fmt::Debug for ScanCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanCallbacks")
            .field("on_state_change", &self.on_state_change.is_some())
            .field("on_detected", &self.on_detected.is_some())
            .field("on_verified", &self.on_verified.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}
