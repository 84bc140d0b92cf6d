//! Shared fixtures for integration tests.

#![allow(dead_code)]

use futures::future::{self, FutureExt};
use image::Luma;
use qrcode::QrCode;
use status_scanner::camera::{CameraBackend, FrameBuffer};
use status_scanner::decode::{DecodeError, SymbolDecoder};
use status_scanner::payload::{
    Availability, DirectoryVerifier, StatusVerifier, StructuredPayload, TeacherStatus,
    VerificationError, VerifyFuture,
};
use status_scanner::scanner::ScanControllerBuilder;
use status_scanner::{ErrorKind, ScannerConfig, ScannerState};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

pub fn teacher(id: &str, name: &str, availability: Availability) -> TeacherStatus {
    TeacherStatus {
        teacher_id: id.to_string(),
        name: name.to_string(),
        availability,
        note: None,
        updated_at: None,
    }
}

pub fn ada() -> TeacherStatus {
    teacher("T-1001", "Ada Lovelace", Availability::Available)
}

pub fn directory() -> DirectoryVerifier {
    DirectoryVerifier::new([
        ada(),
        teacher("T-1002", "Alan Turing", Availability::InClass),
    ])
}

/// QR text for a teacher code.
pub fn code(id: &str) -> String {
    StructuredPayload::new(id).encode()
}

/// Small frames keep long sampling runs cheap.
pub fn fast_config() -> ScannerConfig {
    let mut config = ScannerConfig::default();
    config.camera.width = 64;
    config.camera.height = 48;
    config
}

pub fn render_qr(text: &str, module: u32) -> FrameBuffer {
    let image = QrCode::new(text.as_bytes())
        .unwrap()
        .render::<Luma<u8>>()
        .quiet_zone(true)
        .module_dimensions(module, module)
        .build();
    let (width, height) = (image.width(), image.height());
    FrameBuffer::new(image.into_raw(), width, height, 0)
}

/// Plays back a list of decode outcomes, repeating the last one forever.
#[derive(Debug, Clone)]
pub struct ScriptedDecoder {
    script: VecDeque<Option<String>>,
    last: Option<String>,
}

impl ScriptedDecoder {
    pub fn new<I, S>(script: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        Self {
            script: script.into_iter().map(|s| s.map(Into::into)).collect(),
            last: None,
        }
    }
}

impl SymbolDecoder for ScriptedDecoder {
    fn decode(&mut self, _frame: &FrameBuffer) -> Result<Option<String>, DecodeError> {
        if let Some(next) = self.script.pop_front() {
            self.last = next;
        }
        Ok(self.last.clone())
    }
}

/// How a [`ScriptedVerifier`] answers.
#[derive(Debug, Clone)]
pub enum Reply {
    Status(TeacherStatus),
    After(Duration, TeacherStatus),
    Reject,
    Unreachable,
    Never,
}

/// Verifier that counts calls and answers from a script.
#[derive(Debug, Clone)]
pub struct ScriptedVerifier {
    reply: Reply,
    calls: Rc<Cell<u32>>,
}

impl ScriptedVerifier {
    pub fn new(reply: Reply) -> Self {
        Self {
            reply,
            calls: Rc::new(Cell::new(0)),
        }
    }

    /// Shared call counter; stays valid after the verifier moves into a controller.
    pub fn calls(&self) -> Rc<Cell<u32>> {
        Rc::clone(&self.calls)
    }
}

impl StatusVerifier for ScriptedVerifier {
    fn verify(&self, payload: StructuredPayload) -> VerifyFuture {
        self.calls.set(self.calls.get() + 1);
        match self.reply.clone() {
            Reply::Status(status) => future::ready(Ok(status)).boxed_local(),
            Reply::After(delay, status) => async move {
                tokio::time::sleep(delay).await;
                Ok(status)
            }
            .boxed_local(),
            Reply::Reject => {
                future::ready(Err(VerificationError::Rejected(payload.id))).boxed_local()
            }
            Reply::Unreachable => future::ready(Err(VerificationError::Unreachable(
                "connection refused".to_string(),
            )))
            .boxed_local(),
            Reply::Never => future::pending().boxed_local(),
        }
    }
}

/// Host notification, as seen through the controller callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    State(ScannerState),
    Detected(String),
    Verified(String),
    Error(ErrorKind),
}

/// Records every callback a controller fires.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    events: Rc<RefCell<Vec<Event>>>,
}

impl Recorder {
    pub fn attach<B, D, V>(&self, builder: ScanControllerBuilder<B, D, V>) -> ScanControllerBuilder<B, D, V>
    where
        B: CameraBackend,
        D: SymbolDecoder,
        V: StatusVerifier,
    {
        let states = Rc::clone(&self.events);
        let detected = Rc::clone(&self.events);
        let verified = Rc::clone(&self.events);
        let errors = Rc::clone(&self.events);
        builder
            .on_state_change(move |state| states.borrow_mut().push(Event::State(*state)))
            .on_detected(move |text| detected.borrow_mut().push(Event::Detected(text.to_string())))
            .on_verified(move |status| {
                verified
                    .borrow_mut()
                    .push(Event::Verified(status.teacher_id.clone()))
            })
            .on_error(move |kind, _| errors.borrow_mut().push(Event::Error(kind)))
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn states(&self) -> Vec<ScannerState> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::State(state) => Some(*state),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<ErrorKind> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::Error(kind) => Some(*kind),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&Event) -> bool) -> usize {
        self.events.borrow().iter().filter(|e| predicate(e)).count()
    }
}
