//! Payload interpretation and verification.
//!
//! Decoded text is parsed into a [`StructuredPayload`]; valid payloads
//! are handed to a [`StatusVerifier`], the external collaborator that
//! knows each teacher's current [`TeacherStatus`].

mod interpreter;
mod status;
mod structured;
mod verify;

pub use interpreter::ResultInterpreter;
pub use status::{Availability, TeacherStatus};
pub use structured::{InvalidPayload, StructuredPayload};
pub use verify::{DirectoryError, DirectoryVerifier, StatusVerifier, VerificationError, VerifyFuture};
