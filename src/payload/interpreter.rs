//! Result interpretation: decoded text to verified status.

use super::{InvalidPayload, StatusVerifier, StructuredPayload, VerifyFuture};

/// Parses decoded text and forwards valid payloads to the verifier.
///
/// Verifier outcomes are relayed unchanged; deciding what a failure
/// means for the scan is the controller's job.
#[derive(Debug, Clone)]
pub struct ResultInterpreter<V> {
    verifier: V,
}

impl<V: StatusVerifier> ResultInterpreter<V> {
    /// Creates an interpreter delegating to `verifier`.
    pub fn new(verifier: V) -> Self {
        Self { verifier }
    }

    /// Parses decoded text into a payload.
    pub fn interpret(&self, text: &str) -> Result<StructuredPayload, InvalidPayload> {
        StructuredPayload::parse(text)
    }

    /// Starts verification of a parsed payload.
    pub fn verify(&self, payload: StructuredPayload) -> VerifyFuture {
        tracing::debug!(teacher = %payload.id, "Verifying scanned payload");
        self.verifier.verify(payload)
    }

    /// The wrapped verifier.
    pub fn verifier(&self) -> &V {
        &self.verifier
    }
}
