//! Verification collaborator.
//!
//! Verification itself lives in the directory backend; the scanner
//! only needs one asynchronous call that turns a payload into a status.

use super::{StructuredPayload, TeacherStatus};
use futures::future::{self, LocalBoxFuture};
use futures::FutureExt;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Verification failures. Both carry a reason for display.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// Network error, server error or timeout.
    #[error("verification service unreachable: {0}")]
    Unreachable(String),
    /// The service answered but did not recognise the payload.
    #[error("payload rejected: {0}")]
    Rejected(String),
}

/// Future returned by [`StatusVerifier::verify`].
pub type VerifyFuture = LocalBoxFuture<'static, Result<TeacherStatus, VerificationError>>;

/// Turns a scanned payload into the teacher's current status.
pub trait StatusVerifier {
    /// Starts verification of `payload`.
    fn verify(&self, payload: StructuredPayload) -> VerifyFuture;
}

impl<F> StatusVerifier for F
where
    F: Fn(StructuredPayload) -> VerifyFuture,
{
    fn verify(&self, payload: StructuredPayload) -> VerifyFuture {
        self(payload)
    }
}

/// Errors loading a directory file.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("failed to read directory file: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse directory file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Deserialize)]
struct DirectoryFile {
    #[serde(default, rename = "teacher")]
    teachers: Vec<TeacherStatus>,
}

/// In-memory status directory.
///
/// Answers immediately; unknown identifiers are rejected. Loaded from
/// a TOML file of `[[teacher]]` tables for offline demos.
#[derive(Debug, Clone, Default)]
pub struct DirectoryVerifier {
    entries: HashMap<String, TeacherStatus>,
}

impl DirectoryVerifier {
    /// Creates a directory from status records.
    pub fn new(statuses: impl IntoIterator<Item = TeacherStatus>) -> Self {
        Self {
            entries: statuses
                .into_iter()
                .map(|s| (s.teacher_id.clone(), s))
                .collect(),
        }
    }

    /// Parses a TOML directory.
    pub fn from_toml_str(content: &str) -> Result<Self, DirectoryError> {
        let file: DirectoryFile = toml::from_str(content)?;
        Ok(Self::new(file.teachers))
    }

    /// Loads a TOML directory file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DirectoryError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Number of teachers in the directory.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the directory is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl StatusVerifier for DirectoryVerifier {
    fn verify(&self, payload: StructuredPayload) -> VerifyFuture {
        let result = self
            .entries
            .get(&payload.id)
            .cloned()
            .ok_or_else(|| VerificationError::Rejected(format!("unknown teacher {}", payload.id)));
        future::ready(result).boxed_local()
    }
}
