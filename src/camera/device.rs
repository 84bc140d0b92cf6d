//! Capture device descriptors and preference resolution.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which physical side of the device a camera faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingHint {
    /// User-facing camera.
    Front,
    /// Environment-facing camera.
    Back,
    /// Facing could not be determined.
    #[default]
    Unknown,
}

impl FacingHint {
    /// Infers the facing of a camera from its human label.
    ///
    /// Platforms rarely report facing directly; labels such as
    /// "Back Camera" or "camera2 1, facing front" are the usual source.
    pub fn from_label(label: &str) -> Self {
        let label = label.to_lowercase();
        if ["back", "rear", "environment", "world"]
            .iter()
            .any(|k| label.contains(k))
        {
            FacingHint::Back
        } else if ["front", "user", "face", "selfie"]
            .iter()
            .any(|k| label.contains(k))
        {
            FacingHint::Front
        } else {
            FacingHint::Unknown
        }
    }

    /// Returns the opposite side, if this hint names one.
    pub fn opposite(self) -> Option<Self> {
        match self {
            FacingHint::Front => Some(FacingHint::Back),
            FacingHint::Back => Some(FacingHint::Front),
            FacingHint::Unknown => None,
        }
    }
}

impl fmt::Display for FacingHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FacingHint::Front => write!(f, "front"),
            FacingHint::Back => write!(f, "back"),
            FacingHint::Unknown => write!(f, "unknown"),
        }
    }
}

/// An enumerated capture device.
///
/// Snapshots are immutable; the manager replaces the whole list when
/// it re-enumerates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraDevice {
    /// Platform identifier used to open the device.
    pub id: String,
    /// Human readable label. May be blank before permission is granted.
    pub label: String,
    /// Facing hint reported by the platform or inferred from the label.
    pub facing: FacingHint,
}

impl CameraDevice {
    /// Creates a device, inferring its facing from the label.
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            id: id.into(),
            facing: FacingHint::from_label(&label),
            label,
        }
    }

    /// Creates a device with an explicit facing hint.
    pub fn with_facing(id: impl Into<String>, label: impl Into<String>, facing: FacingHint) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            facing,
        }
    }

    /// Returns true if this device matches the requested facing.
    ///
    /// The reported facing wins; the label is consulted only when the
    /// platform left it unknown.
    pub fn matches_facing(&self, hint: FacingHint) -> bool {
        if hint == FacingHint::Unknown {
            return false;
        }
        match self.facing {
            FacingHint::Unknown => FacingHint::from_label(&self.label) == hint,
            facing => facing == hint,
        }
    }
}

/// Caller preference for which device to open.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevicePreference {
    /// Explicit device identifier. Takes precedence over `facing`.
    #[serde(default)]
    pub device_id: Option<String>,
    /// Preferred facing.
    #[serde(default)]
    pub facing: Option<FacingHint>,
}

impl DevicePreference {
    /// Prefer a specific device.
    pub fn device(id: impl Into<String>) -> Self {
        Self {
            device_id: Some(id.into()),
            facing: None,
        }
    }

    /// Prefer a camera facing the given side.
    pub fn facing(facing: FacingHint) -> Self {
        Self {
            device_id: None,
            facing: Some(facing),
        }
    }
}
