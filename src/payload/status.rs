//! Teacher status records returned by verification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Availability a teacher has set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    /// Free to meet students.
    Available,
    /// In a meeting.
    InMeeting,
    /// Teaching a class.
    InClass,
    /// On leave.
    OnLeave,
    /// Temporarily away from the office.
    Away,
    /// Present but not taking visitors.
    Busy,
    /// Not on campus.
    Offline,
}

impl Availability {
    /// Whether a student can expect to be seen now.
    pub fn is_reachable(self) -> bool {
        matches!(self, Availability::Available)
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Availability::Available => "available",
            Availability::InMeeting => "in a meeting",
            Availability::InClass => "in class",
            Availability::OnLeave => "on leave",
            Availability::Away => "away",
            Availability::Busy => "busy",
            Availability::Offline => "offline",
        };
        f.write_str(text)
    }
}

/// A teacher's current status as known to the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherStatus {
    /// Teacher identifier.
    #[serde(alias = "id")]
    pub teacher_id: String,
    /// Display name.
    pub name: String,
    /// Current availability.
    #[serde(alias = "status")]
    pub availability: Availability,
    /// Free-form note, e.g. a room number or return time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// When the status was last changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl fmt::Display for TeacherStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) is {}", self.name, self.teacher_id, self.availability)?;
        if let Some(note) = &self.note {
            write!(f, ": {}", note)?;
        }
        if let Some(updated_at) = &self.updated_at {
            write!(f, " [since {}]", updated_at.format("%Y-%m-%d %H:%M UTC"))?;
        }
        Ok(())
    }
}
