//! Task records as exchanged with the backend.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-assigned task identifier.
///
/// Immutable once assigned; the client never mints one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(u64);

impl TaskId {
    /// Wraps a raw identifier received from the server.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// A user-owned to-do record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Server-assigned identifier.
    pub id: TaskId,
    /// Non-empty title.
    pub title: String,
    /// Optional free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Creation time as recorded by the server.
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Description text, or an empty string when the task has none.
    #[must_use]
    pub fn description_text(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }
}

/// Body of the create and update task requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskBody {
    /// Task title; validated non-empty by the client before sending.
    pub title: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
}
