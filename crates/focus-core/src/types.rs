//! Core type definitions with validation.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// Unknown session kind string.
    #[error("invalid session kind: {value}")]
    InvalidSessionKind { value: String },

    /// Unknown distraction kind string.
    #[error("unknown distraction kind: {value}")]
    UnknownDistractionKind { value: String },
}

/// A validated remote session identifier.
///
/// Session IDs are assigned by the remote collaborator and must be non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Creates a new ID after validation.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::Empty {
                field: "session ID",
            });
        }
        Ok(Self(id))
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SessionId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Declared activity of a focus session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    #[default]
    Work,
    Break,
}

impl SessionKind {
    /// String representation for storage and display.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Work => "work",
            Self::Break => "break",
        }
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "work" => Ok(Self::Work),
            "break" => Ok(Self::Break),
            _ => Err(ValidationError::InvalidSessionKind {
                value: s.to_string(),
            }),
        }
    }
}

/// Lifecycle state of the local countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Running,
    Paused,
    Completed,
}

impl SessionStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical distraction kinds, the single source of truth for their strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DistractionKind {
    TabSwitch,
    KeyboardShortcut,
    IdleDetected,
    RapidSwitching,
}

impl DistractionKind {
    /// All kinds, in display order.
    pub const ALL: [Self; 4] = [
        Self::TabSwitch,
        Self::KeyboardShortcut,
        Self::IdleDetected,
        Self::RapidSwitching,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TabSwitch => "tab-switch",
            Self::KeyboardShortcut => "keyboard-shortcut",
            Self::IdleDetected => "idle-detected",
            Self::RapidSwitching => "rapid-switching",
        }
    }
}

impl fmt::Display for DistractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistractionKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tab-switch" => Ok(Self::TabSwitch),
            "keyboard-shortcut" => Ok(Self::KeyboardShortcut),
            "idle-detected" => Ok(Self::IdleDetected),
            "rapid-switching" => Ok(Self::RapidSwitching),
            _ => Err(ValidationError::UnknownDistractionKind {
                value: s.to_string(),
            }),
        }
    }
}

impl Serialize for DistractionKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DistractionKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A discrete signal that attention left the task during a Work session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistractionEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: DistractionKind,
}

impl DistractionEvent {
    pub const fn new(kind: DistractionKind, timestamp: DateTime<Utc>) -> Self {
        Self { timestamp, kind }
    }
}

/// Alert severity computed from distraction clustering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

impl Severity {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The locally tracked session record.
///
/// `id` is `None` until the remote collaborator assigns one, and stays `None`
/// when the remote was unreachable at start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FocusSession {
    pub id: Option<SessionId>,
    pub start_time: Option<DateTime<Utc>>,
    pub planned_duration_seconds: u32,
    pub kind: SessionKind,
    pub status: SessionStatus,
}

/// An entry in the user's advisory list of distracting applications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedApp {
    pub name: String,
    pub category: String,
    pub blocked: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_rejects_blank() {
        assert_eq!(
            SessionId::new("  "),
            Err(ValidationError::Empty {
                field: "session ID"
            })
        );
        assert_eq!(SessionId::new("abc").unwrap().as_str(), "abc");
    }

    #[test]
    fn distraction_kind_strings_parse_back() {
        for kind in DistractionKind::ALL {
            let parsed: DistractionKind = kind.as_str().parse().expect("should parse");
            assert_eq!(parsed, kind);
        }
        let err = "doomscroll".parse::<DistractionKind>().unwrap_err();
        assert_eq!(err.to_string(), "unknown distraction kind: doomscroll");
    }

    #[test]
    fn distraction_event_serializes_kebab_kind() {
        let event = DistractionEvent::new(
            DistractionKind::TabSwitch,
            "2025-01-01T00:00:00Z".parse().unwrap(),
        );
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(
            json,
            r#"{"timestamp":"2025-01-01T00:00:00Z","kind":"tab-switch"}"#
        );
    }

    #[test]
    fn session_kind_parses_lowercase_only() {
        assert_eq!("work".parse::<SessionKind>(), Ok(SessionKind::Work));
        assert_eq!("break".parse::<SessionKind>(), Ok(SessionKind::Break));
        assert!("Work".parse::<SessionKind>().is_err());
    }
}
