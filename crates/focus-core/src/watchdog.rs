//! Input signals and the watchdogs that turn them into distractions.
//!
//! Hosts translate whatever their platform exposes (window visibility, input
//! hooks, a terminal) into [`InputSignal`]s. Each watchdog owns its own state
//! and only ever reports through return values.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};

use crate::types::{DistractionEvent, DistractionKind};

/// A raw signal delivered by an event-source adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSignal {
    /// The application window was hidden (tab switched away, minimised).
    Hidden,
    /// The application window became visible again.
    Visible,
    /// Pointer movement.
    PointerMove,
    /// A key went down.
    KeyDown(KeyPress),
    /// The host observed rapid switching between applications.
    RapidSwitching,
}

/// A key-down event with its modifier state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyPress {
    pub key: String,
    pub ctrl: bool,
    pub meta: bool,
    pub alt: bool,
    pub shift: bool,
}

impl KeyPress {
    pub fn plain(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn ctrl(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ctrl: true,
            ..Self::default()
        }
    }
}

/// Error for unparseable key combinations such as `ctrl+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidKeyCombo(String);

impl fmt::Display for InvalidKeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid key combination: {}", self.0)
    }
}

impl std::error::Error for InvalidKeyCombo {}

impl FromStr for KeyPress {
    type Err = InvalidKeyCombo;

    /// Parses `ctrl+t`, `cmd+shift+n`, `x`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut press = Self::default();
        let mut parts = s.split('+').map(str::trim).peekable();
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                if part.is_empty() {
                    return Err(InvalidKeyCombo(s.to_string()));
                }
                press.key = part.to_string();
                break;
            }
            match part.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => press.ctrl = true,
                "cmd" | "meta" | "super" => press.meta = true,
                "alt" | "option" => press.alt = true,
                "shift" => press.shift = true,
                _ => return Err(InvalidKeyCombo(s.to_string())),
            }
        }
        if press.key.is_empty() {
            return Err(InvalidKeyCombo(s.to_string()));
        }
        Ok(press)
    }
}

/// Fires `idle-detected` after a window with no pointer or key activity.
#[derive(Debug, Clone)]
pub struct IdleWatchdog {
    timeout: Duration,
    armed_at: DateTime<Utc>,
}

impl IdleWatchdog {
    /// Arms the watchdog at `now`.
    pub const fn new(timeout: Duration, now: DateTime<Utc>) -> Self {
        Self {
            timeout,
            armed_at: now,
        }
    }

    /// Any input activity pushes the deadline back.
    pub fn activity(&mut self, now: DateTime<Utc>) {
        self.armed_at = self.armed_at.max(now);
    }

    pub fn deadline(&self) -> DateTime<Utc> {
        self.armed_at + self.timeout
    }

    /// Reports the first deadline that passed by `now` and re-arms at `now`.
    ///
    /// A host that was suspended across several windows gets one event, not
    /// one per missed window.
    pub fn poll(&mut self, now: DateTime<Utc>) -> Option<DistractionEvent> {
        if self.timeout <= Duration::zero() || self.deadline() > now {
            return None;
        }
        let at = self.deadline();
        self.armed_at = now;
        Some(DistractionEvent::new(DistractionKind::IdleDetected, at))
    }
}

/// What the visibility watchdog concluded when the window came back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AwayReport {
    pub away: Duration,
    pub event: Option<DistractionEvent>,
}

/// Measures how long the window stayed hidden.
#[derive(Debug, Clone)]
pub struct VisibilityWatchdog {
    threshold: Duration,
    hidden_since: Option<DateTime<Utc>>,
}

impl VisibilityWatchdog {
    pub const fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            hidden_since: None,
        }
    }

    pub fn hidden(&mut self, now: DateTime<Utc>) {
        // Repeated hide notifications keep the first timestamp.
        self.hidden_since.get_or_insert(now);
    }

    /// Returns `None` if the window was never seen hidden.
    pub fn visible(&mut self, now: DateTime<Utc>) -> Option<AwayReport> {
        let since = self.hidden_since.take()?;
        let away = now - since;
        let event =
            (away > self.threshold).then(|| DistractionEvent::new(DistractionKind::TabSwitch, now));
        Some(AwayReport { away, event })
    }

    pub const fn is_hidden(&self) -> bool {
        self.hidden_since.is_some()
    }
}

/// Verdict for a single key-down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutVerdict {
    /// Not a guarded shortcut; let the platform handle it.
    PassThrough,
    /// Default action must be suppressed.
    Blocked(DistractionEvent),
}

/// Intercepts new-tab and new-window shortcuts.
#[derive(Debug, Clone, Default)]
pub struct ShortcutInterceptor {
    blocked_attempts: u32,
}

impl ShortcutInterceptor {
    pub const fn new() -> Self {
        Self {
            blocked_attempts: 0,
        }
    }

    pub const fn blocked_attempts(&self) -> u32 {
        self.blocked_attempts
    }

    pub fn is_guarded(press: &KeyPress) -> bool {
        (press.ctrl || press.meta)
            && (press.key.eq_ignore_ascii_case("t") || press.key.eq_ignore_ascii_case("n"))
    }

    pub fn key_down(&mut self, press: &KeyPress, now: DateTime<Utc>) -> ShortcutVerdict {
        if !Self::is_guarded(press) {
            return ShortcutVerdict::PassThrough;
        }
        self.blocked_attempts += 1;
        ShortcutVerdict::Blocked(DistractionEvent::new(
            DistractionKind::KeyboardShortcut,
            now,
        ))
    }
}
