//! Distraction clustering and severity escalation.

use chrono::{DateTime, Duration, Utc};

use crate::config::EngineConfig;
use crate::types::{DistractionEvent, Severity};

/// Current run of clustered distractions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakState {
    pub count: u32,
    pub last_event_timestamp: DateTime<Utc>,
}

/// Tracks how tightly distractions cluster in time.
///
/// An event within `window` of the previous one extends the streak; anything
/// later starts a new streak of one.
#[derive(Debug, Clone)]
pub struct StreakEscalator {
    window: Duration,
    critical_at: u32,
    state: Option<StreakState>,
}

impl StreakEscalator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            window: config.streak_window(),
            critical_at: config.critical_streak,
            state: None,
        }
    }

    pub const fn state(&self) -> Option<StreakState> {
        self.state
    }

    pub fn count(&self) -> u32 {
        self.state.map_or(0, |state| state.count)
    }

    pub fn reset(&mut self) {
        self.state = None;
    }

    pub fn record(&mut self, event: &DistractionEvent) -> Severity {
        let count = match self.state {
            Some(prev) if event.timestamp - prev.last_event_timestamp < self.window => {
                prev.count.saturating_add(1)
            }
            _ => 1,
        };
        self.state = Some(StreakState {
            count,
            last_event_timestamp: event.timestamp,
        });
        self.severity()
    }

    pub fn severity(&self) -> Severity {
        if self.count() >= self.critical_at {
            Severity::Critical
        } else {
            Severity::Warning
        }
    }
}
