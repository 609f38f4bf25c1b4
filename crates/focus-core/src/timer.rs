//! Countdown state machine.
//!
//! `Idle -> Running -> {Paused, Completed} -> Idle`. The timer knows nothing
//! about wall-clock time: the host calls [`SessionTimer::tick`] once per second
//! while it wants time to pass, and pausing simply stops those ticks from
//! counting.

use crate::types::{SessionKind, SessionStatus};

/// Result of a single one-second tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Timer is not running; nothing changed.
    Ignored,
    /// One second elapsed; this many remain.
    Counting { remaining_secs: u32 },
    /// The countdown just reached zero.
    Completed,
}

/// Local countdown for one session at a time.
#[derive(Debug, Clone, Default)]
pub struct SessionTimer {
    status: SessionStatus,
    kind: SessionKind,
    planned_secs: u32,
    remaining_secs: u32,
}

impl SessionTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn status(&self) -> SessionStatus {
        self.status
    }

    pub const fn kind(&self) -> SessionKind {
        self.kind
    }

    pub const fn planned_secs(&self) -> u32 {
        self.planned_secs
    }

    pub const fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    /// Seconds that have counted down so far.
    pub const fn elapsed_secs(&self) -> u32 {
        self.planned_secs.saturating_sub(self.remaining_secs)
    }

    /// Starts a countdown. Only valid from `Idle` with a non-zero duration.
    pub fn start(&mut self, kind: SessionKind, duration_secs: u32) -> bool {
        if self.status != SessionStatus::Idle || duration_secs == 0 {
            tracing::debug!(status = %self.status, duration_secs, "ignoring start");
            return false;
        }
        *self = Self {
            status: SessionStatus::Running,
            kind,
            planned_secs: duration_secs,
            remaining_secs: duration_secs,
        };
        true
    }

    /// Enters `Running` directly with time already elapsed elsewhere.
    ///
    /// Used when a remote session is adopted. `remaining_secs` is clamped to
    /// `planned_secs`; a zero remainder is refused.
    pub fn resume_at(&mut self, kind: SessionKind, planned_secs: u32, remaining_secs: u32) -> bool {
        if self.status != SessionStatus::Idle || remaining_secs == 0 {
            tracing::debug!(status = %self.status, remaining_secs, "ignoring resume_at");
            return false;
        }
        let planned_secs = planned_secs.max(remaining_secs);
        *self = Self {
            status: SessionStatus::Running,
            kind,
            planned_secs,
            remaining_secs,
        };
        true
    }

    pub fn pause(&mut self) -> bool {
        if self.status != SessionStatus::Running {
            tracing::debug!(status = %self.status, "ignoring pause");
            return false;
        }
        self.status = SessionStatus::Paused;
        true
    }

    pub fn resume(&mut self) -> bool {
        if self.status != SessionStatus::Paused {
            tracing::debug!(status = %self.status, "ignoring resume");
            return false;
        }
        self.status = SessionStatus::Running;
        true
    }

    /// Abandons an in-progress session and restores the configured duration.
    pub fn stop(&mut self) -> bool {
        if !matches!(self.status, SessionStatus::Running | SessionStatus::Paused) {
            tracing::debug!(status = %self.status, "ignoring stop");
            return false;
        }
        self.status = SessionStatus::Idle;
        self.remaining_secs = self.planned_secs;
        true
    }

    /// Leaves `Completed` once its summary has been acknowledged.
    pub fn acknowledge(&mut self) -> bool {
        if self.status != SessionStatus::Completed {
            return false;
        }
        self.status = SessionStatus::Idle;
        self.remaining_secs = self.planned_secs;
        true
    }

    /// Forces `Idle` from any state.
    pub fn reset(&mut self) {
        self.status = SessionStatus::Idle;
        self.remaining_secs = self.planned_secs;
    }

    pub fn tick(&mut self) -> TickOutcome {
        if self.status != SessionStatus::Running {
            return TickOutcome::Ignored;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.status = SessionStatus::Completed;
            TickOutcome::Completed
        } else {
            TickOutcome::Counting {
                remaining_secs: self.remaining_secs,
            }
        }
    }
}
