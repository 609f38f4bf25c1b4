//! End-of-session reduction of the distraction log.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{DistractionEvent, DistractionKind, SessionKind};

/// How a session left the running state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionEnd {
    /// The countdown reached zero.
    Completed,
    /// The user stopped early.
    Stopped,
}

/// Session facts the aggregator needs besides the event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionFacts {
    pub kind: SessionKind,
    pub planned_secs: u32,
    pub focused_secs: u32,
    pub end: SessionEnd,
    pub ended_at: DateTime<Utc>,
}

/// Derived once per session from the distraction log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub total_distractions: u32,
    pub blocked_shortcut_count: u32,
    pub focus_score_percent: u32,
    pub breakdown_by_kind: BTreeMap<DistractionKind, u32>,
    pub kind: SessionKind,
    pub planned_secs: u32,
    pub focused_secs: u32,
    pub end: SessionEnd,
    pub ended_at: DateTime<Utc>,
}

impl SessionSummary {
    pub const fn completed(&self) -> bool {
        matches!(self.end, SessionEnd::Completed)
    }
}

/// Linear focus score: 100 minus a fixed penalty per distraction, floored at 0.
pub const fn focus_score(total_distractions: u32, penalty: u32) -> u32 {
    100_u32.saturating_sub(penalty.saturating_mul(total_distractions))
}

/// Accumulates the session's distraction log and reduces it exactly once.
#[derive(Debug, Clone)]
pub struct SessionSummaryAggregator {
    penalty: u32,
    log: Vec<DistractionEvent>,
    finished: bool,
}

impl SessionSummaryAggregator {
    pub const fn new(penalty: u32) -> Self {
        Self {
            penalty,
            log: Vec::new(),
            finished: false,
        }
    }

    pub fn record(&mut self, event: DistractionEvent) {
        if self.finished {
            tracing::debug!(kind = %event.kind, "dropping distraction after session summary");
            return;
        }
        self.log.push(event);
    }

    pub fn events(&self) -> &[DistractionEvent] {
        &self.log
    }

    /// Produces the summary and clears the log. Later calls return `None`
    /// until [`Self::begin`] opens a new session.
    pub fn finish(&mut self, facts: SessionFacts) -> Option<SessionSummary> {
        if self.finished {
            return None;
        }
        self.finished = true;

        let mut breakdown_by_kind = BTreeMap::new();
        for event in self.log.drain(..) {
            *breakdown_by_kind.entry(event.kind).or_insert(0_u32) += 1;
        }
        let total_distractions = breakdown_by_kind.values().sum();
        let blocked_shortcut_count = breakdown_by_kind
            .get(&DistractionKind::KeyboardShortcut)
            .copied()
            .unwrap_or(0);

        Some(SessionSummary {
            total_distractions,
            blocked_shortcut_count,
            focus_score_percent: focus_score(total_distractions, self.penalty),
            breakdown_by_kind,
            kind: facts.kind,
            planned_secs: facts.planned_secs,
            focused_secs: facts.focused_secs,
            end: facts.end,
            ended_at: facts.ended_at,
        })
    }

    /// Opens a fresh, empty log for a new session.
    pub fn begin(&mut self) {
        self.log.clear();
        self.finished = false;
    }

    /// Discards the log without summarising.
    pub fn clear(&mut self) {
        self.log.clear();
        self.finished = true;
    }
}
