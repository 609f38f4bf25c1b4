//! The focus engine: timer, monitoring, escalation, alerts and summaries.
//!
//! Single-owner and synchronous. Every operation takes the current time and
//! returns the [`EngineEvent`]s it produced, in order. Watchdogs are attached
//! exactly while the timer is `Running` a Work session; [`FocusEngine::sync_monitoring`]
//! runs after every transition, whichever path caused it.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::alert::{Alert, AlertDispatcher, Notifier, Permission};
use crate::config::EngineConfig;
use crate::monitor::{DistractionMonitor, EventReceiver};
use crate::streak::StreakEscalator;
use crate::summary::{SessionEnd, SessionFacts, SessionSummary, SessionSummaryAggregator};
use crate::timer::{SessionTimer, TickOutcome};
use crate::types::{DistractionEvent, SessionKind, SessionStatus, Severity};
use crate::watchdog::InputSignal;

/// Something the host may want to render or act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    StatusChanged {
        status: SessionStatus,
        kind: SessionKind,
    },
    Tick {
        remaining_secs: u32,
    },
    Distraction {
        event: DistractionEvent,
        severity: Severity,
        streak: u32,
    },
    AlertRaised(Alert),
    AlertDismissed(Alert),
    /// The user came back after a long absence.
    RefocusPrompt {
        away: Duration,
    },
    ShortcutBlocked {
        attempts: u32,
    },
    PermissionResolved(Permission),
    SessionFinished(SessionSummary),
}

/// Response to an input signal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignalResponse {
    /// The platform's default action for the input must be prevented.
    pub suppress_default: bool,
    pub events: Vec<EngineEvent>,
}

/// Point-in-time view for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub status: SessionStatus,
    pub kind: SessionKind,
    pub planned_secs: u32,
    pub remaining_secs: u32,
    pub alert: Option<Alert>,
    pub streak: u32,
    pub blocked_attempts: u32,
    pub monitoring: bool,
    pub do_not_disturb: bool,
}

#[derive(Debug)]
pub struct FocusEngine {
    config: EngineConfig,
    timer: SessionTimer,
    monitor: DistractionMonitor,
    streak_rx: EventReceiver,
    log_rx: EventReceiver,
    streak: StreakEscalator,
    alerts: AlertDispatcher,
    summary: SessionSummaryAggregator,
}

impl FocusEngine {
    pub fn new(config: EngineConfig, notifier: Box<dyn Notifier>) -> Self {
        let mut monitor = DistractionMonitor::new(&config);
        let streak_rx = monitor.subscribe();
        let log_rx = monitor.subscribe();
        Self {
            timer: SessionTimer::new(),
            streak: StreakEscalator::new(&config),
            alerts: AlertDispatcher::new(&config, notifier),
            summary: SessionSummaryAggregator::new(config.score_penalty),
            monitor,
            streak_rx,
            log_rx,
            config,
        }
    }

    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub const fn status(&self) -> SessionStatus {
        self.timer.status()
    }

    pub const fn kind(&self) -> SessionKind {
        self.timer.kind()
    }

    pub fn snapshot(&self) -> Snapshot {
        let monitoring = self.monitor.is_attached();
        Snapshot {
            status: self.timer.status(),
            kind: self.timer.kind(),
            planned_secs: self.timer.planned_secs(),
            remaining_secs: self.timer.remaining_secs(),
            alert: self.alerts.active().cloned(),
            streak: self.streak.count(),
            blocked_attempts: self.monitor.blocked_attempts(),
            monitoring,
            do_not_disturb: monitoring && self.config.do_not_disturb,
        }
    }

    pub fn start(
        &mut self,
        kind: SessionKind,
        duration_secs: u32,
        now: DateTime<Utc>,
    ) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        if self.timer.start(kind, duration_secs) {
            tracing::info!(%kind, duration_secs, "session started");
            self.begin_session(now, &mut events);
        }
        events
    }

    /// Enters `Running` with part of the session already elapsed elsewhere.
    pub fn resume_at(
        &mut self,
        kind: SessionKind,
        planned_secs: u32,
        remaining_secs: u32,
        now: DateTime<Utc>,
    ) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        if self.timer.resume_at(kind, planned_secs, remaining_secs) {
            tracing::info!(%kind, planned_secs, remaining_secs, "session resumed from remote");
            self.begin_session(now, &mut events);
        }
        events
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        if self.timer.pause() {
            self.transitioned(now, &mut events);
        }
        events
    }

    pub fn resume(&mut self, now: DateTime<Utc>) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        if self.timer.resume() {
            self.transitioned(now, &mut events);
        }
        events
    }

    /// Abandons the session and reports its summary.
    pub fn stop(&mut self, now: DateTime<Utc>) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        let focused_secs = self.timer.elapsed_secs();
        if !self.timer.stop() {
            return events;
        }
        tracing::info!(kind = %self.timer.kind(), focused_secs, "session stopped");
        self.transitioned(now, &mut events);
        self.finish_session(SessionEnd::Stopped, focused_secs, now, &mut events);
        events
    }

    /// Returns to `Idle` from anywhere, discarding all session state.
    pub fn reset(&mut self, now: DateTime<Utc>) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        let before = self.timer.status();
        self.timer.reset();
        self.sync_monitoring(now, &mut events);
        self.streak_rx.drain();
        self.log_rx.drain();
        self.streak.reset();
        self.summary.clear();
        self.monitor.reset_session();
        if let Some(alert) = self.alerts.dismiss() {
            events.push(EngineEvent::AlertDismissed(alert));
        }
        if before != SessionStatus::Idle {
            tracing::info!(from = %before, "session reset");
            events.push(self.status_event());
        }
        events
    }

    /// Leaves `Completed` once the user has seen the summary.
    pub fn acknowledge(&mut self, now: DateTime<Utc>) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        if self.timer.acknowledge() {
            self.transitioned(now, &mut events);
        }
        events
    }

    /// Advances the countdown by one second and services timers.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        self.monitor.poll(now);
        self.process_distractions(&mut events);

        match self.timer.tick() {
            TickOutcome::Ignored => {}
            TickOutcome::Counting { remaining_secs } => {
                events.push(EngineEvent::Tick { remaining_secs });
            }
            TickOutcome::Completed => {
                events.push(EngineEvent::Tick { remaining_secs: 0 });
                tracing::info!(kind = %self.timer.kind(), "session completed");
                self.transitioned(now, &mut events);
                let focused_secs = self.timer.planned_secs();
                self.finish_session(SessionEnd::Completed, focused_secs, now, &mut events);
                self.notify_completion();
            }
        }

        if let Some(alert) = self.alerts.expire(now) {
            events.push(EngineEvent::AlertDismissed(alert));
        }
        events
    }

    pub fn handle_signal(&mut self, signal: &InputSignal, now: DateTime<Utc>) -> SignalResponse {
        let outcome = self.monitor.handle(signal, now);
        let mut events = Vec::new();
        if let Some(attempts) = outcome.blocked_attempts {
            events.push(EngineEvent::ShortcutBlocked { attempts });
        }
        if let Some(away) = outcome.refocus_after {
            events.push(EngineEvent::RefocusPrompt { away });
        }
        self.process_distractions(&mut events);
        SignalResponse {
            suppress_default: outcome.suppress_default,
            events,
        }
    }

    fn begin_session(&mut self, now: DateTime<Utc>, events: &mut Vec<EngineEvent>) {
        if self.timer.kind() == SessionKind::Work {
            self.streak.reset();
        }
        self.summary.begin();
        self.monitor.reset_session();
        if let Some(alert) = self.alerts.dismiss() {
            events.push(EngineEvent::AlertDismissed(alert));
        }
        self.transitioned(now, events);
    }

    fn transitioned(&mut self, now: DateTime<Utc>, events: &mut Vec<EngineEvent>) {
        events.push(self.status_event());
        self.sync_monitoring(now, events);
    }

    /// Attaches watchdogs on entering Running+Work and detaches on any exit.
    fn sync_monitoring(&mut self, now: DateTime<Utc>, events: &mut Vec<EngineEvent>) {
        let should_monitor =
            self.timer.status() == SessionStatus::Running && self.timer.kind() == SessionKind::Work;
        if should_monitor {
            if self.monitor.attach(now) {
                if let Some(permission) = self.alerts.ensure_permission() {
                    events.push(EngineEvent::PermissionResolved(permission));
                }
            }
        } else if self.monitor.detach() {
            // Events published before detaching still belong to this session.
            self.process_distractions(events);
        }
    }

    fn process_distractions(&mut self, events: &mut Vec<EngineEvent>) {
        let quiet = self.config.do_not_disturb;
        for event in self.streak_rx.drain() {
            let severity = self.streak.record(&event);
            events.push(EngineEvent::Distraction {
                event,
                severity,
                streak: self.streak.count(),
            });
            let raised = self
                .alerts
                .raise(event.kind.as_str(), severity, event.timestamp, quiet);
            events.push(EngineEvent::AlertRaised(raised.alert));
        }
        for event in self.log_rx.drain() {
            self.summary.record(event);
        }
    }

    fn finish_session(
        &mut self,
        end: SessionEnd,
        focused_secs: u32,
        now: DateTime<Utc>,
        events: &mut Vec<EngineEvent>,
    ) {
        let facts = SessionFacts {
            kind: self.timer.kind(),
            planned_secs: self.timer.planned_secs(),
            focused_secs,
            end,
            ended_at: now,
        };
        if let Some(summary) = self.summary.finish(facts) {
            events.push(EngineEvent::SessionFinished(summary));
        }
    }

    fn notify_completion(&mut self) {
        if !self.config.notify_on_complete {
            return;
        }
        let body = match self.timer.kind() {
            SessionKind::Work => format!(
                "Session complete. Blocked {} distraction attempts.",
                self.monitor.blocked_attempts()
            ),
            SessionKind::Break => "Break is over. Ready to focus?".to_string(),
        };
        self.alerts.notify("Focus", &body);
    }

    fn status_event(&self) -> EngineEvent {
        EngineEvent::StatusChanged {
            status: self.timer.status(),
            kind: self.timer.kind(),
        }
    }
}
