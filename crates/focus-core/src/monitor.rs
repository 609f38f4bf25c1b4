//! Fuses watchdog output into a single distraction stream.
//!
//! Watchdogs exist only while the monitor is attached. Consumers receive
//! events through their own [`EventReceiver`]; each receiver sees every event
//! in publication order.

use chrono::{DateTime, Duration, Utc};
use tokio::sync::mpsc;

use crate::config::EngineConfig;
use crate::types::{DistractionEvent, DistractionKind};
use crate::watchdog::{
    IdleWatchdog, InputSignal, ShortcutInterceptor, ShortcutVerdict, VisibilityWatchdog,
};

/// Receiving end of a monitor subscription.
#[derive(Debug)]
pub struct EventReceiver(mpsc::UnboundedReceiver<DistractionEvent>);

impl EventReceiver {
    /// Takes every event published so far, oldest first.
    pub fn drain(&mut self) -> Vec<DistractionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.0.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Side effects the host must perform for a signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignalOutcome {
    /// Prevent the platform's default action for this key press.
    pub suppress_default: bool,
    /// Show a refocus prompt; carries how long the user was away.
    pub refocus_after: Option<Duration>,
    /// Total blocked shortcut attempts this session, when one was just blocked.
    pub blocked_attempts: Option<u32>,
}

#[derive(Debug)]
struct Watchdogs {
    idle: IdleWatchdog,
    visibility: VisibilityWatchdog,
}

#[derive(Debug)]
pub struct DistractionMonitor {
    idle_timeout: Duration,
    away_threshold: Duration,
    watchdogs: Option<Watchdogs>,
    shortcuts: ShortcutInterceptor,
    subscribers: Vec<mpsc::UnboundedSender<DistractionEvent>>,
}

impl DistractionMonitor {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            idle_timeout: config.idle_timeout(),
            away_threshold: config.away_threshold(),
            watchdogs: None,
            shortcuts: ShortcutInterceptor::new(),
            subscribers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self) -> EventReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        EventReceiver(rx)
    }

    pub const fn is_attached(&self) -> bool {
        self.watchdogs.is_some()
    }

    pub const fn blocked_attempts(&self) -> u32 {
        self.shortcuts.blocked_attempts()
    }

    /// Arms every watchdog. Returns `false` if already attached.
    pub fn attach(&mut self, now: DateTime<Utc>) -> bool {
        if self.watchdogs.is_some() {
            return false;
        }
        self.watchdogs = Some(Watchdogs {
            idle: IdleWatchdog::new(self.idle_timeout, now),
            visibility: VisibilityWatchdog::new(self.away_threshold),
        });
        tracing::debug!("distraction watchdogs attached");
        true
    }

    /// Drops every watchdog, including any half-measured absence.
    pub fn detach(&mut self) -> bool {
        if self.watchdogs.take().is_none() {
            return false;
        }
        tracing::debug!("distraction watchdogs detached");
        true
    }

    /// Clears per-session counters. Watchdog attachment is unaffected.
    pub fn reset_session(&mut self) {
        self.shortcuts = ShortcutInterceptor::new();
    }

    pub fn handle(&mut self, signal: &InputSignal, now: DateTime<Utc>) -> SignalOutcome {
        let mut outcome = SignalOutcome::default();
        let Some(watchdogs) = self.watchdogs.as_mut() else {
            return outcome;
        };

        let mut emitted = None;
        match signal {
            InputSignal::Hidden => watchdogs.visibility.hidden(now),
            InputSignal::Visible => {
                if let Some(report) = watchdogs.visibility.visible(now) {
                    if let Some(event) = report.event {
                        outcome.refocus_after = Some(report.away);
                        emitted = Some(event);
                    }
                }
            }
            InputSignal::PointerMove => watchdogs.idle.activity(now),
            InputSignal::KeyDown(press) => {
                watchdogs.idle.activity(now);
                if let ShortcutVerdict::Blocked(event) = self.shortcuts.key_down(press, now) {
                    outcome.suppress_default = true;
                    outcome.blocked_attempts = Some(self.shortcuts.blocked_attempts());
                    emitted = Some(event);
                }
            }
            InputSignal::RapidSwitching => {
                emitted = Some(DistractionEvent::new(DistractionKind::RapidSwitching, now));
            }
        }

        if let Some(event) = emitted {
            self.publish(event);
        }
        outcome
    }

    /// Lets time-driven watchdogs fire. Returns how many events were published.
    pub fn poll(&mut self, now: DateTime<Utc>) -> usize {
        let Some(watchdogs) = self.watchdogs.as_mut() else {
            return 0;
        };
        match watchdogs.idle.poll(now) {
            Some(event) => {
                self.publish(event);
                1
            }
            None => 0,
        }
    }

    fn publish(&mut self, event: DistractionEvent) {
        tracing::debug!(kind = %event.kind, timestamp = %event.timestamp, "distraction detected");
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watchdog::KeyPress;

    fn t(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    fn monitor() -> DistractionMonitor {
        DistractionMonitor::new(&EngineConfig::default())
    }

    #[test]
    fn detached_monitor_emits_nothing() {
        let mut monitor = monitor();
        let mut rx = monitor.subscribe();
        monitor.handle(&InputSignal::Hidden, t(0));
        let outcome = monitor.handle(&InputSignal::Visible, t(60));
        let shortcut = monitor.handle(&InputSignal::KeyDown(KeyPress::ctrl("t")), t(61));
        monitor.handle(&InputSignal::RapidSwitching, t(62));
        assert_eq!(monitor.poll(t(10_000)), 0);
        assert_eq!(outcome, SignalOutcome::default());
        assert!(!shortcut.suppress_default);
        assert!(rx.drain().is_empty());
        assert_eq!(monitor.blocked_attempts(), 0);
    }

    #[test]
    fn every_subscriber_sees_every_event_in_order() {
        let mut monitor = monitor();
        let mut streak = monitor.subscribe();
        let mut log = monitor.subscribe();
        monitor.attach(t(0));
        monitor.handle(&InputSignal::KeyDown(KeyPress::ctrl("n")), t(1));
        monitor.handle(&InputSignal::RapidSwitching, t(2));

        let kinds = |events: Vec<DistractionEvent>| {
            events.into_iter().map(|e| e.kind).collect::<Vec<_>>()
        };
        let expected = vec![
            DistractionKind::KeyboardShortcut,
            DistractionKind::RapidSwitching,
        ];
        assert_eq!(kinds(streak.drain()), expected);
        assert_eq!(kinds(log.drain()), expected);
    }

    #[test]
    fn dropped_subscriber_is_pruned() {
        let mut monitor = monitor();
        let dropped = monitor.subscribe();
        let mut kept = monitor.subscribe();
        drop(dropped);
        monitor.attach(t(0));
        monitor.handle(&InputSignal::RapidSwitching, t(1));
        assert_eq!(monitor.subscribers.len(), 1);
        assert_eq!(kept.drain().len(), 1);
    }

    #[test]
    fn tab_switch_raises_refocus_prompt() {
        let mut monitor = monitor();
        let mut rx = monitor.subscribe();
        monitor.attach(t(0));
        monitor.handle(&InputSignal::Hidden, t(10));
        let outcome = monitor.handle(&InputSignal::Visible, t(16));
        assert_eq!(outcome.refocus_after, Some(Duration::seconds(6)));
        assert_eq!(rx.drain().len(), 1);

        monitor.handle(&InputSignal::Hidden, t(20));
        let outcome = monitor.handle(&InputSignal::Visible, t(23));
        assert_eq!(outcome.refocus_after, None);
        assert!(rx.drain().is_empty());
    }

    #[test]
    fn detach_discards_pending_absence() {
        let mut monitor = monitor();
        let mut rx = monitor.subscribe();
        monitor.attach(t(0));
        monitor.handle(&InputSignal::Hidden, t(1));
        monitor.detach();
        monitor.attach(t(100));
        monitor.handle(&InputSignal::Visible, t(101));
        assert!(rx.drain().is_empty());
    }

    #[test]
    fn idle_watchdog_rearms_from_attach_time() {
        let mut monitor = monitor();
        let mut rx = monitor.subscribe();
        monitor.attach(t(0));
        monitor.handle(&InputSignal::PointerMove, t(100));
        assert_eq!(monitor.poll(t(279)), 0);
        assert_eq!(monitor.poll(t(280)), 1);
        assert_eq!(rx.drain()[0].kind, DistractionKind::IdleDetected);
    }

    #[test]
    fn blocked_attempts_survive_reattach() {
        let mut monitor = monitor();
        monitor.attach(t(0));
        let outcome = monitor.handle(&InputSignal::KeyDown(KeyPress::ctrl("t")), t(1));
        assert!(outcome.suppress_default);
        assert_eq!(outcome.blocked_attempts, Some(1));
        monitor.detach();
        monitor.attach(t(5));
        monitor.handle(&InputSignal::KeyDown(KeyPress::ctrl("t")), t(6));
        assert_eq!(monitor.blocked_attempts(), 2);
        monitor.reset_session();
        assert_eq!(monitor.blocked_attempts(), 0);
    }
}
