//! In-app alerts and system notifications.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::config::EngineConfig;
use crate::types::Severity;

/// Vibration pattern for critical alerts, in milliseconds (on, off, on).
pub const CRITICAL_VIBRATION_MS: [u64; 3] = [200, 100, 200];

/// Outcome of a notification permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Granted,
    Denied,
    /// The user dismissed the prompt without deciding.
    #[default]
    Default,
}

/// System-level notification capability supplied by the host.
pub trait Notifier {
    fn request_permission(&mut self) -> Permission;

    fn show(&mut self, title: &str, body: &str);

    /// Pulses the device if the platform can. Returns whether it did.
    fn vibrate(&mut self, _pattern_ms: &[u64]) -> bool {
        false
    }
}

/// A notifier that never shows anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn request_permission(&mut self) -> Permission {
        Permission::Denied
    }

    fn show(&mut self, _title: &str, _body: &str) {}
}

/// Looks up the user-facing message for an alert kind.
pub fn message_for(kind: &str) -> &'static str {
    match kind {
        "tab-switch" => "You left the focus window. Time to get back to it.",
        "keyboard-shortcut" => "New tabs and windows are blocked during focus time.",
        "idle-detected" => "Still there? No activity for a while.",
        "rapid-switching" => "Rapid switching detected. Pick one task and stay with it.",
        _ => "Distraction detected. Stay focused.",
    }
}

/// A visible in-app alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub kind: String,
    pub message: &'static str,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// What happened when an alert was raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaisedAlert {
    pub alert: Alert,
    /// The alert this one replaced, if one was still visible.
    pub superseded: Option<Alert>,
    pub system_notified: bool,
    pub vibrated: bool,
}

/// Owns the single visible alert and the notification channel.
pub struct AlertDispatcher {
    warning_ttl: Duration,
    critical_ttl: Duration,
    active: Option<Alert>,
    permission: Permission,
    permission_requested: bool,
    notifier: Box<dyn Notifier>,
}

impl fmt::Debug for AlertDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlertDispatcher")
            .field("active", &self.active)
            .field("permission", &self.permission)
            .finish_non_exhaustive()
    }
}

impl AlertDispatcher {
    pub fn new(config: &EngineConfig, notifier: Box<dyn Notifier>) -> Self {
        Self {
            warning_ttl: Duration::milliseconds(config.warning_alert_ms),
            critical_ttl: Duration::milliseconds(config.critical_alert_ms),
            active: None,
            permission: Permission::Default,
            permission_requested: false,
            notifier,
        }
    }

    pub const fn active(&self) -> Option<&Alert> {
        self.active.as_ref()
    }

    pub const fn permission(&self) -> Permission {
        self.permission
    }

    /// Asks for notification permission the first time only.
    ///
    /// Returns the answer when a request was actually made.
    pub fn ensure_permission(&mut self) -> Option<Permission> {
        if self.permission_requested {
            return None;
        }
        self.permission_requested = true;
        self.permission = self.notifier.request_permission();
        if self.permission != Permission::Granted {
            tracing::info!(permission = ?self.permission, "system notifications unavailable, using in-app alerts only");
        }
        Some(self.permission)
    }

    /// Shows a new alert, replacing any visible one.
    ///
    /// Critical alerts also go to the system notifier unless `quiet` is set.
    pub fn raise(
        &mut self,
        kind: &str,
        severity: Severity,
        now: DateTime<Utc>,
        quiet: bool,
    ) -> RaisedAlert {
        let ttl = match severity {
            Severity::Warning => self.warning_ttl,
            Severity::Critical => self.critical_ttl,
        };
        let alert = Alert {
            kind: kind.to_string(),
            message: message_for(kind),
            severity,
            created_at: now,
            expires_at: now + ttl,
        };
        let superseded = self.active.replace(alert.clone());

        let mut system_notified = false;
        let mut vibrated = false;
        if severity == Severity::Critical && !quiet {
            system_notified = self.notify("Focus streak broken", alert.message);
            if system_notified {
                vibrated = self.notifier.vibrate(&CRITICAL_VIBRATION_MS);
            }
        }

        RaisedAlert {
            alert,
            superseded,
            system_notified,
            vibrated,
        }
    }

    /// Sends a system notification if permission was granted.
    pub fn notify(&mut self, title: &str, body: &str) -> bool {
        if self.permission != Permission::Granted {
            tracing::debug!(title, "skipping system notification without permission");
            return false;
        }
        self.notifier.show(title, body);
        true
    }

    /// Removes the visible alert once its lifetime is over.
    pub fn expire(&mut self, now: DateTime<Utc>) -> Option<Alert> {
        if self.active.as_ref().is_some_and(|alert| now >= alert.expires_at) {
            return self.active.take();
        }
        None
    }

    pub fn dismiss(&mut self) -> Option<Alert> {
        self.active.take()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[derive(Default)]
    struct Recorded {
        requests: u32,
        shown: Vec<(String, String)>,
        vibrations: u32,
    }

    struct FakeNotifier {
        answer: Permission,
        can_vibrate: bool,
        log: Rc<RefCell<Recorded>>,
    }

    impl Notifier for FakeNotifier {
        fn request_permission(&mut self) -> Permission {
            self.log.borrow_mut().requests += 1;
            self.answer
        }

        fn show(&mut self, title: &str, body: &str) {
            self.log
                .borrow_mut()
                .shown
                .push((title.to_string(), body.to_string()));
        }

        fn vibrate(&mut self, _pattern_ms: &[u64]) -> bool {
            if self.can_vibrate {
                self.log.borrow_mut().vibrations += 1;
            }
            self.can_vibrate
        }
    }

    fn dispatcher(answer: Permission, can_vibrate: bool) -> (AlertDispatcher, Rc<RefCell<Recorded>>) {
        let log = Rc::new(RefCell::new(Recorded::default()));
        let notifier = FakeNotifier {
            answer,
            can_vibrate,
            log: Rc::clone(&log),
        };
        (
            AlertDispatcher::new(&EngineConfig::default(), Box::new(notifier)),
            log,
        )
    }

    fn t(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(1_700_000_000_000 + millis).unwrap()
    }

    #[test]
    fn unknown_kind_gets_generic_message() {
        assert_eq!(message_for("mystery"), "Distraction detected. Stay focused.");
        assert_ne!(message_for("tab-switch"), message_for("mystery"));
    }

    #[test]
    fn warning_expires_after_four_seconds() {
        let (mut alerts, _) = dispatcher(Permission::Granted, false);
        alerts.raise("tab-switch", Severity::Warning, t(0), false);
        assert_eq!(alerts.expire(t(3_999)), None);
        assert!(alerts.expire(t(4_000)).is_some());
        assert!(alerts.active().is_none());
    }

    #[test]
    fn critical_expires_after_six_seconds() {
        let (mut alerts, _) = dispatcher(Permission::Granted, false);
        alerts.raise("idle-detected", Severity::Critical, t(90_000), false);
        assert_eq!(alerts.expire(t(95_999)), None);
        let expired = alerts.expire(t(96_000)).unwrap();
        assert_eq!(expired.severity, Severity::Critical);
    }

    #[test]
    fn new_alert_supersedes_pending_one() {
        let (mut alerts, _) = dispatcher(Permission::Granted, false);
        alerts.raise("tab-switch", Severity::Warning, t(0), false);
        let raised = alerts.raise("keyboard-shortcut", Severity::Warning, t(3_000), false);
        assert_eq!(raised.superseded.unwrap().kind, "tab-switch");
        // The first alert's deadline no longer applies.
        assert_eq!(alerts.expire(t(4_000)), None);
        assert!(alerts.expire(t(7_000)).is_some());
    }

    #[test]
    fn permission_is_requested_once() {
        let (mut alerts, log) = dispatcher(Permission::Granted, false);
        assert_eq!(alerts.ensure_permission(), Some(Permission::Granted));
        assert_eq!(alerts.ensure_permission(), None);
        assert_eq!(log.borrow().requests, 1);
    }

    #[test]
    fn critical_alert_notifies_and_vibrates_when_granted() {
        let (mut alerts, log) = dispatcher(Permission::Granted, true);
        alerts.ensure_permission();
        let warning = alerts.raise("tab-switch", Severity::Warning, t(0), false);
        assert!(!warning.system_notified);
        let critical = alerts.raise("tab-switch", Severity::Critical, t(1), false);
        assert!(critical.system_notified);
        assert!(critical.vibrated);
        assert_eq!(log.borrow().shown.len(), 1);
        assert_eq!(log.borrow().vibrations, 1);
    }

    #[test]
    fn denied_permission_keeps_in_app_alert() {
        let (mut alerts, log) = dispatcher(Permission::Denied, true);
        alerts.ensure_permission();
        let raised = alerts.raise("tab-switch", Severity::Critical, t(0), false);
        assert!(!raised.system_notified);
        assert!(!raised.vibrated);
        assert!(alerts.active().is_some());
        assert!(log.borrow().shown.is_empty());
    }

    #[test]
    fn quiet_mode_skips_system_channel() {
        let (mut alerts, log) = dispatcher(Permission::Granted, true);
        alerts.ensure_permission();
        let raised = alerts.raise("tab-switch", Severity::Critical, t(0), true);
        assert!(!raised.system_notified);
        assert!(log.borrow().shown.is_empty());
    }
}
