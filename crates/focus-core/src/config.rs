//! Engine tuning knobs.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Thresholds and toggles for the focus engine.
///
/// All durations are milliseconds so the struct maps directly onto config
/// files and `FOCUS_ENGINE__*` environment overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Inactivity before `idle-detected` fires. Default: 180000 (3 minutes).
    pub idle_timeout_ms: i64,

    /// Hidden time that counts as a tab switch; strictly greater than.
    /// Default: 5000.
    pub away_threshold_ms: i64,

    /// Maximum gap between events of one streak. Default: 120000 (2 minutes).
    pub streak_window_ms: i64,

    /// Streak length at which severity becomes critical. Default: 3.
    pub critical_streak: u32,

    /// Lifetime of a warning alert. Default: 4000.
    pub warning_alert_ms: i64,

    /// Lifetime of a critical alert. Default: 6000.
    pub critical_alert_ms: i64,

    /// Focus score points lost per distraction. Default: 5.
    pub score_penalty: u32,

    /// Emit a local notification when a session completes.
    pub notify_on_complete: bool,

    /// Suppress sound and notifications while a Work session runs.
    pub do_not_disturb: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            idle_timeout_ms: 180_000,
            away_threshold_ms: 5_000,
            streak_window_ms: 120_000,
            critical_streak: 3,
            warning_alert_ms: 4_000,
            critical_alert_ms: 6_000,
            score_penalty: 5,
            notify_on_complete: true,
            do_not_disturb: false,
        }
    }
}

impl EngineConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::milliseconds(self.idle_timeout_ms)
    }

    pub fn away_threshold(&self) -> Duration {
        Duration::milliseconds(self.away_threshold_ms)
    }

    pub fn streak_window(&self) -> Duration {
        Duration::milliseconds(self.streak_window_ms)
    }
}
