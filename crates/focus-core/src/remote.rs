//! Contract for the remote session record.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::SessionId;

/// Remote collaborator failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The server already has a running session for this user.
    #[error("a focus session is already active")]
    AlreadyActive { existing: Option<RemoteSession> },
    /// Network or transport failure.
    #[error("remote unavailable: {0}")]
    Unavailable(String),
    /// No answer within the configured bound.
    #[error("remote call timed out after {0:?}")]
    Timeout(std::time::Duration),
    /// The server answered with an error.
    #[error("remote error: {0}")]
    Api(String),
    /// The response could not be understood.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// A session as recorded by the remote collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSession {
    pub id: SessionId,
    pub start_time: DateTime<Utc>,
    pub planned_minutes: u32,
}

impl RemoteSession {
    pub fn planned_secs(&self) -> u32 {
        self.planned_minutes.saturating_mul(60)
    }

    /// Seconds left at `now`; zero once the planned duration has passed.
    ///
    /// Paused time is not recorded remotely, so a session paused before a
    /// restart resumes with less time than it had locally.
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> u32 {
        let elapsed = (now - self.start_time).max(Duration::zero()).num_seconds();
        let remaining = i64::from(self.planned_secs()) - elapsed;
        u32::try_from(remaining.max(0)).unwrap_or(0)
    }
}

/// Remote session bookkeeping.
///
/// Implementations must make `end_session` idempotent: ending when nothing is
/// active succeeds without effect.
#[allow(async_fn_in_trait)]
pub trait SessionApi {
    async fn start_session(&self, duration_minutes: u32) -> Result<RemoteSession, RemoteError>;

    async fn end_session(&self, completed: bool) -> Result<(), RemoteError>;

    async fn active_session(&self) -> Result<Option<RemoteSession>, RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(start: &str, minutes: u32) -> RemoteSession {
        RemoteSession {
            id: SessionId::new("s-1").unwrap(),
            start_time: start.parse().unwrap(),
            planned_minutes: minutes,
        }
    }

    #[test]
    fn remaining_time_counts_from_remote_start() {
        let remote = session("2025-01-01T10:00:00Z", 25);
        let now = "2025-01-01T10:10:30Z".parse().unwrap();
        assert_eq!(remote.remaining_secs(now), 870);
    }

    #[test]
    fn remaining_time_never_negative() {
        let remote = session("2025-01-01T10:00:00Z", 25);
        let now = "2025-01-01T11:00:00Z".parse().unwrap();
        assert_eq!(remote.remaining_secs(now), 0);
    }

    #[test]
    fn clock_skew_does_not_extend_session() {
        let remote = session("2025-01-01T10:00:10Z", 25);
        let now = "2025-01-01T10:00:00Z".parse().unwrap();
        assert_eq!(remote.remaining_secs(now), 1500);
    }
}
