//! Keeps the local engine consistent with the remote session record.
//!
//! Remote failures never block the local session. Only Work sessions are
//! mirrored remotely; Break sessions run purely locally.

use std::future::Future;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};

use crate::engine::{EngineEvent, FocusEngine, SignalResponse};
use crate::remote::{RemoteError, RemoteSession, SessionApi};
use crate::summary::SessionEnd;
use crate::types::{FocusSession, SessionKind, SessionStatus};
use crate::watchdog::InputSignal;

async fn bounded<T>(
    limit: Option<StdDuration>,
    call: impl Future<Output = Result<T, RemoteError>>,
) -> Result<T, RemoteError> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .unwrap_or_else(|_| Err(RemoteError::Timeout(limit))),
        None => call.await,
    }
}

/// Owns the session record and drives the engine alongside the remote.
#[derive(Debug)]
pub struct SessionReconciler<A> {
    engine: FocusEngine,
    remote: Option<A>,
    timeout: Option<StdDuration>,
    session: FocusSession,
    /// The remote acknowledged a session that we still need to end.
    remote_bound: bool,
}

impl<A: SessionApi> SessionReconciler<A> {
    /// `remote: None` runs fully offline. `timeout: None` waits indefinitely
    /// on remote calls.
    pub fn new(engine: FocusEngine, remote: Option<A>, timeout: Option<StdDuration>) -> Self {
        Self {
            engine,
            remote,
            timeout,
            session: FocusSession::default(),
            remote_bound: false,
        }
    }

    pub const fn engine(&self) -> &FocusEngine {
        &self.engine
    }

    pub const fn session(&self) -> &FocusSession {
        &self.session
    }

    pub const fn is_remote_bound(&self) -> bool {
        self.remote_bound
    }

    /// Adopts a session that is already running remotely, if any.
    pub async fn mount(&mut self, now: DateTime<Utc>) -> Vec<EngineEvent> {
        if self.engine.status() != SessionStatus::Idle {
            return Vec::new();
        }
        let Some(remote) = self.remote.as_ref() else {
            return Vec::new();
        };
        let found = bounded(self.timeout, remote.active_session()).await;
        match found {
            Ok(Some(existing)) => self.adopt(existing, now).await,
            Ok(None) => {
                tracing::debug!("no remote session to resume");
                Vec::new()
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to query remote session, starting fresh");
                Vec::new()
            }
        }
    }

    pub async fn start(
        &mut self,
        kind: SessionKind,
        duration_minutes: u32,
        now: DateTime<Utc>,
    ) -> Vec<EngineEvent> {
        if self.engine.status() != SessionStatus::Idle || duration_minutes == 0 {
            tracing::debug!(status = %self.engine.status(), "ignoring start");
            return Vec::new();
        }
        let planned_secs = duration_minutes.saturating_mul(60);
        let local = FocusSession {
            id: None,
            start_time: Some(now),
            planned_duration_seconds: planned_secs,
            kind,
            status: SessionStatus::Running,
        };

        let mut outcome = self.open_remote(kind, duration_minutes).await;
        let stale = matches!(
            &outcome,
            Some(Err(RemoteError::AlreadyActive { existing: Some(existing) }))
                if existing.remaining_secs(now) == 0
        );
        if stale {
            tracing::info!("remote session already over, closing it and starting again");
            self.remote_bound = true;
            self.end_remote(true).await;
            outcome = self.open_remote(kind, duration_minutes).await;
        }

        match outcome {
            Some(Ok(created)) => {
                tracing::info!(session_id = %created.id, "remote session started");
                self.remote_bound = true;
                self.session = FocusSession {
                    id: Some(created.id),
                    start_time: Some(created.start_time),
                    ..local
                };
            }
            Some(Err(RemoteError::AlreadyActive {
                existing: Some(existing),
            })) if !stale => {
                tracing::info!(session_id = %existing.id, "remote session already active, resuming it");
                return self.adopt(existing, now).await;
            }
            Some(Err(RemoteError::AlreadyActive { existing: None })) if !stale => {
                tracing::info!("remote session already active, continuing locally");
                self.remote_bound = true;
                self.session = local;
            }
            Some(Err(err)) => {
                tracing::warn!(error = %err, "failed to start remote session, continuing locally");
                self.remote_bound = false;
                self.session = local;
            }
            None => {
                self.remote_bound = false;
                self.session = local;
            }
        }

        let events = self.engine.start(kind, planned_secs, now);
        self.sync_status();
        events
    }

    pub async fn stop(&mut self, now: DateTime<Utc>) -> Vec<EngineEvent> {
        let events = self.engine.stop(now);
        self.sync_status();
        if !events.is_empty() {
            self.end_remote(false).await;
        }
        events
    }

    /// Discards the session. A remotely mirrored session is ended as aborted.
    pub async fn reset(&mut self, now: DateTime<Utc>) -> Vec<EngineEvent> {
        let was_live = matches!(
            self.engine.status(),
            SessionStatus::Running | SessionStatus::Paused
        );
        let events = self.engine.reset(now);
        self.sync_status();
        if was_live {
            self.end_remote(false).await;
        }
        self.remote_bound = false;
        events
    }

    pub async fn tick(&mut self, now: DateTime<Utc>) -> Vec<EngineEvent> {
        let events = self.engine.tick(now);
        self.sync_status();
        let completed = events.iter().any(|event| {
            matches!(event, EngineEvent::SessionFinished(summary) if summary.end == SessionEnd::Completed)
        });
        if completed {
            self.end_remote(true).await;
        }
        events
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> Vec<EngineEvent> {
        let events = self.engine.pause(now);
        self.sync_status();
        events
    }

    pub fn resume(&mut self, now: DateTime<Utc>) -> Vec<EngineEvent> {
        let events = self.engine.resume(now);
        self.sync_status();
        events
    }

    pub fn acknowledge(&mut self, now: DateTime<Utc>) -> Vec<EngineEvent> {
        let events = self.engine.acknowledge(now);
        self.sync_status();
        events
    }

    pub fn handle_signal(&mut self, signal: &InputSignal, now: DateTime<Utc>) -> SignalResponse {
        self.engine.handle_signal(signal, now)
    }

    /// Only Work sessions are opened remotely.
    async fn open_remote(
        &self,
        kind: SessionKind,
        duration_minutes: u32,
    ) -> Option<Result<RemoteSession, RemoteError>> {
        match (kind, self.remote.as_ref()) {
            (SessionKind::Work, Some(remote)) => {
                Some(bounded(self.timeout, remote.start_session(duration_minutes)).await)
            }
            _ => None,
        }
    }

    async fn adopt(&mut self, existing: RemoteSession, now: DateTime<Utc>) -> Vec<EngineEvent> {
        let remaining = existing.remaining_secs(now);
        if remaining == 0 {
            tracing::info!(session_id = %existing.id, "remote session already over, closing it");
            self.remote_bound = true;
            self.end_remote(true).await;
            return Vec::new();
        }
        let planned_secs = existing.planned_secs();
        let events = self
            .engine
            .resume_at(SessionKind::Work, planned_secs, remaining, now);
        self.remote_bound = true;
        self.session = FocusSession {
            id: Some(existing.id),
            start_time: Some(existing.start_time),
            planned_duration_seconds: planned_secs,
            kind: SessionKind::Work,
            status: SessionStatus::Running,
        };
        self.sync_status();
        events
    }

    async fn end_remote(&mut self, completed: bool) {
        if !self.remote_bound {
            return;
        }
        self.remote_bound = false;
        let Some(remote) = self.remote.as_ref() else {
            return;
        };
        match bounded(self.timeout, remote.end_session(completed)).await {
            Ok(()) => tracing::info!(completed, "remote session ended"),
            Err(err) => tracing::warn!(error = %err, completed, "failed to end remote session"),
        }
    }

    fn sync_status(&mut self) {
        self.session.status = self.engine.status();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use super::*;
    use crate::alert::SilentNotifier;
    use crate::config::EngineConfig;
    use crate::types::SessionId;

    #[derive(Debug, Default)]
    struct FakeApi {
        start_results: RefCell<VecDeque<Result<RemoteSession, RemoteError>>>,
        active: RefCell<Option<RemoteSession>>,
        starts: RefCell<Vec<u32>>,
        ends: RefCell<Vec<bool>>,
        hang: bool,
    }

    impl FakeApi {
        fn starting_with(result: Result<RemoteSession, RemoteError>) -> Self {
            let api = Self::default();
            api.start_results.borrow_mut().push_back(result);
            api
        }
    }

    impl SessionApi for &FakeApi {
        async fn start_session(&self, duration_minutes: u32) -> Result<RemoteSession, RemoteError> {
            if self.hang {
                std::future::pending::<()>().await;
            }
            self.starts.borrow_mut().push(duration_minutes);
            self.start_results
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(RemoteError::Unavailable("no scripted result".into())))
        }

        async fn end_session(&self, completed: bool) -> Result<(), RemoteError> {
            self.ends.borrow_mut().push(completed);
            self.active.borrow_mut().take();
            Ok(())
        }

        async fn active_session(&self) -> Result<Option<RemoteSession>, RemoteError> {
            Ok(self.active.borrow().clone())
        }
    }

    fn t(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    fn remote_session(id: &str, start: DateTime<Utc>, minutes: u32) -> RemoteSession {
        RemoteSession {
            id: SessionId::new(id).unwrap(),
            start_time: start,
            planned_minutes: minutes,
        }
    }

    fn reconciler(api: &FakeApi) -> SessionReconciler<&FakeApi> {
        let engine = FocusEngine::new(EngineConfig::default(), Box::new(SilentNotifier));
        SessionReconciler::new(engine, Some(api), None)
    }

    #[tokio::test]
    async fn successful_start_adopts_remote_id() {
        let api = FakeApi::starting_with(Ok(remote_session("abc", t(0), 25)));
        let mut rec = reconciler(&api);
        rec.start(SessionKind::Work, 25, t(0)).await;
        assert_eq!(rec.session().id, Some(SessionId::new("abc").unwrap()));
        assert_eq!(rec.session().status, SessionStatus::Running);
        assert_eq!(api.starts.borrow().as_slice(), [25]);
    }

    #[tokio::test]
    async fn already_active_resumes_without_error() {
        let existing = remote_session("live", t(0), 25);
        let api = FakeApi::starting_with(Err(RemoteError::AlreadyActive {
            existing: Some(existing),
        }));
        let mut rec = reconciler(&api);
        let events = rec.start(SessionKind::Work, 50, t(300)).await;
        assert!(!events.is_empty());
        assert_eq!(rec.engine().status(), SessionStatus::Running);
        assert_eq!(rec.engine().snapshot().remaining_secs, 1200);
        assert_eq!(rec.session().id, Some(SessionId::new("live").unwrap()));
        assert!(rec.is_remote_bound());
    }

    #[tokio::test]
    async fn already_active_without_details_runs_local_duration() {
        let api = FakeApi::starting_with(Err(RemoteError::AlreadyActive { existing: None }));
        let mut rec = reconciler(&api);
        rec.start(SessionKind::Work, 25, t(0)).await;
        assert_eq!(rec.engine().status(), SessionStatus::Running);
        assert_eq!(rec.engine().snapshot().remaining_secs, 1500);
        rec.stop(t(10)).await;
        assert_eq!(api.ends.borrow().as_slice(), [false]);
    }

    #[tokio::test]
    async fn network_failure_still_starts_locally() {
        let api = FakeApi::starting_with(Err(RemoteError::Unavailable("connection refused".into())));
        let mut rec = reconciler(&api);
        rec.start(SessionKind::Work, 25, t(0)).await;
        assert_eq!(rec.engine().status(), SessionStatus::Running);
        assert_eq!(rec.session().id, None);
        rec.stop(t(5)).await;
        assert!(api.ends.borrow().is_empty());
    }

    #[tokio::test]
    async fn hung_remote_is_bounded_by_timeout() {
        let api = FakeApi {
            hang: true,
            ..FakeApi::default()
        };
        let engine = FocusEngine::new(EngineConfig::default(), Box::new(SilentNotifier));
        let mut rec = SessionReconciler::new(engine, Some(&api), Some(StdDuration::from_millis(10)));
        rec.start(SessionKind::Work, 25, t(0)).await;
        assert_eq!(rec.engine().status(), SessionStatus::Running);
        assert!(!rec.is_remote_bound());
    }

    #[tokio::test]
    async fn break_sessions_stay_local() {
        let api = FakeApi::default();
        let mut rec = reconciler(&api);
        rec.start(SessionKind::Break, 5, t(0)).await;
        rec.stop(t(1)).await;
        assert!(api.starts.borrow().is_empty());
        assert!(api.ends.borrow().is_empty());
    }

    #[tokio::test]
    async fn completion_ends_remote_session_once() {
        let api = FakeApi::starting_with(Ok(remote_session("abc", t(0), 1)));
        let mut rec = reconciler(&api);
        rec.start(SessionKind::Work, 1, t(0)).await;
        for second in 1..=60 {
            rec.tick(t(second)).await;
        }
        assert_eq!(rec.session().status, SessionStatus::Completed);
        rec.tick(t(61)).await;
        rec.stop(t(62)).await;
        assert_eq!(api.ends.borrow().as_slice(), [true]);
    }

    #[tokio::test]
    async fn repeated_stop_ends_remote_once() {
        let api = FakeApi::starting_with(Ok(remote_session("abc", t(0), 25)));
        let mut rec = reconciler(&api);
        rec.start(SessionKind::Work, 25, t(0)).await;
        rec.stop(t(10)).await;
        let after_first = rec.session().clone();
        assert!(rec.stop(t(11)).await.is_empty());
        assert_eq!(rec.session(), &after_first);
        assert_eq!(api.ends.borrow().as_slice(), [false]);
    }

    #[tokio::test]
    async fn mount_resumes_active_remote_session() {
        let api = FakeApi::default();
        *api.active.borrow_mut() = Some(remote_session("live", t(0), 25));
        let mut rec = reconciler(&api);
        let events = rec.mount(t(600)).await;
        assert!(events.contains(&EngineEvent::StatusChanged {
            status: SessionStatus::Running,
            kind: SessionKind::Work,
        }));
        assert_eq!(rec.engine().snapshot().remaining_secs, 900);
        assert!(rec.engine().snapshot().monitoring);
    }

    #[tokio::test]
    async fn mount_closes_expired_remote_session() {
        let api = FakeApi::default();
        *api.active.borrow_mut() = Some(remote_session("stale", t(0), 25));
        let mut rec = reconciler(&api);
        assert!(rec.mount(t(4_000)).await.is_empty());
        assert_eq!(rec.engine().status(), SessionStatus::Idle);
        assert_eq!(api.ends.borrow().as_slice(), [true]);
    }

    #[tokio::test]
    async fn expired_conflict_is_closed_and_restarted() {
        let api = FakeApi::starting_with(Err(RemoteError::AlreadyActive {
            existing: Some(remote_session("stale", t(0), 25)),
        }));
        api.start_results
            .borrow_mut()
            .push_back(Ok(remote_session("fresh", t(4_000), 25)));
        let mut rec = reconciler(&api);
        let events = rec.start(SessionKind::Work, 25, t(4_000)).await;
        assert!(!events.is_empty());
        assert_eq!(rec.engine().status(), SessionStatus::Running);
        assert_eq!(rec.engine().snapshot().remaining_secs, 1500);
        assert_eq!(rec.session().id, Some(SessionId::new("fresh").unwrap()));
        assert!(rec.is_remote_bound());
        assert_eq!(api.ends.borrow().as_slice(), [true]);
        assert_eq!(api.starts.borrow().as_slice(), [25, 25]);
    }

    #[tokio::test]
    async fn expired_conflict_runs_locally_when_restart_fails() {
        let stale = || RemoteError::AlreadyActive {
            existing: Some(remote_session("stale", t(0), 25)),
        };
        let api = FakeApi::starting_with(Err(stale()));
        api.start_results.borrow_mut().push_back(Err(stale()));
        let mut rec = reconciler(&api);
        rec.start(SessionKind::Work, 25, t(4_000)).await;
        assert_eq!(rec.engine().status(), SessionStatus::Running);
        assert_eq!(rec.engine().snapshot().remaining_secs, 1500);
        assert_eq!(rec.session().id, None);
        assert!(!rec.is_remote_bound());
        assert_eq!(api.ends.borrow().as_slice(), [true]);
    }

    #[tokio::test]
    async fn reset_aborts_live_remote_session() {
        let api = FakeApi::starting_with(Ok(remote_session("abc", t(0), 25)));
        let mut rec = reconciler(&api);
        rec.start(SessionKind::Work, 25, t(0)).await;
        rec.reset(t(1)).await;
        assert_eq!(rec.session().status, SessionStatus::Idle);
        assert_eq!(api.ends.borrow().as_slice(), [false]);
    }

    #[tokio::test]
    async fn offline_reconciler_never_calls_remote() {
        let engine = FocusEngine::new(EngineConfig::default(), Box::new(SilentNotifier));
        let mut rec: SessionReconciler<&FakeApi> = SessionReconciler::new(engine, None, None);
        assert!(rec.mount(t(0)).await.is_empty());
        rec.start(SessionKind::Work, 25, t(0)).await;
        assert_eq!(rec.engine().status(), SessionStatus::Running);
    }
}
