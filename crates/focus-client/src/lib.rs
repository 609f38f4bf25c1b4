//! HTTP client for the remote focus session API.
//!
//! Implements [`SessionApi`] against the `/api/focus` routes and exposes the
//! read-only history and statistics endpoints.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use focus_core::remote::{RemoteError, RemoteSession, SessionApi};
use focus_core::types::SessionId;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default request timeout for API calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// HTTP client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The base URL could not be used.
    #[error("invalid base URL {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    /// The bearer token was invalid.
    #[error("invalid token: {reason}")]
    InvalidToken { reason: &'static str },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// API returned an error response.
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
    /// Failed to parse response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<ClientError> for RemoteError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Api { message, .. } => Self::Api(message),
            ClientError::InvalidResponse(message) => Self::InvalidResponse(message),
            other => Self::Unavailable(other.to_string()),
        }
    }
}

/// Remote session API client.
///
/// Cloning shares the underlying HTTP connection pool.
#[derive(Clone)]
pub struct HttpSessionApi {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl fmt::Debug for HttpSessionApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpSessionApi")
            .field("base_url", &self.base_url)
            .field("token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// A past session as reported by the remote history endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub planned_minutes: u32,
    pub actual_minutes: f64,
    pub completed: bool,
}

/// Aggregates computed by the remote over ended sessions.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RemoteStats {
    pub total_sessions: u64,
    pub completed_sessions: u64,
    pub completion_rate: f64,
    /// Minutes.
    pub total_focus_time: f64,
    /// Minutes.
    pub avg_duration: f64,
}

impl HttpSessionApi {
    /// Creates a client for the API rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not http(s), the token is blank, or the
    /// HTTP client fails to build.
    pub fn new(
        base_url: &str,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(ClientError::InvalidToken {
                reason: "token cannot be empty",
            });
        }

        let parsed = reqwest::Url::parse(base_url).map_err(|err| ClientError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: err.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: format!("unsupported scheme {}", parsed.scheme()),
            });
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClientError::ClientBuild)?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub async fn start(&self, duration_minutes: u32) -> Result<RemoteSession, RemoteError> {
        let (status, body) = self
            .send(
                self.http
                    .post(self.url("start"))
                    .json(&StartRequest {
                        duration: duration_minutes,
                    }),
            )
            .await?;
        parse_start_response(status, &body)
    }

    pub async fn end(&self, completed: bool) -> Result<(), RemoteError> {
        let (status, body) = self
            .send(self.http.post(self.url("end")).json(&EndRequest { completed }))
            .await?;
        parse_end_response(status, &body)
    }

    pub async fn active(&self) -> Result<Option<RemoteSession>, RemoteError> {
        let (status, body) = self.send(self.http.get(self.url("active"))).await?;
        parse_active_response(status, &body)
    }

    /// Sessions started in the last `days` days, newest first.
    pub async fn history(&self, days: u32) -> Result<Vec<HistoryEntry>, ClientError> {
        let (status, body) = self
            .send(self.http.get(self.url("history")).query(&[("days", days)]))
            .await?;
        parse_history_response(status, &body)
    }

    pub async fn stats(&self, days: u32) -> Result<RemoteStats, ClientError> {
        let (status, body) = self
            .send(self.http.get(self.url("stats")).query(&[("days", days)]))
            .await?;
        parse_stats_response(status, &body)
    }

    fn url(&self, route: &str) -> String {
        format!("{}/api/focus/{route}", self.base_url)
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<(StatusCode, String), ClientError> {
        let response = request.bearer_auth(&self.token).send().await?;
        let status = response.status();
        let body = response.text().await?;
        tracing::debug!(status = status.as_u16(), "remote response");
        Ok((status, body))
    }
}

impl SessionApi for HttpSessionApi {
    async fn start_session(&self, duration_minutes: u32) -> Result<RemoteSession, RemoteError> {
        self.start(duration_minutes).await
    }

    async fn end_session(&self, completed: bool) -> Result<(), RemoteError> {
        self.end(completed).await
    }

    async fn active_session(&self) -> Result<Option<RemoteSession>, RemoteError> {
        self.active().await
    }
}

#[derive(Debug, Serialize)]
struct StartRequest {
    duration: u32,
}

#[derive(Debug, Serialize)]
struct EndRequest {
    completed: bool,
}

#[derive(Debug, Deserialize)]
struct WireSession {
    id: String,
    start_time: String,
    #[serde(default)]
    end_time: Option<String>,
    planned_duration: u32,
    #[serde(default)]
    actual_duration: f64,
    #[serde(default)]
    completed: bool,
}

impl WireSession {
    fn into_remote(self) -> Result<RemoteSession, ClientError> {
        let id = SessionId::new(self.id)
            .map_err(|err| ClientError::InvalidResponse(err.to_string()))?;
        Ok(RemoteSession {
            id,
            start_time: parse_timestamp(&self.start_time)?,
            planned_minutes: self.planned_duration,
        })
    }

    fn into_history(self) -> Result<HistoryEntry, ClientError> {
        Ok(HistoryEntry {
            start_time: parse_timestamp(&self.start_time)?,
            end_time: self.end_time.as_deref().map(parse_timestamp).transpose()?,
            planned_minutes: self.planned_duration,
            actual_minutes: self.actual_duration,
            completed: self.completed,
            id: self.id,
        })
    }
}

#[derive(Debug, Deserialize)]
struct SessionEnvelope {
    #[serde(default)]
    session: Option<WireSession>,
}

/// Accepts RFC 3339, or a naive timestamp taken as UTC.
fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, ClientError> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|err| ClientError::InvalidResponse(format!("bad timestamp {value:?}: {err}")))
}

fn decode<T: for<'de> Deserialize<'de>>(body: &str) -> Result<T, ClientError> {
    serde_json::from_str(body).map_err(|err| ClientError::InvalidResponse(err.to_string()))
}

fn api_error(status: StatusCode, body: &str) -> ClientError {
    #[derive(Deserialize)]
    struct ErrorPayload {
        error: String,
    }

    let message = serde_json::from_str::<ErrorPayload>(body)
        .map(|payload| payload.error)
        .unwrap_or_else(|_| body.trim().to_string());
    ClientError::Api {
        status: status.as_u16(),
        message,
    }
}

fn parse_start_response(status: StatusCode, body: &str) -> Result<RemoteSession, RemoteError> {
    if status.is_success() {
        let envelope: SessionEnvelope = decode(body)?;
        let session = envelope
            .session
            .ok_or_else(|| ClientError::InvalidResponse("missing session".to_string()))?;
        return Ok(session.into_remote()?);
    }
    match status {
        StatusCode::BAD_REQUEST => match decode::<SessionEnvelope>(body) {
            Ok(SessionEnvelope {
                session: Some(existing),
            }) => Err(RemoteError::AlreadyActive {
                existing: Some(existing.into_remote()?),
            }),
            _ => Err(api_error(status, body).into()),
        },
        StatusCode::CONFLICT => Err(RemoteError::AlreadyActive { existing: None }),
        _ => Err(api_error(status, body).into()),
    }
}

/// A missing active session means there is nothing to end.
fn parse_end_response(status: StatusCode, body: &str) -> Result<(), RemoteError> {
    if status.is_success() {
        return Ok(());
    }
    if status == StatusCode::NOT_FOUND {
        tracing::debug!("no active remote session to end");
        return Ok(());
    }
    Err(api_error(status, body).into())
}

fn parse_active_response(
    status: StatusCode,
    body: &str,
) -> Result<Option<RemoteSession>, RemoteError> {
    #[derive(Deserialize)]
    struct ActivePayload {
        active: bool,
        #[serde(default)]
        session: Option<WireSession>,
    }

    if !status.is_success() {
        return Err(api_error(status, body).into());
    }
    let payload: ActivePayload = decode(body)?;
    match payload.session {
        Some(session) if payload.active => Ok(Some(session.into_remote()?)),
        _ => Ok(None),
    }
}

fn parse_history_response(status: StatusCode, body: &str) -> Result<Vec<HistoryEntry>, ClientError> {
    #[derive(Deserialize)]
    struct HistoryPayload {
        sessions: Vec<WireSession>,
    }

    if !status.is_success() {
        return Err(api_error(status, body));
    }
    let payload: HistoryPayload = decode(body)?;
    payload
        .sessions
        .into_iter()
        .map(WireSession::into_history)
        .collect()
}

fn parse_stats_response(status: StatusCode, body: &str) -> Result<RemoteStats, ClientError> {
    #[derive(Deserialize)]
    struct StatsPayload {
        stats: RemoteStats,
    }

    if !status.is_success() {
        return Err(api_error(status, body));
    }
    let payload: StatsPayload = decode(body)?;
    Ok(payload.stats)
}
