//! Core domain logic for focus sessions.
//!
//! This crate contains:
//! - The session timer and its state machine
//! - Distraction detection: idle, visibility and shortcut watchdogs
//! - Streak escalation, alert dispatch and end-of-session summaries
//! - Reconciliation of the local session with a remote record

pub mod alert;
pub mod config;
pub mod engine;
pub mod monitor;
pub mod reconcile;
pub mod registry;
pub mod remote;
pub mod streak;
pub mod summary;
pub mod timer;
pub mod types;
pub mod watchdog;

pub use alert::{Alert, Notifier, Permission, SilentNotifier};
pub use config::EngineConfig;
pub use engine::{EngineEvent, FocusEngine, SignalResponse, Snapshot};
pub use reconcile::SessionReconciler;
pub use registry::{BlockedAppRegistry, PreferenceStore, RegistryError};
pub use remote::{RemoteError, RemoteSession, SessionApi};
pub use summary::{SessionEnd, SessionSummary, focus_score};
pub use types::{
    BlockedApp, DistractionEvent, DistractionKind, FocusSession, SessionId, SessionKind,
    SessionStatus, Severity, ValidationError,
};
pub use watchdog::{InputSignal, KeyPress};
