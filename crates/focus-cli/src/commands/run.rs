//! Hosts a focus session in the terminal.
//!
//! Stdin is the input adapter: each line is one command, and every line also
//! counts as keyboard activity. The countdown ticks once per second.

use std::io::Write;
use std::time::Duration as StdDuration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use focus_core::{
    BlockedAppRegistry, EngineEvent, FocusEngine, InputSignal, KeyPress, SessionApi,
    SessionKind, SessionReconciler, SessionStatus, SessionSummary,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::Config;
use crate::commands::{format_clock, open_database, runtime};
use crate::notifier;

const DEFAULT_WORK_MINUTES: u32 = 25;
const DEFAULT_BREAK_MINUTES: u32 = 5;

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Session length in minutes [default: 25 for work, 5 for a break].
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    pub minutes: Option<u32>,

    /// Run a break.
    #[arg(long = "break", conflicts_with = "work")]
    pub break_session: bool,

    /// Run a work session.
    #[arg(long)]
    pub work: bool,
}

/// One line of host input.
#[derive(Debug, Clone, PartialEq, Eq)]
enum HostCommand {
    Signal(InputSignal),
    Pause,
    Resume,
    Stop,
    Reset,
    /// Activity only.
    Nothing,
    Unknown(String),
}

fn parse_line(line: &str) -> HostCommand {
    let line = line.trim();
    let (word, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(word, rest)| (word, rest.trim()));
    match word.to_ascii_lowercase().as_str() {
        "" => HostCommand::Nothing,
        "hide" => HostCommand::Signal(InputSignal::Hidden),
        "show" => HostCommand::Signal(InputSignal::Visible),
        "switch" => HostCommand::Signal(InputSignal::RapidSwitching),
        "key" => rest.parse::<KeyPress>().map_or_else(
            |err| HostCommand::Unknown(err.to_string()),
            |key| HostCommand::Signal(InputSignal::KeyDown(key)),
        ),
        "pause" => HostCommand::Pause,
        "resume" => HostCommand::Resume,
        "stop" => HostCommand::Stop,
        "reset" => HostCommand::Reset,
        _ => HostCommand::Unknown(line.to_string()),
    }
}

pub fn run<W: Write>(writer: &mut W, args: &RunArgs, config: &Config) -> Result<()> {
    let mut db = open_database(config)?;
    let (kind, advisories) = {
        let registry = BlockedAppRegistry::open(&mut db)?;
        let kind = if args.break_session {
            SessionKind::Break
        } else if args.work {
            SessionKind::Work
        } else {
            registry.default_kind()?
        };
        let advisories: Vec<String> = registry
            .advisories()
            .into_iter()
            .map(str::to_string)
            .collect();
        (kind, advisories)
    };
    let minutes = args.minutes.unwrap_or(match kind {
        SessionKind::Work => DEFAULT_WORK_MINUTES,
        SessionKind::Break => DEFAULT_BREAK_MINUTES,
    });

    let remote = config
        .session_api()
        .context("invalid remote configuration")?;
    let engine = FocusEngine::new(config.engine.clone(), notifier::build(config.notifier));
    let mut reconciler = SessionReconciler::new(engine, remote, config.remote_timeout());

    let stdin = BufReader::new(tokio::io::stdin());
    let plan = SessionPlan {
        kind,
        minutes,
        advisories,
    };
    let summaries = runtime()?.block_on(host(writer, &mut reconciler, &plan, stdin))?;

    for summary in &summaries {
        let id = db.archive_summary(summary)?;
        tracing::info!(%id, "session summary archived");
    }
    Ok(())
}

struct SessionPlan {
    kind: SessionKind,
    minutes: u32,
    advisories: Vec<String>,
}

/// Runs one session to its end and returns the summaries it produced.
async fn host<W, A, R>(
    writer: &mut W,
    reconciler: &mut SessionReconciler<A>,
    plan: &SessionPlan,
    input: R,
) -> Result<Vec<SessionSummary>>
where
    W: Write,
    A: SessionApi,
    R: AsyncBufRead + Unpin,
{
    let mut summaries = Vec::new();

    let events = reconciler.mount(Utc::now()).await;
    if events.is_empty() {
        let events = reconciler.start(plan.kind, plan.minutes, Utc::now()).await;
        render_all(writer, &events, &mut summaries)?;
    } else {
        writeln!(writer, "Resuming the session already running remotely.")?;
        render_all(writer, &events, &mut summaries)?;
    }
    if reconciler.engine().status() != SessionStatus::Running {
        writeln!(writer, "Could not start a session.")?;
        return Ok(summaries);
    }
    if reconciler.engine().kind() == SessionKind::Work && !plan.advisories.is_empty() {
        writeln!(writer, "Stay away from: {}", plan.advisories.join(", "))?;
    }
    let snapshot = reconciler.engine().snapshot();
    writeln!(writer, "{} remaining", format_clock(snapshot.remaining_secs))?;

    let mut lines = input.lines();
    let mut ticker = tokio::time::interval(StdDuration::from_secs(1));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ticker.tick().await;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let events = reconciler.tick(Utc::now()).await;
                render_all(writer, &events, &mut summaries)?;
            }
            line = lines.next_line() => {
                let line = line.context("failed to read input")?;
                let Some(line) = line else {
                    tracing::debug!("input closed, stopping session");
                    let events = reconciler.stop(Utc::now()).await;
                    render_all(writer, &events, &mut summaries)?;
                    break;
                };
                let events = apply_line(reconciler, &line).await;
                render_all(writer, &events, &mut summaries)?;
            }
            _ = &mut ctrl_c => {
                tracing::debug!("interrupted, stopping session");
                let events = reconciler.stop(Utc::now()).await;
                render_all(writer, &events, &mut summaries)?;
                break;
            }
        }

        match reconciler.engine().status() {
            SessionStatus::Completed => {
                let events = reconciler.acknowledge(Utc::now());
                render_all(writer, &events, &mut summaries)?;
                break;
            }
            SessionStatus::Idle => break,
            SessionStatus::Running | SessionStatus::Paused => {}
        }
    }
    Ok(summaries)
}

async fn apply_line<A: SessionApi>(
    reconciler: &mut SessionReconciler<A>,
    line: &str,
) -> Vec<EngineEvent> {
    let now = Utc::now();
    let activity = InputSignal::KeyDown(KeyPress::plain("Enter"));
    let mut events = reconciler.handle_signal(&activity, now).events;
    match parse_line(line) {
        HostCommand::Signal(signal) => {
            let response = reconciler.handle_signal(&signal, now);
            if response.suppress_default {
                tracing::debug!(?signal, "input suppressed");
            }
            events.extend(response.events);
        }
        HostCommand::Pause => events.extend(reconciler.pause(now)),
        HostCommand::Resume => events.extend(reconciler.resume(now)),
        HostCommand::Stop => events.extend(reconciler.stop(now).await),
        HostCommand::Reset => events.extend(reconciler.reset(now).await),
        HostCommand::Nothing => {}
        HostCommand::Unknown(input) => tracing::warn!(%input, "unrecognised input"),
    }
    events
}

fn render_all<W: Write>(
    writer: &mut W,
    events: &[EngineEvent],
    summaries: &mut Vec<SessionSummary>,
) -> Result<()> {
    for event in events {
        if let EngineEvent::SessionFinished(summary) = event {
            summaries.push(summary.clone());
        }
        if let Some(text) = format_event(event) {
            writeln!(writer, "{text}")?;
        }
    }
    Ok(())
}

fn format_event(event: &EngineEvent) -> Option<String> {
    match event {
        EngineEvent::StatusChanged { status, kind } => Some(format!("[{kind}] {status}")),
        EngineEvent::Tick { remaining_secs } => (*remaining_secs % 60 == 0 && *remaining_secs > 0)
            .then(|| format!("{} remaining", format_clock(*remaining_secs))),
        EngineEvent::Distraction {
            event,
            severity,
            streak,
        } => Some(format!(
            "Distraction: {} ({severity}, streak {streak})",
            event.kind
        )),
        EngineEvent::AlertRaised(alert) => Some(format!("! {}", alert.message)),
        EngineEvent::AlertDismissed(_) => None,
        EngineEvent::RefocusPrompt { away } => Some(format!(
            "Welcome back. You were away for {}s.",
            away.num_seconds()
        )),
        EngineEvent::ShortcutBlocked { attempts } => {
            Some(format!("Blocked shortcut attempt #{attempts}"))
        }
        EngineEvent::PermissionResolved(permission) => {
            let state = match permission {
                focus_core::Permission::Granted => "on",
                focus_core::Permission::Denied | focus_core::Permission::Default => "off",
            };
            Some(format!("System notifications: {state}"))
        }
        EngineEvent::SessionFinished(summary) => Some(format_summary(summary)),
    }
}

fn format_summary(summary: &SessionSummary) -> String {
    let outcome = if summary.completed() {
        "complete"
    } else {
        "stopped"
    };
    let mut lines = vec![
        format!("Session {outcome} ({})", summary.kind),
        format!(
            "Focused: {} of {}",
            format_clock(summary.focused_secs),
            format_clock(summary.planned_secs)
        ),
        format!("Focus score: {}%", summary.focus_score_percent),
        format!("Distractions: {}", summary.total_distractions),
        format!("Blocked shortcuts: {}", summary.blocked_shortcut_count),
    ];
    for (kind, count) in &summary.breakdown_by_kind {
        lines.push(format!("  {kind}: {count}"));
    }
    lines.join("\n")
}
