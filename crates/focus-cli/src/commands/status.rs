//! Status command: local preferences and the remote session.

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};
use focus_core::{BlockedAppRegistry, RemoteSession, SessionKind};

use crate::Config;
use crate::commands::{format_clock, open_database, runtime};

enum RemoteStatus {
    NotConfigured,
    Idle,
    Active(RemoteSession),
    Unavailable(String),
}

pub fn run<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let mut db = open_database(config)?;
    let registry = BlockedAppRegistry::open(&mut db)?;
    let default_kind = registry.default_kind()?;
    let advisories: Vec<String> = registry
        .advisories()
        .into_iter()
        .map(str::to_string)
        .collect();

    let remote = match config.session_api()? {
        None => RemoteStatus::NotConfigured,
        Some(api) => match runtime()?.block_on(api.active()) {
            Ok(Some(session)) => RemoteStatus::Active(session),
            Ok(None) => RemoteStatus::Idle,
            Err(err) => {
                tracing::warn!(error = %err, "failed to query remote session");
                RemoteStatus::Unavailable(err.to_string())
            }
        },
    };

    writeln!(writer, "Focus status")?;
    writeln!(writer, "Database: {}", config.database_path.display())?;
    write_status(writer, default_kind, &advisories, &remote, Utc::now())
}

fn write_status<W: Write>(
    writer: &mut W,
    default_kind: SessionKind,
    advisories: &[String],
    remote: &RemoteStatus,
    now: DateTime<Utc>,
) -> Result<()> {
    writeln!(writer, "Default session type: {default_kind}")?;
    if advisories.is_empty() {
        writeln!(writer, "Blocked apps: none")?;
    } else {
        writeln!(writer, "Blocked apps: {}", advisories.join(", "))?;
    }
    match remote {
        RemoteStatus::NotConfigured => writeln!(writer, "Remote: not configured")?,
        RemoteStatus::Idle => writeln!(writer, "Remote: no active session")?,
        RemoteStatus::Active(session) => writeln!(
            writer,
            "Remote: session {} active, {} of {} remaining",
            session.id,
            format_clock(session.remaining_secs(now)),
            format_clock(session.planned_secs()),
        )?,
        RemoteStatus::Unavailable(reason) => writeln!(writer, "Remote: unavailable ({reason})")?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;
    use focus_core::SessionId;
    use insta::assert_snapshot;

    fn render(advisories: &[String], remote: &RemoteStatus, now: DateTime<Utc>) -> String {
        let mut output = Vec::new();
        write_status(&mut output, SessionKind::Work, advisories, remote, now).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn status_shows_active_remote_session() {
        let start = "2025-01-06T09:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let remote = RemoteStatus::Active(RemoteSession {
            id: SessionId::new("65a1").unwrap(),
            start_time: start,
            planned_minutes: 25,
        });
        let advisories = vec!["Twitter".to_string(), "Reddit".to_string()];
        let output = render(&advisories, &remote, start + Duration::seconds(330));
        assert_snapshot!(output, @r"
        Default session type: work
        Blocked apps: Twitter, Reddit
        Remote: session 65a1 active, 19:30 of 25:00 remaining
        ");
    }

    #[test]
    fn status_without_remote() {
        let output = render(&[], &RemoteStatus::NotConfigured, Utc::now());
        assert_snapshot!(output, @r"
        Default session type: work
        Blocked apps: none
        Remote: not configured
        ");
    }

    #[test]
    fn status_command_reads_local_database() {
        let temp = tempfile::tempdir().unwrap();
        let db_path = temp.path().join("focus.db");
        let config = Config {
            database_path: db_path.clone(),
            ..Config::default()
        };
        let mut output = Vec::new();
        run(&mut output, &config).unwrap();

        let output = String::from_utf8(output).unwrap();
        let output = output.replace(&db_path.display().to_string(), "[TEMP]/focus.db");
        assert_snapshot!(output, @r"
        Focus status
        Database: [TEMP]/focus.db
        Default session type: work
        Blocked apps: none
        Remote: not configured
        ");
    }
}
