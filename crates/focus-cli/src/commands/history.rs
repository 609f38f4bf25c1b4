//! Finished-session history, local or remote.

use std::io::Write;

use anyhow::{Context, Result, bail};
use chrono::{Duration, Utc};
use clap::Args;
use focus_client::HistoryEntry;
use focus_db::SummaryRecord;

use crate::Config;
use crate::commands::{format_clock, open_database, runtime};

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// How many days back to look.
    #[arg(long, default_value_t = 30)]
    pub days: u32,

    /// Ask the remote instead of the local archive.
    #[arg(long)]
    pub remote: bool,
}

pub fn run<W: Write>(writer: &mut W, args: &HistoryArgs, config: &Config) -> Result<()> {
    if args.remote {
        let Some(api) = config.session_api()? else {
            bail!("remote not configured");
        };
        let entries = runtime()?
            .block_on(api.history(args.days))
            .context("failed to fetch remote history")?;
        return write_remote(writer, &entries, args.days);
    }

    let db = open_database(config)?;
    let since = Utc::now() - Duration::days(i64::from(args.days));
    let records = db.list_summaries(since)?;
    write_local(writer, &records, args.days)
}

fn write_local<W: Write>(writer: &mut W, records: &[SummaryRecord], days: u32) -> Result<()> {
    if records.is_empty() {
        writeln!(writer, "No sessions in the last {days} days.")?;
        return Ok(());
    }
    writeln!(writer, "Sessions (last {days} days):")?;
    for record in records {
        let summary = &record.summary;
        let outcome = if summary.completed() {
            "completed"
        } else {
            "stopped"
        };
        writeln!(
            writer,
            "- {}  {:<5}  {:<9}  {} of {}  score {}%  distractions {}",
            summary.ended_at.format("%Y-%m-%d %H:%M"),
            summary.kind.as_str(),
            outcome,
            format_clock(summary.focused_secs),
            format_clock(summary.planned_secs),
            summary.focus_score_percent,
            summary.total_distractions,
        )?;
    }
    Ok(())
}

fn write_remote<W: Write>(writer: &mut W, entries: &[HistoryEntry], days: u32) -> Result<()> {
    if entries.is_empty() {
        writeln!(writer, "No remote sessions in the last {days} days.")?;
        return Ok(());
    }
    writeln!(writer, "Remote sessions (last {days} days):")?;
    for entry in entries {
        let outcome = match (entry.end_time, entry.completed) {
            (None, _) => "active",
            (Some(_), true) => "completed",
            (Some(_), false) => "ended early",
        };
        writeln!(
            writer,
            "- {}  {}m planned  {:.1}m actual  {outcome}",
            entry.start_time.format("%Y-%m-%d %H:%M"),
            entry.planned_minutes,
            entry.actual_minutes,
        )?;
    }
    Ok(())
}
