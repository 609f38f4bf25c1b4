//! Focus statistics over recent sessions.

use std::io::Write;

use anyhow::{Context, Result, bail};
use chrono::{Duration, Utc};
use clap::Args;
use focus_client::RemoteStats;
use focus_db::LocalStats;

use crate::Config;
use crate::commands::{open_database, runtime};

#[derive(Debug, Args)]
pub struct StatsArgs {
    /// How many days back to look.
    #[arg(long, default_value_t = 7)]
    pub days: u32,

    /// Ask the remote instead of the local archive.
    #[arg(long)]
    pub remote: bool,
}

pub fn run<W: Write>(writer: &mut W, args: &StatsArgs, config: &Config) -> Result<()> {
    if args.remote {
        let Some(api) = config.session_api()? else {
            bail!("remote not configured");
        };
        let stats = runtime()?
            .block_on(api.stats(args.days))
            .context("failed to fetch remote stats")?;
        return write_remote(writer, &stats, args.days);
    }

    let db = open_database(config)?;
    let since = Utc::now() - Duration::days(i64::from(args.days));
    let stats = db.summary_stats(since)?;
    write_local(writer, &stats, args.days)
}

fn write_local<W: Write>(writer: &mut W, stats: &LocalStats, days: u32) -> Result<()> {
    writeln!(writer, "Focus stats (last {days} days)")?;
    writeln!(writer, "Sessions: {}", stats.total_sessions)?;
    writeln!(
        writer,
        "Completed: {} ({:.1}%)",
        stats.completed_sessions, stats.completion_rate
    )?;
    writeln!(writer, "Focus time: {} min", stats.total_focus_minutes)?;
    writeln!(writer, "Average session: {:.1} min", stats.avg_focus_minutes)?;
    writeln!(writer, "Average focus score: {:.1}%", stats.avg_focus_score)?;
    Ok(())
}

fn write_remote<W: Write>(writer: &mut W, stats: &RemoteStats, days: u32) -> Result<()> {
    writeln!(writer, "Remote focus stats (last {days} days)")?;
    writeln!(writer, "Sessions: {}", stats.total_sessions)?;
    writeln!(
        writer,
        "Completed: {} ({:.1}%)",
        stats.completed_sessions, stats.completion_rate
    )?;
    writeln!(writer, "Focus time: {:.1} min", stats.total_focus_time)?;
    writeln!(writer, "Average session: {:.1} min", stats.avg_duration)?;
    Ok(())
}
