//! Blocked-app list management.

use std::io::Write;

use anyhow::Result;
use clap::Subcommand;
use focus_core::{BlockedApp, BlockedAppRegistry, PreferenceStore};

use crate::Config;
use crate::commands::open_database;

#[derive(Debug, Subcommand)]
pub enum BlockedAction {
    /// List all apps.
    List,
    /// Add an app, blocked.
    Add {
        name: String,
        /// Free-form grouping such as `social` or `video`.
        #[arg(long, default_value = "")]
        category: String,
    },
    /// Remove an app from the list.
    Remove { name: String },
    /// Mark an app as blocked.
    Block { name: String },
    /// Keep an app listed but allowed.
    Unblock { name: String },
}

pub fn run<W: Write>(writer: &mut W, action: &BlockedAction, config: &Config) -> Result<()> {
    let mut db = open_database(config)?;
    apply(writer, action, &mut db)
}

fn apply<W: Write, S: PreferenceStore>(
    writer: &mut W,
    action: &BlockedAction,
    store: S,
) -> Result<()> {
    let mut registry = BlockedAppRegistry::open(store)?;
    match action {
        BlockedAction::List => write_list(writer, registry.apps())?,
        BlockedAction::Add { name, category } => {
            let app = registry.add(name, category)?;
            writeln!(writer, "Added {}", app.name)?;
        }
        BlockedAction::Remove { name } => {
            let app = registry.remove(name)?;
            writeln!(writer, "Removed {}", app.name)?;
        }
        BlockedAction::Block { name } => {
            let app = registry.set_blocked(name, true)?;
            writeln!(writer, "Blocked {}", app.name)?;
        }
        BlockedAction::Unblock { name } => {
            let app = registry.set_blocked(name, false)?;
            writeln!(writer, "Unblocked {}", app.name)?;
        }
    }
    Ok(())
}

fn write_list<W: Write>(writer: &mut W, apps: &[BlockedApp]) -> Result<()> {
    if apps.is_empty() {
        writeln!(writer, "No apps listed.")?;
        return Ok(());
    }
    writeln!(writer, "Apps:")?;
    for app in apps {
        let state = if app.blocked { "blocked" } else { "allowed" };
        if app.category.is_empty() {
            writeln!(writer, "- {} [{state}]", app.name)?;
        } else {
            writeln!(writer, "- {} ({}) [{state}]", app.name, app.category)?;
        }
    }
    Ok(())
}
