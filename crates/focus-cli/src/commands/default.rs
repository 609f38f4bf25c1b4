//! Persisted default session type.

use std::io::Write;

use anyhow::Result;
use focus_core::{BlockedAppRegistry, SessionKind};

use crate::Config;
use crate::commands::open_database;

pub fn run<W: Write>(writer: &mut W, kind: SessionKind, config: &Config) -> Result<()> {
    let mut db = open_database(config)?;
    let mut registry = BlockedAppRegistry::open(&mut db)?;
    registry.set_default_kind(kind)?;
    writeln!(writer, "Default session type: {kind}")?;
    Ok(())
}
