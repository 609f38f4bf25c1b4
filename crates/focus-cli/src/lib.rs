//! Focus timer CLI library.
//!
//! This crate provides the terminal host and management commands for focus
//! sessions.

mod cli;
pub mod commands;
mod config;
pub mod notifier;

pub use cli::{Cli, Commands};
pub use config::{Config, NotifierKind, RemoteConfig};
