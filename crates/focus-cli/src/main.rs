use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use focus_cli::commands::{blocked, default, history, run, stats, status};
use focus_cli::{Cli, Commands, Config};

fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Logs go to stderr so they never mix with command output.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match &cli.command {
        Some(Commands::Run(args)) => {
            let config = load_config(cli.config.as_deref())?;
            run::run(&mut out, args, &config)?;
        }
        Some(Commands::Status) => {
            let config = load_config(cli.config.as_deref())?;
            status::run(&mut out, &config)?;
        }
        Some(Commands::Blocked { action }) => {
            let config = load_config(cli.config.as_deref())?;
            blocked::run(&mut out, action, &config)?;
        }
        Some(Commands::Default { kind }) => {
            let config = load_config(cli.config.as_deref())?;
            default::run(&mut out, *kind, &config)?;
        }
        Some(Commands::History(args)) => {
            let config = load_config(cli.config.as_deref())?;
            history::run(&mut out, args, &config)?;
        }
        Some(Commands::Stats(args)) => {
            let config = load_config(cli.config.as_deref())?;
            stats::run(&mut out, args, &config)?;
        }
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
