//! # occ CLI entry point
//!
//! Parses command-line arguments, loads the lifecycle configuration, and
//! dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use occ_cli::evaluate::{run_evaluate, EvaluateArgs};
use occ_cli::replay::{run_replay, ReplayArgs};
use occ_lifecycle::LifecycleConfig;

/// Occupancy lifecycle operator tool.
///
/// Replays scripted move-in/move-out cycles and evaluates stored records.
#[derive(Parser, Debug)]
#[command(name = "occ", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    /// Path to a YAML configuration file. Environment variables are used
    /// when absent.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a scripted lifecycle against an in-memory store.
    Replay(ReplayArgs),

    /// Evaluate the exit steps of a record exported as JSON.
    Evaluate(EvaluateArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        builder.json().init();
    } else {
        builder.init();
    }

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "occ CLI starting");

    let result = load_config(cli.config.as_deref()).and_then(|config| match &cli.command {
        Commands::Replay(args) => run_replay(args, config),
        Commands::Evaluate(args) => run_evaluate(args),
    });

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<LifecycleConfig> {
    let config = match path {
        Some(path) => LifecycleConfig::from_yaml_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => LifecycleConfig::from_env().context("loading configuration from environment")?,
    };
    tracing::debug!(?config, "configuration loaded");
    Ok(config)
}
