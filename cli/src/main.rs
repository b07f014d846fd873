// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Haulage CLI
//!
//! The `haulage` binary loads a scenario (map, agents, items, containers with
//! loading manifests) and runs every agent concurrently until the manifests
//! are satisfied.
//!
//! ## Commands
//!
//! - `haulage run <scenario>` - Run a scenario and print the loading report
//! - `haulage scenario validate|show` - Check and inspect scenario files
//! - `haulage config show|validate|generate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use haulage_cli::commands::{self, ConfigCommand, RunArgs, ScenarioCommand};

/// Haulage - multi-agent manifest loading
#[derive(Parser)]
#[command(name = "haulage")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "HAULAGE_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "HAULAGE_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario to completion
    #[command(name = "run")]
    Run(RunArgs),

    /// Scenario file operations
    #[command(name = "scenario")]
    Scenario {
        #[command(subcommand)]
        command: ScenarioCommand,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = cli.log_level.clone().unwrap_or_else(|| "info".to_string());
    init_logging(&level)?;

    match cli.command {
        Some(Commands::Run(args)) => commands::run::execute(args, cli.config).await,
        Some(Commands::Scenario { command }) => commands::scenario::handle_command(command).await,
        Some(Commands::Config { command }) => commands::config::handle_command(command, cli.config).await,
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}
