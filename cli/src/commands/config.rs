// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use haulage_core::domain::config::HaulageConfig;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./haulage-config.yaml)
        #[arg(short, long, default_value = "./haulage-config.yaml")]
        output: PathBuf,

        /// Include comments for every setting
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(command: ConfigCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output, examples } => generate(output, examples).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = HaulageConfig::load_or_default(config_override.clone()).context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        match &config_override {
            Some(path) => println!("  --config flag: {}", path.display()),
            None => println!("  --config flag: {}", "(not set)".dimmed()),
        }
        for (index, path) in HaulageConfig::search_paths().iter().enumerate() {
            let marker = if path.exists() { "found".green() } else { "missing".dimmed() };
            println!("  {}. {} ({})", index + 1, path.display(), marker);
        }
        println!();
    }

    let spec = &config.spec;
    println!("{}", "Current configuration:".bold());
    println!("  Name: {}", config.metadata.name);
    println!();

    println!("{}", "Search:".bold());
    println!("  Haul danger: {:?}", spec.search.haul_danger);
    println!();

    println!("{}", "Executor:".bold());
    println!("  Collect duplicates: {}", spec.executor.collect_duplicates);
    println!("  Occupied wait turns: {}", spec.executor.occupied_wait_turns);
    println!("  Cells per turn: {}", spec.executor.cells_per_turn);
    println!();

    println!("{}", "Swarm:".bold());
    println!("  Tick interval: {}ms", spec.swarm.tick_interval_ms);
    println!("  Max ticks: {}", spec.swarm.max_ticks);
    println!("  Idle backoff: {} ticks", spec.swarm.idle_backoff_ticks);
    println!("  Event bus capacity: {}", spec.swarm.event_bus_capacity);
    println!();

    println!("{}", "Logging:".bold());
    println!("  Level: {}", spec.logging.level);

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = HaulageConfig::load_or_default(config_path).context("Failed to load configuration")?;

    config.validate().context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: PathBuf, with_examples: bool) -> Result<()> {
    let sample = if with_examples {
        include_str!("../../templates/config-with-examples.yaml")
    } else {
        include_str!("../../templates/config-minimal.yaml")
    };

    std::fs::write(&output, sample).with_context(|| format!("Failed to write config to {:?}", output))?;

    println!("{}", format!("✓ Configuration generated: {}", output.display()).green());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_parse_and_validate() {
        for template in [
            include_str!("../../templates/config-minimal.yaml"),
            include_str!("../../templates/config-with-examples.yaml"),
        ] {
            let config = HaulageConfig::from_yaml_str(template).unwrap();
            assert!(config.validate().is_ok());
        }
    }

    #[tokio::test]
    async fn test_generate_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("haulage-config.yaml");

        generate(output.clone(), true).await.unwrap();

        let config = HaulageConfig::from_yaml_file(&output).unwrap();
        assert_eq!(config.spec.swarm.max_ticks, 5000);
    }
}
