// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Scenario file commands
//!
//! Commands: validate, show

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};

use haulage_core::domain::store::ContainerStore;
use haulage_core::infrastructure::scenario::{Scenario, ScenarioFile, ScenarioLoader};

#[derive(Subcommand)]
pub enum ScenarioCommand {
    /// Parse and validate a scenario file
    Validate {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Print the agents, items and manifests of a scenario
    Show {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

pub async fn handle_command(command: ScenarioCommand) -> Result<()> {
    match command {
        ScenarioCommand::Validate { file } => validate(&file),
        ScenarioCommand::Show { file } => show(&file),
    }
}

fn validate(path: &Path) -> Result<()> {
    println!("Validating scenario {}...", path.display());
    let file = ScenarioLoader::from_yaml_file(path).context("Failed to read scenario")?;
    ScenarioLoader::validate(&file).context("Scenario validation failed")?;

    println!(
        "{}",
        format!(
            "✓ Scenario '{}' is valid ({} agents, {} items, {} containers)",
            file.name,
            file.agents.len(),
            file.items.len(),
            file.containers.len()
        )
        .green()
    );
    Ok(())
}

fn show(path: &Path) -> Result<()> {
    let file = ScenarioLoader::from_yaml_file(path).context("Failed to read scenario")?;
    let scenario = ScenarioLoader::build(&file).context("Scenario validation failed")?;
    print!("{}", describe(&file, &scenario));
    Ok(())
}

/// Plain-text outline of a scenario.
pub fn describe(file: &ScenarioFile, scenario: &Scenario) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{} {} ({}x{})\n\n",
        "Scenario".bold(),
        file.name,
        file.map.width,
        file.map.height
    ));

    out.push_str(&format!("{}\n", "Agents:".bold()));
    for agent in &file.agents {
        let duty = agent
            .duty
            .map(|group| format!("group {}", group))
            .unwrap_or_else(|| "no duty".to_string());
        out.push_str(&format!("  {} at {} ({})\n", agent.name, agent.position, duty));
    }

    out.push_str(&format!("\n{}\n", "Items:".bold()));
    for item in &file.items {
        out.push_str(&format!("  {}: {} x{} at {}\n", item.name, item.def, item.count, item.position));
    }

    out.push_str(&format!("\n{}\n", "Containers:".bold()));
    for spec in &file.containers {
        out.push_str(&format!("  {} at {}\n", spec.label, spec.position));
        let Some(container) = scenario
            .container(&spec.label)
            .and_then(|id| scenario.world.container(id))
        else {
            continue;
        };
        for req in &container.manifest.requirements {
            out.push_str(&format!("    - {} x{}\n", req.label(), req.count_to_transfer));
        }
    }
    out
}
