// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `haulage run` - load a scenario and drive its agents to completion

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use haulage_core::application::context::HaulContext;
use haulage_core::domain::agent::AgentId;
use haulage_core::domain::config::HaulageConfig;
use haulage_core::domain::events::HaulEvent;
use haulage_core::infrastructure::event_bus::EventBusError;
use haulage_core::infrastructure::scenario::ScenarioLoader;
use haulage_swarm::application::{SwarmCoordinator, SwarmService};
use haulage_swarm::domain::{SwarmReport, SwarmStatus, TaskResult};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Scenario file (YAML)
    #[arg(value_name = "SCENARIO")]
    pub scenario: PathBuf,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Stream haul events while the run is in progress
    #[arg(long)]
    pub events: bool,

    /// Override spec.swarm.max_ticks
    #[arg(long, value_name = "TICKS")]
    pub max_ticks: Option<u64>,

    /// Override spec.swarm.tick_interval_ms
    #[arg(long, value_name = "MS")]
    pub tick_interval_ms: Option<u64>,
}

pub async fn execute(args: RunArgs, config_override: Option<PathBuf>) -> Result<()> {
    let mut config = HaulageConfig::load_or_default(config_override).context("Failed to load configuration")?;
    if let Some(ticks) = args.max_ticks {
        config.spec.swarm.max_ticks = ticks;
    }
    if let Some(ms) = args.tick_interval_ms {
        config.spec.swarm.tick_interval_ms = ms;
    }
    config.validate().context("Configuration validation failed")?;

    let scenario = ScenarioLoader::load(&args.scenario)
        .with_context(|| format!("Failed to load scenario {:?}", args.scenario))?;
    info!("Running scenario '{}'", scenario.name);

    let ctx = HaulContext::from_scenario(&scenario, config);
    let coordinator = Arc::new(SwarmCoordinator::new(ctx.clone()));
    let swarm = coordinator.create_world_swarm().await?;

    let printer = args.events.then(|| {
        let mut receiver = ctx.events.subscribe();
        let names: HashMap<AgentId, String> = ctx
            .agents
            .agents()
            .into_iter()
            .map(|agent| (agent.id, agent.name))
            .collect();
        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => println!("{}", describe_event(&event, &names).dimmed()),
                    Err(EventBusError::Lagged(_)) => continue,
                    Err(_) => break,
                }
            }
        })
    });

    let interrupt = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling swarm {}", swarm);
                if let Err(e) = coordinator.cancel(swarm).await {
                    warn!("Failed to cancel swarm {}: {}", swarm, e);
                }
            }
        })
    };

    let report = coordinator.run(swarm).await?;
    interrupt.abort();

    if let Some(printer) = printer {
        printer.abort();
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_report(&scenario.name, &report));
    }

    if report.status != SwarmStatus::Satisfied {
        std::process::exit(2);
    }
    Ok(())
}

fn describe_event(event: &HaulEvent, names: &HashMap<AgentId, String>) -> String {
    let body = match event {
        HaulEvent::CandidateSelected { item, tier, .. } => format!("select   item={} tier={}", item, tier),
        HaulEvent::TaskStarted { task_id, count, .. } => format!("start    task={} count={}", task_id, count),
        HaulEvent::StepEntered { task_id, step, .. } => format!("step     task={} {}", task_id, step),
        HaulEvent::ItemPickedUp { task_id, count, .. } => format!("pickup   task={} count={}", task_id, count),
        HaulEvent::ItemDeposited { task_id, count, .. } => format!("deposit  task={} count={}", task_id, count),
        HaulEvent::TaskSucceeded { task_id, delivered, .. } => {
            format!("success  task={} delivered={}", task_id, delivered)
        }
        HaulEvent::TaskFailed { task_id, reason, .. } => format!("failed   task={} {}", task_id, reason),
        HaulEvent::ContainerSatisfied { container, .. } => format!("loaded   container={}", container),
    };
    match event.agent() {
        Some(agent) => {
            let name = names.get(&agent).cloned().unwrap_or_else(|| agent.to_string());
            format!("[{}] {}", name, body)
        }
        None => body,
    }
}

/// Human-readable summary of a finished run.
pub fn render_report(scenario: &str, report: &SwarmReport) -> String {
    let mut out = String::new();
    let status = match report.status {
        SwarmStatus::Satisfied => "satisfied".green().bold(),
        SwarmStatus::Cancelled => "cancelled".yellow().bold(),
        _ => "incomplete".red().bold(),
    };
    let _ = writeln!(out, "{} {} ({} ticks)", "Scenario".bold(), scenario, report.ticks);
    let _ = writeln!(out, "  Status: {}", status);
    let _ = writeln!(out);

    let _ = writeln!(out, "{}", "Manifests:".bold());
    for req in &report.requirements {
        let line = format!(
            "  {} / {}: {}/{}",
            req.container_label,
            req.label,
            req.delivered(),
            req.requested
        );
        if req.outstanding == 0 {
            let _ = writeln!(out, "{} {}", line, "✓".green());
        } else {
            let _ = writeln!(out, "{} ({} outstanding)", line, req.outstanding.to_string().red());
        }
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "{}", "Agents:".bold());
    for agent in &report.agents {
        let _ = writeln!(
            out,
            "  {}: delivered {} in {} tasks ({} failed)",
            agent.name, agent.delivered, agent.tasks_succeeded, agent.tasks_failed
        );
    }

    let obsolete = report
        .tasks
        .iter()
        .filter(|task| task.result == TaskResult::Obsolete)
        .count();
    if obsolete > 0 {
        let _ = writeln!(out, "  {} tasks ended obsolete", obsolete.to_string().dimmed());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use haulage_core::domain::container::ContainerId;
    use haulage_core::domain::claim::TaskId;
    use haulage_core::domain::item::ItemId;
    use haulage_core::domain::manifest::RequirementId;
    use haulage_swarm::domain::{AgentReport, RequirementReport, SwarmId};

    fn report(status: SwarmStatus, outstanding: u32) -> SwarmReport {
        SwarmReport {
            swarm_id: SwarmId::new(),
            status,
            ticks: 42,
            requirements: vec![RequirementReport {
                container: ContainerId::new(),
                container_label: "Pod A".to_string(),
                requirement: RequirementId::new(),
                label: "Steel".to_string(),
                requested: 100,
                outstanding,
            }],
            agents: vec![AgentReport {
                agent: AgentId::new(),
                name: "alice".to_string(),
                delivered: 100 - outstanding,
                tasks_succeeded: 2,
                tasks_failed: 0,
                ticks: 42,
            }],
            tasks: vec![],
            started_at: Utc::now(),
            finished_at: Utc::now(),
        }
    }

    #[test]
    fn test_render_satisfied_report() {
        colored::control::set_override(false);
        let text = render_report("steel-run", &report(SwarmStatus::Satisfied, 0));

        assert!(text.contains("Scenario steel-run (42 ticks)"));
        assert!(text.contains("Status: satisfied"));
        assert!(text.contains("Pod A / Steel: 100/100 ✓"));
        assert!(text.contains("alice: delivered 100 in 2 tasks (0 failed)"));
    }

    #[test]
    fn test_render_incomplete_report() {
        colored::control::set_override(false);
        let text = render_report("steel-run", &report(SwarmStatus::Exhausted, 70));

        assert!(text.contains("Status: incomplete"));
        assert!(text.contains("Pod A / Steel: 30/100 (70 outstanding)"));
    }

    #[test]
    fn test_describe_event_names_the_agent() {
        let agent = AgentId::new();
        let names = HashMap::from([(agent, "alice".to_string())]);
        let task_id = TaskId::new();

        let line = describe_event(
            &HaulEvent::ItemPickedUp {
                task_id,
                agent,
                item: ItemId::new(),
                requirement: RequirementId::new(),
                count: 12,
                picked_at: Utc::now(),
            },
            &names,
        );
        assert_eq!(line, format!("[alice] pickup   task={} count=12", task_id));

        let container = ContainerId::new();
        let line = describe_event(
            &HaulEvent::ContainerSatisfied {
                container,
                satisfied_at: Utc::now(),
            },
            &names,
        );
        assert_eq!(line, format!("loaded   container={}", container));
    }
}
