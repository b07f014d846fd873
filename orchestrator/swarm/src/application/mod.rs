// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Swarm run loop
//!
//! Drives a group of agents against a shared world until the loading
//! manifests are satisfied or the tick limit is hit.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** One tokio task per agent. Agents share nothing but the
//!   world, the reservation oracle and the claim index; claims are sized
//!   atomically by the index, so turns may run concurrently.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use haulage_core::application::context::HaulContext;
use haulage_core::application::executor::HaulTaskRun;
use haulage_core::application::job_giver::LoadTransportersJobGiver;
use haulage_core::domain::agent::AgentId;
use haulage_core::domain::container::ContainerId;
use haulage_core::domain::haul::{FailReason, HaulJob};

use crate::domain::{
    AgentReport, RequirementReport, Swarm, SwarmId, SwarmReport, SwarmStatus, TaskRecord, TaskResult,
};

#[derive(Debug, Error)]
pub enum SwarmError {
    #[error("swarm {0} not found")]
    NotFound(SwarmId),

    #[error("agent {0} not found")]
    AgentNotFound(AgentId),

    #[error("container {0} not found")]
    ContainerNotFound(ContainerId),

    #[error("swarm {0} has already run")]
    AlreadyRun(SwarmId),

    #[error("swarm has no agents")]
    NoAgents,

    #[error("agent task failed: {0}")]
    AgentTask(String),
}

#[async_trait]
pub trait SwarmService: Send + Sync {
    async fn create_swarm(&self, agents: Vec<AgentId>, containers: Vec<ContainerId>) -> Result<SwarmId, SwarmError>;
    async fn run(&self, swarm_id: SwarmId) -> Result<SwarmReport, SwarmError>;
    async fn cancel(&self, swarm_id: SwarmId) -> Result<(), SwarmError>;
    async fn get_swarm(&self, swarm_id: SwarmId) -> Option<Swarm>;
}

struct SwarmEntry {
    swarm: Swarm,
    cancel: watch::Sender<bool>,
}

pub struct SwarmCoordinator {
    ctx: HaulContext,
    swarms: Arc<RwLock<HashMap<SwarmId, SwarmEntry>>>,
}

impl SwarmCoordinator {
    pub fn new(ctx: HaulContext) -> Self {
        Self {
            ctx,
            swarms: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn context(&self) -> &HaulContext {
        &self.ctx
    }

    /// Every agent and every container in the world, in store order.
    pub async fn create_world_swarm(&self) -> Result<SwarmId, SwarmError> {
        let agents = self.ctx.agents.agents().into_iter().map(|agent| agent.id).collect();
        let containers = self
            .ctx
            .containers
            .containers()
            .into_iter()
            .map(|container| container.id)
            .collect();
        self.create_swarm(agents, containers).await
    }

    fn snapshot_requirements(&self, containers: &[ContainerId]) -> Vec<RequirementReport> {
        containers
            .iter()
            .filter_map(|id| self.ctx.containers.container(*id))
            .flat_map(|container| {
                let container_id = container.id;
                let label = container.label;
                container
                    .manifest
                    .requirements
                    .into_iter()
                    .map(move |req| RequirementReport {
                        container: container_id,
                        container_label: label.clone(),
                        requirement: req.id,
                        label: req.label().to_string(),
                        requested: req.count_to_transfer,
                        outstanding: req.count_to_transfer,
                    })
            })
            .collect()
    }

    fn refresh_outstanding(&self, requirements: &mut [RequirementReport]) {
        for report in requirements.iter_mut() {
            // A vanished container or requirement has nothing left to take.
            report.outstanding = self
                .ctx
                .containers
                .container(report.container)
                .and_then(|container| {
                    container
                        .manifest
                        .requirement(report.requirement)
                        .map(|req| req.count_to_transfer)
                })
                .unwrap_or(0);
        }
    }
}

#[async_trait]
impl SwarmService for SwarmCoordinator {
    async fn create_swarm(&self, agents: Vec<AgentId>, containers: Vec<ContainerId>) -> Result<SwarmId, SwarmError> {
        if agents.is_empty() {
            return Err(SwarmError::NoAgents);
        }
        if let Some(missing) = agents.iter().find(|id| self.ctx.agents.agent(**id).is_none()) {
            return Err(SwarmError::AgentNotFound(*missing));
        }
        if let Some(missing) = containers
            .iter()
            .find(|id| self.ctx.containers.container(**id).is_none())
        {
            return Err(SwarmError::ContainerNotFound(*missing));
        }

        let swarm = Swarm::new(agents, containers);
        let id = swarm.id;
        let (cancel, _) = watch::channel(false);
        info!(
            "Created swarm {} with {} agents and {} containers",
            id,
            swarm.agents.len(),
            swarm.containers.len()
        );
        self.swarms.write().insert(id, SwarmEntry { swarm, cancel });
        Ok(id)
    }

    async fn run(&self, swarm_id: SwarmId) -> Result<SwarmReport, SwarmError> {
        let (swarm, cancel_rx) = {
            let mut swarms = self.swarms.write();
            let entry = swarms.get_mut(&swarm_id).ok_or(SwarmError::NotFound(swarm_id))?;
            if entry.swarm.status != SwarmStatus::Created {
                return Err(SwarmError::AlreadyRun(swarm_id));
            }
            entry.swarm.status = SwarmStatus::Running;
            (entry.swarm.clone(), entry.cancel.subscribe())
        };

        let started_at = Utc::now();
        let mut requirements = self.snapshot_requirements(&swarm.containers);
        let swarm_cfg = &self.ctx.config.spec.swarm;
        info!(
            "Running swarm {} ({} agents, max {} ticks)",
            swarm_id,
            swarm.agents.len(),
            swarm_cfg.max_ticks
        );
        metrics::gauge!("haulage_swarm_active_agents").set(swarm.agents.len() as f64);

        let mut handles = Vec::with_capacity(swarm.agents.len());
        for agent in &swarm.agents {
            let worker = AgentWorker {
                agent: *agent,
                containers: swarm.containers.clone(),
                giver: LoadTransportersJobGiver::new(self.ctx.clone()),
                ctx: self.ctx.clone(),
                cancel: cancel_rx.clone(),
                max_ticks: swarm_cfg.max_ticks,
                idle_backoff: swarm_cfg.idle_backoff_ticks,
                interval: Duration::from_millis(swarm_cfg.tick_interval_ms),
            };
            handles.push(tokio::spawn(worker.drive()));
        }

        let mut summaries = Vec::with_capacity(handles.len());
        let mut join_error = None;
        for handle in handles {
            match handle.await {
                Ok(summary) => summaries.push(summary),
                Err(e) => {
                    error!("Agent task in swarm {} failed: {}", swarm_id, e);
                    join_error.get_or_insert_with(|| e.to_string());
                }
            }
        }
        metrics::gauge!("haulage_swarm_active_agents").set(0.0);

        self.refresh_outstanding(&mut requirements);
        let cancelled = *cancel_rx.borrow();
        let status = if all_satisfied(&self.ctx, &swarm.containers) {
            SwarmStatus::Satisfied
        } else if cancelled {
            SwarmStatus::Cancelled
        } else {
            SwarmStatus::Exhausted
        };

        if let Some(entry) = self.swarms.write().get_mut(&swarm_id) {
            entry.swarm.status = status;
        }
        if let Some(message) = join_error {
            return Err(SwarmError::AgentTask(message));
        }

        let ticks = summaries.iter().map(|summary| summary.ticks).max().unwrap_or(0);
        let agents = summaries
            .iter()
            .map(|summary| AgentReport {
                agent: summary.agent,
                name: self
                    .ctx
                    .agents
                    .agent(summary.agent)
                    .map(|agent| agent.name)
                    .unwrap_or_default(),
                delivered: summary.records.iter().map(|record| record.result.delivered()).sum(),
                tasks_succeeded: summary
                    .records
                    .iter()
                    .filter(|record| matches!(record.result, TaskResult::Delivered { .. }))
                    .count(),
                tasks_failed: summary
                    .records
                    .iter()
                    .filter(|record| matches!(record.result, TaskResult::Failed { .. } | TaskResult::Error { .. }))
                    .count(),
                ticks: summary.ticks,
            })
            .collect();
        let mut tasks: Vec<TaskRecord> = summaries.into_iter().flat_map(|summary| summary.records).collect();
        tasks.sort_by_key(|record| record.finished_tick);

        let status_label = match status {
            SwarmStatus::Satisfied => "satisfied",
            SwarmStatus::Cancelled => "cancelled",
            _ => "exhausted",
        };
        metrics::counter!("haulage_swarm_runs_total", "status" => status_label).increment(1);
        metrics::histogram!("haulage_swarm_ticks").record(ticks as f64);

        let report = SwarmReport {
            swarm_id,
            status,
            ticks,
            requirements,
            agents,
            tasks,
            started_at,
            finished_at: Utc::now(),
        };
        info!(
            "Swarm {} finished as {:?} after {} ticks: {} delivered, {} outstanding",
            swarm_id,
            status,
            ticks,
            report.total_delivered(),
            report.total_outstanding()
        );
        Ok(report)
    }

    async fn cancel(&self, swarm_id: SwarmId) -> Result<(), SwarmError> {
        let swarms = self.swarms.read();
        let entry = swarms.get(&swarm_id).ok_or(SwarmError::NotFound(swarm_id))?;
        entry.cancel.send_replace(true);
        info!("Cancellation requested for swarm {}", swarm_id);
        Ok(())
    }

    async fn get_swarm(&self, swarm_id: SwarmId) -> Option<Swarm> {
        self.swarms.read().get(&swarm_id).map(|entry| entry.swarm.clone())
    }
}

fn all_satisfied(ctx: &HaulContext, containers: &[ContainerId]) -> bool {
    containers.iter().all(|id| {
        ctx.containers
            .container(*id)
            .map(|container| !container.still_loading() || !container.anything_left_to_load())
            .unwrap_or(true)
    })
}

struct AgentSummary {
    agent: AgentId,
    ticks: u64,
    records: Vec<TaskRecord>,
}

struct AgentWorker {
    agent: AgentId,
    containers: Vec<ContainerId>,
    ctx: HaulContext,
    giver: LoadTransportersJobGiver,
    cancel: watch::Receiver<bool>,
    max_ticks: u64,
    idle_backoff: u32,
    interval: Duration,
}

impl AgentWorker {
    async fn drive(self) -> AgentSummary {
        let mut run: Option<HaulTaskRun> = None;
        let mut records = Vec::new();
        let mut backoff = 0u32;
        let mut ticks = 0u64;

        while ticks < self.max_ticks {
            if *self.cancel.borrow() {
                debug!("Agent {} stopping: swarm cancelled", self.agent);
                break;
            }

            if run.is_none() && all_satisfied(&self.ctx, &self.containers) {
                break;
            }
            ticks += 1;

            let finished = match run.as_mut() {
                Some(task) => self.tick_task(task, ticks),
                None if backoff > 0 => {
                    backoff -= 1;
                    None
                }
                None => {
                    match self.next_job() {
                        Some(job) => run = Some(HaulTaskRun::start(self.ctx.clone(), job)),
                        None => backoff = self.idle_backoff,
                    }
                    None
                }
            };
            if let Some(record) = finished {
                records.push(record);
                run = None;
            }

            if self.interval.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(self.interval).await;
            }
        }

        if let Some(mut task) = run.take() {
            warn!("Agent {} abandoning task {} at shutdown", self.agent, task.task_id());
            task.abandon();
            records.push(self.record(
                &task,
                TaskResult::Failed {
                    reason: FailReason::Interrupted,
                },
                ticks,
            ));
        }

        AgentSummary {
            agent: self.agent,
            ticks,
            records,
        }
    }

    fn next_job(&self) -> Option<HaulJob> {
        let agent = self.ctx.agents.agent(self.agent)?;
        if agent.loading_duty.is_some() {
            return self.giver.try_give_job(&agent);
        }
        self.containers
            .iter()
            .find_map(|container| self.giver.work_giver().job_on(&agent, *container))
    }

    fn tick_task(&self, task: &mut HaulTaskRun, tick: u64) -> Option<TaskRecord> {
        match task.tick() {
            Ok(outcome) => TaskResult::from_outcome(&outcome).map(|result| self.record(task, result, tick)),
            Err(e) => {
                error!("Haul task {} of agent {} errored: {}", task.task_id(), self.agent, e);
                Some(self.record(task, TaskResult::Error { message: e.to_string() }, tick))
            }
        }
    }

    fn record(&self, task: &HaulTaskRun, result: TaskResult, tick: u64) -> TaskRecord {
        TaskRecord {
            task_id: task.task_id(),
            agent: self.agent,
            container: task.job().container,
            result,
            finished_tick: tick,
        }
    }
}
