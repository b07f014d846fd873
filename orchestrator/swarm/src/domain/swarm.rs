// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Swarm Domain Aggregates
//!
//! Defines the core types for a concurrent loading run:
//!
//! - [`Swarm`]: aggregate root tracking which agents load which containers.
//! - [`SwarmId`]: unique identifier (UUID newtype).
//! - [`SwarmReport`]: what a finished run delivered and how its tasks ended.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use haulage_core::domain::agent::AgentId;
use haulage_core::domain::claim::TaskId;
use haulage_core::domain::container::ContainerId;
use haulage_core::domain::haul::{FailReason, StepOutcome};
use haulage_core::domain::manifest::RequirementId;

/// Unique identifier for a [`Swarm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SwarmId(pub Uuid);

impl SwarmId {
    /// Generate a new random `SwarmId`.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SwarmId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SwarmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwarmStatus {
    Created,
    Running,
    /// Every container's manifest was satisfied.
    Satisfied,
    /// Stopped at the tick limit with work outstanding.
    Exhausted,
    Cancelled,
}

/// Aggregate root for a group of agents loading a set of containers.
///
/// # Invariants
///
/// - Agents and containers are listed once each, in insertion order.
/// - A swarm runs at most once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Swarm {
    pub id: SwarmId,
    pub agents: Vec<AgentId>,
    pub containers: Vec<ContainerId>,
    pub status: SwarmStatus,
    pub created_at: DateTime<Utc>,
}

impl Swarm {
    pub fn new(agents: Vec<AgentId>, containers: Vec<ContainerId>) -> Self {
        let mut unique_agents = Vec::with_capacity(agents.len());
        for agent in agents {
            if !unique_agents.contains(&agent) {
                unique_agents.push(agent);
            }
        }
        let mut unique_containers = Vec::with_capacity(containers.len());
        for container in containers {
            if !unique_containers.contains(&container) {
                unique_containers.push(container);
            }
        }
        Self {
            id: SwarmId::new(),
            agents: unique_agents,
            containers: unique_containers,
            status: SwarmStatus::Created,
            created_at: Utc::now(),
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self.status,
            SwarmStatus::Satisfied | SwarmStatus::Exhausted | SwarmStatus::Cancelled
        )
    }
}

/// How a single haul task ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskResult {
    Delivered { count: u32 },
    Obsolete,
    Failed { reason: FailReason },
    /// The executor reported a contract violation.
    Error { message: String },
}

impl TaskResult {
    pub fn from_outcome(outcome: &StepOutcome) -> Option<Self> {
        match outcome {
            StepOutcome::Running => None,
            StepOutcome::Succeeded { obsolete: true, .. } => Some(Self::Obsolete),
            StepOutcome::Succeeded { delivered, .. } => Some(Self::Delivered { count: *delivered }),
            StepOutcome::Failed(reason) => Some(Self::Failed { reason: reason.clone() }),
        }
    }

    pub fn delivered(&self) -> u32 {
        match self {
            Self::Delivered { count } => *count,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: TaskId,
    pub agent: AgentId,
    pub container: ContainerId,
    pub result: TaskResult,
    pub finished_tick: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequirementReport {
    pub container: ContainerId,
    pub container_label: String,
    pub requirement: RequirementId,
    pub label: String,
    /// Outstanding count when the run started.
    pub requested: u32,
    pub outstanding: u32,
}

impl RequirementReport {
    pub fn delivered(&self) -> u32 {
        self.requested.saturating_sub(self.outstanding)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentReport {
    pub agent: AgentId,
    pub name: String,
    pub delivered: u32,
    pub tasks_succeeded: usize,
    pub tasks_failed: usize,
    pub ticks: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmReport {
    pub swarm_id: SwarmId,
    pub status: SwarmStatus,
    /// Longest number of turns any agent ran.
    pub ticks: u64,
    pub requirements: Vec<RequirementReport>,
    pub agents: Vec<AgentReport>,
    pub tasks: Vec<TaskRecord>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SwarmReport {
    pub fn total_delivered(&self) -> u32 {
        self.requirements.iter().map(RequirementReport::delivered).sum()
    }

    pub fn total_outstanding(&self) -> u32 {
        self.requirements.iter().map(|req| req.outstanding).sum()
    }

    pub fn is_satisfied(&self) -> bool {
        self.status == SwarmStatus::Satisfied
    }
}
