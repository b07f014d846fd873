// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::agent::AgentId;
use crate::domain::claim::TaskId;
use crate::domain::container::ContainerId;
use crate::domain::haul::{FailReason, HaulStep};
use crate::domain::item::ItemId;
use crate::domain::manifest::RequirementId;
use crate::domain::selection::SelectionTier;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HaulEvent {
    CandidateSelected {
        agent: AgentId,
        container: ContainerId,
        item: ItemId,
        tier: SelectionTier,
        selected_at: DateTime<Utc>,
    },
    TaskStarted {
        task_id: TaskId,
        agent: AgentId,
        container: ContainerId,
        item: ItemId,
        count: u32,
        started_at: DateTime<Utc>,
    },
    StepEntered {
        task_id: TaskId,
        agent: AgentId,
        step: HaulStep,
    },
    ItemPickedUp {
        task_id: TaskId,
        agent: AgentId,
        item: ItemId,
        requirement: RequirementId,
        count: u32,
        picked_at: DateTime<Utc>,
    },
    ItemDeposited {
        task_id: TaskId,
        agent: AgentId,
        container: ContainerId,
        target: usize,
        count: u32,
        deposited_at: DateTime<Utc>,
    },
    TaskSucceeded {
        task_id: TaskId,
        agent: AgentId,
        container: ContainerId,
        delivered: u32,
        obsolete: bool,
        finished_at: DateTime<Utc>,
    },
    TaskFailed {
        task_id: TaskId,
        agent: AgentId,
        container: ContainerId,
        reason: FailReason,
        failed_at: DateTime<Utc>,
    },
    ContainerSatisfied {
        container: ContainerId,
        satisfied_at: DateTime<Utc>,
    },
}

impl HaulEvent {
    pub fn agent(&self) -> Option<AgentId> {
        match self {
            Self::CandidateSelected { agent, .. }
            | Self::TaskStarted { agent, .. }
            | Self::StepEntered { agent, .. }
            | Self::ItemPickedUp { agent, .. }
            | Self::ItemDeposited { agent, .. }
            | Self::TaskSucceeded { agent, .. }
            | Self::TaskFailed { agent, .. } => Some(*agent),
            Self::ContainerSatisfied { .. } => None,
        }
    }
}
