// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Haul Job and Step Table
//!
//! A [`HaulJob`] binds one agent to a target item (target A) and a container
//! (target B). The executor walks the job through the linear [`HaulStep`]
//! sequence below; the [`STEP_TABLE`] records, per step, which guards are
//! checked every turn and whether the step runs in the same turn as the one
//! before it.
//!
//! | Step | Guards | Same turn as previous |
//! |------|--------|-----------------------|
//! | `ReserveTarget` | item, container | no |
//! | `ReserveQueued` | item, container | yes |
//! | `TravelToItem` | item, container, cell | no |
//! | `DetermineHaulCount` | item, container | yes |
//! | `PickUp` | item, container, cell | yes |
//! | `RegisterFulfilling` | container | yes |
//! | `CollectDuplicates` | container | yes |
//! | `JumpToNextQueued` | container | yes |
//! | `TravelToContainer` | container | no |
//! | `StepOffContainer` | container | yes |
//! | `AssembleContainer` | container | yes |
//! | `Deposit` | container | yes |
//! | `NextDepositTarget` | container | yes |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::agent::AgentId;
use crate::domain::claim::TaskId;
use crate::domain::container::ContainerId;
use crate::domain::item::ItemId;

/// Work order produced by the job giver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HaulJob {
    pub task_id: TaskId,
    pub agent: AgentId,
    pub item: ItemId,
    pub container: ContainerId,
    /// Intended quantity; re-evaluated at pickup.
    pub count: u32,
    /// Extra same-kind instances at the target's cell, collected in order.
    #[serde(default)]
    pub queued: Vec<ItemId>,
    /// Loading jobs may take items that are forbidden for ordinary hauling.
    pub ignore_forbidden: bool,
    pub created_at: DateTime<Utc>,
}

impl HaulJob {
    pub fn new(agent: AgentId, item: ItemId, container: ContainerId, count: u32) -> Self {
        Self {
            task_id: TaskId::new(),
            agent,
            item,
            container,
            count,
            queued: Vec::new(),
            ignore_forbidden: true,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HaulStep {
    ReserveTarget,
    ReserveQueued,
    TravelToItem,
    DetermineHaulCount,
    PickUp,
    RegisterFulfilling,
    CollectDuplicates,
    JumpToNextQueued,
    TravelToContainer,
    /// Leave the container's own cell, or a cell shared with another agent,
    /// before building and depositing.
    StepOffContainer,
    AssembleContainer,
    Deposit,
    NextDepositTarget,
}

impl HaulStep {
    pub fn spec(self) -> &'static StepSpec {
        // STEP_TABLE is declared in step order.
        &STEP_TABLE[self as usize]
    }

    /// Step that follows on normal completion, `None` after the last.
    pub fn next(self) -> Option<HaulStep> {
        STEP_TABLE.get(self as usize + 1).map(|spec| spec.step)
    }

    /// Steps after which the carried stack belongs to the agent.
    pub fn is_carrying(self) -> bool {
        self as usize > HaulStep::PickUp as usize
    }
}

impl fmt::Display for HaulStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Per-turn abort checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// Target item still exists on the map.
    ItemPresent,
    /// Container exists, is not forbidden and is still loading.
    ContainerValid,
    /// Nobody else stands on the target item's cell.
    CellUnoccupied,
}

#[derive(Debug)]
pub struct StepSpec {
    pub step: HaulStep,
    pub guards: &'static [Guard],
    /// Runs in the same turn as the previous step.
    pub atomic_with_previous: bool,
}

const ITEM_AND_CONTAINER: &[Guard] = &[Guard::ItemPresent, Guard::ContainerValid];
const INTERACTING: &[Guard] = &[Guard::ItemPresent, Guard::ContainerValid, Guard::CellUnoccupied];
const CONTAINER_ONLY: &[Guard] = &[Guard::ContainerValid];

pub static STEP_TABLE: [StepSpec; 13] = [
    StepSpec { step: HaulStep::ReserveTarget, guards: ITEM_AND_CONTAINER, atomic_with_previous: false },
    StepSpec { step: HaulStep::ReserveQueued, guards: ITEM_AND_CONTAINER, atomic_with_previous: true },
    StepSpec { step: HaulStep::TravelToItem, guards: INTERACTING, atomic_with_previous: false },
    StepSpec { step: HaulStep::DetermineHaulCount, guards: ITEM_AND_CONTAINER, atomic_with_previous: true },
    StepSpec { step: HaulStep::PickUp, guards: INTERACTING, atomic_with_previous: true },
    StepSpec { step: HaulStep::RegisterFulfilling, guards: CONTAINER_ONLY, atomic_with_previous: true },
    StepSpec { step: HaulStep::CollectDuplicates, guards: CONTAINER_ONLY, atomic_with_previous: true },
    StepSpec { step: HaulStep::JumpToNextQueued, guards: CONTAINER_ONLY, atomic_with_previous: true },
    StepSpec { step: HaulStep::TravelToContainer, guards: CONTAINER_ONLY, atomic_with_previous: false },
    StepSpec { step: HaulStep::StepOffContainer, guards: CONTAINER_ONLY, atomic_with_previous: true },
    StepSpec { step: HaulStep::AssembleContainer, guards: CONTAINER_ONLY, atomic_with_previous: true },
    StepSpec { step: HaulStep::Deposit, guards: CONTAINER_ONLY, atomic_with_previous: true },
    StepSpec { step: HaulStep::NextDepositTarget, guards: CONTAINER_ONLY, atomic_with_previous: true },
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailReason {
    ItemVanished,
    ContainerVanished,
    ContainerForbidden,
    LoadingCancelled,
    ReservationLost,
    Unreachable,
    /// The target cell stayed occupied past the wait budget.
    Interrupted,
}

impl fmt::Display for FailReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::ItemVanished => "target item destroyed or vanished",
            Self::ContainerVanished => "container destroyed",
            Self::ContainerForbidden => "container forbidden",
            Self::LoadingCancelled => "loading cancelled",
            Self::ReservationLost => "target reserved by another agent",
            Self::Unreachable => "no path",
            Self::Interrupted => "target cell occupied too long",
        };
        f.write_str(text)
    }
}

/// Result of advancing a task by one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Still running; call again next turn.
    Running,
    /// Finished. `delivered` is what landed in the container; zero with
    /// `obsolete` set means demand vanished before pickup.
    Succeeded { delivered: u32, obsolete: bool },
    Failed(FailReason),
}

impl StepOutcome {
    pub fn is_finished(&self) -> bool {
        !matches!(self, Self::Running)
    }
}
