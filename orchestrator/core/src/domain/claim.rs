// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # In-Flight Task Claims
//!
//! Every running haul task publishes a [`TaskClaim`] so that other agents can
//! compute demand net of work already under way. The index is the only
//! coordination point between agents; it is read far more often than written.
//!
//! ## Ordering
//!
//! - A claim is published before the agent reserves or travels.
//! - Readers take their claim snapshot before reading requirement counts.
//! - Delivery decrements the requirement before the claim is retracted.
//! - Claims that grow are sized by [`ClaimIndex::claim_within_demand`], which
//!   reads demand and publishes under one write lock, so two agents can
//!   never both claim the same shortfall.
//!
//! Together these make any race resolve toward under-counting demand,
//! never over-counting it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;
use uuid::Uuid;

use crate::domain::agent::AgentId;
use crate::domain::container::ContainerId;
use crate::domain::fungibility::FungibilityRule;
use crate::domain::item::Item;
use crate::domain::manifest::Requirement;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskClaim {
    pub task_id: TaskId,
    pub agent: AgentId,
    /// Snapshot of the instance being hauled; replaced after pickup.
    pub item: Item,
    pub container: ContainerId,
    pub count: u32,
    pub claimed_at: DateTime<Utc>,
}

pub trait ClaimIndex: Send + Sync {
    /// Insert or replace the claim for `(claim.agent, claim.container)`.
    fn publish(&self, claim: TaskClaim);

    /// Remove the claim for `(agent, container)`, returning it.
    fn retract(&self, agent: AgentId, container: ContainerId) -> Option<TaskClaim>;

    /// Snapshot of all claims toward `container`.
    fn claims_toward(&self, container: ContainerId) -> Vec<TaskClaim>;

    fn claim_of(&self, agent: AgentId, container: ContainerId) -> Option<TaskClaim>;

    /// Compute demand and claim against it in one step.
    ///
    /// Under the index's write lock, `requirement` is loaded and its demand
    /// for `claim.agent` is computed net of every other claim toward
    /// `claim.container`. The claim is then published with its count capped
    /// at that demand but never below `held`, the amount the agent already
    /// carries. A zero count retracts the agent's claim instead.
    fn claim_within_demand(
        &self,
        claim: TaskClaim,
        held: u32,
        requirement: &dyn Fn() -> Option<Requirement>,
        rule: &dyn FungibilityRule,
    ) -> ClaimGrant;
}

/// Result of [`ClaimIndex::claim_within_demand`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimGrant {
    /// Demand seen under the lock, net of other agents' claims.
    pub demand: u32,
    /// Count now claimed; zero when no claim is held.
    pub count: u32,
}

/// Demand on `requirement` left for `agent` given a snapshot of claims
/// toward the same container. Only other agents' claims on covered items
/// count; the result is clamped at zero.
pub fn demand_net_of_claims(
    agent: AgentId,
    requirement: &Requirement,
    claims: &[TaskClaim],
    rule: &dyn FungibilityRule,
) -> u32 {
    if requirement.is_satisfied() {
        return 0;
    }
    if !requirement.has_any_thing() {
        warn!(
            "Requirement {} wants {} but lists no things",
            requirement.id, requirement.count_to_transfer
        );
        return 0;
    }
    let in_flight: u32 = claims
        .iter()
        .filter(|claim| claim.agent != agent && requirement.covers(&claim.item, rule))
        .map(|claim| claim.count)
        .sum();
    requirement.count_to_transfer.saturating_sub(in_flight)
}
