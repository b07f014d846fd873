// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! In-memory claim index.
//!
//! Keyed by `(agent, container)` so an agent holds at most one claim per
//! container. Readers get cloned snapshots and never hold the lock while
//! computing. Only `claim_within_demand` computes under the write lock.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::agent::AgentId;
use crate::domain::claim::{demand_net_of_claims, ClaimGrant, ClaimIndex, TaskClaim};
use crate::domain::container::ContainerId;
use crate::domain::fungibility::FungibilityRule;
use crate::domain::manifest::Requirement;

#[derive(Clone, Default)]
pub struct InMemoryClaimIndex {
    claims: Arc<RwLock<HashMap<(AgentId, ContainerId), TaskClaim>>>,
}

impl InMemoryClaimIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.claims.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.read().is_empty()
    }
}

impl ClaimIndex for InMemoryClaimIndex {
    fn publish(&self, claim: TaskClaim) {
        self.claims.write().insert((claim.agent, claim.container), claim);
    }

    fn retract(&self, agent: AgentId, container: ContainerId) -> Option<TaskClaim> {
        self.claims.write().remove(&(agent, container))
    }

    fn claims_toward(&self, container: ContainerId) -> Vec<TaskClaim> {
        let mut claims: Vec<TaskClaim> = self
            .claims
            .read()
            .values()
            .filter(|claim| claim.container == container)
            .cloned()
            .collect();
        claims.sort_by_key(|claim| claim.agent);
        claims
    }

    fn claim_of(&self, agent: AgentId, container: ContainerId) -> Option<TaskClaim> {
        self.claims.read().get(&(agent, container)).cloned()
    }

    fn claim_within_demand(
        &self,
        mut claim: TaskClaim,
        held: u32,
        requirement: &dyn Fn() -> Option<Requirement>,
        rule: &dyn FungibilityRule,
    ) -> ClaimGrant {
        let mut claims = self.claims.write();
        let others: Vec<TaskClaim> = claims
            .values()
            .filter(|other| other.container == claim.container && other.agent != claim.agent)
            .cloned()
            .collect();
        let demand = requirement()
            .map(|req| demand_net_of_claims(claim.agent, &req, &others, rule))
            .unwrap_or(0);

        let key = (claim.agent, claim.container);
        let count = claim.count.min(demand).max(held);
        if count == 0 {
            claims.remove(&key);
        } else {
            claim.count = count;
            claims.insert(key, claim);
        }
        ClaimGrant { demand, count }
    }
}
