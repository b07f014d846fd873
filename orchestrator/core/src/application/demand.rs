// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Demand Resolver
//!
//! How much of a requirement is still unclaimed from one agent's point of
//! view: the outstanding count minus what *other* agents already carry or
//! are about to carry toward the same container.
//!
//! Claims are snapshotted before the manifest is read. A delivery lowers the
//! outstanding count before its claim is retracted, so a reader can see a
//! delivery twice (as a lower count and as a claim) but never zero times.
//! The error is always toward under-estimating demand.

use tracing::warn;

use crate::application::context::HaulContext;
use crate::domain::agent::AgentId;
use crate::domain::container::ContainerId;
use crate::domain::manifest::{Requirement, RequirementId};

pub use crate::domain::claim::demand_net_of_claims;

/// A requirement paired with the demand left for one agent.
#[derive(Debug, Clone)]
pub struct Outstanding {
    pub requirement: Requirement,
    pub demand: u32,
}

#[derive(Clone)]
pub struct DemandResolver {
    ctx: HaulContext,
}

impl DemandResolver {
    pub fn new(ctx: HaulContext) -> Self {
        Self { ctx }
    }

    /// Remaining demand on `requirement` for `agent`, net of other agents'
    /// claims toward `container`.
    pub fn remaining_demand(&self, agent: AgentId, requirement: &Requirement, container: ContainerId) -> u32 {
        if requirement.is_satisfied() {
            return 0;
        }
        if !requirement.has_any_thing() {
            warn!(
                "Requirement {} on container {} wants {} but lists no things",
                requirement.id, container, requirement.count_to_transfer
            );
            return 0;
        }
        if self.ctx.containers.container(container).is_none() {
            warn!(
                "Demand requested for requirement {} on unknown container {}",
                requirement.label(),
                container
            );
            return 0;
        }
        let claims = self.ctx.claims.claims_toward(container);
        demand_net_of_claims(agent, requirement, &claims, self.ctx.fungibility.as_ref())
    }

    /// Every requirement of the container with positive demand for `agent`,
    /// in manifest order. `None` when the container does not exist.
    pub fn outstanding(&self, agent: AgentId, container: ContainerId) -> Option<Vec<Outstanding>> {
        let claims = self.ctx.claims.claims_toward(container);
        let Some(target) = self.ctx.containers.container(container) else {
            warn!("Demand requested for unknown container {}", container);
            return None;
        };

        let rule = self.ctx.fungibility.as_ref();
        Some(
            target
                .manifest
                .requirements
                .into_iter()
                .filter_map(|requirement| {
                    let demand = demand_net_of_claims(agent, &requirement, &claims, rule);
                    (demand > 0).then_some(Outstanding { requirement, demand })
                })
                .collect(),
        )
    }

    /// Re-read a single requirement and return its fresh demand.
    pub fn current(&self, agent: AgentId, container: ContainerId, requirement: RequirementId) -> u32 {
        let claims = self.ctx.claims.claims_toward(container);
        let Some(target) = self.ctx.containers.container(container) else {
            warn!("Demand requested for unknown container {}", container);
            return 0;
        };
        match target.manifest.requirement(requirement) {
            Some(req) => demand_net_of_claims(agent, req, &claims, self.ctx.fungibility.as_ref()),
            None => 0,
        }
    }
}
