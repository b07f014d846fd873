// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Candidate Selector
//!
//! Picks the item an agent should haul next toward a container. Tiers are
//! tried in order and the first hit wins:
//!
//! 1. **Exact match**: closest reachable instance already listed on a
//!    requirement with positive demand, reservable by the agent.
//! 2. **Rescue**: first listed sapient instance (manifest order) that cannot
//!    board on its own, reservable and reachable at any danger.
//! 3. **Contention check**: if a listed instance is reachable but was
//!    rejected as reserved, stop and report contention instead of
//!    substituting around another agent's work.
//! 4. **Substitute**: closest reachable unlisted instance equivalent to a
//!    listed one.
//!
//! Working sets are built per call and never cached between calls.
//! Selection only reads: events and metrics for a pick are emitted by the
//! job giver once a job is actually built.

use std::collections::HashSet;
use tracing::debug;

use crate::application::context::HaulContext;
use crate::application::demand::DemandResolver;
use crate::domain::agent::Agent;
use crate::domain::container::ContainerId;
use crate::domain::item::{Item, ItemCategory, ItemDef, ItemId};
use crate::domain::reachability::TraversalPolicy;
use crate::domain::selection::{Selection, SelectionTier};

#[derive(Clone)]
pub struct CandidateSelector {
    ctx: HaulContext,
    demand: DemandResolver,
}

impl CandidateSelector {
    pub fn new(ctx: HaulContext) -> Self {
        let demand = DemandResolver::new(ctx.clone());
        Self { ctx, demand }
    }

    pub fn demand(&self) -> &DemandResolver {
        &self.demand
    }

    /// Binary form of [`select`](Self::select).
    pub fn select_item(&self, agent: &Agent, container: ContainerId) -> Option<ItemId> {
        self.select(agent, container).into_item().map(|item| item.id)
    }

    pub fn select(&self, agent: &Agent, container: ContainerId) -> Selection {
        let Some(outstanding) = self.demand.outstanding(agent.id, container) else {
            return Selection::Satisfied;
        };
        if outstanding.is_empty() {
            return Selection::Satisfied;
        }

        // Listed instances in manifest order, deduplicated.
        let mut seen = HashSet::new();
        let mut candidates: Vec<Item> = Vec::new();
        let mut needed_defs: HashSet<ItemDef> = HashSet::new();
        for entry in &outstanding {
            for thing in &entry.requirement.things {
                if !seen.insert(thing.id) {
                    continue;
                }
                if thing.category == ItemCategory::Item {
                    needed_defs.insert(thing.def.clone());
                }
                candidates.push(thing.clone());
            }
        }
        let candidate_ids: HashSet<ItemId> = candidates.iter().map(|item| item.id).collect();

        let policy = TraversalPolicy::new(self.ctx.config.spec.search.haul_danger);
        let reservations = self.ctx.reservations.as_ref();

        let exact = self.ctx.reachability.closest_reachable(
            agent,
            &|item: &Item| {
                candidate_ids.contains(&item.id) && reservations.can_reserve(agent.id, item.id, item.stack_count)
            },
            policy,
        );
        if let Some(item) = exact {
            return self.assigned(agent, container, item, SelectionTier::ExactMatch);
        }

        if let Some(item) = self.rescue_candidate(agent, &candidates) {
            return self.assigned(agent, container, item, SelectionTier::Rescue);
        }

        if !needed_defs.is_empty() {
            let raw = self
                .ctx
                .reachability
                .closest_reachable(agent, &|item: &Item| candidate_ids.contains(&item.id), policy);
            if let Some(held) = raw {
                debug!(
                    "Agent {} contended on {} ({}) for container {}",
                    agent.name, held.def, held.id, container
                );
                return Selection::Contended;
            }
        }

        let needed: Vec<&Item> = candidates
            .iter()
            .filter(|item| item.category == ItemCategory::Item)
            .collect();
        let rule = self.ctx.fungibility.as_ref();
        let substitute = self.ctx.reachability.closest_reachable(
            agent,
            &|item: &Item| {
                !item.is_sapient()
                    && item.category == ItemCategory::Item
                    && needed_defs.contains(&item.def)
                    && reservations.can_reserve(agent.id, item.id, item.stack_count)
                    && needed.iter().any(|thing| rule.equivalent_for_transfer(thing, item))
            },
            policy,
        );
        if let Some(item) = substitute {
            return self.assigned(agent, container, item, SelectionTier::Substitute);
        }

        debug!("Agent {} found nothing to load into container {}", agent.name, container);
        Selection::Unavailable
    }

    fn rescue_candidate(&self, agent: &Agent, candidates: &[Item]) -> Option<Item> {
        candidates.iter().find_map(|listed| {
            let current = self.ctx.items.item(listed.id)?;
            let eligible = current.needs_rescue()
                && self.ctx.reservations.can_reserve(agent.id, current.id, current.stack_count)
                && self
                    .ctx
                    .reachability
                    .can_reach(agent, current.position, TraversalPolicy::deadly());
            eligible.then_some(current)
        })
    }

    fn assigned(&self, agent: &Agent, container: ContainerId, item: Item, tier: SelectionTier) -> Selection {
        debug!(
            "Agent {} selected {} x{} ({}) for container {} via {}",
            agent.name, item.def, item.stack_count, item.id, container, tier
        );
        Selection::Assigned { item, tier }
    }
}
