// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Loading Job Giver
//!
//! Entry points for the work-seeking loop. [`LoadingWorkGiver`] answers
//! "is there work on this container for me?" and builds the [`HaulJob`];
//! [`LoadTransportersJobGiver`] walks an agent's duty group and hands out
//! the first job found. Neither reserves anything: reservations belong to
//! the executor once the job actually starts.
//!
//! `has_work_on` has no side effects. A built job publishes
//! [`HaulEvent::CandidateSelected`] and counts toward
//! `haulage_selections_total`.

use chrono::Utc;
use tracing::{debug, warn};

use crate::application::context::HaulContext;
use crate::application::selector::CandidateSelector;
use crate::domain::agent::Agent;
use crate::domain::container::{Container, ContainerId};
use crate::domain::events::HaulEvent;
use crate::domain::haul::HaulJob;
use crate::domain::item::{Item, ItemId};
use crate::domain::selection::Selection;

#[derive(Clone)]
pub struct LoadingWorkGiver {
    ctx: HaulContext,
    selector: CandidateSelector,
}

impl LoadingWorkGiver {
    pub fn new(ctx: HaulContext) -> Self {
        let selector = CandidateSelector::new(ctx.clone());
        Self { ctx, selector }
    }

    pub fn selector(&self) -> &CandidateSelector {
        &self.selector
    }

    /// Cheap checks that rule a container out before any item search.
    fn eligible(&self, agent: &Agent, container_id: ContainerId) -> Option<Container> {
        let container = self.ctx.containers.container(container_id)?;
        if container.is_forbidden(agent.id) || !container.anything_left_to_load() {
            return None;
        }
        if !agent.can_manipulate {
            return None;
        }
        if !self
            .ctx
            .reachability
            .can_reach(agent, container.position, agent.normal_policy())
        {
            debug!(
                "Container {} is out of reach for agent {}",
                container.label, agent.name
            );
            return None;
        }
        Some(container)
    }

    pub fn has_work_on(&self, agent: &Agent, container: ContainerId) -> bool {
        self.eligible(agent, container).is_some() && self.selector.select(agent, container).is_assigned()
    }

    pub fn job_on(&self, agent: &Agent, container_id: ContainerId) -> Option<HaulJob> {
        let container = self.eligible(agent, container_id)?;
        let (item, tier) = match self.selector.select(agent, container_id) {
            Selection::Assigned { item, tier } => (item, tier),
            Selection::Contended => {
                metrics::counter!("haulage_selections_contended_total").increment(1);
                return None;
            }
            _ => return None,
        };

        let rule = self.ctx.fungibility.as_ref();
        let Some(requirement) = container.manifest.matching_desperate(&item, rule) else {
            warn!(
                "Selected {} ({}) matches no requirement on container {}",
                item.def, item.id, container.label
            );
            return None;
        };

        let demand = self
            .selector
            .demand()
            .remaining_demand(agent.id, requirement, container_id);
        let count = demand.min(item.stack_count);
        if count == 0 {
            return None;
        }

        let mut job = HaulJob::new(agent.id, item.id, container_id, count);
        if self.ctx.config.spec.executor.collect_duplicates && !item.is_sapient() {
            job.queued = self.queued_duplicates(agent, &item);
        }
        metrics::counter!("haulage_selections_total", "tier" => tier.as_str()).increment(1);
        self.ctx.events.publish(HaulEvent::CandidateSelected {
            agent: agent.id,
            container: container_id,
            item: item.id,
            tier,
            selected_at: Utc::now(),
        });
        debug!(
            "Built haul job {} for agent {}: {} x{} -> {} ({} queued)",
            job.task_id,
            agent.name,
            item.def,
            count,
            container.label,
            job.queued.len()
        );
        Some(job)
    }

    /// Other stacks of the same kind lying on the target's cell.
    fn queued_duplicates(&self, agent: &Agent, target: &Item) -> Vec<ItemId> {
        let rule = self.ctx.fungibility.as_ref();
        self.ctx
            .items
            .items_at(target.position)
            .into_iter()
            .filter(|other| {
                other.id != target.id
                    && other.is_haulable()
                    && other.def == target.def
                    && rule.equivalent_for_transfer(target, other)
                    && self.ctx.reservations.can_reserve(agent.id, other.id, other.stack_count)
            })
            .map(|other| other.id)
            .collect()
    }
}

/// Hands out loading jobs to agents on loading duty for a transport group.
#[derive(Clone)]
pub struct LoadTransportersJobGiver {
    ctx: HaulContext,
    work: LoadingWorkGiver,
}

impl LoadTransportersJobGiver {
    pub fn new(ctx: HaulContext) -> Self {
        let work = LoadingWorkGiver::new(ctx.clone());
        Self { ctx, work }
    }

    pub fn work_giver(&self) -> &LoadingWorkGiver {
        &self.work
    }

    pub fn try_give_job(&self, agent: &Agent) -> Option<HaulJob> {
        let group = agent.loading_duty?;
        self.ctx
            .containers
            .containers_in_group(group)
            .into_iter()
            .find_map(|container| self.work.job_on(agent, container.id))
    }
}
