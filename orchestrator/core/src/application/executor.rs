// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Haul Task Executor
//!
//! Drives one [`HaulJob`] through the [`HaulStep`] sequence, one scheduling
//! turn per [`HaulTaskRun::tick`]. Each turn runs the current step and every
//! following step flagged `atomic_with_previous` in [`STEP_TABLE`], checking
//! that step's guards first.
//!
//! ## Ordering
//!
//! - The claim is published in [`HaulTaskRun::start`], before any
//!   reservation or movement.
//! - Every claim that grows is sized by
//!   [`ClaimIndex::claim_within_demand`](crate::domain::claim::ClaimIndex::claim_within_demand),
//!   which reads demand and publishes in one step.
//! - The haul count is re-evaluated at pickup from fresh demand minus what
//!   the agent already carries. Nothing left to fetch empty-handed means the
//!   task succeeds as obsolete without touching the world.
//! - A deposit decrements the requirement before the claim shrinks or is
//!   retracted.
//! - Whatever the outcome, reservations are released and the claim retracted
//!   when the task ends. Stacks still in hand are dropped where the agent
//!   stands.
//!
//! [`STEP_TABLE`]: crate::domain::haul::STEP_TABLE

use chrono::Utc;
use std::collections::VecDeque;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::application::context::HaulContext;
use crate::application::demand::DemandResolver;
use crate::domain::agent::Agent;
use crate::domain::claim::{ClaimGrant, TaskClaim, TaskId};
use crate::domain::container::ContainerId;
use crate::domain::events::HaulEvent;
use crate::domain::haul::{FailReason, Guard, HaulJob, HaulStep, StepOutcome};
use crate::domain::item::{Item, ItemId};
use crate::domain::manifest::RequirementId;
use crate::domain::reachability::{Cell, TraversalPolicy};
use crate::domain::store::StoreError;

#[derive(Debug, Error)]
pub enum HaulError {
    /// The hauled item fits no requirement on the container. Selection and
    /// execution disagree about the manifest; this is a bug, not contention.
    #[error("no requirement on container {container} matches item {item}")]
    NoMatchingRequirement { container: ContainerId, item: ItemId },

    #[error("world store error: {0}")]
    Store(#[from] StoreError),

    #[error("haul task {0} has already finished")]
    Finished(TaskId),
}

enum Flow {
    /// Stay on the current step until next turn.
    Stay,
    Next,
    Jump(HaulStep),
    Finish(StepOutcome),
}

enum GuardCheck {
    Pass,
    Wait,
    Fail(FailReason),
}

pub struct HaulTaskRun {
    ctx: HaulContext,
    demand: DemandResolver,
    job: HaulJob,
    step: HaulStep,
    /// Current target A; moves along the queue of duplicates.
    target: ItemId,
    target_cell: Option<Cell>,
    queue: VecDeque<ItemId>,
    requirement: Option<RequirementId>,
    pickup_count: u32,
    deposit_target: usize,
    delivered: u32,
    occupied_turns: u32,
    outcome: Option<StepOutcome>,
    errored: bool,
}

impl HaulTaskRun {
    /// Publish the claim and enter the first step.
    pub fn start(ctx: HaulContext, job: HaulJob) -> Self {
        let demand = DemandResolver::new(ctx.clone());
        let mut run = Self {
            ctx,
            demand,
            target: job.item,
            target_cell: None,
            queue: VecDeque::new(),
            requirement: None,
            pickup_count: 0,
            deposit_target: 0,
            delivered: 0,
            occupied_turns: 0,
            outcome: None,
            errored: false,
            step: HaulStep::ReserveTarget,
            job,
        };

        if let Some(item) = run.ctx.items.item(run.job.item) {
            run.target_cell = Some(item.position);
            let grant = run.claim_against_demand(item, 0, run.job.count, None);
            if grant.count < run.job.count {
                debug!(
                    "Haul task {} claimed {} of {} (demand {})",
                    run.job.task_id, grant.count, run.job.count, grant.demand
                );
            }
        }

        info!(
            "Agent {} started haul task {}: item {} x{} -> container {}",
            run.job.agent, run.job.task_id, run.job.item, run.job.count, run.job.container
        );
        metrics::counter!("haulage_tasks_started_total").increment(1);
        run.ctx.events.publish(HaulEvent::TaskStarted {
            task_id: run.job.task_id,
            agent: run.job.agent,
            container: run.job.container,
            item: run.job.item,
            count: run.job.count,
            started_at: Utc::now(),
        });
        run.enter(HaulStep::ReserveTarget);
        run
    }

    pub fn job(&self) -> &HaulJob {
        &self.job
    }

    pub fn task_id(&self) -> TaskId {
        self.job.task_id
    }

    pub fn step(&self) -> HaulStep {
        self.step
    }

    pub fn delivered(&self) -> u32 {
        self.delivered
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some() || self.errored
    }

    /// Advance by one turn.
    pub fn tick(&mut self) -> Result<StepOutcome, HaulError> {
        if self.errored {
            return Err(HaulError::Finished(self.job.task_id));
        }
        if let Some(outcome) = &self.outcome {
            return Ok(outcome.clone());
        }

        match self.advance() {
            Ok(StepOutcome::Running) => Ok(StepOutcome::Running),
            Ok(outcome) => {
                self.finish(outcome.clone());
                Ok(outcome)
            }
            Err(e) => {
                self.errored = true;
                self.cleanup();
                Err(e)
            }
        }
    }

    /// End a running task from outside, e.g. when the run loop shuts down.
    pub fn abandon(&mut self) {
        if !self.is_finished() {
            self.finish(StepOutcome::Failed(FailReason::Interrupted));
        }
    }

    fn advance(&mut self) -> Result<StepOutcome, HaulError> {
        loop {
            match self.check_guards() {
                GuardCheck::Pass => {}
                GuardCheck::Wait => return Ok(StepOutcome::Running),
                GuardCheck::Fail(reason) => return Ok(StepOutcome::Failed(reason)),
            }

            let next = match self.run_step()? {
                Flow::Stay => return Ok(StepOutcome::Running),
                Flow::Finish(outcome) => return Ok(outcome),
                Flow::Jump(step) => step,
                Flow::Next => match self.step.next() {
                    Some(step) => step,
                    None => {
                        return Ok(StepOutcome::Succeeded {
                            delivered: self.delivered,
                            obsolete: false,
                        })
                    }
                },
            };

            self.enter(next);
            if !next.spec().atomic_with_previous {
                return Ok(StepOutcome::Running);
            }
        }
    }

    fn enter(&mut self, step: HaulStep) {
        self.step = step;
        self.occupied_turns = 0;
        debug!("Haul task {} entered {}", self.job.task_id, step);
        self.ctx.events.publish(HaulEvent::StepEntered {
            task_id: self.job.task_id,
            agent: self.job.agent,
            step,
        });
    }

    fn check_guards(&mut self) -> GuardCheck {
        for guard in self.step.spec().guards {
            let check = match guard {
                Guard::ItemPresent => self.check_item(),
                Guard::ContainerValid => self.check_container(),
                Guard::CellUnoccupied => self.check_cell(),
            };
            if !matches!(check, GuardCheck::Pass) {
                return check;
            }
        }
        GuardCheck::Pass
    }

    fn check_item(&self) -> GuardCheck {
        if self.ctx.items.item(self.target).is_none() {
            return GuardCheck::Fail(FailReason::ItemVanished);
        }
        match self.ctx.reservations.holder(self.target) {
            Some(holder) if holder != self.job.agent => GuardCheck::Fail(FailReason::ReservationLost),
            _ => GuardCheck::Pass,
        }
    }

    fn check_container(&self) -> GuardCheck {
        let Some(container) = self.ctx.containers.container(self.job.container) else {
            return GuardCheck::Fail(FailReason::ContainerVanished);
        };
        if container.is_forbidden(self.job.agent) {
            GuardCheck::Fail(FailReason::ContainerForbidden)
        } else if !container.still_loading() {
            GuardCheck::Fail(FailReason::LoadingCancelled)
        } else {
            GuardCheck::Pass
        }
    }

    fn check_cell(&mut self) -> GuardCheck {
        let Some(item) = self.ctx.items.item(self.target) else {
            return GuardCheck::Fail(FailReason::ItemVanished);
        };
        if self.ctx.agents.occupant_of(item.position, self.job.agent).is_none() {
            self.occupied_turns = 0;
            return GuardCheck::Pass;
        }

        self.occupied_turns += 1;
        let budget = self.ctx.config.spec.executor.occupied_wait_turns;
        if self.occupied_turns > budget {
            warn!(
                "Haul task {} gave up: cell {} stayed occupied for {} turns",
                self.job.task_id, item.position, budget
            );
            GuardCheck::Fail(FailReason::Interrupted)
        } else {
            debug!(
                "Haul task {} waiting for cell {} ({}/{})",
                self.job.task_id, item.position, self.occupied_turns, budget
            );
            GuardCheck::Wait
        }
    }

    fn run_step(&mut self) -> Result<Flow, HaulError> {
        match self.step {
            HaulStep::ReserveTarget => Ok(self.reserve_target()),
            HaulStep::ReserveQueued => Ok(self.reserve_queued()),
            HaulStep::TravelToItem => self.travel_to_item(),
            HaulStep::DetermineHaulCount => self.determine_haul_count(),
            HaulStep::PickUp => self.pick_up(),
            HaulStep::RegisterFulfilling => self.register_fulfilling(),
            HaulStep::CollectDuplicates => self.collect_duplicates(),
            HaulStep::JumpToNextQueued => self.jump_to_next_queued(),
            HaulStep::TravelToContainer => self.travel_to_container(),
            HaulStep::StepOffContainer => self.step_off_container(),
            HaulStep::AssembleContainer => self.assemble_container(),
            HaulStep::Deposit => self.deposit(),
            HaulStep::NextDepositTarget => self.next_deposit_target(),
        }
    }

    fn reserve_target(&self) -> Flow {
        match self
            .ctx
            .reservations
            .reserve(self.job.agent, self.target, self.job.count)
        {
            Ok(()) => Flow::Next,
            Err(e) => {
                debug!("Haul task {} lost reservation race: {}", self.job.task_id, e);
                metrics::counter!("haulage_reservation_conflicts_total").increment(1);
                Flow::Finish(StepOutcome::Failed(FailReason::ReservationLost))
            }
        }
    }

    fn reserve_queued(&mut self) -> Flow {
        let agent = self.job.agent;
        let reservations = self.ctx.reservations.as_ref();
        self.queue = self
            .job
            .queued
            .iter()
            .copied()
            .filter(|id| {
                let count = self.ctx.items.item(*id).map(|item| item.stack_count).unwrap_or(0);
                count > 0 && reservations.reserve(agent, *id, count).is_ok()
            })
            .collect();
        Flow::Next
    }

    fn travel_to_item(&mut self) -> Result<Flow, HaulError> {
        let Some(item) = self.ctx.items.item(self.target) else {
            return Ok(Flow::Finish(StepOutcome::Failed(FailReason::ItemVanished)));
        };
        self.target_cell = Some(item.position);
        self.travel_toward(item.position)
    }

    fn travel_to_container(&mut self) -> Result<Flow, HaulError> {
        let Some(container) = self.ctx.containers.container(self.job.container) else {
            return Ok(Flow::Finish(StepOutcome::Failed(FailReason::ContainerVanished)));
        };
        self.travel_toward(container.position)
    }

    fn travel_toward(&self, destination: Cell) -> Result<Flow, HaulError> {
        let agent = self.agent()?;
        if agent.position.touches(destination) {
            return Ok(Flow::Next);
        }

        let policy = TraversalPolicy::new(self.ctx.config.spec.search.haul_danger);
        let Some(path) = self.ctx.reachability.path(agent.position, destination, policy) else {
            warn!(
                "Haul task {}: no path from {} to {}",
                self.job.task_id, agent.position, destination
            );
            return Ok(Flow::Finish(StepOutcome::Failed(FailReason::Unreachable)));
        };

        let stride = (self.ctx.config.spec.executor.cells_per_turn.max(1) as usize).min(path.len());
        let Some(&cell) = path.get(stride.saturating_sub(1)) else {
            return Ok(Flow::Next);
        };
        self.ctx.agents.move_agent(agent.id, cell)?;

        if cell.touches(destination) {
            Ok(Flow::Next)
        } else {
            Ok(Flow::Stay)
        }
    }

    fn determine_haul_count(&mut self) -> Result<Flow, HaulError> {
        let Some(item) = self.ctx.items.item(self.target) else {
            return Ok(Flow::Finish(StepOutcome::Failed(FailReason::ItemVanished)));
        };
        let Some(container) = self.ctx.containers.container(self.job.container) else {
            return Ok(Flow::Finish(StepOutcome::Failed(FailReason::ContainerVanished)));
        };

        let rule = self.ctx.fungibility.as_ref();
        let Some(requirement) = container.manifest.matching_desperate(&item, rule) else {
            let covered = container.manifest.requirements.iter().any(|req| req.covers(&item, rule));
            if covered {
                return self.nothing_left_to_fetch(item.def.as_str());
            }
            error!(
                "Haul task {} targets {} ({}) but container {} has no matching requirement",
                self.job.task_id, item.def, item.id, container.label
            );
            return Err(HaulError::NoMatchingRequirement {
                container: container.id,
                item: item.id,
            });
        };
        self.requirement = Some(requirement.id);

        let agent = self.agent()?;
        let carried = agent.carried_count();
        let requirement_id = requirement.id;
        let label = requirement.label().to_string();
        let claim_item = agent.carried.unwrap_or_else(|| item.clone());
        let grant = self.claim_against_demand(
            claim_item,
            carried,
            carried.saturating_add(item.stack_count),
            Some(requirement_id),
        );
        let wanted = grant.count.saturating_sub(carried);
        if wanted == 0 {
            return self.nothing_left_to_fetch(&label);
        }

        self.pickup_count = wanted;
        debug!(
            "Haul task {} will pick up {} (demand {}, carried {})",
            self.job.task_id, self.pickup_count, grant.demand, carried
        );
        Ok(Flow::Next)
    }

    /// Head for the container with what is already carried, or end as
    /// obsolete when empty-handed.
    fn nothing_left_to_fetch(&self, label: &str) -> Result<Flow, HaulError> {
        let carried = self.agent()?.carried_count();
        if carried > 0 && self.requirement.is_some() {
            debug!(
                "Haul task {} already carries enough ({}), heading to container",
                self.job.task_id, carried
            );
            return Ok(Flow::Jump(HaulStep::TravelToContainer));
        }
        info!(
            "Haul task {} is obsolete: demand for {} is already covered",
            self.job.task_id, label
        );
        Ok(Flow::Finish(StepOutcome::Succeeded {
            delivered: 0,
            obsolete: true,
        }))
    }

    fn pick_up(&mut self) -> Result<Flow, HaulError> {
        let taken = match self.ctx.items.take(self.target, self.pickup_count) {
            Ok(item) => item,
            Err(StoreError::ItemNotFound(_)) => {
                return Ok(Flow::Finish(StepOutcome::Failed(FailReason::ItemVanished)));
            }
            // Someone else took part of the stack since the count was fixed.
            Err(StoreError::InsufficientStack { available, .. }) if available > 0 => {
                self.ctx.items.take(self.target, available)?
            }
            Err(e) => return Err(e.into()),
        };
        let picked = taken.stack_count;

        let agent = self.agent()?;
        let mut carried = match self.ctx.agents.set_carried(agent.id, None)? {
            Some(mut held) => {
                held.absorb(taken);
                held
            }
            None => taken,
        };
        carried.position = agent.position;
        self.ctx.agents.set_carried(agent.id, Some(carried.clone()))?;
        self.publish_claim(carried.clone(), carried.stack_count);

        debug!(
            "Agent {} picked up {} x{} (now carrying {})",
            agent.name, carried.def, picked, carried.stack_count
        );
        if let Some(requirement) = self.requirement {
            self.ctx.events.publish(HaulEvent::ItemPickedUp {
                task_id: self.job.task_id,
                agent: agent.id,
                item: carried.id,
                requirement,
                count: picked,
                picked_at: Utc::now(),
            });
        }
        Ok(Flow::Next)
    }

    fn register_fulfilling(&mut self) -> Result<Flow, HaulError> {
        let requirement = self.requirement_id()?;
        if let Some(carried) = self.agent()?.carried {
            self.ctx
                .containers
                .register_fulfilling(self.job.container, requirement, &carried)?;
        }
        Ok(Flow::Next)
    }

    fn collect_duplicates(&mut self) -> Result<Flow, HaulError> {
        if !self.ctx.config.spec.executor.collect_duplicates {
            return Ok(Flow::Next);
        }
        let agent = self.agent()?;
        let (Some(mut carried), Some(cell)) = (agent.carried, self.target_cell) else {
            return Ok(Flow::Next);
        };
        if carried.is_sapient() {
            return Ok(Flow::Next);
        }
        let requirement = self.requirement_id()?;
        let rule = self.ctx.fungibility.as_ref();

        for other in self.ctx.items.items_at(cell) {
            if !other.is_haulable() || other.def != carried.def || !rule.equivalent_for_transfer(&carried, &other) {
                continue;
            }

            let held = carried.stack_count;
            let grant = self.claim_against_demand(
                carried.clone(),
                held,
                held.saturating_add(other.stack_count),
                Some(requirement),
            );
            let count = grant.count.saturating_sub(held);
            if count == 0 {
                break;
            }
            if self.ctx.reservations.reserve(agent.id, other.id, count).is_err() {
                self.publish_claim(carried.clone(), carried.stack_count);
                continue;
            }
            match self.ctx.items.take(other.id, count) {
                Ok(piece) => {
                    debug!(
                        "Agent {} collected {} x{} from the same cell",
                        agent.name, piece.def, piece.stack_count
                    );
                    self.queue.retain(|id| *id != other.id);
                    carried.absorb(piece);
                }
                Err(_) => self.publish_claim(carried.clone(), carried.stack_count),
            }
        }

        self.ctx.agents.set_carried(agent.id, Some(carried.clone()))?;
        self.publish_claim(carried.clone(), carried.stack_count);
        Ok(Flow::Next)
    }

    fn jump_to_next_queued(&mut self) -> Result<Flow, HaulError> {
        let requirement = self.requirement_id()?;
        let carried = self.agent()?.carried_count();

        while let Some(next) = self.queue.pop_front() {
            let still_wanted = self
                .demand
                .current(self.job.agent, self.job.container, requirement)
                .saturating_sub(carried);
            if still_wanted == 0 {
                self.queue.clear();
                break;
            }
            if self.ctx.items.item(next).is_none() {
                continue;
            }
            if self.ctx.reservations.holder(next) != Some(self.job.agent) {
                continue;
            }
            debug!("Haul task {} moving on to queued item {}", self.job.task_id, next);
            self.target = next;
            return Ok(Flow::Jump(HaulStep::TravelToItem));
        }
        Ok(Flow::Next)
    }

    /// Clear the container's own cell and avoid sharing a cell with another
    /// agent mid-transfer. Leaving the container's cell always happens; a
    /// shared approach cell is given up on after the occupied-wait budget.
    fn step_off_container(&mut self) -> Result<Flow, HaulError> {
        let Some(container) = self.ctx.containers.container(self.job.container) else {
            return Ok(Flow::Finish(StepOutcome::Failed(FailReason::ContainerVanished)));
        };
        let agent = self.agent()?;
        let on_container = agent.position == container.position;
        let beside = !on_container && agent.position.touches(container.position);
        let crowded = self.ctx.agents.occupant_of(agent.position, agent.id).is_some();
        if beside && !crowded {
            return Ok(Flow::Next);
        }
        if beside {
            self.occupied_turns += 1;
            if self.occupied_turns > self.ctx.config.spec.executor.occupied_wait_turns {
                debug!(
                    "Haul task {}: no free cell beside container {}, transferring from {}",
                    self.job.task_id, container.label, agent.position
                );
                return Ok(Flow::Next);
            }
        }

        let policy = TraversalPolicy::new(self.ctx.config.spec.search.haul_danger);
        let reachability = self.ctx.reachability.as_ref();
        let sides: Vec<Cell> = container
            .position
            .neighbours()
            .into_iter()
            .filter(|cell| *cell != agent.position && reachability.standable(*cell, policy))
            .collect();
        let free = sides
            .iter()
            .copied()
            .find(|cell| self.ctx.agents.occupant_of(*cell, agent.id).is_none());
        let destination = match (free, sides.first()) {
            (Some(cell), _) => cell,
            // Wait for a side to clear.
            (None, _) if beside => return Ok(Flow::Stay),
            // Off the container's cell even if every side is taken.
            (None, Some(cell)) => *cell,
            (None, None) if on_container => {
                warn!(
                    "Haul task {}: container {} is boxed in, working from its cell",
                    self.job.task_id, container.label
                );
                return Ok(Flow::Next);
            }
            (None, None) => return Ok(Flow::Jump(HaulStep::TravelToContainer)),
        };

        let mut walk = if agent.position.touches(destination) {
            Vec::new()
        } else {
            match reachability.path(agent.position, destination, policy) {
                Some(path) => path,
                None => return Ok(Flow::Jump(HaulStep::TravelToContainer)),
            }
        };
        walk.push(destination);
        let stride = (self.ctx.config.spec.executor.cells_per_turn.max(1) as usize).min(walk.len());
        let Some(&cell) = walk.get(stride - 1) else {
            return Ok(Flow::Next);
        };
        self.ctx.agents.move_agent(agent.id, cell)?;
        debug!(
            "Agent {} stepped from {} to {} beside container {}",
            agent.name, agent.position, cell, container.label
        );
        if cell == destination {
            Ok(Flow::Next)
        } else {
            Ok(Flow::Stay)
        }
    }

    fn assemble_container(&mut self) -> Result<Flow, HaulError> {
        if self.ctx.containers.assemble(self.job.container)? {
            info!("Agent {} assembled container {}", self.job.agent, self.job.container);
        }
        Ok(Flow::Next)
    }

    fn deposit(&mut self) -> Result<Flow, HaulError> {
        let requirement = self.requirement_id()?;
        let Some(carried) = self.ctx.agents.set_carried(self.job.agent, None)? else {
            return Ok(Flow::Next);
        };
        let targets = self
            .ctx
            .containers
            .container(self.job.container)
            .map(|c| c.deposit_targets.len())
            .unwrap_or(0);
        if self.deposit_target >= targets {
            self.ctx.agents.set_carried(self.job.agent, Some(carried))?;
            return Ok(Flow::Next);
        }

        let before = carried.stack_count;
        let leftover = self
            .ctx
            .containers
            .deposit(self.job.container, self.deposit_target, carried)?;
        let deposited = before - leftover.as_ref().map(|item| item.stack_count).unwrap_or(0);

        if deposited > 0 {
            // Decrement first; the claim only shrinks afterwards.
            let outstanding = self
                .ctx
                .containers
                .record_delivery(self.job.container, requirement, deposited)?;
            self.delivered += deposited;
            match &leftover {
                Some(rest) => self.publish_claim(rest.clone(), rest.stack_count),
                None => {
                    self.ctx.claims.retract(self.job.agent, self.job.container);
                }
            }

            debug!(
                "Agent {} deposited {} into target {} of container {} ({} outstanding)",
                self.job.agent, deposited, self.deposit_target, self.job.container, outstanding
            );
            metrics::counter!("haulage_items_delivered_total").increment(u64::from(deposited));
            self.ctx.events.publish(HaulEvent::ItemDeposited {
                task_id: self.job.task_id,
                agent: self.job.agent,
                container: self.job.container,
                target: self.deposit_target,
                count: deposited,
                deposited_at: Utc::now(),
            });

            let satisfied = self
                .ctx
                .containers
                .container(self.job.container)
                .map(|c| !c.manifest.anything_left_to_load())
                .unwrap_or(false);
            if satisfied && outstanding == 0 {
                info!("Container {} has everything it needs", self.job.container);
                self.ctx.events.publish(HaulEvent::ContainerSatisfied {
                    container: self.job.container,
                    satisfied_at: Utc::now(),
                });
            }
        }

        self.ctx.agents.set_carried(self.job.agent, leftover)?;
        Ok(Flow::Next)
    }

    fn next_deposit_target(&mut self) -> Result<Flow, HaulError> {
        let agent = self.agent()?;
        let done = StepOutcome::Succeeded {
            delivered: self.delivered,
            obsolete: false,
        };
        if agent.carried.is_none() {
            return Ok(Flow::Finish(done));
        }

        let next = self
            .ctx
            .containers
            .container(self.job.container)
            .and_then(|c| c.next_open_target(self.deposit_target + 1));
        if let Some(target) = next {
            self.deposit_target = target;
            return Ok(Flow::Jump(HaulStep::Deposit));
        }

        self.drop_carried()?;
        Ok(Flow::Finish(done))
    }

    fn finish(&mut self, outcome: StepOutcome) {
        self.cleanup();
        let now = Utc::now();
        match &outcome {
            StepOutcome::Succeeded { delivered, obsolete } => {
                info!(
                    "Haul task {} succeeded: delivered {}{}",
                    self.job.task_id,
                    delivered,
                    if *obsolete { " (obsolete)" } else { "" }
                );
                let label = if *obsolete { "obsolete" } else { "succeeded" };
                metrics::counter!("haulage_tasks_finished_total", "outcome" => label).increment(1);
                self.ctx.events.publish(HaulEvent::TaskSucceeded {
                    task_id: self.job.task_id,
                    agent: self.job.agent,
                    container: self.job.container,
                    delivered: *delivered,
                    obsolete: *obsolete,
                    finished_at: now,
                });
            }
            StepOutcome::Failed(reason) => {
                warn!(
                    "Haul task {} failed at {}: {}",
                    self.job.task_id, self.step, reason
                );
                metrics::counter!("haulage_tasks_finished_total", "outcome" => "failed").increment(1);
                self.ctx.events.publish(HaulEvent::TaskFailed {
                    task_id: self.job.task_id,
                    agent: self.job.agent,
                    container: self.job.container,
                    reason: reason.clone(),
                    failed_at: now,
                });
            }
            StepOutcome::Running => {}
        }
        self.outcome = Some(outcome);
    }

    /// Release everything the task holds. Never fails: a missing agent has
    /// nothing left to drop.
    fn cleanup(&mut self) {
        if let Err(e) = self.drop_carried() {
            debug!("Haul task {}: nothing dropped on cleanup: {}", self.job.task_id, e);
        }
        self.ctx.reservations.release_all(self.job.agent);
        self.ctx.claims.retract(self.job.agent, self.job.container);
    }

    fn drop_carried(&self) -> Result<(), HaulError> {
        let agent = self.agent()?;
        if let Some(item) = self.ctx.agents.set_carried(agent.id, None)? {
            debug!(
                "Agent {} dropped {} x{} at {}",
                agent.name, item.def, item.stack_count, agent.position
            );
            self.ctx.items.place(item, agent.position);
        }
        Ok(())
    }

    /// Claim up to `wanted` against demand read under the claim index's lock,
    /// never less than `held`. Without a requirement id the item's matching
    /// requirement is looked up afresh.
    fn claim_against_demand(
        &self,
        item: Item,
        held: u32,
        wanted: u32,
        requirement: Option<RequirementId>,
    ) -> ClaimGrant {
        let ctx = &self.ctx;
        let container = self.job.container;
        let rule = ctx.fungibility.as_ref();
        let lookup = item.clone();
        let load = move || {
            let manifest = ctx.containers.container(container)?.manifest;
            let found = match requirement {
                Some(id) => manifest.requirement(id).cloned(),
                None => manifest.matching_desperate(&lookup, rule).cloned(),
            };
            found
        };
        let claim = TaskClaim {
            task_id: self.job.task_id,
            agent: self.job.agent,
            item,
            container,
            count: wanted,
            claimed_at: Utc::now(),
        };
        ctx.claims.claim_within_demand(claim, held, &load, rule)
    }

    fn publish_claim(&self, item: Item, count: u32) {
        self.ctx.claims.publish(TaskClaim {
            task_id: self.job.task_id,
            agent: self.job.agent,
            item,
            container: self.job.container,
            count,
            claimed_at: Utc::now(),
        });
    }

    fn agent(&self) -> Result<Agent, HaulError> {
        self.ctx
            .agents
            .agent(self.job.agent)
            .ok_or(HaulError::Store(StoreError::AgentNotFound(self.job.agent)))
    }

    fn requirement_id(&self) -> Result<RequirementId, HaulError> {
        self.requirement.ok_or(HaulError::NoMatchingRequirement {
            container: self.job.container,
            item: self.target,
        })
    }
}

/// Run a task to completion, one turn after another.
///
/// Gives up with [`FailReason::Interrupted`] after `max_turns`.
pub fn run_to_completion(run: &mut HaulTaskRun, max_turns: u32) -> Result<StepOutcome, HaulError> {
    for _ in 0..max_turns {
        let outcome = run.tick()?;
        if outcome.is_finished() {
            return Ok(outcome);
        }
    }
    run.abandon();
    Ok(StepOutcome::Failed(FailReason::Interrupted))
}
