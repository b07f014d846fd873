// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Shared collaborator handles.
//!
//! Every service in this layer takes a [`HaulContext`] instead of a long
//! argument list. Cloning is cheap: all fields are reference-counted.

use std::sync::Arc;

use crate::domain::claim::ClaimIndex;
use crate::domain::config::HaulageConfig;
use crate::domain::fungibility::{FungibilityRule, StandardFungibility};
use crate::domain::reachability::ReachabilitySearch;
use crate::domain::reservation::ReservationOracle;
use crate::domain::store::{AgentStore, ContainerStore, ItemStore};
use crate::infrastructure::claims::InMemoryClaimIndex;
use crate::infrastructure::event_bus::EventBus;
use crate::infrastructure::grid::{GridMap, GridReachability};
use crate::infrastructure::reservations::InMemoryReservationOracle;
use crate::infrastructure::scenario::Scenario;
use crate::infrastructure::world::InMemoryWorld;

#[derive(Clone)]
pub struct HaulContext {
    pub items: Arc<dyn ItemStore>,
    pub agents: Arc<dyn AgentStore>,
    pub containers: Arc<dyn ContainerStore>,
    pub reservations: Arc<dyn ReservationOracle>,
    pub reachability: Arc<dyn ReachabilitySearch>,
    pub claims: Arc<dyn ClaimIndex>,
    pub fungibility: Arc<dyn FungibilityRule>,
    pub events: EventBus,
    pub config: Arc<HaulageConfig>,
}

impl HaulContext {
    /// Wire a loaded scenario to fresh in-memory reservation and claim
    /// registries.
    pub fn from_scenario(scenario: &Scenario, config: HaulageConfig) -> Self {
        Self::in_memory(scenario.world.clone(), scenario.map.clone(), config)
    }

    pub fn in_memory(world: InMemoryWorld, map: Arc<GridMap>, config: HaulageConfig) -> Self {
        let world = Arc::new(world);
        let events = EventBus::new(config.spec.swarm.event_bus_capacity);
        Self {
            items: world.clone(),
            agents: world.clone(),
            containers: world.clone(),
            reservations: Arc::new(InMemoryReservationOracle::new()),
            reachability: Arc::new(GridReachability::new(map, world)),
            claims: Arc::new(InMemoryClaimIndex::new()),
            fungibility: Arc::new(StandardFungibility),
            events,
            config: Arc::new(config),
        }
    }
}
