// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

#![allow(dead_code)]

use std::sync::Arc;

use haulage_core::application::context::HaulContext;
use haulage_core::domain::agent::{Agent, AgentId};
use haulage_core::domain::config::HaulageConfig;
use haulage_core::domain::container::{Container, ContainerId, GroupId};
use haulage_core::domain::item::{Item, ItemId};
use haulage_core::domain::manifest::{Manifest, Requirement};
use haulage_core::domain::reachability::Cell;
use haulage_core::domain::store::{AgentStore, ContainerStore, ItemStore};
use haulage_core::infrastructure::grid::GridMap;
use haulage_core::infrastructure::world::InMemoryWorld;

/// A small open map with a world and a fully wired context.
pub struct Fixture {
    pub world: InMemoryWorld,
    pub ctx: HaulContext,
}

impl Fixture {
    pub fn new(width: i32, height: i32) -> Self {
        Self::with_map(GridMap::new(width, height))
    }

    pub fn with_map(map: GridMap) -> Self {
        Self::with_config(map, HaulageConfig::default())
    }

    pub fn with_config(map: GridMap, config: HaulageConfig) -> Self {
        let world = InMemoryWorld::new();
        let ctx = HaulContext::in_memory(world.clone(), Arc::new(map), config);
        Self { world, ctx }
    }

    pub fn agent(&self, name: &str, x: i32, y: i32) -> AgentId {
        self.world.add_agent(Agent::new(name, Cell::new(x, y)).with_duty(GroupId(1)))
    }

    pub fn steel(&self, count: u32, x: i32, y: i32) -> Item {
        let item = Item::stack("Steel", count, Cell::new(x, y));
        self.world.add_item(item.clone());
        item
    }

    /// Container in group 1 whose manifest holds the given requirements.
    pub fn container(&self, x: i32, y: i32, requirements: Vec<Requirement>) -> ContainerId {
        let mut container = Container::new("Pod", Cell::new(x, y));
        container.group = Some(GroupId(1));
        container.manifest = Manifest::new(container.id, requirements);
        self.world.add_container(container)
    }

    pub fn get_agent(&self, id: AgentId) -> Agent {
        self.world.agent(id).expect("agent exists")
    }

    pub fn get_container(&self, id: ContainerId) -> Container {
        self.world.container(id).expect("container exists")
    }

    pub fn ground_count(&self, id: ItemId) -> Option<u32> {
        self.world.item(id).map(|item| item.stack_count)
    }

    pub fn outstanding(&self, id: ContainerId) -> u32 {
        self.get_container(id)
            .manifest
            .requirements
            .iter()
            .map(|req| req.count_to_transfer)
            .sum()
    }
}
