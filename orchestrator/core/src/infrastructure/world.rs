// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! In-memory world state.
//!
//! Implements every store port over three independently locked vectors.
//! Vectors keep spawn order, which is the iteration order searches rely on
//! for deterministic tie-breaking.

use parking_lot::RwLock;
use std::sync::Arc;

use crate::domain::agent::{Agent, AgentId};
use crate::domain::container::{Container, ContainerId, GroupId, LoadingState};
use crate::domain::item::{Item, ItemId};
use crate::domain::manifest::RequirementId;
use crate::domain::reachability::Cell;
use crate::domain::store::{AgentStore, ContainerStore, ItemStore, StoreError};

#[derive(Debug, Clone, Default)]
pub struct InMemoryWorld {
    items: Arc<RwLock<Vec<Item>>>,
    agents: Arc<RwLock<Vec<Agent>>>,
    containers: Arc<RwLock<Vec<Container>>>,
}

impl InMemoryWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_item(&self, item: Item) -> ItemId {
        let id = item.id;
        self.items.write().push(item);
        id
    }

    /// Destroy an item lying on the map.
    pub fn remove_item(&self, id: ItemId) -> Option<Item> {
        let mut items = self.items.write();
        let idx = items.iter().position(|item| item.id == id)?;
        Some(items.remove(idx))
    }

    pub fn add_agent(&self, agent: Agent) -> AgentId {
        let id = agent.id;
        self.agents.write().push(agent);
        id
    }

    pub fn add_container(&self, container: Container) -> ContainerId {
        let id = container.id;
        self.containers.write().push(container);
        id
    }

    pub fn remove_container(&self, id: ContainerId) -> Option<Container> {
        let mut containers = self.containers.write();
        let idx = containers.iter().position(|c| c.id == id)?;
        Some(containers.remove(idx))
    }

    pub fn set_forbidden(&self, id: ContainerId, forbidden: bool) -> Result<(), StoreError> {
        self.with_container(id, |container| {
            container.forbidden = forbidden;
            Ok(())
        })
    }

    fn with_container<T>(
        &self,
        id: ContainerId,
        f: impl FnOnce(&mut Container) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut containers = self.containers.write();
        let container = containers
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(StoreError::ContainerNotFound(id))?;
        f(container)
    }

    fn with_agent<T>(&self, id: AgentId, f: impl FnOnce(&mut Agent) -> T) -> Result<T, StoreError> {
        let mut agents = self.agents.write();
        let agent = agents
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(StoreError::AgentNotFound(id))?;
        Ok(f(agent))
    }
}

impl ItemStore for InMemoryWorld {
    fn item(&self, id: ItemId) -> Option<Item> {
        self.items.read().iter().find(|item| item.id == id).cloned()
    }

    fn ground_items(&self) -> Vec<Item> {
        self.items.read().clone()
    }

    fn items_at(&self, cell: Cell) -> Vec<Item> {
        self.items
            .read()
            .iter()
            .filter(|item| item.position == cell)
            .cloned()
            .collect()
    }

    fn take(&self, id: ItemId, count: u32) -> Result<Item, StoreError> {
        let mut items = self.items.write();
        let idx = items
            .iter()
            .position(|item| item.id == id)
            .ok_or(StoreError::ItemNotFound(id))?;

        let available = items[idx].stack_count;
        if count == 0 || count > available {
            return Err(StoreError::InsufficientStack {
                item: id,
                requested: count,
                available,
            });
        }
        if count == available {
            return Ok(items.remove(idx));
        }
        items[idx].split_off(count).ok_or(StoreError::InsufficientStack {
            item: id,
            requested: count,
            available,
        })
    }

    fn place(&self, mut item: Item, cell: Cell) {
        item.position = cell;
        self.items.write().push(item);
    }
}

impl AgentStore for InMemoryWorld {
    fn agent(&self, id: AgentId) -> Option<Agent> {
        self.agents.read().iter().find(|a| a.id == id).cloned()
    }

    fn agents(&self) -> Vec<Agent> {
        self.agents.read().clone()
    }

    fn move_agent(&self, id: AgentId, cell: Cell) -> Result<(), StoreError> {
        self.with_agent(id, |agent| {
            agent.position = cell;
            if let Some(carried) = agent.carried.as_mut() {
                carried.position = cell;
            }
        })
    }

    fn set_carried(&self, id: AgentId, item: Option<Item>) -> Result<Option<Item>, StoreError> {
        self.with_agent(id, |agent| std::mem::replace(&mut agent.carried, item))
    }

    fn occupant_of(&self, cell: Cell, excluding: AgentId) -> Option<AgentId> {
        self.agents
            .read()
            .iter()
            .find(|a| a.id != excluding && a.position == cell)
            .map(|a| a.id)
    }
}

impl ContainerStore for InMemoryWorld {
    fn container(&self, id: ContainerId) -> Option<Container> {
        self.containers.read().iter().find(|c| c.id == id).cloned()
    }

    fn containers(&self) -> Vec<Container> {
        self.containers.read().clone()
    }

    fn containers_in_group(&self, group: GroupId) -> Vec<Container> {
        self.containers
            .read()
            .iter()
            .filter(|c| c.group == Some(group))
            .cloned()
            .collect()
    }

    fn register_fulfilling(
        &self,
        container: ContainerId,
        requirement: RequirementId,
        item: &Item,
    ) -> Result<bool, StoreError> {
        self.with_container(container, |c| {
            let req = c
                .manifest
                .requirement_mut(requirement)
                .ok_or(StoreError::RequirementNotFound { container, requirement })?;
            Ok(req.register(item.clone()))
        })
    }

    fn record_delivery(
        &self,
        container: ContainerId,
        requirement: RequirementId,
        count: u32,
    ) -> Result<u32, StoreError> {
        self.with_container(container, |c| {
            let req = c
                .manifest
                .requirement_mut(requirement)
                .ok_or(StoreError::RequirementNotFound { container, requirement })?;
            Ok(req.record_delivery(count))
        })
    }

    fn assemble(&self, container: ContainerId) -> Result<bool, StoreError> {
        self.with_container(container, |c| {
            let newly_built = !c.assembled;
            c.assembled = true;
            Ok(newly_built)
        })
    }

    fn deposit(&self, container: ContainerId, target: usize, mut item: Item) -> Result<Option<Item>, StoreError> {
        self.with_container(container, |c| {
            let slot = c
                .deposit_targets
                .get_mut(target)
                .ok_or(StoreError::NoSuchDepositTarget { container, target })?;

            let free = slot.free_space();
            if free == 0 {
                return Ok(Some(item));
            }
            if item.stack_count <= free {
                slot.contents.push(item);
                return Ok(None);
            }
            // Only part fits: the piece goes in, the rest stays in hand.
            match item.split_off(free) {
                Some(piece) => {
                    slot.contents.push(piece);
                    Ok(Some(item))
                }
                None => Ok(Some(item)),
            }
        })
    }

    fn set_loading(&self, container: ContainerId, state: LoadingState) -> Result<(), StoreError> {
        self.with_container(container, |c| {
            c.loading = state;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::container::DepositTarget;

    #[test]
    fn test_take_part_of_stack_splits() {
        let world = InMemoryWorld::new();
        let id = world.add_item(Item::stack("Steel", 75, Cell::new(2, 2)));

        let taken = world.take(id, 25).unwrap();

        assert_ne!(taken.id, id);
        assert_eq!(taken.stack_count, 25);
        assert_eq!(world.item(id).unwrap().stack_count, 50);
    }

    #[test]
    fn test_take_whole_stack_moves_instance() {
        let world = InMemoryWorld::new();
        let id = world.add_item(Item::stack("Steel", 10, Cell::new(2, 2)));

        let taken = world.take(id, 10).unwrap();

        assert_eq!(taken.id, id);
        assert!(world.item(id).is_none());
    }

    #[test]
    fn test_take_too_much_fails() {
        let world = InMemoryWorld::new();
        let id = world.add_item(Item::stack("Steel", 10, Cell::new(2, 2)));

        assert!(matches!(
            world.take(id, 11),
            Err(StoreError::InsufficientStack { requested: 11, available: 10, .. })
        ));
        let missing = ItemId::new();
        assert_eq!(world.take(missing, 1).unwrap_err(), StoreError::ItemNotFound(missing));
    }

    #[test]
    fn test_deposit_respects_capacity() {
        let world = InMemoryWorld::new();
        let mut pod = Container::new("Pod", Cell::new(0, 0));
        pod.deposit_targets = vec![DepositTarget::with_capacity(30), DepositTarget::with_capacity(30)];
        let pod_id = world.add_container(pod);

        let leftover = world
            .deposit(pod_id, 0, Item::stack("Steel", 45, Cell::new(0, 1)))
            .unwrap()
            .unwrap();
        assert_eq!(leftover.stack_count, 15);

        assert!(world.deposit(pod_id, 1, leftover).unwrap().is_none());
        assert_eq!(world.container(pod_id).unwrap().total_loaded(), 45);
    }

    #[test]
    fn test_occupant_of_excludes_self() {
        let world = InMemoryWorld::new();
        let cell = Cell::new(3, 3);
        let me = world.add_agent(Agent::new("me", cell));

        assert!(world.occupant_of(cell, me).is_none());

        let other = world.add_agent(Agent::new("other", cell));
        assert_eq!(world.occupant_of(cell, me), Some(other));
    }
}
