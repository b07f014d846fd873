// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # World Store Interfaces
//!
//! Access contracts for the state the coordination core reads and mutates.
//! The world itself (map, item lifetimes, container internals) is owned
//! elsewhere; the core only goes through these traits.
//!
//! | Trait | Owns | Implementations |
//! |-------|------|-----------------|
//! | `ItemStore` | items lying on the map | `InMemoryWorld` |
//! | `AgentStore` | agent position and carried stack | `InMemoryWorld` |
//! | `ContainerStore` | containers, manifests, contents | `InMemoryWorld` |
//!
//! Every method is synchronous: selection and demand resolution complete
//! within a single scheduling turn.

use thiserror::Error;

use crate::domain::agent::{Agent, AgentId};
use crate::domain::container::{Container, ContainerId, GroupId, LoadingState};
use crate::domain::item::{Item, ItemId};
use crate::domain::manifest::RequirementId;
use crate::domain::reachability::Cell;

pub trait ItemStore: Send + Sync {
    fn item(&self, id: ItemId) -> Option<Item>;

    /// Every item on the map, in stable spawn order.
    fn ground_items(&self) -> Vec<Item>;

    fn items_at(&self, cell: Cell) -> Vec<Item>;

    /// Remove `count` from the ground instance `id`.
    ///
    /// Taking the whole stack moves the instance itself; taking part of it
    /// splits off a new instance, which is what gets returned.
    fn take(&self, id: ItemId, count: u32) -> Result<Item, StoreError>;

    /// Put an item back on the map at `cell`.
    fn place(&self, item: Item, cell: Cell);
}

pub trait AgentStore: Send + Sync {
    fn agent(&self, id: AgentId) -> Option<Agent>;

    fn agents(&self) -> Vec<Agent>;

    fn move_agent(&self, id: AgentId, cell: Cell) -> Result<(), StoreError>;

    /// Replace what the agent carries, returning what it held before.
    fn set_carried(&self, id: AgentId, item: Option<Item>) -> Result<Option<Item>, StoreError>;

    /// Some other agent standing on `cell`.
    fn occupant_of(&self, cell: Cell, excluding: AgentId) -> Option<AgentId>;
}

pub trait ContainerStore: Send + Sync {
    fn container(&self, id: ContainerId) -> Option<Container>;

    fn containers(&self) -> Vec<Container>;

    fn containers_in_group(&self, group: GroupId) -> Vec<Container>;

    /// Append `item` to the requirement's fulfilling set. Returns `false` if
    /// it was already registered.
    fn register_fulfilling(
        &self,
        container: ContainerId,
        requirement: RequirementId,
        item: &Item,
    ) -> Result<bool, StoreError>;

    /// Decrement the requirement, returning the new outstanding count.
    fn record_delivery(
        &self,
        container: ContainerId,
        requirement: RequirementId,
        count: u32,
    ) -> Result<u32, StoreError>;

    /// Build an un-assembled container. Returns `true` if it was built now.
    fn assemble(&self, container: ContainerId) -> Result<bool, StoreError>;

    /// Put `item` into deposit target `target`, returning what did not fit.
    fn deposit(&self, container: ContainerId, target: usize, item: Item) -> Result<Option<Item>, StoreError>;

    fn set_loading(&self, container: ContainerId, state: LoadingState) -> Result<(), StoreError>;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("item not found: {0}")]
    ItemNotFound(ItemId),

    #[error("agent not found: {0}")]
    AgentNotFound(AgentId),

    #[error("container not found: {0}")]
    ContainerNotFound(ContainerId),

    #[error("requirement {requirement} not found on container {container}")]
    RequirementNotFound {
        container: ContainerId,
        requirement: RequirementId,
    },

    #[error("cannot take {requested} from item {item} holding {available}")]
    InsufficientStack {
        item: ItemId,
        requested: u32,
        available: u32,
    },

    #[error("deposit target {target} does not exist on container {container}")]
    NoSuchDepositTarget { container: ContainerId, target: usize },
}
