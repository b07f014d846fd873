// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Loading Manifest
//!
//! A [`Manifest`] is the ordered list of outstanding [`Requirement`]s for one
//! container. Each requirement names a fungibility class through its known
//! instances (`things`); the first known instance is the representative used
//! for equivalence tests.
//!
//! ## Invariants
//!
//! - `count_to_transfer` only ever decreases.
//! - A requirement at zero is satisfied and takes no further part in search.
//! - `things` only grows; instances are never removed once registered.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::container::ContainerId;
use crate::domain::fungibility::FungibilityRule;
use crate::domain::item::{Item, ItemId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequirementId(pub Uuid);

impl RequirementId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequirementId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequirementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Requirement {
    pub id: RequirementId,
    /// Quantity still to be transferred.
    pub count_to_transfer: u32,
    /// Instances known to satisfy this requirement, representative first.
    pub things: Vec<Item>,
}

impl Requirement {
    pub fn new(count_to_transfer: u32, things: Vec<Item>) -> Self {
        Self {
            id: RequirementId::new(),
            count_to_transfer,
            things,
        }
    }

    pub fn any_thing(&self) -> Option<&Item> {
        self.things.first()
    }

    pub fn has_any_thing(&self) -> bool {
        !self.things.is_empty()
    }

    pub fn is_satisfied(&self) -> bool {
        self.count_to_transfer == 0
    }

    pub fn contains(&self, item: ItemId) -> bool {
        self.things.iter().any(|thing| thing.id == item)
    }

    /// Whether `item` counts toward this requirement: known instance first,
    /// equivalence with the representative second.
    pub fn covers(&self, item: &Item, rule: &dyn FungibilityRule) -> bool {
        self.contains(item.id)
            || self
                .any_thing()
                .map(|representative| rule.equivalent_for_transfer(representative, item))
                .unwrap_or(false)
    }

    /// Append a fulfilling instance. Returns `false` if it was already known.
    pub fn register(&mut self, item: Item) -> bool {
        if self.contains(item.id) {
            return false;
        }
        self.things.push(item);
        true
    }

    /// Decrease the outstanding count, saturating at zero.
    pub fn record_delivery(&mut self, count: u32) -> u32 {
        self.count_to_transfer = self.count_to_transfer.saturating_sub(count);
        self.count_to_transfer
    }

    pub fn label(&self) -> &str {
        self.any_thing().map(|thing| thing.def.as_str()).unwrap_or("<empty>")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub container: ContainerId,
    pub requirements: Vec<Requirement>,
}

impl Manifest {
    pub fn new(container: ContainerId, requirements: Vec<Requirement>) -> Self {
        Self { container, requirements }
    }

    pub fn anything_left_to_load(&self) -> bool {
        self.requirements
            .iter()
            .any(|req| !req.is_satisfied() && req.has_any_thing())
    }

    pub fn requirement(&self, id: RequirementId) -> Option<&Requirement> {
        self.requirements.iter().find(|req| req.id == id)
    }

    pub fn requirement_mut(&mut self, id: RequirementId) -> Option<&mut Requirement> {
        self.requirements.iter_mut().find(|req| req.id == id)
    }

    /// Requirement an item should be credited to.
    ///
    /// Prefers an open requirement listing the exact instance, then the first
    /// open one whose representative is equivalent. Satisfied requirements
    /// never take credit.
    pub fn matching_desperate(&self, item: &Item, rule: &dyn FungibilityRule) -> Option<&Requirement> {
        let open = || self.requirements.iter().filter(|req| !req.is_satisfied());
        open()
            .find(|req| req.contains(item.id))
            .or_else(|| {
                open().find(|req| {
                    req.any_thing()
                        .map(|representative| rule.equivalent_for_transfer(representative, item))
                        .unwrap_or(false)
                })
            })
    }
}
