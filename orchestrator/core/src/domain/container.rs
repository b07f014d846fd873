// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Transport Container
//!
//! The loading target. Capacity, contents and grouping are given here and
//! never computed by the coordination core.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;

use crate::domain::agent::AgentId;
use crate::domain::item::Item;
use crate::domain::manifest::Manifest;
use crate::domain::reachability::Cell;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContainerId(pub Uuid);

impl ContainerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ContainerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transport group shared by containers launched together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub u32);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadingState {
    Loading,
    Cancelled,
}

/// One compartment accepting deposits.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DepositTarget {
    /// Unlimited when `None`.
    pub capacity: Option<u32>,
    #[serde(default)]
    pub contents: Vec<Item>,
}

impl DepositTarget {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: u32) -> Self {
        Self {
            capacity: Some(capacity),
            contents: Vec::new(),
        }
    }

    pub fn loaded(&self) -> u32 {
        self.contents.iter().map(|item| item.stack_count).sum()
    }

    pub fn free_space(&self) -> u32 {
        match self.capacity {
            Some(capacity) => capacity.saturating_sub(self.loaded()),
            None => u32::MAX,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Container {
    pub id: ContainerId,
    pub label: String,
    pub position: Cell,
    #[serde(default)]
    pub group: Option<GroupId>,
    pub loading: LoadingState,
    /// Forbidden to every agent.
    #[serde(default)]
    pub forbidden: bool,
    /// Forbidden to specific agents only.
    #[serde(default)]
    pub forbidden_to: HashSet<AgentId>,
    /// Un-assembled containers are built on the first deposit.
    pub assembled: bool,
    pub deposit_targets: Vec<DepositTarget>,
    pub manifest: Manifest,
}

impl Container {
    pub fn new(label: impl Into<String>, position: Cell) -> Self {
        let id = ContainerId::new();
        Self {
            id,
            label: label.into(),
            position,
            group: None,
            loading: LoadingState::Loading,
            forbidden: false,
            forbidden_to: HashSet::new(),
            assembled: true,
            deposit_targets: vec![DepositTarget::unlimited()],
            manifest: Manifest::new(id, Vec::new()),
        }
    }

    pub fn still_loading(&self) -> bool {
        self.loading == LoadingState::Loading
    }

    pub fn is_forbidden(&self, agent: AgentId) -> bool {
        self.forbidden || self.forbidden_to.contains(&agent)
    }

    pub fn anything_left_to_load(&self) -> bool {
        self.still_loading() && self.manifest.anything_left_to_load()
    }

    pub fn total_loaded(&self) -> u32 {
        self.deposit_targets.iter().map(DepositTarget::loaded).sum()
    }

    /// First deposit target at or after `from` with free space. Full
    /// targets are skipped when a carried stack spills over.
    pub fn next_open_target(&self, from: usize) -> Option<usize> {
        (from..self.deposit_targets.len()).find(|&idx| self.deposit_targets[idx].free_space() > 0)
    }
}
