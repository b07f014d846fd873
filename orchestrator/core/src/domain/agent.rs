// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::container::GroupId;
use crate::domain::item::Item;
use crate::domain::reachability::{Cell, Danger, TraversalPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub Uuid);

impl AgentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A mobile worker able to carry one stack at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub position: Cell,
    /// Agents without manipulation can never haul.
    pub can_manipulate: bool,
    /// Highest danger the agent accepts when walking on its own initiative.
    pub max_danger: Danger,
    /// Transport group this agent is on loading duty for, if any.
    #[serde(default)]
    pub loading_duty: Option<GroupId>,
    #[serde(default)]
    pub carried: Option<Item>,
}

impl Agent {
    pub fn new(name: impl Into<String>, position: Cell) -> Self {
        Self {
            id: AgentId::new(),
            name: name.into(),
            position,
            can_manipulate: true,
            max_danger: Danger::Some,
            loading_duty: None,
            carried: None,
        }
    }

    pub fn with_duty(mut self, group: GroupId) -> Self {
        self.loading_duty = Some(group);
        self
    }

    pub fn normal_policy(&self) -> TraversalPolicy {
        TraversalPolicy::new(self.max_danger)
    }

    /// Stack count currently in hand, zero when empty-handed.
    pub fn carried_count(&self) -> u32 {
        self.carried.as_ref().map(|item| item.stack_count).unwrap_or(0)
    }
}
