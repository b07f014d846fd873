// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Reachability Port
//!
//! Grid coordinates, traversal danger and the search contract the selector
//! and executor rely on. The contract is deliberately narrow:
//!
//! - `closest_reachable` ranks by path distance only, over the haulable
//!   category, with no radius limit.
//! - Ties are broken by the implementation's own iteration order, which
//!   must be deterministic for identical world states.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::agent::Agent;
use crate::domain::item::Item;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Four-way neighbours in a fixed order: north, south, east, west.
    pub fn neighbours(self) -> [Cell; 4] {
        [
            Cell::new(self.x, self.y + 1),
            Cell::new(self.x, self.y - 1),
            Cell::new(self.x + 1, self.y),
            Cell::new(self.x - 1, self.y),
        ]
    }

    pub fn manhattan(self, other: Cell) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Same cell or orthogonally adjacent.
    pub fn touches(self, other: Cell) -> bool {
        self.manhattan(other) <= 1
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Danger {
    None,
    Some,
    Deadly,
}

impl Default for Danger {
    fn default() -> Self {
        Danger::Some
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalPolicy {
    pub max_danger: Danger,
}

impl TraversalPolicy {
    pub const fn new(max_danger: Danger) -> Self {
        Self { max_danger }
    }

    /// Policy used for hauling searches: any cell is acceptable.
    pub const fn deadly() -> Self {
        Self::new(Danger::Deadly)
    }

    pub fn permits(&self, danger: Danger) -> bool {
        danger <= self.max_danger
    }
}

pub trait ReachabilitySearch: Send + Sync {
    /// Closest haulable item the agent can touch that satisfies `validator`.
    fn closest_reachable(
        &self,
        agent: &Agent,
        validator: &dyn Fn(&Item) -> bool,
        policy: TraversalPolicy,
    ) -> Option<Item>;

    /// Whether the agent can walk to a cell touching `target`.
    fn can_reach(&self, agent: &Agent, target: Cell, policy: TraversalPolicy) -> bool;

    /// Whether an agent may stand on `cell` under `policy`.
    fn standable(&self, cell: Cell, policy: TraversalPolicy) -> bool;

    /// Shortest walk from `from` to a cell touching `target`, excluding `from`.
    ///
    /// An empty path means `from` already touches `target`.
    fn path(&self, from: Cell, target: Cell, policy: TraversalPolicy) -> Option<Vec<Cell>>;
}
