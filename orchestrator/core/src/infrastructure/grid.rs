// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Grid-backed reachability.
//!
//! Breadth-first search over a rectangular map with four-way movement.
//! Neighbours are expanded in a fixed order, and equally distant items are
//! ranked by spawn order, so identical worlds always produce identical
//! answers.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use crate::domain::agent::Agent;
use crate::domain::item::Item;
use crate::domain::reachability::{Cell, Danger, ReachabilitySearch, TraversalPolicy};
use crate::domain::store::ItemStore;

#[derive(Debug, Clone, Default)]
pub struct GridMap {
    pub width: i32,
    pub height: i32,
    pub walls: HashSet<Cell>,
    pub danger: HashMap<Cell, Danger>,
}

impl GridMap {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    pub fn with_wall(mut self, cell: Cell) -> Self {
        self.walls.insert(cell);
        self
    }

    pub fn with_danger(mut self, cell: Cell, danger: Danger) -> Self {
        self.danger.insert(cell, danger);
        self
    }

    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.y >= 0 && cell.x < self.width && cell.y < self.height
    }

    pub fn danger_at(&self, cell: Cell) -> Danger {
        self.danger.get(&cell).copied().unwrap_or(Danger::None)
    }

    pub fn passable(&self, cell: Cell, policy: TraversalPolicy) -> bool {
        self.in_bounds(cell) && !self.walls.contains(&cell) && policy.permits(self.danger_at(cell))
    }

    /// Distance from `from` to every cell walkable under `policy`.
    ///
    /// The start cell is always included, even if it would be impassable.
    pub fn distances(&self, from: Cell, policy: TraversalPolicy) -> HashMap<Cell, u32> {
        let mut dist = HashMap::new();
        let mut queue = VecDeque::new();
        dist.insert(from, 0);
        queue.push_back(from);

        while let Some(cell) = queue.pop_front() {
            let d = dist[&cell];
            for next in cell.neighbours() {
                if dist.contains_key(&next) || !self.passable(next, policy) {
                    continue;
                }
                dist.insert(next, d + 1);
                queue.push_back(next);
            }
        }
        dist
    }
}

pub struct GridReachability {
    map: Arc<GridMap>,
    items: Arc<dyn ItemStore>,
}

impl GridReachability {
    pub fn new(map: Arc<GridMap>, items: Arc<dyn ItemStore>) -> Self {
        Self { map, items }
    }

    pub fn map(&self) -> &GridMap {
        &self.map
    }

    /// Steps needed to stand touching `target`, if it is reachable at all.
    fn touch_distance(dist: &HashMap<Cell, u32>, target: Cell) -> Option<u32> {
        std::iter::once(target)
            .chain(target.neighbours())
            .filter_map(|cell| dist.get(&cell).copied())
            .min()
    }
}

impl ReachabilitySearch for GridReachability {
    fn closest_reachable(
        &self,
        agent: &Agent,
        validator: &dyn Fn(&Item) -> bool,
        policy: TraversalPolicy,
    ) -> Option<Item> {
        let dist = self.map.distances(agent.position, policy);

        let mut best: Option<(u32, Item)> = None;
        for item in self.items.ground_items() {
            if !item.is_haulable() || !validator(&item) {
                continue;
            }
            let Some(d) = Self::touch_distance(&dist, item.position) else {
                continue;
            };
            if best.as_ref().map(|(bd, _)| d < *bd).unwrap_or(true) {
                best = Some((d, item));
            }
        }
        best.map(|(_, item)| item)
    }

    fn can_reach(&self, agent: &Agent, target: Cell, policy: TraversalPolicy) -> bool {
        self.path(agent.position, target, policy).is_some()
    }

    fn standable(&self, cell: Cell, policy: TraversalPolicy) -> bool {
        self.map.passable(cell, policy)
    }

    fn path(&self, from: Cell, target: Cell, policy: TraversalPolicy) -> Option<Vec<Cell>> {
        if from.touches(target) {
            return Some(Vec::new());
        }

        let mut came_from: HashMap<Cell, Cell> = HashMap::new();
        let mut queue = VecDeque::from([from]);
        came_from.insert(from, from);

        while let Some(cell) = queue.pop_front() {
            for next in cell.neighbours() {
                if came_from.contains_key(&next) || !self.map.passable(next, policy) {
                    continue;
                }
                came_from.insert(next, cell);
                if next.touches(target) {
                    let mut path = vec![next];
                    let mut current = cell;
                    while current != from {
                        path.push(current);
                        current = came_from[&current];
                    }
                    path.reverse();
                    return Some(path);
                }
                queue.push_back(next);
            }
        }
        None
    }
}
