// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::reachability::Cell;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub Uuid);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Type of an item (e.g. `Steel`, `MealSimple`, `Human`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemDef(pub String);

impl ItemDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    /// Ordinary stackable goods.
    Item,
    /// Living cargo, carried rather than hauled.
    Pawn,
    /// Minified structures and other non-item things.
    Building,
}

/// State of sapient cargo (people and animals being loaded).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SapientState {
    pub is_colonist: bool,
    pub downed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub def: ItemDef,
    pub category: ItemCategory,
    pub stack_count: u32,
    pub position: Cell,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sapient: Option<SapientState>,
}

impl Item {
    /// A stack of ordinary goods.
    pub fn stack(def: impl Into<String>, stack_count: u32, position: Cell) -> Self {
        Self {
            id: ItemId::new(),
            def: ItemDef::new(def),
            category: ItemCategory::Item,
            stack_count,
            position,
            material: None,
            quality: None,
            sapient: None,
        }
    }

    /// A single piece of sapient cargo.
    pub fn sapient(def: impl Into<String>, position: Cell, state: SapientState) -> Self {
        Self {
            id: ItemId::new(),
            def: ItemDef::new(def),
            category: ItemCategory::Pawn,
            stack_count: 1,
            position,
            material: None,
            quality: None,
            sapient: Some(state),
        }
    }

    pub fn with_material(mut self, material: impl Into<String>) -> Self {
        self.material = Some(material.into());
        self
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = Some(quality);
        self
    }

    pub fn is_sapient(&self) -> bool {
        self.sapient.is_some()
    }

    /// Sapient cargo that will not walk into the container on its own.
    pub fn needs_rescue(&self) -> bool {
        self.sapient
            .map(|state| !state.is_colonist || state.downed)
            .unwrap_or(false)
    }

    /// Only ordinary goods are in the haulable search category.
    pub fn is_haulable(&self) -> bool {
        self.category == ItemCategory::Item
    }

    /// Split `count` off this stack into a new instance.
    ///
    /// Returns `None` when `count` is zero or larger than the stack. Taking
    /// the whole stack is the caller's concern: the original instance moves.
    pub fn split_off(&mut self, count: u32) -> Option<Item> {
        if count == 0 || count >= self.stack_count {
            return None;
        }
        self.stack_count -= count;
        let mut piece = self.clone();
        piece.id = ItemId::new();
        piece.stack_count = count;
        Some(piece)
    }

    /// Absorb another stack of the same kind.
    pub fn absorb(&mut self, other: Item) {
        self.stack_count += other.stack_count;
    }
}
