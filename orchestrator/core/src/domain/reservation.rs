// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::agent::AgentId;
use crate::domain::item::ItemId;

/// Advisory exclusivity record on an item, scoped to the holder's current task.
///
/// Only one agent may hold a reservation for a given item at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub item: ItemId,
    pub held_by: AgentId,
    pub count: u32,
    pub reserved_at: DateTime<Utc>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReservationError {
    #[error("item {item} is already reserved by agent {holder}")]
    HeldByOther { item: ItemId, holder: AgentId },
}

pub trait ReservationOracle: Send + Sync {
    /// Whether `agent` could take (or already holds) the reservation.
    fn can_reserve(&self, agent: AgentId, item: ItemId, count: u32) -> bool;

    /// Acquire the reservation. Re-reserving one's own item updates the count.
    fn reserve(&self, agent: AgentId, item: ItemId, count: u32) -> Result<(), ReservationError>;

    fn release(&self, agent: AgentId, item: ItemId);

    /// Drop every reservation held by `agent`; called when its task ends.
    fn release_all(&self, agent: AgentId);

    fn holder(&self, item: ItemId) -> Option<AgentId>;
}
