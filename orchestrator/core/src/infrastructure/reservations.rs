// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! In-memory reservation oracle.
//!
//! One holder per item. Check-and-insert happens under a single write lock so
//! two agents racing for the same item cannot both succeed.

use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::domain::agent::AgentId;
use crate::domain::item::ItemId;
use crate::domain::reservation::{Reservation, ReservationError, ReservationOracle};

#[derive(Clone, Default)]
pub struct InMemoryReservationOracle {
    reservations: Arc<RwLock<HashMap<ItemId, Reservation>>>,
}

impl InMemoryReservationOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.reservations.read().len()
    }

    pub fn held_by(&self, agent: AgentId) -> Vec<Reservation> {
        self.reservations
            .read()
            .values()
            .filter(|r| r.held_by == agent)
            .cloned()
            .collect()
    }
}

impl ReservationOracle for InMemoryReservationOracle {
    fn can_reserve(&self, agent: AgentId, item: ItemId, _count: u32) -> bool {
        match self.reservations.read().get(&item) {
            Some(existing) => existing.held_by == agent,
            None => true,
        }
    }

    fn reserve(&self, agent: AgentId, item: ItemId, count: u32) -> Result<(), ReservationError> {
        let mut reservations = self.reservations.write();
        if let Some(existing) = reservations.get(&item) {
            if existing.held_by != agent {
                return Err(ReservationError::HeldByOther {
                    item,
                    holder: existing.held_by,
                });
            }
        }
        reservations.insert(
            item,
            Reservation {
                item,
                held_by: agent,
                count,
                reserved_at: Utc::now(),
            },
        );
        debug!("Reserved item {} x{} for agent {}", item, count, agent);
        Ok(())
    }

    fn release(&self, agent: AgentId, item: ItemId) {
        let mut reservations = self.reservations.write();
        if reservations.get(&item).map(|r| r.held_by == agent).unwrap_or(false) {
            reservations.remove(&item);
        }
    }

    fn release_all(&self, agent: AgentId) {
        self.reservations.write().retain(|_, r| r.held_by != agent);
    }

    fn holder(&self, item: ItemId) -> Option<AgentId> {
        self.reservations.read().get(&item).map(|r| r.held_by)
    }
}
