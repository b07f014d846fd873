// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod claims;
pub mod event_bus;
pub mod grid;
pub mod reservations;
pub mod scenario;
pub mod world;

pub use claims::InMemoryClaimIndex;
pub use event_bus::{EventBus, EventBusError, EventReceiver};
pub use grid::{GridMap, GridReachability};
pub use reservations::InMemoryReservationOracle;
pub use scenario::{Scenario, ScenarioError, ScenarioLoader};
pub use world::InMemoryWorld;
