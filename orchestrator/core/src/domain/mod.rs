// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Layer
//!
//! Pure types and collaborator contracts for manifest loading. No I/O.
//!
//! | Module | Key Types |
//! |--------|-----------|
//! | [`agent`] | `Agent`, `AgentId` |
//! | [`item`] | `Item`, `ItemId`, `ItemDef`, `SapientState` |
//! | [`manifest`] | `Manifest`, `Requirement` |
//! | [`container`] | `Container`, `DepositTarget`, `GroupId` |
//! | [`claim`] | `TaskClaim`, `ClaimIndex` |
//! | [`reservation`] | `Reservation`, `ReservationOracle` |
//! | [`reachability`] | `Cell`, `Danger`, `ReachabilitySearch` |
//! | [`fungibility`] | `FungibilityRule`, `StandardFungibility` |
//! | [`selection`] | `Selection`, `SelectionTier` |
//! | [`haul`] | `HaulJob`, `HaulStep`, `STEP_TABLE`, `StepOutcome` |
//! | [`store`] | `ItemStore`, `AgentStore`, `ContainerStore` |

pub mod agent;
pub mod claim;
pub mod config;
pub mod container;
pub mod events;
pub mod fungibility;
pub mod haul;
pub mod item;
pub mod manifest;
pub mod reachability;
pub mod reservation;
pub mod selection;
pub mod store;
