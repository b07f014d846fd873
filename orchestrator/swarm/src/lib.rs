// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `haulage-swarm`: Concurrent Loading Runs
//!
//! Runs a group of agents against a shared world until every container in
//! the group has its manifest satisfied, or a tick limit is reached.
//!
//! ## Crate Layout
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | `Swarm`, `SwarmId`, `SwarmReport` |
//! | [`application`] | Application | `SwarmService` trait, `SwarmCoordinator` |
//!
//! ## Key Concepts
//!
//! - **Swarm**: the agents and containers taking part in one run.
//! - **Turn**: one call into an agent's job giver or haul task. Turns of
//!   different agents run concurrently; the claim index sizes each claim
//!   against demand under its own lock.
//! - **Backoff**: an agent that found no work rests for
//!   `spec.swarm.idle_backoff_ticks` turns before asking again.
//!
//! Swarms are tracked in memory only.

pub mod domain;
pub mod application;

pub use domain::*;
