// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Swarm Domain Layer
//!
//! Pure domain types for a loading run. No I/O dependencies.
//!
//! | Module | Key Types |
//! |--------|-----------|
//! | [`swarm`] | `Swarm`, `SwarmId`, `SwarmReport`, `TaskResult` |

pub mod swarm;

pub use swarm::*;
