// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Application Layer
//!
//! Coordination services built on the domain ports.
//!
//! | Module | Key Types |
//! |--------|-----------|
//! | [`context`] | `HaulContext` |
//! | [`demand`] | `DemandResolver` |
//! | [`selector`] | `CandidateSelector` |
//! | [`job_giver`] | `LoadingWorkGiver`, `LoadTransportersJobGiver` |
//! | [`executor`] | `HaulTaskRun`, `HaulError` |

pub mod context;
pub mod demand;
pub mod executor;
pub mod job_giver;
pub mod selector;

pub use context::HaulContext;
pub use demand::DemandResolver;
pub use executor::{HaulError, HaulTaskRun};
pub use job_giver::{LoadTransportersJobGiver, LoadingWorkGiver};
pub use selector::CandidateSelector;
