// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Haulage Core
//!
//! Multi-agent manifest loading: deciding which item each agent should haul
//! toward a transport container, and carrying the haul out step by step.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Domain types, coordination services and in-memory collaborators

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
