// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the haulage CLI

pub mod config;
pub mod run;
pub mod scenario;

pub use self::config::ConfigCommand;
pub use self::run::RunArgs;
pub use self::scenario::ScenarioCommand;
