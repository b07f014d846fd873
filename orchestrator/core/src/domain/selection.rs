// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::item::Item;

/// Fallback tier that produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionTier {
    /// A known fulfilling instance the agent can reserve.
    ExactMatch,
    /// Sapient cargo that cannot board on its own.
    Rescue,
    /// An equivalent instance not yet listed on the manifest.
    Substitute,
}

impl SelectionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExactMatch => "exact_match",
            Self::Rescue => "rescue",
            Self::Substitute => "substitute",
        }
    }
}

impl fmt::Display for SelectionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of asking what an agent should haul next.
///
/// Everything but `Assigned` means "nothing for this agent now", but only
/// `Satisfied` means the manifest needs nothing more once in-flight work lands.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Assigned { item: Item, tier: SelectionTier },
    /// Work remains, but every matching instance is reserved elsewhere.
    Contended,
    /// Work remains, but no matching instance or substitute is reachable.
    Unavailable,
    /// No outstanding demand net of other agents' claims.
    Satisfied,
}

impl Selection {
    pub fn item(&self) -> Option<&Item> {
        match self {
            Self::Assigned { item, .. } => Some(item),
            _ => None,
        }
    }

    pub fn into_item(self) -> Option<Item> {
        match self {
            Self::Assigned { item, .. } => Some(item),
            _ => None,
        }
    }

    pub fn is_assigned(&self) -> bool {
        matches!(self, Self::Assigned { .. })
    }
}
