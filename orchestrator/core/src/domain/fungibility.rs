// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::item::Item;

/// Decides whether two instances count toward the same requirement.
///
/// The same rule must be used by demand accounting and candidate selection,
/// otherwise in-flight claims and candidates disagree about what they cover.
pub trait FungibilityRule: Send + Sync {
    fn equivalent_for_transfer(&self, a: &Item, b: &Item) -> bool;
}

/// Same def, category, material and quality. Sapient cargo is only ever
/// equivalent to itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardFungibility;

impl FungibilityRule for StandardFungibility {
    fn equivalent_for_transfer(&self, a: &Item, b: &Item) -> bool {
        if a.id == b.id {
            return true;
        }
        if a.is_sapient() || b.is_sapient() {
            return false;
        }
        a.def == b.def && a.category == b.category && a.material == b.material && a.quality == b.quality
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::item::SapientState;
    use crate::domain::reachability::Cell;

    #[test]
    fn test_same_def_different_stacks_are_equivalent() {
        let rule = StandardFungibility;
        let a = Item::stack("Steel", 10, Cell::new(0, 0));
        let b = Item::stack("Steel", 40, Cell::new(5, 5));
        assert!(rule.equivalent_for_transfer(&a, &b));
    }

    #[test]
    fn test_material_and_quality_split_classes() {
        let rule = StandardFungibility;
        let origin = Cell::new(0, 0);
        let wood_chair = Item::stack("Chair", 1, origin).with_material("Wood");
        let steel_chair = Item::stack("Chair", 1, origin).with_material("Steel");
        let good = Item::stack("Chair", 1, origin).with_material("Wood").with_quality(3);

        assert!(!rule.equivalent_for_transfer(&wood_chair, &steel_chair));
        assert!(!rule.equivalent_for_transfer(&wood_chair, &good));
    }

    #[test]
    fn test_sapient_cargo_is_never_substituted() {
        let rule = StandardFungibility;
        let state = SapientState { is_colonist: false, downed: true };
        let a = Item::sapient("Human", Cell::new(0, 0), state);
        let b = Item::sapient("Human", Cell::new(0, 0), state);
        assert!(rule.equivalent_for_transfer(&a, &a));
        assert!(!rule.equivalent_for_transfer(&a, &b));
    }
}
