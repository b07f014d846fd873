// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

mod common;

use common::Fixture;
use haulage_core::application::job_giver::LoadingWorkGiver;
use haulage_core::application::selector::CandidateSelector;
use haulage_core::domain::agent::AgentId;
use haulage_core::domain::claim::{ClaimIndex, TaskClaim, TaskId};
use haulage_core::domain::item::{Item, SapientState};
use haulage_core::domain::manifest::Requirement;
use haulage_core::domain::reachability::Cell;
use haulage_core::domain::reservation::ReservationOracle;
use haulage_core::domain::selection::{Selection, SelectionTier};
use haulage_core::domain::events::HaulEvent;
use haulage_core::infrastructure::event_bus::EventBus;

fn downed_prisoner(x: i32, y: i32) -> Item {
    Item::sapient(
        "Human",
        Cell::new(x, y),
        SapientState {
            is_colonist: false,
            downed: true,
        },
    )
}

#[test]
fn test_exact_match_picks_closest_listed_instance() {
    let fx = Fixture::new(20, 20);
    let hauler = fx.agent("hauler", 0, 0);
    let far = fx.steel(50, 15, 0);
    let near = fx.steel(50, 3, 0);
    let pod = fx.container(10, 10, vec![Requirement::new(100, vec![far.clone(), near.clone()])]);

    let selector = CandidateSelector::new(fx.ctx.clone());
    match selector.select(&fx.get_agent(hauler), pod) {
        Selection::Assigned { item, tier } => {
            assert_eq!(item.id, near.id);
            assert_eq!(tier, SelectionTier::ExactMatch);
        }
        other => panic!("expected assignment, got {:?}", other),
    }
    assert_eq!(selector.select_item(&fx.get_agent(hauler), pod), Some(near.id));
}

#[test]
fn test_downed_non_colonist_is_rescued_when_goods_are_held() {
    let fx = Fixture::new(20, 20);
    let hauler = fx.agent("hauler", 0, 0);
    let rival = AgentId::new();
    let steel = fx.steel(50, 2, 0);
    let prisoner = downed_prisoner(8, 8);
    fx.world.add_item(prisoner.clone());
    let pod = fx.container(
        10,
        10,
        vec![
            Requirement::new(50, vec![steel.clone()]),
            Requirement::new(1, vec![prisoner.clone()]),
        ],
    );
    fx.ctx.reservations.reserve(rival, steel.id, 50).unwrap();

    let selector = CandidateSelector::new(fx.ctx.clone());
    match selector.select(&fx.get_agent(hauler), pod) {
        Selection::Assigned { item, tier } => {
            assert_eq!(item.id, prisoner.id);
            assert_eq!(tier, SelectionTier::Rescue);
        }
        other => panic!("expected rescue, got {:?}", other),
    }
}

#[test]
fn test_walking_colonist_is_not_rescued() {
    let fx = Fixture::new(20, 20);
    let hauler = fx.agent("hauler", 0, 0);
    let colonist = Item::sapient(
        "Human",
        Cell::new(4, 4),
        SapientState {
            is_colonist: true,
            downed: false,
        },
    );
    fx.world.add_item(colonist.clone());
    let pod = fx.container(10, 10, vec![Requirement::new(1, vec![colonist])]);

    let selector = CandidateSelector::new(fx.ctx.clone());
    // Pawns contribute no needed defs, so there is no contention check or substitute.
    assert_eq!(selector.select(&fx.get_agent(hauler), pod), Selection::Unavailable);
}

#[test]
fn test_held_listed_instance_reports_contention_not_substitute() {
    let fx = Fixture::new(20, 20);
    let hauler = fx.agent("hauler", 0, 0);
    let rival = AgentId::new();
    let listed = fx.steel(50, 5, 5);
    let _unlisted = fx.steel(80, 1, 0);
    let pod = fx.container(10, 10, vec![Requirement::new(50, vec![listed.clone()])]);
    fx.ctx.reservations.reserve(rival, listed.id, 50).unwrap();

    let selector = CandidateSelector::new(fx.ctx.clone());
    assert_eq!(selector.select(&fx.get_agent(hauler), pod), Selection::Contended);
    assert_eq!(selector.select_item(&fx.get_agent(hauler), pod), None);
}

#[test]
fn test_substitute_only_takes_equivalent_instances() {
    let fx = Fixture::new(20, 20);
    let hauler = fx.agent("hauler", 0, 0);
    let listed = Item::stack("Steel", 50, Cell::new(5, 5)).with_material("Plasteel");
    fx.world.add_item(listed.clone());
    let wrong_material = Item::stack("Steel", 50, Cell::new(1, 0)).with_material("Rusty");
    let wrong_def = Item::stack("WoodLog", 50, Cell::new(0, 1));
    let good = Item::stack("Steel", 50, Cell::new(6, 0)).with_material("Plasteel");
    fx.world.add_item(wrong_material);
    fx.world.add_item(wrong_def);
    fx.world.add_item(good.clone());
    let pod = fx.container(10, 10, vec![Requirement::new(50, vec![listed.clone()])]);

    // The listed instance is gone; its snapshot stays on the manifest.
    fx.world.remove_item(listed.id);

    let selector = CandidateSelector::new(fx.ctx.clone());
    match selector.select(&fx.get_agent(hauler), pod) {
        Selection::Assigned { item, tier } => {
            assert_eq!(item.id, good.id);
            assert_eq!(tier, SelectionTier::Substitute);
        }
        other => panic!("expected substitute, got {:?}", other),
    }
}

#[test]
fn test_nothing_anywhere_is_unavailable() {
    let fx = Fixture::new(20, 20);
    let hauler = fx.agent("hauler", 0, 0);
    let listed = fx.steel(50, 5, 5);
    let pod = fx.container(10, 10, vec![Requirement::new(50, vec![listed.clone()])]);
    fx.world.remove_item(listed.id);

    let selector = CandidateSelector::new(fx.ctx.clone());
    assert_eq!(selector.select(&fx.get_agent(hauler), pod), Selection::Unavailable);
}

#[test]
fn test_fully_claimed_manifest_is_satisfied() {
    let fx = Fixture::new(20, 20);
    let hauler = fx.agent("hauler", 0, 0);
    let steel = fx.steel(50, 5, 5);
    let pod = fx.container(10, 10, vec![Requirement::new(50, vec![steel.clone()])]);

    fx.ctx.claims.publish(TaskClaim {
        task_id: TaskId::new(),
        agent: AgentId::new(),
        item: steel,
        container: pod,
        count: 50,
        claimed_at: chrono::Utc::now(),
    });

    let selector = CandidateSelector::new(fx.ctx.clone());
    assert_eq!(selector.select(&fx.get_agent(hauler), pod), Selection::Satisfied);
}

#[test]
fn test_unknown_container_yields_nothing() {
    let fx = Fixture::new(5, 5);
    let hauler = fx.agent("hauler", 0, 0);
    let selector = CandidateSelector::new(fx.ctx.clone());

    let missing = haulage_core::domain::container::ContainerId::new();
    assert!(!selector.select(&fx.get_agent(hauler), missing).is_assigned());
}

#[test]
fn test_selection_is_deterministic() {
    let fx = Fixture::new(20, 20);
    let hauler = fx.agent("hauler", 5, 5);
    // Four stacks at equal distance.
    let stacks = [fx.steel(10, 5, 8), fx.steel(10, 5, 2), fx.steel(10, 8, 5), fx.steel(10, 2, 5)];
    let pod = fx.container(
        15,
        15,
        vec![Requirement::new(40, stacks.iter().cloned().collect())],
    );

    let selector = CandidateSelector::new(fx.ctx.clone());
    let first = selector.select_item(&fx.get_agent(hauler), pod);
    for _ in 0..10 {
        assert_eq!(selector.select_item(&fx.get_agent(hauler), pod), first);
    }
    assert_eq!(first, Some(stacks[0].id));
}

#[test]
fn test_selection_is_announced_only_when_a_job_is_built() {
    let fx = Fixture::new(10, 10);
    let bus: &EventBus = &fx.ctx.events;
    let mut receiver = bus.subscribe();
    let hauler = fx.agent("hauler", 0, 0);
    let steel = fx.steel(10, 3, 3);
    let pod = fx.container(8, 8, vec![Requirement::new(10, vec![steel.clone()])]);
    let giver = LoadingWorkGiver::new(fx.ctx.clone());

    assert!(CandidateSelector::new(fx.ctx.clone())
        .select(&fx.get_agent(hauler), pod)
        .is_assigned());
    assert!(giver.has_work_on(&fx.get_agent(hauler), pod));
    assert!(giver.has_work_on(&fx.get_agent(hauler), pod));
    assert!(receiver.drain().is_empty());

    giver.job_on(&fx.get_agent(hauler), pod).unwrap();
    let events = receiver.drain();
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0],
        HaulEvent::CandidateSelected { item, tier: SelectionTier::ExactMatch, .. } if *item == steel.id
    ));
}

#[test]
fn test_requirement_without_things_has_no_demand() {
    let fx = Fixture::new(10, 10);
    let hauler = fx.agent("hauler", 0, 0);
    fx.steel(10, 3, 3);
    let pod = fx.container(8, 8, vec![Requirement::new(10, Vec::new())]);
    let requirement = fx.get_container(pod).manifest.requirements[0].clone();

    let selector = CandidateSelector::new(fx.ctx.clone());
    assert_eq!(selector.demand().remaining_demand(hauler, &requirement, pod), 0);
    assert!(selector.demand().outstanding(hauler, pod).unwrap().is_empty());
    assert_eq!(selector.select(&fx.get_agent(hauler), pod), Selection::Satisfied);
}
