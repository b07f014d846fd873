// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

mod common;

use common::Fixture;
use haulage_core::application::executor::{run_to_completion, HaulError, HaulTaskRun};
use haulage_core::application::job_giver::{LoadTransportersJobGiver, LoadingWorkGiver};
use haulage_core::domain::agent::AgentId;
use haulage_core::domain::container::{DepositTarget, LoadingState};
use haulage_core::domain::events::HaulEvent;
use haulage_core::domain::haul::{FailReason, HaulJob, HaulStep, StepOutcome};
use haulage_core::domain::item::Item;
use haulage_core::domain::manifest::Requirement;
use haulage_core::domain::reachability::Cell;
use haulage_core::domain::reservation::ReservationOracle;
use haulage_core::domain::store::{AgentStore, ContainerStore, ItemStore};
use haulage_core::infrastructure::grid::GridMap;

const TURNS: u32 = 500;

#[test]
fn test_single_agent_delivers_requested_quantity() {
    let fx = Fixture::new(20, 5);
    let hauler = fx.agent("hauler", 0, 0);
    let steel = fx.steel(75, 5, 0);
    let pod = fx.container(12, 0, vec![Requirement::new(50, vec![steel.clone()])]);
    let mut events = fx.ctx.events.subscribe();

    let giver = LoadingWorkGiver::new(fx.ctx.clone());
    let job = giver.job_on(&fx.get_agent(hauler), pod).expect("job");
    assert_eq!(job.count, 50);
    assert_eq!(job.item, steel.id);
    assert!(job.ignore_forbidden);

    let mut run = HaulTaskRun::start(fx.ctx.clone(), job);
    let outcome = run_to_completion(&mut run, TURNS).unwrap();

    assert_eq!(outcome, StepOutcome::Succeeded { delivered: 50, obsolete: false });
    assert_eq!(fx.outstanding(pod), 0);
    assert_eq!(fx.get_container(pod).total_loaded(), 50);
    assert_eq!(fx.ground_count(steel.id), Some(25));
    assert!(fx.get_agent(hauler).carried.is_none());
    assert!(fx.ctx.claims.claims_toward(pod).is_empty());
    assert_eq!(fx.ctx.reservations.holder(steel.id), None);

    let events = events.drain();
    assert!(events.iter().any(|e| matches!(e, HaulEvent::ItemPickedUp { count: 50, .. })));
    assert!(events.iter().any(|e| matches!(e, HaulEvent::ContainerSatisfied { .. })));
    assert!(matches!(events.last(), Some(HaulEvent::TaskSucceeded { delivered: 50, .. })));
}

#[test]
fn test_second_agent_sees_demand_net_of_first_claim() {
    let fx = Fixture::new(30, 10);
    let alice = fx.agent("alice", 0, 0);
    let bob = fx.agent("bob", 29, 0);
    let near_alice = fx.steel(60, 3, 0);
    let near_bob = fx.steel(75, 26, 0);
    let pod = fx.container(
        15,
        8,
        vec![Requirement::new(100, vec![near_alice.clone(), near_bob.clone()])],
    );
    let giver = LoadingWorkGiver::new(fx.ctx.clone());
    let requirement = fx.get_container(pod).manifest.requirements[0].clone();

    // Both agents see the full target before anyone commits.
    let demand = giver.selector().demand();
    assert_eq!(demand.remaining_demand(alice, &requirement, pod), 100);
    assert_eq!(demand.remaining_demand(bob, &requirement, pod), 100);

    let job_a = giver.job_on(&fx.get_agent(alice), pod).unwrap();
    assert_eq!((job_a.item, job_a.count), (near_alice.id, 60));
    let mut run_a = HaulTaskRun::start(fx.ctx.clone(), job_a);
    run_a.tick().unwrap();

    assert_eq!(demand.remaining_demand(bob, &requirement, pod), 40);
    let job_b = giver.job_on(&fx.get_agent(bob), pod).unwrap();
    assert_eq!((job_b.item, job_b.count), (near_bob.id, 40));
    let mut run_b = HaulTaskRun::start(fx.ctx.clone(), job_b);

    for _ in 0..TURNS {
        let a = run_a.tick().unwrap();
        let b = run_b.tick().unwrap();
        if a.is_finished() && b.is_finished() {
            break;
        }
    }

    assert_eq!(run_a.delivered() + run_b.delivered(), 100);
    assert_eq!(fx.outstanding(pod), 0);
    assert_eq!(fx.get_container(pod).total_loaded(), 100);
    assert_eq!(fx.ground_count(near_alice.id), None);
    assert_eq!(fx.ground_count(near_bob.id), Some(35));
}

#[test]
fn test_obsolete_task_succeeds_without_side_effects() {
    let fx = Fixture::new(20, 5);
    let hauler = fx.agent("hauler", 0, 0);
    let steel = fx.steel(30, 6, 0);
    let pod = fx.container(12, 0, vec![Requirement::new(30, vec![steel.clone()])]);
    let requirement = fx.get_container(pod).manifest.requirements[0].id;

    let job = LoadingWorkGiver::new(fx.ctx.clone())
        .job_on(&fx.get_agent(hauler), pod)
        .unwrap();
    let mut run = HaulTaskRun::start(fx.ctx.clone(), job);
    run.tick().unwrap();

    // Someone else fills the requirement while the hauler walks over.
    fx.world.record_delivery(pod, requirement, 30).unwrap();

    let outcome = run_to_completion(&mut run, TURNS).unwrap();
    assert_eq!(outcome, StepOutcome::Succeeded { delivered: 0, obsolete: true });
    assert_eq!(fx.ground_count(steel.id), Some(30));
    assert!(fx.get_agent(hauler).carried.is_none());
    assert_eq!(fx.ctx.reservations.holder(steel.id), None);
    assert!(fx.ctx.claims.claims_toward(pod).is_empty());
}

#[test]
fn test_vanished_item_fails_task() {
    let fx = Fixture::new(20, 5);
    let hauler = fx.agent("hauler", 0, 0);
    let steel = fx.steel(30, 8, 0);
    let pod = fx.container(12, 0, vec![Requirement::new(30, vec![steel.clone()])]);

    let job = HaulJob::new(hauler, steel.id, pod, 30);
    let mut run = HaulTaskRun::start(fx.ctx.clone(), job);
    run.tick().unwrap();
    fx.world.remove_item(steel.id);

    let outcome = run_to_completion(&mut run, TURNS).unwrap();
    assert_eq!(outcome, StepOutcome::Failed(FailReason::ItemVanished));
    assert!(fx.ctx.claims.claims_toward(pod).is_empty());
}

#[test]
fn test_cancelled_loading_drops_carried_stack() {
    let fx = Fixture::new(30, 5);
    let hauler = fx.agent("hauler", 0, 0);
    let steel = fx.steel(20, 2, 0);
    let pod = fx.container(25, 0, vec![Requirement::new(20, vec![steel.clone()])]);

    let job = HaulJob::new(hauler, steel.id, pod, 20);
    let mut run = HaulTaskRun::start(fx.ctx.clone(), job);
    // Reserve, walk one cell, pick up and set off toward the container.
    run.tick().unwrap();
    run.tick().unwrap();
    run.tick().unwrap();
    assert_eq!(fx.get_agent(hauler).carried_count(), 20);

    fx.world.set_loading(pod, LoadingState::Cancelled).unwrap();
    let outcome = run_to_completion(&mut run, TURNS).unwrap();

    assert_eq!(outcome, StepOutcome::Failed(FailReason::LoadingCancelled));
    let agent = fx.get_agent(hauler);
    assert!(agent.carried.is_none());
    let dropped = fx.world.items_at(agent.position);
    assert_eq!(dropped.iter().map(|item| item.stack_count).sum::<u32>(), 20);
    assert_eq!(fx.outstanding(pod), 20);
}

#[test]
fn test_forbidden_container_fails_task() {
    let fx = Fixture::new(20, 5);
    let hauler = fx.agent("hauler", 0, 0);
    let steel = fx.steel(10, 5, 0);
    let pod = fx.container(12, 0, vec![Requirement::new(10, vec![steel.clone()])]);

    let mut run = HaulTaskRun::start(fx.ctx.clone(), HaulJob::new(hauler, steel.id, pod, 10));
    fx.world.set_forbidden(pod, true).unwrap();

    assert_eq!(
        run_to_completion(&mut run, TURNS).unwrap(),
        StepOutcome::Failed(FailReason::ContainerForbidden)
    );
}

#[test]
fn test_reservation_race_loser_fails_fast() {
    let fx = Fixture::new(20, 5);
    let hauler = fx.agent("hauler", 0, 0);
    let steel = fx.steel(10, 5, 0);
    let pod = fx.container(12, 0, vec![Requirement::new(10, vec![steel.clone()])]);
    fx.ctx.reservations.reserve(AgentId::new(), steel.id, 10).unwrap();

    let mut run = HaulTaskRun::start(fx.ctx.clone(), HaulJob::new(hauler, steel.id, pod, 10));
    assert_eq!(run.tick().unwrap(), StepOutcome::Failed(FailReason::ReservationLost));
    assert!(run.is_finished());
}

#[test]
fn test_occupied_cell_waits_then_gives_up() {
    let fx = Fixture::new(20, 5);
    let hauler = fx.agent("hauler", 0, 0);
    let steel = fx.steel(10, 3, 0);
    let _blocker = fx.agent("blocker", 3, 0);
    let pod = fx.container(12, 0, vec![Requirement::new(10, vec![steel.clone()])]);

    let mut run = HaulTaskRun::start(fx.ctx.clone(), HaulJob::new(hauler, steel.id, pod, 10));
    run.tick().unwrap();
    // The configured budget of waiting turns passes without failure.
    for _ in 0..fx.ctx.config.spec.executor.occupied_wait_turns {
        assert_eq!(run.tick().unwrap(), StepOutcome::Running);
    }
    assert_eq!(run.tick().unwrap(), StepOutcome::Failed(FailReason::Interrupted));
}

#[test]
fn test_occupied_cell_resumes_once_cleared() {
    let fx = Fixture::new(20, 5);
    let hauler = fx.agent("hauler", 0, 0);
    let steel = fx.steel(10, 3, 0);
    let blocker = fx.agent("blocker", 3, 0);
    let pod = fx.container(12, 0, vec![Requirement::new(10, vec![steel.clone()])]);

    let mut run = HaulTaskRun::start(fx.ctx.clone(), HaulJob::new(hauler, steel.id, pod, 10));
    run.tick().unwrap();
    assert_eq!(run.tick().unwrap(), StepOutcome::Running);
    fx.world.move_agent(blocker, Cell::new(3, 4)).unwrap();

    assert_eq!(
        run_to_completion(&mut run, TURNS).unwrap(),
        StepOutcome::Succeeded { delivered: 10, obsolete: false }
    );
}

#[test]
fn test_deposit_spills_across_targets_and_drops_leftover() {
    let fx = Fixture::new(20, 5);
    let hauler = fx.agent("hauler", 0, 0);
    let steel = fx.steel(50, 4, 0);
    let pod = fx.container(12, 0, vec![Requirement::new(50, vec![steel.clone()])]);
    {
        let mut pod_state = fx.world.remove_container(pod).unwrap();
        pod_state.deposit_targets = vec![DepositTarget::with_capacity(15), DepositTarget::with_capacity(15)];
        fx.world.add_container(pod_state);
    }

    let mut run = HaulTaskRun::start(fx.ctx.clone(), HaulJob::new(hauler, steel.id, pod, 50));
    let outcome = run_to_completion(&mut run, TURNS).unwrap();

    assert_eq!(outcome, StepOutcome::Succeeded { delivered: 30, obsolete: false });
    let container = fx.get_container(pod);
    assert_eq!(container.deposit_targets[0].loaded(), 15);
    assert_eq!(container.deposit_targets[1].loaded(), 15);
    assert_eq!(fx.outstanding(pod), 20);

    let agent = fx.get_agent(hauler);
    assert!(agent.carried.is_none());
    let dropped: u32 = fx.world.items_at(agent.position).iter().map(|i| i.stack_count).sum();
    assert_eq!(dropped, 20);
}

#[test]
fn test_deposit_skips_full_targets() {
    let fx = Fixture::new(20, 5);
    let hauler = fx.agent("hauler", 0, 0);
    let steel = fx.steel(20, 4, 0);
    let pod = fx.container(12, 0, vec![Requirement::new(20, vec![steel.clone()])]);
    {
        let mut pod_state = fx.world.remove_container(pod).unwrap();
        let mut full = DepositTarget::with_capacity(5);
        full.contents.push(Item::stack("Steel", 5, Cell::new(12, 0)));
        pod_state.deposit_targets = vec![full.clone(), full, DepositTarget::unlimited()];
        fx.world.add_container(pod_state);
    }
    let mut receiver = fx.ctx.events.subscribe();

    let mut run = HaulTaskRun::start(fx.ctx.clone(), HaulJob::new(hauler, steel.id, pod, 20));
    let outcome = run_to_completion(&mut run, TURNS).unwrap();

    assert_eq!(outcome, StepOutcome::Succeeded { delivered: 20, obsolete: false });
    assert_eq!(fx.get_container(pod).deposit_targets[2].loaded(), 20);
    let targets: Vec<usize> = receiver
        .drain()
        .into_iter()
        .filter_map(|event| match event {
            HaulEvent::ItemDeposited { target, .. } => Some(target),
            _ => None,
        })
        .collect();
    assert_eq!(targets, vec![2]);
}

#[test]
fn test_unassembled_container_is_built_on_arrival() {
    let fx = Fixture::new(20, 5);
    let hauler = fx.agent("hauler", 0, 0);
    let steel = fx.steel(10, 4, 0);
    let pod = fx.container(12, 0, vec![Requirement::new(10, vec![steel.clone()])]);
    {
        let mut pod_state = fx.world.remove_container(pod).unwrap();
        pod_state.assembled = false;
        fx.world.add_container(pod_state);
    }

    let mut run = HaulTaskRun::start(fx.ctx.clone(), HaulJob::new(hauler, steel.id, pod, 10));
    run_to_completion(&mut run, TURNS).unwrap();

    assert!(fx.get_container(pod).assembled);
    assert_eq!(fx.get_container(pod).total_loaded(), 10);
}

#[test]
fn test_agent_steps_off_container_cell_before_building() {
    let fx = Fixture::new(20, 5);
    let hauler = fx.agent("hauler", 5, 0);
    let steel = fx.steel(10, 5, 1);
    let pod = fx.container(5, 0, vec![Requirement::new(10, vec![steel.clone()])]);
    {
        let mut pod_state = fx.world.remove_container(pod).unwrap();
        pod_state.assembled = false;
        fx.world.add_container(pod_state);
    }
    let pod_cell = Cell::new(5, 0);

    let mut run = HaulTaskRun::start(fx.ctx.clone(), HaulJob::new(hauler, steel.id, pod, 10));
    let mut outcome = StepOutcome::Running;
    for _ in 0..TURNS {
        outcome = run.tick().unwrap();
        if fx.get_container(pod).assembled {
            assert_ne!(fx.get_agent(hauler).position, pod_cell);
        }
        if outcome.is_finished() {
            break;
        }
    }

    assert_eq!(outcome, StepOutcome::Succeeded { delivered: 10, obsolete: false });
    assert!(fx.get_container(pod).assembled);
    let position = fx.get_agent(hauler).position;
    assert_ne!(position, pod_cell);
    assert!(position.touches(pod_cell));
}

#[test]
fn test_agent_avoids_sharing_the_approach_cell() {
    let fx = Fixture::new(20, 5);
    let hauler = fx.agent("hauler", 0, 0);
    let bystander = fx
        .world
        .add_agent(haulage_core::domain::agent::Agent::new("bystander", Cell::new(11, 0)));
    let steel = fx.steel(10, 4, 0);
    let pod = fx.container(12, 0, vec![Requirement::new(10, vec![steel.clone()])]);
    let mut events = fx.ctx.events.subscribe();

    let mut run = HaulTaskRun::start(fx.ctx.clone(), HaulJob::new(hauler, steel.id, pod, 10));
    let outcome = run_to_completion(&mut run, TURNS).unwrap();

    assert_eq!(outcome, StepOutcome::Succeeded { delivered: 10, obsolete: false });
    let position = fx.get_agent(hauler).position;
    assert_ne!(position, fx.get_agent(bystander).position);
    assert!(position.touches(Cell::new(12, 0)));
    assert!(events.drain().iter().any(|event| matches!(
        event,
        HaulEvent::StepEntered { step: HaulStep::StepOffContainer, .. }
    )));
}

#[test]
fn test_co_located_duplicates_are_collected() {
    let fx = Fixture::new(20, 5);
    let hauler = fx.agent("hauler", 0, 0);
    let first = fx.steel(30, 5, 0);
    let second = fx.steel(30, 5, 0);
    let pod = fx.container(12, 0, vec![Requirement::new(50, vec![first.clone()])]);

    let job = LoadingWorkGiver::new(fx.ctx.clone())
        .job_on(&fx.get_agent(hauler), pod)
        .unwrap();
    assert_eq!(job.item, first.id);
    assert_eq!(job.count, 30);
    assert_eq!(job.queued, vec![second.id]);

    let mut run = HaulTaskRun::start(fx.ctx.clone(), job);
    let outcome = run_to_completion(&mut run, TURNS).unwrap();

    assert_eq!(outcome, StepOutcome::Succeeded { delivered: 50, obsolete: false });
    assert_eq!(fx.ground_count(first.id), None);
    assert_eq!(fx.ground_count(second.id), Some(10));
    assert_eq!(fx.outstanding(pod), 0);
}

#[test]
fn test_rescued_pawn_is_carried_in() {
    use haulage_core::domain::item::SapientState;

    let fx = Fixture::new(20, 5);
    let hauler = fx.agent("hauler", 0, 0);
    let prisoner = Item::sapient(
        "Human",
        Cell::new(6, 2),
        SapientState {
            is_colonist: false,
            downed: true,
        },
    );
    fx.world.add_item(prisoner.clone());
    let pod = fx.container(12, 0, vec![Requirement::new(1, vec![prisoner.clone()])]);

    let job = LoadingWorkGiver::new(fx.ctx.clone())
        .job_on(&fx.get_agent(hauler), pod)
        .unwrap();
    assert_eq!(job.count, 1);
    assert!(job.queued.is_empty());

    let mut run = HaulTaskRun::start(fx.ctx.clone(), job);
    let outcome = run_to_completion(&mut run, TURNS).unwrap();

    assert_eq!(outcome, StepOutcome::Succeeded { delivered: 1, obsolete: false });
    assert!(fx.world.item(prisoner.id).is_none());
    assert_eq!(fx.outstanding(pod), 0);
}

#[test]
fn test_item_matching_no_requirement_is_an_error() {
    let fx = Fixture::new(20, 5);
    let hauler = fx.agent("hauler", 0, 0);
    let steel = fx.steel(10, 4, 0);
    let wood = Item::stack("WoodLog", 10, Cell::new(3, 0));
    fx.world.add_item(wood.clone());
    let pod = fx.container(12, 0, vec![Requirement::new(10, vec![steel])]);

    let mut run = HaulTaskRun::start(fx.ctx.clone(), HaulJob::new(hauler, wood.id, pod, 10));
    let err = run_to_completion(&mut run, TURNS).unwrap_err();

    assert!(matches!(err, HaulError::NoMatchingRequirement { item, .. } if item == wood.id));
    assert!(run.is_finished());
    assert!(fx.ctx.claims.claims_toward(pod).is_empty());
    assert!(matches!(run.tick(), Err(HaulError::Finished(_))));
}

#[test]
fn test_has_work_on_checks_eligibility() {
    let map = GridMap::new(20, 5)
        .with_wall(Cell::new(10, 0))
        .with_wall(Cell::new(10, 1))
        .with_wall(Cell::new(10, 2))
        .with_wall(Cell::new(10, 3))
        .with_wall(Cell::new(10, 4));
    let fx = Fixture::with_map(map);
    let hauler = fx.agent("hauler", 0, 0);
    let steel = fx.steel(10, 3, 0);
    let reachable = fx.container(5, 3, vec![Requirement::new(10, vec![steel.clone()])]);
    let walled_off = fx.container(15, 3, vec![Requirement::new(10, vec![steel.clone()])]);
    let giver = LoadingWorkGiver::new(fx.ctx.clone());

    assert!(giver.has_work_on(&fx.get_agent(hauler), reachable));
    assert!(!giver.has_work_on(&fx.get_agent(hauler), walled_off));

    let mut clumsy = fx.get_agent(hauler);
    clumsy.can_manipulate = false;
    assert!(!giver.has_work_on(&clumsy, reachable));

    fx.world.set_forbidden(reachable, true).unwrap();
    assert!(!giver.has_work_on(&fx.get_agent(hauler), reachable));
    assert!(giver.job_on(&fx.get_agent(hauler), reachable).is_none());
}

#[test]
fn test_job_giver_scans_duty_group() {
    let fx = Fixture::new(20, 5);
    let on_duty = fx.agent("on-duty", 0, 0);
    let idle = fx
        .world
        .add_agent(haulage_core::domain::agent::Agent::new("idle", Cell::new(1, 1)));
    let steel = fx.steel(10, 3, 0);
    let done = fx.container(12, 0, vec![Requirement::new(0, vec![steel.clone()])]);
    let open = fx.container(12, 4, vec![Requirement::new(10, vec![steel.clone()])]);

    let giver = LoadTransportersJobGiver::new(fx.ctx.clone());
    let job = giver.try_give_job(&fx.get_agent(on_duty)).unwrap();
    assert_eq!(job.container, open);
    assert_ne!(job.container, done);

    assert!(giver.try_give_job(&fx.get_agent(idle)).is_none());
}

#[test]
fn test_substitute_is_credited_to_open_requirement() {
    let fx = Fixture::new(20, 5);
    let hauler = fx.agent("hauler", 0, 0);
    let listed_done = fx.steel(10, 18, 4);
    let listed_gone = fx.steel(50, 3, 4);
    let pod = fx.container(
        12,
        0,
        vec![
            Requirement::new(0, vec![listed_done]),
            Requirement::new(50, vec![listed_gone.clone()]),
        ],
    );
    let open = fx.get_container(pod).manifest.requirements[1].id;
    fx.world.remove_item(listed_gone.id);
    let stand_in = fx.steel(50, 5, 0);

    let giver = LoadingWorkGiver::new(fx.ctx.clone());
    assert!(giver.has_work_on(&fx.get_agent(hauler), pod));
    let job = giver.job_on(&fx.get_agent(hauler), pod).unwrap();
    assert_eq!(job.item, stand_in.id);
    assert_eq!(job.count, 50);

    let mut run = HaulTaskRun::start(fx.ctx.clone(), job);
    let outcome = run_to_completion(&mut run, TURNS).unwrap();

    assert_eq!(outcome, StepOutcome::Succeeded { delivered: 50, obsolete: false });
    let manifest = fx.get_container(pod).manifest;
    assert!(manifest.requirement(open).unwrap().is_satisfied());
    assert_eq!(fx.outstanding(pod), 0);
}
