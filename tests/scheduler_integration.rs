//! Integration tests for priority scheduling and the task lifecycle

use stoneholm::core::types::CubePos;
use stoneholm::program::{Expr, PositionExpr, Stmt, StmtKind, Task};
use stoneholm::simulation::Simulation;
use stoneholm::world::{CubeKind, Terrain, World};

fn flat_world() -> World {
    let mut terrain = Terrain::new(10, 10, 3);
    for y in 0..10 {
        for x in 0..10 {
            terrain.set_cube(CubePos::new(x, y, 0), CubeKind::Rock);
        }
    }
    World::new(terrain)
}

fn move_task(priority: i32, name: &str, target: CubePos) -> Task {
    Task::new(
        priority,
        name,
        vec![Stmt::bare(StmtKind::MoveTo(PositionExpr::Literal(target)))],
        CubePos::new(0, 0, 0),
    )
}

/// Test 1: a higher-priority unassigned task is always preferred, and
/// assignment makes a task invisible to the scheduler.
#[test]
fn test_priority_ordering_and_exclusion() {
    let mut sim = Simulation::new(flat_world());
    let faction = sim.add_faction("Stonekin");
    let unit = sim.world.spawn_unit("Brom", faction, CubePos::new(1, 1, 1));

    let low = sim.submit_task(faction, move_task(1, "low", CubePos::new(2, 2, 1)));
    let high = sim.submit_task(faction, move_task(9, "high", CubePos::new(3, 3, 1)));

    let scheduler = sim.scheduler(faction).unwrap();
    assert_eq!(scheduler.highest_priority_unassigned(&sim.tasks), Some(high));

    {
        let Simulation {
            world,
            tasks,
            schedulers,
        } = &mut sim;
        schedulers[0].assign(unit, high, tasks, world);
    }
    assert!(sim.tasks.get(high).unwrap().is_bound());
    let scheduler = sim.scheduler(faction).unwrap();
    assert_eq!(scheduler.highest_priority_unassigned(&sim.tasks), Some(low));
}

/// Test 2: terminating a task removes it from every scheduler that listed
/// it, and it is never offered again.
#[test]
fn test_termination_propagates_to_all_schedulers() {
    let mut sim = Simulation::new(flat_world());
    let stonekin = sim.add_faction("Stonekin");
    let ashborn = sim.add_faction("Ashborn");

    let id = sim.submit_task(stonekin, move_task(5, "shared", CubePos::new(2, 2, 1)));
    sim.scheduler_mut(ashborn).unwrap().add(id);

    assert!(sim.scheduler(stonekin).unwrap().contains(id));
    assert!(sim.scheduler(ashborn).unwrap().contains(id));

    sim.terminate_task(id);

    assert!(!sim.scheduler(stonekin).unwrap().contains(id));
    assert!(!sim.scheduler(ashborn).unwrap().contains(id));
    assert!(sim.tasks.get(id).unwrap().is_terminated());
    assert_eq!(
        sim.scheduler(stonekin)
            .unwrap()
            .highest_priority_unassigned(&sim.tasks),
        None
    );
}

/// Test 3: terminating a bound task releases its executor.
#[test]
fn test_terminating_bound_task_releases_executor() {
    let mut sim = Simulation::new(flat_world());
    let faction = sim.add_faction("Stonekin");
    let unit = sim.world.spawn_unit("Brom", faction, CubePos::new(1, 1, 1));
    let id = sim.submit_task(faction, move_task(5, "job", CubePos::new(4, 4, 1)));

    {
        let Simulation {
            world,
            tasks,
            schedulers,
        } = &mut sim;
        schedulers[0].assign(unit, id, tasks, world);
    }
    assert_eq!(sim.world.unit(unit).unwrap().task, Some(id));

    sim.terminate_task(id);
    assert_eq!(sim.world.unit(unit).unwrap().task, None);
    assert!(!sim.tasks.get(id).unwrap().is_bound());
}

/// Test 4: executor-initiated cancellation resets the task with the
/// priority penalty and returns it to the pool.
#[test]
fn test_stop_task_resets_and_requeues() {
    let mut sim = Simulation::new(flat_world());
    let faction = sim.add_faction("Stonekin");
    let unit = sim.world.spawn_unit("Brom", faction, CubePos::new(1, 1, 1));
    let id = sim.submit_task(faction, move_task(5, "flaky", CubePos::new(4, 4, 1)));

    {
        let Simulation {
            world,
            tasks,
            schedulers,
        } = &mut sim;
        schedulers[0].assign(unit, id, tasks, world);
        tasks.get_mut(id).unwrap().advance(world);
    }

    sim.stop_task(unit);

    let task = sim.tasks.get(id).unwrap();
    assert!(task.at_begin());
    assert_eq!(task.priority(), 3);
    assert!(!task.is_bound());
    assert_eq!(sim.world.unit(unit).unwrap().task, None);
    // Still registered and available again
    assert_eq!(
        sim.scheduler(faction)
            .unwrap()
            .highest_priority_unassigned(&sim.tasks),
        Some(id)
    );
}

/// Test 5: replace swaps a definition without losing the scheduling slot.
#[test]
fn test_replace_task_definition() {
    let mut sim = Simulation::new(flat_world());
    let faction = sim.add_faction("Stonekin");
    let old = sim.submit_task(faction, move_task(5, "v1", CubePos::new(2, 2, 1)));
    let new_task = move_task(5, "v2", CubePos::new(3, 3, 1));
    let new = sim.tasks.insert(new_task);

    {
        let Simulation {
            world,
            tasks,
            schedulers,
        } = &mut sim;
        schedulers[0].replace(old, new, tasks, world);
    }
    let scheduler = sim.scheduler(faction).unwrap();
    assert!(!scheduler.contains(old));
    assert!(scheduler.contains(new));
}

/// Test 6: query selects by arbitrary predicate over task state.
#[test]
fn test_query_by_predicate() {
    let mut sim = Simulation::new(flat_world());
    let faction = sim.add_faction("Stonekin");
    let a = sim.submit_task(faction, move_task(5, "alpha", CubePos::new(2, 2, 1)));
    let b = sim.submit_task(faction, move_task(8, "beta", CubePos::new(3, 3, 1)));

    let scheduler = sim.scheduler(faction).unwrap();
    let hot = scheduler.query(&sim.tasks, |t| t.priority() > 6);
    assert_eq!(hot, vec![b]);
    let named = scheduler.query(&sim.tasks, |t| t.name() == "alpha");
    assert_eq!(named, vec![a]);
}

/// Test 7: priority decay below zero is allowed and keeps ordering total.
#[test]
fn test_priority_decays_without_floor() {
    let mut sim = Simulation::new(flat_world());
    let faction = sim.add_faction("Stonekin");
    let unit = sim.world.spawn_unit("Brom", faction, CubePos::new(1, 1, 1));
    let flaky = sim.submit_task(faction, move_task(1, "flaky", CubePos::new(4, 4, 1)));
    let steady = sim.submit_task(faction, move_task(0, "steady", CubePos::new(2, 2, 1)));

    for _ in 0..3 {
        {
            let Simulation {
                world,
                tasks,
                schedulers,
            } = &mut sim;
            schedulers[0].assign(unit, flaky, tasks, world);
        }
        sim.stop_task(unit);
    }
    assert_eq!(sim.tasks.get(flaky).unwrap().priority(), -5);
    // The decayed task now ranks below the steady one
    assert_eq!(
        sim.scheduler(faction)
            .unwrap()
            .highest_priority_unassigned(&sim.tasks),
        Some(steady)
    );
}

/// Test 8: an assignment made through a sequence of assign statements is
/// visible through lookup, and binding is exclusive while held.
#[test]
fn test_at_most_one_binding() {
    let mut sim = Simulation::new(flat_world());
    let faction = sim.add_faction("Stonekin");
    let brom = sim.world.spawn_unit("Brom", faction, CubePos::new(1, 1, 1));
    let _edda = sim.world.spawn_unit("Edda", faction, CubePos::new(2, 1, 1));
    let only = sim.submit_task(
        faction,
        Task::new(
            4,
            "solo",
            vec![Stmt::bare(StmtKind::Assign {
                name: "tag".into(),
                value: Expr::Position(PositionExpr::Literal(CubePos::new(0, 0, 0))),
            })],
            CubePos::new(0, 0, 0),
        ),
    );

    {
        let Simulation {
            world,
            tasks,
            schedulers,
        } = &mut sim;
        schedulers[0].assign(brom, only, tasks, world);
    }
    // Nothing left for a second unit to pick up
    assert_eq!(
        sim.scheduler(faction)
            .unwrap()
            .highest_priority_unassigned(&sim.tasks),
        None
    );
    assert_eq!(sim.tasks.get(only).unwrap().assigned_unit(), Some(brom));
}
