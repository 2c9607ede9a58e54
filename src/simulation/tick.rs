//! Tick system - advances unit activities and drives task execution
//!
//! Each tick runs two phases over the roster, in spawn order:
//! 1. advance every unit's current activity one step (movement, work,
//!    combat recovery, rest, following)
//! 2. give every idle unit an instruction: continue its assigned task,
//!    pick up the highest-priority unassigned task from its faction's
//!    scheduler, or fall back to a random idle activity
//!
//! Returns the events of the tick for display in a UI or log.

use crate::core::config::{
    ATTACK_DAMAGE, ATTACK_DURATION_TICKS, ATTACK_EXPERIENCE, DELIVERY_EXPERIENCE,
    REST_DURATION_TICKS, REST_HEAL, WORK_DURATION_TICKS, WORK_EXPERIENCE,
};
use crate::core::types::{CubePos, TaskId, UnitId};
use crate::core::{Result, SimError};
use crate::program::{Step, UnitCommand};
use crate::simulation::Simulation;
use crate::world::{Activity, CubeKind, World};
use rand::Rng;

/// Events generated during a simulation tick
#[derive(Debug, Clone)]
pub enum SimulationEvent {
    /// A unit picked up a task from its faction's scheduler
    TaskAssigned {
        unit_name: String,
        task_name: String,
        priority: i32,
    },
    /// A task's program reached its end marker
    TaskCompleted { task_name: String },
    /// A task was abandoned; it re-enters scheduling at lower priority
    TaskAborted {
        unit_name: String,
        task_name: String,
        new_priority: i32,
    },
    UnitDied { unit_name: String },
}

/// Run a single simulation tick
pub fn run_simulation_tick(sim: &mut Simulation) -> Vec<SimulationEvent> {
    let mut events = Vec::new();
    advance_activities(sim, &mut events);
    run_behaviors(sim, &mut events);
    sim.world.tick();
    events
}

/// Advance every living unit's activity one step
fn advance_activities(sim: &mut Simulation, events: &mut Vec<SimulationEvent>) {
    let ids: Vec<UnitId> = sim.world.roster().to_vec();
    for id in ids {
        step_activity(sim, id, events);
    }
}

fn step_activity(sim: &mut Simulation, id: UnitId, events: &mut Vec<SimulationEvent>) {
    let Some(unit) = sim.world.unit(id) else {
        return;
    };
    if !unit.alive {
        return;
    }
    match unit.activity.clone() {
        Activity::Idle => {}
        Activity::Moving { mut path } => {
            let unit = sim.world.unit_mut(id).expect("unit exists");
            match path.pop_front() {
                Some(next) => {
                    unit.position = next;
                    unit.activity = if path.is_empty() {
                        Activity::Idle
                    } else {
                        Activity::Moving { path }
                    };
                }
                None => unit.activity = Activity::Idle,
            }
        }
        Activity::Working { target, remaining } => {
            if remaining > 1 {
                sim.world.unit_mut(id).expect("unit exists").activity = Activity::Working {
                    target,
                    remaining: remaining - 1,
                };
            } else {
                complete_work(&mut sim.world, id, target);
            }
        }
        Activity::Attacking { remaining } => {
            let unit = sim.world.unit_mut(id).expect("unit exists");
            unit.activity = if remaining > 1 {
                Activity::Attacking {
                    remaining: remaining - 1,
                }
            } else {
                Activity::Idle
            };
        }
        Activity::Resting { remaining } => {
            let unit = sim.world.unit_mut(id).expect("unit exists");
            if remaining > 1 {
                unit.activity = Activity::Resting {
                    remaining: remaining - 1,
                };
            } else {
                unit.heal(REST_HEAL);
                unit.activity = Activity::Idle;
            }
        }
        Activity::Following { target } => step_following(sim, id, target, events),
    }
}

/// One step of following: done when adjacent or the target is gone;
/// unreachable targets abandon the current task.
fn step_following(
    sim: &mut Simulation,
    id: UnitId,
    target: UnitId,
    events: &mut Vec<SimulationEvent>,
) {
    let target_state = sim.world.unit(target).map(|t| (t.alive, t.position));
    let my_pos = match sim.world.unit(id) {
        Some(u) => u.position,
        None => return,
    };
    match target_state {
        None | Some((false, _)) => {
            let unit = sim.world.unit_mut(id).expect("unit exists");
            unit.activity = Activity::Idle;
            unit.followed = None;
        }
        Some((true, target_pos)) if my_pos.is_adjacent(&target_pos) || my_pos == target_pos => {
            let unit = sim.world.unit_mut(id).expect("unit exists");
            unit.activity = Activity::Idle;
            unit.followed = None;
        }
        Some((true, target_pos)) => match sim.world.terrain.find_path(my_pos, target_pos) {
            Some(path) if !path.is_empty() => {
                sim.world.unit_mut(id).expect("unit exists").position = path[0];
            }
            Some(_) => {}
            None => {
                tracing::debug!(unit = ?id, "follow target unreachable");
                let task_id = {
                    let unit = sim.world.unit_mut(id).expect("unit exists");
                    unit.activity = Activity::Idle;
                    unit.followed = None;
                    unit.task
                };
                if let Some(task_id) = task_id {
                    abort_task(sim, id, task_id, events);
                }
            }
        },
    }
}

/// Finish a work activity: pick up a carryable at the target, deliver a
/// carried load at a workshop, or just bank the experience.
fn complete_work(world: &mut World, id: UnitId, target: CubePos) {
    let carrying = world.unit(id).map(|u| u.is_carrying()).unwrap_or(false);

    if !carrying {
        if let Some(idx) = world.carryable_at(target) {
            let kind = world.carryables[idx].kind;
            world.carryables[idx].carried_by = Some(id);
            let unit = world.unit_mut(id).expect("unit exists");
            unit.carrying = Some(kind);
            unit.gain_experience(WORK_EXPERIENCE);
            unit.activity = Activity::Idle;
            return;
        }
    }

    if carrying && world.terrain.cube(target) == Some(CubeKind::Workshop) {
        if let Some(idx) = world
            .carryables
            .iter()
            .position(|c| c.carried_by == Some(id))
        {
            world.carryables.remove(idx);
        }
        let unit = world.unit_mut(id).expect("unit exists");
        unit.carrying = None;
        unit.gain_experience(WORK_EXPERIENCE + DELIVERY_EXPERIENCE);
        unit.activity = Activity::Idle;
        return;
    }

    let unit = world.unit_mut(id).expect("unit exists");
    unit.gain_experience(WORK_EXPERIENCE);
    unit.activity = Activity::Idle;
}

/// Give every ready unit an instruction
fn run_behaviors(sim: &mut Simulation, events: &mut Vec<SimulationEvent>) {
    let ids: Vec<UnitId> = sim.world.roster().to_vec();
    for id in ids {
        run_default_behavior(sim, id, events);
    }
}

/// One unit's behavior hook: continue the assigned task, pick up scheduler
/// work, or fall back to a random idle activity.
///
/// Called once per tick per unit; a unit mid-activity does nothing.
pub fn run_default_behavior(sim: &mut Simulation, id: UnitId, events: &mut Vec<SimulationEvent>) {
    let Some(unit) = sim.world.unit(id) else {
        return;
    };
    if !unit.is_ready_for_instruction() {
        return;
    }

    if let Some(task_id) = unit.task {
        let finished = sim
            .tasks
            .get(task_id)
            .map(|t| t.is_terminated())
            .unwrap_or(true);
        if finished {
            sim.world.unit_mut(id).expect("unit exists").task = None;
            return;
        }
        advance_assigned(sim, id, task_id, events);
    } else if unit.default_behavior {
        let faction = unit.faction;
        let available = sim
            .scheduler(faction)
            .and_then(|s| s.highest_priority_unassigned(&sim.tasks));
        if let Some(task_id) = available {
            {
                let Simulation {
                    world,
                    tasks,
                    schedulers,
                } = sim;
                let scheduler = schedulers
                    .iter()
                    .find(|s| s.faction() == faction)
                    .expect("scheduler exists for faction");
                scheduler.assign(id, task_id, tasks, world);
            }
            if let (Some(unit), Some(task)) = (sim.world.unit(id), sim.tasks.get(task_id)) {
                events.push(SimulationEvent::TaskAssigned {
                    unit_name: unit.name.clone(),
                    task_name: task.name().to_string(),
                    priority: task.priority(),
                });
            }
            advance_assigned(sim, id, task_id, events);
        } else {
            random_idle(sim, id, events);
        }
    }
}

/// Advance a bound task and carry out whatever it asks for
fn advance_assigned(
    sim: &mut Simulation,
    unit_id: UnitId,
    task_id: TaskId,
    events: &mut Vec<SimulationEvent>,
) {
    let step = {
        let Simulation { world, tasks, .. } = sim;
        match tasks.get_mut(task_id) {
            Some(task) => task.advance(world),
            None => {
                if let Some(unit) = world.unit_mut(unit_id) {
                    unit.task = None;
                }
                return;
            }
        }
    };

    match step {
        Step::Suspended(cmd) => {
            tracing::debug!(unit = ?unit_id, command = %cmd, "task issued a command");
            match apply_command(&mut sim.world, unit_id, &cmd) {
                Ok(Some(victim)) => handle_death(sim, victim, events),
                Ok(None) => {}
                Err(err) => {
                    tracing::debug!(error = %err, "command rejected; abandoning task");
                    abort_task(sim, unit_id, task_id, events);
                }
            }
        }
        Step::Finished => {
            let task_name = sim
                .tasks
                .get(task_id)
                .map(|t| t.name().to_string())
                .unwrap_or_default();
            events.push(SimulationEvent::TaskCompleted { task_name });
            sim.terminate_task(task_id);
        }
        Step::Stuck => abort_task(sim, unit_id, task_id, events),
    }
}

fn abort_task(
    sim: &mut Simulation,
    unit_id: UnitId,
    task_id: TaskId,
    events: &mut Vec<SimulationEvent>,
) {
    sim.stop_task(unit_id);
    let unit_name = sim
        .world
        .unit(unit_id)
        .map(|u| u.name.clone())
        .unwrap_or_default();
    let (task_name, new_priority) = sim
        .tasks
        .get(task_id)
        .map(|t| (t.name().to_string(), t.priority()))
        .unwrap_or_default();
    events.push(SimulationEvent::TaskAborted {
        unit_name,
        task_name,
        new_priority,
    });
}

fn handle_death(sim: &mut Simulation, victim: UnitId, events: &mut Vec<SimulationEvent>) {
    if let Some(unit) = sim.world.unit(victim) {
        events.push(SimulationEvent::UnitDied {
            unit_name: unit.name.clone(),
        });
    }
    // A dead unit gives its task back to the scheduler
    sim.stop_task(victim);
}

/// Carry out one unit command against the world
///
/// Rejections (unreachable destination, out-of-reach target, dead or
/// friendly victim) surface as errors for the caller to map to a task
/// abort. Returns the victim's id when an attack killed it.
pub fn apply_command(
    world: &mut World,
    unit_id: UnitId,
    cmd: &UnitCommand,
) -> Result<Option<UnitId>> {
    match cmd {
        UnitCommand::MoveTo(pos) => {
            if !world.terrain.in_bounds(*pos) {
                return Err(SimError::OutOfBounds(*pos));
            }
            let from = world
                .unit(unit_id)
                .ok_or(SimError::UnitNotFound(unit_id))?
                .position;
            let path = world
                .terrain
                .find_path(from, *pos)
                .ok_or(SimError::Unreachable(*pos))?;
            let unit = world.unit_mut(unit_id).expect("unit exists");
            unit.activity = if path.is_empty() {
                Activity::Idle
            } else {
                Activity::Moving { path: path.into() }
            };
            Ok(None)
        }
        UnitCommand::Work(pos) => {
            let unit = world.unit(unit_id).ok_or(SimError::UnitNotFound(unit_id))?;
            if unit.position != *pos && !unit.position.is_adjacent(pos) {
                return Err(SimError::InvalidCommand(format!(
                    "work target {pos} is out of reach"
                )));
            }
            world.unit_mut(unit_id).expect("unit exists").activity = Activity::Working {
                target: *pos,
                remaining: WORK_DURATION_TICKS,
            };
            Ok(None)
        }
        UnitCommand::Attack(victim_id) => {
            let attacker = world.unit(unit_id).ok_or(SimError::UnitNotFound(unit_id))?;
            let (my_pos, my_faction) = (attacker.position, attacker.faction);
            let victim = world
                .unit(*victim_id)
                .ok_or(SimError::UnitNotFound(*victim_id))?;
            if !victim.alive {
                return Err(SimError::InvalidCommand("target is already dead".into()));
            }
            if victim.faction == my_faction {
                return Err(SimError::InvalidCommand("target is a faction mate".into()));
            }
            if !my_pos.is_adjacent(&victim.position) {
                return Err(SimError::InvalidCommand("target is out of reach".into()));
            }
            let victim = world.unit_mut(*victim_id).expect("unit exists");
            victim.take_damage(ATTACK_DAMAGE);
            let died = !victim.alive;
            let attacker = world.unit_mut(unit_id).expect("unit exists");
            attacker.gain_experience(ATTACK_EXPERIENCE);
            attacker.activity = Activity::Attacking {
                remaining: ATTACK_DURATION_TICKS,
            };
            Ok(died.then_some(*victim_id))
        }
        UnitCommand::Follow(target) => {
            let unit = world.unit_mut(unit_id).ok_or(SimError::UnitNotFound(unit_id))?;
            unit.followed = *target;
            unit.activity = match target {
                Some(t) => Activity::Following { target: *t },
                None => Activity::Idle,
            };
            Ok(None)
        }
    }
}

/// No scheduler work: wander, poke at a nearby cube, swing at an adjacent
/// enemy, or rest.
fn random_idle(sim: &mut Simulation, id: UnitId, events: &mut Vec<SimulationEvent>) {
    let mut rng = rand::thread_rng();
    match rng.gen_range(0..4) {
        0 => {
            let targets = sim.world.terrain.walkable_cubes();
            if targets.is_empty() {
                return;
            }
            let target = targets[rng.gen_range(0..targets.len())];
            let from = match sim.world.unit(id) {
                Some(u) => u.position,
                None => return,
            };
            if let Some(path) = sim.world.terrain.find_path(from, target) {
                if !path.is_empty() {
                    sim.world.unit_mut(id).expect("unit exists").activity =
                        Activity::Moving { path: path.into() };
                }
            }
        }
        1 => {
            let pos = match sim.world.unit(id) {
                Some(u) => u.position,
                None => return,
            };
            let target = pos.offset(
                rng.gen_range(-1..=1),
                rng.gen_range(-1..=1),
                rng.gen_range(-1..=1),
            );
            if sim.world.terrain.in_bounds(target) {
                sim.world.unit_mut(id).expect("unit exists").activity = Activity::Working {
                    target,
                    remaining: WORK_DURATION_TICKS,
                };
            }
        }
        2 => {
            let (pos, faction) = match sim.world.unit(id) {
                Some(u) => (u.position, u.faction),
                None => return,
            };
            let victim = sim
                .world
                .living_units()
                .find(|u| u.faction != faction && u.position.is_adjacent(&pos))
                .map(|u| u.id);
            if let Some(victim_id) = victim {
                if let Ok(Some(dead)) = apply_command(&mut sim.world, id, &UnitCommand::Attack(victim_id))
                {
                    handle_death(sim, dead, events);
                }
            }
        }
        _ => {
            sim.world.unit_mut(id).expect("unit exists").activity = Activity::Resting {
                remaining: REST_DURATION_TICKS,
            };
        }
    }
}
