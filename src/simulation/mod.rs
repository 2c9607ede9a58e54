//! Simulation state and task lifecycle orchestration

pub mod tick;

pub use tick::{run_default_behavior, run_simulation_tick, SimulationEvent};

use crate::core::types::{FactionId, TaskId, UnitId};
use crate::program::{Scheduler, Task, TaskSet};
use crate::world::World;

/// The world plus the task machinery layered on top of it
///
/// Tasks live in a central arena; each faction's scheduler holds ids into
/// it. Operations that span the two sides of the executor/task binding
/// (termination, executor-initiated cancellation) live here, since no
/// single component owns both.
#[derive(Debug)]
pub struct Simulation {
    pub world: World,
    pub tasks: TaskSet,
    pub schedulers: Vec<Scheduler>,
}

impl Simulation {
    pub fn new(world: World) -> Self {
        let schedulers = world
            .factions
            .iter()
            .map(|f| Scheduler::new(f.id))
            .collect();
        Self {
            world,
            tasks: TaskSet::new(),
            schedulers,
        }
    }

    /// Add a faction together with its scheduler
    pub fn add_faction(&mut self, name: impl Into<String>) -> FactionId {
        let id = self.world.add_faction(name);
        self.schedulers.push(Scheduler::new(id));
        id
    }

    pub fn scheduler(&self, faction: FactionId) -> Option<&Scheduler> {
        self.schedulers.iter().find(|s| s.faction() == faction)
    }

    pub fn scheduler_mut(&mut self, faction: FactionId) -> Option<&mut Scheduler> {
        self.schedulers.iter_mut().find(|s| s.faction() == faction)
    }

    /// Store a task and register it with the faction's scheduler
    pub fn submit_task(&mut self, faction: FactionId, task: Task) -> TaskId {
        let id = self.tasks.insert(task);
        if let Some(scheduler) = self.scheduler_mut(faction) {
            scheduler.add(id);
        } else {
            tracing::warn!(?faction, "no scheduler for faction; task stored unregistered");
        }
        id
    }

    /// Mark a task finished and remove it from every scheduler listing it
    ///
    /// Removal detaches any executor, so no unit is left pointing at a
    /// finished task.
    pub fn terminate_task(&mut self, id: TaskId) {
        if let Some(task) = self.tasks.get_mut(id) {
            task.mark_terminated();
        }
        let Simulation {
            world,
            tasks,
            schedulers,
        } = self;
        for scheduler in schedulers.iter_mut() {
            if scheduler.contains(id) {
                scheduler.remove(id, tasks, world);
            }
        }
        // A task never registered anywhere may still hold its executor
        if let Some(task) = tasks.get_mut(id) {
            if let Some(unit_id) = task.assigned_unit() {
                task.detach();
                if let Some(unit) = world.unit_mut(unit_id) {
                    unit.task = None;
                }
            }
        }
        tracing::debug!(?id, "task terminated");
    }

    /// Executor-initiated cancellation: the unit gives its task back
    ///
    /// The task is reset (cursor to begin, variables cleared, priority
    /// penalized, executor detached) and re-enters scheduling.
    pub fn stop_task(&mut self, unit_id: UnitId) {
        let Some(unit) = self.world.unit_mut(unit_id) else {
            return;
        };
        let Some(task_id) = unit.task.take() else {
            return;
        };
        if let Some(task) = self.tasks.get_mut(task_id) {
            task.reset();
            tracing::debug!(task = %task.name(), priority = task.priority(), "task reset");
        }
    }
}
