//! Per-faction task distribution
//!
//! A scheduler registers the tasks belonging to one faction and hands the
//! highest-priority unassigned one to units asking for work. It is the
//! only component that binds tasks to executors, and its operations keep
//! the two-way binding consistent: a bound task always has an executor
//! that points back at it, and removal always clears both sides.
//!
//! Ordering is computed at query time over the insertion-ordered registry,
//! so a priority lowered by `Task::reset` is observed immediately; ties
//! resolve to the earliest-registered task.

use crate::core::types::{FactionId, TaskId, UnitId};
use crate::program::task::{Task, TaskSet};
use crate::world::World;

#[derive(Debug)]
pub struct Scheduler {
    faction: FactionId,
    queue: Vec<TaskId>,
}

impl Scheduler {
    pub fn new(faction: FactionId) -> Self {
        Self {
            faction,
            queue: Vec::new(),
        }
    }

    pub fn faction(&self) -> FactionId {
        self.faction
    }

    /// Register a task; already-registered ids are ignored
    pub fn add(&mut self, id: TaskId) {
        if !self.contains(id) {
            self.queue.push(id);
        }
    }

    /// Unregister a task, forcibly detaching it from its executor so no
    /// dangling executor-to-task reference survives.
    pub fn remove(&mut self, id: TaskId, tasks: &mut TaskSet, world: &mut World) {
        self.queue.retain(|&t| t != id);
        let Some(task) = tasks.get_mut(id) else {
            return;
        };
        if let Some(unit_id) = task.assigned_unit() {
            task.detach();
            if let Some(unit) = world.unit_mut(unit_id) {
                debug_assert_eq!(unit.task, Some(id), "stale executor back-reference");
                unit.task = None;
            }
        }
    }

    /// Swap a task definition without losing its scheduling slot
    pub fn replace(&mut self, old: TaskId, new: TaskId, tasks: &mut TaskSet, world: &mut World) {
        self.remove(old, tasks, world);
        self.add(new);
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.queue.contains(&id)
    }

    pub fn contains_all(&self, ids: &[TaskId]) -> bool {
        ids.iter().all(|&id| self.contains(id))
    }

    /// The registered, unbound, non-terminated task with the greatest
    /// priority; ties go to the earliest-registered.
    pub fn highest_priority_unassigned(&self, tasks: &TaskSet) -> Option<TaskId> {
        let mut best: Option<(i32, TaskId)> = None;
        for &id in &self.queue {
            let Some(task) = tasks.get(id) else {
                continue;
            };
            if task.is_bound() || task.is_terminated() {
                continue;
            }
            match best {
                Some((priority, _)) if priority >= task.priority() => {}
                _ => best = Some((task.priority(), id)),
            }
        }
        best.map(|(_, id)| id)
    }

    /// Bind a task and an executor to each other
    ///
    /// Both references are set together; assigning an already-bound task
    /// or an already-busy executor is a programming error.
    pub fn assign(&self, unit_id: UnitId, task_id: TaskId, tasks: &mut TaskSet, world: &mut World) {
        debug_assert!(self.contains(task_id), "assigning an unregistered task");
        let Some(task) = tasks.get_mut(task_id) else {
            tracing::error!(?task_id, "assign called with an unknown task");
            return;
        };
        task.bind_to(unit_id);
        if let Some(unit) = world.unit_mut(unit_id) {
            debug_assert!(unit.task.is_none(), "executor already has a task");
            unit.task = Some(task_id);
        }
    }

    /// Clear the executor's binding without resetting the task's program
    /// state; resetting remains the task's own operation.
    pub fn unassign(&self, unit_id: UnitId, tasks: &mut TaskSet, world: &mut World) {
        let Some(unit) = world.unit_mut(unit_id) else {
            return;
        };
        if let Some(task_id) = unit.task.take() {
            if let Some(task) = tasks.get_mut(task_id) {
                task.detach();
            }
        }
    }

    /// Registered tasks satisfying an arbitrary predicate
    pub fn query(&self, tasks: &TaskSet, predicate: impl Fn(&Task) -> bool) -> Vec<TaskId> {
        self.queue
            .iter()
            .copied()
            .filter(|&id| tasks.get(id).map(&predicate).unwrap_or(false))
            .collect()
    }

    pub fn task_ids(&self) -> &[TaskId] {
        &self.queue
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
