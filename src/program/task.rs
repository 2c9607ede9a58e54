//! Tasks: compiled programs with a resumable execution cursor
//!
//! A task owns one compiled program graph, a private write-once variable
//! environment, a mutable priority and at most one bound executor. The
//! `advance` walk runs non-suspending nodes to completion and stops at the
//! first command with real-world duration, returning that command to the
//! caller; the cursor stays parked on the node so a later `advance` resumes
//! exactly past it.

use crate::core::config::{PRIORITY_FLOOR_WARN, RESET_PRIORITY_PENALTY};
use crate::core::types::{CubePos, TaskId, UnitId};
use crate::program::ast::SourceLocation;
use crate::program::expr::{EvalEnv, Expr};
use crate::program::graph::{NodeIndex, NodeKind, ProgramGraph, Successor};
use crate::program::statement::Stmt;
use crate::world::World;

/// An instruction handed to the executing unit at a suspend point
#[derive(Debug, Clone, PartialEq)]
pub enum UnitCommand {
    MoveTo(CubePos),
    Work(CubePos),
    Attack(UnitId),
    /// `None` clears the followed unit rather than aborting the task
    Follow(Option<UnitId>),
}

impl std::fmt::Display for UnitCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnitCommand::MoveTo(pos) => write!(f, "move to {pos}"),
            UnitCommand::Work(pos) => write!(f, "work at {pos}"),
            UnitCommand::Attack(_) => write!(f, "attack"),
            UnitCommand::Follow(Some(_)) => write!(f, "follow"),
            UnitCommand::Follow(None) => write!(f, "stop following"),
        }
    }
}

/// Result of one `advance` call
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Reached a suspend point; the caller applies the command and calls
    /// `advance` again once the executor is ready for a new instruction
    Suspended(UnitCommand),
    /// The end marker was reached; the task is terminated
    Finished,
    /// A required expression had no value; the caller resets the task
    Stuck,
}

#[derive(Debug)]
pub struct Task {
    pub id: TaskId,
    name: String,
    priority: i32,
    selected: CubePos,
    variables: ahash::AHashMap<String, Expr>,
    graph: ProgramGraph,
    cursor: NodeIndex,
    terminated: bool,
    assigned: Option<UnitId>,
}

impl Task {
    /// Compile the statement list and position the cursor at the begin node
    ///
    /// Break statements outside any loop are reported with their source
    /// location; they do not block construction.
    pub fn new(priority: i32, name: impl Into<String>, program: Vec<Stmt>, selected: CubePos) -> Self {
        let name = name.into();
        let (graph, stray_breaks) = ProgramGraph::compile(&program);
        for loc in stray_breaks {
            tracing::warn!(task = %name, %loc, "break statement outside of any loop");
        }
        let cursor = graph.begin();
        Self {
            id: TaskId::new(),
            name,
            priority,
            selected,
            variables: ahash::AHashMap::new(),
            graph,
            cursor,
            terminated: false,
            assigned: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn set_priority(&mut self, priority: i32) {
        self.priority = priority;
    }

    pub fn selected(&self) -> CubePos {
        self.selected
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn is_bound(&self) -> bool {
        self.assigned.is_some()
    }

    pub fn assigned_unit(&self) -> Option<UnitId> {
        self.assigned
    }

    /// True while the cursor sits at the synthetic begin node
    pub fn at_begin(&self) -> bool {
        self.cursor == self.graph.begin()
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// Bind a variable; a name already bound stays bound to its first value
    pub fn bind_variable(&mut self, name: impl Into<String>, value: Expr) {
        self.bind_variable_at(name.into(), value, None);
    }

    fn bind_variable_at(&mut self, name: String, value: Expr, loc: Option<SourceLocation>) {
        if self.variables.contains_key(&name) {
            match loc {
                Some(loc) => tracing::warn!(
                    task = %self.name, variable = %name, %loc,
                    "variable reassignment ignored"
                ),
                None => tracing::warn!(
                    task = %self.name, variable = %name,
                    "variable reassignment ignored"
                ),
            }
            return;
        }
        self.variables.insert(name, value);
    }

    pub fn lookup_variable(&self, name: &str) -> Option<&Expr> {
        self.variables.get(name)
    }

    /// Bind to an executor; scheduler use only
    pub(crate) fn bind_to(&mut self, unit: UnitId) {
        debug_assert!(self.assigned.is_none(), "task already bound to an executor");
        self.assigned = Some(unit);
    }

    /// Drop the executor binding without touching program state
    pub(crate) fn detach(&mut self) {
        self.assigned = None;
    }

    /// Flag the task finished; termination is absorbing
    pub(crate) fn mark_terminated(&mut self) {
        self.terminated = true;
    }

    /// Abandon the current run: cursor back to begin, variables cleared,
    /// priority penalized, executor detached. The task re-enters scheduling
    /// at lower priority instead of retrying endlessly.
    pub fn reset(&mut self) {
        self.cursor = self.graph.begin();
        self.variables.clear();
        self.priority -= RESET_PRIORITY_PENALTY;
        if self.priority < PRIORITY_FLOOR_WARN {
            tracing::warn!(
                task = %self.name,
                priority = self.priority,
                "task priority has decayed far below zero"
            );
        }
        self.assigned = None;
    }

    /// Walk successor links from the cursor until a suspend point, the end
    /// marker, or an unresolvable expression.
    ///
    /// Structural nodes execute nothing; assignment and print execute and
    /// the walk continues in the same call; a suspend-point action
    /// evaluates its operand and returns the resulting command with the
    /// cursor left on the node.
    pub fn advance(&mut self, world: &World) -> Step {
        let Some(unit) = self.assigned else {
            tracing::warn!(task = %self.name, "advance called with no bound executor");
            return Step::Stuck;
        };
        if self.terminated {
            return Step::Finished;
        }

        enum Act {
            Continue,
            Bind(String, Expr, SourceLocation),
            Emit(Step),
        }

        loop {
            let successor = {
                let env = self.eval_env(world, unit);
                self.graph.successor(self.cursor, &env)
            };
            let next = match successor {
                Successor::Stuck => return Step::Stuck,
                Successor::Goto(None) => {
                    // Walked past the end marker
                    self.terminated = true;
                    return Step::Finished;
                }
                Successor::Goto(Some(next)) => next,
            };
            self.cursor = next;

            let act = {
                let env = self.eval_env(world, unit);
                match self.graph.kind(next) {
                    NodeKind::Begin
                    | NodeKind::Break
                    | NodeKind::Skip
                    | NodeKind::If { .. }
                    | NodeKind::While { .. } => Act::Continue,
                    NodeKind::End => Act::Emit(Step::Finished),
                    NodeKind::Assign { name, value } => {
                        Act::Bind(name.clone(), value.clone(), self.graph.loc(next))
                    }
                    NodeKind::Print { value } => {
                        tracing::info!(
                            target: "task.print",
                            task = %self.name,
                            "{}",
                            value.describe(&env)
                        );
                        Act::Continue
                    }
                    NodeKind::MoveTo(target) => match target.evaluate(&env) {
                        Some(pos) => Act::Emit(Step::Suspended(UnitCommand::MoveTo(pos))),
                        None => Act::Emit(Step::Stuck),
                    },
                    NodeKind::Work(target) => match target.evaluate(&env) {
                        Some(pos) => Act::Emit(Step::Suspended(UnitCommand::Work(pos))),
                        None => Act::Emit(Step::Stuck),
                    },
                    NodeKind::Attack(target) => match target.evaluate(&env) {
                        Some(victim) => Act::Emit(Step::Suspended(UnitCommand::Attack(victim))),
                        None => Act::Emit(Step::Stuck),
                    },
                    NodeKind::Follow(target) => {
                        Act::Emit(Step::Suspended(UnitCommand::Follow(target.evaluate(&env))))
                    }
                }
            };

            match act {
                Act::Continue => continue,
                Act::Bind(name, value, loc) => {
                    self.bind_variable_at(name, value, Some(loc));
                }
                Act::Emit(step) => {
                    if step == Step::Finished {
                        self.terminated = true;
                    }
                    return step;
                }
            }
        }
    }

    fn eval_env<'a>(&'a self, world: &'a World, unit: UnitId) -> EvalEnv<'a> {
        EvalEnv {
            world,
            unit,
            selected: self.selected,
            variables: &self.variables,
        }
    }
}

/// Central storage for tasks; schedulers hold ids into this arena
#[derive(Debug, Default)]
pub struct TaskSet {
    tasks: ahash::AHashMap<TaskId, Task>,
}

impl TaskSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, task: Task) -> TaskId {
        let id = task.id;
        self.tasks.insert(id, task);
        id
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    pub fn get_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.get_mut(&id)
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.tasks.contains_key(&id)
    }

    pub fn remove(&mut self, id: TaskId) -> Option<Task> {
        self.tasks.remove(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
