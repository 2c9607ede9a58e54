//! The task programming core
//!
//! A task is a small program a unit can execute: a nested statement tree
//! compiled once into a flat, resumable control-flow graph, plus a private
//! variable environment and an execution cursor. Tasks are distributed to
//! units by per-faction schedulers under a priority discipline.

pub mod ast;
pub mod builder;
pub mod expr;
pub mod graph;
pub mod scheduler;
pub mod statement;
pub mod task;

pub use ast::SourceLocation;
pub use builder::{build_tasks, Diagnostic, DiagnosticKind};
pub use expr::{BoolExpr, EvalEnv, Expr, PositionExpr, UnitExpr};
pub use graph::{NodeIndex, ProgramGraph};
pub use scheduler::Scheduler;
pub use statement::{Stmt, StmtKind};
pub use task::{Step, Task, TaskSet, UnitCommand};
