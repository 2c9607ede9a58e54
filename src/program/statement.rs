//! Typed statement trees, the input to control-flow threading
//!
//! Produced either by `builder` (from an untyped front-end tree) or built
//! directly in code. `Skip` is the neutralized remnant of a statement the
//! builder rejected: it threads like any other node and does nothing, so a
//! program with a bad statement still runs the rest.

use crate::program::ast::SourceLocation;
use crate::program::expr::{BoolExpr, Expr, PositionExpr, UnitExpr};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    pub kind: StmtKind,
    pub loc: SourceLocation,
}

impl Stmt {
    pub fn new(kind: StmtKind, loc: SourceLocation) -> Self {
        Self { kind, loc }
    }

    /// Convenience constructor for trees built in code (tests, demos)
    pub fn bare(kind: StmtKind) -> Self {
        Self {
            kind,
            loc: SourceLocation::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StmtKind {
    Sequence(Vec<Stmt>),
    If {
        cond: BoolExpr,
        then_body: Box<Stmt>,
        else_body: Option<Box<Stmt>>,
    },
    While {
        cond: BoolExpr,
        body: Box<Stmt>,
    },
    Break,
    Assign {
        name: String,
        value: Expr,
    },
    Print {
        value: Expr,
    },
    MoveTo(PositionExpr),
    Work(PositionExpr),
    Attack(UnitExpr),
    Follow(UnitExpr),
    /// Neutralized malformed statement; executes as a no-op
    Skip,
}
