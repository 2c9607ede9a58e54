//! Untyped program trees, as delivered by an external front end
//!
//! This is the crate's construction boundary: statements and expressions
//! arrive untyped (a front end has no reason to know our category split)
//! and are checked into the typed representation by `builder`. The trees
//! are serde-deserializable so scenario files can carry programs as JSON.

use serde::{Deserialize, Serialize};

/// Position of a node in the program text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// An untyped expression node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expr {
    #[serde(flatten)]
    pub node: ExprNode,
    #[serde(default)]
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ExprNode {
    // positions
    LiteralPosition { x: i32, y: i32, z: i32 },
    Here,
    NearestTimber,
    NearestOre,
    NearestWorkshop,
    NextTo { of: Box<Expr> },
    PositionOf { of: Box<Expr> },
    Selected,
    // units
    This,
    Friend,
    Enemy,
    Any,
    // booleans
    True,
    False,
    And { lhs: Box<Expr>, rhs: Box<Expr> },
    Or { lhs: Box<Expr>, rhs: Box<Expr> },
    Not { inner: Box<Expr> },
    IsSolid { pos: Box<Expr> },
    IsPassable { pos: Box<Expr> },
    IsAlive { unit: Box<Expr> },
    IsFriend { unit: Box<Expr> },
    IsEnemy { unit: Box<Expr> },
    CarriesItem { unit: Box<Expr> },
    // either
    Variable { name: String },
}

impl ExprNode {
    /// Human-readable category for diagnostics
    pub fn category_name(&self) -> &'static str {
        use ExprNode::*;
        match self {
            LiteralPosition { .. } | Here | NearestTimber | NearestOre | NearestWorkshop
            | NextTo { .. } | PositionOf { .. } | Selected => "position",
            This | Friend | Enemy | Any => "unit",
            True | False | And { .. } | Or { .. } | Not { .. } | IsSolid { .. }
            | IsPassable { .. } | IsAlive { .. } | IsFriend { .. } | IsEnemy { .. }
            | CarriesItem { .. } => "boolean",
            Variable { .. } => "variable",
        }
    }
}

/// An untyped statement node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stmt {
    #[serde(flatten)]
    pub node: StmtNode,
    #[serde(default)]
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "stmt", rename_all = "snake_case")]
pub enum StmtNode {
    Sequence {
        statements: Vec<Stmt>,
    },
    If {
        condition: Expr,
        then_body: Box<Stmt>,
        #[serde(default)]
        else_body: Option<Box<Stmt>>,
    },
    While {
        condition: Expr,
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
    MoveTo {
        target: Expr,
    },
    Work {
        target: Expr,
    },
    Attack {
        target: Expr,
    },
    Follow {
        target: Expr,
    },
}
