//! Control-flow threading: statement trees to a flat, resumable graph
//!
//! A task's program is compiled exactly once, at construction, from its
//! nested statement tree into an arena of nodes linked by successor
//! indices. The stepping interpreter then walks indices instead of
//! re-descending the tree, which is what lets a task suspend at a node
//! and resume there on a later simulation step.
//!
//! Threading rules:
//! - a synthetic `Begin` node precedes the program and an `End` node
//!   follows it; `End` terminates the task when executed
//! - sequences dissolve: children are chained directly, the last one
//!   continuing to the sequence's own successor
//! - both branches of an `If` continue to the if-node's successor; at run
//!   time the if-node's successor is chosen by its condition
//! - a `While` body continues back to the while-node; break nodes inside
//!   the body (not crossing a nested while) are rewired to the while-node's
//!   successor
//! - a break outside any loop keeps its fall-through successor and is
//!   reported to the caller

use crate::program::ast::SourceLocation;
use crate::program::expr::{BoolExpr, EvalEnv, Expr, PositionExpr, UnitExpr};
use crate::program::statement::{Stmt, StmtKind};

/// Index of a node in the program graph arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeIndex(u32);

/// One node of the threaded graph
#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    /// Statically threaded successor; `None` only for `End`
    next: Option<NodeIndex>,
    loc: SourceLocation,
}

#[derive(Debug, Clone)]
pub(crate) enum NodeKind {
    Begin,
    End,
    If {
        cond: BoolExpr,
        then_head: NodeIndex,
        else_head: Option<NodeIndex>,
    },
    While {
        cond: BoolExpr,
        body_head: NodeIndex,
    },
    Break,
    Skip,
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
}

/// Where the walk goes from a node
pub(crate) enum Successor {
    Goto(Option<NodeIndex>),
    /// A branch condition had no value
    Stuck,
}

#[derive(Debug, Clone)]
pub struct ProgramGraph {
    nodes: Vec<Node>,
    begin: NodeIndex,
}

impl ProgramGraph {
    /// Thread a program into a graph
    ///
    /// Returns the graph and the locations of break statements that were
    /// not enclosed by any loop (reported, not fatal: they fall through).
    pub fn compile(program: &[Stmt]) -> (Self, Vec<SourceLocation>) {
        let mut graph = Self {
            nodes: Vec::new(),
            begin: NodeIndex(0),
        };
        let begin = graph.alloc(NodeKind::Begin, None, SourceLocation::default());
        let end = graph.alloc(NodeKind::End, None, SourceLocation::default());

        let mut stray_breaks = Vec::new();
        let head = graph.thread_all(program, end, &mut stray_breaks);
        graph.nodes[begin.0 as usize].next = Some(head);
        graph.begin = begin;

        let locations = stray_breaks
            .iter()
            .map(|&idx| graph.nodes[idx.0 as usize].loc)
            .collect();
        (graph, locations)
    }

    pub fn begin(&self) -> NodeIndex {
        self.begin
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn kind(&self, idx: NodeIndex) -> &NodeKind {
        &self.nodes[idx.0 as usize].kind
    }

    pub(crate) fn loc(&self, idx: NodeIndex) -> SourceLocation {
        self.nodes[idx.0 as usize].loc
    }

    pub(crate) fn next(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.nodes[idx.0 as usize].next
    }

    /// Compute where the walk continues from `idx`
    ///
    /// Structural branch nodes pick their successor from their condition;
    /// everything else follows its static link.
    pub(crate) fn successor(&self, idx: NodeIndex, env: &EvalEnv) -> Successor {
        match self.kind(idx) {
            NodeKind::If {
                cond,
                then_head,
                else_head,
            } => match cond.evaluate(env) {
                Some(true) => Successor::Goto(Some(*then_head)),
                Some(false) => Successor::Goto((*else_head).or_else(|| self.next(idx))),
                None => Successor::Stuck,
            },
            NodeKind::While { cond, body_head } => match cond.evaluate(env) {
                Some(true) => Successor::Goto(Some(*body_head)),
                Some(false) => Successor::Goto(self.next(idx)),
                None => Successor::Stuck,
            },
            _ => Successor::Goto(self.next(idx)),
        }
    }

    fn alloc(&mut self, kind: NodeKind, next: Option<NodeIndex>, loc: SourceLocation) -> NodeIndex {
        let idx = NodeIndex(self.nodes.len() as u32);
        self.nodes.push(Node { kind, next, loc });
        idx
    }

    /// Thread a statement list so the last statement continues to `succ`;
    /// returns the head (or `succ` itself for an empty list).
    fn thread_all(
        &mut self,
        stmts: &[Stmt],
        succ: NodeIndex,
        breaks: &mut Vec<NodeIndex>,
    ) -> NodeIndex {
        let mut next = succ;
        for stmt in stmts.iter().rev() {
            next = self.thread_stmt(stmt, next, breaks);
        }
        next
    }

    /// Thread one statement with continuation `succ`; collects break nodes
    /// not yet captured by an enclosing loop.
    fn thread_stmt(
        &mut self,
        stmt: &Stmt,
        succ: NodeIndex,
        breaks: &mut Vec<NodeIndex>,
    ) -> NodeIndex {
        match &stmt.kind {
            StmtKind::Sequence(children) => self.thread_all(children, succ, breaks),
            StmtKind::If {
                cond,
                then_body,
                else_body,
            } => {
                let then_head = self.thread_stmt(then_body, succ, breaks);
                let else_head = else_body
                    .as_ref()
                    .map(|body| self.thread_stmt(body, succ, breaks));
                self.alloc(
                    NodeKind::If {
                        cond: cond.clone(),
                        then_head,
                        else_head,
                    },
                    Some(succ),
                    stmt.loc,
                )
            }
            StmtKind::While { cond, body } => {
                // The while node must exist before its body so the body can
                // loop back to it; the body head is patched in afterwards.
                let node = self.alloc(
                    NodeKind::While {
                        cond: cond.clone(),
                        body_head: NodeIndex(u32::MAX),
                    },
                    Some(succ),
                    stmt.loc,
                );
                let mut inner_breaks = Vec::new();
                let body_head = self.thread_stmt(body, node, &mut inner_breaks);
                if let NodeKind::While { body_head: slot, .. } =
                    &mut self.nodes[node.0 as usize].kind
                {
                    *slot = body_head;
                }
                for brk in inner_breaks {
                    self.nodes[brk.0 as usize].next = Some(succ);
                }
                node
            }
            StmtKind::Break => {
                let node = self.alloc(NodeKind::Break, Some(succ), stmt.loc);
                breaks.push(node);
                node
            }
            StmtKind::Skip => self.alloc(NodeKind::Skip, Some(succ), stmt.loc),
            StmtKind::Assign { name, value } => self.alloc(
                NodeKind::Assign {
                    name: name.clone(),
                    value: value.clone(),
                },
                Some(succ),
                stmt.loc,
            ),
            StmtKind::Print { value } => self.alloc(
                NodeKind::Print {
                    value: value.clone(),
                },
                Some(succ),
                stmt.loc,
            ),
            StmtKind::MoveTo(target) => {
                self.alloc(NodeKind::MoveTo(target.clone()), Some(succ), stmt.loc)
            }
            StmtKind::Work(target) => {
                self.alloc(NodeKind::Work(target.clone()), Some(succ), stmt.loc)
            }
            StmtKind::Attack(target) => {
                self.alloc(NodeKind::Attack(target.clone()), Some(succ), stmt.loc)
            }
            StmtKind::Follow(target) => {
                self.alloc(NodeKind::Follow(target.clone()), Some(succ), stmt.loc)
            }
        }
    }
}
