//! Type-checking builder from untyped front-end trees to typed programs
//!
//! Each composite statement and expression constrains the category of its
//! operands (a work statement needs a position, a follow statement needs a
//! unit). A mismatch is a construction diagnostic, not a failure: the
//! offending statement is neutralized to `Skip`, the diagnostic records
//! the source location, and the rest of the program is built normally.
//! Variables are the one dynamically-categorized case; their reads are
//! checked at evaluation time.

use crate::core::types::CubePos;
use crate::program::ast::{self, SourceLocation};
use crate::program::expr::{BoolExpr, Expr, PositionExpr, UnitExpr};
use crate::program::statement::{Stmt, StmtKind};
use crate::program::task::Task;
use thiserror::Error;

/// A construction anomaly, reported and survived
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub loc: SourceLocation,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    #[error("expected a {expected} expression, found a {found} expression")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("break statement outside of any loop")]
    BreakOutsideLoop,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.kind, self.loc)
    }
}

/// Build one independent task per selected cube from an untyped tree
///
/// All tasks share the same program shape but own distinct compiled
/// graphs, cursors and variable environments. Diagnostics cover type
/// mismatches and breaks outside any loop; construction never fails.
pub fn build_tasks(
    name: &str,
    priority: i32,
    activity: &ast::Stmt,
    selected_cubes: &[CubePos],
) -> (Vec<Task>, Vec<Diagnostic>) {
    let mut diagnostics = Vec::new();
    let stmt = lower_stmt(activity, &mut diagnostics);
    collect_stray_breaks(&stmt, false, &mut diagnostics);

    let tasks = selected_cubes
        .iter()
        .map(|&cube| Task::new(priority, name, vec![stmt.clone()], cube))
        .collect();
    (tasks, diagnostics)
}

/// Lower one untyped statement; malformed statements become `Skip`
pub fn lower_stmt(stmt: &ast::Stmt, diagnostics: &mut Vec<Diagnostic>) -> Stmt {
    use ast::StmtNode;
    let kind = match &stmt.node {
        StmtNode::Sequence { statements } => StmtKind::Sequence(
            statements
                .iter()
                .map(|child| lower_stmt(child, diagnostics))
                .collect(),
        ),
        StmtNode::If {
            condition,
            then_body,
            else_body,
        } => match lower_bool(condition, diagnostics) {
            Some(cond) => StmtKind::If {
                cond,
                then_body: Box::new(lower_stmt(then_body, diagnostics)),
                else_body: else_body
                    .as_ref()
                    .map(|body| Box::new(lower_stmt(body, diagnostics))),
            },
            None => StmtKind::Skip,
        },
        StmtNode::While { condition, body } => match lower_bool(condition, diagnostics) {
            Some(cond) => StmtKind::While {
                cond,
                body: Box::new(lower_stmt(body, diagnostics)),
            },
            None => StmtKind::Skip,
        },
        StmtNode::Break => StmtKind::Break,
        StmtNode::Assign { name, value } => match lower_expr(value, diagnostics) {
            Some(value) => StmtKind::Assign {
                name: name.clone(),
                value,
            },
            None => StmtKind::Skip,
        },
        StmtNode::Print { value } => match lower_expr(value, diagnostics) {
            Some(value) => StmtKind::Print { value },
            None => StmtKind::Skip,
        },
        StmtNode::MoveTo { target } => match lower_position(target, diagnostics) {
            Some(target) => StmtKind::MoveTo(target),
            None => StmtKind::Skip,
        },
        StmtNode::Work { target } => match lower_position(target, diagnostics) {
            Some(target) => StmtKind::Work(target),
            None => StmtKind::Skip,
        },
        StmtNode::Attack { target } => match lower_unit(target, diagnostics) {
            Some(target) => StmtKind::Attack(target),
            None => StmtKind::Skip,
        },
        StmtNode::Follow { target } => match lower_unit(target, diagnostics) {
            Some(target) => StmtKind::Follow(target),
            None => StmtKind::Skip,
        },
    };
    Stmt::new(kind, stmt.loc)
}

fn mismatch(expected: &'static str, expr: &ast::Expr, diagnostics: &mut Vec<Diagnostic>) {
    diagnostics.push(Diagnostic {
        kind: DiagnosticKind::TypeMismatch {
            expected,
            found: expr.node.category_name(),
        },
        loc: expr.loc,
    });
}

fn lower_position(expr: &ast::Expr, diagnostics: &mut Vec<Diagnostic>) -> Option<PositionExpr> {
    use ast::ExprNode;
    match &expr.node {
        ExprNode::LiteralPosition { x, y, z } => {
            Some(PositionExpr::Literal(CubePos::new(*x, *y, *z)))
        }
        ExprNode::Here => Some(PositionExpr::Here),
        ExprNode::NearestTimber => Some(PositionExpr::NearestTimber),
        ExprNode::NearestOre => Some(PositionExpr::NearestOre),
        ExprNode::NearestWorkshop => Some(PositionExpr::NearestWorkshop),
        ExprNode::NextTo { of } => Some(PositionExpr::NextTo(Box::new(lower_position(
            of,
            diagnostics,
        )?))),
        ExprNode::PositionOf { of } => Some(PositionExpr::PositionOf(Box::new(lower_unit(
            of,
            diagnostics,
        )?))),
        ExprNode::Selected => Some(PositionExpr::Selected),
        ExprNode::Variable { name } => Some(PositionExpr::Var(name.clone())),
        _ => {
            mismatch("position", expr, diagnostics);
            None
        }
    }
}

fn lower_unit(expr: &ast::Expr, diagnostics: &mut Vec<Diagnostic>) -> Option<UnitExpr> {
    use ast::ExprNode;
    match &expr.node {
        ExprNode::This => Some(UnitExpr::This),
        ExprNode::Friend => Some(UnitExpr::Friend),
        ExprNode::Enemy => Some(UnitExpr::Enemy),
        ExprNode::Any => Some(UnitExpr::Any),
        ExprNode::Variable { name } => Some(UnitExpr::Var(name.clone())),
        _ => {
            mismatch("unit", expr, diagnostics);
            None
        }
    }
}

fn lower_bool(expr: &ast::Expr, diagnostics: &mut Vec<Diagnostic>) -> Option<BoolExpr> {
    use ast::ExprNode;
    match &expr.node {
        ExprNode::True => Some(BoolExpr::True),
        ExprNode::False => Some(BoolExpr::False),
        ExprNode::And { lhs, rhs } => Some(BoolExpr::And(
            Box::new(lower_bool(lhs, diagnostics)?),
            Box::new(lower_bool(rhs, diagnostics)?),
        )),
        ExprNode::Or { lhs, rhs } => Some(BoolExpr::Or(
            Box::new(lower_bool(lhs, diagnostics)?),
            Box::new(lower_bool(rhs, diagnostics)?),
        )),
        ExprNode::Not { inner } => Some(BoolExpr::Not(Box::new(lower_bool(inner, diagnostics)?))),
        ExprNode::IsSolid { pos } => {
            Some(BoolExpr::IsSolid(Box::new(lower_position(pos, diagnostics)?)))
        }
        ExprNode::IsPassable { pos } => Some(BoolExpr::IsPassable(Box::new(lower_position(
            pos,
            diagnostics,
        )?))),
        ExprNode::IsAlive { unit } => {
            Some(BoolExpr::IsAlive(Box::new(lower_unit(unit, diagnostics)?)))
        }
        ExprNode::IsFriend { unit } => {
            Some(BoolExpr::IsFriend(Box::new(lower_unit(unit, diagnostics)?)))
        }
        ExprNode::IsEnemy { unit } => {
            Some(BoolExpr::IsEnemy(Box::new(lower_unit(unit, diagnostics)?)))
        }
        ExprNode::CarriesItem { unit } => Some(BoolExpr::CarriesItem(Box::new(lower_unit(
            unit,
            diagnostics,
        )?))),
        ExprNode::Variable { name } => Some(BoolExpr::Var(name.clone())),
        _ => {
            mismatch("boolean", expr, diagnostics);
            None
        }
    }
}

/// Lower an expression whose category is unconstrained (assign, print)
fn lower_expr(expr: &ast::Expr, diagnostics: &mut Vec<Diagnostic>) -> Option<Expr> {
    use ast::ExprNode;
    match &expr.node {
        ExprNode::Variable { name } => Some(Expr::Var(name.clone())),
        node if node.category_name() == "position" => {
            lower_position(expr, diagnostics).map(Expr::Position)
        }
        node if node.category_name() == "unit" => lower_unit(expr, diagnostics).map(Expr::Unit),
        _ => lower_bool(expr, diagnostics).map(Expr::Bool),
    }
}

/// Report breaks not enclosed by any while loop
fn collect_stray_breaks(stmt: &Stmt, in_loop: bool, diagnostics: &mut Vec<Diagnostic>) {
    match &stmt.kind {
        StmtKind::Sequence(children) => {
            for child in children {
                collect_stray_breaks(child, in_loop, diagnostics);
            }
        }
        StmtKind::If {
            then_body,
            else_body,
            ..
        } => {
            collect_stray_breaks(then_body, in_loop, diagnostics);
            if let Some(body) = else_body {
                collect_stray_breaks(body, in_loop, diagnostics);
            }
        }
        StmtKind::While { body, .. } => collect_stray_breaks(body, true, diagnostics),
        StmtKind::Break => {
            if !in_loop {
                diagnostics.push(Diagnostic {
                    kind: DiagnosticKind::BreakOutsideLoop,
                    loc: stmt.loc,
                });
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::ast::{Expr as AstExpr, ExprNode, Stmt as AstStmt, StmtNode};

    fn at(node: ExprNode, line: u32) -> AstExpr {
        AstExpr {
            node,
            loc: SourceLocation::new(line, 1),
        }
    }

    fn stmt_at(node: StmtNode, line: u32) -> AstStmt {
        AstStmt {
            node,
            loc: SourceLocation::new(line, 1),
        }
    }

    #[test]
    fn test_well_typed_program_has_no_diagnostics() {
        let tree = stmt_at(
            StmtNode::Sequence {
                statements: vec![
                    stmt_at(
                        StmtNode::Assign {
                            name: "x".into(),
                            value: at(ExprNode::LiteralPosition { x: 0, y: 0, z: 0 }, 1),
                        },
                        1,
                    ),
                    stmt_at(
                        StmtNode::MoveTo {
                            target: at(ExprNode::Variable { name: "x".into() }, 2),
                        },
                        2,
                    ),
                ],
            },
            1,
        );
        let (tasks, diagnostics) =
            build_tasks("walk", 5, &tree, &[CubePos::new(0, 0, 0), CubePos::new(1, 1, 1)]);
        assert!(diagnostics.is_empty());
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].selected(), CubePos::new(0, 0, 0));
        assert_eq!(tasks[1].selected(), CubePos::new(1, 1, 1));
        assert_ne!(tasks[0].id, tasks[1].id);
    }

    #[test]
    fn test_type_mismatch_neutralizes_statement() {
        // move_to(true) - a boolean where a position is required
        let tree = stmt_at(
            StmtNode::Sequence {
                statements: vec![
                    stmt_at(
                        StmtNode::MoveTo {
                            target: at(ExprNode::True, 3),
                        },
                        3,
                    ),
                    stmt_at(
                        StmtNode::Print {
                            value: at(ExprNode::LiteralPosition { x: 1, y: 2, z: 3 }, 4),
                        },
                        4,
                    ),
                ],
            },
            1,
        );
        let (tasks, diagnostics) = build_tasks("bad", 0, &tree, &[CubePos::new(0, 0, 0)]);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].kind,
            DiagnosticKind::TypeMismatch {
                expected: "position",
                found: "boolean"
            }
        );
        assert_eq!(diagnostics[0].loc, SourceLocation::new(3, 1));
        // The rest of the program was still built
        assert_eq!(tasks.len(), 1);
    }

    #[test]
    fn test_nested_operand_mismatch_is_located() {
        // while (is_solid(this)) { break } - unit operand to a position query
        let tree = stmt_at(
            StmtNode::While {
                condition: at(
                    ExprNode::IsSolid {
                        pos: Box::new(at(ExprNode::This, 7)),
                    },
                    7,
                ),
                body: Box::new(stmt_at(StmtNode::Break, 8)),
            },
            7,
        );
        let (_, diagnostics) = build_tasks("bad", 0, &tree, &[CubePos::new(0, 0, 0)]);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].kind,
            DiagnosticKind::TypeMismatch {
                expected: "position",
                found: "unit"
            }
        );
        // The malformed while collapsed to Skip, so its break no longer
        // counts as a loop member - but neither is it reported, since the
        // whole statement was dropped.
        assert!(!diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::BreakOutsideLoop));
    }

    #[test]
    fn test_stray_break_reported() {
        let tree = stmt_at(
            StmtNode::Sequence {
                statements: vec![stmt_at(StmtNode::Break, 2)],
            },
            1,
        );
        let (_, diagnostics) = build_tasks("loose", 0, &tree, &[CubePos::new(0, 0, 0)]);
        assert_eq!(
            diagnostics,
            vec![Diagnostic {
                kind: DiagnosticKind::BreakOutsideLoop,
                loc: SourceLocation::new(2, 1),
            }]
        );
    }

    #[test]
    fn test_break_inside_loop_not_reported() {
        let tree = stmt_at(
            StmtNode::While {
                condition: at(ExprNode::True, 1),
                body: Box::new(stmt_at(StmtNode::Break, 2)),
            },
            1,
        );
        let (_, diagnostics) = build_tasks("looped", 0, &tree, &[CubePos::new(0, 0, 0)]);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_bare_variable_lowers_everywhere() {
        // Variables are category-checked at evaluation, not construction
        let tree = stmt_at(
            StmtNode::Attack {
                target: at(ExprNode::Variable { name: "v".into() }, 1),
            },
            1,
        );
        let (_, diagnostics) = build_tasks("var", 0, &tree, &[CubePos::new(0, 0, 0)]);
        assert!(diagnostics.is_empty());
    }
}
