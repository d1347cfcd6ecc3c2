//! Free-variable analysis feeding closure lowering (spec §4.G, §3 "lambda:
//! captured-variable list with types").
//!
//! A closure captures, by value, every identifier its body reads that isn't
//! one of its own parameters and isn't bound somewhere inside its own body
//! (a `let`, a `for` binding, a nested closure's params, a match binding).
//! This walks the already type-checked AST, so every `Identifier` carries
//! the resolved type its capture slot needs.

use crate::ast::{Expr, ExprKind, InterpPart, MatchArm, Param, Pattern, Stmt, StmtKind};
use crate::types::Type;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq)]
pub struct Capture {
    pub name: String,
    pub ty: Type,
}

/// Captured variables of a closure body, in first-reference order.
pub fn free_variables(params: &[Param], body: &Expr) -> Vec<Capture> {
    let bound: HashSet<String> = params.iter().map(|p| p.name.clone()).collect();
    let mut found = Vec::new();
    let mut seen = HashSet::new();
    collect_expr(body, &bound, &mut found, &mut seen);
    found
}

fn record(name: &str, ty: Option<&Type>, bound: &HashSet<String>, found: &mut Vec<Capture>, seen: &mut HashSet<String>) {
    if bound.contains(name) || seen.contains(name) {
        return;
    }
    seen.insert(name.to_string());
    found.push(Capture {
        name: name.to_string(),
        ty: ty.cloned().unwrap_or(Type::Any),
    });
}

fn collect_expr(expr: &Expr, bound: &HashSet<String>, found: &mut Vec<Capture>, seen: &mut HashSet<String>) {
    match &expr.kind {
        ExprKind::Literal(_) | ExprKind::SizeOf(_) => {}
        ExprKind::Interpolated(parts) => {
            for part in parts {
                if let InterpPart::Hole { expr: hole, .. } = part {
                    collect_expr(hole, bound, found, seen);
                }
            }
        }
        ExprKind::Identifier(name) => record(name, expr.meta.resolved_type.as_ref(), bound, found, seen),
        ExprKind::Binary { lhs, rhs, .. } => {
            collect_expr(lhs, bound, found, seen);
            collect_expr(rhs, bound, found, seen);
        }
        ExprKind::Unary { operand, .. } | ExprKind::TypeOf(operand) => collect_expr(operand, bound, found, seen),
        ExprKind::Assign { target, value } | ExprKind::CompoundAssign { target, value, .. } => {
            collect_expr(target, bound, found, seen);
            collect_expr(value, bound, found, seen);
        }
        ExprKind::Call { callee, args } => {
            collect_expr(callee, bound, found, seen);
            for a in args {
                collect_expr(a, bound, found, seen);
            }
        }
        ExprKind::MethodCall { receiver, args, .. } => {
            collect_expr(receiver, bound, found, seen);
            for a in args {
                collect_expr(a, bound, found, seen);
            }
        }
        ExprKind::FieldAccess { receiver, .. } => collect_expr(receiver, bound, found, seen),
        ExprKind::Index { receiver, index } => {
            collect_expr(receiver, bound, found, seen);
            collect_expr(index, bound, found, seen);
        }
        ExprKind::ArrayLiteral(items) => {
            for item in items {
                collect_expr(item, bound, found, seen);
            }
        }
        ExprKind::StructLiteral { fields, .. } => {
            for (_, v) in fields {
                collect_expr(v, bound, found, seen);
            }
        }
        ExprKind::Cast { expr: inner, .. } | ExprKind::TypeTest { expr: inner, .. } => {
            collect_expr(inner, bound, found, seen)
        }
        ExprKind::If { cond, then_branch, else_branch } => {
            collect_expr(cond, bound, found, seen);
            collect_expr(then_branch, bound, found, seen);
            if let Some(e) = else_branch {
                collect_expr(e, bound, found, seen);
            }
        }
        ExprKind::Match { scrutinee, arms } => {
            collect_expr(scrutinee, bound, found, seen);
            for arm in arms {
                collect_match_arm(arm, bound, found, seen);
            }
        }
        ExprKind::Block(stmts) => {
            let mut inner = bound.clone();
            for s in stmts {
                collect_stmt(s, &mut inner, found, seen);
            }
        }
        ExprKind::Closure { params, body } => {
            let mut inner = bound.clone();
            inner.extend(params.iter().map(|p| p.name.clone()));
            collect_expr(body, &inner, found, seen);
        }
        ExprKind::Lock { guard, body } => {
            collect_expr(guard, bound, found, seen);
            collect_expr(body, bound, found, seen);
        }
        ExprKind::Sync(items) => {
            for item in items {
                collect_expr(item, bound, found, seen);
            }
        }
    }
}

fn collect_match_arm(arm: &MatchArm, bound: &HashSet<String>, found: &mut Vec<Capture>, seen: &mut HashSet<String>) {
    let mut inner = bound.clone();
    bind_pattern(&arm.pattern, &mut inner);
    if let Some(g) = &arm.guard {
        collect_expr(g, &inner, found, seen);
    }
    collect_expr(&arm.body, &inner, found, seen);
}

fn bind_pattern(pattern: &Pattern, bound: &mut HashSet<String>) {
    match pattern {
        Pattern::Binding(name) => {
            bound.insert(name.clone());
        }
        Pattern::TypeTest { binding: Some(name), .. } => {
            bound.insert(name.clone());
        }
        Pattern::Wildcard | Pattern::Literal(_) | Pattern::TypeTest { binding: None, .. } => {}
    }
}

fn collect_stmt(stmt: &Stmt, bound: &mut HashSet<String>, found: &mut Vec<Capture>, seen: &mut HashSet<String>) {
    match &stmt.kind {
        StmtKind::Expr(e) => collect_expr(e, bound, found, seen),
        StmtKind::Let { name, value, .. } => {
            collect_expr(value, bound, found, seen);
            bound.insert(name.clone());
        }
        StmtKind::Return(Some(e)) => collect_expr(e, bound, found, seen),
        StmtKind::Return(None) | StmtKind::Break | StmtKind::Continue => {}
        StmtKind::While { cond, body } => {
            collect_expr(cond, bound, found, seen);
            let mut inner = bound.clone();
            for s in body {
                collect_stmt(s, &mut inner, found, seen);
            }
        }
        StmtKind::For { binding, iterable, body } => {
            collect_expr(iterable, bound, found, seen);
            let mut inner = bound.clone();
            inner.insert(binding.clone());
            for s in body {
                collect_stmt(s, &mut inner, found, seen);
            }
        }
        StmtKind::If { cond, then_branch, else_branch } => {
            collect_expr(cond, bound, found, seen);
            let mut then_scope = bound.clone();
            for s in then_branch {
                collect_stmt(s, &mut then_scope, found, seen);
            }
            if let Some(else_body) = else_branch {
                let mut else_scope = bound.clone();
                for s in else_body {
                    collect_stmt(s, &mut else_scope, found, seen);
                }
            }
        }
        StmtKind::Private { body } => {
            let mut inner = bound.clone();
            for s in body {
                collect_stmt(s, &mut inner, found, seen);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinOp, ExprMeta, Literal, LiteralKind, MemoryQualifier, SourceLocation};
    use std::path::PathBuf;
    use std::rc::Rc;

    fn loc() -> SourceLocation {
        SourceLocation::new(Rc::new(PathBuf::from("t.holt")), 1)
    }

    fn ident(name: &str, ty: Type) -> Expr {
        Expr {
            kind: ExprKind::Identifier(name.to_string()),
            meta: ExprMeta { loc: loc(), resolved_type: Some(ty), escapes: false },
        }
    }

    #[test]
    fn a_closure_with_no_free_identifiers_captures_nothing() {
        let params = vec![Param { name: "x".into(), ty: Type::Int, qualifier: MemoryQualifier::Val }];
        let body = Expr::new(ExprKind::Identifier("x".into()), loc());
        assert!(free_variables(&params, &body).is_empty());
    }

    #[test]
    fn an_outer_local_referenced_in_the_body_is_captured() {
        let params = vec![];
        let body = Expr::new(
            ExprKind::Binary { op: BinOp::Add, lhs: Box::new(ident("total", Type::Long)), rhs: Box::new(Expr::new(ExprKind::Literal(Literal { kind: LiteralKind::Int(1) }), loc())) },
            loc(),
        );
        let captures = free_variables(&params, &body);
        assert_eq!(captures, vec![Capture { name: "total".into(), ty: Type::Long }]);
    }

    #[test]
    fn a_variable_bound_by_a_let_inside_the_body_is_not_captured() {
        let params = vec![];
        let body = Expr::new(
            ExprKind::Block(vec![
                Stmt { kind: StmtKind::Let { name: "y".into(), ty: Some(Type::Int), qualifier: MemoryQualifier::Val, mutable: false, value: Expr::new(ExprKind::Literal(Literal { kind: LiteralKind::Int(1) }), loc()) }, loc: loc() },
                Stmt { kind: StmtKind::Expr(ident("y", Type::Int)), loc: loc() },
            ]),
            loc(),
        );
        assert!(free_variables(&params, &body).is_empty());
    }

    #[test]
    fn each_free_variable_is_captured_once_even_if_referenced_twice() {
        let params = vec![];
        let body = Expr::new(
            ExprKind::Binary { op: BinOp::Add, lhs: Box::new(ident("n", Type::Int)), rhs: Box::new(ident("n", Type::Int)) },
            loc(),
        );
        assert_eq!(free_variables(&params, &body).len(), 1);
    }
}
