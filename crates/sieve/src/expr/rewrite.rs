//! Tree rewriting: parameter rebinding, substitution and splitting.
//!
//! Two lambdas built independently have distinct parameters even when they
//! describe the same record. Before their bodies can be merged, every
//! parameter reference in one body is rewritten to the other's parameters.

use std::collections::HashMap;

use super::{BinaryOp, Expr, ParamId, Parameter};

/// Replaces parameter references according to `replace`, recursively.
///
/// Parameters for which `replace` returns `None` are kept.
pub fn map_parameters<F>(expr: &Expr, replace: &F) -> Expr
where
    F: Fn(&Parameter) -> Option<Expr>,
{
    match expr {
        Expr::Parameter(p) => replace(p).unwrap_or_else(|| expr.clone()),
        Expr::Member { target, member } => Expr::Member {
            target: Box::new(map_parameters(target, replace)),
            member: member.clone(),
        },
        Expr::Constant { .. } => expr.clone(),
        Expr::Unary { op, operand } => Expr::Unary {
            op: *op,
            operand: Box::new(map_parameters(operand, replace)),
        },
        Expr::Binary { op, left, right } => Expr::Binary {
            op: *op,
            left: Box::new(map_parameters(left, replace)),
            right: Box::new(map_parameters(right, replace)),
        },
        Expr::Call { method, args } => Expr::Call {
            method: *method,
            args: args.iter().map(|a| map_parameters(a, replace)).collect(),
        },
    }
}

/// Substitutes whole expressions for parameters.
pub fn substitute(expr: &Expr, map: &HashMap<ParamId, Expr>) -> Expr {
    map_parameters(expr, &|p: &Parameter| map.get(&p.id()).cloned())
}

/// Rebinds parameters to other parameters.
pub fn rebind(expr: &Expr, map: &HashMap<ParamId, Parameter>) -> Expr {
    map_parameters(expr, &|p: &Parameter| map.get(&p.id()).map(Expr::param))
}

/// Pairs `from[i]` with `to[i]` for rebinding.
pub fn positional_map(from: &[Parameter], to: &[Parameter]) -> HashMap<ParamId, Parameter> {
    from.iter()
        .zip(to)
        .map(|(f, t)| (f.id(), t.clone()))
        .collect()
}

/// Returns `true` if `expr` references the parameter anywhere.
pub fn references(expr: &Expr, id: ParamId) -> bool {
    match expr {
        Expr::Parameter(p) => p.id() == id,
        Expr::Member { target, .. } => references(target, id),
        Expr::Constant { .. } => false,
        Expr::Unary { operand, .. } => references(operand, id),
        Expr::Binary { left, right, .. } => references(left, id) || references(right, id),
        Expr::Call { args, .. } => args.iter().any(|a| references(a, id)),
    }
}

/// Flattens a tree of the given connectives into its operands, left to right.
///
/// `a && (b && c)` split on `AndAlso` yields `[a, b, c]`; nodes of any other
/// kind are leaves.
pub fn split(expr: &Expr, separators: &[BinaryOp]) -> Vec<Expr> {
    let mut parts = Vec::new();
    split_into(expr, separators, &mut parts);
    parts
}

fn split_into(expr: &Expr, separators: &[BinaryOp], parts: &mut Vec<Expr>) {
    match expr {
        Expr::Binary { op, left, right } if separators.contains(op) => {
            split_into(left, separators, parts);
            split_into(right, separators, parts);
        }
        other => parts.push(other.clone()),
    }
}

/// Folds expressions into a left-leaning tree joined by `op`.
///
/// Returns `None` for an empty list.
pub fn join<I>(parts: I, op: BinaryOp) -> Option<Expr>
where
    I: IntoIterator<Item = Expr>,
{
    parts
        .into_iter()
        .reduce(|left, right| Expr::binary_raw(op, left, right))
}
