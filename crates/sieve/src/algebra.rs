//! Combinators over lambdas.
//!
//! Every combinator returns a new lambda and leaves its inputs untouched.
//! Merging two bodies first rebinds the second lambda's parameters to the
//! first's, position by position, so the result has a single parameter
//! list. The functions work for any arity; [`Predicate`](crate::Predicate)
//! exposes the unary case with the record type checked statically.

use std::collections::{HashMap, HashSet};

use crate::error::{Result, SieveError};
use crate::expr::{rewrite, BinaryOp, Expr, Lambda, Parameter};
use crate::value::Value;

pub use crate::expr::rewrite::{join, split};

/// `first(x..) && second(x..)`.
pub fn and(first: &Lambda, second: &Lambda) -> Result<Lambda> {
    combine(BinaryOp::AndAlso, first, second)
}

/// `first(x..) || second(x..)`.
pub fn or(first: &Lambda, second: &Lambda) -> Result<Lambda> {
    combine(BinaryOp::OrElse, first, second)
}

/// `!lambda(x..)`.
pub fn not(lambda: &Lambda) -> Result<Lambda> {
    check_predicate(lambda)?;
    Ok(Lambda::new(
        lambda.params().to_vec(),
        Expr::negate(lambda.body().clone()),
    ))
}

/// Alias for [`or`].
pub fn union(first: &Lambda, second: &Lambda) -> Result<Lambda> {
    or(first, second)
}

/// Alias for [`and`].
pub fn intersect(first: &Lambda, second: &Lambda) -> Result<Lambda> {
    and(first, second)
}

fn combine(op: BinaryOp, first: &Lambda, second: &Lambda) -> Result<Lambda> {
    check_predicate(first)?;
    check_predicate(second)?;
    if first.arity() != second.arity() {
        return Err(SieveError::ArityMismatch {
            expected: first.arity(),
            actual: second.arity(),
        });
    }
    for (a, b) in first.params().iter().zip(second.params()) {
        if a.value_type() != b.value_type() {
            return Err(SieveError::InvalidPredicate(format!(
                "parameter `{}: {}` cannot be rebound to `{}: {}`",
                b.name(),
                b.value_type(),
                a.name(),
                a.value_type()
            )));
        }
    }
    Ok(merge_unchecked(op, first, second))
}

/// Merges two bodies without validating arity or types.
pub(crate) fn merge_unchecked(op: BinaryOp, first: &Lambda, second: &Lambda) -> Lambda {
    let map = rewrite::positional_map(second.params(), first.params());
    let second_body = rewrite::rebind(second.body(), &map);
    Lambda::new(
        first.params().to_vec(),
        Expr::binary_raw(op, first.body().clone(), second_body),
    )
}

fn check_predicate(lambda: &Lambda) -> Result<()> {
    if lambda.is_predicate() {
        Ok(())
    } else {
        Err(SieveError::InvalidPredicate(format!(
            "`{}` returns {}, not bool",
            lambda,
            lambda.return_type()
        )))
    }
}

fn check_arity(lambda: &Lambda, expected: usize) -> Result<()> {
    if lambda.arity() == expected {
        Ok(())
    } else {
        Err(SieveError::ArityMismatch {
            expected,
            actual: lambda.arity(),
        })
    }
}

/// Lifts a unary lambda over `params`, reading only the first of them.
///
/// The result can be combined with any lambda taking `params`.
pub fn widen(unary: &Lambda, params: &[Parameter]) -> Result<Lambda> {
    check_arity(unary, 1)?;
    let Some(first) = params.first() else {
        return Err(SieveError::ArityMismatch {
            expected: 1,
            actual: 0,
        });
    };
    let own = &unary.params()[0];
    if own.value_type() != first.value_type() {
        return Err(SieveError::InvalidPredicate(format!(
            "cannot widen `{}` over a first parameter of type {}",
            unary,
            first.value_type()
        )));
    }
    let body = rewrite::rebind(unary.body(), &rewrite::positional_map(unary.params(), params));
    Ok(Lambda::new(params.to_vec(), body))
}

/// `unary(a) && wide(a, b, ..)`, keeping the parameters of `wide`.
pub fn and_widened(unary: &Lambda, wide: &Lambda) -> Result<Lambda> {
    let widened = widen(unary, wide.params())?;
    and(&widened, wide)
}

/// `x -> outer(inner(x))`, by substituting `inner`'s body for `outer`'s
/// parameter.
pub fn compose(inner: &Lambda, outer: &Lambda) -> Result<Lambda> {
    check_arity(inner, 1)?;
    check_arity(outer, 1)?;
    let target = &outer.params()[0];
    if !target.value_type().accepts(&inner.return_type()) {
        return Err(SieveError::InvalidPredicate(format!(
            "`{}` yields {}, `{}` expects {}",
            inner,
            inner.return_type(),
            outer,
            target.value_type()
        )));
    }
    let map = HashMap::from([(target.id(), inner.body().clone())]);
    Ok(Lambda::new(
        inner.params().to_vec(),
        rewrite::substitute(outer.body(), &map),
    ))
}

/// Pre-transforms argument `position` of `func` through `converter`.
///
/// `apply_to(|a, b| f(a, b), 1, |x| g(x))` is `|a, b| f(a, g(b))`.
pub fn apply_to(func: &Lambda, position: usize, converter: &Lambda) -> Result<Lambda> {
    check_arity(converter, 1)?;
    let target = position_param(func, position)?;
    let input = &converter.params()[0];
    if input.value_type() != target.value_type()
        || !target.value_type().accepts(&converter.return_type())
    {
        return Err(SieveError::InvalidPredicate(format!(
            "converter `{}` does not map {} to itself",
            converter,
            target.value_type()
        )));
    }
    let converted = rewrite::substitute(
        converter.body(),
        &HashMap::from([(input.id(), Expr::param(target))]),
    );
    let body = rewrite::substitute(func.body(), &HashMap::from([(target.id(), converted)]));
    Ok(Lambda::new(func.params().to_vec(), body))
}

fn position_param(func: &Lambda, position: usize) -> Result<&Parameter> {
    func.params()
        .get(position)
        .ok_or(SieveError::ArityMismatch {
            expected: func.arity(),
            actual: position + 1,
        })
}

/// Fixes some arguments of `func` to constants.
///
/// Any subset of positions may be bound; the remaining parameters keep
/// their order. Record parameters cannot be bound, since a record has no
/// constant form.
pub fn partial_apply(func: &Lambda, bindings: &[(usize, Value)]) -> Result<Lambda> {
    let mut seen = HashSet::new();
    let mut map = HashMap::new();
    for (position, value) in bindings {
        let param = position_param(func, *position)?;
        if !seen.insert(*position) {
            return Err(SieveError::InvalidPredicate(format!(
                "position {} bound twice",
                position
            )));
        }
        let ty = param.value_type();
        if ty.is_record() {
            return Err(SieveError::InvalidPredicate(format!(
                "record parameter `{}` cannot be bound to a constant",
                param.name()
            )));
        }
        let fits = match value.value_type() {
            Some(value_ty) => ty.accepts(&value_ty),
            None => ty.is_nullable(),
        };
        if !fits {
            return Err(SieveError::InvalidPredicate(format!(
                "{} does not fit parameter `{}: {}`",
                value,
                param.name(),
                ty
            )));
        }
        map.insert(param.id(), Expr::typed_constant(value.clone(), ty.clone()));
    }

    let remaining = func
        .params()
        .iter()
        .filter(|p| !map.contains_key(&p.id()))
        .cloned()
        .collect();
    Ok(Lambda::new(remaining, rewrite::substitute(func.body(), &map)))
}

/// Binds the first argument.
pub fn apply_first(func: &Lambda, value: Value) -> Result<Lambda> {
    partial_apply(func, &[(0, value)])
}

/// `|a, b| first(a) && second(b)`.
pub fn cartesian(first: &Lambda, second: &Lambda) -> Result<Lambda> {
    check_arity(first, 1)?;
    check_arity(second, 1)?;
    check_predicate(first)?;
    check_predicate(second)?;
    // Fresh parameters: both sides may share one from the same registry.
    let a = Parameter::new("a", first.params()[0].value_type().clone());
    let b = Parameter::new("b", second.params()[0].value_type().clone());
    let left = rewrite::rebind(
        first.body(),
        &rewrite::positional_map(first.params(), std::slice::from_ref(&a)),
    );
    let right = rewrite::rebind(
        second.body(),
        &rewrite::positional_map(second.params(), std::slice::from_ref(&b)),
    );
    Ok(Lambda::new(vec![a, b], Expr::and_also(left, right)))
}
