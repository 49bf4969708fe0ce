//! In-memory evaluation of expression trees.
//!
//! A lambda is called with one [`Operand`] per parameter. Records are passed
//! by reference as `&dyn Any`; member nodes read them through the type-erased
//! property readers stored in [`MemberRef`](super::MemberRef).
//!
//! Null handling follows lifted-comparison semantics: `==` against null is
//! `false` unless both sides are null, `!=` is the negation, and ordering or
//! membership tests involving null are `false`. A null boolean counts as
//! `false`, so negating it gives `true`: a predicate and its negation always
//! partition the input.

use std::any::Any;
use std::cmp::Ordering;
use std::fmt;

use chrono::Datelike;

use super::{BinaryOp, Expr, Lambda, Method, ParamId, UnaryOp};
use crate::error::{Result, SieveError};
use crate::value::{compare_values, Number, Value};

/// An argument or intermediate result during evaluation.
#[derive(Clone)]
pub enum Operand<'a> {
    /// A borrowed record.
    Record(&'a dyn Any),
    /// An owned value.
    Value(Value),
}

impl<'a> Operand<'a> {
    /// Borrows a record of any type.
    pub fn record<T: Any>(record: &'a T) -> Self {
        Operand::Record(record)
    }

    /// Returns the value, or an error if this is a record.
    pub fn into_value(self) -> Result<Value> {
        match self {
            Operand::Value(v) => Ok(v),
            Operand::Record(_) => Err(SieveError::Evaluation(
                "expected a value, found a record".to_string(),
            )),
        }
    }

    /// Interprets the operand as a boolean. Null counts as `false`.
    pub fn truthy(self) -> Result<bool> {
        match self.into_value()? {
            Value::Bool(b) => Ok(b),
            Value::Null => Ok(false),
            other => Err(SieveError::Evaluation(format!(
                "expected a boolean, found {}",
                other
            ))),
        }
    }
}

impl From<Value> for Operand<'_> {
    fn from(value: Value) -> Self {
        Operand::Value(value)
    }
}

impl fmt::Debug for Operand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Record(_) => write!(f, "Record(..)"),
            Operand::Value(v) => f.debug_tuple("Value").field(v).finish(),
        }
    }
}

/// Parameter bindings for one call.
#[derive(Debug, Default)]
pub struct Scope<'a> {
    bindings: Vec<(ParamId, Operand<'a>)>,
}

impl<'a> Scope<'a> {
    pub fn bind(&mut self, id: ParamId, operand: Operand<'a>) {
        self.bindings.push((id, operand));
    }

    fn lookup(&self, id: ParamId) -> Option<&Operand<'a>> {
        // Later bindings shadow earlier ones.
        self.bindings
            .iter()
            .rev()
            .find(|(bound, _)| *bound == id)
            .map(|(_, operand)| operand)
    }
}

impl Lambda {
    /// Calls the lambda with one operand per parameter.
    pub fn call<'a>(&self, args: Vec<Operand<'a>>) -> Result<Operand<'a>> {
        if args.len() != self.arity() {
            return Err(SieveError::ArityMismatch {
                expected: self.arity(),
                actual: args.len(),
            });
        }
        let mut scope = Scope::default();
        for (param, arg) in self.params().iter().zip(args) {
            scope.bind(param.id(), arg);
        }
        eval(self.body(), &scope)
    }

    /// Calls a predicate lambda and interprets the result as a boolean.
    pub fn test<'a>(&self, args: Vec<Operand<'a>>) -> Result<bool> {
        self.call(args)?.truthy()
    }
}

/// Evaluates `expr` under `scope`.
pub fn eval<'a>(expr: &Expr, scope: &Scope<'a>) -> Result<Operand<'a>> {
    match expr {
        Expr::Parameter(p) => scope.lookup(p.id()).cloned().ok_or_else(|| {
            SieveError::Evaluation(format!("parameter `{}` is not bound", p.name()))
        }),
        Expr::Member { target, member } => match eval(target, scope)? {
            Operand::Record(record) => member.read(record).map(Operand::Value).ok_or_else(|| {
                SieveError::Evaluation(format!(
                    "member `{}` cannot be read from this record",
                    member.name()
                ))
            }),
            // The record itself, already reduced to a value.
            value @ Operand::Value(_) if member.is_self() => Ok(value),
            Operand::Value(v) => Err(SieveError::Evaluation(format!(
                "member `{}` read from non-record value {}",
                member.name(),
                v
            ))),
        },
        Expr::Constant { value, .. } => Ok(Operand::Value(value.clone())),
        Expr::Unary { op, operand } => {
            let inner = eval(operand, scope)?;
            match op {
                UnaryOp::Lift => Ok(inner),
                UnaryOp::Not => match inner.into_value()? {
                    Value::Bool(b) => Ok(Value::Bool(!b).into()),
                    Value::Null => Ok(Value::Bool(true).into()),
                    other => Err(SieveError::Evaluation(format!("cannot negate {}", other))),
                },
            }
        }
        Expr::Binary { op, left, right } => eval_binary(*op, left, right, scope),
        Expr::Call { method, args } => eval_call(*method, args, scope),
    }
}

fn eval_value(expr: &Expr, scope: &Scope<'_>) -> Result<Value> {
    eval(expr, scope)?.into_value()
}

fn eval_binary<'a>(op: BinaryOp, left: &Expr, right: &Expr, scope: &Scope<'a>) -> Result<Operand<'a>> {
    let result = match op {
        BinaryOp::AndAlso => eval(left, scope)?.truthy()? && eval(right, scope)?.truthy()?,
        BinaryOp::OrElse => eval(left, scope)?.truthy()? || eval(right, scope)?.truthy()?,
        BinaryOp::Eq => {
            let (l, r) = (eval_value(left, scope)?, eval_value(right, scope)?);
            check_comparable(&l, &r)?;
            l.equals(&r)
        }
        BinaryOp::Ne => {
            let (l, r) = (eval_value(left, scope)?, eval_value(right, scope)?);
            check_comparable(&l, &r)?;
            !l.equals(&r)
        }
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let (l, r) = (eval_value(left, scope)?, eval_value(right, scope)?);
            check_comparable(&l, &r)?;
            if l.is_null() || r.is_null() {
                false
            } else {
                match compare_values(&l, &r) {
                    Some(ordering) => ordering_holds(op, ordering),
                    // NaN
                    None => false,
                }
            }
        }
    };
    Ok(Value::Bool(result).into())
}

fn ordering_holds(op: BinaryOp, ordering: Ordering) -> bool {
    match op {
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::Le => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        BinaryOp::Ge => ordering != Ordering::Less,
        _ => false,
    }
}

fn check_comparable(left: &Value, right: &Value) -> Result<()> {
    match (left.value_type(), right.value_type()) {
        (Some(l), Some(r)) if l.is_numeric() && r.is_numeric() => Ok(()),
        (Some(l), Some(r)) if l != r => Err(SieveError::Evaluation(format!(
            "cannot compare {} with {}",
            left, right
        ))),
        _ => Ok(()),
    }
}

fn eval_call<'a>(method: Method, args: &[Expr], scope: &Scope<'a>) -> Result<Operand<'a>> {
    if args.len() != method.arity() {
        return Err(SieveError::ArityMismatch {
            expected: method.arity(),
            actual: args.len(),
        });
    }
    let values = args
        .iter()
        .map(|arg| eval_value(arg, scope))
        .collect::<Result<Vec<_>>>()?;

    let result = match (method, values.as_slice()) {
        (Method::Month, [Value::Date(d)]) => Value::Number(Number::I32(d.month() as i32)),
        (Method::Month, [Value::Null]) => Value::Null,

        (Method::Contains | Method::StartsWith | Method::EndsWith, [a, b])
            if a.is_null() || b.is_null() =>
        {
            Value::Bool(false)
        }
        (Method::Contains, [Value::String(s), Value::String(part)]) => {
            Value::Bool(s.contains(part.as_str()))
        }
        (Method::StartsWith, [Value::String(s), Value::String(part)]) => {
            Value::Bool(s.starts_with(part.as_str()))
        }
        (Method::EndsWith, [Value::String(s), Value::String(part)]) => {
            Value::Bool(s.ends_with(part.as_str()))
        }

        (Method::InSet, [_, Value::Null]) | (Method::InSet, [Value::Null, _]) => Value::Bool(false),
        (Method::InSet, [Value::IntSeq(set), Value::Number(n)]) => Value::Bool(
            set.iter()
                .any(|item| n.compare(Number::I64(*item)) == Some(Ordering::Equal)),
        ),
        (Method::InSet, [Value::StrSeq(set), Value::String(s)]) => {
            Value::Bool(set.iter().any(|item| item == s))
        }

        (method, values) => {
            let rendered: Vec<String> = values.iter().map(|v| v.to_string()).collect();
            return Err(SieveError::Evaluation(format!(
                "`{}` is not defined for ({})",
                method.as_str(),
                rendered.join(", ")
            )));
        }
    };
    Ok(result.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{MemberRef, Parameter};
    use crate::record::Field;
    use crate::types::{NumberKind, ValueType};
    use chrono::NaiveDate;

    struct Row {
        name: String,
        score: Option<i32>,
    }

    fn name_of(row: &Row) -> Value {
        row.name.to_value()
    }

    fn score_of(row: &Row) -> Value {
        row.score.to_value()
    }

    fn row(name: &str, score: Option<i32>) -> Row {
        Row {
            name: name.to_string(),
            score,
        }
    }

    fn score_member() -> MemberRef {
        MemberRef::new::<Row>("score", <Option<i32>>::value_type(), score_of)
    }

    #[test]
    fn member_comparison() {
        let p = Parameter::of::<Row>("r");
        let lambda = Lambda::unary(
            p.clone(),
            Expr::greater_than(
                Expr::member(Expr::param(&p), score_member()),
                Expr::constant(10i32),
            ),
        );
        let high = row("a", Some(12));
        let low = row("b", Some(3));
        let none = row("c", None);
        assert!(lambda.test(vec![Operand::record(&high)]).unwrap());
        assert!(!lambda.test(vec![Operand::record(&low)]).unwrap());
        assert!(!lambda.test(vec![Operand::record(&none)]).unwrap());
    }

    #[test]
    fn null_equality_semantics() {
        let p = Parameter::of::<Row>("r");
        let score = Expr::member(Expr::param(&p), score_member());
        let null = Expr::typed_constant(Value::Null, ValueType::Number(NumberKind::I32).nullable());
        let eq = Lambda::unary(p.clone(), Expr::equal(score.clone(), Expr::constant(5i32)));
        let ne = Lambda::unary(p.clone(), Expr::not_equal(score.clone(), Expr::constant(5i32)));
        let is_null = Lambda::unary(p.clone(), Expr::equal(score, null));

        let none = row("c", None);
        assert!(!eq.test(vec![Operand::record(&none)]).unwrap());
        assert!(ne.test(vec![Operand::record(&none)]).unwrap());
        assert!(is_null.test(vec![Operand::record(&none)]).unwrap());
    }

    #[test]
    fn negated_null_boolean_is_true() {
        let flag = Parameter::new("flag", ValueType::Bool.nullable());
        let plain = Lambda::unary(flag.clone(), Expr::param(&flag));
        let negated = Lambda::unary(flag.clone(), Expr::negate(Expr::param(&flag)));

        assert!(!plain.test(vec![Value::Null.into()]).unwrap());
        assert!(negated.test(vec![Value::Null.into()]).unwrap());
        assert!(!negated.test(vec![Value::Bool(true).into()]).unwrap());
    }

    #[test]
    fn string_methods() {
        let p = Parameter::of::<Row>("r");
        let name = Expr::member(
            Expr::param(&p),
            MemberRef::new::<Row>("name", ValueType::String, name_of),
        );
        let starts = Lambda::unary(
            p.clone(),
            Expr::call(Method::StartsWith, vec![name.clone(), Expr::constant("Al")]),
        );
        let not_contains = Lambda::unary(
            p.clone(),
            Expr::negate(Expr::call(Method::Contains, vec![name, Expr::constant("x")])),
        );
        let alice = row("Alice", None);
        assert!(starts.test(vec![Operand::record(&alice)]).unwrap());
        assert!(not_contains.test(vec![Operand::record(&alice)]).unwrap());
    }

    #[test]
    fn logical_operators_short_circuit() {
        // The right side would fail: the parameter is unbound.
        let unbound = Parameter::new("x", ValueType::Bool);
        let and = Expr::and_also(Expr::constant(false), Expr::param(&unbound));
        let or = Expr::or_else(Expr::constant(true), Expr::param(&unbound));
        let scope = Scope::default();
        assert!(!eval(&and, &scope).unwrap().truthy().unwrap());
        assert!(eval(&or, &scope).unwrap().truthy().unwrap());
    }

    #[test]
    fn month_and_set_membership() {
        let d = Parameter::new("d", ValueType::Date);
        let lambda = Lambda::unary(
            d.clone(),
            Expr::call(
                Method::InSet,
                vec![
                    Expr::constant(vec![1i64, 3]),
                    Expr::call(Method::Month, vec![Expr::param(&d)]),
                ],
            ),
        );
        let march = NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let june = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert!(lambda.test(vec![Value::Date(march).into()]).unwrap());
        assert!(!lambda.test(vec![Value::Date(june).into()]).unwrap());
        assert!(!lambda.test(vec![Value::Null.into()]).unwrap());
    }

    #[test]
    fn arity_is_checked() {
        let p = Parameter::new("p", ValueType::Bool);
        let lambda = Lambda::unary(p.clone(), Expr::param(&p));
        let err = lambda.call(Vec::new()).unwrap_err();
        assert!(matches!(
            err,
            SieveError::ArityMismatch {
                expected: 1,
                actual: 0
            }
        ));
    }

    #[test]
    fn mismatched_types_fail() {
        let expr = Expr::binary_raw(BinaryOp::Lt, Expr::constant("a"), Expr::constant(1i32));
        assert!(matches!(
            eval(&expr, &Scope::default()),
            Err(SieveError::Evaluation(_))
        ));
    }

    #[test]
    fn record_of_wrong_type_fails() {
        let p = Parameter::of::<Row>("r");
        let lambda = Lambda::unary(p.clone(), Expr::member(Expr::param(&p), score_member()));
        let wrong = 5u8;
        assert!(lambda.call(vec![Operand::record(&wrong)]).is_err());
    }
}
