//! Rendering expression trees as text.
//!
//! [`Expr`] and [`Lambda`] implement `Display` with a neutral infix form,
//! used for logging and test assertions:
//!
//! ```text
//! |p| ((p.age > 30) && p.name.starts_with("A"))
//! ```
//!
//! [`SqlTranslator`] is the remote backend: it renders a predicate as a SQL
//! `WHERE` condition and a key selector as an `ORDER BY` term. Trees it
//! cannot express fail with [`SieveError::Untranslatable`].
//!
//! SQL compares with three-valued logic, in-memory evaluation with two. The
//! translator closes the gap where a nullable column can reach a negation:
//! `!=` on a nullable column also accepts `IS NULL`, and `NOT` over a
//! condition that may be unknown negates `COALESCE(.., FALSE)`.

use std::fmt;

use super::{BinaryOp, Expr, Lambda, Method, UnaryOp};
use crate::error::{Result, SieveError};
use crate::value::{Number, Value, DATE_FORMAT};

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Parameter(p) => write!(f, "{}", p.name()),
            Expr::Member { target, member } if member.is_self() => write!(f, "{}", target),
            Expr::Member { target, member } => write!(f, "{}.{}", target, member.name()),
            Expr::Constant { value, .. } => write!(f, "{}", value),
            Expr::Unary {
                op: UnaryOp::Not,
                operand,
            } => write!(f, "!{}", operand),
            Expr::Unary {
                op: UnaryOp::Lift,
                operand,
            } => write!(f, "{}", operand),
            Expr::Binary { op, left, right } => write!(f, "({} {} {})", left, op.symbol(), right),
            Expr::Call { method, args } => match args.as_slice() {
                [subject] => write!(f, "{}.{}()", subject, method.as_str()),
                [Expr::Constant { .. }, item] if *method == Method::InSet => {
                    write!(f, "{}.contains({})", args[0], item)
                }
                [subject, rest @ ..] => {
                    write!(f, "{}.{}(", subject, method.as_str())?;
                    for (i, arg) in rest.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}", arg)?;
                    }
                    write!(f, ")")
                }
                [] => write!(f, "{}()", method.as_str()),
            },
        }
    }
}

impl fmt::Display for Lambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.params().iter().map(|p| p.name()).collect();
        write!(f, "|{}| {}", names.join(", "), self.body())
    }
}

/// Translates single-parameter lambdas to SQL.
///
/// Members of the parameter become quoted column names. Only constants can
/// appear as pattern or set operands.
#[derive(Debug, Clone)]
pub struct SqlTranslator {
    quote: char,
}

impl Default for SqlTranslator {
    fn default() -> Self {
        SqlTranslator { quote: '"' }
    }
}

impl SqlTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `quote` around identifiers (e.g. '`' for MySQL).
    pub fn with_identifier_quote(quote: char) -> Self {
        SqlTranslator { quote }
    }

    /// Renders a predicate as a `WHERE` condition.
    pub fn condition(&self, lambda: &Lambda) -> Result<String> {
        self.check_unary(lambda)?;
        if !lambda.is_predicate() {
            return Err(untranslatable(format!("`{}` is not a predicate", lambda)));
        }
        self.expr(lambda.body())
    }

    /// Renders a key selector as an `ORDER BY` term, without direction.
    pub fn key(&self, lambda: &Lambda) -> Result<String> {
        self.check_unary(lambda)?;
        self.expr(lambda.body())
    }

    fn check_unary(&self, lambda: &Lambda) -> Result<()> {
        if lambda.arity() == 1 {
            Ok(())
        } else {
            Err(untranslatable(format!(
                "only single-parameter lambdas translate, `{}` has {}",
                lambda,
                lambda.arity()
            )))
        }
    }

    fn identifier(&self, name: &str) -> String {
        let q = self.quote;
        let escaped = name.replace(q, &format!("{q}{q}"));
        format!("{q}{escaped}{q}")
    }

    fn expr(&self, expr: &Expr) -> Result<String> {
        match expr {
            Expr::Member { target, member } => match target.as_ref() {
                Expr::Parameter(_) if !member.is_self() => Ok(self.identifier(member.name())),
                _ => Err(untranslatable(format!("member access `{}`", expr))),
            },
            Expr::Parameter(p) => Err(untranslatable(format!(
                "bare parameter `{}` has no column",
                p.name()
            ))),
            Expr::Constant { value, .. } => literal(value),
            Expr::Unary {
                op: UnaryOp::Lift,
                operand,
            } => self.expr(operand),
            Expr::Unary {
                op: UnaryOp::Not,
                operand,
            } if may_be_unknown(operand) => {
                Ok(format!("NOT (COALESCE({}, FALSE))", self.expr(operand)?))
            }
            Expr::Unary {
                op: UnaryOp::Not,
                operand,
            } => Ok(format!("NOT ({})", self.expr(operand)?)),
            Expr::Binary { op, left, right } => self.binary(*op, left, right),
            Expr::Call { method, args } => self.call(*method, args),
        }
    }

    fn binary(&self, op: BinaryOp, left: &Expr, right: &Expr) -> Result<String> {
        if matches!(op, BinaryOp::Eq | BinaryOp::Ne) {
            let null_test = if op == BinaryOp::Eq { "IS NULL" } else { "IS NOT NULL" };
            if is_null_constant(right) {
                return Ok(format!("({} {})", self.expr(left)?, null_test));
            }
            if is_null_constant(left) {
                return Ok(format!("({} {})", self.expr(right)?, null_test));
            }
        }
        let symbol = match op {
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::AndAlso => "AND",
            BinaryOp::OrElse => "OR",
        };
        let (l, r) = (self.expr(left)?, self.expr(right)?);
        if op == BinaryOp::Ne {
            let nulls: Vec<String> = [(left, &l), (right, &r)]
                .into_iter()
                .filter(|(side, _)| is_nullable_column(side))
                .map(|(_, sql)| format!(" OR {} IS NULL", sql))
                .collect();
            if !nulls.is_empty() {
                return Ok(format!("({} <> {}{})", l, r, nulls.concat()));
            }
        }
        Ok(format!("({} {} {})", l, symbol, r))
    }

    fn call(&self, method: Method, args: &[Expr]) -> Result<String> {
        match (method, args) {
            (Method::Month, [date]) => Ok(format!("EXTRACT(MONTH FROM {})", self.expr(date)?)),
            (Method::Contains | Method::StartsWith | Method::EndsWith, [subject, pattern]) => {
                let text = match pattern {
                    Expr::Constant {
                        value: Value::String(s),
                        ..
                    } => escape_like(s),
                    other => {
                        return Err(untranslatable(format!(
                            "pattern `{}` is not a string constant",
                            other
                        )))
                    }
                };
                let pattern = match method {
                    Method::Contains => format!("%{}%", text),
                    Method::StartsWith => format!("{}%", text),
                    _ => format!("%{}", text),
                };
                Ok(format!(
                    "({} LIKE '{}' ESCAPE '\\')",
                    self.expr(subject)?,
                    pattern.replace('\'', "''")
                ))
            }
            (Method::InSet, [set, item]) => {
                let items = match set {
                    Expr::Constant {
                        value: Value::IntSeq(items),
                        ..
                    } => items.iter().map(|i| i.to_string()).collect::<Vec<_>>(),
                    Expr::Constant {
                        value: Value::StrSeq(items),
                        ..
                    } => items.iter().map(|s| quote_string(s)).collect(),
                    other => {
                        return Err(untranslatable(format!("set `{}` is not a constant", other)))
                    }
                };
                if items.is_empty() {
                    return Ok("FALSE".to_string());
                }
                Ok(format!("({} IN ({}))", self.expr(item)?, items.join(", ")))
            }
            (method, args) => Err(untranslatable(format!(
                "`{}` with {} arguments",
                method.as_str(),
                args.len()
            ))),
        }
    }
}

/// A column (or a value derived from one) whose type admits null.
fn is_nullable_column(expr: &Expr) -> bool {
    match expr {
        Expr::Unary {
            op: UnaryOp::Lift,
            operand,
        } => is_nullable_column(operand),
        Expr::Member { member, .. } => member.value_type().is_nullable(),
        Expr::Call {
            method: Method::Month,
            args,
        } => args.iter().any(is_nullable_column),
        _ => false,
    }
}

/// Whether the SQL form of `expr` can evaluate to NULL.
fn may_be_unknown(expr: &Expr) -> bool {
    match expr {
        Expr::Member { member, .. } => member.value_type().is_nullable(),
        Expr::Parameter(p) => p.value_type().is_nullable(),
        Expr::Constant { .. } => false,
        Expr::Unary { operand, .. } => may_be_unknown(operand),
        Expr::Binary { left, right, .. } => may_be_unknown(left) || may_be_unknown(right),
        Expr::Call { args, .. } => args.iter().any(may_be_unknown),
    }
}

fn untranslatable(reason: String) -> SieveError {
    SieveError::Untranslatable(reason)
}

fn is_null_constant(expr: &Expr) -> bool {
    match expr {
        Expr::Constant { value, .. } => value.is_null(),
        Expr::Unary {
            op: UnaryOp::Lift,
            operand,
        } => is_null_constant(operand),
        _ => false,
    }
}

fn quote_string(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn escape_like(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn literal(value: &Value) -> Result<String> {
    match value {
        Value::Null => Ok("NULL".to_string()),
        Value::String(s) => Ok(quote_string(s)),
        Value::Bool(true) => Ok("TRUE".to_string()),
        Value::Bool(false) => Ok("FALSE".to_string()),
        Value::Number(n @ (Number::F32(_) | Number::F64(_))) if !n.to_f64().is_finite() => Err(
            untranslatable(format!("non-finite number {}", n)),
        ),
        Value::Number(n) => Ok(n.to_string()),
        Value::Date(d) => Ok(format!("'{}'", d.format(DATE_FORMAT))),
        Value::IntSeq(_) | Value::StrSeq(_) => Err(untranslatable(format!(
            "sequence {} outside a membership test",
            value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{MemberRef, Parameter};
    use crate::record::Field;
    use crate::types::ValueType;

    struct User {
        name: String,
        age: Option<u32>,
        nickname: Option<String>,
    }

    fn name_member() -> MemberRef {
        MemberRef::new::<User>("name", ValueType::String, |u: &User| u.name.to_value())
    }

    fn age_member() -> MemberRef {
        MemberRef::new::<User>("age", <Option<u32>>::value_type(), |u: &User| u.age.to_value())
    }

    fn nickname_member() -> MemberRef {
        MemberRef::new::<User>("nickname", <Option<String>>::value_type(), |u: &User| {
            u.nickname.to_value()
        })
    }

    fn user_lambda(build: impl FnOnce(Expr, Expr) -> Expr) -> Lambda {
        let p = Parameter::of::<User>("p");
        let name = Expr::member(Expr::param(&p), name_member());
        let age = Expr::member(Expr::param(&p), age_member());
        Lambda::unary(p, build(name, age))
    }

    #[test]
    fn infix_form() {
        let lambda = user_lambda(|name, age| {
            Expr::and_also(
                Expr::greater_than(age, Expr::constant(30u32)),
                Expr::call(Method::StartsWith, vec![name, Expr::constant("A")]),
            )
        });
        assert_eq!(
            lambda.to_string(),
            "|p| ((p.age > 30) && p.name.starts_with(\"A\"))"
        );
    }

    #[test]
    fn infix_membership() {
        let d = Parameter::new("d", ValueType::Date);
        let expr = Expr::call(
            Method::InSet,
            vec![
                Expr::constant(vec![1i64, 2]),
                Expr::call(Method::Month, vec![Expr::param(&d)]),
            ],
        );
        assert_eq!(expr.to_string(), "[1, 2].contains(d.month())");
    }

    #[test]
    fn sql_comparisons() {
        let lambda = user_lambda(|name, age| {
            Expr::or_else(
                Expr::less_or_equal(age, Expr::constant(18u32)),
                Expr::not_equal(name, Expr::constant("O'Brien")),
            )
        });
        assert_eq!(
            SqlTranslator::new().condition(&lambda).unwrap(),
            "((\"age\" <= 18) OR (\"name\" <> 'O''Brien'))"
        );
    }

    #[test]
    fn sql_null_tests() {
        let lambda = user_lambda(|_, age| {
            Expr::equal(
                age,
                Expr::typed_constant(Value::Null, <Option<u32>>::value_type()),
            )
        });
        assert_eq!(
            SqlTranslator::new().condition(&lambda).unwrap(),
            "(\"age\" IS NULL)"
        );
    }

    #[test]
    fn sql_like_patterns_are_escaped() {
        let lambda = user_lambda(|name, _| {
            Expr::negate(Expr::call(Method::Contains, vec![name, Expr::constant("50%_off")]))
        });
        assert_eq!(
            SqlTranslator::with_identifier_quote('`').condition(&lambda).unwrap(),
            "NOT ((`name` LIKE '%50\\%\\_off%' ESCAPE '\\'))"
        );
    }

    #[test]
    fn sql_not_equal_keeps_null_rows() {
        let lambda = user_lambda(|_, age| Expr::not_equal(age, Expr::constant(5u32)));
        assert_eq!(
            SqlTranslator::new().condition(&lambda).unwrap(),
            "(\"age\" <> 5 OR \"age\" IS NULL)"
        );
    }

    #[test]
    fn sql_negation_of_nullable_condition() {
        let p = Parameter::of::<User>("p");
        let nickname = Expr::member(Expr::param(&p), nickname_member());
        let lambda = Lambda::unary(
            p,
            Expr::negate(Expr::call(Method::Contains, vec![nickname, Expr::constant("v")])),
        );
        assert_eq!(
            SqlTranslator::new().condition(&lambda).unwrap(),
            "NOT (COALESCE((\"nickname\" LIKE '%v%' ESCAPE '\\'), FALSE))"
        );

        let outside = user_lambda(|_, age| {
            Expr::negate(Expr::call(
                Method::InSet,
                vec![Expr::constant(vec![1i64, 2]), age],
            ))
        });
        assert_eq!(
            SqlTranslator::new().condition(&outside).unwrap(),
            "NOT (COALESCE((\"age\" IN (1, 2)), FALSE))"
        );
    }

    #[test]
    fn sql_rejects_non_finite_numbers() {
        for n in [f64::INFINITY, f64::NAN] {
            let lambda = user_lambda(|_, age| Expr::greater_than(age, Expr::constant(n)));
            assert!(matches!(
                SqlTranslator::new().condition(&lambda),
                Err(SieveError::Untranslatable(_))
            ));
        }
    }

    #[test]
    fn sql_membership() {
        let lambda = user_lambda(|name, _| {
            Expr::call(
                Method::InSet,
                vec![Expr::constant(vec!["a".to_string(), "b".to_string()]), name],
            )
        });
        assert_eq!(
            SqlTranslator::new().condition(&lambda).unwrap(),
            "(\"name\" IN ('a', 'b'))"
        );
        let empty = user_lambda(|_, age| {
            Expr::call(Method::InSet, vec![Expr::constant(Vec::<i64>::new()), age])
        });
        assert_eq!(SqlTranslator::new().condition(&empty).unwrap(), "FALSE");
    }

    #[test]
    fn sql_order_key() {
        let lambda = user_lambda(|_, age| age);
        assert_eq!(SqlTranslator::new().key(&lambda).unwrap(), "\"age\"");
    }

    #[test]
    fn untranslatable_trees() {
        let p = Parameter::new("n", ValueType::Bool);
        let bare = Lambda::unary(p.clone(), Expr::param(&p));
        assert!(matches!(
            SqlTranslator::new().condition(&bare),
            Err(SieveError::Untranslatable(_))
        ));

        let not_predicate = user_lambda(|name, _| name);
        assert!(SqlTranslator::new().condition(&not_predicate).is_err());
    }
}
