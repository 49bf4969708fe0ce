//! Expression trees.
//!
//! Predicates and key selectors are built as explicit trees rather than
//! closures, so they can be combined, rewritten and inspected before they
//! run. A tree has two backends:
//!
//! - [`eval`]: evaluates the tree in memory (the executable closure backend)
//! - [`render`]: renders the tree as source text, either a neutral infix
//!   form or SQL for a remote query translator
//!
//! Node kinds:
//!
//! | Node | Meaning |
//! |------|---------|
//! | `Parameter` | placeholder bound when a lambda is called |
//! | `Member` | read a named property from a record |
//! | `Constant` | literal value with a static type |
//! | `Unary` | `Not`, `Lift` (convert to nullable) |
//! | `Binary` | comparisons, `AndAlso`, `OrElse` |
//! | `Call` | `Contains`, `StartsWith`, `EndsWith`, `Month`, `InSet` |

pub mod coerce;
pub mod eval;
pub mod render;
pub mod rewrite;

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::types::{NumberKind, ValueType};
use crate::value::Value;

pub use eval::Operand;

static NEXT_PARAM_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamId(u64);

impl ParamId {
    fn next() -> Self {
        ParamId(NEXT_PARAM_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A lambda parameter.
///
/// Two parameters with the same name are still distinct: identity is the
/// [`ParamId`], which is what rebinding keys on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Parameter {
    id: ParamId,
    name: Arc<str>,
    ty: ValueType,
}

impl Parameter {
    /// Creates a parameter with a fresh identity.
    pub fn new(name: &str, ty: ValueType) -> Self {
        Parameter {
            id: ParamId::next(),
            name: Arc::from(name),
            ty,
        }
    }

    /// Creates a parameter typed as record `T`.
    pub fn of<T: 'static>(name: &str) -> Self {
        Parameter::new(name, ValueType::record::<T>())
    }

    /// Creates a parameter with the same name and type but a fresh identity.
    pub fn fresh(&self) -> Self {
        Parameter::new(&self.name, self.ty.clone())
    }

    pub fn id(&self) -> ParamId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_type(&self) -> &ValueType {
        &self.ty
    }
}

type ReadFn = dyn Fn(&dyn Any) -> Option<Value> + Send + Sync;

/// A readable property of a record type, as used by `Member` nodes.
///
/// An empty name denotes the record itself (see [`Record::self_value`]).
///
/// [`Record::self_value`]: crate::Record::self_value
#[derive(Clone)]
pub struct MemberRef {
    name: Arc<str>,
    ty: ValueType,
    owner: TypeId,
    read: Arc<ReadFn>,
}

impl MemberRef {
    /// Wraps a typed property reader.
    pub fn new<T: 'static>(name: &str, ty: ValueType, read: fn(&T) -> Value) -> Self {
        MemberRef {
            name: Arc::from(name),
            ty,
            owner: TypeId::of::<T>(),
            read: Arc::new(move |record: &dyn Any| record.downcast_ref::<T>().map(read)),
        }
    }

    /// The record itself, read through [`Record::self_value`].
    ///
    /// [`Record::self_value`]: crate::Record::self_value
    pub fn self_of<T: crate::Record>(ty: ValueType) -> Self {
        MemberRef {
            name: Arc::from(""),
            ty,
            owner: TypeId::of::<T>(),
            read: Arc::new(|record: &dyn Any| {
                record.downcast_ref::<T>().and_then(|r| r.self_value())
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_type(&self) -> &ValueType {
        &self.ty
    }

    /// Returns `true` if this member reads the record itself.
    pub fn is_self(&self) -> bool {
        self.name.is_empty()
    }

    pub(crate) fn read(&self, record: &dyn Any) -> Option<Value> {
        (self.read)(record)
    }
}

impl PartialEq for MemberRef {
    fn eq(&self, other: &Self) -> bool {
        self.owner == other.owner && self.name == other.name && self.ty == other.ty
    }
}

impl fmt::Debug for MemberRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberRef")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .finish()
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// Logical negation.
    Not,
    /// Convert a value to the nullable form of its type.
    Lift,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// Short-circuit AND.
    AndAlso,
    /// Short-circuit OR.
    OrElse,
}

impl BinaryOp {
    /// Returns `true` for `AndAlso` and `OrElse`.
    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::AndAlso | BinaryOp::OrElse)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::AndAlso => "&&",
            BinaryOp::OrElse => "||",
        }
    }
}

/// Built-in methods available to `Call` nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `(haystack, needle)`: substring test.
    Contains,
    /// `(text, prefix)`.
    StartsWith,
    /// `(text, suffix)`.
    EndsWith,
    /// `(date)`: month component, 1 through 12.
    Month,
    /// `(set, item)`: membership of `item` in an int or string sequence.
    InSet,
}

impl Method {
    /// Number of arguments the method takes.
    pub fn arity(self) -> usize {
        match self {
            Method::Month => 1,
            _ => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Contains => "contains",
            Method::StartsWith => "starts_with",
            Method::EndsWith => "ends_with",
            Method::Month => "month",
            Method::InSet => "in_set",
        }
    }
}

/// A node of an expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Parameter(Parameter),
    Member {
        target: Box<Expr>,
        member: MemberRef,
    },
    Constant {
        value: Value,
        ty: ValueType,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        method: Method,
        args: Vec<Expr>,
    },
}

impl Expr {
    /// Reference to a parameter.
    pub fn param(param: &Parameter) -> Self {
        Expr::Parameter(param.clone())
    }

    /// Constant typed after its value. `Null` gets a nullable string type;
    /// use [`Expr::typed_constant`] for a specific one.
    pub fn constant(value: impl Into<Value>) -> Self {
        let value = value.into();
        let ty = value
            .value_type()
            .unwrap_or_else(|| ValueType::String.nullable());
        Expr::Constant { value, ty }
    }

    /// Constant with an explicit static type.
    pub fn typed_constant(value: Value, ty: ValueType) -> Self {
        Expr::Constant { value, ty }
    }

    /// Reads `member` from `target`.
    pub fn member(target: Expr, member: MemberRef) -> Self {
        Expr::Member {
            target: Box::new(target),
            member,
        }
    }

    /// Logical negation.
    pub fn negate(operand: Expr) -> Self {
        Expr::Unary {
            op: UnaryOp::Not,
            operand: Box::new(operand),
        }
    }

    /// Converts `operand` to the nullable form of its type.
    pub fn lift(operand: Expr) -> Self {
        Expr::Unary {
            op: UnaryOp::Lift,
            operand: Box::new(operand),
        }
    }

    /// Binary node without operand coercion.
    pub fn binary_raw(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Binary node; operands that differ only in nullability are unified
    /// first (see [`coerce::unify`]).
    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        let (left, right) = coerce::unify(left, right);
        Expr::binary_raw(op, left, right)
    }

    pub fn equal(left: Expr, right: Expr) -> Self {
        Expr::binary(BinaryOp::Eq, left, right)
    }

    pub fn not_equal(left: Expr, right: Expr) -> Self {
        Expr::binary(BinaryOp::Ne, left, right)
    }

    pub fn less_than(left: Expr, right: Expr) -> Self {
        Expr::binary(BinaryOp::Lt, left, right)
    }

    pub fn less_or_equal(left: Expr, right: Expr) -> Self {
        Expr::binary(BinaryOp::Le, left, right)
    }

    pub fn greater_than(left: Expr, right: Expr) -> Self {
        Expr::binary(BinaryOp::Gt, left, right)
    }

    pub fn greater_or_equal(left: Expr, right: Expr) -> Self {
        Expr::binary(BinaryOp::Ge, left, right)
    }

    pub fn and_also(left: Expr, right: Expr) -> Self {
        Expr::binary_raw(BinaryOp::AndAlso, left, right)
    }

    pub fn or_else(left: Expr, right: Expr) -> Self {
        Expr::binary_raw(BinaryOp::OrElse, left, right)
    }

    /// Method call.
    pub fn call(method: Method, args: Vec<Expr>) -> Self {
        Expr::Call { method, args }
    }

    /// Static type of this node.
    pub fn value_type(&self) -> ValueType {
        match self {
            Expr::Parameter(p) => p.ty.clone(),
            Expr::Member { member, .. } => member.ty.clone(),
            Expr::Constant { ty, .. } => ty.clone(),
            Expr::Unary {
                op: UnaryOp::Not, ..
            } => ValueType::Bool,
            Expr::Unary {
                op: UnaryOp::Lift,
                operand,
            } => operand.value_type().nullable(),
            Expr::Binary { .. } => ValueType::Bool,
            Expr::Call {
                method: Method::Month,
                args,
            } => {
                let month = ValueType::Number(NumberKind::I32);
                match args.first() {
                    Some(arg) if arg.value_type().is_nullable() => month.nullable(),
                    _ => month,
                }
            }
            Expr::Call { .. } => ValueType::Bool,
        }
    }

    /// Returns `true` if this node yields a boolean.
    pub fn is_boolean(&self) -> bool {
        self.value_type().is_boolean()
    }
}

/// A parameter list and a body.
#[derive(Debug, Clone, PartialEq)]
pub struct Lambda {
    params: Vec<Parameter>,
    body: Expr,
}

impl Lambda {
    pub fn new(params: Vec<Parameter>, body: Expr) -> Self {
        Lambda { params, body }
    }

    /// Single-parameter lambda.
    pub fn unary(param: Parameter, body: Expr) -> Self {
        Lambda::new(vec![param], body)
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    pub fn body(&self) -> &Expr {
        &self.body
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Static type of the body.
    pub fn return_type(&self) -> ValueType {
        self.body.value_type()
    }

    /// Returns `true` if the body yields a boolean.
    pub fn is_predicate(&self) -> bool {
        self.body.is_boolean()
    }

    pub fn into_parts(self) -> (Vec<Parameter>, Expr) {
        (self.params, self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameters_have_distinct_identity() {
        let a = Parameter::new("p", ValueType::String);
        let b = Parameter::new("p", ValueType::String);
        assert_ne!(a.id(), b.id());
        assert_ne!(a, b);
        assert_eq!(a.fresh().name(), "p");
        assert_ne!(a.fresh().id(), a.id());
    }

    #[test]
    fn node_types() {
        let p = Parameter::new("n", ValueType::Number(NumberKind::I32).nullable());
        let cmp = Expr::greater_than(Expr::param(&p), Expr::constant(3i32));
        assert_eq!(cmp.value_type(), ValueType::Bool);

        let month = Expr::call(
            Method::Month,
            vec![Expr::param(&Parameter::new("d", ValueType::Date))],
        );
        assert_eq!(month.value_type(), ValueType::Number(NumberKind::I32));

        let lifted = Expr::lift(Expr::constant(1i64));
        assert_eq!(
            lifted.value_type(),
            ValueType::Number(NumberKind::I64).nullable()
        );
    }

    #[test]
    fn binary_unifies_nullable_operands() {
        let p = Parameter::new("n", ValueType::Number(NumberKind::I32).nullable());
        let cmp = Expr::equal(Expr::param(&p), Expr::constant(3i32));
        match cmp {
            Expr::Binary { right, .. } => assert!(matches!(
                *right,
                Expr::Unary {
                    op: UnaryOp::Lift,
                    ..
                }
            )),
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn lambda_shape() {
        let p = Parameter::new("s", ValueType::String);
        let lambda = Lambda::unary(
            p.clone(),
            Expr::call(Method::Contains, vec![Expr::param(&p), Expr::constant("x")]),
        );
        assert_eq!(lambda.arity(), 1);
        assert!(lambda.is_predicate());
        assert_eq!(lambda.params()[0], p);
    }
}
