//! Typed wrappers over single-parameter lambdas.
//!
//! A [`Predicate<T>`] is a boolean lambda over one record of type `T`; a
//! [`KeySelector<T>`] reads a sortable value from one. Both are checked when
//! built from a raw [`Lambda`], so evaluating them only fails on trees that
//! read a property the record cannot provide.

use std::fmt;
use std::marker::PhantomData;

use tracing::debug;

use crate::algebra;
use crate::error::{Result, SieveError};
use crate::expr::render::SqlTranslator;
use crate::expr::{BinaryOp, Expr, Lambda, Operand, Parameter};
use crate::registry::Accessor;
use crate::types::ValueType;
use crate::value::Value;

fn check_record_lambda<T: 'static>(lambda: &Lambda) -> Result<()> {
    if lambda.arity() != 1 {
        return Err(SieveError::InvalidPredicate(format!(
            "`{}` takes {} parameters, expected 1",
            lambda,
            lambda.arity()
        )));
    }
    let expected = ValueType::record::<T>();
    let actual = lambda.params()[0].value_type();
    if *actual != expected {
        return Err(SieveError::InvalidPredicate(format!(
            "`{}` takes {}, expected {}",
            lambda, actual, expected
        )));
    }
    Ok(())
}

/// A boolean lambda over one `T`.
pub struct Predicate<T> {
    lambda: Lambda,
    _record: PhantomData<fn(&T) -> bool>,
}

impl<T: 'static> Predicate<T> {
    /// Wraps a lambda, checking it takes one `T` and returns a boolean.
    pub fn new(lambda: Lambda) -> Result<Self> {
        check_record_lambda::<T>(&lambda)?;
        if !lambda.is_predicate() {
            return Err(SieveError::InvalidPredicate(format!(
                "`{}` returns {}, not bool",
                lambda,
                lambda.return_type()
            )));
        }
        Ok(Self::from_lambda(lambda))
    }

    pub(crate) fn from_lambda(lambda: Lambda) -> Self {
        Predicate {
            lambda,
            _record: PhantomData,
        }
    }

    /// A predicate that always yields `value`.
    pub fn constant(value: bool) -> Self {
        Self::from_lambda(Lambda::unary(Parameter::of::<T>("p"), Expr::constant(value)))
    }

    pub fn lambda(&self) -> &Lambda {
        &self.lambda
    }

    pub fn into_lambda(self) -> Lambda {
        self.lambda
    }

    pub fn param(&self) -> &Parameter {
        &self.lambda.params()[0]
    }

    /// Evaluates the predicate against one record.
    pub fn evaluate(&self, record: &T) -> Result<bool> {
        self.lambda.test(vec![Operand::record(record)])
    }

    /// Like [`evaluate`](Self::evaluate), treating evaluation errors as
    /// "not satisfied".
    pub fn is_satisfied_by(&self, record: &T) -> bool {
        self.evaluate(record).unwrap_or_else(|err| {
            debug!(predicate = %self.lambda, error = %err, "predicate evaluation failed");
            false
        })
    }

    pub fn and(&self, other: &Predicate<T>) -> Predicate<T> {
        Self::from_lambda(algebra::merge_unchecked(
            BinaryOp::AndAlso,
            &self.lambda,
            &other.lambda,
        ))
    }

    pub fn or(&self, other: &Predicate<T>) -> Predicate<T> {
        Self::from_lambda(algebra::merge_unchecked(
            BinaryOp::OrElse,
            &self.lambda,
            &other.lambda,
        ))
    }

    pub fn negate(&self) -> Predicate<T> {
        Self::from_lambda(Lambda::new(
            self.lambda.params().to_vec(),
            Expr::negate(self.lambda.body().clone()),
        ))
    }

    /// Compiles the predicate into a plain closure.
    pub fn compile(&self) -> impl Fn(&T) -> bool + Send + Sync + 'static {
        let predicate = self.clone();
        move |record: &T| predicate.is_satisfied_by(record)
    }

    /// Renders the predicate as a SQL `WHERE` condition.
    pub fn to_sql(&self) -> Result<String> {
        SqlTranslator::new().condition(&self.lambda)
    }
}

impl<T> Clone for Predicate<T> {
    fn clone(&self) -> Self {
        Predicate {
            lambda: self.lambda.clone(),
            _record: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Predicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Predicate").field(&self.lambda).finish()
    }
}

impl<T> fmt::Display for Predicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.lambda)
    }
}

/// A lambda reading a sort key from one `T`.
pub struct KeySelector<T> {
    lambda: Lambda,
    _record: PhantomData<fn(&T) -> Value>,
}

impl<T: 'static> KeySelector<T> {
    /// Wraps a lambda, checking it takes one `T`.
    pub fn new(lambda: Lambda) -> Result<Self> {
        check_record_lambda::<T>(&lambda)?;
        Ok(Self::from_lambda(lambda))
    }

    pub(crate) fn from_lambda(lambda: Lambda) -> Self {
        KeySelector {
            lambda,
            _record: PhantomData,
        }
    }

    pub(crate) fn from_accessor(accessor: Accessor) -> Self {
        Self::from_lambda(accessor.lambda().clone())
    }

    pub fn lambda(&self) -> &Lambda {
        &self.lambda
    }

    /// Reads the key of one record.
    pub fn key(&self, record: &T) -> Result<Value> {
        self.lambda.call(vec![Operand::record(record)])?.into_value()
    }

    /// Renders the key as a SQL `ORDER BY` term.
    pub fn to_sql(&self) -> Result<String> {
        SqlTranslator::new().key(&self.lambda)
    }
}

impl<T> Clone for KeySelector<T> {
    fn clone(&self) -> Self {
        KeySelector {
            lambda: self.lambda.clone(),
            _record: PhantomData,
        }
    }
}

impl<T> fmt::Debug for KeySelector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("KeySelector").field(&self.lambda).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Field, Property, Record};
    use crate::registry::AccessorRegistry;

    struct Book {
        title: String,
        pages: u32,
    }

    impl Record for Book {
        fn properties() -> Result<Vec<Property<Self>>> {
            Ok(vec![
                Property::new("title", String::value_type(), |b: &Book| b.title.to_value()),
                Property::new("pages", u32::value_type(), |b: &Book| b.pages.to_value()),
            ])
        }
    }

    fn book(title: &str, pages: u32) -> Book {
        Book {
            title: title.to_string(),
            pages,
        }
    }

    fn longer_than(registry: &AccessorRegistry, pages: u32) -> Predicate<Book> {
        let accessor = registry.get::<Book>("pages").unwrap();
        let body = Expr::greater_than(accessor.body().clone(), Expr::constant(pages));
        Predicate::new(Lambda::unary(accessor.param().clone(), body)).unwrap()
    }

    #[test]
    fn evaluate_and_combine() {
        let registry = AccessorRegistry::new();
        let long = longer_than(&registry, 300);
        let very_long = longer_than(&registry, 800);

        let tome = book("Tome", 900);
        let novel = book("Novel", 350);
        let pamphlet = book("Pamphlet", 12);

        assert!(long.evaluate(&novel).unwrap());
        assert!(!long.is_satisfied_by(&pamphlet));

        let middling = long.and(&very_long.negate());
        assert!(middling.is_satisfied_by(&novel));
        assert!(!middling.is_satisfied_by(&tome));

        let extremes = very_long.or(&long.negate());
        assert!(extremes.is_satisfied_by(&tome));
        assert!(extremes.is_satisfied_by(&pamphlet));
        assert!(!extremes.is_satisfied_by(&novel));
    }

    #[test]
    fn compiled_closure() {
        let registry = AccessorRegistry::new();
        let long = longer_than(&registry, 300).compile();
        let books = [book("a", 100), book("b", 400)];
        let titles: Vec<&str> = books
            .iter()
            .filter(|b| long(b))
            .map(|b| b.title.as_str())
            .collect();
        assert_eq!(titles, vec!["b"]);
    }

    #[test]
    fn rejects_wrong_shapes() {
        let p = Parameter::of::<Book>("p");
        let not_bool = Lambda::unary(p.clone(), Expr::constant(3i32));
        assert!(matches!(
            Predicate::<Book>::new(not_bool),
            Err(SieveError::InvalidPredicate(_))
        ));

        let wrong_record = Lambda::unary(Parameter::of::<String>("s"), Expr::constant(true));
        assert!(Predicate::<Book>::new(wrong_record).is_err());

        let two = Lambda::new(vec![p.clone(), p.fresh()], Expr::constant(true));
        assert!(Predicate::<Book>::new(two).is_err());
    }

    #[test]
    fn constant_predicates() {
        let b = book("x", 1);
        assert!(Predicate::<Book>::constant(true).is_satisfied_by(&b));
        assert!(!Predicate::<Book>::constant(false).is_satisfied_by(&b));
    }

    #[test]
    fn key_selector_reads_values() {
        let registry = AccessorRegistry::new();
        let key = KeySelector::<Book>::from_accessor(registry.get::<Book>("title").unwrap());
        assert_eq!(key.key(&book("Dune", 600)).unwrap(), Value::from("Dune"));
        assert_eq!(key.to_sql().unwrap(), "\"title\"");
    }

    #[test]
    fn sql_rendering() {
        let registry = AccessorRegistry::new();
        assert_eq!(
            longer_than(&registry, 300).to_sql().unwrap(),
            "(\"pages\" > 300)"
        );
    }
}
