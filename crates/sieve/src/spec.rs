//! Specifications: named, combinable business rules over a record type.
//!
//! A [`Spec<T>`] owns one predicate. Combination is done with the named
//! methods of [`Specification`]; `&`, `|` and `!` are shorthand for them.
//!
//! ```
//! use sieve::{ComparisonKind, FilterSpec, Spec, Specification};
//!
//! let small = Spec::<i32>::from_filter(&FilterSpec::on_self(ComparisonKind::LessThan, 10)).unwrap();
//! let even = Spec::<i32>::from_filter(&":in:0,2,4,6,8,10,12".parse().unwrap()).unwrap();
//!
//! let small_odd = small.and(&even.negate());
//! assert!(small_odd.is_satisfied_by(&3));
//! assert!(!small_odd.is_satisfied_by(&4));
//! assert!((small | even).is_satisfied_by(&12));
//! ```

use std::fmt;
use std::ops::{BitAnd, BitOr, Not};

use crate::compiler::PredicateCompiler;
use crate::error::Result;
use crate::expr::Lambda;
use crate::predicate::Predicate;
use crate::record::Record;
use crate::source::QuerySource;
use crate::spec_types::FilterSpec;

/// A rule a record of type `T` either satisfies or not.
pub trait Specification<T: 'static> {
    fn predicate(&self) -> &Predicate<T>;

    fn is_satisfied_by(&self, record: &T) -> bool {
        self.predicate().is_satisfied_by(record)
    }

    fn and(&self, other: &dyn Specification<T>) -> Spec<T> {
        Spec::from_predicate(self.predicate().and(other.predicate()))
    }

    fn or(&self, other: &dyn Specification<T>) -> Spec<T> {
        Spec::from_predicate(self.predicate().or(other.predicate()))
    }

    fn negate(&self) -> Spec<T> {
        Spec::from_predicate(self.predicate().negate())
    }

    /// Filters `source` by this rule.
    fn apply<S: QuerySource<T>>(&self, source: S) -> Result<S>
    where
        Self: Sized,
    {
        source.filter(self.predicate())
    }
}

/// A specification backed by one predicate.
pub struct Spec<T> {
    predicate: Predicate<T>,
}

impl<T: 'static> Spec<T> {
    /// Builds a specification from a lambda over one `T` returning bool.
    pub fn new(lambda: Lambda) -> Result<Self> {
        Ok(Self::from_predicate(Predicate::new(lambda)?))
    }

    pub fn from_predicate(predicate: Predicate<T>) -> Self {
        Spec { predicate }
    }

    /// A specification every record satisfies.
    pub fn any() -> Self {
        Self::from_predicate(Predicate::constant(true))
    }

    pub fn into_predicate(self) -> Predicate<T> {
        self.predicate
    }
}

impl<T: Record> Spec<T> {
    /// Compiles a filter through the global registry.
    ///
    /// A filter the record type cannot support yields [`Spec::any`],
    /// matching the pipeline, which leaves the source unchanged.
    pub fn from_filter(spec: &FilterSpec) -> Result<Self> {
        Self::from_filter_with(&PredicateCompiler::global(), spec)
    }

    pub fn from_filter_with(compiler: &PredicateCompiler<'_>, spec: &FilterSpec) -> Result<Self> {
        Ok(compiler
            .compile::<T>(spec)?
            .into_predicate()
            .map_or_else(Self::any, Self::from_predicate))
    }
}

impl<T: 'static> Specification<T> for Spec<T> {
    fn predicate(&self) -> &Predicate<T> {
        &self.predicate
    }
}

impl<T: 'static> Specification<T> for Predicate<T> {
    fn predicate(&self) -> &Predicate<T> {
        self
    }
}

impl<T> Clone for Spec<T> {
    fn clone(&self) -> Self {
        Spec {
            predicate: self.predicate.clone(),
        }
    }
}

impl<T> fmt::Debug for Spec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Spec").field(&self.predicate).finish()
    }
}

impl<T> fmt::Display for Spec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.predicate)
    }
}

impl<T: 'static> BitAnd for Spec<T> {
    type Output = Spec<T>;

    fn bitand(self, rhs: Spec<T>) -> Spec<T> {
        Specification::and(&self, &rhs)
    }
}

impl<T: 'static> BitOr for Spec<T> {
    type Output = Spec<T>;

    fn bitor(self, rhs: Spec<T>) -> Spec<T> {
        Specification::or(&self, &rhs)
    }
}

impl<T: 'static> Not for Spec<T> {
    type Output = Spec<T>;

    fn not(self) -> Spec<T> {
        self.negate()
    }
}

impl<T: 'static> BitAnd for &Spec<T> {
    type Output = Spec<T>;

    fn bitand(self, rhs: &Spec<T>) -> Spec<T> {
        Specification::and(self, rhs)
    }
}

impl<T: 'static> BitOr for &Spec<T> {
    type Output = Spec<T>;

    fn bitor(self, rhs: &Spec<T>) -> Spec<T> {
        Specification::or(self, rhs)
    }
}

impl<T: 'static> Not for &Spec<T> {
    type Output = Spec<T>;

    fn not(self) -> Spec<T> {
        self.negate()
    }
}
