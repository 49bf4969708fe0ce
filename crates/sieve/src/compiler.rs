//! Compiling filter specifications into predicates.
//!
//! The compiler resolves the property through the accessor registry, then
//! picks a comparison rule from the runtime shape of the filter value and
//! the static type of the property:
//!
//! | Value | Property | Comparisons |
//! |-------|----------|-------------|
//! | text | string | `eq`, `ne`, `contains`, `startswith`, `endswith` and negations |
//! | bool or text | bool | `eq`, `ne` |
//! | number or text | number | `eq`, `ne`, `lt`, `lte`, `gt`, `gte` |
//! | date or text | date | `eq`, `ne`, `lt`, `lte`, `gt`, `gte` |
//! | int list | number | `in` |
//! | int list | date | `monthin` |
//! | text list | string | `in` |
//!
//! Nullable properties classify by their base type. Anything else is
//! dropped: the caller gets a [`DropReason`] and the source stays as it
//! was. A literal that does not parse as the property type is an error.

use std::fmt;

use tracing::debug;

use crate::error::Result;
use crate::expr::{Expr, Lambda, Method};
use crate::kind::ComparisonKind;
use crate::literal::{coerce_number, parse_bool, parse_date, parse_number};
use crate::predicate::Predicate;
use crate::record::Record;
use crate::registry::AccessorRegistry;
use crate::spec_types::{FilterSpec, FilterValue};
use crate::types::ValueType;
use crate::value::Value;

/// Why a filter compiled to nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum DropReason {
    /// The record type has no property with this name.
    UnresolvedField(String),
    /// The comparison does not apply to the property type.
    UnsupportedComparison {
        comparison: ComparisonKind,
        property_type: ValueType,
    },
    /// The filter value cannot be compared with the property type.
    TypeMismatch {
        value: &'static str,
        property_type: ValueType,
    },
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::UnresolvedField(name) => write!(f, "no property named '{}'", name),
            DropReason::UnsupportedComparison {
                comparison,
                property_type,
            } => write!(f, "'{}' does not apply to {}", comparison, property_type),
            DropReason::TypeMismatch {
                value,
                property_type,
            } => write!(f, "{} value cannot be compared with {}", value, property_type),
        }
    }
}

/// Result of compiling one filter.
pub enum Compiled<T> {
    Ready(Predicate<T>),
    Dropped(DropReason),
}

impl<T> Clone for Compiled<T> {
    fn clone(&self) -> Self {
        match self {
            Compiled::Ready(predicate) => Compiled::Ready(predicate.clone()),
            Compiled::Dropped(reason) => Compiled::Dropped(reason.clone()),
        }
    }
}

impl<T> fmt::Debug for Compiled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compiled::Ready(predicate) => f.debug_tuple("Ready").field(predicate).finish(),
            Compiled::Dropped(reason) => f.debug_tuple("Dropped").field(reason).finish(),
        }
    }
}

impl<T> Compiled<T> {
    /// The predicate, or `None` if the filter was dropped.
    pub fn into_predicate(self) -> Option<Predicate<T>> {
        match self {
            Compiled::Ready(predicate) => Some(predicate),
            Compiled::Dropped(_) => None,
        }
    }

    pub fn is_dropped(&self) -> bool {
        matches!(self, Compiled::Dropped(_))
    }

    pub fn drop_reason(&self) -> Option<&DropReason> {
        match self {
            Compiled::Ready(_) => None,
            Compiled::Dropped(reason) => Some(reason),
        }
    }
}

type Outcome = std::result::Result<Expr, DropReason>;

/// Builds predicates from filter specifications.
#[derive(Debug, Clone, Copy)]
pub struct PredicateCompiler<'r> {
    registry: &'r AccessorRegistry,
}

impl PredicateCompiler<'static> {
    /// A compiler over the global registry.
    pub fn global() -> Self {
        PredicateCompiler::new(AccessorRegistry::global())
    }
}

impl<'r> PredicateCompiler<'r> {
    pub fn new(registry: &'r AccessorRegistry) -> Self {
        PredicateCompiler { registry }
    }

    pub fn registry(&self) -> &'r AccessorRegistry {
        self.registry
    }

    /// Compiles one filter.
    pub fn compile<T: Record>(&self, spec: &FilterSpec) -> Result<Compiled<T>> {
        self.compile_parts(spec.property(), spec.comparison(), spec.value())
    }

    /// Compiles a filter given as its parts. `None` or a blank property
    /// compares the record itself.
    pub fn compile_parts<T: Record>(
        &self,
        property: Option<&str>,
        comparison: ComparisonKind,
        value: &FilterValue,
    ) -> Result<Compiled<T>> {
        let compiled = match self.registry.resolve::<T>(property) {
            None => Compiled::Dropped(DropReason::UnresolvedField(
                property.unwrap_or_default().to_string(),
            )),
            Some(accessor) => {
                let (params, left) = accessor.lambda().clone().into_parts();
                match comparison_body(left, comparison, value)? {
                    Ok(body) => Compiled::Ready(Predicate::from_lambda(Lambda::new(params, body))),
                    Err(reason) => Compiled::Dropped(reason),
                }
            }
        };

        match &compiled {
            Compiled::Dropped(reason) => debug!(
                type_name = std::any::type_name::<T>(),
                property = property.unwrap_or(""),
                comparison = %comparison,
                value = %value,
                %reason,
                "filter dropped"
            ),
            Compiled::Ready(predicate) => debug!(
                type_name = std::any::type_name::<T>(),
                predicate = %predicate,
                "filter compiled"
            ),
        }
        Ok(compiled)
    }

    /// Compiles filters into their conjunction, skipping dropped ones.
    ///
    /// Returns `None` if every filter was dropped (or there were none).
    pub fn compile_all<T: Record>(&self, specs: &[FilterSpec]) -> Result<Option<Predicate<T>>> {
        let mut combined: Option<Predicate<T>> = None;
        for spec in specs {
            if let Some(predicate) = self.compile::<T>(spec)?.into_predicate() {
                combined = Some(match combined {
                    Some(acc) => acc.and(&predicate),
                    None => predicate,
                });
            }
        }
        Ok(combined)
    }
}

fn comparison_body(left: Expr, comparison: ComparisonKind, value: &FilterValue) -> Result<Outcome> {
    let left_ty = left.value_type();
    let base = left_ty.non_nullable().clone();

    match (value, &base) {
        (FilterValue::Text(text), ValueType::String) => Ok(string_comparison(left, comparison, text)),

        (FilterValue::Bool(b), ValueType::Bool) => Ok(bool_comparison(left, comparison, *b)),
        (FilterValue::Text(text), ValueType::Bool) => {
            let b = parse_bool(text)?;
            Ok(bool_comparison(left, comparison, b))
        }

        // Literals are coerced before the comparison is checked, so a bad
        // literal fails even when the comparison would have been dropped.
        (FilterValue::Number(n), ValueType::Number(kind)) => {
            let n = coerce_number(*n, *kind)?;
            Ok(ordering_comparison(left, comparison, Value::Number(n)))
        }
        (FilterValue::Text(text), ValueType::Number(kind)) => {
            let n = parse_number(text, *kind)?;
            Ok(ordering_comparison(left, comparison, Value::Number(n)))
        }

        (FilterValue::Date(d), ValueType::Date) => {
            Ok(ordering_comparison(left, comparison, Value::Date(*d)))
        }
        (FilterValue::Text(text), ValueType::Date) => {
            let d = parse_date(text)?;
            Ok(ordering_comparison(left, comparison, Value::Date(d)))
        }

        (FilterValue::IntList(items), ValueType::Number(_)) => Ok(match comparison {
            ComparisonKind::IsIn => Ok(in_set(Value::IntSeq(items.clone()), left)),
            _ => unsupported(comparison, &left_ty),
        }),
        (FilterValue::IntList(items), ValueType::Date) => Ok(match comparison {
            ComparisonKind::MonthIsIn => {
                let month = Expr::call(Method::Month, vec![left]);
                Ok(in_set(Value::IntSeq(items.clone()), month))
            }
            _ => unsupported(comparison, &left_ty),
        }),
        (FilterValue::TextList(items), ValueType::String) => Ok(match comparison {
            ComparisonKind::IsIn => Ok(in_set(Value::StrSeq(items.clone()), left)),
            _ => unsupported(comparison, &left_ty),
        }),

        _ => Ok(Err(DropReason::TypeMismatch {
            value: value.kind_name(),
            property_type: left_ty,
        })),
    }
}

fn unsupported(comparison: ComparisonKind, property_type: &ValueType) -> Outcome {
    Err(DropReason::UnsupportedComparison {
        comparison,
        property_type: property_type.clone(),
    })
}

fn string_comparison(left: Expr, comparison: ComparisonKind, text: &str) -> Outcome {
    let right = Expr::constant(text);
    let method = match comparison {
        ComparisonKind::Equals => return Ok(Expr::equal(left, right)),
        ComparisonKind::NotEquals => return Ok(Expr::not_equal(left, right)),
        ComparisonKind::Contains | ComparisonKind::NotContains => Method::Contains,
        ComparisonKind::StartsWith | ComparisonKind::NotStartsWith => Method::StartsWith,
        ComparisonKind::EndsWith | ComparisonKind::NotEndsWith => Method::EndsWith,
        other => return unsupported(other, &left.value_type()),
    };
    let call = Expr::call(method, vec![left, right]);
    Ok(if comparison.is_negated() {
        Expr::negate(call)
    } else {
        call
    })
}

fn bool_comparison(left: Expr, comparison: ComparisonKind, value: bool) -> Outcome {
    match comparison {
        ComparisonKind::Equals => Ok(Expr::equal(left, Expr::constant(value))),
        ComparisonKind::NotEquals => Ok(Expr::not_equal(left, Expr::constant(value))),
        other => unsupported(other, &left.value_type()),
    }
}

fn ordering_comparison(left: Expr, comparison: ComparisonKind, value: Value) -> Outcome {
    match comparison.ordering_op() {
        Some(op) => Ok(Expr::binary(op, left, Expr::constant(value))),
        None => unsupported(comparison, &left.value_type()),
    }
}

fn in_set(set: Value, item: Expr) -> Expr {
    Expr::call(Method::InSet, vec![Expr::constant(set), item])
}
