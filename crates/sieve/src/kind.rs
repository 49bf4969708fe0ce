//! Comparison kinds for filter specifications.
//!
//! The [`ComparisonKind`] enum is closed: the compiler decides per property
//! type which kinds apply, and drops a filter whose kind does not fit.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::SieveError;
use crate::expr::BinaryOp;

/// Comparison requested by a filter.
///
/// Kinds are grouped by the property types they support:
/// - **String**: `Equals`, `NotEquals`, `Contains`, `StartsWith`,
///   `EndsWith` and their `Not*` negations
/// - **Boolean**: `Equals`, `NotEquals`
/// - **Numeric/Date**: `Equals`, `NotEquals`, `LessThan`, `LessOrEqual`,
///   `GreaterThan`, `GreaterOrEqual`
/// - **Set membership**: `IsIn` (integers, strings), `MonthIsIn` (dates)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonKind {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    StartsWith,
    NotStartsWith,
    EndsWith,
    NotEndsWith,
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
    /// Value is one of the given set.
    IsIn,
    /// Month of a date is one of the given set (1 = January).
    MonthIsIn,
}

impl ComparisonKind {
    /// All kinds, in declaration order.
    pub const ALL: [ComparisonKind; 14] = [
        ComparisonKind::Equals,
        ComparisonKind::NotEquals,
        ComparisonKind::Contains,
        ComparisonKind::NotContains,
        ComparisonKind::StartsWith,
        ComparisonKind::NotStartsWith,
        ComparisonKind::EndsWith,
        ComparisonKind::NotEndsWith,
        ComparisonKind::LessThan,
        ComparisonKind::LessOrEqual,
        ComparisonKind::GreaterThan,
        ComparisonKind::GreaterOrEqual,
        ComparisonKind::IsIn,
        ComparisonKind::MonthIsIn,
    ];

    /// Returns `true` if this kind is valid for string properties.
    pub fn is_string_kind(self) -> bool {
        matches!(
            self,
            ComparisonKind::Equals
                | ComparisonKind::NotEquals
                | ComparisonKind::Contains
                | ComparisonKind::NotContains
                | ComparisonKind::StartsWith
                | ComparisonKind::NotStartsWith
                | ComparisonKind::EndsWith
                | ComparisonKind::NotEndsWith
        )
    }

    /// Returns `true` if this kind is valid for boolean properties.
    pub fn is_bool_kind(self) -> bool {
        matches!(self, ComparisonKind::Equals | ComparisonKind::NotEquals)
    }

    /// Returns `true` if this kind is valid for numeric and date properties.
    pub fn is_ordering_kind(self) -> bool {
        self.ordering_op().is_some()
    }

    /// Returns `true` for the negated string kinds (`NotContains`, ...).
    pub fn is_negated(self) -> bool {
        matches!(
            self,
            ComparisonKind::NotContains | ComparisonKind::NotStartsWith | ComparisonKind::NotEndsWith
        )
    }

    /// Maps equality and ordering kinds to their binary operator.
    pub fn ordering_op(self) -> Option<BinaryOp> {
        match self {
            ComparisonKind::Equals => Some(BinaryOp::Eq),
            ComparisonKind::NotEquals => Some(BinaryOp::Ne),
            ComparisonKind::LessThan => Some(BinaryOp::Lt),
            ComparisonKind::LessOrEqual => Some(BinaryOp::Le),
            ComparisonKind::GreaterThan => Some(BinaryOp::Gt),
            ComparisonKind::GreaterOrEqual => Some(BinaryOp::Ge),
            _ => None,
        }
    }

    /// Returns the short name used in textual filters.
    pub fn as_str(self) -> &'static str {
        match self {
            ComparisonKind::Equals => "eq",
            ComparisonKind::NotEquals => "ne",
            ComparisonKind::Contains => "contains",
            ComparisonKind::NotContains => "ncontains",
            ComparisonKind::StartsWith => "startswith",
            ComparisonKind::NotStartsWith => "nstartswith",
            ComparisonKind::EndsWith => "endswith",
            ComparisonKind::NotEndsWith => "nendswith",
            ComparisonKind::LessThan => "lt",
            ComparisonKind::LessOrEqual => "lte",
            ComparisonKind::GreaterThan => "gt",
            ComparisonKind::GreaterOrEqual => "gte",
            ComparisonKind::IsIn => "in",
            ComparisonKind::MonthIsIn => "monthin",
        }
    }
}

impl fmt::Display for ComparisonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ComparisonKind {
    type Err = SieveError;

    /// Accepts short names (`gte`), symbols (`>=`) and long names
    /// (`GreaterOrEquals`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.trim().to_ascii_lowercase().as_str() {
            "eq" | "=" | "==" | "equals" => ComparisonKind::Equals,
            "ne" | "!=" | "<>" | "notequals" => ComparisonKind::NotEquals,
            "contains" => ComparisonKind::Contains,
            "ncontains" | "notcontains" => ComparisonKind::NotContains,
            "startswith" => ComparisonKind::StartsWith,
            "nstartswith" | "notstartswith" => ComparisonKind::NotStartsWith,
            "endswith" => ComparisonKind::EndsWith,
            "nendswith" | "notendswith" => ComparisonKind::NotEndsWith,
            "lt" | "<" | "lessthan" | "lesserthan" => ComparisonKind::LessThan,
            "lte" | "<=" | "lessorequal" | "lesserorequals" => ComparisonKind::LessOrEqual,
            "gt" | ">" | "greaterthan" => ComparisonKind::GreaterThan,
            "gte" | ">=" | "greaterorequal" | "greaterorequals" => ComparisonKind::GreaterOrEqual,
            "in" | "isin" => ComparisonKind::IsIn,
            "monthin" | "monthisin" => ComparisonKind::MonthIsIn,
            _ => return Err(SieveError::UnknownComparison(s.to_string())),
        };
        Ok(kind)
    }
}

impl Serialize for ComparisonKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ComparisonKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}
