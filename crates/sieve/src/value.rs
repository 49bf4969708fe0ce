//! Runtime values produced by property reads and held by constants.
//!
//! [`Value`] owns its data: constants live inside expression trees that
//! outlive any single record. [`Number`] keeps the exact numeric subtype so
//! a literal coerced to a `u8` property stays a `u8`.

use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDateTime;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::types::{NumberKind, ValueType};

/// Format used when rendering dates.
pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Runtime value of a property, constant or intermediate result.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent value of a nullable property.
    Null,
    /// String value.
    String(String),
    /// Boolean value.
    Bool(bool),
    /// Numeric value.
    Number(Number),
    /// Date and time value.
    Date(NaiveDateTime),
    /// Sequence of integers (the right-hand side of `IsIn`/`MonthIsIn`).
    IntSeq(Vec<i64>),
    /// Sequence of strings (the right-hand side of `IsIn`).
    StrSeq(Vec<String>),
}

impl Value {
    /// Returns `true` if this is `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the non-nullable type of this value, or `None` for `Null`.
    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            Value::Null => None,
            Value::String(_) => Some(ValueType::String),
            Value::Bool(_) => Some(ValueType::Bool),
            Value::Number(n) => Some(ValueType::Number(n.kind())),
            Value::Date(_) => Some(ValueType::Date),
            Value::IntSeq(_) => Some(ValueType::IntSeq),
            Value::StrSeq(_) => Some(ValueType::StrSeq),
        }
    }

    /// Extracts the string value, if present.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Extracts the boolean value, if present.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Extracts the number value, if present.
    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Extracts the date value, if present.
    pub fn as_date(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Equality with null semantics: null equals only null.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Null, _) | (_, Value::Null) => false,
            (Value::IntSeq(a), Value::IntSeq(b)) => a == b,
            (Value::StrSeq(a), Value::StrSeq(b)) => a == b,
            _ => compare_values(self, other) == Some(Ordering::Equal),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::Date(d) => write!(f, "#{}#", d.format(DATE_FORMAT)),
            Value::IntSeq(items) => {
                let parts: Vec<String> = items.iter().map(|i| i.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Value::StrSeq(items) => {
                let parts: Vec<String> = items.iter().map(|s| format!("{:?}", s)).collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::Number(n)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(d: NaiveDateTime) -> Self {
        Value::Date(d)
    }
}

impl From<Vec<i64>> for Value {
    fn from(items: Vec<i64>) -> Self {
        Value::IntSeq(items)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::StrSeq(items)
    }
}

/// Numeric value that remembers its exact subtype.
///
/// Comparisons between different subtypes are exact for integers and
/// decimals, and fall back to `f64` when a float is involved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Decimal(Decimal),
}

impl Number {
    /// Returns the subtype of this number.
    pub fn kind(self) -> NumberKind {
        match self {
            Number::I8(_) => NumberKind::I8,
            Number::I16(_) => NumberKind::I16,
            Number::I32(_) => NumberKind::I32,
            Number::I64(_) => NumberKind::I64,
            Number::U8(_) => NumberKind::U8,
            Number::U16(_) => NumberKind::U16,
            Number::U32(_) => NumberKind::U32,
            Number::U64(_) => NumberKind::U64,
            Number::F32(_) => NumberKind::F32,
            Number::F64(_) => NumberKind::F64,
            Number::Decimal(_) => NumberKind::Decimal,
        }
    }

    /// Returns the integer value, or `None` for floats and decimals.
    pub fn to_i128(self) -> Option<i128> {
        match self {
            Number::I8(n) => Some(n.into()),
            Number::I16(n) => Some(n.into()),
            Number::I32(n) => Some(n.into()),
            Number::I64(n) => Some(n.into()),
            Number::U8(n) => Some(n.into()),
            Number::U16(n) => Some(n.into()),
            Number::U32(n) => Some(n.into()),
            Number::U64(n) => Some(n.into()),
            Number::F32(_) | Number::F64(_) | Number::Decimal(_) => None,
        }
    }

    /// Converts the number to f64 for comparison.
    pub fn to_f64(self) -> f64 {
        match self {
            Number::F32(n) => n.into(),
            Number::F64(n) => n,
            Number::Decimal(d) => d.to_f64().unwrap_or(f64::NAN),
            other => other.to_i128().map_or(f64::NAN, |n| n as f64),
        }
    }

    /// Converts the number to a decimal, or `None` for non-finite floats.
    pub fn to_decimal(self) -> Option<Decimal> {
        match self {
            Number::I8(n) => Some(Decimal::from(n)),
            Number::I16(n) => Some(Decimal::from(n)),
            Number::I32(n) => Some(Decimal::from(n)),
            Number::I64(n) => Some(Decimal::from(n)),
            Number::U8(n) => Some(Decimal::from(n)),
            Number::U16(n) => Some(Decimal::from(n)),
            Number::U32(n) => Some(Decimal::from(n)),
            Number::U64(n) => Some(Decimal::from(n)),
            Number::F32(n) => Decimal::try_from(n).ok(),
            Number::F64(n) => Decimal::try_from(n).ok(),
            Number::Decimal(d) => Some(d),
        }
    }

    fn is_float(self) -> bool {
        matches!(self, Number::F32(_) | Number::F64(_))
    }

    /// Compares two numbers, handling mixed subtypes.
    pub fn compare(self, other: Number) -> Option<Ordering> {
        if let (Some(a), Some(b)) = (self.to_i128(), other.to_i128()) {
            return Some(a.cmp(&b));
        }
        if self.is_float() || other.is_float() {
            return self.to_f64().partial_cmp(&other.to_f64());
        }
        // At least one decimal, no floats: exact comparison.
        match (self.to_decimal(), other.to_decimal()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => None,
        }
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.compare(*other)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::I8(n) => write!(f, "{}", n),
            Number::I16(n) => write!(f, "{}", n),
            Number::I32(n) => write!(f, "{}", n),
            Number::I64(n) => write!(f, "{}", n),
            Number::U8(n) => write!(f, "{}", n),
            Number::U16(n) => write!(f, "{}", n),
            Number::U32(n) => write!(f, "{}", n),
            Number::U64(n) => write!(f, "{}", n),
            Number::F32(n) => write!(f, "{}", n),
            Number::F64(n) => write!(f, "{}", n),
            Number::Decimal(d) => write!(f, "{}", d),
        }
    }
}

macro_rules! number_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Number {
                fn from(n: $ty) -> Self {
                    Number::$variant(n)
                }
            }

            impl From<$ty> for Value {
                fn from(n: $ty) -> Self {
                    Value::Number(Number::$variant(n))
                }
            }
        )*
    };
}

number_from! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    Decimal => Decimal,
}

/// Compares two values of the same type.
///
/// Nulls sort last. Returns `None` if the types don't match or comparison
/// is not possible (NaN).
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Number(a), Value::Number(b)) => a.compare(*b),
        (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),

        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Null, _) => Some(Ordering::Greater),
        (_, Value::Null) => Some(Ordering::Less),

        _ => None,
    }
}
