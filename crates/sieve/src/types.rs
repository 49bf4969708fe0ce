//! Static value types and the classification helpers the compiler uses to
//! pick a comparison rule.
//!
//! Every expression node has a [`ValueType`]. Nullable types classify by
//! their base type, so `Option<i32>` is still "integer" and "numeric".

use std::fmt;

/// Exact numeric subtype of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumberKind {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Decimal,
}

impl NumberKind {
    /// Returns `true` for the signed and unsigned integer kinds.
    pub fn is_integer(self) -> bool {
        !matches!(self, NumberKind::F32 | NumberKind::F64 | NumberKind::Decimal)
    }

    /// Returns the display name of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            NumberKind::I8 => "i8",
            NumberKind::I16 => "i16",
            NumberKind::I32 => "i32",
            NumberKind::I64 => "i64",
            NumberKind::U8 => "u8",
            NumberKind::U16 => "u16",
            NumberKind::U32 => "u32",
            NumberKind::U64 => "u64",
            NumberKind::F32 => "f32",
            NumberKind::F64 => "f64",
            NumberKind::Decimal => "decimal",
        }
    }
}

/// Static type of an expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// UTF-8 string.
    String,
    /// Boolean.
    Bool,
    /// Number with an exact subtype.
    Number(NumberKind),
    /// Date and time without a zone.
    Date,
    /// Sequence of integers.
    IntSeq,
    /// Sequence of strings.
    StrSeq,
    /// A value of the inner type or null.
    Nullable(Box<ValueType>),
    /// A whole record, identified by its Rust type name.
    Record(&'static str),
}

impl ValueType {
    /// The record type for `T`.
    pub fn record<T: ?Sized + 'static>() -> Self {
        ValueType::Record(std::any::type_name::<T>())
    }

    /// Wraps this type in `Nullable`, unless it already is nullable.
    pub fn nullable(self) -> Self {
        match self {
            ValueType::Nullable(_) => self,
            other => ValueType::Nullable(Box::new(other)),
        }
    }

    /// Returns `true` if this type admits null.
    pub fn is_nullable(&self) -> bool {
        matches!(self, ValueType::Nullable(_))
    }

    /// Returns the base type with any nullable wrapper removed.
    pub fn non_nullable(&self) -> &ValueType {
        match self {
            ValueType::Nullable(inner) => inner.non_nullable(),
            other => other,
        }
    }

    /// Returns `true` if the base type is a string.
    pub fn is_string(&self) -> bool {
        matches!(self.non_nullable(), ValueType::String)
    }

    /// Returns `true` if the base type is a boolean.
    pub fn is_boolean(&self) -> bool {
        matches!(self.non_nullable(), ValueType::Bool)
    }

    /// Returns `true` if the base type is one of the integer kinds.
    pub fn is_integer(&self) -> bool {
        matches!(self.non_nullable(), ValueType::Number(kind) if kind.is_integer())
    }

    /// Returns `true` if the base type is a float or decimal.
    pub fn is_numeric_non_integer(&self) -> bool {
        matches!(self.non_nullable(), ValueType::Number(kind) if !kind.is_integer())
    }

    /// Returns `true` if the base type is any number.
    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_numeric_non_integer()
    }

    /// Returns `true` if the base type is a date.
    pub fn is_date(&self) -> bool {
        matches!(self.non_nullable(), ValueType::Date)
    }

    /// Returns `true` for a sequence of integers.
    pub fn is_int_seq(&self) -> bool {
        matches!(self.non_nullable(), ValueType::IntSeq)
    }

    /// Returns `true` for a sequence of strings.
    pub fn is_str_seq(&self) -> bool {
        matches!(self.non_nullable(), ValueType::StrSeq)
    }

    /// Returns `true` for a whole record.
    pub fn is_record(&self) -> bool {
        matches!(self, ValueType::Record(_))
    }

    /// Returns the numeric subtype, if the base type is a number.
    pub fn number_kind(&self) -> Option<NumberKind> {
        match self.non_nullable() {
            ValueType::Number(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Returns `true` if a value of type `other` can be bound where `self`
    /// is expected: same type, or `other` is the base of nullable `self`.
    pub fn accepts(&self, other: &ValueType) -> bool {
        self == other || (self.is_nullable() && self.non_nullable() == other.non_nullable())
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::String => write!(f, "string"),
            ValueType::Bool => write!(f, "bool"),
            ValueType::Number(kind) => write!(f, "{}", kind.as_str()),
            ValueType::Date => write!(f, "date"),
            ValueType::IntSeq => write!(f, "[int]"),
            ValueType::StrSeq => write!(f, "[string]"),
            ValueType::Nullable(inner) => write!(f, "{}?", inner),
            ValueType::Record(name) => write!(f, "{}", name),
        }
    }
}
