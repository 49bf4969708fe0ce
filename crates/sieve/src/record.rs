//! Record introspection.
//!
//! Rust has no runtime reflection, so a record type describes its readable
//! properties through the [`Record`] trait. The trait is normally derived
//! with `#[derive(Record)]`, but can also be implemented by hand.
//!
//! [`Field`] maps a Rust field type to its [`ValueType`] and reads it into a
//! [`Value`]. It is implemented for the scalar types the compiler
//! understands, for `Option<F>` and for integer/string vectors.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use rust_decimal::Decimal;

use crate::error::Result;
use crate::types::{NumberKind, ValueType};
use crate::value::{Number, Value};

/// A type whose properties can be filtered and sorted on.
///
/// # Derive Usage
///
/// ```ignore
/// use sieve::Record;
///
/// #[derive(Record)]
/// struct Person {
///     name: String,
///     age: u32,
///     #[record(rename = "joined")]
///     joined_at: chrono::NaiveDateTime,
///     #[record(skip)]
///     password_hash: Vec<u8>,
/// }
/// ```
///
/// # Manual Implementation
///
/// ```
/// use sieve::{Field, Property, Record, Value};
///
/// struct Task {
///     title: String,
///     priority: u8,
/// }
///
/// impl Record for Task {
///     fn properties() -> sieve::Result<Vec<Property<Self>>> {
///         Ok(vec![
///             Property::new("title", String::value_type(), |t: &Task| t.title.to_value()),
///             Property::new("priority", u8::value_type(), |t: &Task| t.priority.to_value()),
///         ])
///     }
/// }
/// ```
pub trait Record: 'static {
    /// Enumerates the readable properties of this type.
    ///
    /// Called once per type by the accessor registry. An error leaves the
    /// type without accessors: every filter and sort on it becomes a no-op.
    fn properties() -> Result<Vec<Property<Self>>>
    where
        Self: Sized;

    /// Static type of the record itself, for filters with no property name.
    ///
    /// `None` (the default) means the record cannot be compared directly.
    fn self_type() -> Option<ValueType>
    where
        Self: Sized,
    {
        None
    }

    /// The record itself as a value, for filters with no property name.
    fn self_value(&self) -> Option<Value> {
        None
    }
}

/// A named, typed, readable property of a record type.
pub struct Property<T> {
    name: String,
    ty: ValueType,
    read: fn(&T) -> Value,
}

impl<T> Property<T> {
    /// Creates a property description.
    pub fn new(name: impl Into<String>, ty: ValueType, read: fn(&T) -> Value) -> Self {
        Property {
            name: name.into(),
            ty,
            read,
        }
    }

    /// The property name used in filters and sorts.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The static type of the property.
    pub fn value_type(&self) -> &ValueType {
        &self.ty
    }

    /// Reads the property from a record.
    pub fn read(&self, record: &T) -> Value {
        (self.read)(record)
    }

    pub(crate) fn into_parts(self) -> (String, ValueType, fn(&T) -> Value) {
        (self.name, self.ty, self.read)
    }
}

impl<T> std::fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .finish()
    }
}

/// A Rust type usable as a record property.
pub trait Field {
    /// Static type of the property.
    fn value_type() -> ValueType;

    /// Reads the field into a runtime value.
    fn to_value(&self) -> Value;
}

macro_rules! number_field {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl Field for $ty {
                fn value_type() -> ValueType {
                    ValueType::Number(NumberKind::$kind)
                }

                fn to_value(&self) -> Value {
                    Value::Number(Number::$kind(*self))
                }
            }
        )*
    };
}

number_field! {
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

impl Field for String {
    fn value_type() -> ValueType {
        ValueType::String
    }

    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }
}

impl Field for bool {
    fn value_type() -> ValueType {
        ValueType::Bool
    }

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl Field for NaiveDateTime {
    fn value_type() -> ValueType {
        ValueType::Date
    }

    fn to_value(&self) -> Value {
        Value::Date(*self)
    }
}

impl Field for NaiveDate {
    fn value_type() -> ValueType {
        ValueType::Date
    }

    fn to_value(&self) -> Value {
        Value::Date(self.and_time(NaiveTime::default()))
    }
}

impl<Tz: TimeZone> Field for DateTime<Tz> {
    fn value_type() -> ValueType {
        ValueType::Date
    }

    fn to_value(&self) -> Value {
        Value::Date(self.naive_utc())
    }
}

impl<F: Field> Field for Option<F> {
    fn value_type() -> ValueType {
        F::value_type().nullable()
    }

    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, Field::to_value)
    }
}

impl Field for Vec<i64> {
    fn value_type() -> ValueType {
        ValueType::IntSeq
    }

    fn to_value(&self) -> Value {
        Value::IntSeq(self.clone())
    }
}

impl Field for Vec<i32> {
    fn value_type() -> ValueType {
        ValueType::IntSeq
    }

    fn to_value(&self) -> Value {
        Value::IntSeq(self.iter().map(|n| i64::from(*n)).collect())
    }
}

impl Field for Vec<String> {
    fn value_type() -> ValueType {
        ValueType::StrSeq
    }

    fn to_value(&self) -> Value {
        Value::StrSeq(self.clone())
    }
}

// Scalars are records too: a sequence of `i32` is filtered with no
// property name, comparing each element directly.
macro_rules! scalar_record {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Record for $ty {
                fn properties() -> Result<Vec<Property<Self>>> {
                    Ok(Vec::new())
                }

                fn self_type() -> Option<ValueType> {
                    Some(<$ty as Field>::value_type())
                }

                fn self_value(&self) -> Option<Value> {
                    Some(Field::to_value(self))
                }
            }
        )*
    };
}

scalar_record!(
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    u64,
    f32,
    f64,
    Decimal,
    String,
    bool,
    NaiveDateTime,
    NaiveDate
);
