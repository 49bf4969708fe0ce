//! Literal parsing and numeric narrowing.
//!
//! Filter values often arrive as text. These helpers turn them into the
//! exact type of the property being filtered. Failures are
//! [`SieveError::LiteralParse`] and are never swallowed.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::{Result, SieveError};
use crate::types::NumberKind;
use crate::value::Number;

fn parse_error(literal: &str, target: &'static str) -> SieveError {
    SieveError::LiteralParse {
        literal: literal.to_string(),
        target,
    }
}

/// Parses `true`/`false`, ignoring case and surrounding whitespace.
pub fn parse_bool(literal: &str) -> Result<bool> {
    let trimmed = literal.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if trimmed.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(parse_error(literal, "bool"))
    }
}

/// Parses a decimal literal, accepting scientific notation.
pub fn parse_decimal(literal: &str) -> Result<Decimal> {
    let trimmed = literal.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| parse_error(literal, "decimal"))
}

/// Parses a date from RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS`
/// or `YYYY-MM-DD` (midnight).
pub fn parse_date(literal: &str) -> Result<NaiveDateTime> {
    let trimmed = literal.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.naive_utc());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(dt);
        }
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map(|d| d.and_time(NaiveTime::default()))
        .map_err(|_| parse_error(literal, "date"))
}

/// Parses a numeric literal into the given subtype.
///
/// Integers and decimals go through a decimal parse and are then narrowed;
/// the fractional part is truncated and out-of-range values fail.
pub fn parse_number(literal: &str, kind: NumberKind) -> Result<Number> {
    match kind {
        NumberKind::F32 | NumberKind::F64 => {
            let parsed = f64::from_str(literal.trim()).map_err(|_| parse_error(literal, kind.as_str()))?;
            Ok(float_number(parsed, kind))
        }
        _ => {
            let decimal = parse_decimal(literal)?;
            narrow(decimal, kind).ok_or_else(|| parse_error(literal, kind.as_str()))
        }
    }
}

/// Converts a number of any subtype into the given subtype.
pub fn coerce_number(number: Number, kind: NumberKind) -> Result<Number> {
    if number.kind() == kind {
        return Ok(number);
    }
    match kind {
        NumberKind::F32 | NumberKind::F64 => Ok(float_number(number.to_f64(), kind)),
        _ => number
            .to_decimal()
            .and_then(|d| narrow(d, kind))
            .ok_or_else(|| parse_error(&number.to_string(), kind.as_str())),
    }
}

fn float_number(value: f64, kind: NumberKind) -> Number {
    match kind {
        NumberKind::F32 => Number::F32(value as f32),
        _ => Number::F64(value),
    }
}

fn narrow(decimal: Decimal, kind: NumberKind) -> Option<Number> {
    let whole = decimal.trunc();
    let number = match kind {
        NumberKind::I8 => Number::I8(whole.to_i8()?),
        NumberKind::I16 => Number::I16(whole.to_i16()?),
        NumberKind::I32 => Number::I32(whole.to_i32()?),
        NumberKind::I64 => Number::I64(whole.to_i64()?),
        NumberKind::U8 => Number::U8(whole.to_u8()?),
        NumberKind::U16 => Number::U16(whole.to_u16()?),
        NumberKind::U32 => Number::U32(whole.to_u32()?),
        NumberKind::U64 => Number::U64(whole.to_u64()?),
        NumberKind::F32 => Number::F32(decimal.to_f32()?),
        NumberKind::F64 => Number::F64(decimal.to_f64()?),
        NumberKind::Decimal => Number::Decimal(decimal),
    };
    Some(number)
}
