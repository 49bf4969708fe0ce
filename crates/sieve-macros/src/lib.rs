//! Procedural macros for sieve.
//!
//! ## Derive Macros
//!
//! - [`Record`] - enumerate the queryable properties of a struct

mod record;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

/// Derives the `Record` trait for a struct with named fields.
///
/// Every field becomes a property named after the field, unless it is
/// skipped or renamed. Field types must implement `sieve::Field`: the
/// numeric primitives, `rust_decimal::Decimal`, `String`, `bool`, the
/// `chrono` date types, `Option` of any of these, and `Vec<i64>`,
/// `Vec<i32>` or `Vec<String>`.
///
/// # Field Attributes
///
/// - `#[record(skip)]` - not a property
/// - `#[record(rename = "name")]` - property name used in filters and sorts
///
/// # Generated Code
///
/// 1. An associated constant per property, e.g. `Person::AGE == "age"`
/// 2. An implementation of `Record::properties()`
///
/// # Example
///
/// ```ignore
/// use sieve::{FilterSpec, Record};
///
/// #[derive(Record)]
/// struct Person {
///     name: String,
///     #[record(rename = "years")]
///     age: u32,
///     #[record(skip)]
///     password_hash: Vec<u8>,
/// }
///
/// let filter: FilterSpec = format!("{}:gte:18", Person::YEARS).parse()?;
/// ```
#[proc_macro_derive(Record, attributes(record))]
pub fn record_derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    record::record_derive_impl(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
