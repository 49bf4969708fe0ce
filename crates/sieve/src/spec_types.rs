//! Declarative filter and sort requests.
//!
//! These are plain value objects: a [`FilterSpec`] names a property, a
//! [`ComparisonKind`] and a [`FilterValue`]; a [`SortSpec`] names a property
//! and a direction. They deserialize from JSON and parse from compact text,
//! so a query string such as
//!
//! ```text
//! ?filter=age:gte:30&filter=name:startswith:A&sort=-age,name
//! ```
//!
//! maps directly onto a [`QueryRequest`].

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::{Result, SieveError};
use crate::kind::ComparisonKind;
use crate::value::{Number, Value, DATE_FORMAT};

/// Right-hand side of a filter.
///
/// `Text` carries a literal that the compiler parses against the property
/// type (`"30"` against a `u8` property becomes `30u8`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawFilterValue")]
pub enum FilterValue {
    Text(String),
    Bool(bool),
    Number(Number),
    Date(NaiveDateTime),
    /// Set of integers, for `IsIn` on numbers and `MonthIsIn` on dates.
    IntList(Vec<i64>),
    /// Set of strings, for `IsIn` on strings.
    TextList(Vec<String>),
}

impl FilterValue {
    /// Short name of the variant, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            FilterValue::Text(_) => "text",
            FilterValue::Bool(_) => "bool",
            FilterValue::Number(_) => "number",
            FilterValue::Date(_) => "date",
            FilterValue::IntList(_) => "int list",
            FilterValue::TextList(_) => "text list",
        }
    }

    /// Parses a comma-separated list: integers if every item is one,
    /// strings otherwise. Items are trimmed; empty items are skipped.
    pub fn parse_list(text: &str) -> FilterValue {
        let items: Vec<&str> = text
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .collect();
        let ints: std::result::Result<Vec<i64>, _> =
            items.iter().map(|item| item.parse::<i64>()).collect();
        match ints {
            Ok(ints) => FilterValue::IntList(ints),
            Err(_) => FilterValue::TextList(items.into_iter().map(String::from).collect()),
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Text(s) => write!(f, "{}", s),
            FilterValue::Bool(b) => write!(f, "{}", b),
            FilterValue::Number(n) => write!(f, "{}", n),
            FilterValue::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            FilterValue::IntList(items) => {
                let parts: Vec<String> = items.iter().map(|i| i.to_string()).collect();
                write!(f, "{}", parts.join(","))
            }
            FilterValue::TextList(items) => write!(f, "{}", items.join(",")),
        }
    }
}

/// JSON shapes accepted for a filter value.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawFilterValue {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    IntList(Vec<i64>),
    TextList(Vec<String>),
}

impl From<RawFilterValue> for FilterValue {
    fn from(raw: RawFilterValue) -> Self {
        match raw {
            RawFilterValue::Bool(b) => FilterValue::Bool(b),
            RawFilterValue::Int(n) => FilterValue::Number(Number::I64(n)),
            RawFilterValue::UInt(n) => FilterValue::Number(Number::U64(n)),
            RawFilterValue::Float(n) => FilterValue::Number(Number::F64(n)),
            RawFilterValue::Text(s) => FilterValue::Text(s),
            RawFilterValue::IntList(items) => FilterValue::IntList(items),
            RawFilterValue::TextList(items) => FilterValue::TextList(items),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        FilterValue::Text(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        FilterValue::Text(s)
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        FilterValue::Bool(b)
    }
}

impl From<NaiveDateTime> for FilterValue {
    fn from(d: NaiveDateTime) -> Self {
        FilterValue::Date(d)
    }
}

impl From<Number> for FilterValue {
    fn from(n: Number) -> Self {
        FilterValue::Number(n)
    }
}

impl From<Vec<i64>> for FilterValue {
    fn from(items: Vec<i64>) -> Self {
        FilterValue::IntList(items)
    }
}

impl From<Vec<i32>> for FilterValue {
    fn from(items: Vec<i32>) -> Self {
        FilterValue::IntList(items.into_iter().map(i64::from).collect())
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(items: Vec<String>) -> Self {
        FilterValue::TextList(items)
    }
}

impl From<Vec<&str>> for FilterValue {
    fn from(items: Vec<&str>) -> Self {
        FilterValue::TextList(items.into_iter().map(String::from).collect())
    }
}

macro_rules! filter_number_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for FilterValue {
                fn from(n: $ty) -> Self {
                    FilterValue::Number(Number::from(n))
                }
            }
        )*
    };
}

filter_number_from!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, Decimal);

impl TryFrom<Value> for FilterValue {
    type Error = SieveError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(FilterValue::Text(s)),
            Value::Bool(b) => Ok(FilterValue::Bool(b)),
            Value::Number(n) => Ok(FilterValue::Number(n)),
            Value::Date(d) => Ok(FilterValue::Date(d)),
            Value::IntSeq(items) => Ok(FilterValue::IntList(items)),
            Value::StrSeq(items) => Ok(FilterValue::TextList(items)),
            Value::Null => Err(SieveError::InvalidFilter(
                "null is not a filter value".to_string(),
            )),
        }
    }
}

/// One filter: `property comparison value`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FilterSpec {
    #[serde(default, alias = "field", alias = "prop")]
    property: Option<String>,
    #[serde(alias = "op")]
    comparison: ComparisonKind,
    value: FilterValue,
}

impl FilterSpec {
    /// Creates a filter on a named property.
    pub fn new(
        property: impl Into<String>,
        comparison: ComparisonKind,
        value: impl Into<FilterValue>,
    ) -> Self {
        FilterSpec {
            property: Some(property.into()),
            comparison,
            value: value.into(),
        }
    }

    /// Creates a filter comparing the record itself.
    pub fn on_self(comparison: ComparisonKind, value: impl Into<FilterValue>) -> Self {
        FilterSpec {
            property: None,
            comparison,
            value: value.into(),
        }
    }

    /// The property name, or `None` for the record itself. Blank names
    /// count as `None`.
    pub fn property(&self) -> Option<&str> {
        self.property
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    pub fn comparison(&self) -> ComparisonKind {
        self.comparison
    }

    pub fn value(&self) -> &FilterValue {
        &self.value
    }
}

impl fmt::Display for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.property().unwrap_or(""),
            self.comparison,
            self.value
        )
    }
}

impl FromStr for FilterSpec {
    type Err = SieveError;

    /// Parses `property:comparison:value`.
    ///
    /// The value is everything after the second colon, so dates with times
    /// need no escaping. An empty property compares the record itself. For
    /// `in` and `monthin` the value is a comma-separated list.
    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.splitn(3, ':');
        let (Some(property), Some(comparison), Some(value)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(SieveError::InvalidFilter(format!(
                "expected 'property:comparison:value', got '{}'",
                s
            )));
        };
        let comparison: ComparisonKind = comparison.parse()?;
        let value = match comparison {
            ComparisonKind::IsIn | ComparisonKind::MonthIsIn => FilterValue::parse_list(value),
            _ => FilterValue::Text(value.to_string()),
        };
        let property = property.trim();
        Ok(FilterSpec {
            property: (!property.is_empty()).then(|| property.to_string()),
            comparison,
            value,
        })
    }
}

fn default_ascending() -> bool {
    true
}

/// One sort key.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SortSpec {
    #[serde(alias = "field", alias = "prop")]
    property: String,
    #[serde(default = "default_ascending")]
    ascending: bool,
}

impl SortSpec {
    pub fn new(property: impl Into<String>, ascending: bool) -> Self {
        SortSpec {
            property: property.into(),
            ascending,
        }
    }

    pub fn asc(property: impl Into<String>) -> Self {
        Self::new(property, true)
    }

    pub fn desc(property: impl Into<String>) -> Self {
        Self::new(property, false)
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn is_ascending(&self) -> bool {
        self.ascending
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.ascending { "" } else { "-" };
        write!(f, "{}{}", sign, self.property)
    }
}

impl FromStr for SortSpec {
    type Err = SieveError;

    /// Parses `age`, `+age`, `-age`, `age:asc` or `age:desc`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (name, ascending) = if let Some(rest) = s.strip_prefix('-') {
            (rest, false)
        } else if let Some(rest) = s.strip_prefix('+') {
            (rest, true)
        } else if let Some((name, dir)) = s.split_once(':') {
            match dir.trim().to_ascii_lowercase().as_str() {
                "asc" => (name, true),
                "desc" => (name, false),
                other => {
                    return Err(SieveError::InvalidFilter(format!(
                        "unknown sort direction '{}'",
                        other
                    )))
                }
            }
        } else {
            (s, true)
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(SieveError::InvalidFilter(format!(
                "sort '{}' has no property",
                s
            )));
        }
        Ok(SortSpec::new(name, ascending))
    }
}

/// Filters and sort keys applied together.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub filters: Vec<FilterSpec>,
    #[serde(default, alias = "order_by")]
    pub sort: Vec<SortSpec>,
}

impl QueryRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a filter.
    pub fn filter(mut self, spec: FilterSpec) -> Self {
        self.filters.push(spec);
        self
    }

    /// Adds a sort key after the existing ones.
    pub fn sort(mut self, spec: SortSpec) -> Self {
        self.sort.push(spec);
        self
    }

    /// Decodes a request from JSON.
    ///
    /// ```
    /// use sieve::QueryRequest;
    ///
    /// let request = QueryRequest::from_json(r#"{
    ///     "filters": [{ "property": "age", "comparison": "gte", "value": 30 }],
    ///     "sort": [{ "property": "name" }]
    /// }"#).unwrap();
    /// assert_eq!(request.filters.len(), 1);
    /// assert!(request.sort[0].is_ascending());
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Builds a request from query-string pairs.
    ///
    /// `filter` values parse as [`FilterSpec`]s; `sort` values are
    /// comma-separated [`SortSpec`]s. Other keys are ignored.
    pub fn from_query_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut request = QueryRequest::new();
        for (key, value) in pairs {
            match key.as_ref() {
                "filter" => request.filters.push(value.as_ref().parse()?),
                "sort" => {
                    for part in value.as_ref().split(',').filter(|p| !p.trim().is_empty()) {
                        request.sort.push(part.parse()?);
                    }
                }
                _ => {}
            }
        }
        Ok(request)
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty() && self.sort.is_empty()
    }
}
