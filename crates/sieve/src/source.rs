//! Query sources: where predicates and sort keys are applied.
//!
//! [`InMemory`] evaluates eagerly over a `Vec<T>`. [`SqlQuery`] evaluates
//! nothing: it translates each predicate and key into SQL and accumulates a
//! `SELECT` statement for a database to run.

use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;

use crate::error::Result;
use crate::expr::render::SqlTranslator;
use crate::predicate::{KeySelector, Predicate};
use crate::value::{compare_values, Value};

/// Anything a filter or sort can be applied to.
pub trait QuerySource<T>: Sized {
    /// Keeps the records satisfying `predicate`.
    fn filter(self, predicate: &Predicate<T>) -> Result<Self>;

    /// Orders by `key`. `first` starts a new ordering; otherwise the key
    /// breaks ties left by the keys already applied.
    fn order_by(self, key: &KeySelector<T>, ascending: bool, first: bool) -> Result<Self>;
}

/// Compares two sort keys with nulls last. Descending reverses the whole
/// ordering, nulls included.
///
/// The ordering is total so that sorting stays well defined: NaN ranks
/// after every other number, and keys of different types are ranked by
/// type rather than reported equal.
pub fn compare_keys(a: &Value, b: &Value, ascending: bool) -> Ordering {
    let ordering = key_rank(a)
        .cmp(&key_rank(b))
        .then_with(|| compare_values(a, b).unwrap_or(Ordering::Equal));
    if ascending {
        ordering
    } else {
        ordering.reverse()
    }
}

fn key_rank(value: &Value) -> u8 {
    match value {
        Value::Bool(_) => 0,
        Value::Number(n) if n.to_f64().is_nan() => 6,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Date(_) => 3,
        Value::IntSeq(_) => 4,
        Value::StrSeq(_) => 5,
        Value::Null => 7,
    }
}

/// An in-memory collection.
pub struct InMemory<T> {
    items: Vec<T>,
    keys: Vec<(KeySelector<T>, bool)>,
}

impl<T: 'static> InMemory<T> {
    pub fn new(items: Vec<T>) -> Self {
        InMemory {
            items,
            keys: Vec::new(),
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    fn sort_by_keys(&mut self) -> Result<()> {
        // Read every key once, then sort indices stably.
        let mut decorated = Vec::with_capacity(self.items.len());
        for (index, item) in self.items.iter().enumerate() {
            let row = self
                .keys
                .iter()
                .map(|(key, _)| key.key(item))
                .collect::<Result<Vec<Value>>>()?;
            decorated.push((row, index));
        }

        let directions: Vec<bool> = self.keys.iter().map(|(_, asc)| *asc).collect();
        decorated.sort_by(|(a, _), (b, _)| {
            a.iter()
                .zip(b)
                .zip(&directions)
                .map(|((a, b), asc)| compare_keys(a, b, *asc))
                .find(|ordering| *ordering != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });

        let mut slots: Vec<Option<T>> = self.items.drain(..).map(Some).collect();
        self.items = decorated
            .into_iter()
            .filter_map(|(_, index)| slots[index].take())
            .collect();
        Ok(())
    }
}

impl<T: 'static> QuerySource<T> for InMemory<T> {
    fn filter(mut self, predicate: &Predicate<T>) -> Result<Self> {
        let mut kept = Vec::with_capacity(self.items.len());
        for item in self.items.drain(..) {
            if predicate.evaluate(&item)? {
                kept.push(item);
            }
        }
        self.items = kept;
        Ok(self)
    }

    fn order_by(mut self, key: &KeySelector<T>, ascending: bool, first: bool) -> Result<Self> {
        if first {
            self.keys.clear();
        }
        self.keys.push((key.clone(), ascending));
        self.sort_by_keys()?;
        Ok(self)
    }
}

impl<T: 'static> From<Vec<T>> for InMemory<T> {
    fn from(items: Vec<T>) -> Self {
        InMemory::new(items)
    }
}

impl<T: 'static> FromIterator<T> for InMemory<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        InMemory::new(iter.into_iter().collect())
    }
}

impl<T> IntoIterator for InMemory<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<T: fmt::Debug> fmt::Debug for InMemory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemory")
            .field("items", &self.items)
            .field("keys", &self.keys.len())
            .finish()
    }
}

/// A `SELECT` statement built by pushing predicates and keys down as SQL.
pub struct SqlQuery<T> {
    table: String,
    conditions: Vec<String>,
    order: Vec<String>,
    translator: SqlTranslator,
    _record: PhantomData<fn() -> T>,
}

impl<T> SqlQuery<T> {
    pub fn new(table: impl Into<String>) -> Self {
        Self::with_translator(table, SqlTranslator::new())
    }

    pub fn with_translator(table: impl Into<String>, translator: SqlTranslator) -> Self {
        SqlQuery {
            table: table.into(),
            conditions: Vec::new(),
            order: Vec::new(),
            translator,
            _record: PhantomData,
        }
    }

    /// The conditions joined with `AND`, if any.
    pub fn where_clause(&self) -> Option<String> {
        (!self.conditions.is_empty()).then(|| self.conditions.join(" AND "))
    }

    /// The `ORDER BY` terms, if any.
    pub fn order_clause(&self) -> Option<String> {
        (!self.order.is_empty()).then(|| self.order.join(", "))
    }

    /// The full statement.
    pub fn to_sql(&self) -> String {
        let mut sql = format!("SELECT * FROM {}", quote_table(&self.table));
        if let Some(conditions) = self.where_clause() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions);
        }
        if let Some(order) = self.order_clause() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&order);
        }
        sql
    }
}

fn quote_table(table: &str) -> String {
    table
        .split('.')
        .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(".")
}

impl<T: 'static> QuerySource<T> for SqlQuery<T> {
    fn filter(mut self, predicate: &Predicate<T>) -> Result<Self> {
        let condition = self.translator.condition(predicate.lambda())?;
        self.conditions.push(condition);
        Ok(self)
    }

    fn order_by(mut self, key: &KeySelector<T>, ascending: bool, first: bool) -> Result<Self> {
        let term = self.translator.key(key.lambda())?;
        if first {
            self.order.clear();
        }
        let direction = if ascending { "ASC" } else { "DESC" };
        self.order.push(format!("{} {}", term, direction));
        Ok(self)
    }
}

impl<T> fmt::Display for SqlQuery<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_sql())
    }
}

impl<T> fmt::Debug for SqlQuery<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlQuery")
            .field("table", &self.table)
            .field("conditions", &self.conditions)
            .field("order", &self.order)
            .finish()
    }
}
