//! Per-type property accessor tables.
//!
//! The registry turns a property name into an accessor lambda
//! (`|p| p.name`) for a record type. Tables are built lazily, once per type,
//! the first time the type is looked up, and never change afterwards.
//!
//! A name absent from the table is a miss, not an error. A type whose
//! introspection fails gets an empty table, so every lookup on it misses.

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use tracing::{trace, warn};

use crate::expr::{rewrite, Expr, Lambda, MemberRef, Parameter};
use crate::record::Record;
use crate::types::ValueType;

static GLOBAL: Lazy<AccessorRegistry> = Lazy::new(AccessorRegistry::new);

/// A single-parameter lambda reading one property (or the record itself).
#[derive(Debug, Clone, PartialEq)]
pub struct Accessor {
    lambda: Lambda,
}

impl Accessor {
    fn new(param: Parameter, body: Expr) -> Self {
        Accessor {
            lambda: Lambda::unary(param, body),
        }
    }

    /// The accessor as a lambda, `|p| p.name`.
    pub fn lambda(&self) -> &Lambda {
        &self.lambda
    }

    /// The record parameter.
    pub fn param(&self) -> &Parameter {
        &self.lambda.params()[0]
    }

    /// The property read, `p.name`.
    pub fn body(&self) -> &Expr {
        self.lambda.body()
    }

    /// Static type of the property.
    pub fn value_type(&self) -> ValueType {
        self.lambda.return_type()
    }

    /// Reads the property from `target` instead of the accessor's parameter.
    pub fn apply_to(&self, target: Expr) -> Expr {
        let map = HashMap::from([(self.param().id(), target)]);
        rewrite::substitute(self.body(), &map)
    }
}

/// Accessors for one record type.
#[derive(Debug)]
struct AccessorTable {
    by_name: HashMap<String, Accessor>,
    this: Accessor,
}

impl AccessorTable {
    fn build<T: Record>() -> Self {
        let param = Parameter::of::<T>("p");

        let this = match T::self_type() {
            Some(ty) => Accessor::new(
                param.clone(),
                Expr::member(Expr::param(&param), MemberRef::self_of::<T>(ty)),
            ),
            None => Accessor::new(param.clone(), Expr::param(&param)),
        };

        let properties = match T::properties() {
            Ok(properties) => properties,
            Err(err) => {
                warn!(
                    type_name = type_name::<T>(),
                    error = %err,
                    "record introspection failed, filters and sorts on this type are ignored"
                );
                Vec::new()
            }
        };

        let mut by_name = HashMap::with_capacity(properties.len());
        for property in properties {
            let (name, ty, read) = property.into_parts();
            if by_name.contains_key(&name) {
                warn!(
                    type_name = type_name::<T>(),
                    property = %name,
                    "duplicate property name, keeping the first"
                );
                continue;
            }
            let member = MemberRef::new::<T>(&name, ty, read);
            let accessor = Accessor::new(param.clone(), Expr::member(Expr::param(&param), member));
            by_name.insert(name, accessor);
        }

        trace!(
            type_name = type_name::<T>(),
            properties = by_name.len(),
            "built accessor table"
        );
        AccessorTable { by_name, this }
    }
}

/// Lazily built accessor tables, keyed by record type.
///
/// Lookups after the first one for a type are plain map reads. The registry
/// is `Send + Sync` and may be shared freely.
#[derive(Debug, Default)]
pub struct AccessorRegistry {
    tables: DashMap<TypeId, Arc<AccessorTable>>,
}

impl AccessorRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry used when none is given explicitly.
    pub fn global() -> &'static AccessorRegistry {
        &GLOBAL
    }

    fn table<T: Record>(&self) -> Arc<AccessorTable> {
        let key = TypeId::of::<T>();
        if let Some(table) = self.tables.get(&key) {
            return Arc::clone(table.value());
        }
        // The entry holds the shard lock while building, so concurrent first
        // lookups of the same type build the table once.
        let entry = self
            .tables
            .entry(key)
            .or_insert_with(|| Arc::new(AccessorTable::build::<T>()));
        Arc::clone(entry.value())
    }

    /// Looks up the accessor for property `name` of `T`.
    pub fn get<T: Record>(&self, name: &str) -> Option<Accessor> {
        self.table::<T>().by_name.get(name).cloned()
    }

    /// The accessor for the record itself.
    ///
    /// For records with a [`Record::self_type`] this reads
    /// [`Record::self_value`]; otherwise it is the bare parameter, typed as
    /// the record, which no comparison accepts.
    pub fn self_lambda<T: Record>(&self) -> Accessor {
        self.table::<T>().this.clone()
    }

    /// Resolves an optional property name: `None` or a blank name means
    /// the record itself.
    pub fn resolve<T: Record>(&self, property: Option<&str>) -> Option<Accessor> {
        match property.map(str::trim) {
            None | Some("") => Some(self.self_lambda::<T>()),
            Some(name) => self.get::<T>(name),
        }
    }

    /// Names of the known properties of `T`, sorted.
    pub fn property_names<T: Record>(&self) -> Vec<String> {
        let mut names: Vec<String> = self.table::<T>().by_name.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of record types with a built table.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns `true` if no table has been built yet.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
