//! Applying filter and sort specifications to a query source.
//!
//! Filters combine conjunctively, in order. Sort specifications form one
//! stable multi-key ordering: the first applied key is primary and each
//! later key only breaks ties. A filter or sort the record type cannot
//! support is skipped and logged; the source passes through unchanged.

use tracing::debug;

use crate::compiler::{Compiled, PredicateCompiler};
use crate::error::Result;
use crate::kind::ComparisonKind;
use crate::predicate::KeySelector;
use crate::record::Record;
use crate::registry::AccessorRegistry;
use crate::source::QuerySource;
use crate::spec_types::{FilterSpec, FilterValue, QueryRequest, SortSpec};

/// Applies specifications through one accessor registry.
#[derive(Debug, Clone, Copy)]
pub struct QueryPipeline<'r> {
    compiler: PredicateCompiler<'r>,
}

impl QueryPipeline<'static> {
    /// A pipeline over the global registry.
    pub fn new() -> Self {
        QueryPipeline {
            compiler: PredicateCompiler::global(),
        }
    }
}

impl Default for QueryPipeline<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'r> QueryPipeline<'r> {
    pub fn with_registry(registry: &'r AccessorRegistry) -> Self {
        QueryPipeline {
            compiler: PredicateCompiler::new(registry),
        }
    }

    pub fn compiler(&self) -> &PredicateCompiler<'r> {
        &self.compiler
    }

    /// Filters `source` by one comparison on a property.
    ///
    /// `None` or a blank property compares the record itself.
    pub fn apply_filter_by<T, S>(
        &self,
        source: S,
        property: Option<&str>,
        comparison: ComparisonKind,
        value: &FilterValue,
    ) -> Result<S>
    where
        T: Record,
        S: QuerySource<T>,
    {
        match self.compiler.compile_parts::<T>(property, comparison, value)? {
            Compiled::Ready(predicate) => source.filter(&predicate),
            Compiled::Dropped(_) => Ok(source),
        }
    }

    pub fn apply_filter<T, S>(&self, source: S, spec: &FilterSpec) -> Result<S>
    where
        T: Record,
        S: QuerySource<T>,
    {
        self.apply_filter_by(source, spec.property(), spec.comparison(), spec.value())
    }

    /// Applies every filter in order.
    pub fn apply_filters<T, S>(&self, source: S, specs: &[FilterSpec]) -> Result<S>
    where
        T: Record,
        S: QuerySource<T>,
    {
        specs
            .iter()
            .try_fold(source, |source, spec| self.apply_filter(source, spec))
    }

    /// Orders `source` by one property. `first` starts a new ordering.
    pub fn apply_order_by<T, S>(&self, source: S, spec: &SortSpec, first: bool) -> Result<S>
    where
        T: Record,
        S: QuerySource<T>,
    {
        Ok(self.order_by::<T, S>(source, spec, first)?.0)
    }

    fn order_by<T, S>(&self, source: S, spec: &SortSpec, first: bool) -> Result<(S, bool)>
    where
        T: Record,
        S: QuerySource<T>,
    {
        match self.compiler.registry().get::<T>(spec.property()) {
            Some(accessor) => {
                let key = KeySelector::from_accessor(accessor);
                Ok((source.order_by(&key, spec.is_ascending(), first)?, true))
            }
            None => {
                debug!(
                    type_name = std::any::type_name::<T>(),
                    property = spec.property(),
                    "sort dropped, no such property"
                );
                Ok((source, false))
            }
        }
    }

    /// Applies sort keys as one lexicographic ordering.
    ///
    /// The first key that resolves is the primary one, even if keys before
    /// it were dropped.
    pub fn apply_sorts<T, S>(&self, source: S, specs: &[SortSpec]) -> Result<S>
    where
        T: Record,
        S: QuerySource<T>,
    {
        let mut source = source;
        let mut ordered = false;
        for spec in specs {
            let (next, applied) = self.order_by::<T, S>(source, spec, !ordered)?;
            source = next;
            ordered |= applied;
        }
        Ok(source)
    }

    /// Applies a request: its filters, then its sort keys.
    pub fn apply<T, S>(&self, source: S, request: &QueryRequest) -> Result<S>
    where
        T: Record,
        S: QuerySource<T>,
    {
        let filtered = self.apply_filters(source, &request.filters)?;
        self.apply_sorts(filtered, &request.sort)
    }
}

/// Pipeline operations as methods on a source, using the global registry.
///
/// ```
/// use sieve::{InMemory, QueryExt, SortSpec};
///
/// let odd = InMemory::new(vec![5i32, 2, 3, 1, 4])
///     .filter_by(&":in:1,3,5".parse().unwrap())
///     .unwrap()
///     .sort_by_specs(&[SortSpec::asc("")])
///     .unwrap();
/// // Scalars have no named properties, so the sort is dropped.
/// assert_eq!(odd.into_vec(), vec![5, 3, 1]);
/// ```
pub trait QueryExt<T: Record>: QuerySource<T> {
    fn filter_by(self, spec: &FilterSpec) -> Result<Self> {
        QueryPipeline::new().apply_filter(self, spec)
    }

    fn filter_all(self, specs: &[FilterSpec]) -> Result<Self> {
        QueryPipeline::new().apply_filters(self, specs)
    }

    fn sort_by_specs(self, specs: &[SortSpec]) -> Result<Self> {
        QueryPipeline::new().apply_sorts(self, specs)
    }

    fn apply_request(self, request: &QueryRequest) -> Result<Self> {
        QueryPipeline::new().apply(self, request)
    }
}

impl<T: Record, S: QuerySource<T>> QueryExt<T> for S {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Field, Property};
    use crate::source::{InMemory, SqlQuery};
    use crate::value::Value;

    #[derive(Debug, Clone, PartialEq)]
    struct Person {
        name: String,
        age: u32,
    }

    impl Record for Person {
        fn properties() -> Result<Vec<Property<Self>>> {
            Ok(vec![
                Property::new("name", String::value_type(), |p: &Person| p.name.to_value()),
                Property::new("age", u32::value_type(), |p: &Person| Value::from(p.age)),
            ])
        }
    }

    fn people(rows: &[(&str, u32)]) -> InMemory<Person> {
        rows.iter()
            .map(|(name, age)| Person {
                name: name.to_string(),
                age: *age,
            })
            .collect()
    }

    fn pairs(source: InMemory<Person>) -> Vec<(String, u32)> {
        source.into_iter().map(|p| (p.name, p.age)).collect()
    }

    #[test]
    fn filter_by_property() {
        let registry = AccessorRegistry::new();
        let pipeline = QueryPipeline::with_registry(&registry);
        let source = people(&[("a", 20), ("b", 35), ("c", 31)]);
        let older = pipeline
            .apply_filter(source, &FilterSpec::new("age", ComparisonKind::GreaterThan, 30u32))
            .unwrap();
        assert_eq!(pairs(older), vec![("b".into(), 35), ("c".into(), 31)]);
    }

    #[test]
    fn unknown_property_is_identity() {
        let registry = AccessorRegistry::new();
        let pipeline = QueryPipeline::with_registry(&registry);
        let source = people(&[("a", 20), ("b", 35)]);
        let same = pipeline
            .apply_filter_by(
                source,
                Some("salary"),
                ComparisonKind::GreaterThan,
                &FilterValue::from(1i32),
            )
            .unwrap();
        let same = pipeline
            .apply_order_by(same, &SortSpec::desc("salary"), true)
            .unwrap();
        assert_eq!(pairs(same), vec![("a".into(), 20), ("b".into(), 35)]);
    }

    #[test]
    fn literal_errors_propagate() {
        let registry = AccessorRegistry::new();
        let pipeline = QueryPipeline::with_registry(&registry);
        let result = pipeline.apply_filter(
            people(&[("a", 1)]),
            &"age:gt:old".parse().unwrap(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn multi_key_sort() {
        let registry = AccessorRegistry::new();
        let pipeline = QueryPipeline::with_registry(&registry);
        let source = people(&[("b", 2), ("a", 2), ("a", 1)]);
        let sorted = pipeline
            .apply_sorts(source, &[SortSpec::asc("name"), SortSpec::asc("age")])
            .unwrap();
        assert_eq!(
            pairs(sorted),
            vec![("a".into(), 1), ("a".into(), 2), ("b".into(), 2)]
        );
    }

    #[test]
    fn dropped_primary_promotes_next_key() {
        let registry = AccessorRegistry::new();
        let pipeline = QueryPipeline::with_registry(&registry);
        let query = pipeline
            .apply_sorts(
                SqlQuery::<Person>::new("people"),
                &[SortSpec::asc("height"), SortSpec::desc("age")],
            )
            .unwrap();
        assert_eq!(query.to_sql(), "SELECT * FROM \"people\" ORDER BY \"age\" DESC");
    }

    #[test]
    fn empty_sorts_are_identity() {
        let registry = AccessorRegistry::new();
        let pipeline = QueryPipeline::with_registry(&registry);
        let source = people(&[("b", 2), ("a", 1)]);
        let same = pipeline.apply_sorts(source, &[]).unwrap();
        assert_eq!(pairs(same), vec![("b".into(), 2), ("a".into(), 1)]);
    }

    #[test]
    fn full_request_pushdown() {
        let registry = AccessorRegistry::new();
        let pipeline = QueryPipeline::with_registry(&registry);
        let request = QueryRequest::from_query_pairs([
            ("filter", "age:gte:18"),
            ("filter", "name:startswith:A"),
            ("sort", "-age,name"),
        ])
        .unwrap();
        let query = pipeline
            .apply(SqlQuery::<Person>::new("people"), &request)
            .unwrap();
        assert_eq!(
            query.to_sql(),
            "SELECT * FROM \"people\" WHERE (\"age\" >= 18) AND (\"name\" LIKE 'A%' ESCAPE '\\') \
             ORDER BY \"age\" DESC, \"name\" ASC"
        );
    }

    #[test]
    fn extension_methods() {
        let source = people(&[("Ann", 40), ("Bob", 25), ("Amy", 33)]);
        let result = source
            .filter_by(&"name:startswith:A".parse().unwrap())
            .unwrap()
            .sort_by_specs(&["age".parse().unwrap()])
            .unwrap();
        assert_eq!(pairs(result), vec![("Amy".into(), 33), ("Ann".into(), 40)]);
    }
}
