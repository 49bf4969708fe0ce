//! End-to-end tests: derived records through the query pipeline.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sieve::{
    AccessorRegistry, ComparisonKind, FilterSpec, InMemory, QueryExt, QueryPipeline, QueryRequest,
    Record, SieveError, SortSpec, Spec, Specification, SqlQuery,
};

#[derive(Debug, Clone, Record)]
struct Person {
    name: String,
    #[record(rename = "years")]
    age: u32,
    email: Option<String>,
    active: bool,
    joined: NaiveDate,
    score: Decimal,
    #[record(skip)]
    #[allow(dead_code)]
    password_hash: Vec<u8>,
}

fn person(name: &str, age: u32, email: Option<&str>, active: bool, joined: (i32, u32, u32)) -> Person {
    Person {
        name: name.to_string(),
        age,
        email: email.map(String::from),
        active,
        joined: NaiveDate::from_ymd_opt(joined.0, joined.1, joined.2).unwrap(),
        score: Decimal::new(i64::from(age) * 10 + 5, 1),
        password_hash: Vec::new(),
    }
}

fn people() -> InMemory<Person> {
    InMemory::new(vec![
        person("Ann", 41, Some("ann@example.com"), true, (2021, 3, 14)),
        person("Bob", 20, None, false, (2022, 7, 1)),
        person("Cid", 35, Some("cid@example.org"), true, (2020, 12, 25)),
        person("Dee", 35, None, true, (2023, 3, 2)),
        person("Eve", 17, Some("eve@example.com"), false, (2024, 1, 9)),
    ])
}

fn names(source: InMemory<Person>) -> Vec<String> {
    source.into_iter().map(|p| p.name).collect()
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Derive
// ============================================================================

#[test]
fn derive_generates_constants_and_properties() {
    assert_eq!(Person::NAME, "name");
    assert_eq!(Person::YEARS, "years");

    let registry = AccessorRegistry::new();
    let mut props = registry.property_names::<Person>();
    props.sort();
    assert_eq!(props, vec!["active", "email", "joined", "name", "score", "years"]);
    assert!(registry.get::<Person>("password_hash").is_none());
    assert!(registry.get::<Person>("age").is_none());
}

// ============================================================================
// Filters
// ============================================================================

#[test]
fn text_literals_are_coerced_to_the_property_type() {
    let pipeline = QueryPipeline::new();
    let adults = pipeline
        .apply_filter(people(), &FilterSpec::new(Person::YEARS, ComparisonKind::GreaterOrEqual, "18"))
        .unwrap();
    assert_eq!(names(adults), vec!["Ann", "Bob", "Cid", "Dee"]);
}

#[test]
fn string_comparisons() {
    let result = people()
        .filter_by(&"name:startswith:A".parse().unwrap())
        .unwrap();
    assert_eq!(names(result), vec!["Ann"]);

    let result = people()
        .filter_by(&"name:ncontains:e".parse().unwrap())
        .unwrap();
    assert_eq!(names(result), vec!["Ann", "Bob", "Cid"]);
}

#[test]
fn bool_and_decimal_comparisons() {
    let result = people()
        .filter_all(&[
            FilterSpec::new("active", ComparisonKind::Equals, true),
            FilterSpec::new("score", ComparisonKind::LessThan, "40"),
        ])
        .unwrap();
    assert_eq!(names(result), vec!["Cid", "Dee"]);
}

#[test]
fn date_and_month_comparisons() {
    let result = people()
        .filter_by(&"joined:gte:2022-01-01".parse().unwrap())
        .unwrap();
    assert_eq!(names(result), vec!["Bob", "Dee", "Eve"]);

    let spring = people()
        .filter_by(&"joined:monthin:3,4,5".parse().unwrap())
        .unwrap();
    assert_eq!(names(spring), vec!["Ann", "Dee"]);
}

#[test]
fn set_membership() {
    let result = people()
        .filter_by(&FilterSpec::new("years", ComparisonKind::IsIn, vec![17i64, 41]))
        .unwrap();
    assert_eq!(names(result), vec!["Ann", "Eve"]);

    let result = people()
        .filter_by(&"name:in:Bob, Dee".parse().unwrap())
        .unwrap();
    assert_eq!(names(result), vec!["Bob", "Dee"]);
}

#[test]
fn unsupported_filters_leave_the_source_unchanged() {
    init_tracing();
    let unchanged = vec!["Ann", "Bob", "Cid", "Dee", "Eve"];

    // Unknown property.
    let result = people().filter_by(&"height:gt:180".parse().unwrap()).unwrap();
    assert_eq!(names(result), unchanged);

    // Ordering on a bool.
    let result = people().filter_by(&"active:gt:true".parse().unwrap()).unwrap();
    assert_eq!(names(result), unchanged);

    // Month set on a number.
    let result = people().filter_by(&"years:monthin:1".parse().unwrap()).unwrap();
    assert_eq!(names(result), unchanged);
}

#[test]
fn unparsable_literals_fail() {
    let err = people()
        .filter_by(&"years:gt:old".parse().unwrap())
        .unwrap_err();
    assert!(matches!(err, SieveError::LiteralParse { .. }));

    let err = people()
        .filter_by(&"active:eq:maybe".parse().unwrap())
        .unwrap_err();
    assert!(matches!(err, SieveError::LiteralParse { target: "bool", .. }));
}

// ============================================================================
// Sorting
// ============================================================================

#[test]
fn multi_key_sort_is_lexicographic() {
    let result = people()
        .sort_by_specs(&[SortSpec::desc("years"), SortSpec::asc("name")])
        .unwrap();
    assert_eq!(names(result), vec!["Ann", "Cid", "Dee", "Bob", "Eve"]);
}

#[test]
fn sort_is_stable() {
    // Cid and Dee tie on age and keep their input order.
    let result = people().sort_by_specs(&[SortSpec::asc("years")]).unwrap();
    assert_eq!(names(result), vec!["Eve", "Bob", "Cid", "Dee", "Ann"]);
}

#[test]
fn nulls_sort_last_ascending() {
    let result = people().sort_by_specs(&[SortSpec::asc("email")]).unwrap();
    assert_eq!(names(result), vec!["Ann", "Cid", "Eve", "Bob", "Dee"]);

    let result = people().sort_by_specs(&[SortSpec::desc("email")]).unwrap();
    assert_eq!(names(result), vec!["Bob", "Dee", "Eve", "Cid", "Ann"]);
}

#[test]
fn dropped_sort_keys_are_skipped() {
    let result = people()
        .sort_by_specs(&[SortSpec::asc("shoe_size"), SortSpec::asc("name")])
        .unwrap();
    assert_eq!(names(result), vec!["Ann", "Bob", "Cid", "Dee", "Eve"]);

    let result = people().sort_by_specs(&[SortSpec::desc("nope")]).unwrap();
    assert_eq!(names(result), vec!["Ann", "Bob", "Cid", "Dee", "Eve"]);
}

// ============================================================================
// Requests
// ============================================================================

#[test]
fn json_request() {
    let request = QueryRequest::from_json(
        r#"{
            "filters": [
                { "property": "years", "comparison": "gt", "value": 18 },
                { "field": "active", "op": "eq", "value": true }
            ],
            "order_by": [{ "property": "joined", "ascending": false }]
        }"#,
    )
    .unwrap();

    let result = people().apply_request(&request).unwrap();
    assert_eq!(names(result), vec!["Dee", "Ann", "Cid"]);
}

#[test]
fn query_string_request() {
    let request = QueryRequest::from_query_pairs([
        ("filter", "years:gte:20"),
        ("page", "2"),
        ("sort", "-years,name"),
    ])
    .unwrap();
    assert_eq!(request.filters.len(), 1);
    assert_eq!(request.sort.len(), 2);

    let result = QueryPipeline::new().apply(people(), &request).unwrap();
    assert_eq!(names(result), vec!["Ann", "Cid", "Dee", "Bob"]);
}

#[test]
fn malformed_requests_fail() {
    assert!(matches!(
        QueryRequest::from_json("{\"filters\": 3}"),
        Err(SieveError::InvalidRequest(_))
    ));
    assert!(QueryRequest::from_query_pairs([("filter", "years")]).is_err());
    assert!(QueryRequest::from_query_pairs([("filter", "years:about:3")]).is_err());
}

// ============================================================================
// Specifications
// ============================================================================

#[test]
fn specifications_combine() {
    let young = Spec::<Person>::from_filter(&"years:lt:30".parse().unwrap()).unwrap();
    let named_c = Spec::<Person>::from_filter(&"name:startswith:C".parse().unwrap()).unwrap();

    let either = &young | &named_c;
    let result = either.apply(people()).unwrap();
    assert_eq!(names(result), vec!["Bob", "Cid", "Eve"]);

    let neither = !either;
    let result = neither.apply(people()).unwrap();
    assert_eq!(names(result), vec!["Ann", "Dee"]);

    let sample = person("Cal", 50, None, true, (2020, 1, 1));
    assert!(named_c.is_satisfied_by(&sample));
    assert!(!(young & named_c).is_satisfied_by(&sample));
}

// ============================================================================
// SQL pushdown
// ============================================================================

#[test]
fn request_pushed_down_to_sql() {
    let request = QueryRequest::new()
        .filter("years:gte:18".parse().unwrap())
        .filter("name:startswith:A".parse().unwrap())
        .filter("height:gt:2".parse().unwrap())
        .sort(SortSpec::desc("years"))
        .sort(SortSpec::asc("name"));

    let query = SqlQuery::<Person>::new("people")
        .apply_request(&request)
        .unwrap();
    let sql = query.to_sql();

    assert!(sql.starts_with("SELECT * FROM \"people\" WHERE "));
    assert!(sql.contains("(\"years\" >= 18)"));
    assert!(sql.contains("LIKE 'A%'"));
    assert!(!sql.contains("height"));
    assert!(sql.ends_with("ORDER BY \"years\" DESC, \"name\" ASC"));
}

#[test]
fn month_set_pushed_down_to_sql() {
    let query = SqlQuery::<Person>::new("people")
        .filter_by(&"joined:monthin:1,2".parse().unwrap())
        .unwrap();
    let clause = query.where_clause().unwrap();
    assert!(clause.contains("EXTRACT(MONTH FROM \"joined\")"));
    assert!(clause.contains("IN (1, 2)"));
}

#[test]
fn nullable_negations_agree_across_backends() {
    let not_ann = FilterSpec::new("email", ComparisonKind::NotEquals, "ann@example.com");
    let not_org = FilterSpec::new("email", ComparisonKind::NotEndsWith, ".org");

    // Bob and Dee have no email and pass both negated filters in memory.
    let kept = people().filter_all(&[not_ann.clone(), not_org.clone()]).unwrap();
    assert_eq!(names(kept), vec!["Bob", "Dee", "Eve"]);

    let query = SqlQuery::<Person>::new("people")
        .filter_all(&[not_ann, not_org])
        .unwrap();
    assert_eq!(
        query.where_clause().unwrap(),
        "(\"email\" <> 'ann@example.com' OR \"email\" IS NULL) \
         AND NOT (COALESCE((\"email\" LIKE '%.org' ESCAPE '\\'), FALSE))"
    );
}
