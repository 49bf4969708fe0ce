//! Sieve - runtime filter and sort compiler for typed records.
//!
//! Sieve turns declarative, data-driven requests ("property `age`,
//! greater than, `30`") into typed predicates and sort keys over a Rust
//! record type, and applies them to a query source: an in-memory
//! collection, or a SQL statement the predicates are pushed down into.
//!
//! - Property lookup by name through a per-type accessor registry
//! - Literal coercion to the exact property type (`"30"` becomes `30u8`)
//! - String, boolean, numeric, date and set-membership comparisons
//! - Stable multi-key ordering with nulls last
//! - An algebra over predicate trees: and/or/not, composition, partial
//!   application, widening, cartesian products
//!
//! # Quick Start
//!
//! ```rust
//! use sieve::{ComparisonKind, FilterSpec, InMemory, QueryPipeline, Record, SortSpec};
//!
//! #[derive(Record)]
//! struct Person {
//!     name: String,
//!     age: u32,
//! }
//!
//! let people = InMemory::new(vec![
//!     Person { name: "Ann".into(), age: 41 },
//!     Person { name: "Bob".into(), age: 20 },
//!     Person { name: "Cid".into(), age: 35 },
//! ]);
//!
//! let pipeline = QueryPipeline::new();
//! let older = pipeline
//!     .apply_filter(people, &FilterSpec::new("age", ComparisonKind::GreaterThan, "30"))
//!     .unwrap();
//! let sorted = pipeline.apply_sorts(older, &[SortSpec::desc("age")]).unwrap();
//!
//! let names: Vec<String> = sorted.into_iter().map(|p| p.name).collect();
//! assert_eq!(names, vec!["Ann", "Cid"]);
//! ```
//!
//! # Unsupported Requests
//!
//! A filter naming an unknown property, or a comparison the property type
//! does not support, is dropped: the source comes back unchanged and the
//! drop is logged at `debug` level through `tracing`. A literal that cannot
//! be parsed as the property type is different: it fails with
//! [`SieveError::LiteralParse`].
//!
//! | Property type | Comparisons |
//! |---------------|-------------|
//! | String | `eq`, `ne`, `contains`, `startswith`, `endswith` (and `n*` negations), `in` |
//! | Bool | `eq`, `ne` |
//! | Number | `eq`, `ne`, `lt`, `lte`, `gt`, `gte`, `in` |
//! | Date | `eq`, `ne`, `lt`, `lte`, `gt`, `gte`, `monthin` |

pub mod algebra;
mod compiler;
pub mod curry;
mod error;
pub mod expr;
mod kind;
pub mod literal;
mod pipeline;
mod predicate;
mod record;
mod registry;
mod source;
mod spec;
mod spec_types;
mod types;
mod value;

// Re-export public API
pub use compiler::{Compiled, DropReason, PredicateCompiler};
pub use error::{Result, SieveError};
pub use expr::render::SqlTranslator;
pub use expr::{Expr, Lambda, Parameter};
pub use kind::ComparisonKind;
pub use pipeline::{QueryExt, QueryPipeline};
pub use predicate::{KeySelector, Predicate};
pub use record::{Field, Property, Record};
pub use registry::{Accessor, AccessorRegistry};
pub use source::{compare_keys, InMemory, QuerySource, SqlQuery};
pub use spec::{Spec, Specification};
pub use spec_types::{FilterSpec, FilterValue, QueryRequest, SortSpec};
pub use types::{NumberKind, ValueType};
pub use value::{compare_values, Number, Value};

// Derive macro, named after the trait it implements.
#[cfg(feature = "derive")]
pub use sieve_macros::Record;
