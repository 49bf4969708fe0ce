//! Error types for the sieve crate.
//!
//! Only malformed input is an error. Filters and sorts that cannot be
//! resolved against a record type are not errors: they are dropped and
//! reported through [`DropReason`](crate::DropReason) instead.

use thiserror::Error;

/// Errors that can occur when compiling, combining or evaluating predicates.
#[derive(Debug, Error)]
pub enum SieveError {
    /// A filter literal could not be parsed into the property's type.
    #[error("cannot parse '{literal}' as {target}")]
    LiteralParse {
        literal: String,
        target: &'static str,
    },

    /// A predicate or specification was built from an unusable lambda.
    #[error("invalid predicate: {0}")]
    InvalidPredicate(String),

    /// Two lambdas with different parameter counts were combined, or a
    /// parameter position was out of range.
    #[error("arity mismatch: expected {expected} parameter(s), got {actual}")]
    ArityMismatch { expected: usize, actual: usize },

    /// A record type could not enumerate its properties.
    #[error("cannot introspect {type_name}: {reason}")]
    Introspection {
        type_name: &'static str,
        reason: String,
    },

    /// A hand-built expression tree failed at evaluation time.
    #[error("evaluation failed: {0}")]
    Evaluation(String),

    /// An expression cannot be rendered by a query translator.
    #[error("cannot translate expression: {0}")]
    Untranslatable(String),

    /// Unknown comparison name in a textual filter.
    #[error("unknown comparison '{0}'")]
    UnknownComparison(String),

    /// A textual filter or sort could not be parsed.
    #[error("invalid filter syntax: {0}")]
    InvalidFilter(String),

    /// A JSON query request could not be decoded.
    #[error("invalid query request: {0}")]
    InvalidRequest(#[from] serde_json::Error),
}

/// Result type for sieve operations.
pub type Result<T> = std::result::Result<T, SieveError>;
