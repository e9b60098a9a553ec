//! Error types for the query language

use crate::operator::Operator;
use crate::token::{Expected, TokenKind};
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Query parsing and compilation errors.
///
/// Every variant is a deterministic validation failure. Positions are
/// character offsets into the query text.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error(
        "Invalid operator '{operator}' at position {position}, expected one of: {}",
        join(.expected)
    )]
    InvalidOperator {
        operator: String,
        position: usize,
        preceding: Option<TokenKind>,
        expected: &'static [Expected],
    },

    #[error(
        "Invalid bracket '{bracket}' at position {position}, expected one of: {}",
        join(.expected)
    )]
    InvalidBracket {
        bracket: char,
        position: usize,
        preceding: Option<TokenKind>,
        expected: &'static [Expected],
    },

    #[error("Unmatched ')' at position {position}")]
    UnmatchedBracket { position: usize },

    #[error("Missing ')' at position {position} (end of query)")]
    MissingBracket { position: usize },

    #[error("Unexpected end of expression after '{after}' at position {position}")]
    UnexpectedEnd { after: String, position: usize },

    #[error("Unexpected token '{token}' at position {position}")]
    UnexpectedToken { token: String, position: usize },

    #[error("Expression too deeply nested (max depth: {max_depth})")]
    TooDeeplyNested { max_depth: usize },

    #[error("Invalid expression '{expression}' at position {position}: {reason}")]
    InvalidExpression {
        expression: String,
        position: usize,
        reason: String,
    },

    #[error("Unknown field '{0}'")]
    UnknownField(String),

    #[error("Filtering on field '{0}' is not permitted")]
    FieldNotPermitted(String),

    #[error(
        "Operator '{operator}' is not valid for field '{field}', allowed: {}",
        join(.allowed)
    )]
    InvalidOperatorForField {
        field: String,
        operator: Operator,
        allowed: &'static [Operator],
    },

    #[error("Operator '{operator}' on field '{field}' accepts a single value")]
    MultipleValues { field: String, operator: Operator },

    #[error("Unknown field for sorting '{0}'")]
    UnknownSortField(String),

    #[error("{0} operator is not supported")]
    OperatorNotSupported(&'static str),

    #[error("Value {0:?} cannot be written in a query")]
    UnquotableValue(String),
}

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
