//! Issue-tracker query language - lexer, parser, type-directed compiler
//!
//! This crate turns search text such as
//! `"Priority Level": high and not (labels: bug or votes___lt: 3) sort by: -updated_at`
//! into a compiled predicate tree plus sort keys, and converts between query
//! text and the structured filter lists edited by a UI.
//!
//! # Pipeline
//!
//! ```text
//! Query String
//!      |
//!   Bracket check + Lexer -> Tokens
//!      |
//!   Parser -> AST (and / or / not over raw leaves)
//!      |
//!   Field-filter grammar -> FilterSpec per leaf
//!      |
//!   Compiler (schema, permissions, De Morgan) -> Predicate
//! ```
//!
//! Sort clauses are parsed separately ([`sort::parse_sort`]); the
//! [`builder`] sits beside the pipeline for UI round-tripping.
//!
//! ```
//! use trackql_query::{FieldDef, FieldType, QueryEngine, QueryMode, Schema};
//!
//! let schema = Schema::new(vec![
//!     FieldDef::reserved("subject", FieldType::String),
//!     FieldDef::custom("Priority Level", "G1", FieldType::String),
//! ]);
//! let engine = QueryEngine::new(&schema);
//! let predicate = engine
//!     .parse_filter(r#""Priority Level": high and subject: test"#, QueryMode::Search)
//!     .unwrap();
//! assert!(predicate.is_some());
//! ```

pub mod ast;
pub mod builder;
pub mod compiler;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod lexer;
pub mod operator;
pub mod parser;
pub mod predicate;
pub mod schema;
pub mod sort;
pub mod token;
pub mod value;

// Re-export main types
pub use ast::{ExpressionNode, LogicalOperator, Node};
pub use builder::{
    AvailableField, Builder, BuilderFilter, BuilderQuery, BuilderResponse, BuilderSort,
    FilterKind, ResolvedFilter, ResolvedSort,
};
pub use compiler::{Compiler, QueryMode};
pub use config::QueryConfig;
pub use engine::{CompiledQuery, QueryEngine};
pub use error::{Error, Result};
pub use filter::{FilterSpec, FilterValue, LeafFilter};
pub use operator::Operator;
pub use predicate::{CompareOp, Comparison, Predicate};
pub use schema::{FieldDef, FieldPath, FieldType, Hashtag, Schema};
pub use sort::{Direction, SortSpec};
pub use token::{Expected, Token, TokenKind};
pub use value::TypedValue;
