//! Type-directed compiler - turns the AST into a [`Predicate`]
//!
//! Each leaf is parsed with the field-filter grammar, resolved against the
//! schema, permission-checked and converted to a typed [`Comparison`].
//! Negation is pushed down to the leaves (De Morgan), so the compiled tree
//! only ever negates single comparisons.

use crate::ast::{ExpressionNode, LogicalOperator, Node};
use crate::error::{Error, Result};
use crate::filter::{self, FilterSpec, FilterValue, LeafFilter, PATH_SEPARATOR};
use crate::lexer;
use crate::operator::Operator;
use crate::parser::{self, Parser, DEFAULT_MAX_DEPTH};
use crate::predicate::{CompareOp, Comparison, Predicate};
use crate::schema::{ResolvedField, Schema};
use crate::value::TypedValue;
use serde::{Deserialize, Serialize};

/// Which grammar a query is checked against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    /// Full boolean grammar
    #[default]
    Filter,
    /// Issue search: `or` is rejected
    Search,
}

/// Compiler bound to a schema and the caller's permitted fields
#[derive(Debug, Clone)]
pub struct Compiler<'a> {
    schema: &'a Schema,
    permitted: Option<&'a [String]>,
    mode: QueryMode,
    max_depth: usize,
}

impl<'a> Compiler<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self {
            schema,
            permitted: None,
            mode: QueryMode::Filter,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Restrict compilation to the given fields. Without this every schema
    /// field is permitted.
    pub fn with_permitted(mut self, permitted: &'a [String]) -> Self {
        self.permitted = Some(permitted);
        self
    }

    pub fn with_mode(mut self, mode: QueryMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    /// Parse query text into an AST, applying the mode's policy.
    pub fn parse(&self, query: &str) -> Result<Option<Node>> {
        parser::check_brackets(query)?;
        let tokens = lexer::tokenize(query)?;
        let node = Parser::new(&tokens)
            .with_max_depth(self.max_depth)
            .parse()?;

        if self.mode == QueryMode::Search && node.as_ref().is_some_and(Node::contains_or) {
            return Err(Error::OperatorNotSupported("OR"));
        }
        Ok(node)
    }

    /// Parse and compile query text. An empty query compiles to `None`.
    pub fn compile_query(&self, query: &str) -> Result<Option<Predicate>> {
        let Some(node) = self.parse(query)? else {
            return Ok(None);
        };
        let predicate = self.compile(&node)?;
        tracing::debug!(query, mode = ?self.mode, "compiled query");
        Ok(Some(predicate))
    }

    pub fn compile(&self, node: &Node) -> Result<Predicate> {
        self.transform(node, false)
    }

    /// Compile `node`, negated when `negate` is set.
    ///
    /// `not (a and b)` becomes `or(not a, not b)`; `not (a or b)` becomes
    /// `nor(a, b)`; `not not a` becomes `a`.
    pub fn transform(&self, node: &Node, negate: bool) -> Result<Predicate> {
        match node {
            Node::Expression(expr) => {
                let comparison = self.compile_leaf(expr)?;
                Ok(if negate {
                    Predicate::Not(comparison)
                } else {
                    Predicate::Compare(comparison)
                })
            }
            Node::Operator {
                operator: LogicalOperator::And,
                left,
                right,
            } => {
                let left = self.transform(left, negate)?;
                let right = self.transform(right, negate)?;
                Ok(if negate {
                    Predicate::or(left, right)
                } else {
                    Predicate::and(left, right)
                })
            }
            Node::Operator {
                operator: LogicalOperator::Or,
                left,
                right,
            } => {
                let left = self.transform(left, false)?;
                let right = self.transform(right, false)?;
                Ok(if negate {
                    Predicate::nor(left, right)
                } else {
                    Predicate::or(left, right)
                })
            }
            Node::Not(inner) => self.transform(inner, !negate),
        }
    }

    pub fn compile_leaf(&self, expr: &ExpressionNode) -> Result<Comparison> {
        match filter::parse_expression(expr)? {
            LeafFilter::Field(spec) => self.compile_filter(&spec),
            LeafFilter::Hashtag(name) => self.compile_hashtag(&name),
        }
    }

    /// Resolve a field path and check the caller may use it.
    pub fn resolve(&self, path: &[String]) -> Result<ResolvedField<'a>> {
        let field = self
            .schema
            .resolve(path)
            .ok_or_else(|| Error::UnknownField(path.join(PATH_SEPARATOR)))?;

        if let Some(permitted) = self.permitted {
            if !field.def.is_permitted(permitted) {
                return Err(Error::FieldNotPermitted(field.name));
            }
        }
        Ok(field)
    }

    pub fn compile_filter(&self, spec: &FilterSpec) -> Result<Comparison> {
        let field = self.resolve(&spec.field_path)?;
        let operator = spec.operator();

        if !field.field_type.supports(operator) {
            return Err(Error::InvalidOperatorForField {
                field: field.name,
                operator,
                allowed: field.field_type.operators(),
            });
        }

        let items = spec.value.items();
        let value = if operator.accepts_list() {
            TypedValue::List(items.iter().map(|raw| field.field_type.coerce(raw)).collect())
        } else {
            let [raw] = items else {
                return Err(Error::MultipleValues {
                    field: field.name,
                    operator,
                });
            };
            if operator.is_pattern() {
                TypedValue::String(pattern(operator, raw))
            } else {
                field.field_type.coerce(raw)
            }
        };

        tracing::trace!(
            field = %field.path,
            %operator,
            field_type = %field.field_type,
            value_type = value.type_name(),
            "compiled filter"
        );

        Ok(Comparison {
            field: field.path,
            op: compare_op(operator),
            value,
        })
    }

    /// Expand a schema-declared hashtag into its comparison.
    pub fn compile_hashtag(&self, name: &str) -> Result<Comparison> {
        let hashtag = self
            .schema
            .hashtag(name)
            .ok_or_else(|| Error::UnknownField(format!("#{}", name)))?;

        let spec = FilterSpec {
            field_path: hashtag
                .field
                .split(PATH_SEPARATOR)
                .map(str::to_string)
                .collect(),
            operator: hashtag.operator,
            value: FilterValue::Scalar(hashtag.value.clone()),
        };
        self.compile_filter(&spec)
    }
}

fn compare_op(operator: Operator) -> CompareOp {
    match operator {
        Operator::Eq => CompareOp::Eq,
        Operator::Ne => CompareOp::Ne,
        Operator::In => CompareOp::In,
        Operator::Nin => CompareOp::Nin,
        Operator::Lt => CompareOp::Lt,
        Operator::Lte => CompareOp::Lte,
        Operator::Gt => CompareOp::Gt,
        Operator::Gte => CompareOp::Gte,
        Operator::Contains | Operator::Startswith | Operator::Endswith => CompareOp::Regex {
            case_insensitive: false,
        },
        Operator::Icontains => CompareOp::Regex {
            case_insensitive: true,
        },
    }
}

/// Escaped substring pattern, anchored for prefix/suffix operators.
fn pattern(operator: Operator, raw: &str) -> String {
    let escaped = regex::escape(raw);
    match operator {
        Operator::Startswith => format!("^{}", escaped),
        Operator::Endswith => format!("{}$", escaped),
        _ => escaped,
    }
}
