//! Abstract Syntax Tree for boolean query expressions
//!
//! Leaves hold the raw filter text; the field-filter grammar parses it during
//! compilation.

use serde::Serialize;
use std::fmt;

/// Binary logical operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalOperator {
    And,
    Or,
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalOperator::And => f.write_str("and"),
            LogicalOperator::Or => f.write_str("or"),
        }
    }
}

/// A leaf: one un-parsed filter literal and its span
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpressionNode {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// AST node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    Expression(ExpressionNode),
    Operator {
        operator: LogicalOperator,
        left: Box<Node>,
        right: Box<Node>,
    },
    Not(Box<Node>),
}

impl Node {
    pub fn and(left: Node, right: Node) -> Self {
        Node::Operator {
            operator: LogicalOperator::And,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn or(left: Node, right: Node) -> Self {
        Node::Operator {
            operator: LogicalOperator::Or,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Returns `true` if an `or` appears anywhere in the tree.
    pub fn contains_or(&self) -> bool {
        match self {
            Node::Expression(_) => false,
            Node::Operator {
                operator: LogicalOperator::Or,
                ..
            } => true,
            Node::Operator { left, right, .. } => left.contains_or() || right.contains_or(),
            Node::Not(inner) => inner.contains_or(),
        }
    }

    /// Returns `true` if a `not` appears anywhere in the tree.
    pub fn contains_not(&self) -> bool {
        match self {
            Node::Expression(_) => false,
            Node::Operator { left, right, .. } => left.contains_not() || right.contains_not(),
            Node::Not(_) => true,
        }
    }

    /// Collect the leaves of a pure `and` chain in source order.
    ///
    /// Returns `None` if the tree contains `or` or `not`.
    pub fn conjuncts(&self) -> Option<Vec<&ExpressionNode>> {
        let mut out = Vec::new();
        self.collect_conjuncts(&mut out).then_some(out)
    }

    fn collect_conjuncts<'a>(&'a self, out: &mut Vec<&'a ExpressionNode>) -> bool {
        match self {
            Node::Expression(expr) => {
                out.push(expr);
                true
            }
            Node::Operator {
                operator: LogicalOperator::And,
                left,
                right,
            } => left.collect_conjuncts(out) && right.collect_conjuncts(out),
            _ => false,
        }
    }
}

/// Compact rendering with explicit grouping, e.g. `((a:1 and b:2) or c:3)`.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Expression(expr) => f.write_str(&expr.text),
            Node::Operator {
                operator,
                left,
                right,
            } => write!(f, "({} {} {})", left, operator, right),
            Node::Not(inner) => write!(f, "not {}", inner),
        }
    }
}
