//! Compiled predicates
//!
//! A [`Predicate`] is a boolean tree over typed comparisons, handed to the
//! query-execution layer. Negation only ever wraps a single comparison;
//! negated groups are rewritten by the compiler (De Morgan).

use crate::schema::FieldPath;
use crate::value::TypedValue;
use regex::RegexBuilder;
use serde::Serialize;
use serde_json::Value as Json;
use std::cmp::Ordering;

/// Comparison applied to a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Ne,
    In,
    Nin,
    Lt,
    Lte,
    Gt,
    Gte,
    /// Substring match; the value holds an escaped, possibly anchored pattern
    Regex { case_insensitive: bool },
}

/// Leaf comparison
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub field: FieldPath,
    pub op: CompareOp,
    pub value: TypedValue,
}

/// Compiled boolean tree
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    Compare(Comparison),
    Not(Comparison),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    /// Matches when none of the children match
    Nor(Vec<Predicate>),
}

impl Predicate {
    /// Conjunction; nested conjunctions are flattened.
    pub fn and(left: Predicate, right: Predicate) -> Self {
        let mut children = Vec::new();
        for p in [left, right] {
            match p {
                Predicate::And(inner) => children.extend(inner),
                other => children.push(other),
            }
        }
        Predicate::And(children)
    }

    /// Disjunction; nested disjunctions are flattened.
    pub fn or(left: Predicate, right: Predicate) -> Self {
        let mut children = Vec::new();
        for p in [left, right] {
            match p {
                Predicate::Or(inner) => children.extend(inner),
                other => children.push(other),
            }
        }
        Predicate::Or(children)
    }

    /// "Neither" combinator. A disjunctive child is absorbed, since
    /// `nor(or(a, b), c)` is `nor(a, b, c)`.
    pub fn nor(left: Predicate, right: Predicate) -> Self {
        let mut children = Vec::new();
        for p in [left, right] {
            match p {
                Predicate::Or(inner) => children.extend(inner),
                other => children.push(other),
            }
        }
        Predicate::Nor(children)
    }

    /// Evaluate against a JSON document.
    pub fn matches(&self, doc: &Json) -> bool {
        match self {
            Predicate::Compare(c) => c.matches(doc),
            Predicate::Not(c) => !c.matches(doc),
            Predicate::And(children) => children.iter().all(|p| p.matches(doc)),
            Predicate::Or(children) => children.iter().any(|p| p.matches(doc)),
            Predicate::Nor(children) => !children.iter().any(|p| p.matches(doc)),
        }
    }
}

impl Comparison {
    /// Evaluate against a JSON document.
    ///
    /// Array-valued fields match when any element matches. Missing or null
    /// fields only satisfy `ne` and `nin`.
    pub fn matches(&self, doc: &Json) -> bool {
        let values = lookup(doc, &self.field.0);
        match &self.op {
            CompareOp::Eq => values.iter().any(|v| equals(&self.value, v)),
            CompareOp::Ne => !values.iter().any(|v| equals(&self.value, v)),
            CompareOp::In => values.iter().any(|v| in_list(&self.value, v)),
            CompareOp::Nin => !values.iter().any(|v| in_list(&self.value, v)),
            CompareOp::Lt => self.any_ordering(&values, |o| o == Ordering::Less),
            CompareOp::Lte => self.any_ordering(&values, |o| o != Ordering::Greater),
            CompareOp::Gt => self.any_ordering(&values, |o| o == Ordering::Greater),
            CompareOp::Gte => self.any_ordering(&values, |o| o != Ordering::Less),
            CompareOp::Regex { case_insensitive } => {
                let TypedValue::String(pattern) = &self.value else {
                    return false;
                };
                let Ok(re) = RegexBuilder::new(pattern)
                    .case_insensitive(*case_insensitive)
                    .build()
                else {
                    return false;
                };
                values
                    .iter()
                    .any(|v| v.as_str().is_some_and(|s| re.is_match(s)))
            }
        }
    }

    fn any_ordering(&self, values: &[&Json], accept: impl Fn(Ordering) -> bool) -> bool {
        values
            .iter()
            .any(|v| self.value.compare_json(v).is_some_and(&accept))
    }
}

fn equals(value: &TypedValue, doc: &Json) -> bool {
    value.compare_json(doc) == Some(Ordering::Equal)
}

fn in_list(value: &TypedValue, doc: &Json) -> bool {
    match value {
        TypedValue::List(items) => items.iter().any(|item| equals(item, doc)),
        single => equals(single, doc),
    }
}

/// Collect the values addressed by `path`, descending into arrays.
fn lookup<'a>(doc: &'a Json, path: &[String]) -> Vec<&'a Json> {
    let mut current = vec![doc];
    for segment in path {
        let mut next = Vec::new();
        for value in current {
            match value {
                Json::Object(map) => next.extend(map.get(segment)),
                Json::Array(items) => next.extend(
                    items
                        .iter()
                        .filter_map(|item| item.as_object()?.get(segment)),
                ),
                _ => {}
            }
        }
        current = next;
    }

    let mut out = Vec::new();
    for value in current {
        match value {
            Json::Array(items) => out.extend(items.iter().filter(|v| !v.is_null())),
            Json::Null => {}
            other => out.push(other),
        }
    }
    out
}
