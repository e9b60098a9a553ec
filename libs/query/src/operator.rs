//! Field comparison operators
//!
//! Operators are written as a `___<name>` suffix on the field, e.g.
//! `priority___gte: 2`. Which operators a field accepts depends on its
//! declared type, see [`crate::schema::FieldType::operators`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Comparison operator of a filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    // Universal operators
    Eq,
    Ne,
    In,
    Nin,

    // Ordering operators
    Lt,
    Lte,
    Gt,
    Gte,

    // String pattern operators
    Contains,
    Icontains,
    Startswith,
    Endswith,
}

impl Operator {
    /// Operator used when a filter carries no explicit suffix.
    pub const DEFAULT: Operator = Operator::Eq;

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "eq" => Some(Self::Eq),
            "ne" => Some(Self::Ne),
            "in" => Some(Self::In),
            "nin" => Some(Self::Nin),
            "lt" => Some(Self::Lt),
            "lte" => Some(Self::Lte),
            "gt" => Some(Self::Gt),
            "gte" => Some(Self::Gte),
            "contains" => Some(Self::Contains),
            "icontains" => Some(Self::Icontains),
            "startswith" => Some(Self::Startswith),
            "endswith" => Some(Self::Endswith),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::In => "in",
            Self::Nin => "nin",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Contains => "contains",
            Self::Icontains => "icontains",
            Self::Startswith => "startswith",
            Self::Endswith => "endswith",
        }
    }

    /// `in` / `nin` take a value list; every other operator takes one value.
    pub fn accepts_list(self) -> bool {
        matches!(self, Self::In | Self::Nin)
    }

    pub fn is_pattern(self) -> bool {
        matches!(
            self,
            Self::Contains | Self::Icontains | Self::Startswith | Self::Endswith
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
