//! Query engine configuration

use crate::parser::DEFAULT_MAX_DEPTH;
use crate::sort::Direction;
use serde::{Deserialize, Serialize};

/// Tunables shared by every query compiled with one engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Field of the implicit sort, omitted from serialized queries
    pub default_sort_field: String,
    pub default_sort_direction: Direction,
    /// Maximum nesting of brackets and `not`
    pub max_depth: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_sort_field: "updated_at".to_string(),
            default_sort_direction: Direction::Desc,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}
