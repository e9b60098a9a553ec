//! Sort clause parsing
//!
//! `priority, -updated_at, "Due Date"`: comma-separated field paths, each
//! optionally prefixed with `-` for descending order.

use crate::error::{Error, Result};
use crate::filter::{self, PATH_SEPARATOR};
use crate::schema::{FieldPath, Schema};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }

    /// Prefix used in sort clauses.
    pub fn prefix(self) -> &'static str {
        match self {
            Direction::Asc => "",
            Direction::Desc => "-",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved sort key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortSpec {
    /// Canonical field name (display name for custom fields)
    pub field: String,
    /// Storage path
    pub path: FieldPath,
    pub direction: Direction,
}

/// Parse a sort clause against the schema.
///
/// Unknown fields raise [`Error::UnknownSortField`]; fields outside
/// `permitted` (when given) raise [`Error::FieldNotPermitted`].
pub fn parse_sort(
    text: &str,
    schema: &Schema,
    permitted: Option<&[String]>,
) -> Result<Vec<SortSpec>> {
    let out = parse_sort_with(text, |path, direction| {
        let field = schema
            .resolve(&path)
            .ok_or_else(|| Error::UnknownSortField(path.join(PATH_SEPARATOR)))?;

        if let Some(permitted) = permitted {
            if !field.def.is_permitted(permitted) {
                return Err(Error::FieldNotPermitted(field.name));
            }
        }

        Ok(SortSpec {
            field: field.name,
            path: field.path,
            direction,
        })
    })?;

    tracing::debug!(sort = text, keys = out.len(), "parsed sort clause");
    Ok(out)
}

/// Split a sort clause into its parsed field paths and hand each one to
/// `resolve`, in order.
pub(crate) fn parse_sort_with<T>(
    text: &str,
    mut resolve: impl FnMut(Vec<String>, Direction) -> Result<T>,
) -> Result<Vec<T>> {
    let mut out = Vec::new();

    for (offset, raw) in split_unquoted(text, ',') {
        let mut item = raw.trim();
        if item.is_empty() {
            continue;
        }

        let mut direction = Direction::Asc;
        if let Some(rest) = item.strip_prefix('-') {
            direction = Direction::Desc;
            item = rest.trim_start();
        }

        let path = filter::parse_field_path(item).map_err(|reason| Error::InvalidExpression {
            expression: raw.trim().to_string(),
            position: text[..offset].chars().count(),
            reason,
        })?;

        out.push(resolve(path, direction)?);
    }

    Ok(out)
}

/// Split on `sep` outside double quotes, keeping each piece's byte offset.
pub(crate) fn split_unquoted(input: &str, sep: char) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut start = 0usize;
    let mut in_quotes = false;
    for (i, c) in input.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            c if c == sep && !in_quotes => {
                out.push((start, &input[start..i]));
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    out.push((start, &input[start..]));
    out
}
