//! Query builder - structured filter/sort lists to and from query text
//!
//! UIs edit a query as a list of filters and sort keys. [`Builder::build`]
//! renders that list as canonical query text and [`Builder::parse`] reads
//! text back into the same structure, so `parse(build(q).query)` reports the
//! filters and sort keys of `build(q)`.
//!
//! The configured default sort is left out of the text but always listed in
//! the response.

use crate::compiler::{Compiler, QueryMode};
use crate::config::QueryConfig;
use crate::error::{Error, Result};
use crate::filter::{
    self, name_path, FilterSpec, FilterValue, LeafFilter, OPERATOR_SEPARATOR, PATH_SEPARATOR,
};
use crate::operator::Operator;
use crate::schema::{FieldDef, Schema};
use crate::sort::{self, Direction};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Marker separating the filter part of a query from its sort clause.
static SORT_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bsort\s+by\s*:").expect("sort marker regex must compile"));

const SORT_PREFIX: &str = "sort by: ";

/// Structured query as edited by a UI
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderQuery {
    #[serde(default)]
    pub filters: Vec<BuilderFilter>,
    #[serde(default)]
    pub sort_by: Vec<BuilderSort>,
}

/// One filter of a [`BuilderQuery`]. A name starting with `#` is a hashtag
/// and carries no value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderFilter {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<Operator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<FilterValue>,
    /// Custom field id; takes precedence over `name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderSort {
    pub name: String,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gid: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    Field,
    Hashtag,
}

/// A validated filter as reported back to the UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedFilter {
    pub kind: FilterKind,
    /// Canonical field name, or the hashtag name
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator: Option<Operator>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<FilterValue>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedSort {
    pub name: String,
    pub direction: Direction,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gid: Option<String>,
}

/// A schema field not used by any filter yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailableField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuilderResponse {
    /// Canonical query text
    pub query: String,
    pub filters: Vec<ResolvedFilter>,
    /// Effective sort; the default sort when none was given
    pub sort_by: Vec<ResolvedSort>,
    pub available_fields: Vec<AvailableField>,
}

struct FilterClause<'a> {
    filter: ResolvedFilter,
    text: String,
    root: Option<&'a FieldDef>,
}

struct SortClause {
    sort: ResolvedSort,
    text: String,
}

/// Converts between [`BuilderQuery`] and query text
#[derive(Debug, Clone)]
pub struct Builder<'a> {
    schema: &'a Schema,
    permitted: Option<&'a [String]>,
    config: &'a QueryConfig,
}

impl<'a> Builder<'a> {
    pub fn new(schema: &'a Schema, config: &'a QueryConfig) -> Self {
        Self {
            schema,
            permitted: None,
            config,
        }
    }

    pub fn with_permitted(mut self, permitted: &'a [String]) -> Self {
        self.permitted = Some(permitted);
        self
    }

    fn compiler(&self) -> Compiler<'a> {
        let compiler = Compiler::new(self.schema)
            .with_mode(QueryMode::Search)
            .with_max_depth(self.config.max_depth);
        match self.permitted {
            Some(permitted) => compiler.with_permitted(permitted),
            None => compiler,
        }
    }

    /// Validate a structured query and render it as text.
    pub fn build(&self, query: &BuilderQuery) -> Result<BuilderResponse> {
        let compiler = self.compiler();

        let mut filters = Vec::with_capacity(query.filters.len());
        for filter in &query.filters {
            let clause = match filter.name.strip_prefix('#') {
                Some(tag) if filter.gid.is_none() => self.hashtag_clause(&compiler, tag)?,
                _ => {
                    let field_path = match &filter.gid {
                        Some(gid) => {
                            self.schema
                                .custom_field(gid)
                                .ok_or_else(|| Error::UnknownField(gid.clone()))?;
                            vec![gid.clone()]
                        }
                        None => name_path(&filter.name),
                    };
                    let value = filter.value.clone().ok_or_else(|| missing_value(&filter.name))?;
                    self.field_clause(
                        &compiler,
                        FilterSpec {
                            field_path,
                            operator: filter.operator,
                            value,
                        },
                    )?
                }
            };
            filters.push(clause);
        }

        let mut sorts = Vec::with_capacity(query.sort_by.len());
        for sort in &query.sort_by {
            let path = match &sort.gid {
                Some(gid) => vec![gid.clone()],
                None => name_path(&sort.name),
            };
            sorts.push(self.sort_clause(&path, sort.direction)?);
        }

        let response = self.respond(filters, sorts);
        tracing::debug!(query = %response.query, "built query");
        Ok(response)
    }

    /// Read query text (with an optional `sort by:` clause) into structured
    /// form. Only `and` chains are accepted.
    pub fn parse(&self, text: &str) -> Result<BuilderResponse> {
        let (filter_text, sort_text) = split_sort_clause(text);
        let compiler = self.compiler();

        let mut filters = Vec::new();
        if let Some(node) = compiler.parse(filter_text)? {
            if node.contains_not() {
                return Err(Error::OperatorNotSupported("NOT"));
            }
            let leaves = node
                .conjuncts()
                .ok_or(Error::OperatorNotSupported("OR"))?;
            for leaf in leaves {
                let clause = match filter::parse_expression(leaf)? {
                    LeafFilter::Field(spec) => self.field_clause(&compiler, spec)?,
                    LeafFilter::Hashtag(name) => self.hashtag_clause(&compiler, &name)?,
                };
                filters.push(clause);
            }
        }

        let sorts = match sort_text {
            Some(sort_text) => sort::parse_sort_with(sort_text, |path, direction| {
                self.sort_clause(&path, direction)
            })?,
            None => Vec::new(),
        };

        Ok(self.respond(filters, sorts))
    }

    fn field_clause(&self, compiler: &Compiler<'a>, spec: FilterSpec) -> Result<FilterClause<'a>> {
        if spec.value.items().is_empty() {
            return Err(missing_value(&spec.field_name()));
        }
        compiler.compile_filter(&spec)?;
        let field = compiler.resolve(&spec.field_path)?;

        let op = spec.operator();
        let value = spec.value.normalized_for(op);
        let mut text = render_field(field.def, &spec.field_path[1..])?;
        if let Some(operator) = spec.operator {
            text.push_str(OPERATOR_SEPARATOR);
            text.push_str(operator.as_str());
        }
        text.push_str(": ");
        text.push_str(&render_value(&value)?);

        Ok(FilterClause {
            filter: ResolvedFilter {
                kind: FilterKind::Field,
                name: field.name,
                operator: spec.operator,
                value: Some(value),
                field_type: Some(field.field_type.to_string()),
                gid: field.def.custom_id.clone(),
            },
            text,
            root: Some(field.def),
        })
    }

    fn hashtag_clause(&self, compiler: &Compiler<'a>, name: &str) -> Result<FilterClause<'a>> {
        compiler.compile_hashtag(name)?;
        let hashtag = self
            .schema
            .hashtag(name)
            .ok_or_else(|| Error::UnknownField(format!("#{}", name)))?;
        if hashtag.name.is_empty()
            || !hashtag
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(Error::UnquotableValue(hashtag.name.clone()));
        }

        let root = self
            .schema
            .resolve(&name_path(&hashtag.field))
            .map(|field| field.def);

        Ok(FilterClause {
            filter: ResolvedFilter {
                kind: FilterKind::Hashtag,
                name: hashtag.name.clone(),
                operator: None,
                value: None,
                field_type: None,
                gid: None,
            },
            text: format!("#{}", hashtag.name),
            root,
        })
    }

    fn sort_clause(&self, path: &[String], direction: Direction) -> Result<SortClause> {
        let field = self
            .schema
            .resolve(path)
            .ok_or_else(|| Error::UnknownSortField(path.join(PATH_SEPARATOR)))?;
        if let Some(permitted) = self.permitted {
            if !field.def.is_permitted(permitted) {
                return Err(Error::FieldNotPermitted(field.name));
            }
        }

        let text = format!("{}{}", direction.prefix(), render_field(field.def, &path[1..])?);
        Ok(SortClause {
            sort: ResolvedSort {
                name: field.name,
                direction,
                field_type: Some(field.field_type.to_string()),
                gid: field.def.custom_id.clone(),
            },
            text,
        })
    }

    fn default_sort(&self) -> SortClause {
        let direction = self.config.default_sort_direction;
        let path = name_path(&self.config.default_sort_field);
        match self.schema.resolve(&path) {
            Some(field) => SortClause {
                sort: ResolvedSort {
                    name: field.name,
                    direction,
                    field_type: Some(field.field_type.to_string()),
                    gid: field.def.custom_id.clone(),
                },
                text: format!("{}{}", direction.prefix(), self.config.default_sort_field),
            },
            None => SortClause {
                sort: ResolvedSort {
                    name: self.config.default_sort_field.clone(),
                    direction,
                    field_type: None,
                    gid: None,
                },
                text: format!("{}{}", direction.prefix(), self.config.default_sort_field),
            },
        }
    }

    fn respond(
        &self,
        filters: Vec<FilterClause<'a>>,
        sorts: Vec<SortClause>,
    ) -> BuilderResponse {
        let default = self.default_sort();
        let is_default = match sorts.as_slice() {
            [] => true,
            [only] => {
                only.sort.name == default.sort.name && only.sort.direction == default.sort.direction
            }
            _ => false,
        };
        let sorts = if sorts.is_empty() { vec![default] } else { sorts };

        let mut query = filters
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(" and ");
        if !is_default {
            if !query.is_empty() {
                query.push(' ');
            }
            query.push_str(SORT_PREFIX);
            query.push_str(
                &sorts
                    .iter()
                    .map(|s| s.text.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            );
        }

        let available_fields = self
            .schema
            .fields
            .iter()
            .filter(|f| self.permitted.map_or(true, |p| f.is_permitted(p)))
            .filter(|f| {
                !filters
                    .iter()
                    .filter_map(|c| c.root)
                    .any(|root| std::ptr::eq(root, *f))
            })
            .map(|f| AvailableField {
                name: f.name.clone(),
                field_type: f.field_type.to_string(),
                gid: f.custom_id.clone(),
            })
            .collect();

        BuilderResponse {
            query,
            filters: filters.into_iter().map(|c| c.filter).collect(),
            sort_by: sorts.into_iter().map(|s| s.sort).collect(),
            available_fields,
        }
    }
}

/// Split query text at the first `sort by:` marker outside double quotes.
pub fn split_sort_clause(text: &str) -> (&str, Option<&str>) {
    for marker in SORT_MARKER.find_iter(text) {
        let quotes = text[..marker.start()].matches('"').count();
        if quotes % 2 == 0 {
            return (&text[..marker.start()], Some(&text[marker.end()..]));
        }
    }
    (text, None)
}

/// Field path of a name as written by a UI: an identifier path when it
/// parses as one, otherwise a single display name.
fn missing_value(name: &str) -> Error {
    Error::InvalidExpression {
        expression: name.to_string(),
        position: 0,
        reason: "missing value".to_string(),
    }
}

fn is_keyword(text: &str) -> bool {
    ["and", "or", "not"]
        .iter()
        .any(|k| text.eq_ignore_ascii_case(k))
}

/// Render a field reference that reads back as the same field.
///
/// Plain identifier paths are written as-is; a single display name is
/// quoted; a nested custom field path falls back to the custom id.
fn render_field(def: &FieldDef, rest: &[String]) -> Result<String> {
    let mut segments = Vec::with_capacity(rest.len() + 1);
    segments.push(def.name.clone());
    segments.extend(rest.iter().cloned());

    let plain = segments.join(PATH_SEPARATOR);
    if !is_keyword(&plain) && filter::parse_field_path(&plain).as_ref() == Ok(&segments) {
        return Ok(plain);
    }
    if rest.is_empty() && !def.name.contains('"') {
        return Ok(format!("\"{}\"", def.name));
    }
    if let Some(id) = &def.custom_id {
        segments[0] = id.clone();
        let by_id = segments.join(PATH_SEPARATOR);
        if filter::parse_field_path(&by_id).as_ref() == Ok(&segments) {
            return Ok(by_id);
        }
    }
    Err(Error::UnquotableValue(def.name.clone()))
}

fn render_value(value: &FilterValue) -> Result<String> {
    let items = value
        .items()
        .iter()
        .map(|item| render_item(item))
        .collect::<Result<Vec<_>>>()?;
    Ok(items.join(", "))
}

fn render_item(item: &str) -> Result<String> {
    if item.contains('"') {
        return Err(Error::UnquotableValue(item.to_string()));
    }
    let bare = !item.is_empty() && item.chars().all(filter::is_bare_char) && !is_keyword(item);
    Ok(if bare {
        item.to_string()
    } else {
        format!("\"{}\"", item)
    })
}
