//! Query engine facade
//!
//! Bundles a schema, the caller's permitted fields and a [`QueryConfig`], and
//! exposes the parse, compile, sort and builder operations over them.

use crate::builder::{self, Builder, BuilderQuery, BuilderResponse};
use crate::compiler::{Compiler, QueryMode};
use crate::config::QueryConfig;
use crate::error::Result;
use crate::filter;
use crate::predicate::Predicate;
use crate::schema::{FieldPath, Schema};
use crate::sort::{self, SortSpec};
use serde::Serialize;

/// A search query compiled for the execution layer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledQuery {
    /// `None` for an empty filter (match everything)
    pub predicate: Option<Predicate>,
    /// Never empty; falls back to the configured default sort
    pub sort: Vec<SortSpec>,
}

/// Entry point for compiling queries against one schema
#[derive(Debug, Clone)]
pub struct QueryEngine<'a> {
    schema: &'a Schema,
    permitted: Option<&'a [String]>,
    config: QueryConfig,
}

impl<'a> QueryEngine<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self {
            schema,
            permitted: None,
            config: QueryConfig::default(),
        }
    }

    /// Restrict queries to these fields. Without this every schema field is
    /// permitted.
    pub fn with_permitted(mut self, permitted: &'a [String]) -> Self {
        self.permitted = Some(permitted);
        self
    }

    pub fn with_config(mut self, config: QueryConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    pub fn compiler(&self, mode: QueryMode) -> Compiler<'a> {
        let compiler = Compiler::new(self.schema)
            .with_mode(mode)
            .with_max_depth(self.config.max_depth);
        match self.permitted {
            Some(permitted) => compiler.with_permitted(permitted),
            None => compiler,
        }
    }

    /// Compile a filter expression. Empty text compiles to `None`.
    pub fn parse_filter(&self, text: &str, mode: QueryMode) -> Result<Option<Predicate>> {
        self.compiler(mode).compile_query(text)
    }

    pub fn parse_sort(&self, text: &str) -> Result<Vec<SortSpec>> {
        sort::parse_sort(text, self.schema, self.permitted)
    }

    /// Compile issue-search text: a filter in search mode, optionally
    /// followed by a `sort by:` clause.
    pub fn search(&self, text: &str) -> Result<CompiledQuery> {
        let (filter_text, sort_text) = builder::split_sort_clause(text);
        let predicate = self.parse_filter(filter_text, QueryMode::Search)?;

        let mut sort = match sort_text {
            Some(sort_text) => self.parse_sort(sort_text)?,
            None => Vec::new(),
        };
        if sort.is_empty() {
            sort.push(self.default_sort());
        }

        Ok(CompiledQuery { predicate, sort })
    }

    pub fn builder(&self) -> Builder<'_> {
        let builder = Builder::new(self.schema, &self.config);
        match self.permitted {
            Some(permitted) => builder.with_permitted(permitted),
            None => builder,
        }
    }

    pub fn build(&self, query: &BuilderQuery) -> Result<BuilderResponse> {
        self.builder().build(query)
    }

    pub fn parse_builder(&self, text: &str) -> Result<BuilderResponse> {
        self.builder().parse(text)
    }

    fn default_sort(&self) -> SortSpec {
        let path = filter::name_path(&self.config.default_sort_field);

        match self.schema.resolve(&path) {
            Some(field) => SortSpec {
                field: field.name,
                path: field.path,
                direction: self.config.default_sort_direction,
            },
            None => SortSpec {
                field: self.config.default_sort_field.clone(),
                path: FieldPath(path),
                direction: self.config.default_sort_direction,
            },
        }
    }
}
