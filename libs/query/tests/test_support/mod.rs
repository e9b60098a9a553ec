#![allow(dead_code)]

use std::sync::OnceLock;
use trackql_query::{
    Compiler, FieldDef, FieldType, Hashtag, Predicate, QueryEngine, QueryMode, Result, Schema,
};

static SCHEMA: OnceLock<Schema> = OnceLock::new();

/// Issue schema shared by the integration tests.
pub fn schema() -> &'static Schema {
    SCHEMA.get_or_init(|| {
        Schema::new(vec![
            FieldDef::reserved("subject", FieldType::String),
            FieldDef::reserved("text", FieldType::String),
            FieldDef::reserved("str_field", FieldType::String),
            FieldDef::reserved("int_field", FieldType::Int),
            FieldDef::reserved("float_field", FieldType::Float),
            FieldDef::reserved("bool_field", FieldType::Bool),
            FieldDef::reserved("a", FieldType::Int),
            FieldDef::reserved("b", FieldType::Int),
            FieldDef::reserved("c", FieldType::Int),
            FieldDef::reserved("labels", FieldType::List(Box::new(FieldType::String))),
            FieldDef::reserved(
                "assignee",
                FieldType::Object(vec![
                    FieldDef::reserved("name", FieldType::String),
                    FieldDef::reserved("age", FieldType::Int),
                ]),
            ),
            FieldDef::reserved("resolved", FieldType::Bool),
            FieldDef::reserved("created_at", FieldType::Datetime),
            FieldDef::reserved("updated_at", FieldType::Datetime),
            FieldDef::custom("Priority Level", "G", FieldType::String),
            FieldDef::custom("Story Points", "G2", FieldType::Int),
        ])
        .with_hashtag(Hashtag {
            name: "resolved".into(),
            field: "resolved".into(),
            operator: None,
            value: "true".into(),
        })
        .with_hashtag(Hashtag {
            name: "unresolved".into(),
            field: "resolved".into(),
            operator: None,
            value: "false".into(),
        })
    })
}

pub fn engine() -> QueryEngine<'static> {
    QueryEngine::new(schema())
}

pub fn parse_filter(query: &str) -> Result<Option<Predicate>> {
    Compiler::new(schema()).compile_query(query)
}

pub fn parse_search(query: &str) -> Result<Option<Predicate>> {
    engine().parse_filter(query, QueryMode::Search)
}

/// Compile a query that must produce a predicate.
pub fn compile(query: &str) -> Predicate {
    parse_filter(query)
        .unwrap_or_else(|e| panic!("failed to compile {:?}: {}", query, e))
        .unwrap_or_else(|| panic!("query {:?} compiled to nothing", query))
}
