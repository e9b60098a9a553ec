//! Builder round-trip tests

mod test_support;

use serde_json::json;
use test_support::engine;
use trackql_query::{
    BuilderFilter, BuilderQuery, BuilderSort, Direction, Error, FilterKind, FilterValue,
    FieldDef, FieldType, Operator, QueryConfig, QueryEngine, Schema,
};

fn filter(name: &str, value: &str) -> BuilderFilter {
    BuilderFilter {
        name: name.into(),
        operator: None,
        value: Some(FilterValue::Scalar(value.into())),
        gid: None,
    }
}

fn sort(name: &str, direction: Direction) -> BuilderSort {
    BuilderSort {
        name: name.into(),
        direction,
        gid: None,
    }
}

/// `parse(build(q).query)` must report the same filters and sort keys.
fn assert_round_trip(query: &BuilderQuery) {
    let engine = engine();
    let built = engine.build(query).unwrap();
    let parsed = engine
        .parse_builder(&built.query)
        .unwrap_or_else(|e| panic!("failed to re-parse {:?}: {}", built.query, e));
    assert_eq!(parsed.filters, built.filters, "filters of {:?}", built.query);
    assert_eq!(parsed.sort_by, built.sort_by, "sort of {:?}", built.query);
    assert_eq!(parsed.query, built.query);
    assert_eq!(parsed.available_fields, built.available_fields);
}

#[test]
fn test_default_sort_is_omitted() {
    let query = BuilderQuery {
        filters: vec![filter("subject", "Test Issue")],
        sort_by: vec![sort("updated_at", Direction::Desc)],
    };
    let response = engine().build(&query).unwrap();
    assert_eq!(response.query, r#"subject: "Test Issue""#);
    assert_eq!(response.sort_by.len(), 1);
    assert_eq!(response.sort_by[0].name, "updated_at");
    assert_eq!(response.sort_by[0].direction, Direction::Desc);

    let reparsed = engine().parse_builder(&response.query).unwrap();
    assert_eq!(reparsed.sort_by, response.sort_by);
}

#[test]
fn test_empty_sort_reports_default() {
    let response = engine().build(&BuilderQuery::default()).unwrap();
    assert_eq!(response.query, "");
    assert_eq!(response.sort_by[0].name, "updated_at");
    assert!(response.filters.is_empty());
}

#[test]
fn test_non_default_sort_is_appended() {
    let query = BuilderQuery {
        filters: vec![filter("subject", "crash")],
        sort_by: vec![
            sort("Priority Level", Direction::Asc),
            sort("updated_at", Direction::Desc),
        ],
    };
    let response = engine().build(&query).unwrap();
    assert_eq!(
        response.query,
        r#"subject: crash sort by: "Priority Level", -updated_at"#
    );
    assert_round_trip(&query);
}

#[test]
fn test_custom_field_by_gid_renders_display_name() {
    let query = BuilderQuery {
        filters: vec![BuilderFilter {
            name: "ignored".into(),
            operator: Some(Operator::In),
            value: Some(FilterValue::List(vec!["high".into(), "very high".into()])),
            gid: Some("G".into()),
        }],
        sort_by: vec![],
    };
    let response = engine().build(&query).unwrap();
    assert_eq!(
        response.query,
        r#""Priority Level"___in: high, "very high""#
    );
    assert_eq!(response.filters[0].name, "Priority Level");
    assert_eq!(response.filters[0].gid.as_deref(), Some("G"));
    assert_eq!(response.filters[0].field_type.as_deref(), Some("string"));
    assert_round_trip(&query);
}

#[test]
fn test_round_trip_mixed_filters() {
    let query = BuilderQuery {
        filters: vec![
            BuilderFilter {
                name: "#resolved".into(),
                operator: None,
                value: None,
                gid: None,
            },
            BuilderFilter {
                name: "int_field".into(),
                operator: Some(Operator::In),
                value: Some(FilterValue::Scalar("10".into())),
                gid: None,
            },
            BuilderFilter {
                name: "assignee__age".into(),
                operator: Some(Operator::Gte),
                value: Some(FilterValue::Scalar("30".into())),
                gid: None,
            },
            filter("str_field", "and"),
            filter("text", "(parenthesised) sort by: text"),
        ],
        sort_by: vec![sort("Story Points", Direction::Desc)],
    };

    let response = engine().build(&query).unwrap();
    assert_eq!(response.filters[0].kind, FilterKind::Hashtag);
    assert_eq!(response.filters[0].value, None);
    assert_eq!(
        response.filters[1].value,
        Some(FilterValue::List(vec!["10".into()]))
    );
    assert_round_trip(&query);
}

#[test]
fn test_parse_reports_available_fields() {
    let response = engine()
        .parse_builder(r#"subject: x and "priority level": high and #unresolved"#)
        .unwrap();

    let names: Vec<&str> = response
        .filters
        .iter()
        .map(|f| f.name.as_str())
        .collect();
    assert_eq!(names, vec!["subject", "Priority Level", "unresolved"]);
    assert_eq!(
        response.query,
        r#"subject: x and "Priority Level": high and #unresolved"#
    );

    let available: Vec<&str> = response
        .available_fields
        .iter()
        .map(|f| f.name.as_str())
        .collect();
    assert!(!available.contains(&"subject"));
    assert!(!available.contains(&"Priority Level"));
    assert!(!available.contains(&"resolved"));
    assert!(available.contains(&"text"));
    assert!(available.contains(&"Story Points"));
}

#[test]
fn test_available_fields_respect_permissions() {
    let permitted = vec!["subject".to_string(), "text".to_string()];
    let engine = QueryEngine::new(test_support::schema()).with_permitted(&permitted);
    let response = engine.parse_builder("subject: x").unwrap();
    let available: Vec<&str> = response
        .available_fields
        .iter()
        .map(|f| f.name.as_str())
        .collect();
    assert_eq!(available, vec!["text"]);
}

#[test]
fn test_parse_sort_marker_is_tolerant() {
    let response = engine()
        .parse_builder("subject: x  Sort By:-created_at, a")
        .unwrap();
    assert_eq!(response.sort_by.len(), 2);
    assert_eq!(response.sort_by[0].name, "created_at");
    assert_eq!(response.sort_by[0].direction, Direction::Desc);
    assert_eq!(response.sort_by[1].name, "a");
    assert_eq!(response.query, "subject: x sort by: -created_at, a");
}

#[test]
fn test_parse_rejects_or_and_not() {
    assert_eq!(
        engine()
            .parse_builder("subject: test or text: content")
            .unwrap_err()
            .to_string(),
        "OR operator is not supported"
    );
    assert_eq!(
        engine().parse_builder("not subject: test").unwrap_err(),
        Error::OperatorNotSupported("NOT")
    );
}

#[test]
fn test_unknown_sort_field() {
    assert_eq!(
        engine().parse_builder("sort by: nope").unwrap_err(),
        Error::UnknownSortField("nope".into())
    );
    let query = BuilderQuery {
        filters: vec![],
        sort_by: vec![sort("nope", Direction::Asc)],
    };
    assert_eq!(
        engine().build(&query).unwrap_err(),
        Error::UnknownSortField("nope".into())
    );
}

#[test]
fn test_sort_by_display_name_with_path_separator() {
    let schema = Schema::new(vec![
        FieldDef::reserved("updated_at", FieldType::Datetime),
        FieldDef::custom("a__b", "G9", FieldType::Int),
    ]);
    let engine = QueryEngine::new(&schema);

    assert_eq!(engine.parse_sort(r#""a__b""#).unwrap().len(), 1);
    let parsed = engine.parse_builder(r#"sort by: "a__b""#).unwrap();
    assert_eq!(parsed.sort_by.len(), 1);
    assert_eq!(parsed.sort_by[0].name, "a__b");
    assert_eq!(parsed.sort_by[0].gid.as_deref(), Some("G9"));

    let query = BuilderQuery {
        filters: vec![],
        sort_by: vec![BuilderSort {
            name: "a__b".into(),
            direction: Direction::Desc,
            gid: Some("G9".into()),
        }],
    };
    let built = engine.build(&query).unwrap();
    assert_eq!(built.query, r#"sort by: -"a__b""#);
    let reparsed = engine.parse_builder(&built.query).unwrap();
    assert_eq!(reparsed.sort_by, built.sort_by);
}

#[test]
fn test_non_ascii_values_stay_bare() {
    let query = BuilderQuery {
        filters: vec![filter("subject", "café")],
        sort_by: vec![],
    };
    assert_eq!(engine().build(&query).unwrap().query, "subject: café");
    assert_round_trip(&query);
}

#[test]
fn test_build_validates_filters() {
    let query = BuilderQuery {
        filters: vec![BuilderFilter {
            name: "subject".into(),
            operator: Some(Operator::Gt),
            value: Some(FilterValue::Scalar("a".into())),
            gid: None,
        }],
        sort_by: vec![],
    };
    assert!(matches!(
        engine().build(&query),
        Err(Error::InvalidOperatorForField { .. })
    ));

    let query = BuilderQuery {
        filters: vec![filter("subject", r#"say "hi""#)],
        sort_by: vec![],
    };
    assert!(matches!(
        engine().build(&query),
        Err(Error::UnquotableValue(_))
    ));
}

#[test]
fn test_custom_default_sort() {
    let engine = QueryEngine::new(test_support::schema()).with_config(QueryConfig {
        default_sort_field: "created_at".into(),
        default_sort_direction: Direction::Asc,
        ..QueryConfig::default()
    });
    let query = BuilderQuery {
        filters: vec![],
        sort_by: vec![sort("updated_at", Direction::Desc)],
    };
    assert_eq!(engine.build(&query).unwrap().query, "sort by: -updated_at");
    assert_eq!(
        engine.parse_builder("").unwrap().sort_by[0].name,
        "created_at"
    );
}

#[test]
fn test_builder_query_from_json() {
    let query: BuilderQuery = serde_json::from_value(json!({
        "filters": [
            {"name": "subject", "value": "Test Issue"},
            {"name": "labels", "operator": "in", "value": ["bug", "ui"]}
        ],
        "sort_by": [{"name": "updated_at", "direction": "desc"}]
    }))
    .unwrap();

    let response = engine().build(&query).unwrap();
    assert_eq!(
        response.query,
        r#"subject: "Test Issue" and labels___in: bug, ui"#
    );

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["filters"][1]["type"], "list<string>");
    assert_eq!(json["sort_by"][0]["direction"], "desc");
}
