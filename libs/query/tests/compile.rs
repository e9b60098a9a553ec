//! Compiler integration tests: field resolution, coercion and De Morgan

mod test_support;

use serde_json::json;
use test_support::{compile, parse_filter, parse_search};
use trackql_query::{
    CompareOp, Comparison, Error, FieldPath, Operator, Predicate, QueryEngine, QueryMode, TypedValue,
};

fn path(p: &str) -> FieldPath {
    FieldPath(p.split('.').map(str::to_string).collect())
}

fn eq(field: &str, value: TypedValue) -> Comparison {
    Comparison {
        field: path(field),
        op: CompareOp::Eq,
        value,
    }
}

fn leaf(query: &str) -> Comparison {
    match compile(query) {
        Predicate::Compare(c) => c,
        other => panic!("expected a single comparison, got {:?}", other),
    }
}

#[test]
fn test_end_to_end_custom_field() {
    let predicate = compile(r#""Priority Level": high and subject: test"#);
    assert_eq!(
        predicate,
        Predicate::And(vec![
            Predicate::Compare(eq("custom_fields.G", TypedValue::String("high".into()))),
            Predicate::Compare(eq("subject", TypedValue::String("test".into()))),
        ])
    );
}

#[test]
fn test_custom_field_by_id() {
    let c = leaf("G2___gte: 3");
    assert_eq!(c.field, path("custom_fields.G2"));
    assert_eq!(c.op, CompareOp::Gte);
    assert_eq!(c.value, TypedValue::Int(3));
}

#[test]
fn test_quoted_values() {
    assert_eq!(
        leaf(r#"str_field:"test test""#).value,
        TypedValue::String("test test".into())
    );

    let c = leaf(r#"str_field___in:"test1","test2""#);
    assert_eq!(c.op, CompareOp::In);
    assert_eq!(
        c.value,
        TypedValue::List(vec![
            TypedValue::String("test1".into()),
            TypedValue::String("test2".into()),
        ])
    );
}

#[test]
fn test_bool_coercion() {
    for query in ["bool_field:0", "bool_field:False", "bool_field:false"] {
        assert_eq!(leaf(query).value, TypedValue::Bool(false), "{}", query);
    }
    assert_eq!(leaf("bool_field:1").value, TypedValue::Bool(true));
    assert_eq!(leaf("bool_field:yes").value, TypedValue::Bool(true));
}

#[test]
fn test_int_list_coercion() {
    let c = leaf("int_field___in:10,20");
    assert_eq!(c.op, CompareOp::In);
    assert_eq!(
        c.value,
        TypedValue::List(vec![TypedValue::Int(10), TypedValue::Int(20)])
    );
}

#[test]
fn test_failed_coercion_passes_raw_value_through() {
    assert_eq!(
        leaf(r#"int_field:"abc""#).value,
        TypedValue::String("abc".into())
    );
    assert_eq!(
        leaf("float_field___lt:2.5").value,
        TypedValue::Float(2.5)
    );
}

#[test]
fn test_datetime_coercion() {
    let c = leaf("created_at___gte:2024-01-31");
    assert_eq!(c.op, CompareOp::Gte);
    assert!(matches!(c.value, TypedValue::Datetime(_)));
}

#[test]
fn test_nested_object_path() {
    let c = leaf("assignee__age___lt: 30");
    assert_eq!(c.field, path("assignee.age"));
    assert_eq!(c.op, CompareOp::Lt);
    assert_eq!(c.value, TypedValue::Int(30));

    assert_eq!(
        parse_filter("assignee__height: 2").unwrap_err(),
        Error::UnknownField("assignee__height".into())
    );
}

#[test]
fn test_unknown_field() {
    assert_eq!(
        parse_filter("nope: 1").unwrap_err(),
        Error::UnknownField("nope".into())
    );
}

#[test]
fn test_invalid_operator_for_string_field() {
    let err = parse_filter("subject___lt: a").unwrap_err();
    assert_eq!(
        err,
        Error::InvalidOperatorForField {
            field: "subject".into(),
            operator: Operator::Lt,
            allowed: &[
                Operator::Eq,
                Operator::Ne,
                Operator::In,
                Operator::Nin,
                Operator::Contains,
                Operator::Icontains,
                Operator::Startswith,
                Operator::Endswith,
            ],
        }
    );
    assert!(err.to_string().starts_with(
        "Operator 'lt' is not valid for field 'subject', allowed: eq, ne, in, nin"
    ));
}

#[test]
fn test_permission_denied() {
    let permitted = vec!["subject".to_string(), "Priority Level".to_string()];
    let engine = QueryEngine::new(test_support::schema()).with_permitted(&permitted);
    let mode = QueryMode::Filter;

    assert!(engine.parse_filter("subject: a and G: high", mode).is_ok());
    assert_eq!(
        engine.parse_filter("text: a", mode).unwrap_err(),
        Error::FieldNotPermitted("text".into())
    );
    assert_eq!(
        engine.parse_filter("missing: a", mode).unwrap_err(),
        Error::UnknownField("missing".into())
    );
}

#[test]
fn test_invalid_leaf_position() {
    match parse_filter("a:1 and subject").unwrap_err() {
        Error::InvalidExpression {
            expression,
            position,
            ..
        } => {
            assert_eq!(expression, "subject");
            assert_eq!(position, 15);
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_double_negation() {
    assert_eq!(compile("not not int_field:10"), compile("int_field:10"));
    assert_eq!(
        compile("not not not int_field:10"),
        Predicate::Not(eq("int_field", TypedValue::Int(10)))
    );
}

#[test]
fn test_de_morgan_or() {
    assert_eq!(
        compile("not (a:1 or b:2)"),
        Predicate::Nor(vec![
            Predicate::Compare(eq("a", TypedValue::Int(1))),
            Predicate::Compare(eq("b", TypedValue::Int(2))),
        ])
    );
}

#[test]
fn test_de_morgan_and() {
    assert_eq!(
        compile("not (a:1 and b:2)"),
        Predicate::Or(vec![
            Predicate::Not(eq("a", TypedValue::Int(1))),
            Predicate::Not(eq("b", TypedValue::Int(2))),
        ])
    );
}

#[test]
fn test_de_morgan_nested() {
    // not (a and (b or c)) == not a or nor(b, c)
    assert_eq!(
        compile("not (a:1 and (b:2 or c:3))"),
        Predicate::Or(vec![
            Predicate::Not(eq("a", TypedValue::Int(1))),
            Predicate::Nor(vec![
                Predicate::Compare(eq("b", TypedValue::Int(2))),
                Predicate::Compare(eq("c", TypedValue::Int(3))),
            ]),
        ])
    );
}

#[test]
fn test_flattening() {
    let predicate = compile("a:1 and b:2 and c:3");
    assert!(matches!(&predicate, Predicate::And(children) if children.len() == 3));

    let predicate = compile("a:1 or (b:2 or c:3)");
    assert!(matches!(&predicate, Predicate::Or(children) if children.len() == 3));
}

#[test]
fn test_precedence_compiles_to_or_of_and() {
    assert_eq!(
        compile("a:1 and b:2 or c:3"),
        Predicate::Or(vec![
            Predicate::And(vec![
                Predicate::Compare(eq("a", TypedValue::Int(1))),
                Predicate::Compare(eq("b", TypedValue::Int(2))),
            ]),
            Predicate::Compare(eq("c", TypedValue::Int(3))),
        ])
    );
}

#[test]
fn test_hashtags() {
    assert_eq!(
        compile("#unresolved and subject: x"),
        Predicate::And(vec![
            Predicate::Compare(eq("resolved", TypedValue::Bool(false))),
            Predicate::Compare(eq("subject", TypedValue::String("x".into()))),
        ])
    );
}

#[test]
fn test_search_mode_rejects_or() {
    let err = parse_search("subject: test or text: content").unwrap_err();
    assert_eq!(err, Error::OperatorNotSupported("OR"));
    assert_eq!(err.to_string(), "OR operator is not supported");

    // The permissive grammar accepts the same query.
    assert!(parse_filter("subject: test or text: content").is_ok());
}

#[test]
fn test_predicate_serializes_to_json() {
    let predicate = compile("not (a:1 or subject___icontains: x)");
    assert_eq!(
        serde_json::to_value(&predicate).unwrap(),
        json!({
            "nor": [
                {"compare": {"field": ["a"], "op": "eq", "value": 1}},
                {"compare": {
                    "field": ["subject"],
                    "op": {"regex": {"case_insensitive": true}},
                    "value": "x"
                }}
            ]
        })
    );
}

#[test]
fn test_evaluation_against_documents() {
    let predicate = compile(r#"not (labels: bug or "Priority Level": low) and assignee__age___gte: 30"#);
    let doc = json!({
        "labels": ["ui"],
        "custom_fields": {"G": "high"},
        "assignee": {"name": "ann", "age": 31}
    });
    assert!(predicate.matches(&doc));

    let doc = json!({
        "labels": ["ui", "bug"],
        "custom_fields": {"G": "high"},
        "assignee": {"name": "ann", "age": 31}
    });
    assert!(!predicate.matches(&doc));
}
