//! Typed filter values
//!
//! Raw value tokens are converted to the declared type of the field. The
//! conversion never fails: a token that does not parse as the declared type is
//! kept as a string.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

/// A value after type coercion
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TypedValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Datetime(DateTime<Utc>),
    List(Vec<TypedValue>),
}

impl TypedValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            TypedValue::String(_) => "string",
            TypedValue::Int(_) => "int",
            TypedValue::Float(_) => "float",
            TypedValue::Bool(_) => "bool",
            TypedValue::Datetime(_) => "datetime",
            TypedValue::List(_) => "list",
        }
    }

    /// Bool coercion: `false` and `0` (any case) are false, anything else true.
    pub fn bool_from(raw: &str) -> TypedValue {
        let falsy = raw.eq_ignore_ascii_case("false") || raw == "0";
        TypedValue::Bool(!falsy)
    }

    pub fn int_from(raw: &str) -> TypedValue {
        raw.trim()
            .parse::<i64>()
            .map(TypedValue::Int)
            .unwrap_or_else(|_| TypedValue::String(raw.to_string()))
    }

    /// Only finite numbers coerce; `NaN` and `inf` stay strings.
    pub fn float_from(raw: &str) -> TypedValue {
        match raw.trim().parse::<f64>() {
            Ok(f) if f.is_finite() => TypedValue::Float(f),
            _ => TypedValue::String(raw.to_string()),
        }
    }

    /// Accepts RFC 3339 timestamps and plain `YYYY-MM-DD` dates (midnight UTC).
    pub fn datetime_from(raw: &str) -> TypedValue {
        let trimmed = raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return TypedValue::Datetime(dt.with_timezone(&Utc));
        }
        NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| TypedValue::Datetime(naive.and_utc()))
            .unwrap_or_else(|| TypedValue::String(raw.to_string()))
    }

    /// Order a document value relative to this filter value, i.e. the result
    /// reads as `document.cmp(self)`. `None` when the two are not comparable.
    pub fn compare_json(&self, other: &serde_json::Value) -> Option<Ordering> {
        use serde_json::Value as Json;
        match (self, other) {
            (TypedValue::String(a), Json::String(b)) => Some(b.as_str().cmp(a.as_str())),
            (TypedValue::Int(a), Json::Number(b)) => b.as_f64()?.partial_cmp(&(*a as f64)),
            (TypedValue::Float(a), Json::Number(b)) => b.as_f64()?.partial_cmp(a),
            (TypedValue::Bool(a), Json::Bool(b)) => Some(b.cmp(a)),
            (TypedValue::Datetime(a), Json::String(b)) => {
                let b = DateTime::parse_from_rfc3339(b).ok()?.with_timezone(&Utc);
                Some(b.cmp(a))
            }
            // Unconverted tokens still compare against the textual form.
            (TypedValue::String(a), Json::Number(b)) => Some(b.to_string().cmp(a)),
            (TypedValue::String(a), Json::Bool(b)) => Some(b.to_string().cmp(a)),
            _ => None,
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::String(s) => write!(f, "{:?}", s),
            TypedValue::Int(i) => write!(f, "{}", i),
            TypedValue::Float(x) => write!(f, "{}", x),
            TypedValue::Bool(b) => write!(f, "{}", b),
            TypedValue::Datetime(dt) => write!(f, "{}", dt.to_rfc3339()),
            TypedValue::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bool_coercion() {
        assert_eq!(TypedValue::bool_from("0"), TypedValue::Bool(false));
        assert_eq!(TypedValue::bool_from("False"), TypedValue::Bool(false));
        assert_eq!(TypedValue::bool_from("FALSE"), TypedValue::Bool(false));
        assert_eq!(TypedValue::bool_from("1"), TypedValue::Bool(true));
        assert_eq!(TypedValue::bool_from("yes"), TypedValue::Bool(true));
    }

    #[test]
    fn numeric_coercion_falls_back_to_string() {
        assert_eq!(TypedValue::int_from("10"), TypedValue::Int(10));
        assert_eq!(TypedValue::int_from("-3"), TypedValue::Int(-3));
        assert_eq!(TypedValue::int_from("abc"), TypedValue::String("abc".into()));
        assert_eq!(TypedValue::float_from("1.5"), TypedValue::Float(1.5));
        assert_eq!(TypedValue::float_from("x"), TypedValue::String("x".into()));
    }

    #[test]
    fn non_finite_floats_stay_strings() {
        assert_eq!(TypedValue::float_from("NaN"), TypedValue::String("NaN".into()));
        assert_eq!(TypedValue::float_from("inf"), TypedValue::String("inf".into()));
        assert_eq!(
            TypedValue::float_from("-infinity"),
            TypedValue::String("-infinity".into())
        );
        assert_eq!(TypedValue::float_from("1e3"), TypedValue::Float(1000.0));
    }

    #[test]
    fn datetime_coercion() {
        let TypedValue::Datetime(dt) = TypedValue::datetime_from("2024-03-01") else {
            panic!("expected datetime");
        };
        assert_eq!(dt.to_rfc3339(), "2024-03-01T00:00:00+00:00");

        assert!(matches!(
            TypedValue::datetime_from("2024-03-01T10:00:00+02:00"),
            TypedValue::Datetime(_)
        ));
        assert_eq!(
            TypedValue::datetime_from("yesterday"),
            TypedValue::String("yesterday".into())
        );
    }

    #[test]
    fn compares_against_json() {
        assert_eq!(
            TypedValue::Int(10).compare_json(&json!(12)),
            Some(Ordering::Greater)
        );
        assert_eq!(
            TypedValue::String("b".into()).compare_json(&json!("a")),
            Some(Ordering::Less)
        );
        assert_eq!(TypedValue::Bool(true).compare_json(&json!("true")), None);
    }
}
