//! Field schema consumed by the compiler
//!
//! The schema is owned by the caller (usually loaded from the custom-field
//! store) and only read here. Reserved fields are addressed by name; custom
//! fields by display name (case-insensitive) or generated id, and are stored
//! under `<custom_field_root>.<id>`.

use crate::filter::PATH_SEPARATOR;
use crate::operator::Operator;
use crate::value::TypedValue;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default storage root of custom field values.
pub const DEFAULT_CUSTOM_FIELD_ROOT: &str = "custom_fields";

/// Declared type of a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Int,
    Float,
    Bool,
    Datetime,
    /// Collection of values of the inner type
    List(Box<FieldType>),
    /// Embedded object with named sub-fields
    Object(Vec<FieldDef>),
}

const STRING_OPERATORS: &[Operator] = &[
    Operator::Eq,
    Operator::Ne,
    Operator::In,
    Operator::Nin,
    Operator::Contains,
    Operator::Icontains,
    Operator::Startswith,
    Operator::Endswith,
];

const ORDERED_OPERATORS: &[Operator] = &[
    Operator::Eq,
    Operator::Ne,
    Operator::In,
    Operator::Nin,
    Operator::Lt,
    Operator::Lte,
    Operator::Gt,
    Operator::Gte,
];

const LIST_OPERATORS: &[Operator] = &[Operator::Eq, Operator::Ne, Operator::In, Operator::Nin];

const EQUALITY_OPERATORS: &[Operator] = &[Operator::Eq, Operator::Ne];

impl FieldType {
    /// Operators legal for this type. Always contains [`Operator::DEFAULT`].
    pub fn operators(&self) -> &'static [Operator] {
        match self {
            FieldType::String => STRING_OPERATORS,
            FieldType::Int | FieldType::Float | FieldType::Datetime => ORDERED_OPERATORS,
            FieldType::List(_) => LIST_OPERATORS,
            FieldType::Bool | FieldType::Object(_) => EQUALITY_OPERATORS,
        }
    }

    pub fn supports(&self, operator: Operator) -> bool {
        self.operators().contains(&operator)
    }

    /// Convert a raw token to this type. Never fails; see [`TypedValue`].
    pub fn coerce(&self, raw: &str) -> TypedValue {
        match self {
            FieldType::String | FieldType::Object(_) => TypedValue::String(raw.to_string()),
            FieldType::Int => TypedValue::int_from(raw),
            FieldType::Float => TypedValue::float_from(raw),
            FieldType::Bool => TypedValue::bool_from(raw),
            FieldType::Datetime => TypedValue::datetime_from(raw),
            // Values filter list elements
            FieldType::List(inner) => inner.coerce(raw),
        }
    }

    /// Type of a named sub-field. Lists are traversed into their elements.
    pub fn subfield(&self, name: &str) -> Option<&FieldType> {
        match self {
            FieldType::Object(fields) => fields
                .iter()
                .find(|f| f.name == name)
                .map(|f| &f.field_type),
            FieldType::List(inner) => inner.subfield(name),
            _ => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::String => f.write_str("string"),
            FieldType::Int => f.write_str("int"),
            FieldType::Float => f.write_str("float"),
            FieldType::Bool => f.write_str("bool"),
            FieldType::Datetime => f.write_str("datetime"),
            FieldType::List(inner) => write!(f, "list<{}>", inner),
            FieldType::Object(_) => f.write_str("object"),
        }
    }
}

/// A field declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Reserved field name, or display name of a custom field
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Generated id of a custom field; `None` for reserved fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_id: Option<String>,
}

impl FieldDef {
    pub fn reserved(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            custom_id: None,
        }
    }

    pub fn custom(
        display_name: impl Into<String>,
        id: impl Into<String>,
        field_type: FieldType,
    ) -> Self {
        Self {
            name: display_name.into(),
            field_type,
            custom_id: Some(id.into()),
        }
    }

    pub fn is_custom(&self) -> bool {
        self.custom_id.is_some()
    }

    /// Whether any name in `permitted` refers to this field.
    pub fn is_permitted(&self, permitted: &[String]) -> bool {
        permitted.iter().any(|p| self.answers_to(p))
    }

    fn answers_to(&self, name: &str) -> bool {
        match &self.custom_id {
            None => self.name == name,
            Some(id) => id == name || self.name.eq_ignore_ascii_case(name),
        }
    }
}

/// A `#name` shorthand that expands to a single field filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hashtag {
    pub name: String,
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<Operator>,
    pub value: String,
}

/// Storage path of a field, e.g. `custom_fields.G1`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct FieldPath(pub Vec<String>);

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

/// A field path resolved against the schema
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedField<'a> {
    /// Root field declaration
    pub def: &'a FieldDef,
    /// Canonical query name (`a__b`, using the display name for custom fields)
    pub name: String,
    /// Storage path
    pub path: FieldPath,
    /// Declared type of the addressed (possibly nested) field
    pub field_type: &'a FieldType,
}

fn default_custom_field_root() -> String {
    DEFAULT_CUSTOM_FIELD_ROOT.to_string()
}

/// Fields and shorthands available to queries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub hashtags: Vec<Hashtag>,
    #[serde(default = "default_custom_field_root")]
    pub custom_field_root: String,
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            fields: Vec::new(),
            hashtags: Vec::new(),
            custom_field_root: default_custom_field_root(),
        }
    }
}

impl Schema {
    pub fn new(fields: Vec<FieldDef>) -> Self {
        Self {
            fields,
            ..Self::default()
        }
    }

    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_hashtag(mut self, hashtag: Hashtag) -> Self {
        self.hashtags.push(hashtag);
        self
    }

    /// Find a root field: reserved name, then custom display name
    /// (case-insensitive), then custom id.
    pub fn lookup(&self, name: &str) -> Option<&FieldDef> {
        self.fields
            .iter()
            .find(|f| !f.is_custom() && f.name == name)
            .or_else(|| {
                self.fields
                    .iter()
                    .find(|f| f.is_custom() && f.name.eq_ignore_ascii_case(name))
            })
            .or_else(|| {
                self.fields
                    .iter()
                    .find(|f| f.custom_id.as_deref() == Some(name))
            })
    }

    pub fn custom_field(&self, id: &str) -> Option<&FieldDef> {
        self.fields
            .iter()
            .find(|f| f.custom_id.as_deref() == Some(id))
    }

    pub fn hashtag(&self, name: &str) -> Option<&Hashtag> {
        self.hashtags
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
    }

    /// Resolve a field path. `None` if any segment is unknown.
    pub fn resolve(&self, path: &[String]) -> Option<ResolvedField<'_>> {
        let (root, rest) = path.split_first()?;
        let def = self.lookup(root)?;

        let mut storage = match &def.custom_id {
            Some(id) => vec![self.custom_field_root.clone(), id.clone()],
            None => vec![def.name.clone()],
        };
        let mut name = vec![def.name.as_str()];
        let mut field_type = &def.field_type;

        for segment in rest {
            field_type = field_type.subfield(segment)?;
            storage.push(segment.clone());
            name.push(segment.as_str());
        }

        Some(ResolvedField {
            def,
            name: name.join(PATH_SEPARATOR),
            path: FieldPath(storage),
            field_type,
        })
    }
}
