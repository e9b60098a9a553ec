//! Field-filter grammar - parses one expression leaf into a filter
//!
//! ```text
//! leaf     := "#" tag | field ":" values
//! field    := '"' display-name '"' ["___" operator] | ident
//! ident    := segment ("__" segment)* ["___" operator]
//! values   := value ("," value)*
//! value    := '"' non-quote* '"' | [A-Za-z0-9._+-]+
//! ```
//!
//! Whitespace is allowed around `:` and `,`.

use crate::ast::ExpressionNode;
use crate::error::{Error, Result};
use crate::operator::Operator;
use serde::{Deserialize, Serialize};

/// Separator between path segments inside a field identifier.
pub const PATH_SEPARATOR: &str = "__";
/// Prefix of the operator suffix inside a field identifier.
pub const OPERATOR_SEPARATOR: &str = "___";

/// Raw (pre-coercion) filter value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Scalar(String),
    List(Vec<String>),
}

impl FilterValue {
    /// Build from parsed items: one item is a scalar, more is a list.
    pub fn from_items(mut items: Vec<String>) -> Self {
        if items.len() == 1 {
            FilterValue::Scalar(items.remove(0))
        } else {
            FilterValue::List(items)
        }
    }

    pub fn items(&self) -> &[String] {
        match self {
            FilterValue::Scalar(value) => std::slice::from_ref(value),
            FilterValue::List(values) => values,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, FilterValue::List(_))
    }

    /// List operators always carry a list; other operators a scalar when
    /// there is exactly one item.
    pub fn normalized_for(self, operator: Operator) -> Self {
        match self {
            FilterValue::Scalar(value) if operator.accepts_list() => {
                FilterValue::List(vec![value])
            }
            FilterValue::List(mut values) if !operator.accepts_list() && values.len() == 1 => {
                FilterValue::Scalar(values.remove(0))
            }
            other => other,
        }
    }
}

/// A parsed field filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterSpec {
    pub field_path: Vec<String>,
    /// `None` means the type default (equality).
    pub operator: Option<Operator>,
    pub value: FilterValue,
}

impl FilterSpec {
    pub fn operator(&self) -> Operator {
        self.operator.unwrap_or(Operator::DEFAULT)
    }

    /// Field path as written in a query (`a__b`).
    pub fn field_name(&self) -> String {
        self.field_path.join(PATH_SEPARATOR)
    }
}

/// A parsed expression leaf
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LeafFilter {
    Field(FilterSpec),
    /// Shorthand such as `#resolved`; carries no value.
    Hashtag(String),
}

/// Parse leaf text that starts at offset 0.
pub fn parse_leaf(text: &str) -> Result<LeafFilter> {
    parse_leaf_at(text, 0)
}

/// Parse an AST leaf, reporting errors at the leaf's position.
pub fn parse_expression(expr: &ExpressionNode) -> Result<LeafFilter> {
    parse_leaf_at(&expr.text, expr.start)
}

fn parse_leaf_at(text: &str, start: usize) -> Result<LeafFilter> {
    let mut p = FieldParser::new(text);
    p.parse().map_err(|reason| Error::InvalidExpression {
        expression: text.to_string(),
        position: start + text[..p.pos].chars().count(),
        reason,
    })
}

/// Parse a field identifier or quoted name with no operator suffix, as used
/// by sort clauses.
pub(crate) fn parse_field_path(text: &str) -> std::result::Result<Vec<String>, String> {
    let mut p = FieldParser::new(text);
    p.skip_ws();
    let (path, operator) = p.parse_field()?;
    p.skip_ws();
    if let Some(c) = p.peek_char() {
        return Err(format!("unexpected character '{}'", c));
    }
    if let Some(op) = operator {
        return Err(format!("operator '{}' is not allowed here", op));
    }
    Ok(path)
}

/// Path of a field given by name: a `a__b` identifier path, or the name as a
/// single segment when it is not one (display names with spaces).
pub(crate) fn name_path(name: &str) -> Vec<String> {
    parse_field_path(name).unwrap_or_else(|_| vec![name.to_string()])
}

fn is_ident_char(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

pub(crate) fn is_bare_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '.' | '_' | '-' | '+')
}

struct FieldParser<'a> {
    input: &'a str,
    pos: usize,
}

type ParseResult<T> = std::result::Result<T, String>;

impl<'a> FieldParser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek_char(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn consume_char(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek_char(), Some(c) if c.is_whitespace()) {
            self.consume_char();
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while matches!(self.peek_char(), Some(c) if pred(c)) {
            self.consume_char();
        }
        &self.input[start..self.pos]
    }

    fn parse(&mut self) -> ParseResult<LeafFilter> {
        self.skip_ws();

        if self.peek_char() == Some('#') {
            self.consume_char();
            let name = self.take_while(|c| is_ident_char(c) || c == '-');
            if name.is_empty() {
                return Err("missing hashtag name".to_string());
            }
            let name = name.to_string();
            self.skip_ws();
            if !self.is_eof() {
                return Err("unexpected text after hashtag".to_string());
            }
            return Ok(LeafFilter::Hashtag(name));
        }

        let (field_path, operator) = self.parse_field()?;
        self.skip_ws();
        if self.consume_char() != Some(':') {
            return Err("expected ':' after field".to_string());
        }
        let value = self.parse_values()?;

        Ok(LeafFilter::Field(FilterSpec {
            field_path,
            operator,
            value,
        }))
    }

    fn parse_field(&mut self) -> ParseResult<(Vec<String>, Option<Operator>)> {
        if self.peek_char() == Some('"') {
            let name = self.parse_quoted()?;
            if name.trim().is_empty() {
                return Err("empty field name".to_string());
            }
            let operator = if self.remaining().starts_with(OPERATOR_SEPARATOR) {
                self.pos += OPERATOR_SEPARATOR.len();
                let suffix = self.take_while(is_ident_char);
                Some(parse_operator(suffix)?)
            } else {
                None
            };
            return Ok((vec![name], operator));
        }

        let ident = self.take_while(is_ident_char);
        if ident.is_empty() {
            return Err("missing field name".to_string());
        }
        split_identifier(ident)
    }

    fn parse_values(&mut self) -> ParseResult<FilterValue> {
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            let item = match self.peek_char() {
                None => {
                    return Err(if items.is_empty() {
                        "missing value".to_string()
                    } else {
                        "missing value after ','".to_string()
                    });
                }
                Some('"') => self.parse_quoted()?,
                Some(c) => {
                    let token = self.take_while(is_bare_char);
                    if token.is_empty() {
                        return Err(format!("unexpected character '{}'", c));
                    }
                    token.to_string()
                }
            };
            items.push(item);

            self.skip_ws();
            match self.peek_char() {
                None => break,
                Some(',') => {
                    self.consume_char();
                }
                Some(c) => return Err(format!("unexpected character '{}'", c)),
            }
        }
        Ok(FilterValue::from_items(items))
    }

    fn parse_quoted(&mut self) -> ParseResult<String> {
        self.consume_char(); // opening quote
        let Some(len) = self.remaining().find('"') else {
            return Err("unterminated quoted string".to_string());
        };
        let content = self.remaining()[..len].to_string();
        self.pos += len + 1;
        Ok(content)
    }
}

fn parse_operator(suffix: &str) -> ParseResult<Operator> {
    Operator::parse(suffix).ok_or_else(|| format!("unknown operator '{}'", suffix))
}

/// Split `a__b___op` into path segments and an optional operator.
fn split_identifier(ident: &str) -> ParseResult<(Vec<String>, Option<Operator>)> {
    let (path, operator) = match ident.rfind(OPERATOR_SEPARATOR) {
        Some(idx) => {
            let op = parse_operator(&ident[idx + OPERATOR_SEPARATOR.len()..])?;
            (&ident[..idx], Some(op))
        }
        None => (ident, None),
    };

    let segments: Vec<String> = path.split(PATH_SEPARATOR).map(str::to_string).collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(format!("empty path segment in '{}'", ident));
    }
    Ok((segments, operator))
}
