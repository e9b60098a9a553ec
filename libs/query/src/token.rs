//! Token types for the query lexer
//!
//! Tokens are either filter expressions (un-parsed leaf text), the logical
//! keywords `and`/`or`/`not`, or brackets.

use serde::Serialize;
use std::fmt;

/// Token kinds produced by the lexer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Leaf filter text such as `subject: test`
    Expression,

    // Keywords
    And,
    Or,
    Not,

    // Delimiters
    OpenBracket,  // (
    CloseBracket, // )
}

impl TokenKind {
    /// Returns `true` for the binary keywords `and` / `or`.
    pub fn is_logical(self) -> bool {
        matches!(self, TokenKind::And | TokenKind::Or)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenKind::Expression => "expression",
            TokenKind::And => "and",
            TokenKind::Or => "or",
            TokenKind::Not => "not",
            TokenKind::OpenBracket => "(",
            TokenKind::CloseBracket => ")",
        };
        f.write_str(s)
    }
}

/// A token in the query text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Inclusive start offset (in characters)
    pub start: usize,
    /// Inclusive end offset (in characters)
    pub end: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            start,
            end,
        }
    }
}

/// A syntactically valid continuation, reported in placement errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Expected {
    Expression,
    And,
    Or,
    Not,
    OpenBracket,
    CloseBracket,
}

const AFTER_OPERAND: &[Expected] = &[Expected::And, Expected::Or, Expected::CloseBracket];
const AFTER_OPERATOR: &[Expected] = &[Expected::OpenBracket, Expected::Not, Expected::Expression];

impl Expected {
    /// Valid continuations after the given token (`None` = start of query).
    pub fn after(preceding: Option<TokenKind>) -> &'static [Expected] {
        match preceding {
            Some(TokenKind::Expression | TokenKind::CloseBracket) => AFTER_OPERAND,
            Some(TokenKind::And | TokenKind::Or | TokenKind::Not | TokenKind::OpenBracket)
            | None => AFTER_OPERATOR,
        }
    }
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Expected::Expression => "expression",
            Expected::And => "'and'",
            Expected::Or => "'or'",
            Expected::Not => "'not'",
            Expected::OpenBracket => "'('",
            Expected::CloseBracket => "')'",
        };
        f.write_str(s)
    }
}
