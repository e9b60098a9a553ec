//! Boolean expression parser - converts the token stream to an AST
//!
//! Recursive descent over an immutable token slice. Precedence (lowest to
//! highest):
//! 1. or
//! 2. and
//! 3. not (prefix)
//! 4. bracketed group / expression
//!
//! Both binary levels are left-associative, so `a and b or c` parses as
//! `(a and b) or c`.

use crate::ast::{ExpressionNode, Node};
use crate::error::{Error, Result};
use crate::token::{Token, TokenKind};

/// Default maximum nesting of brackets and `not`.
pub const DEFAULT_MAX_DEPTH: usize = 200;

/// Parse a token stream. Empty input yields `None`.
pub fn parse(tokens: &[Token]) -> Result<Option<Node>> {
    Parser::new(tokens).parse()
}

/// Check bracket balance on raw query text.
///
/// Reports the first unmatched `)`, or a missing `)` at the end of the query
/// if brackets remain open. Brackets inside double quotes are ignored.
pub fn check_brackets(query: &str) -> Result<()> {
    let mut depth = 0usize;
    let mut in_quotes = false;
    let mut len = 0usize;

    for (position, c) in query.chars().enumerate() {
        len = position + 1;
        match c {
            '"' => in_quotes = !in_quotes,
            '(' if !in_quotes => depth += 1,
            ')' if !in_quotes => {
                if depth == 0 {
                    return Err(Error::UnmatchedBracket { position });
                }
                depth -= 1;
            }
            _ => {}
        }
    }

    if depth > 0 {
        return Err(Error::MissingBracket { position: len });
    }
    Ok(())
}

/// Parser for boolean query expressions
pub struct Parser<'a> {
    tokens: &'a [Token],
    cursor: usize,
    depth: usize,
    max_depth: usize,
}

impl<'a> Parser<'a> {
    /// Create a new parser over the given tokens
    pub fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            cursor: 0,
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Parse the entire token stream (top-level entry point)
    pub fn parse(mut self) -> Result<Option<Node>> {
        if self.tokens.is_empty() {
            return Ok(None);
        }

        let node = self.parse_or_expression()?;

        // Ensure we've consumed all input
        if let Some(token) = self.peek() {
            return Err(Error::UnexpectedToken {
                token: token.text.clone(),
                position: token.start,
            });
        }

        Ok(Some(node))
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.cursor)
    }

    fn peek_is(&self, kind: TokenKind) -> bool {
        self.peek().is_some_and(|t| t.kind == kind)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.cursor)?;
        self.cursor += 1;
        Some(token)
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(Error::TooDeeplyNested {
                max_depth: self.max_depth,
            });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// A keyword must be followed by an operand.
    fn require_operand(&self, keyword: &Token) -> Result<()> {
        if self.peek().is_none() {
            return Err(Error::UnexpectedEnd {
                after: keyword.text.clone(),
                position: keyword.start,
            });
        }
        Ok(())
    }

    /// or_expr := and_expr ("or" and_expr)*
    fn parse_or_expression(&mut self) -> Result<Node> {
        let mut left = self.parse_and_expression()?;

        while self.peek_is(TokenKind::Or) {
            let Some(keyword) = self.advance() else { break };
            self.require_operand(keyword)?;
            let right = self.parse_and_expression()?;
            left = Node::or(left, right);
        }

        Ok(left)
    }

    /// and_expr := unary ("and" unary)*
    fn parse_and_expression(&mut self) -> Result<Node> {
        let mut left = self.parse_unary()?;

        while self.peek_is(TokenKind::And) {
            let Some(keyword) = self.advance() else { break };
            self.require_operand(keyword)?;
            let right = self.parse_unary()?;
            left = Node::and(left, right);
        }

        Ok(left)
    }

    /// unary := "not" unary | primary
    fn parse_unary(&mut self) -> Result<Node> {
        if !self.peek_is(TokenKind::Not) {
            return self.parse_primary();
        }

        let Some(keyword) = self.advance() else {
            return self.parse_primary();
        };
        self.require_operand(keyword)?;
        self.enter()?;
        let inner = self.parse_unary()?;
        self.leave();
        Ok(Node::Not(Box::new(inner)))
    }

    /// primary := "(" or_expr ")" | expression
    fn parse_primary(&mut self) -> Result<Node> {
        let Some(token) = self.advance() else {
            let (after, position) = self
                .tokens
                .last()
                .map(|t| (t.text.clone(), t.start))
                .unwrap_or_default();
            return Err(Error::UnexpectedEnd { after, position });
        };

        match token.kind {
            TokenKind::Expression => Ok(Node::Expression(ExpressionNode {
                text: token.text.clone(),
                start: token.start,
                end: token.end,
            })),
            TokenKind::OpenBracket => {
                self.enter()?;
                let inner = self.parse_or_expression()?;
                match self.advance() {
                    Some(close) if close.kind == TokenKind::CloseBracket => {}
                    Some(other) => {
                        return Err(Error::UnexpectedToken {
                            token: other.text.clone(),
                            position: other.start,
                        });
                    }
                    None => {
                        let position = self.tokens.last().map(|t| t.end + 1).unwrap_or(0);
                        return Err(Error::MissingBracket { position });
                    }
                }
                self.leave();
                Ok(inner)
            }
            TokenKind::And | TokenKind::Or | TokenKind::Not | TokenKind::CloseBracket => {
                Err(Error::UnexpectedToken {
                    token: token.text.clone(),
                    position: token.start,
                })
            }
        }
    }
}
