//! Query lexer - splits query text into expression, keyword and bracket tokens
//!
//! Expressions are kept as raw text; the field-filter grammar parses them
//! later. Double quotes switch off all special handling until the closing
//! quote, so brackets and keywords inside quoted values are literal.
//!
//! Placement rules are checked as tokens are pushed:
//! - `and`/`or` must follow an expression or `)`
//! - `not` must not follow an expression or `)`
//! - `)` must not start the query or follow a keyword; `()` is dropped
//! - `(` must not follow an expression or `)`

use crate::error::{Error, Result};
use crate::token::{Expected, Token, TokenKind};

const KEYWORDS: [(&str, TokenKind); 3] = [
    ("and", TokenKind::And),
    ("or", TokenKind::Or),
    ("not", TokenKind::Not),
];

/// Tokenize a query string.
pub fn tokenize(query: &str) -> Result<Vec<Token>> {
    Lexer::new(query).tokenize()
}

/// The query lexer
pub struct Lexer {
    chars: Vec<char>,
    position: usize,
    in_quotes: bool,
    depth: usize,
    tokens: Vec<Token>,
    buffer: String,
    buffer_start: Option<usize>,
    buffer_end: usize,
}

impl Lexer {
    /// Create a new lexer for the given input
    pub fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            position: 0,
            in_quotes: false,
            depth: 0,
            tokens: Vec::new(),
            buffer: String::new(),
            buffer_start: None,
            buffer_end: 0,
        }
    }

    /// Consume the input and return the token stream.
    ///
    /// Brackets still open at end of input are closed with synthesized `)`
    /// tokens positioned at the end of the query.
    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        while let Some(&c) = self.chars.get(self.position) {
            if c == '"' {
                self.in_quotes = !self.in_quotes;
                self.push_char(c);
                self.position += 1;
                continue;
            }

            if self.in_quotes {
                self.push_char(c);
                self.position += 1;
                continue;
            }

            match c {
                '(' => {
                    self.flush();
                    self.push_open(self.position)?;
                    self.position += 1;
                }
                ')' => {
                    self.flush();
                    self.push_close(self.position)?;
                    self.position += 1;
                }
                _ => {
                    if let Some((kind, len)) = self.keyword_at(self.position) {
                        self.flush();
                        let start = self.position;
                        let end = start + len - 1;
                        let text: String = self.chars[start..=end].iter().collect();
                        self.push_keyword(kind, text, start, end)?;
                        self.position += len;
                    } else {
                        self.push_char(c);
                        self.position += 1;
                    }
                }
            }
        }

        self.flush();

        let end = self.chars.len();
        for _ in 0..self.depth {
            self.tokens
                .push(Token::new(TokenKind::CloseBracket, ")", end, end));
        }

        tracing::trace!(tokens = self.tokens.len(), "Tokenized query");
        Ok(self.tokens)
    }

    fn is_boundary(c: char) -> bool {
        c.is_whitespace() || c == '(' || c == ')'
    }

    /// Match a whole-word, case-insensitive keyword starting at `pos`.
    fn keyword_at(&self, pos: usize) -> Option<(TokenKind, usize)> {
        if pos > 0 && !Self::is_boundary(self.chars[pos - 1]) {
            return None;
        }

        KEYWORDS.iter().find_map(|(word, kind)| {
            let len = word.len();
            let candidate = self.chars.get(pos..pos + len)?;
            let matches = candidate
                .iter()
                .zip(word.chars())
                .all(|(a, b)| a.eq_ignore_ascii_case(&b));
            let bounded = self
                .chars
                .get(pos + len)
                .map_or(true, |&next| Self::is_boundary(next));
            (matches && bounded).then_some((*kind, len))
        })
    }

    fn push_char(&mut self, c: char) {
        if self.buffer_start.is_none() {
            if c.is_whitespace() {
                return;
            }
            self.buffer_start = Some(self.position);
        }
        self.buffer.push(c);
        if !c.is_whitespace() {
            self.buffer_end = self.position;
        }
    }

    /// Emit the pending buffer as an expression token (trimmed).
    fn flush(&mut self) {
        let Some(start) = self.buffer_start.take() else {
            return;
        };
        let text = self.buffer.trim_end().to_string();
        self.buffer.clear();
        self.tokens.push(Token::new(
            TokenKind::Expression,
            text,
            start,
            self.buffer_end,
        ));
    }

    fn preceding(&self) -> Option<TokenKind> {
        self.tokens.last().map(|t| t.kind)
    }

    fn push_keyword(
        &mut self,
        kind: TokenKind,
        text: String,
        start: usize,
        end: usize,
    ) -> Result<()> {
        let preceding = self.preceding();
        let after_operand = matches!(
            preceding,
            Some(TokenKind::Expression | TokenKind::CloseBracket)
        );
        let valid = if kind.is_logical() {
            after_operand
        } else {
            !after_operand
        };

        if !valid {
            return Err(Error::InvalidOperator {
                operator: text,
                position: start,
                preceding,
                expected: Expected::after(preceding),
            });
        }

        self.tokens.push(Token::new(kind, text, start, end));
        Ok(())
    }

    fn push_open(&mut self, position: usize) -> Result<()> {
        let preceding = self.preceding();
        if matches!(
            preceding,
            Some(TokenKind::Expression | TokenKind::CloseBracket)
        ) {
            return Err(Error::InvalidBracket {
                bracket: '(',
                position,
                preceding,
                expected: Expected::after(preceding),
            });
        }

        self.tokens
            .push(Token::new(TokenKind::OpenBracket, "(", position, position));
        self.depth += 1;
        Ok(())
    }

    fn push_close(&mut self, position: usize) -> Result<()> {
        let preceding = self.preceding();
        match preceding {
            None | Some(TokenKind::And | TokenKind::Or | TokenKind::Not) => {
                Err(Error::InvalidBracket {
                    bracket: ')',
                    position,
                    preceding,
                    expected: Expected::after(preceding),
                })
            }
            Some(TokenKind::OpenBracket) => {
                // Empty group: drop the pair.
                self.tokens.pop();
                self.depth = self.depth.saturating_sub(1);
                Ok(())
            }
            Some(TokenKind::Expression | TokenKind::CloseBracket) => {
                self.tokens
                    .push(Token::new(TokenKind::CloseBracket, ")", position, position));
                self.depth = self.depth.saturating_sub(1);
                Ok(())
            }
        }
    }
}
