//! Recursive-descent parser for the literal values found in captured
//! requests: quoted strings, integers, floats and lists or tuples of them.

use std::{iter::Peekable, str::CharIndices};

use thiserror::Error;

use crate::job::Value;

#[derive(Error, Debug, PartialEq)]
pub enum LiteralError {
    #[error("unexpected end of input")]
    UnexpectedEnd,

    #[error("unexpected character '{found}' at offset {offset}")]
    Unexpected { found: char, offset: usize },

    #[error("unterminated string starting at offset {0}")]
    UnterminatedString(usize),

    #[error("invalid number '{0}'")]
    InvalidNumber(String),
}

/// Parses `text` as one literal. Surrounding whitespace and a single
/// trailing comma are allowed.
pub fn parse_literal(text: &str) -> Result<Value, LiteralError> {
    let mut parser = Parser::new(text);
    let value = parser.value()?;
    parser.skip_whitespace();
    if parser.peek() == Some(',') {
        parser.bump();
        parser.skip_whitespace();
    }
    match parser.chars.next() {
        None => Ok(value),
        Some((offset, found)) => Err(LiteralError::Unexpected { found, offset }),
    }
}

struct Parser<'a> {
    text: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Parser {
            text,
            chars: text.char_indices().peekable(),
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn offset(&mut self) -> usize {
        self.chars.peek().map(|&(i, _)| i).unwrap_or(self.text.len())
    }

    fn bump(&mut self) -> Option<char> {
        self.chars.next().map(|(_, c)| c)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn value(&mut self) -> Result<Value, LiteralError> {
        self.skip_whitespace();
        match self.peek() {
            None => Err(LiteralError::UnexpectedEnd),
            Some('\'') | Some('"') => self.string(),
            Some('[') => self.sequence(']'),
            Some('(') => self.sequence(')'),
            Some(c) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => self.number(),
            Some(found) => Err(LiteralError::Unexpected {
                found,
                offset: self.offset(),
            }),
        }
    }

    fn string(&mut self) -> Result<Value, LiteralError> {
        let start = self.offset();
        let quote = self.bump().ok_or(LiteralError::UnexpectedEnd)?;
        let mut s = String::new();

        loop {
            match self.bump() {
                None => return Err(LiteralError::UnterminatedString(start)),
                Some(c) if c == quote => return Ok(Value::Str(s)),
                Some('\\') => match self.bump() {
                    None => return Err(LiteralError::UnterminatedString(start)),
                    Some('n') => s.push('\n'),
                    Some('t') => s.push('\t'),
                    Some('r') => s.push('\r'),
                    Some('0') => s.push('\0'),
                    Some(c @ ('\\' | '\'' | '"')) => s.push(c),
                    Some(c) => {
                        s.push('\\');
                        s.push(c);
                    }
                },
                Some(c) => s.push(c),
            }
        }
    }

    fn sequence(&mut self, close: char) -> Result<Value, LiteralError> {
        self.bump();
        let mut values = Vec::new();

        loop {
            self.skip_whitespace();
            if self.peek() == Some(close) {
                self.bump();
                return Ok(Value::List(values));
            }

            values.push(self.value()?);

            self.skip_whitespace();
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some(c) if c == close => {}
                Some(found) => {
                    return Err(LiteralError::Unexpected {
                        found,
                        offset: self.offset(),
                    })
                }
                None => return Err(LiteralError::UnexpectedEnd),
            }
        }
    }

    fn number(&mut self) -> Result<Value, LiteralError> {
        let mut literal = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '+' | '.' | '_') {
                literal.push(c);
                self.bump();
            } else {
                break;
            }
        }

        let cleaned = literal.replace('_', "");
        let is_float = cleaned.contains(['.', 'e', 'E']);
        let parsed = if is_float {
            cleaned.parse::<f64>().ok().map(Value::Float)
        } else {
            cleaned.parse::<i64>().ok().map(Value::Int)
        };

        parsed.ok_or(LiteralError::InvalidNumber(literal))
    }
}

// -- Tests -------------------------------------------------------------------
