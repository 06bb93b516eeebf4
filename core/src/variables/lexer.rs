//! Tokenizer for assignment expressions.
//!
//! Recognizes:
//! - Numbers (digits with at most one `.`, no exponent)
//! - Identifiers (a letter followed by letters or digits), uppercased
//! - Binary operators (+, -, *, /, ^)
//! - Factorial (`!`) and parentheses
//!
//! Any other non-whitespace character becomes [`Token::Unknown`]; whether it
//! is an error is decided when the evaluator tries to apply it.

use super::evaluator::EvalError;
use std::collections::BTreeSet;
use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinaryOperator {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Self::Add),
            '-' => Some(Self::Sub),
            '*' => Some(Self::Mul),
            '/' => Some(Self::Div),
            '^' => Some(Self::Pow),
            _ => None,
        }
    }
}

/// Token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    /// Uppercased identifier
    Identifier(String),
    Operator(BinaryOperator),
    /// Operator character outside the supported set
    Unknown(char),
    Bang,
    LParen,
    RParen,
    Eof,
}

pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            position: 0,
        }
    }

    pub fn next_token(&mut self) -> Result<Token, EvalError> {
        self.skip_whitespace();

        let Some(&c) = self.chars.peek() else {
            return Ok(Token::Eof);
        };

        match c {
            '(' => {
                self.advance();
                Ok(Token::LParen)
            }
            ')' => {
                self.advance();
                Ok(Token::RParen)
            }
            '!' => {
                self.advance();
                Ok(Token::Bang)
            }
            c if c.is_ascii_digit() || c == '.' => self.read_number(),
            c if c.is_ascii_alphabetic() => Ok(Token::Identifier(self.read_identifier())),
            c => {
                self.advance();
                Ok(BinaryOperator::from_char(c)
                    .map(Token::Operator)
                    .unwrap_or(Token::Unknown(c)))
            }
        }
    }

    fn advance(&mut self) -> Option<char> {
        self.position += 1;
        self.chars.next()
    }

    fn skip_whitespace(&mut self) {
        while let Some(&c) = self.chars.peek() {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_number(&mut self) -> Result<Token, EvalError> {
        let pos = self.position;
        let mut num_str = String::new();
        let mut has_dot = false;

        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() {
                num_str.push(c);
                self.advance();
            } else if c == '.' && !has_dot {
                has_dot = true;
                num_str.push(c);
                self.advance();
            } else {
                break;
            }
        }

        num_str.parse::<f64>().map(Token::Number).map_err(|_| {
            EvalError::MalformedExpression(format!(
                "invalid number '{}' at position {}",
                num_str, pos
            ))
        })
    }

    fn read_identifier(&mut self) -> String {
        let mut name = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_alphanumeric() {
                name.push(c.to_ascii_uppercase());
                self.advance();
            } else {
                break;
            }
        }
        name
    }
}

/// Tokenize a whole expression, without the trailing `Eof`
pub fn tokenize(input: &str) -> Result<Vec<Token>, EvalError> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        match lexer.next_token()? {
            Token::Eof => return Ok(tokens),
            token => tokens.push(token),
        }
    }
}

/// Identifiers referenced by a token stream
pub fn identifiers(tokens: &[Token]) -> BTreeSet<String> {
    tokens
        .iter()
        .filter_map(|token| match token {
            Token::Identifier(name) => Some(name.clone()),
            _ => None,
        })
        .collect()
}

/// Check that `name` is a complete identifier as the lexer would read it
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric())
}
