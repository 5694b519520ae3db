//! # Expression Generator
//!
//! A small, whitelisted arithmetic interpreter for the `expression`
//! generator kind. Deliberately NOT a general-purpose host-language
//! evaluator: the grammar only covers `+ - * /`, unary minus, parentheses,
//! numeric literals, and references to already-produced sibling columns
//! (`col("name")`). Anything outside that grammar is a parse error, not a
//! capability.

use std::collections::HashMap;

use crate::error::{DatagenError, GeneratorErrorKind, Result};
use crate::generate::value::Value;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    ColumnRef(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn tokenize(src: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = src.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let n = text
                    .parse::<f64>()
                    .map_err(|_| bad_spec(format!("invalid number literal '{text}'")))?;
                tokens.push(Token::Number(n));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                if ident != "col" {
                    return Err(bad_spec(format!(
                        "unknown identifier '{ident}' (only col(\"name\") references are allowed)"
                    )));
                }
                // expect (" name ")
                expect_char(&chars, &mut i, '(')?;
                expect_char(&chars, &mut i, '"')?;
                let name_start = i;
                while i < chars.len() && chars[i] != '"' {
                    i += 1;
                }
                if i >= chars.len() {
                    return Err(bad_spec("unterminated column reference"));
                }
                let name: String = chars[name_start..i].iter().collect();
                i += 1; // closing quote
                expect_char(&chars, &mut i, ')')?;
                tokens.push(Token::ColumnRef(name));
            }
            other => return Err(bad_spec(format!("unexpected character '{other}'"))),
        }
    }
    Ok(tokens)
}

fn expect_char(chars: &[char], i: &mut usize, expected: char) -> Result<()> {
    if *i < chars.len() && chars[*i] == expected {
        *i += 1;
        Ok(())
    } else {
        Err(bad_spec(format!("expected '{expected}' in expression")))
    }
}

fn bad_spec(detail: impl Into<String>) -> DatagenError {
    DatagenError::Generator {
        node: String::new(),
        column: String::new(),
        kind: GeneratorErrorKind::BadSpec,
        detail: detail.into(),
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<&Token> {
        let t = self.tokens.get(self.pos);
        self.pos += 1;
        t
    }

    fn parse_expr(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.bump();
                    let rhs = self.parse_term()?;
                    lhs = Expr::Add(Box::new(lhs), Box::new(rhs));
                }
                Some(Token::Minus) => {
                    self.bump();
                    let rhs = self.parse_term()?;
                    lhs = Expr::Sub(Box::new(lhs), Box::new(rhs));
                }
                _ => break,
            }
        }
        Ok(lhs)
    }

    fn parse_term(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.bump();
                    let rhs = self.parse_unary()?;
                    lhs = Expr::Mul(Box::new(lhs), Box::new(rhs));
                }
                Some(Token::Slash) => {
                    self.bump();
                    let rhs = self.parse_unary()?;
                    lhs = Expr::Div(Box::new(lhs), Box::new(rhs));
                }
                _ => break,
            }
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        if let Some(Token::Minus) = self.peek() {
            self.bump();
            let inner = self.parse_unary()?;
            return Ok(Expr::Neg(Box::new(inner)));
        }
        self.parse_atom()
    }

    fn parse_atom(&mut self) -> Result<Expr> {
        match self.bump() {
            Some(Token::Number(n)) => Ok(Expr::Literal(*n)),
            Some(Token::ColumnRef(name)) => Ok(Expr::ColumnRef(name.clone())),
            Some(Token::LParen) => {
                let inner = self.parse_expr()?;
                match self.bump() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(bad_spec("missing closing parenthesis")),
                }
            }
            other => Err(bad_spec(format!("unexpected token {other:?}"))),
        }
    }
}

#[derive(Debug, Clone)]
enum Expr {
    Literal(f64),
    ColumnRef(String),
    Neg(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
}

/// A parsed expression, ready to be evaluated against a row's already
/// produced columns.
pub struct CompiledExpr {
    root: Expr,
}

/// Parse an expression string into a reusable compiled form. Parsing
/// happens once per column, not once per row.
pub fn compile(source: &str) -> Result<CompiledExpr> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
    };
    let root = parser.parse_expr()?;
    if parser.pos != tokens.len() {
        return Err(bad_spec("trailing tokens after expression"));
    }
    Ok(CompiledExpr { root })
}

impl CompiledExpr {
    /// Evaluate against the columns produced so far in the current row.
    pub fn eval(&self, row_so_far: &HashMap<String, Value>) -> Result<f64> {
        eval_expr(&self.root, row_so_far)
    }
}

fn eval_expr(expr: &Expr, row: &HashMap<String, Value>) -> Result<f64> {
    match expr {
        Expr::Literal(n) => Ok(*n),
        Expr::ColumnRef(name) => {
            let value = row.get(name).ok_or_else(|| DatagenError::Generator {
                node: String::new(),
                column: String::new(),
                kind: GeneratorErrorKind::ReferenceUnresolved,
                detail: format!("column '{name}' has not been produced yet"),
            })?;
            value.as_float().ok_or_else(|| DatagenError::Generator {
                node: String::new(),
                column: String::new(),
                kind: GeneratorErrorKind::BadSpec,
                detail: format!("column '{name}' is not numeric"),
            })
        }
        Expr::Neg(inner) => Ok(-eval_expr(inner, row)?),
        Expr::Add(a, b) => Ok(eval_expr(a, row)? + eval_expr(b, row)?),
        Expr::Sub(a, b) => Ok(eval_expr(a, row)? - eval_expr(b, row)?),
        Expr::Mul(a, b) => Ok(eval_expr(a, row)? * eval_expr(b, row)?),
        Expr::Div(a, b) => {
            let denom = eval_expr(b, row)?;
            if denom == 0.0 {
                return Err(DatagenError::Generator {
                    node: String::new(),
                    column: String::new(),
                    kind: GeneratorErrorKind::OutOfRange,
                    detail: "division by zero".to_string(),
                });
            }
            Ok(eval_expr(a, row)? / denom)
        }
    }
}
