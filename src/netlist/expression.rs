//! Recursive-descent parser for behavioral source expressions.
//!
//! ```text
//! expr    = term { ('+' | '-') term }
//! term    = unary { ('*' | '/') unary }
//! unary   = ('-' | '+') unary | power
//! power   = primary [ '^' unary ]
//! primary = number | '(' expr ')' | 'time' | 'pi'
//!         | 'v' '(' node [',' node] ')' | 'i' '(' element ')'
//!         | func '(' expr ')'
//! ```

use std::f64::consts::PI;

use super::lexer::{parse_value, Token, TokenKind};
use crate::circuit::BranchId;
use crate::error::{Result, SimError};
use crate::expr::{Expr, Func, Signal};

/// Map a netlist node label to its circuit name (`gnd` is the reference).
pub(crate) fn node_name(text: &str) -> String {
    if text.eq_ignore_ascii_case("gnd") {
        crate::circuit::REFERENCE_NODE.to_string()
    } else {
        text.to_string()
    }
}

/// Parses one expression from a token slice.
pub struct ExprParser<'t, F> {
    tokens: &'t [Token],
    pos: usize,
    line: usize,
    branch: F,
}

impl<'t, F> ExprParser<'t, F>
where
    F: Fn(&str) -> Option<BranchId>,
{
    /// `branch` resolves element names used in `i(...)`.
    pub fn new(tokens: &'t [Token], line: usize, branch: F) -> Self {
        Self {
            tokens,
            pos: 0,
            line,
            branch,
        }
    }

    /// Parse the whole slice as a single expression.
    pub fn parse(mut self) -> Result<Expr<Signal>> {
        if self.tokens.is_empty() {
            return Err(SimError::parse(self.line, "empty expression"));
        }
        let expr = self.expr()?;
        match self.peek() {
            None => Ok(expr),
            Some(tok) => Err(SimError::parse(
                self.line,
                format!("unexpected '{}' in expression", tok.text),
            )),
        }
    }

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'t Token> {
        let tok = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(tok)
    }

    fn eat_op(&mut self, op: char) -> bool {
        if self.peek().is_some_and(|t| t.is_op(op)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<&'t Token> {
        match self.next() {
            Some(tok) if tok.kind == kind => Ok(tok),
            Some(tok) => Err(SimError::parse(
                self.line,
                format!("expected {:?}, got '{}'", kind, tok.text),
            )),
            None => Err(SimError::parse(
                self.line,
                format!("expected {:?}, got end of expression", kind),
            )),
        }
    }

    fn expr(&mut self) -> Result<Expr<Signal>> {
        let mut lhs = self.term()?;
        loop {
            if self.eat_op('+') {
                lhs = lhs + self.term()?;
            } else if self.eat_op('-') {
                lhs = lhs - self.term()?;
            } else {
                return Ok(lhs);
            }
        }
    }

    fn term(&mut self) -> Result<Expr<Signal>> {
        let mut lhs = self.unary()?;
        loop {
            if self.eat_op('*') {
                lhs = lhs * self.unary()?;
            } else if self.eat_op('/') {
                lhs = lhs / self.unary()?;
            } else {
                return Ok(lhs);
            }
        }
    }

    fn unary(&mut self) -> Result<Expr<Signal>> {
        if self.eat_op('-') {
            return Ok(-self.unary()?);
        }
        if self.eat_op('+') {
            return self.unary();
        }
        self.power()
    }

    fn power(&mut self) -> Result<Expr<Signal>> {
        let base = self.primary()?;
        if self.eat_op('^') {
            // Right-associative: a^b^c = a^(b^c)
            let exponent = self.unary()?;
            return Ok(Expr::pow(base, exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Expr<Signal>> {
        let line = self.line;
        let Some(tok) = self.next() else {
            return Err(SimError::parse(line, "unexpected end of expression"));
        };

        match tok.kind {
            TokenKind::Number => parse_value(&tok.text)
                .map(Expr::Const)
                .ok_or_else(|| SimError::parse(line, format!("invalid number '{}'", tok.text))),
            TokenKind::OpenParen => {
                let inner = self.expr()?;
                self.expect(TokenKind::CloseParen)?;
                Ok(inner)
            }
            TokenKind::Identifier => self.identifier(tok),
            _ => Err(SimError::parse(
                line,
                format!("unexpected '{}' in expression", tok.text),
            )),
        }
    }

    fn identifier(&mut self, tok: &'t Token) -> Result<Expr<Signal>> {
        let name = tok.text.to_ascii_lowercase();
        let is_call = self
            .peek()
            .is_some_and(|t| t.kind == TokenKind::OpenParen);

        if !is_call {
            return match name.as_str() {
                "time" => Ok(Expr::Time),
                "pi" => Ok(Expr::Const(PI)),
                _ => Err(SimError::parse(
                    self.line,
                    format!("unknown identifier '{}'", tok.text),
                )),
            };
        }

        self.expect(TokenKind::OpenParen)?;
        let expr = match name.as_str() {
            "v" => {
                let plus = self.node()?;
                if self.peek().is_some_and(|t| t.kind == TokenKind::Comma) {
                    self.pos += 1;
                    let minus = self.node()?;
                    Expr::voltage_between(plus, minus)
                } else {
                    Expr::voltage(plus)
                }
            }
            "i" => {
                let element = self.next().ok_or_else(|| {
                    SimError::parse(self.line, "expected element name in i(...)")
                })?;
                let id = (self.branch)(&element.text).ok_or_else(|| {
                    SimError::parse(self.line, format!("unknown element '{}' in i(...)", element.text))
                })?;
                Expr::current(id)
            }
            _ => {
                let func = Func::from_name(&name).ok_or_else(|| {
                    SimError::parse(self.line, format!("unknown function '{}'", tok.text))
                })?;
                Expr::call(func, self.expr()?)
            }
        };
        self.expect(TokenKind::CloseParen)?;
        Ok(expr)
    }

    fn node(&mut self) -> Result<String> {
        match self.next() {
            Some(tok) if matches!(tok.kind, TokenKind::Identifier | TokenKind::Number) => {
                Ok(node_name(&tok.text))
            }
            _ => Err(SimError::parse(self.line, "expected node name in v(...)")),
        }
    }
}
