//! Recursive-descent parser
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! ternary    := comparison ( '?' ternary ':' ternary )?
//! comparison := additive ( ('<' | '<=' | '>' | '>=' | '==' | '!=') additive )*
//! additive   := term ( ('+' | '-') term )*
//! term       := unary ( ('*' | '/' | '%' | 'mod') unary | <implicit> unary )*
//! unary      := ('-' | '+') unary | power
//! power      := primary ( '^' unary )?
//! primary    := number | variable | constant | function '(' args ')' | '(' ternary ')'
//! ```
//!
//! Implicit multiplication applies whenever a factor is directly followed
//! by a number, identifier or opening parenthesis: `3x`, `2(x+1)`,
//! `(x)(y)`, `2sin(x)`.

use crate::expr::ast::{BinaryOp, Expr, UnaryOp, Var};
use crate::expr::error::ExprError;
use crate::expr::functions::{Func, constant};
use crate::expr::lexer::{Token, TokenKind, tokenize};

/// Parse source text into an expression tree
pub fn parse(src: &str) -> Result<Expr, ExprError> {
    let tokens = tokenize(src)?;
    if tokens.is_empty() {
        return Err(ExprError::Empty);
    }

    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.ternary()?;
    if let Some(token) = parser.peek() {
        return Err(ExprError::UnexpectedToken {
            found: token.kind.describe(),
            expected: "end of expression",
            pos: token.pos,
        });
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek_kind() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &'static str) -> Result<(), ExprError> {
        match self.advance() {
            Some(token) if token.kind == kind => Ok(()),
            Some(token) => Err(ExprError::UnexpectedToken {
                found: token.kind.describe(),
                expected,
                pos: token.pos,
            }),
            None => Err(ExprError::UnexpectedEnd { expected }),
        }
    }

    fn ternary(&mut self) -> Result<Expr, ExprError> {
        let cond = self.comparison()?;
        if !self.eat(&TokenKind::Question) {
            return Ok(cond);
        }
        let then = self.ternary()?;
        self.expect(TokenKind::Colon, "':'")?;
        let otherwise = self.ternary()?;
        Ok(Expr::Cond(Box::new(cond), Box::new(then), Box::new(otherwise)))
    }

    fn comparison(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.additive()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Less) => BinaryOp::Less,
                Some(TokenKind::LessEq) => BinaryOp::LessEq,
                Some(TokenKind::Greater) => BinaryOp::Greater,
                Some(TokenKind::GreaterEq) => BinaryOp::GreaterEq,
                Some(TokenKind::EqEq) => BinaryOp::Eq,
                Some(TokenKind::NotEq) => BinaryOp::NotEq,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.additive()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn additive(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => BinaryOp::Add,
                Some(TokenKind::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn term(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Star) => {
                    self.pos += 1;
                    BinaryOp::Mul
                }
                Some(TokenKind::Slash) => {
                    self.pos += 1;
                    BinaryOp::Div
                }
                Some(TokenKind::Percent) => {
                    self.pos += 1;
                    BinaryOp::Mod
                }
                Some(TokenKind::Ident(name)) if name == "mod" => {
                    self.pos += 1;
                    BinaryOp::Mod
                }
                // Implicit multiplication: the next factor is consumed as-is
                Some(TokenKind::Number(_) | TokenKind::Ident(_) | TokenKind::LParen) => BinaryOp::Mul,
                _ => return Ok(lhs),
            };
            let rhs = self.unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        if self.eat(&TokenKind::Minus) {
            let inner = self.unary()?;
            return Ok(Expr::Unary(UnaryOp::Neg, Box::new(inner)));
        }
        if self.eat(&TokenKind::Plus) {
            return self.unary();
        }
        self.power()
    }

    fn power(&mut self) -> Result<Expr, ExprError> {
        let base = self.primary()?;
        if self.eat(&TokenKind::Caret) {
            // Right-associative, and the exponent may carry its own sign
            let exponent = self.unary()?;
            return Ok(Expr::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        let token = self.advance().ok_or(ExprError::UnexpectedEnd { expected: "a value" })?;
        match token.kind {
            TokenKind::Number(v) => Ok(Expr::Num(v)),
            TokenKind::LParen => {
                let inner = self.ternary()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            TokenKind::Ident(name) => self.identifier(name, token.pos),
            other => Err(ExprError::UnexpectedToken {
                found: other.describe(),
                expected: "a value",
                pos: token.pos,
            }),
        }
    }

    fn identifier(&mut self, name: String, pos: usize) -> Result<Expr, ExprError> {
        if let Some(var) = Var::from_name(&name) {
            return Ok(Expr::Var(var));
        }
        if let Some(value) = constant(&name) {
            return Ok(Expr::Num(value));
        }

        let calls = self.peek_kind() == Some(&TokenKind::LParen);
        match Func::from_name(&name) {
            Some(func) if calls => {
                self.pos += 1;
                let args = self.arguments()?;
                if !func.arity().accepts(args.len()) {
                    return Err(ExprError::Arity {
                        name: func.name(),
                        expected: func.arity().describe(),
                        found: args.len(),
                    });
                }
                Ok(Expr::Call(func, args))
            }
            Some(_) => Err(ExprError::UnexpectedToken {
                found: format!("function '{}'", name),
                expected: "'(' after function name",
                pos,
            }),
            None if calls => Err(ExprError::UnknownFunction { name, pos }),
            None => Err(ExprError::UnknownIdentifier { name, pos }),
        }
    }

    /// Comma-separated arguments after an opening parenthesis
    fn arguments(&mut self) -> Result<Vec<Expr>, ExprError> {
        let mut args = Vec::new();
        if self.eat(&TokenKind::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.ternary()?);
            if self.eat(&TokenKind::Comma) {
                continue;
            }
            self.expect(TokenKind::RParen, "',' or ')'")?;
            return Ok(args);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(src: &str, x: f64, y: f64) -> f64 {
        parse(src).unwrap().eval(&[x, y, 0.0])
    }

    #[test]
    fn test_precedence() {
        assert_eq!(eval("1 + 2 * 3", 0.0, 0.0), 7.0);
        assert_eq!(eval("2 ^ 3 ^ 2", 0.0, 0.0), 512.0);
        assert_eq!(eval("-x^2", 3.0, 0.0), -9.0);
        assert_eq!(eval("2^-1", 0.0, 0.0), 0.5);
        assert_eq!(eval("(1 + 2) * 3", 0.0, 0.0), 9.0);
    }

    #[test]
    fn test_implicit_multiplication() {
        assert_eq!(eval("3x", 2.0, 0.0), 6.0);
        assert_eq!(eval("2(x+1)", 2.0, 0.0), 6.0);
        assert_eq!(eval("(x)(y)", 2.0, 5.0), 10.0);
        assert_eq!(eval("x y", 2.0, 5.0), 10.0);
        assert!((eval("2sin(x)", 1.0, 0.0) - 2.0 * 1f64.sin()).abs() < 1e-12);
        assert_eq!(eval("2x^2", 3.0, 0.0), 18.0);
    }

    #[test]
    fn test_modulo_forms() {
        assert_eq!(eval("x % 3", 7.0, 0.0), 1.0);
        assert_eq!(eval("x mod 3", 7.0, 0.0), 1.0);
        assert_eq!(eval("mod(x, 3)", 7.0, 0.0), 1.0);
        assert_eq!(eval("x % 0", 7.0, 0.0), 0.0);
    }

    #[test]
    fn test_constants_and_exp() {
        assert!((eval("e^(1)", 0.0, 0.0) - std::f64::consts::E).abs() < 1e-12);
        assert!((eval("2pi", 0.0, 0.0) - std::f64::consts::TAU).abs() < 1e-12);
    }

    #[test]
    fn test_comparison_and_ternary() {
        assert_eq!(eval("x > 0 ? 1 : -1", 2.0, 0.0), 1.0);
        assert_eq!(eval("x > 0 ? 1 : -1", -2.0, 0.0), -1.0);
        assert_eq!(eval("x <= y", 1.0, 1.0), 1.0);
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse(""), Err(ExprError::Empty));
        assert!(matches!(parse("foo"), Err(ExprError::UnknownIdentifier { .. })));
        assert!(matches!(parse("foo(x)"), Err(ExprError::UnknownFunction { .. })));
        assert!(matches!(parse("sin(x, y)"), Err(ExprError::Arity { .. })));
        assert!(matches!(parse("sin"), Err(ExprError::UnexpectedToken { .. })));
        assert!(matches!(parse("(x + 1"), Err(ExprError::UnexpectedEnd { .. })));
        assert!(matches!(parse("x +"), Err(ExprError::UnexpectedEnd { .. })));
        assert!(matches!(parse("x )"), Err(ExprError::UnexpectedToken { .. })));
    }
}
