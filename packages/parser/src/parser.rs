use std::ops::Range;

use crate::ast::*;
use crate::error::{ParseError, ParseResult};
use crate::tokenizer::{tokenize, Token};

/// Parser for the expression language
pub struct Parser<'src> {
    tokens: Vec<(Token<'src>, Range<usize>)>,
    pos: usize,
    end: usize,
}

/// Parse a complete expression, requiring all input to be consumed.
pub fn parse_expression(source: &str) -> ParseResult<Expr> {
    let mut parser = Parser::new(source)?;
    let expr = parser.parse_expr()?;
    parser.expect_end()?;
    Ok(expr)
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> ParseResult<Self> {
        let tokens = tokenize(source)?;
        Ok(Self {
            tokens,
            pos: 0,
            end: source.len(),
        })
    }

    /// Parse an expression without requiring end-of-input
    pub fn parse_expr(&mut self) -> ParseResult<Expr> {
        self.parse_ternary()
    }

    // `cond ? a : b` and `cond ?: b`, both right-associative
    fn parse_ternary(&mut self) -> ParseResult<Expr> {
        let cond = self.parse_coalesce()?;

        if self.match_token(&Token::Question) {
            let if_true = self.parse_expr()?;
            self.expect(&Token::Colon)?;
            let if_false = self.parse_expr()?;
            return Ok(Expr::Ternary {
                cond: Box::new(cond),
                if_true: Box::new(if_true),
                if_false: Box::new(if_false),
            });
        }

        if self.match_token(&Token::QuestionColon) {
            let fallback = self.parse_expr()?;
            return Ok(Expr::Elvis {
                cond: Box::new(cond),
                fallback: Box::new(fallback),
            });
        }

        Ok(cond)
    }

    // `a ?? b`, right-associative
    fn parse_coalesce(&mut self) -> ParseResult<Expr> {
        let value = self.parse_or()?;
        if self.match_token(&Token::QuestionQuestion) {
            let fallback = self.parse_coalesce()?;
            return Ok(Expr::NullCoalesce {
                value: Box::new(value),
                fallback: Box::new(fallback),
            });
        }
        Ok(value)
    }

    fn parse_or(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_and()?;
        while self.match_token(&Token::OrOr) {
            let rhs = self.parse_and()?;
            lhs = Expr::Or {
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_equality()?;
        while self.match_token(&Token::AndAnd) {
            let rhs = self.parse_equality()?;
            lhs = Expr::And {
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_comparison()?;
        loop {
            let op = match self.peek_token() {
                Some(Token::EqEq) => EqualityOp::Equals,
                Some(Token::NotEq) => EqualityOp::NotEquals,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_comparison()?;
            lhs = Expr::Equality {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek_token() {
                Some(Token::Gt) => ComparisonOp::GreaterThan,
                Some(Token::Lt) => ComparisonOp::LessThan,
                Some(Token::Ge) => ComparisonOp::GreaterThanOrEqual,
                Some(Token::Le) => ComparisonOp::LessThanOrEqual,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Expr::Comparison {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        if self.match_token(&Token::Bang) {
            let expr = self.parse_unary()?;
            return Ok(Expr::Not {
                expr: Box::new(expr),
            });
        }
        self.parse_chain()
    }

    fn parse_chain(&mut self) -> ParseResult<Expr> {
        let base = self.parse_primary()?;
        let mut segments = Vec::new();

        loop {
            match self.peek_token() {
                Some(Token::Dot) => {
                    self.advance();
                    let name = self.expect_ident()?;
                    segments.push(Segment::Member {
                        name,
                        null_safe: false,
                    });
                }
                Some(Token::QuestionDot) => {
                    self.advance();
                    match self.peek_token() {
                        Some(Token::LBracket) => {
                            self.advance();
                            let index = self.parse_expr()?;
                            self.expect(&Token::RBracket)?;
                            segments.push(Segment::Subscript {
                                index: Box::new(index),
                                null_safe: true,
                            });
                        }
                        Some(Token::LParen) => {
                            self.advance();
                            let args = self.parse_call_args()?;
                            segments.push(Segment::Call {
                                args,
                                null_safe: true,
                            });
                        }
                        _ => {
                            let name = self.expect_ident()?;
                            segments.push(Segment::Member {
                                name,
                                null_safe: true,
                            });
                        }
                    }
                }
                Some(Token::LBracket) => {
                    self.advance();
                    let index = self.parse_expr()?;
                    self.expect(&Token::RBracket)?;
                    segments.push(Segment::Subscript {
                        index: Box::new(index),
                        null_safe: false,
                    });
                }
                Some(Token::LParen) => {
                    self.advance();
                    let args = self.parse_call_args()?;
                    segments.push(Segment::Call {
                        args,
                        null_safe: false,
                    });
                }
                _ => break,
            }
        }

        if segments.is_empty() {
            Ok(base)
        } else {
            Ok(Expr::Access {
                base: Box::new(base),
                segments,
            })
        }
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        match self.peek_token().cloned() {
            Some(Token::Number(value)) => {
                self.advance();
                Ok(Expr::Number { value })
            }
            Some(Token::String(raw)) => {
                self.advance();
                Ok(Expr::String {
                    value: unquote(raw),
                })
            }
            Some(Token::True) => {
                self.advance();
                Ok(Expr::Boolean { value: true })
            }
            Some(Token::False) => {
                self.advance();
                Ok(Expr::Boolean { value: false })
            }
            Some(Token::Ident(name)) => {
                self.advance();
                Ok(Expr::Symbol {
                    name: name.to_string(),
                })
            }
            Some(Token::Hash) => {
                self.advance();
                self.parse_module_call()
            }
            Some(Token::LBracket) => {
                self.advance();
                self.parse_array_literal()
            }
            Some(Token::LBrace) => {
                self.advance();
                self.parse_dict_literal()
            }
            Some(Token::LParen) => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(expr)
            }
            Some(token) => Err(ParseError::unexpected_token(
                self.peek_pos(),
                "expression",
                token.to_string(),
            )),
            None => Err(ParseError::unexpected_eof(self.end)),
        }
    }

    // `#name(args)` / `#module:name(args)`; the hash is already consumed
    fn parse_module_call(&mut self) -> ParseResult<Expr> {
        let first = self.expect_ident()?;
        let (module, function) = if self.match_token(&Token::Colon) {
            (Some(first), self.expect_ident()?)
        } else {
            (None, first)
        };
        self.expect(&Token::LParen)?;
        let args = self.parse_call_args()?;
        Ok(Expr::ModuleCall {
            module,
            function,
            args,
        })
    }

    // Argument list after a consumed `(`
    fn parse_call_args(&mut self) -> ParseResult<Vec<Expr>> {
        let mut args = Vec::new();
        if self.match_token(&Token::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            if self.match_token(&Token::Comma) {
                continue;
            }
            self.expect(&Token::RParen)?;
            return Ok(args);
        }
    }

    // Array literal after a consumed `[`; possibly empty
    fn parse_array_literal(&mut self) -> ParseResult<Expr> {
        let mut items = Vec::new();
        if self.match_token(&Token::RBracket) {
            return Ok(Expr::Array { items });
        }
        loop {
            items.push(self.parse_expr()?);
            if self.match_token(&Token::Comma) {
                continue;
            }
            self.expect(&Token::RBracket)?;
            return Ok(Expr::Array { items });
        }
    }

    // Dict literal after a consumed `{`; keys are string literals
    fn parse_dict_literal(&mut self) -> ParseResult<Expr> {
        let mut entries = Vec::new();
        if self.match_token(&Token::RBrace) {
            return Ok(Expr::Dict { entries });
        }
        loop {
            let key = self.expect_string()?;
            self.expect(&Token::Colon)?;
            let value = self.parse_expr()?;
            entries.push(DictEntry { key, value });
            if self.match_token(&Token::Comma) {
                continue;
            }
            self.expect(&Token::RBrace)?;
            return Ok(Expr::Dict { entries });
        }
    }

    fn peek(&self) -> Option<&(Token<'src>, Range<usize>)> {
        self.tokens.get(self.pos)
    }

    fn peek_token(&self) -> Option<&Token<'src>> {
        self.peek().map(|(token, _)| token)
    }

    fn peek_pos(&self) -> usize {
        self.peek().map(|(_, span)| span.start).unwrap_or(self.end)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn match_token(&mut self, expected: &Token) -> bool {
        if self.peek_token() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> ParseResult<()> {
        match self.peek_token() {
            Some(token) if token == expected => {
                self.advance();
                Ok(())
            }
            Some(token) => Err(ParseError::unexpected_token(
                self.peek_pos(),
                expected.to_string(),
                token.to_string(),
            )),
            None => Err(ParseError::unexpected_eof(self.end)),
        }
    }

    fn expect_ident(&mut self) -> ParseResult<String> {
        match self.peek_token() {
            Some(Token::Ident(name)) => {
                let name = name.to_string();
                self.advance();
                Ok(name)
            }
            Some(token) => Err(ParseError::unexpected_token(
                self.peek_pos(),
                "identifier",
                token.to_string(),
            )),
            None => Err(ParseError::unexpected_eof(self.end)),
        }
    }

    fn expect_string(&mut self) -> ParseResult<String> {
        match self.peek_token() {
            Some(Token::String(raw)) => {
                let value = unquote(raw);
                self.advance();
                Ok(value)
            }
            Some(token) => Err(ParseError::unexpected_token(
                self.peek_pos(),
                "string literal",
                token.to_string(),
            )),
            None => Err(ParseError::unexpected_eof(self.end)),
        }
    }

    fn expect_end(&mut self) -> ParseResult<()> {
        match self.peek() {
            None => Ok(()),
            Some((token, span)) => Err(ParseError::unexpected_token(
                span.start,
                "end of input",
                token.to_string(),
            )),
        }
    }
}

// Strip the surrounding quotes and process backslash escapes.
fn unquote(raw: &str) -> String {
    let inner = &raw[1..raw.len() - 1];
    if !inner.contains('\\') {
        return inner.to_string();
    }
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
