// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Pratt parser for expressions.

use super::lexer::{Token, TokenStream};
use super::{BinaryOp, Expr, Literal, UnaryOp};
use crate::errors::ParseError;

/// Precedence of unary operators; binds tighter than every binary operator.
const PREFIX_PRECEDENCE: u8 = 60;

/// Binary operator precedence and operator; higher binds tighter, all left-associative.
fn binary_op_info(token: &Token) -> Option<(u8, BinaryOp)> {
    match token {
        Token::OrOr => Some((10, BinaryOp::Or)),
        Token::AndAnd => Some((20, BinaryOp::And)),
        Token::EqEq => Some((30, BinaryOp::Eq)),
        Token::BangEq => Some((30, BinaryOp::Ne)),
        Token::Lt => Some((30, BinaryOp::Lt)),
        Token::LtEq => Some((30, BinaryOp::Le)),
        Token::Gt => Some((30, BinaryOp::Gt)),
        Token::GtEq => Some((30, BinaryOp::Ge)),
        Token::Plus => Some((40, BinaryOp::Add)),
        Token::Minus => Some((40, BinaryOp::Sub)),
        Token::Star => Some((50, BinaryOp::Mul)),
        Token::Slash => Some((50, BinaryOp::Div)),
        Token::Percent => Some((50, BinaryOp::Rem)),
        _ => None,
    }
}

/// Parse a complete expression.
pub fn parse_expr(source: &str) -> Result<Expr, ParseError> {
    let mut stream = TokenStream::new(source)?;
    if stream.is_at_end() {
        return Err(ParseError::new(0, "empty expression"));
    }
    let expr = parse_pratt(&mut stream, 0)?;
    stream.expect_end()?;
    Ok(expr)
}

fn parse_pratt(stream: &mut TokenStream, min_prec: u8) -> Result<Expr, ParseError> {
    let mut left = parse_prefix(stream)?;

    while let Some((prec, op)) = stream.peek().and_then(binary_op_info) {
        if prec < min_prec {
            break;
        }
        stream.advance();
        let right = parse_pratt(stream, prec + 1)?;
        left = Expr::Binary {
            op,
            lhs: Box::new(left),
            rhs: Box::new(right),
        };
    }

    Ok(left)
}

fn parse_prefix(stream: &mut TokenStream) -> Result<Expr, ParseError> {
    let op = match stream.peek() {
        Some(Token::Bang) => UnaryOp::Not,
        Some(Token::Minus) => UnaryOp::Neg,
        Some(Token::Pipe) | Some(Token::OrOr) => return parse_closure(stream),
        _ => return parse_postfix(stream),
    };
    stream.advance();
    let operand = parse_pratt(stream, PREFIX_PRECEDENCE)?;
    Ok(Expr::Unary {
        op,
        expr: Box::new(operand),
    })
}

fn parse_postfix(stream: &mut TokenStream) -> Result<Expr, ParseError> {
    let mut expr = parse_atom(stream)?;

    loop {
        let optional = match stream.peek() {
            Some(Token::Dot) => false,
            Some(Token::OptDot) => true,
            _ => return Ok(expr),
        };
        stream.advance();
        let name = stream.expect_ident()?;
        if stream.peek() == Some(&Token::LParen) {
            let args = parse_call_args(stream)?;
            expr = Expr::MethodCall {
                receiver: Box::new(expr),
                method: name,
                args,
                optional,
            };
        } else {
            expr = Expr::Field {
                base: Box::new(expr),
                name,
                optional,
            };
        }
    }
}

fn parse_call_args(stream: &mut TokenStream) -> Result<Vec<Expr>, ParseError> {
    stream.expect(&Token::LParen)?;
    parse_sequence(stream, &Token::RParen)
}

/// Comma-separated expressions up to `close`, allowing a trailing comma.
fn parse_sequence(stream: &mut TokenStream, close: &Token) -> Result<Vec<Expr>, ParseError> {
    let mut items = Vec::new();
    loop {
        if stream.eat(close) {
            return Ok(items);
        }
        items.push(parse_pratt(stream, 0)?);
        if !stream.eat(&Token::Comma) {
            stream.expect(close)?;
            return Ok(items);
        }
    }
}

fn parse_atom(stream: &mut TokenStream) -> Result<Expr, ParseError> {
    let offset = stream.offset();
    match stream.advance() {
        Some(Token::Int(n)) => Ok(Expr::Lit(Literal::Int(n))),
        Some(Token::Float(x)) => Ok(Expr::Lit(Literal::Float(x))),
        Some(Token::Str(s)) => Ok(Expr::Lit(Literal::Str(s))),
        Some(Token::LParen) => {
            let inner = parse_pratt(stream, 0)?;
            stream.expect(&Token::RParen)?;
            Ok(inner)
        }
        Some(Token::LBracket) => Ok(Expr::List(parse_sequence(stream, &Token::RBracket)?)),
        Some(Token::Ident(word)) => parse_named(stream, word),
        Some(token) => Err(ParseError::new(
            offset,
            format!("expected an expression, found '{}'", token),
        )),
        None => Err(ParseError::new(offset, "expected an expression, found end of input")),
    }
}

fn parse_named(stream: &mut TokenStream, first: String) -> Result<Expr, ParseError> {
    match first.as_str() {
        "true" => return Ok(Expr::Lit(Literal::Bool(true))),
        "false" => return Ok(Expr::Lit(Literal::Bool(false))),
        "None" => return Ok(Expr::Lit(Literal::None)),
        "self" => return Ok(Expr::SelfValue),
        _ => {}
    }

    let mut segments = vec![first];
    while stream.eat(&Token::PathSep) {
        segments.push(stream.expect_ident()?);
    }

    match stream.peek() {
        Some(Token::LParen) => {
            let args = parse_call_args(stream)?;
            Ok(Expr::Call {
                callee: segments,
                args,
            })
        }
        Some(Token::LBrace) => {
            stream.advance();
            let mut fields = Vec::new();
            loop {
                if stream.eat(&Token::RBrace) {
                    break;
                }
                let name = stream.expect_ident()?;
                let value = if stream.eat(&Token::Colon) {
                    parse_pratt(stream, 0)?
                } else {
                    Expr::Ident(name.clone())
                };
                fields.push((name, value));
                if !stream.eat(&Token::Comma) {
                    stream.expect(&Token::RBrace)?;
                    break;
                }
            }
            Ok(Expr::StructLit {
                path: segments,
                fields,
            })
        }
        _ if segments.len() == 1 => Ok(Expr::Ident(segments.remove(0))),
        _ => Ok(Expr::Path(segments)),
    }
}

fn parse_closure(stream: &mut TokenStream) -> Result<Expr, ParseError> {
    let start = stream.offset();
    let mut params = Vec::new();
    if !stream.eat(&Token::OrOr) {
        stream.expect(&Token::Pipe)?;
        loop {
            if stream.eat(&Token::Pipe) {
                break;
            }
            params.push(stream.expect_ident()?);
            if !stream.eat(&Token::Comma) {
                stream.expect(&Token::Pipe)?;
                break;
            }
        }
    }
    let body = parse_pratt(stream, 0)?;
    let source = stream.source()[start..stream.last_end()].to_string();
    Ok(Expr::Closure {
        params,
        body: Box::new(body),
        source,
    })
}
