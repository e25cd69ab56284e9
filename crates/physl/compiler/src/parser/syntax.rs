// PhySL
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Precedence-climbing parser from tokens to expressions

use super::error::{ParseError, ParseErrorKind, ParseResult};
use super::token::{Delimiter, Operator, Token, TokenType};
use crate::ast::{BinaryOp, Expression, Identifier, Literal, UnaryOp};

/// Deepest nesting accepted before parsing gives up
const MAX_NESTING: usize = 256;

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    depth: usize,
}

fn binary_op(token: &TokenType) -> Option<BinaryOp> {
    let TokenType::Operator(op) = token else {
        return None;
    };
    Some(match op {
        Operator::OrOr => BinaryOp::Or,
        Operator::AndAnd => BinaryOp::And,
        Operator::EqualEqual => BinaryOp::Eq,
        Operator::BangEqual => BinaryOp::Ne,
        Operator::Less => BinaryOp::Lt,
        Operator::LessEqual => BinaryOp::Le,
        Operator::Greater => BinaryOp::Gt,
        Operator::GreaterEqual => BinaryOp::Ge,
        Operator::Plus => BinaryOp::Add,
        Operator::Minus => BinaryOp::Sub,
        Operator::Star => BinaryOp::Mul,
        Operator::Slash => BinaryOp::Div,
        Operator::Percent => BinaryOp::Mod,
        Operator::Bang => return None,
    })
}

impl Parser {
    /// `tokens` must end with `Eof`, as produced by the lexer
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, current: 0, depth: 0 }
    }

    /// Top-level expressions, optionally separated by commas
    pub fn parse_program(&mut self) -> ParseResult<Vec<Expression>> {
        let mut expressions = Vec::new();
        while !self.peek().is_eof() {
            expressions.push(self.parse_expression()?);
            self.eat(&TokenType::Delimiter(Delimiter::Comma));
        }
        Ok(expressions)
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !token.is_eof() {
            self.current += 1;
        }
        token
    }

    fn eat(&mut self, token_type: &TokenType) -> bool {
        if self.peek().is_type(token_type) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.peek();
        match &token.token_type {
            TokenType::Eof => ParseError::unexpected_eof(token.position, expected),
            TokenType::Delimiter(Delimiter::RightParen | Delimiter::RightBracket) => {
                ParseError::new(ParseErrorKind::UnbalancedDelimiter, token.position, format!("unmatched '{}'", token.lexeme))
            }
            _ => ParseError::unexpected_token(token.position, &token.lexeme, Some(expected)),
        }
    }

    fn enter(&mut self) -> ParseResult<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(ParseError::new(
                ParseErrorKind::RecursionLimitExceeded,
                self.peek().position,
                format!("expressions nested deeper than {}", MAX_NESTING),
            ));
        }
        Ok(())
    }

    pub fn parse_expression(&mut self) -> ParseResult<Expression> {
        self.enter()?;
        let result = self.parse_binary(1);
        self.depth -= 1;
        result
    }

    fn parse_binary(&mut self, min_precedence: u8) -> ParseResult<Expression> {
        let mut lhs = self.parse_unary()?;
        while let Some(op) = binary_op(&self.peek().token_type) {
            if op.precedence() < min_precedence {
                break;
            }
            let position = Some(self.advance().position);
            let rhs = self.parse_binary(op.precedence() + 1)?;
            lhs = Expression::Operation {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                position,
            };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> ParseResult<Expression> {
        let op = match self.peek().token_type {
            TokenType::Operator(Operator::Minus) => UnaryOp::Neg,
            TokenType::Operator(Operator::Bang) => UnaryOp::Not,
            _ => return self.parse_primary(),
        };
        let position = Some(self.advance().position);
        self.enter()?;
        let operand = self.parse_unary();
        self.depth -= 1;
        Ok(Expression::Unary {
            op,
            operand: Box::new(operand?),
            position,
        })
    }

    fn parse_primary(&mut self) -> ParseResult<Expression> {
        let token = self.peek().clone();
        let position = token.position;
        let expression = match token.token_type {
            TokenType::IntegerLiteral(i) => Expression::Literal(Literal::Int(i)),
            TokenType::FloatLiteral(x) => Expression::Literal(Literal::Float(x)),
            TokenType::StringLiteral(s) => Expression::Literal(Literal::Str(s)),
            TokenType::BooleanLiteral(b) => Expression::Literal(Literal::Bool(b)),
            TokenType::Nil => Expression::Literal(Literal::Nil),
            TokenType::Identifier(name) => {
                self.advance();
                let function = Identifier::new(name, Some(position));
                if self.eat(&TokenType::Delimiter(Delimiter::LeftParen)) {
                    let args = self.parse_sequence(Delimiter::RightParen, position)?;
                    return Ok(Expression::Call { function, args });
                }
                return Ok(Expression::Identifier(function));
            }
            TokenType::Delimiter(Delimiter::LeftParen) => {
                self.advance();
                let inner = self.parse_expression()?;
                if !self.eat(&TokenType::Delimiter(Delimiter::RightParen)) {
                    return Err(self.unclosed(Delimiter::LeftParen, position));
                }
                return Ok(inner);
            }
            TokenType::Delimiter(Delimiter::LeftBracket) => {
                self.advance();
                let items = self.parse_sequence(Delimiter::RightBracket, position)?;
                return Ok(Expression::List { items, position: Some(position) });
            }
            _ => return Err(self.unexpected("an expression")),
        };
        self.advance();
        Ok(expression)
    }

    fn unclosed(&self, open: Delimiter, position: super::Position) -> ParseError {
        match self.peek().token_type {
            TokenType::Eof => ParseError::new(ParseErrorKind::UnbalancedDelimiter, position, format!("unclosed '{}'", open)),
            _ => self.unexpected(&format!("'{}'", open.closing().unwrap_or(open))),
        }
    }

    /// Comma-separated expressions up to `close`; the opener is already consumed
    fn parse_sequence(&mut self, close: Delimiter, open_position: super::Position) -> ParseResult<Vec<Expression>> {
        let open = match close {
            Delimiter::RightBracket => Delimiter::LeftBracket,
            _ => Delimiter::LeftParen,
        };
        let mut items = Vec::new();
        if self.eat(&TokenType::Delimiter(close)) {
            return Ok(items);
        }
        loop {
            if self.peek().is_eof() {
                return Err(self.unclosed(open, open_position));
            }
            items.push(self.parse_expression()?);
            if self.eat(&TokenType::Delimiter(close)) {
                return Ok(items);
            }
            if !self.eat(&TokenType::Delimiter(Delimiter::Comma)) {
                return Err(self.unclosed(open, open_position));
            }
        }
    }
}
