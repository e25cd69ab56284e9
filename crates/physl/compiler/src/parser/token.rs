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

//! Token definitions for PhySL source

use super::position::Position;
use std::fmt;

/// A token in the source code
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    /// The source text that produced this token
    pub lexeme: String,
    /// Where the token starts
    pub position: Position,
}

impl Token {
    pub fn new(token_type: TokenType, lexeme: impl Into<String>, position: Position) -> Self {
        Self {
            token_type,
            lexeme: lexeme.into(),
            position,
        }
    }

    pub fn is_type(&self, token_type: &TokenType) -> bool {
        &self.token_type == token_type
    }

    pub fn is_eof(&self) -> bool {
        matches!(self.token_type, TokenType::Eof)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.token_type, self.lexeme)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenType {
    IntegerLiteral(i64),
    FloatLiteral(f64),
    StringLiteral(String),
    BooleanLiteral(bool),
    Nil,

    Identifier(String),

    Operator(Operator),
    Delimiter(Delimiter),

    Eof,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenType::IntegerLiteral(_) => write!(f, "integer"),
            TokenType::FloatLiteral(_) => write!(f, "float"),
            TokenType::StringLiteral(_) => write!(f, "string"),
            TokenType::BooleanLiteral(_) => write!(f, "boolean"),
            TokenType::Nil => write!(f, "nil"),
            TokenType::Identifier(_) => write!(f, "identifier"),
            TokenType::Operator(op) => write!(f, "operator '{}'", op),
            TokenType::Delimiter(delim) => write!(f, "delimiter '{}'", delim),
            TokenType::Eof => write!(f, "end of file"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    EqualEqual,
    BangEqual,
    AndAnd,
    OrOr,
    Bang,
}

impl Operator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Plus => "+",
            Operator::Minus => "-",
            Operator::Star => "*",
            Operator::Slash => "/",
            Operator::Percent => "%",
            Operator::Less => "<",
            Operator::LessEqual => "<=",
            Operator::Greater => ">",
            Operator::GreaterEqual => ">=",
            Operator::EqualEqual => "==",
            Operator::BangEqual => "!=",
            Operator::AndAnd => "&&",
            Operator::OrOr => "||",
            Operator::Bang => "!",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Delimiter {
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Comma,
}

impl Delimiter {
    /// Closing counterpart of an opening delimiter
    pub fn closing(&self) -> Option<Delimiter> {
        match self {
            Delimiter::LeftParen => Some(Delimiter::RightParen),
            Delimiter::LeftBracket => Some(Delimiter::RightBracket),
            _ => None,
        }
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Delimiter::LeftParen => "(",
            Delimiter::RightParen => ")",
            Delimiter::LeftBracket => "[",
            Delimiter::RightBracket => "]",
            Delimiter::Comma => ",",
        };
        f.write_str(symbol)
    }
}
