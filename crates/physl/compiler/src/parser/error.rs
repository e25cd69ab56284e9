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

//! Parser error types

use super::Position;
use std::fmt;
use thiserror::Error;

/// Result type for parsing operations
pub type ParseResult<T> = Result<T, ParseError>;

/// Error raised while tokenizing or parsing source text
#[derive(Error, Debug, Clone, PartialEq)]
pub struct ParseError {
    /// The kind of error
    pub kind: ParseErrorKind,
    /// Position where the error occurred
    pub position: Position,
    /// Human-readable error message
    pub message: String,
    /// Codename of the source, when known
    pub codename: Option<String>,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, position: Position, message: impl Into<String>) -> Self {
        Self {
            kind,
            position,
            message: message.into(),
            codename: None,
        }
    }

    pub fn with_codename(mut self, codename: impl Into<String>) -> Self {
        self.codename = Some(codename.into());
        self
    }

    /// Message with kind and location, e.g. for terminal output
    pub fn user_message(&self) -> String {
        match &self.codename {
            Some(codename) => format!("{}({}): {}: {}", codename, self.position, self.kind.description(), self.message),
            None => format!("{} at line {}, column {}: {}", self.kind.description(), self.position.line, self.position.column, self.message),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

/// Categories of parse errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    #[error("Unexpected token")]
    UnexpectedToken,

    #[error("Unexpected end of file")]
    UnexpectedEof,

    #[error("Invalid character")]
    InvalidCharacter,

    #[error("Invalid number")]
    InvalidNumber,

    #[error("Invalid escape sequence")]
    InvalidEscapeSequence,

    #[error("Unterminated string")]
    UnterminatedString,

    /// Closing delimiter without a matching opener, or the other way round
    #[error("Unbalanced delimiter")]
    UnbalancedDelimiter,

    #[error("Recursion limit exceeded")]
    RecursionLimitExceeded,
}

impl ParseErrorKind {
    /// Short error code for this kind, stable across releases
    pub fn code(&self) -> &'static str {
        match self {
            ParseErrorKind::UnexpectedToken => "S001",
            ParseErrorKind::UnexpectedEof => "S002",
            ParseErrorKind::InvalidCharacter => "S003",
            ParseErrorKind::InvalidNumber => "S004",
            ParseErrorKind::InvalidEscapeSequence => "S005",
            ParseErrorKind::UnterminatedString => "S006",
            ParseErrorKind::UnbalancedDelimiter => "S007",
            ParseErrorKind::RecursionLimitExceeded => "S008",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ParseErrorKind::UnexpectedToken => "Unexpected token",
            ParseErrorKind::UnexpectedEof => "Unexpected end of file",
            ParseErrorKind::InvalidCharacter => "Invalid character",
            ParseErrorKind::InvalidNumber => "Invalid number format",
            ParseErrorKind::InvalidEscapeSequence => "Invalid escape sequence",
            ParseErrorKind::UnterminatedString => "Unterminated string literal",
            ParseErrorKind::UnbalancedDelimiter => "Unbalanced delimiter",
            ParseErrorKind::RecursionLimitExceeded => "Recursion limit exceeded",
        }
    }
}

/// Helper constructors for common errors
impl ParseError {
    pub fn unexpected_token(position: Position, found: &str, expected: Option<&str>) -> Self {
        let message = match expected {
            Some(expected) => format!("found '{}', expected {}", found, expected),
            None => format!("unexpected token '{}'", found),
        };
        Self::new(ParseErrorKind::UnexpectedToken, position, message)
    }

    pub fn unexpected_eof(position: Position, expected: &str) -> Self {
        Self::new(ParseErrorKind::UnexpectedEof, position, format!("unexpected end of input, expected {}", expected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(ParseErrorKind::UnexpectedToken.code(), "S001");
        assert_eq!(ParseErrorKind::RecursionLimitExceeded.code(), "S008");
        let error = ParseError::new(ParseErrorKind::RecursionLimitExceeded, Position::start(), "deep");
        assert_eq!(error.kind.description(), "Recursion limit exceeded");
    }

    #[test]
    fn test_messages() {
        let error = ParseError::unexpected_token(Position::new(2, 7), ")", Some("an expression"));
        assert_eq!(error.to_string(), "Unexpected token at line 2, column 7: found ')', expected an expression");

        let error = error.with_codename("test.physl");
        assert_eq!(error.to_string(), "test.physl(2:7): Unexpected token: found ')', expected an expression");
    }
}
