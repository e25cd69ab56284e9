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

//! Source text to expression trees.
//!
//! Tokenizing and parsing are pure: the same source always produces the same
//! expressions, or the same [`ParseError`].

pub mod error;
pub mod lexer;
pub mod position;
pub mod syntax;
pub mod token;

pub use error::{ParseError, ParseErrorKind, ParseResult};
pub use lexer::Lexer;
pub use position::Position;
pub use syntax::Parser;
pub use token::{Delimiter, Operator, Token, TokenType};

use crate::ast::Expression;
use tracing::debug;

/// Parse a whole program into its top-level expressions
pub fn generate_ast(source: &str) -> ParseResult<Vec<Expression>> {
    let tokens = Lexer::new(source).tokenize()?;
    debug!("tokenized {} tokens", tokens.len());
    Parser::new(tokens).parse_program()
}

/// Parse source that must contain exactly one expression
pub fn parse_expression(source: &str) -> ParseResult<Expression> {
    let mut expressions = generate_ast(source)?;
    match expressions.len() {
        1 => Ok(expressions.remove(0)),
        0 => Err(ParseError::unexpected_eof(Position::start(), "an expression")),
        _ => Err(ParseError::new(
            ParseErrorKind::UnexpectedToken,
            expressions[1].position().unwrap_or_else(Position::unknown),
            "expected a single expression",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOp, Literal, UnaryOp};
    use test_case::test_case;

    #[test]
    fn test_precedence() {
        let expr = parse_expression("1 + 2 * 3 < 10 && !x || y").unwrap();
        assert_eq!(expr.to_string(), "1 + 2 * 3 < 10 && !x || y");
        let Expression::Operation { op: BinaryOp::Or, lhs, .. } = &expr else {
            panic!("expected ||, got {:?}", expr);
        };
        assert!(matches!(**lhs, Expression::Operation { op: BinaryOp::And, .. }));
    }

    #[test]
    fn test_left_associative() {
        let expr = parse_expression("a - b - c").unwrap();
        let Expression::Operation { lhs, .. } = &expr else {
            panic!("expected an operation");
        };
        assert_eq!(lhs.to_string(), "a - b");
        assert_eq!(parse_expression("a - (b - c)").unwrap().to_string(), "a - (b - c)");
    }

    #[test]
    fn test_calls_lists_and_unary() {
        let expr = parse_expression("f(1, [2.5, \"s\"], -x)").unwrap();
        let Expression::Call { function, args } = &expr else {
            panic!("expected a call");
        };
        assert_eq!(function.name, "f");
        assert_eq!(function.position, Some(Position::new(1, 1)));
        assert_eq!(args[0], Expression::Literal(Literal::Int(1)));
        assert!(matches!(args[1], Expression::List { ref items, .. } if items.len() == 2));
        assert!(matches!(args[2], Expression::Unary { op: UnaryOp::Neg, .. }));
    }

    #[test]
    fn test_program_separators() {
        assert_eq!(generate_ast("a, b c // done").unwrap().len(), 3);
        assert!(generate_ast("").unwrap().is_empty());
    }

    #[test_case("f(1, 2" , ParseErrorKind::UnbalancedDelimiter ; "unclosed call")]
    #[test_case("(1 + 2", ParseErrorKind::UnbalancedDelimiter ; "unclosed paren")]
    #[test_case("1 + 2)", ParseErrorKind::UnbalancedDelimiter ; "unmatched close")]
    #[test_case("f(1 2)", ParseErrorKind::UnexpectedToken ; "missing comma")]
    #[test_case("1 +", ParseErrorKind::UnexpectedEof ; "dangling operator")]
    #[test_case("a $ b", ParseErrorKind::InvalidCharacter ; "invalid token")]
    fn test_malformed(source: &str, kind: ParseErrorKind) {
        assert_eq!(generate_ast(source).unwrap_err().kind, kind);
    }

    #[test]
    fn test_nesting_limit() {
        let source = format!("{}1{}", "(".repeat(300), ")".repeat(300));
        assert_eq!(generate_ast(&source).unwrap_err().kind, ParseErrorKind::RecursionLimitExceeded);
    }
}
