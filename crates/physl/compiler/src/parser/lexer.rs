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

//! PhySL lexical analyzer (tokenizer)

use super::error::{ParseError, ParseErrorKind, ParseResult};
use super::position::Position;
use super::token::{Delimiter, Operator, Token, TokenType};

pub struct Lexer {
    chars: Vec<char>,
    offset: usize,
    position: Position,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            offset: 0,
            position: Position::start(),
        }
    }

    /// Tokenize the entire input; the last token is always `Eof`
    pub fn tokenize(mut self) -> ParseResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = token.is_eof();
            tokens.push(token);
            if is_eof {
                return Ok(tokens);
            }
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.offset).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.offset + 1).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.offset += 1;
        self.position.advance(ch);
        Some(ch)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Skip whitespace and `//` line comments
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') if self.peek_next() == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => return,
            }
        }
    }

    fn lexeme(&self, start: usize) -> String {
        self.chars[start..self.offset].iter().collect()
    }

    fn make_token(&self, token_type: TokenType, start: usize, start_pos: Position) -> Token {
        Token::new(token_type, self.lexeme(start), start_pos)
    }

    fn next_token(&mut self) -> ParseResult<Token> {
        self.skip_trivia();
        let start = self.offset;
        let start_pos = self.position;

        let Some(ch) = self.bump() else {
            return Ok(Token::new(TokenType::Eof, "", start_pos));
        };

        let token_type = match ch {
            '(' => TokenType::Delimiter(Delimiter::LeftParen),
            ')' => TokenType::Delimiter(Delimiter::RightParen),
            '[' => TokenType::Delimiter(Delimiter::LeftBracket),
            ']' => TokenType::Delimiter(Delimiter::RightBracket),
            ',' => TokenType::Delimiter(Delimiter::Comma),

            '+' => TokenType::Operator(Operator::Plus),
            '-' => TokenType::Operator(Operator::Minus),
            '*' => TokenType::Operator(Operator::Star),
            '/' => TokenType::Operator(Operator::Slash),
            '%' => TokenType::Operator(Operator::Percent),
            '<' if self.eat('=') => TokenType::Operator(Operator::LessEqual),
            '<' => TokenType::Operator(Operator::Less),
            '>' if self.eat('=') => TokenType::Operator(Operator::GreaterEqual),
            '>' => TokenType::Operator(Operator::Greater),
            '=' if self.eat('=') => TokenType::Operator(Operator::EqualEqual),
            '!' if self.eat('=') => TokenType::Operator(Operator::BangEqual),
            '!' => TokenType::Operator(Operator::Bang),
            '&' if self.eat('&') => TokenType::Operator(Operator::AndAnd),
            '|' if self.eat('|') => TokenType::Operator(Operator::OrOr),

            '"' => return self.scan_string(start, start_pos),
            c if c.is_ascii_digit() => return self.scan_number(start, start_pos),
            c if c.is_alphabetic() || c == '_' => return Ok(self.scan_identifier(start, start_pos)),

            other => {
                return Err(ParseError::new(ParseErrorKind::InvalidCharacter, start_pos, format!("invalid character '{}'", other)));
            }
        };
        Ok(self.make_token(token_type, start, start_pos))
    }

    fn scan_identifier(&mut self, start: usize, start_pos: Position) -> Token {
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.bump();
            } else {
                break;
            }
        }
        let token_type = match self.lexeme(start).as_str() {
            "true" => TokenType::BooleanLiteral(true),
            "false" => TokenType::BooleanLiteral(false),
            "nil" => TokenType::Nil,
            name => TokenType::Identifier(name.to_string()),
        };
        self.make_token(token_type, start, start_pos)
    }

    fn scan_digits(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
    }

    fn scan_number(&mut self, start: usize, start_pos: Position) -> ParseResult<Token> {
        self.scan_digits();
        let mut is_float = false;

        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.bump();
            self.scan_digits();
        }

        if matches!(self.peek(), Some('e' | 'E')) {
            is_float = true;
            self.bump();
            if matches!(self.peek(), Some('+' | '-')) {
                self.bump();
            }
            if !self.peek().is_some_and(|c| c.is_ascii_digit()) {
                return Err(ParseError::new(ParseErrorKind::InvalidNumber, start_pos, format!("missing exponent digits in '{}'", self.lexeme(start))));
            }
            self.scan_digits();
        }

        let text = self.lexeme(start);
        let token_type = if is_float {
            text.parse::<f64>().map(TokenType::FloatLiteral).ok()
        } else {
            text.parse::<i64>().map(TokenType::IntegerLiteral).ok()
        }
        .ok_or_else(|| ParseError::new(ParseErrorKind::InvalidNumber, start_pos, format!("invalid number '{}'", text)))?;
        Ok(self.make_token(token_type, start, start_pos))
    }

    fn scan_string(&mut self, start: usize, start_pos: Position) -> ParseResult<Token> {
        let mut value = String::new();
        loop {
            let escape_pos = self.position;
            match self.bump() {
                None => return Err(ParseError::new(ParseErrorKind::UnterminatedString, start_pos, "string literal is not terminated")),
                Some('"') => break,
                Some('\\') => {
                    let escaped = match self.bump() {
                        Some('n') => '\n',
                        Some('r') => '\r',
                        Some('t') => '\t',
                        Some('\\') => '\\',
                        Some('"') => '"',
                        Some(other) => {
                            return Err(ParseError::new(ParseErrorKind::InvalidEscapeSequence, escape_pos, format!("unknown escape sequence '\\{}'", other)));
                        }
                        None => return Err(ParseError::new(ParseErrorKind::UnterminatedString, start_pos, "string literal is not terminated")),
                    };
                    value.push(escaped);
                }
                Some(c) => value.push(c),
            }
        }
        Ok(self.make_token(TokenType::StringLiteral(value), start, start_pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(source: &str) -> Vec<TokenType> {
        Lexer::new(source).tokenize().unwrap().into_iter().map(|t| t.token_type).collect()
    }

    #[test]
    fn test_operators_and_delimiters() {
        assert_eq!(
            types("a<=b != !c"),
            vec![
                TokenType::Identifier("a".into()),
                TokenType::Operator(Operator::LessEqual),
                TokenType::Identifier("b".into()),
                TokenType::Operator(Operator::BangEqual),
                TokenType::Operator(Operator::Bang),
                TokenType::Identifier("c".into()),
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(types("42")[0], TokenType::IntegerLiteral(42));
        assert_eq!(types("1.5")[0], TokenType::FloatLiteral(1.5));
        assert_eq!(types("2e3")[0], TokenType::FloatLiteral(2000.0));
        assert_eq!(types("1.5E-1")[0], TokenType::FloatLiteral(0.15));
        assert_eq!(Lexer::new("1e").tokenize().unwrap_err().kind, ParseErrorKind::InvalidNumber);
        assert_eq!(Lexer::new("99999999999999999999").tokenize().unwrap_err().kind, ParseErrorKind::InvalidNumber);
    }

    #[test]
    fn test_strings_and_keywords() {
        assert_eq!(types(r#""a\n\"b\"""#)[0], TokenType::StringLiteral("a\n\"b\"".into()));
        assert_eq!(types("true false nil")[..3], [TokenType::BooleanLiteral(true), TokenType::BooleanLiteral(false), TokenType::Nil]);
        assert_eq!(Lexer::new("\"open").tokenize().unwrap_err().kind, ParseErrorKind::UnterminatedString);
        assert_eq!(Lexer::new(r#""\q""#).tokenize().unwrap_err().kind, ParseErrorKind::InvalidEscapeSequence);
    }

    #[test]
    fn test_comments_and_positions() {
        let tokens = Lexer::new("// header\n  x // trailing\ny").tokenize().unwrap();
        assert_eq!(tokens[0].position, Position::new(2, 3));
        assert_eq!(tokens[1].position, Position::new(3, 1));
        assert_eq!(tokens.len(), 3);
    }

    #[test]
    fn test_invalid_character() {
        let error = Lexer::new("a # b").tokenize().unwrap_err();
        assert_eq!(error.kind, ParseErrorKind::InvalidCharacter);
        assert_eq!(error.position, Position::new(1, 3));
    }
}
