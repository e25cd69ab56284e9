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

//! Expression trees produced by the parser.
//!
//! Positions are provenance only: two expressions that differ just in where
//! they were parsed compare equal. `Display` prints the canonical source form
//! with the minimal parentheses needed to parse back to the same tree.

use crate::parser::Position;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identifier {
    pub name: String,
    pub position: Option<Position>,
}

impl Identifier {
    pub fn new(name: impl Into<String>, position: Option<Position>) -> Self {
        Self { name: name.into(), position }
    }
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Nil => f.write_str("nil"),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Int(i) => write!(f, "{}", i),
            // Debug keeps a decimal point or exponent, so the text lexes as a float again
            Literal::Float(x) => write!(f, "{:?}", x),
            Literal::Str(s) => {
                f.write_str("\"")?;
                for c in s.chars() {
                    match c {
                        '\n' => f.write_str("\\n")?,
                        '\r' => f.write_str("\\r")?,
                        '\t' => f.write_str("\\t")?,
                        '\\' => f.write_str("\\\\")?,
                        '"' => f.write_str("\\\"")?,
                        c => write!(f, "{}", c)?,
                    }
                }
                f.write_str("\"")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
        }
    }

    /// Binding strength; all binary operators are left-associative
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Eq | BinaryOp::Ne => 3,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => 4,
            BinaryOp::Add | BinaryOp::Sub => 5,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expression {
    Identifier(Identifier),
    Literal(Literal),
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
        position: Option<Position>,
    },
    Operation {
        op: BinaryOp,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
        position: Option<Position>,
    },
    Call {
        function: Identifier,
        args: Vec<Expression>,
    },
    List {
        items: Vec<Expression>,
        position: Option<Position>,
    },
}

impl Expression {
    pub fn identifier(name: impl Into<String>) -> Self {
        Expression::Identifier(Identifier::new(name, None))
    }

    pub fn call(name: impl Into<String>, args: Vec<Expression>) -> Self {
        Expression::Call {
            function: Identifier::new(name, None),
            args,
        }
    }

    pub fn binary(op: BinaryOp, lhs: Expression, rhs: Expression) -> Self {
        Expression::Operation {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            position: None,
        }
    }

    /// Where the expression starts in the source, if known
    pub fn position(&self) -> Option<Position> {
        match self {
            Expression::Identifier(id) => id.position,
            Expression::Literal(_) => None,
            Expression::Unary { position, .. } | Expression::List { position, .. } => *position,
            Expression::Operation { position, lhs, .. } => position.or_else(|| lhs.position()),
            Expression::Call { function, .. } => function.position,
        }
    }

    pub fn as_identifier(&self) -> Option<&Identifier> {
        match self {
            Expression::Identifier(id) => Some(id),
            _ => None,
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Expression::Operation { op, .. } => op.precedence(),
            Expression::Unary { .. } => 7,
            _ => 8,
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, parenthesize: bool) -> fmt::Result {
        if parenthesize {
            write!(f, "({})", self)
        } else {
            write!(f, "{}", self)
        }
    }
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Expression::Identifier(a), Expression::Identifier(b)) => a == b,
            (Expression::Literal(a), Expression::Literal(b)) => a == b,
            (Expression::Unary { op: a, operand: x, .. }, Expression::Unary { op: b, operand: y, .. }) => a == b && x == y,
            (Expression::Operation { op: a, lhs: l1, rhs: r1, .. }, Expression::Operation { op: b, lhs: l2, rhs: r2, .. }) => a == b && l1 == l2 && r1 == r2,
            (Expression::Call { function: f1, args: a1 }, Expression::Call { function: f2, args: a2 }) => f1 == f2 && a1 == a2,
            (Expression::List { items: a, .. }, Expression::List { items: b, .. }) => a == b,
            _ => false,
        }
    }
}

fn fmt_list(f: &mut fmt::Formatter<'_>, items: &[Expression]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Identifier(id) => f.write_str(&id.name),
            Expression::Literal(literal) => write!(f, "{}", literal),
            Expression::Unary { op, operand, .. } => {
                f.write_str(op.symbol())?;
                operand.fmt_operand(f, operand.precedence() < 7)
            }
            Expression::Operation { op, lhs, rhs, .. } => {
                let precedence = op.precedence();
                lhs.fmt_operand(f, lhs.precedence() < precedence)?;
                write!(f, " {} ", op.symbol())?;
                rhs.fmt_operand(f, rhs.precedence() <= precedence)
            }
            Expression::Call { function, args } => {
                write!(f, "{}(", function.name)?;
                fmt_list(f, args)?;
                f.write_str(")")
            }
            Expression::List { items, .. } => {
                f.write_str("[")?;
                fmt_list(f, items)?;
                f.write_str("]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_parentheses() {
        let sum = Expression::binary(BinaryOp::Add, Expression::identifier("a"), Expression::identifier("b"));
        let product = Expression::binary(BinaryOp::Mul, sum.clone(), Expression::identifier("c"));
        assert_eq!(product.to_string(), "(a + b) * c");

        let nested = Expression::binary(BinaryOp::Sub, Expression::identifier("a"), sum);
        assert_eq!(nested.to_string(), "a - (a + b)");

        let call = Expression::call("f", vec![Expression::Literal(Literal::Float(1.0)), Expression::Literal(Literal::Str("x\"y".into()))]);
        assert_eq!(call.to_string(), "f(1.0, \"x\\\"y\")");
    }

    #[test]
    fn test_positions_do_not_affect_equality() {
        let a = Expression::Identifier(Identifier::new("x", Some(Position::new(1, 1))));
        let b = Expression::Identifier(Identifier::new("x", Some(Position::new(9, 9))));
        assert_eq!(a, b);
    }
}
