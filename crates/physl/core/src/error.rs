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

//! Error types raised while building and evaluating primitives

use thiserror::Error;

/// Result type for primitive construction and evaluation
pub type PrimitiveResult<T> = Result<T, PrimitiveError>;

/// Failure of a primitive node.
///
/// `instance` always carries the instance name followed by the source codename,
/// so every message points at the node and file that raised it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrimitiveError {
    /// Wrong number of operands or arguments
    #[error("{instance}: {message}")]
    Arity { instance: String, message: String },

    /// An operand is missing, nil or otherwise unusable
    #[error("{instance}: {message}")]
    InvalidOperand { instance: String, message: String },

    /// An operand is present but has the wrong kind or shape
    #[error("{instance}: {message}")]
    Type { instance: String, message: String },

    /// A variable name was not bound in any enclosing frame
    #[error("{instance}: unbound variable '{name}'")]
    UnboundVariable { instance: String, name: String },

    /// File or stream failure inside an I/O primitive
    #[error("{instance}: {message}: {reason}")]
    RuntimeIo { instance: String, message: String, reason: String },

    /// The evaluation deadline attached to the context has passed
    #[error("{instance}: evaluation deadline exceeded")]
    Timeout { instance: String },

    /// Function invocations nested deeper than the configured limit
    #[error("{instance}: maximum recursion depth of {limit} exceeded")]
    RecursionLimit { instance: String, limit: usize },

    /// A node hosted by another locality could not be reached
    #[error("locality {locality}: {message}")]
    Placement { locality: u32, message: String },

    /// Internal evaluator error
    #[error("internal error: {0}")]
    Internal(String),
}

impl PrimitiveError {
    /// Short error code, stable across releases
    pub fn code(&self) -> &'static str {
        match self {
            PrimitiveError::Arity { .. } => "P001",
            PrimitiveError::InvalidOperand { .. } => "P002",
            PrimitiveError::Type { .. } => "P003",
            PrimitiveError::UnboundVariable { .. } => "P004",
            PrimitiveError::RuntimeIo { .. } => "P005",
            PrimitiveError::Timeout { .. } => "P006",
            PrimitiveError::RecursionLimit { .. } => "P007",
            PrimitiveError::Placement { .. } => "P008",
            PrimitiveError::Internal(_) => "P999",
        }
    }

    pub fn is_type_error(&self) -> bool {
        matches!(self, PrimitiveError::Type { .. })
    }
}
