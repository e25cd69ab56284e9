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

//! PhySL front end: parsing, pattern matching against the primitive
//! registry, and compilation to execution trees.

pub mod ast;
pub mod compiler;
pub mod environment;
pub mod function;
pub mod matcher;
pub mod parser;
pub mod registry;

pub use ast::{BinaryOp, Expression, Identifier, Literal, UnaryOp};
pub use compiler::{CompileError, CompileResult, Compiler};
pub use environment::Environment;
pub use function::{Function, PerformanceCounter};
pub use matcher::{bind_placeholders, match_ast, Binding, Placeholder};
pub use parser::{generate_ast, parse_expression, ParseError, ParseErrorKind, Position};
pub use registry::{PatternEntry, PatternKind, PatternRegistry, PrimitivePlugin, SpecialForm, NO_HELP};
