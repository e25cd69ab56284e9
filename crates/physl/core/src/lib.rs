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

//! Execution-tree evaluator for PhySL.
//!
//! A compiled program is a graph of [`PrimitiveHandle`] nodes. Evaluating a
//! node yields a future; siblings run concurrently and results flow back
//! through the continuation chain together with an [`EvalContext`].

pub mod annotation;
pub mod context;
pub mod error;
pub mod execution_tree;
pub mod frame;
pub mod kernels;
pub mod placement;
pub mod primitive;
pub mod value;

pub use annotation::{Annotation, AnnotationError, AnnotationInformation, LocalityInformation};
pub use context::{EvalContext, EvalMode};
pub use error::{PrimitiveError, PrimitiveResult};
pub use frame::Frame;
pub use placement::{ChannelPlacement, LocalPlacement, LocalityId, Placement};
pub use primitive::{EvalFuture, ExpressionTopology, Primitive, PrimitiveFactory, PrimitiveHandle, PrimitiveInstance, PrimitiveSpec};
pub use value::{Dictionary, ElementType, NdArray, Value};

/// Every built-in pattern-matched primitive, control flow first
pub fn builtin_primitives() -> Vec<PrimitiveSpec> {
    let mut specs = execution_tree::specs();
    specs.extend(kernels::specs());
    specs
}
