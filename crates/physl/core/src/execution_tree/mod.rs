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

//! Compiler-internal primitives: control flow, variables and functions

pub mod block;
pub mod conditional;
pub mod function;
pub mod higher_order;
pub mod loops;
pub mod parallel;
pub mod store;
pub mod variable;

pub use block::Block;
pub use conditional::If;
pub use function::{AccessFunction, CallFunction, Lambda, TargetReference};
pub use higher_order::{Filter, FoldLeft, FoldRight, Map, ParallelForEach};
pub use loops::{For, While};
pub use parallel::ParallelBlock;
pub use store::Store;
pub use variable::{AccessVariable, DefineVariable};

use crate::primitive::PrimitiveSpec;

/// Pattern-matched control-flow primitives, in registration order
pub fn specs() -> Vec<PrimitiveSpec> {
    vec![
        conditional::SPEC,
        loops::WHILE_SPEC,
        loops::FOR_SPEC,
        parallel::SPEC,
        store::SPEC,
        higher_order::FILTER_SPEC,
        higher_order::MAP_SPEC,
        higher_order::FOLD_LEFT_SPEC,
        higher_order::FOLD_RIGHT_SPEC,
        higher_order::PARALLEL_FOR_EACH_SPEC,
    ]
}
