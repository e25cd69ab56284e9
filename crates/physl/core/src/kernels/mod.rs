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

//! Representative catalog of concrete primitives.
//!
//! Kernels only use the public node contract; nothing in the evaluator
//! special-cases them.

pub mod annotate;
pub mod arithmetic;
pub mod collections;
pub mod comparison;
pub mod io;
pub mod logical;
pub mod numeric;
pub mod slice;

use crate::primitive::PrimitiveSpec;

/// Kernel primitives, in registration order
pub fn specs() -> Vec<PrimitiveSpec> {
    vec![
        arithmetic::ADD_SPEC,
        arithmetic::SUB_SPEC,
        arithmetic::MUL_SPEC,
        arithmetic::DIV_SPEC,
        arithmetic::MOD_SPEC,
        arithmetic::MINUS_SPEC,
        comparison::LT_SPEC,
        comparison::LE_SPEC,
        comparison::GT_SPEC,
        comparison::GE_SPEC,
        comparison::EQ_SPEC,
        comparison::NE_SPEC,
        logical::AND_SPEC,
        logical::OR_SPEC,
        logical::NOT_SPEC,
        collections::LIST_SPEC,
        collections::DICT_SPEC,
        collections::LEN_SPEC,
        collections::SHAPE_SPEC,
        slice::SPEC,
        annotate::ANNOTATE_SPEC,
        annotate::ANNOTATE_D_SPEC,
        annotate::ANNOTATION_SPEC,
        io::CONSOLE_OUTPUT_SPEC,
        io::FILE_READ_SPEC,
        io::FILE_WRITE_SPEC,
    ]
}
