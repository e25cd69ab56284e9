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

use super::numeric::{promote, shape_error, unsupported, BinaryOperation, Promoted};
use crate::error::PrimitiveResult;
use crate::primitive::{PrimitiveInstance, PrimitiveSpec};
use crate::value::Value;
use std::cmp::Ordering;

pub const LT_SPEC: PrimitiveSpec = PrimitiveSpec {
    name: "__lt",
    patterns: &["_1 < _2"],
    create: |operands, instance| BinaryOperation::create(operands, instance, |a, b, i| ordered(a, b, i, "<", Ordering::is_lt)),
    help: "a < b",
};

pub const LE_SPEC: PrimitiveSpec = PrimitiveSpec {
    name: "__le",
    patterns: &["_1 <= _2"],
    create: |operands, instance| BinaryOperation::create(operands, instance, |a, b, i| ordered(a, b, i, "<=", Ordering::is_le)),
    help: "a <= b",
};

pub const GT_SPEC: PrimitiveSpec = PrimitiveSpec {
    name: "__gt",
    patterns: &["_1 > _2"],
    create: |operands, instance| BinaryOperation::create(operands, instance, |a, b, i| ordered(a, b, i, ">", Ordering::is_gt)),
    help: "a > b",
};

pub const GE_SPEC: PrimitiveSpec = PrimitiveSpec {
    name: "__ge",
    patterns: &["_1 >= _2"],
    create: |operands, instance| BinaryOperation::create(operands, instance, |a, b, i| ordered(a, b, i, ">=", Ordering::is_ge)),
    help: "a >= b",
};

pub const EQ_SPEC: PrimitiveSpec = PrimitiveSpec {
    name: "__eq",
    patterns: &["_1 == _2"],
    create: |operands, instance| BinaryOperation::create(operands, instance, |a, b, i| equality(a, b, i, true)),
    help: "a == b\n\nElement-wise for numeric operands, whole-value otherwise.",
};

pub const NE_SPEC: PrimitiveSpec = PrimitiveSpec {
    name: "__ne",
    patterns: &["_1 != _2"],
    create: |operands, instance| BinaryOperation::create(operands, instance, |a, b, i| equality(a, b, i, false)),
    help: "a != b\n\nElement-wise for numeric operands, whole-value otherwise.",
};

fn ordered(lhs: Value, rhs: Value, instance: &PrimitiveInstance, op: &str, test: fn(Ordering) -> bool) -> PrimitiveResult<Value> {
    if let (Value::Str(a), Value::Str(b)) = (&lhs, &rhs) {
        return Ok(Value::from(test(a.cmp(b))));
    }
    let result = match promote(&lhs, &rhs) {
        Some(Promoted::Int(a, b)) => a.zip_with(&b, |x, y| test(x.cmp(y))),
        // NaN compares false against everything
        Some(Promoted::Float(a, b)) => a.zip_with(&b, |x, y| x.partial_cmp(y).is_some_and(test)),
        None => return Err(unsupported(instance, op, &lhs, &rhs)),
    };
    result.map(Value::Bool).ok_or_else(|| shape_error(instance, &lhs, &rhs))
}

fn equality(lhs: Value, rhs: Value, instance: &PrimitiveInstance, equal: bool) -> PrimitiveResult<Value> {
    let result = match promote(&lhs, &rhs) {
        Some(Promoted::Int(a, b)) => a.zip_with(&b, |x, y| (x == y) == equal),
        Some(Promoted::Float(a, b)) => a.zip_with(&b, |x, y| (x == y) == equal),
        None => return Ok(Value::from((lhs == rhs) == equal)),
    };
    result.map(Value::Bool).ok_or_else(|| shape_error(instance, &lhs, &rhs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EvalContext;
    use crate::frame::Frame;
    use crate::kernels::arithmetic::binary;
    use crate::value::NdArray;
    use test_case::test_case;

    #[test_case(&LT_SPEC, Value::from(1_i64), Value::from(2_i64), true ; "lt")]
    #[test_case(&LE_SPEC, Value::from(2_i64), Value::from(2.0), true ; "le mixed")]
    #[test_case(&GT_SPEC, Value::from(1_i64), Value::from(2_i64), false ; "gt")]
    #[test_case(&GE_SPEC, Value::from("b"), Value::from("a"), true ; "ge strings")]
    #[test_case(&EQ_SPEC, Value::from("a"), Value::from("a"), true ; "eq strings")]
    #[test_case(&EQ_SPEC, Value::Nil, Value::Nil, true ; "eq nil")]
    #[test_case(&NE_SPEC, Value::from(1_i64), Value::from(1.0), false ; "ne promoted")]
    #[test_case(&LT_SPEC, Value::from(f64::NAN), Value::from(1.0), false ; "nan")]
    #[tokio::test]
    async fn test_scalar_comparisons(spec: &PrimitiveSpec, lhs: Value, rhs: Value, expected: bool) {
        let node = binary(spec, lhs, rhs).unwrap();
        assert_eq!(node.eval_value(&EvalContext::new(Frame::root())).await.unwrap(), Value::from(expected));
    }

    #[tokio::test]
    async fn test_elementwise() {
        let v = Value::Int(NdArray::vector(vec![1, 2, 3]));
        let node = binary(&GT_SPEC, v, Value::from(1_i64)).unwrap();
        let result = node.eval_value(&EvalContext::new(Frame::root())).await.unwrap();
        assert_eq!(result, Value::Bool(NdArray::vector(vec![false, true, true])));
    }

    #[tokio::test]
    async fn test_incomparable() {
        let node = binary(&LT_SPEC, Value::from("a"), Value::from(1_i64)).unwrap();
        assert!(node.eval_value(&EvalContext::new(Frame::root())).await.unwrap_err().is_type_error());
    }
}
