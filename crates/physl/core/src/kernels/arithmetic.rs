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

use super::numeric::{promote, propagate_annotation, shape_error, unsupported, BinaryOperation, Promoted, UnaryOperation};
use crate::error::PrimitiveResult;
use crate::primitive::{PrimitiveHandle, PrimitiveInstance, PrimitiveSpec};
use crate::value::Value;

pub const ADD_SPEC: PrimitiveSpec = PrimitiveSpec {
    name: "__add",
    patterns: &["_1 + _2"],
    create: |operands, instance| BinaryOperation::create(operands, instance, add),
    help: "a + b\n\nElement-wise sum; concatenates strings and lists.",
};

pub const SUB_SPEC: PrimitiveSpec = PrimitiveSpec {
    name: "__sub",
    patterns: &["_1 - _2"],
    create: |operands, instance| BinaryOperation::create(operands, instance, sub),
    help: "a - b\n\nElement-wise difference.",
};

pub const MUL_SPEC: PrimitiveSpec = PrimitiveSpec {
    name: "__mul",
    patterns: &["_1 * _2"],
    create: |operands, instance| BinaryOperation::create(operands, instance, mul),
    help: "a * b\n\nElement-wise product.",
};

pub const DIV_SPEC: PrimitiveSpec = PrimitiveSpec {
    name: "__div",
    patterns: &["_1 / _2"],
    create: |operands, instance| BinaryOperation::create(operands, instance, div),
    help: "a / b\n\nElement-wise quotient; integer division truncates and fails on a zero divisor.",
};

pub const MOD_SPEC: PrimitiveSpec = PrimitiveSpec {
    name: "__mod",
    patterns: &["_1 % _2"],
    create: |operands, instance| BinaryOperation::create(operands, instance, rem),
    help: "a % b\n\nElement-wise remainder.",
};

pub const MINUS_SPEC: PrimitiveSpec = PrimitiveSpec {
    name: "__minus",
    patterns: &["-_1"],
    create: |operands, instance| UnaryOperation::create(operands, instance, negate),
    help: "-a\n\nElement-wise negation.",
};

fn elementwise(
    lhs: Value,
    rhs: Value,
    instance: &PrimitiveInstance,
    op: &str,
    int: impl Fn(&i64, &i64) -> Result<i64, &'static str>,
    float: impl Fn(&f64, &f64) -> f64,
) -> PrimitiveResult<Value> {
    let result = match promote(&lhs, &rhs) {
        Some(Promoted::Int(a, b)) => match a.try_zip_with(&b, int) {
            Some(Ok(array)) => Value::Int(array),
            Some(Err(message)) => return Err(instance.invalid_operand(message)),
            None => return Err(shape_error(instance, &lhs, &rhs)),
        },
        Some(Promoted::Float(a, b)) => match a.zip_with(&b, float) {
            Some(array) => Value::Float(array),
            None => return Err(shape_error(instance, &lhs, &rhs)),
        },
        None => return Err(unsupported(instance, op, &lhs, &rhs)),
    };
    Ok(propagate_annotation(result, &lhs, &rhs))
}

fn add(lhs: Value, rhs: Value, instance: &PrimitiveInstance) -> PrimitiveResult<Value> {
    match (lhs, rhs) {
        (Value::Str(a), Value::Str(b)) => Ok(Value::Str(a + &b)),
        (Value::List(mut a), Value::List(b)) => {
            a.extend(b);
            Ok(Value::List(a))
        }
        (lhs, rhs) => elementwise(lhs, rhs, instance, "+", |a, b| Ok(a.wrapping_add(*b)), |a, b| a + b),
    }
}

fn sub(lhs: Value, rhs: Value, instance: &PrimitiveInstance) -> PrimitiveResult<Value> {
    elementwise(lhs, rhs, instance, "-", |a, b| Ok(a.wrapping_sub(*b)), |a, b| a - b)
}

fn mul(lhs: Value, rhs: Value, instance: &PrimitiveInstance) -> PrimitiveResult<Value> {
    elementwise(lhs, rhs, instance, "*", |a, b| Ok(a.wrapping_mul(*b)), |a, b| a * b)
}

fn div(lhs: Value, rhs: Value, instance: &PrimitiveInstance) -> PrimitiveResult<Value> {
    elementwise(lhs, rhs, instance, "/", |a, b| a.checked_div(*b).ok_or("integer division by zero"), |a, b| a / b)
}

fn rem(lhs: Value, rhs: Value, instance: &PrimitiveInstance) -> PrimitiveResult<Value> {
    elementwise(lhs, rhs, instance, "%", |a, b| a.checked_rem(*b).ok_or("integer remainder by zero"), |a, b| a % b)
}

fn negate(value: Value, instance: &PrimitiveInstance) -> PrimitiveResult<Value> {
    match value {
        Value::Bool(a) => Ok(Value::Int(a.map(|b| -(*b as i64)))),
        Value::Int(a) => Ok(Value::Int(a.map(|v| v.wrapping_neg()))),
        Value::Float(a) => Ok(Value::Float(a.map(|v| -v))),
        other => Err(instance.type_error(format!("cannot negate {}", other.type_name()))),
    }
}

/// Factory shortcut used by tests and host code building nodes by hand
pub fn binary(spec: &PrimitiveSpec, lhs: Value, rhs: Value) -> PrimitiveResult<PrimitiveHandle> {
    (spec.create)(vec![lhs, rhs], PrimitiveInstance::anonymous(spec.name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::Annotation;
    use crate::context::EvalContext;
    use crate::frame::Frame;
    use crate::value::NdArray;
    use test_case::test_case;

    async fn eval(spec: &PrimitiveSpec, lhs: Value, rhs: Value) -> PrimitiveResult<Value> {
        binary(spec, lhs, rhs)?.eval_value(&EvalContext::new(Frame::root())).await
    }

    #[test_case(&ADD_SPEC, Value::from(1_i64), Value::from(2_i64), Value::from(3_i64) ; "int add")]
    #[test_case(&ADD_SPEC, Value::from(1_i64), Value::from(0.5), Value::from(1.5) ; "int float promotion")]
    #[test_case(&ADD_SPEC, Value::from(true), Value::from(2_i64), Value::from(3_i64) ; "bool promotion")]
    #[test_case(&SUB_SPEC, Value::from(1_i64), Value::from(3_i64), Value::from(-2_i64) ; "sub")]
    #[test_case(&MUL_SPEC, Value::from(21_i64), Value::from(2_i64), Value::from(42_i64) ; "mul")]
    #[test_case(&DIV_SPEC, Value::from(7_i64), Value::from(2_i64), Value::from(3_i64) ; "int div truncates")]
    #[test_case(&DIV_SPEC, Value::from(7.0), Value::from(2_i64), Value::from(3.5) ; "float div")]
    #[test_case(&MOD_SPEC, Value::from(7_i64), Value::from(4_i64), Value::from(3_i64) ; "rem")]
    #[test_case(&ADD_SPEC, Value::from("ab"), Value::from("cd"), Value::from("abcd") ; "string concat")]
    #[tokio::test]
    async fn test_scalars(spec: &PrimitiveSpec, lhs: Value, rhs: Value, expected: Value) {
        assert_eq!(eval(spec, lhs, rhs).await.unwrap(), expected);
    }

    #[tokio::test]
    async fn test_division_by_zero() {
        let error = eval(&DIV_SPEC, Value::from(1_i64), Value::from(0_i64)).await.unwrap_err();
        assert!(error.to_string().contains("division by zero"));
        assert_eq!(eval(&DIV_SPEC, Value::from(1.0), Value::from(0_i64)).await.unwrap(), Value::from(f64::INFINITY));
    }

    #[tokio::test]
    async fn test_broadcast_and_shape_mismatch() {
        let v = Value::Int(NdArray::vector(vec![1, 2, 3]));
        assert_eq!(eval(&MUL_SPEC, v.clone(), Value::from(2_i64)).await.unwrap(), Value::Int(NdArray::vector(vec![2, 4, 6])));

        let w = Value::Int(NdArray::vector(vec![1, 2]));
        assert!(eval(&ADD_SPEC, v, w).await.unwrap_err().is_type_error());
    }

    #[tokio::test]
    async fn test_annotation_propagates() {
        let annotated = Value::Int(NdArray::vector(vec![1, 2]).with_annotation(Annotation::new("meta", vec![])));
        let result = eval(&ADD_SPEC, annotated, Value::from(1_i64)).await.unwrap();
        assert_eq!(result.annotation().map(|a| a.key()), Some("meta"));
    }

    #[tokio::test]
    async fn test_negate() {
        let node = (MINUS_SPEC.create)(vec![Value::from(2.5)], PrimitiveInstance::anonymous("__minus")).unwrap();
        assert_eq!(node.eval_value(&EvalContext::new(Frame::root())).await.unwrap(), Value::from(-2.5));

        let node = (MINUS_SPEC.create)(vec![Value::from("x")], PrimitiveInstance::anonymous("__minus")).unwrap();
        assert!(node.eval_value(&EvalContext::new(Frame::root())).await.is_err());
    }

    #[tokio::test]
    async fn test_unsupported_operands() {
        let error = eval(&SUB_SPEC, Value::from("a"), Value::from(1_i64)).await.unwrap_err();
        assert!(error.to_string().contains("unsupported operand types for -"));
    }
}
