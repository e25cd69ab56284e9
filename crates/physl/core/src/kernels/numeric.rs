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

//! Shared plumbing for element-wise kernels: operand promotion and the generic
//! unary/binary nodes the arithmetic and comparison primitives are built from.

use crate::context::EvalContext;
use crate::error::PrimitiveResult;
use crate::primitive::{value_operands, Primitive, PrimitiveHandle, PrimitiveInstance};
use crate::value::{NdArray, Value};
use async_trait::async_trait;
use std::fmt;

/// Numeric operand after promotion; bool becomes int64
pub(crate) enum Numeric {
    Int(NdArray<i64>),
    Float(NdArray<f64>),
}

pub(crate) fn numeric(value: &Value) -> Option<Numeric> {
    match value {
        Value::Bool(a) => Some(Numeric::Int(a.map(|b| *b as i64))),
        Value::Int(a) => Some(Numeric::Int(a.clone())),
        Value::Float(a) => Some(Numeric::Float(a.clone())),
        _ => None,
    }
}

/// Two operands promoted to a common element type
pub(crate) enum Promoted {
    Int(NdArray<i64>, NdArray<i64>),
    Float(NdArray<f64>, NdArray<f64>),
}

pub(crate) fn promote(lhs: &Value, rhs: &Value) -> Option<Promoted> {
    Some(match (numeric(lhs)?, numeric(rhs)?) {
        (Numeric::Int(a), Numeric::Int(b)) => Promoted::Int(a, b),
        (Numeric::Int(a), Numeric::Float(b)) => Promoted::Float(a.map(|v| *v as f64), b),
        (Numeric::Float(a), Numeric::Int(b)) => Promoted::Float(a, b.map(|v| *v as f64)),
        (Numeric::Float(a), Numeric::Float(b)) => Promoted::Float(a, b),
    })
}

pub(crate) fn shape_error(instance: &PrimitiveInstance, lhs: &Value, rhs: &Value) -> crate::error::PrimitiveError {
    instance.type_error(format!("operand shapes {:?} and {:?} are incompatible", lhs.shape().unwrap_or_default(), rhs.shape().unwrap_or_default()))
}

pub(crate) fn unsupported(instance: &PrimitiveInstance, op: &str, lhs: &Value, rhs: &Value) -> crate::error::PrimitiveError {
    instance.type_error(format!("unsupported operand types for {}: {} and {}", op, lhs.type_name(), rhs.type_name()))
}

/// Carry the annotation of the first annotated operand over to an element-wise result
pub(crate) fn propagate_annotation(result: Value, lhs: &Value, rhs: &Value) -> Value {
    if result.annotation().is_some() || result.dims().unwrap_or(0) == 0 {
        return result;
    }
    let source = lhs.annotation().filter(|_| lhs.shape() == result.shape()).or_else(|| rhs.annotation().filter(|_| rhs.shape() == result.shape()));
    match source {
        Some(annotation) => result.with_annotation(Some(annotation.clone())).unwrap_or_else(|unchanged| unchanged),
        None => result,
    }
}

pub(crate) type BinaryKernel = fn(Value, Value, &PrimitiveInstance) -> PrimitiveResult<Value>;
pub(crate) type UnaryKernel = fn(Value, &PrimitiveInstance) -> PrimitiveResult<Value>;

/// Node evaluating two operands concurrently and combining them with a kernel
pub struct BinaryOperation {
    instance: PrimitiveInstance,
    operands: Vec<Value>,
    kernel: BinaryKernel,
}

impl BinaryOperation {
    pub(crate) fn create(operands: Vec<Value>, instance: PrimitiveInstance, kernel: BinaryKernel) -> PrimitiveResult<PrimitiveHandle> {
        instance.expect_operands(&operands, 2)?;
        Ok(PrimitiveHandle::new(Self { instance, operands, kernel }))
    }
}

impl fmt::Debug for BinaryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryOperation").field("instance", &self.instance.name()).field("operands", &self.operands).finish()
    }
}

#[async_trait]
impl Primitive for BinaryOperation {
    fn instance(&self) -> &PrimitiveInstance {
        &self.instance
    }

    fn operands(&self) -> &[Value] {
        &self.operands
    }

    async fn eval(&self, _args: Vec<Value>, ctx: EvalContext) -> PrimitiveResult<Value> {
        let mut values = value_operands(&self.operands, &ctx).await?;
        let rhs = values.pop().unwrap_or_default();
        let lhs = values.pop().unwrap_or_default();
        (self.kernel)(lhs, rhs, &self.instance)
    }
}

pub struct UnaryOperation {
    instance: PrimitiveInstance,
    operands: Vec<Value>,
    kernel: UnaryKernel,
}

impl UnaryOperation {
    pub(crate) fn create(operands: Vec<Value>, instance: PrimitiveInstance, kernel: UnaryKernel) -> PrimitiveResult<PrimitiveHandle> {
        instance.expect_operands(&operands, 1)?;
        Ok(PrimitiveHandle::new(Self { instance, operands, kernel }))
    }
}

impl fmt::Debug for UnaryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnaryOperation").field("instance", &self.instance.name()).field("operands", &self.operands).finish()
    }
}

#[async_trait]
impl Primitive for UnaryOperation {
    fn instance(&self) -> &PrimitiveInstance {
        &self.instance
    }

    fn operands(&self) -> &[Value] {
        &self.operands
    }

    async fn eval(&self, _args: Vec<Value>, ctx: EvalContext) -> PrimitiveResult<Value> {
        let mut values = value_operands(&self.operands, &ctx).await?;
        (self.kernel)(values.pop().unwrap_or_default(), &self.instance)
    }
}
