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

//! `&&`, `||` and `!`.
//!
//! The binary forms short-circuit: the right operand is only evaluated when
//! the left one does not decide the result.

use super::numeric::UnaryOperation;
use crate::context::EvalContext;
use crate::error::PrimitiveResult;
use crate::primitive::{value_operand, Primitive, PrimitiveHandle, PrimitiveInstance, PrimitiveSpec};
use crate::value::Value;
use async_trait::async_trait;

pub const AND_SPEC: PrimitiveSpec = PrimitiveSpec {
    name: "__and",
    patterns: &["_1 && _2"],
    create: |operands, instance| Logical::create(operands, instance, false),
    help: "a && b\n\nLogical and; `b` is not evaluated when `a` is false.",
};

pub const OR_SPEC: PrimitiveSpec = PrimitiveSpec {
    name: "__or",
    patterns: &["_1 || _2"],
    create: |operands, instance| Logical::create(operands, instance, true),
    help: "a || b\n\nLogical or; `b` is not evaluated when `a` is true.",
};

pub const NOT_SPEC: PrimitiveSpec = PrimitiveSpec {
    name: "__not",
    patterns: &["!_1"],
    create: |operands, instance| UnaryOperation::create(operands, instance, not),
    help: "!a\n\nLogical negation; element-wise for arrays.",
};

fn truth(value: &Value, instance: &PrimitiveInstance) -> PrimitiveResult<bool> {
    value
        .to_bool()
        .ok_or_else(|| instance.type_error(format!("logical operands must be scalars, got {}", value.type_name())))
}

#[derive(Debug)]
pub struct Logical {
    instance: PrimitiveInstance,
    operands: Vec<Value>,
    /// Left value that decides the result on its own
    short_circuit_on: bool,
}

impl Logical {
    fn create(operands: Vec<Value>, instance: PrimitiveInstance, short_circuit_on: bool) -> PrimitiveResult<PrimitiveHandle> {
        instance.expect_operands(&operands, 2)?;
        Ok(PrimitiveHandle::new(Self {
            instance,
            operands,
            short_circuit_on,
        }))
    }
}

#[async_trait]
impl Primitive for Logical {
    fn instance(&self) -> &PrimitiveInstance {
        &self.instance
    }

    fn operands(&self) -> &[Value] {
        &self.operands
    }

    async fn eval(&self, _args: Vec<Value>, ctx: EvalContext) -> PrimitiveResult<Value> {
        let lhs = truth(&value_operand(&self.operands[0], &ctx).await?, &self.instance)?;
        if lhs == self.short_circuit_on {
            return Ok(Value::from(lhs));
        }
        let rhs = truth(&value_operand(&self.operands[1], &ctx).await?, &self.instance)?;
        Ok(Value::from(rhs))
    }
}

fn not(value: Value, instance: &PrimitiveInstance) -> PrimitiveResult<Value> {
    match value {
        Value::Bool(a) if !a.is_scalar() => Ok(Value::Bool(a.map(|b| !b))),
        Value::Int(a) if !a.is_scalar() => Ok(Value::Bool(a.map(|v| *v == 0))),
        Value::Float(a) if !a.is_scalar() => Ok(Value::Bool(a.map(|v| *v == 0.0))),
        other => Ok(Value::from(!truth(&other, instance)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution_tree::AccessVariable;
    use crate::frame::Frame;
    use crate::kernels::arithmetic::binary;
    use crate::value::NdArray;

    #[tokio::test]
    async fn test_short_circuit_skips_rhs() {
        let ctx = EvalContext::new(Frame::root());
        // the right operand would fail as unbound if evaluated
        let unbound = AccessVariable::create("missing", PrimitiveInstance::anonymous("access-variable"));

        let and = binary(&AND_SPEC, Value::from(false), unbound.clone().into()).unwrap();
        assert_eq!(and.eval_value(&ctx).await.unwrap(), Value::from(false));

        let or = binary(&OR_SPEC, Value::from(1_i64), unbound.clone().into()).unwrap();
        assert_eq!(or.eval_value(&ctx).await.unwrap(), Value::from(true));

        let and = binary(&AND_SPEC, Value::from(true), unbound.into()).unwrap();
        assert!(and.eval_value(&ctx).await.is_err());
    }

    #[tokio::test]
    async fn test_not() {
        let ctx = EvalContext::new(Frame::root());
        let node = (NOT_SPEC.create)(vec![Value::Nil], PrimitiveInstance::anonymous("__not")).unwrap();
        assert_eq!(node.eval_value(&ctx).await.unwrap(), Value::from(true));

        let node = (NOT_SPEC.create)(vec![Value::Int(NdArray::vector(vec![0, 2]))], PrimitiveInstance::anonymous("__not")).unwrap();
        assert_eq!(node.eval_value(&ctx).await.unwrap(), Value::Bool(NdArray::vector(vec![true, false])));
    }
}
