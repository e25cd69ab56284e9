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

use crate::context::EvalContext;
use crate::error::PrimitiveResult;
use crate::primitive::{value_operand, Primitive, PrimitiveHandle, PrimitiveInstance, PrimitiveSpec};
use crate::value::Value;
use async_trait::async_trait;

pub const SPEC: PrimitiveSpec = PrimitiveSpec {
    name: "if",
    patterns: &["if(_1, _2)", "if(_1, _2, _3)"],
    create: If::create,
    help: "if(cond, then, else)\n\nEvaluates `then` when `cond` is true, otherwise `else` (nil if absent).",
};

#[derive(Debug)]
pub struct If {
    instance: PrimitiveInstance,
    operands: Vec<Value>,
}

impl If {
    pub fn create(operands: Vec<Value>, instance: PrimitiveInstance) -> PrimitiveResult<PrimitiveHandle> {
        instance.expect_operand_range(&operands, 2, 3)?;
        Ok(PrimitiveHandle::new(Self { instance, operands }))
    }
}

/// Truth value of a condition result; arrays and nodes have none
pub(crate) fn condition(value: &Value, instance: &PrimitiveInstance) -> PrimitiveResult<bool> {
    value
        .to_bool()
        .ok_or_else(|| instance.type_error(format!("condition must evaluate to a scalar, got {}", value.type_name())))
}

#[async_trait]
impl Primitive for If {
    fn instance(&self) -> &PrimitiveInstance {
        &self.instance
    }

    fn operands(&self) -> &[Value] {
        &self.operands
    }

    async fn eval(&self, _args: Vec<Value>, ctx: EvalContext) -> PrimitiveResult<Value> {
        let cond = value_operand(&self.operands[0], &ctx).await?;
        if condition(&cond, &self.instance)? {
            value_operand(&self.operands[1], &ctx).await
        } else {
            match self.operands.get(2) {
                Some(otherwise) => value_operand(otherwise, &ctx).await,
                None => Ok(Value::Nil),
            }
        }
    }
}
