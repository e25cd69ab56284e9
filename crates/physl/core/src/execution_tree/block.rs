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
use crate::primitive::{value_operand, Primitive, PrimitiveHandle, PrimitiveInstance};
use crate::value::Value;
use async_trait::async_trait;

/// `block(expr...)`: evaluates its operands in order inside a fresh scope and
/// yields the last value (nil when empty)
#[derive(Debug)]
pub struct Block {
    instance: PrimitiveInstance,
    operands: Vec<Value>,
}

impl Block {
    pub fn create(operands: Vec<Value>, instance: PrimitiveInstance) -> PrimitiveResult<PrimitiveHandle> {
        Ok(PrimitiveHandle::new(Self { instance, operands }))
    }
}

#[async_trait]
impl Primitive for Block {
    fn instance(&self) -> &PrimitiveInstance {
        &self.instance
    }

    fn operands(&self) -> &[Value] {
        &self.operands
    }

    async fn eval(&self, _args: Vec<Value>, ctx: EvalContext) -> PrimitiveResult<Value> {
        let ctx = ctx.with_child_frame();
        let mut last = Value::Nil;
        for operand in &self.operands {
            last = value_operand(operand, &ctx).await?;
        }
        Ok(last)
    }
}
