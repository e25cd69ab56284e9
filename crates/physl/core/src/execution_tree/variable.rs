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
use crate::primitive::{value_operand, ExpressionTopology, Primitive, PrimitiveHandle, PrimitiveInstance};
use crate::value::Value;
use async_trait::async_trait;

/// `define(name, body)`: binds the value of `body` in the current frame and yields it
#[derive(Debug)]
pub struct DefineVariable {
    instance: PrimitiveInstance,
    name: String,
    operands: Vec<Value>,
}

impl DefineVariable {
    pub fn create(name: impl Into<String>, body: Value, instance: PrimitiveInstance) -> PrimitiveResult<PrimitiveHandle> {
        let name = name.into();
        if name.is_empty() {
            return Err(instance.invalid_operand("define needs a variable name"));
        }
        Ok(PrimitiveHandle::new(Self {
            instance,
            name,
            operands: vec![body],
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl Primitive for DefineVariable {
    fn instance(&self) -> &PrimitiveInstance {
        &self.instance
    }

    fn operands(&self) -> &[Value] {
        &self.operands
    }

    async fn eval(&self, _args: Vec<Value>, ctx: EvalContext) -> PrimitiveResult<Value> {
        let value = value_operand(&self.operands[0], &ctx).await?;
        ctx.frame().define(self.name.clone(), value.clone());
        Ok(value)
    }
}

/// Run-time access to a named variable.
///
/// Resolution is deferred to evaluation so forward references and recursive
/// functions work. Called with arguments, the bound value is invoked.
#[derive(Debug)]
pub struct AccessVariable {
    instance: PrimitiveInstance,
    name: String,
}

impl AccessVariable {
    pub fn create(name: impl Into<String>, instance: PrimitiveInstance) -> PrimitiveHandle {
        PrimitiveHandle::new(Self { instance, name: name.into() })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl Primitive for AccessVariable {
    fn instance(&self) -> &PrimitiveInstance {
        &self.instance
    }

    async fn eval(&self, args: Vec<Value>, ctx: EvalContext) -> PrimitiveResult<Value> {
        let value = ctx.frame().lookup(&self.name).ok_or_else(|| self.instance.unbound(&self.name))?;
        if args.is_empty() {
            return Ok(value);
        }
        match value {
            Value::Primitive(callee) => callee.eval(args, &ctx)?.await,
            other => Err(self.instance.type_error(format!("'{}' must be an invocable object, got {}", self.name, other.type_name()))),
        }
    }

    fn is_bindable(&self) -> bool {
        true
    }

    async fn store(&self, value: Value, ctx: EvalContext) -> PrimitiveResult<()> {
        if ctx.frame().assign(&self.name, value) {
            Ok(())
        } else {
            Err(self.instance.unbound(&self.name))
        }
    }

    fn store_with(&self, ctx: &EvalContext, update: &mut (dyn FnMut(&mut Value) -> PrimitiveResult<()> + Send)) -> PrimitiveResult<()> {
        ctx.frame().update(&self.name, update).unwrap_or_else(|| Err(self.instance.unbound(&self.name)))
    }

    fn topology(&self) -> ExpressionTopology {
        ExpressionTopology::leaf(self.instance.name())
    }
}
