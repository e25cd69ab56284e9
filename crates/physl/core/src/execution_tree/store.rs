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
    name: "store",
    patterns: &["store(_1, _2)"],
    create: Store::create,
    help: "store(target, value)\n\nAssigns `value` to a variable or to a slice of an array variable.",
};

/// `store(target, value)`; the target must be a bindable node
#[derive(Debug)]
pub struct Store {
    instance: PrimitiveInstance,
    operands: Vec<Value>,
    target: PrimitiveHandle,
}

impl Store {
    pub fn create(operands: Vec<Value>, instance: PrimitiveInstance) -> PrimitiveResult<PrimitiveHandle> {
        instance.expect_operands(&operands, 2)?;
        let target = match &operands[0] {
            Value::Primitive(target) if target.is_bindable() => target.clone(),
            other => return Err(instance.type_error(format!("the target of store must be a variable or a slice, got {}", other.type_name()))),
        };
        Ok(PrimitiveHandle::new(Self { instance, operands, target }))
    }
}

#[async_trait]
impl Primitive for Store {
    fn instance(&self) -> &PrimitiveInstance {
        &self.instance
    }

    fn operands(&self) -> &[Value] {
        &self.operands
    }

    async fn eval(&self, _args: Vec<Value>, ctx: EvalContext) -> PrimitiveResult<Value> {
        let value = value_operand(&self.operands[1], &ctx).await?;
        self.target.store(value, &ctx).await?;
        Ok(Value::Nil)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution_tree::AccessVariable;
    use crate::frame::Frame;
    use crate::value::NdArray;
    use test_case::test_case;

    #[test_case(Value::from(3_i64) ; "int")]
    #[test_case(Value::from(3.5) ; "float")]
    #[test_case(Value::from("x") ; "string")]
    #[test_case(Value::from(true) ; "bool")]
    #[test_case(Value::Nil ; "nil")]
    #[test_case(Value::Int(NdArray::vector(vec![1, 2])) ; "array")]
    fn test_literal_target_is_type_error(target: Value) {
        let error = Store::create(vec![target, Value::from(5_i64)], PrimitiveInstance::anonymous("store")).unwrap_err();
        assert!(error.is_type_error());
    }

    #[tokio::test]
    async fn test_rebinds_nearest_scope() {
        let globals = Frame::root();
        globals.define("x", Value::from(1_i64));
        let target = AccessVariable::create("x", PrimitiveInstance::anonymous("access-variable"));
        let node = Store::create(vec![target.into(), Value::from(5_i64)], PrimitiveInstance::anonymous("store")).unwrap();

        let ctx = EvalContext::new(globals.clone()).with_child_frame();
        assert_eq!(node.eval_value(&ctx).await.unwrap(), Value::Nil);
        assert_eq!(globals.lookup("x"), Some(Value::from(5_i64)));
    }

    #[tokio::test]
    async fn test_unbound_target_fails() {
        let target = AccessVariable::create("missing", PrimitiveInstance::anonymous("access-variable"));
        let node = Store::create(vec![target.into(), Value::from(5_i64)], PrimitiveInstance::anonymous("store")).unwrap();
        assert!(node.eval_value(&EvalContext::new(Frame::root())).await.is_err());
    }
}
