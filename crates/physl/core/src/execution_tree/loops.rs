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

//! `while` and `for` as explicit loop state machines.
//!
//! Each state runs one sub-evaluation and only moves on once its future has
//! resolved. Dropping the loop future drops whichever sub-future is pending.
//! The loop yields to the scheduler before every condition check, so an outer
//! timeout or cancellation takes effect even when nothing inside it awaits.

use super::conditional::condition;
use crate::context::EvalContext;
use crate::error::PrimitiveResult;
use crate::primitive::{value_operand, Primitive, PrimitiveHandle, PrimitiveInstance, PrimitiveSpec};
use crate::value::Value;
use async_trait::async_trait;
use tracing::trace;

pub const WHILE_SPEC: PrimitiveSpec = PrimitiveSpec {
    name: "while",
    patterns: &["while(_1, _2)"],
    create: While::create,
    help: "while(cond, body)\n\nEvaluates `body` as long as `cond` is true; yields the last body value.",
};

pub const FOR_SPEC: PrimitiveSpec = PrimitiveSpec {
    name: "for",
    patterns: &["for(_1, _2, _3, _4)"],
    create: For::create,
    help: "for(init, cond, step, body)\n\nEvaluates `init`, then `body` and `step` while `cond` is true; yields the last body value.",
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopState {
    Init,
    Condition,
    Body,
    Step,
    Done,
}

struct LoopParts<'a> {
    init: Option<&'a Value>,
    condition: &'a Value,
    step: Option<&'a Value>,
    body: &'a Value,
}

async fn run_loop(parts: LoopParts<'_>, ctx: &EvalContext, instance: &PrimitiveInstance) -> PrimitiveResult<Value> {
    let location = instance.to_string();
    let mut result = Value::Nil;
    let mut iterations = 0_u64;
    let mut state = LoopState::Init;

    loop {
        state = match state {
            LoopState::Init => {
                if let Some(init) = parts.init {
                    value_operand(init, ctx).await?;
                }
                LoopState::Condition
            }
            LoopState::Condition => {
                tokio::task::yield_now().await;
                ctx.check_deadline(&location)?;
                let value = value_operand(parts.condition, ctx).await?;
                if condition(&value, instance)? { LoopState::Body } else { LoopState::Done }
            }
            LoopState::Body => {
                result = value_operand(parts.body, ctx).await?;
                iterations += 1;
                if parts.step.is_some() { LoopState::Step } else { LoopState::Condition }
            }
            LoopState::Step => {
                if let Some(step) = parts.step {
                    value_operand(step, ctx).await?;
                }
                LoopState::Condition
            }
            LoopState::Done => {
                trace!(instance = instance.name(), iterations, "loop finished");
                return Ok(result);
            }
        };
    }
}

#[derive(Debug)]
pub struct While {
    instance: PrimitiveInstance,
    operands: Vec<Value>,
}

impl While {
    pub fn create(operands: Vec<Value>, instance: PrimitiveInstance) -> PrimitiveResult<PrimitiveHandle> {
        instance.expect_operands(&operands, 2)?;
        Ok(PrimitiveHandle::new(Self { instance, operands }))
    }
}

#[async_trait]
impl Primitive for While {
    fn instance(&self) -> &PrimitiveInstance {
        &self.instance
    }

    fn operands(&self) -> &[Value] {
        &self.operands
    }

    async fn eval(&self, _args: Vec<Value>, ctx: EvalContext) -> PrimitiveResult<Value> {
        let parts = LoopParts {
            init: None,
            condition: &self.operands[0],
            step: None,
            body: &self.operands[1],
        };
        run_loop(parts, &ctx, &self.instance).await
    }
}

#[derive(Debug)]
pub struct For {
    instance: PrimitiveInstance,
    operands: Vec<Value>,
}

impl For {
    pub fn create(operands: Vec<Value>, instance: PrimitiveInstance) -> PrimitiveResult<PrimitiveHandle> {
        instance.expect_operands(&operands, 4)?;
        Ok(PrimitiveHandle::new(Self { instance, operands }))
    }
}

#[async_trait]
impl Primitive for For {
    fn instance(&self) -> &PrimitiveInstance {
        &self.instance
    }

    fn operands(&self) -> &[Value] {
        &self.operands
    }

    async fn eval(&self, _args: Vec<Value>, ctx: EvalContext) -> PrimitiveResult<Value> {
        let parts = LoopParts {
            init: Some(&self.operands[0]),
            condition: &self.operands[1],
            step: Some(&self.operands[2]),
            body: &self.operands[3],
        };
        run_loop(parts, &ctx, &self.instance).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PrimitiveError;
    use crate::execution_tree::{AccessVariable, Store};
    use crate::frame::Frame;
    use crate::kernels::arithmetic;
    use crate::kernels::comparison;
    use std::time::Duration;
    use tokio::time::Instant;

    fn var(name: &str) -> Value {
        AccessVariable::create(name, PrimitiveInstance::anonymous("access-variable")).into()
    }

    fn increment(name: &str) -> Value {
        let sum = (arithmetic::ADD_SPEC.create)(vec![var(name), Value::from(1_i64)], PrimitiveInstance::anonymous("__add")).unwrap();
        Store::create(vec![var(name), sum.into()], PrimitiveInstance::anonymous("store")).unwrap().into()
    }

    fn less_than(name: &str, limit: i64) -> Value {
        (comparison::LT_SPEC.create)(vec![var(name), Value::from(limit)], PrimitiveInstance::anonymous("__lt")).unwrap().into()
    }

    #[tokio::test]
    async fn test_while_runs_exactly_n_times() {
        let globals = Frame::root();
        globals.define("step", Value::from(0_i64));
        let body = increment("step");
        let body_node = body.as_primitive().unwrap().clone();
        let node = While::create(vec![less_than("step", 3), body], PrimitiveInstance::anonymous("while")).unwrap();

        let result = node.eval_value(&EvalContext::new(globals.clone())).await.unwrap();
        assert_eq!(result, Value::Nil);
        assert_eq!(globals.lookup("step"), Some(Value::from(3_i64)));
        assert_eq!(body_node.instance().stats().count(), 3);
    }

    #[tokio::test]
    async fn test_for_returns_last_body_value() {
        let globals = Frame::root();
        globals.define("i", Value::Nil);
        let init = Store::create(vec![var("i"), Value::from(0_i64)], PrimitiveInstance::anonymous("store")).unwrap();
        let body = (arithmetic::MUL_SPEC.create)(vec![var("i"), Value::from(10_i64)], PrimitiveInstance::anonymous("__mul")).unwrap();
        let node = For::create(vec![init.into(), less_than("i", 4), increment("i"), body.into()], PrimitiveInstance::anonymous("for")).unwrap();

        let result = node.eval_value(&EvalContext::new(globals)).await.unwrap();
        assert_eq!(result, Value::from(30_i64));
    }

    #[tokio::test]
    async fn test_body_never_runs() {
        let node = While::create(vec![Value::from(false), Value::from(1_i64)], PrimitiveInstance::anonymous("while")).unwrap();
        assert_eq!(node.eval_value(&EvalContext::new(Frame::root())).await.unwrap(), Value::Nil);
    }

    #[tokio::test]
    async fn test_deadline_stops_endless_loop() {
        let ctx = EvalContext::new(Frame::root()).with_deadline(Instant::now() + Duration::from_millis(20));
        let node = While::create(vec![Value::from(true), Value::from(1_i64)], PrimitiveInstance::anonymous("while")).unwrap();
        let error = node.eval_value(&ctx).await.unwrap_err();
        assert!(matches!(error, PrimitiveError::Timeout { .. }));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_outer_timeout_cancels_endless_loop() {
        let globals = Frame::root();
        globals.define("c", Value::from(0_i64));
        let node = While::create(vec![Value::from(true), increment("c")], PrimitiveInstance::anonymous("while")).unwrap();
        let ctx = EvalContext::new(globals.clone());

        let outcome = tokio::time::timeout(Duration::from_millis(50), node.eval_value(&ctx)).await;
        assert!(outcome.is_err());
        assert!(globals.lookup("c").and_then(|c| c.as_i64()).is_some_and(|c| c > 0));
    }
}
