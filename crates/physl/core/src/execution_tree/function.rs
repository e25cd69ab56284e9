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

//! User functions: lambdas, closures over frames, and calls.
//!
//! Evaluating a [`Lambda`] produces a [`TargetReference`], a closure holding
//! the frame it was created in plus any pre-bound arguments. Invoking a
//! closure binds its parameters in a fresh child of the captured frame, so
//! recursive and concurrent calls never share activation state.
//!
//! A registered primitive named without a call, as in `map(len, xs)`, becomes
//! an [`AccessFunction`]: invoking it creates the primitive over the call
//! arguments and evaluates it.

use crate::context::{EvalContext, EvalMode};
use crate::error::{PrimitiveError, PrimitiveResult};
use crate::frame::{Frame, Scope};
use crate::primitive::{value_operand, value_operands, ExpressionTopology, Primitive, PrimitiveHandle, PrimitiveInstance, PrimitiveSpec};
use crate::value::Value;
use async_trait::async_trait;
use std::sync::{Arc, Weak};
use tracing::trace;

#[derive(Debug)]
pub struct Lambda {
    instance: PrimitiveInstance,
    name: String,
    params: Vec<String>,
    operands: Vec<Value>,
    this: Weak<Lambda>,
}

impl Lambda {
    /// `name` labels call-stack entries; anonymous lambdas use "lambda"
    pub fn create(name: impl Into<String>, params: Vec<String>, body: Value, instance: PrimitiveInstance) -> PrimitiveResult<PrimitiveHandle> {
        for (i, param) in params.iter().enumerate() {
            if params[..i].contains(param) {
                return Err(instance.invalid_operand(format!("duplicate parameter '{}'", param)));
            }
        }
        let name = name.into();
        let lambda: Arc<Lambda> = Arc::new_cyclic(|this| Lambda {
            instance,
            name,
            params,
            operands: vec![body],
            this: this.clone(),
        });
        Ok(PrimitiveHandle::from_arc(lambda))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    fn closure(&self, frame: &Arc<Frame>) -> PrimitiveResult<TargetReference> {
        let lambda = self
            .this
            .upgrade()
            .ok_or_else(|| PrimitiveError::Internal(format!("{}: lambda dropped during evaluation", self.instance)))?;
        Ok(TargetReference::new(lambda, Captured::Strong(Arc::clone(frame)), Vec::new()))
    }

    fn check_arity(&self, count: usize) -> PrimitiveResult<()> {
        if count != self.params.len() {
            return Err(self.instance.arity_error(format!("'{}' expects {} arguments, got {}", self.name, self.params.len(), count)));
        }
        Ok(())
    }

    async fn invoke(&self, captured: Arc<Frame>, args: Vec<Value>, ctx: EvalContext) -> PrimitiveResult<Value> {
        self.check_arity(args.len())?;

        let activation = Frame::child(&captured);
        for (param, arg) in self.params.iter().zip(args) {
            activation.define(param.clone(), arg);
        }

        let ctx = ctx
            .with_frame(activation)
            .remove_mode(EvalMode::NO_EVAL_LAMBDAS)
            .remove_mode(EvalMode::NO_WRAP_FUNCTIONS)
            .enter_call(&self.name, &self.instance.to_string())?;
        trace!(function = %self.name, depth = ctx.depth(), "invoke");
        value_operand(&self.operands[0], &ctx).await
    }
}

#[async_trait]
impl Primitive for Lambda {
    fn instance(&self) -> &PrimitiveInstance {
        &self.instance
    }

    fn operands(&self) -> &[Value] {
        &self.operands
    }

    fn check(&self, args: &[Value], _ctx: &EvalContext) -> PrimitiveResult<()> {
        if args.is_empty() { Ok(()) } else { self.check_arity(args.len()) }
    }

    async fn eval(&self, args: Vec<Value>, ctx: EvalContext) -> PrimitiveResult<Value> {
        if args.is_empty() && ctx.mode().contains(EvalMode::NO_WRAP_FUNCTIONS) {
            if let Some(this) = self.this.upgrade() {
                return Ok(Value::Primitive(PrimitiveHandle::from_arc(this)));
            }
        }

        let closure = self.closure(ctx.frame())?;
        if args.is_empty() {
            return Ok(Value::Primitive(PrimitiveHandle::new(closure)));
        }
        closure.invoke(args, ctx).await
    }
}

#[derive(Debug, Clone)]
enum Captured {
    Strong(Arc<Frame>),
    /// Stored in a frame on the captured chain: the scopes below that frame,
    /// outermost first
    Detached(Vec<Arc<Scope>>),
}

/// An invocable closure: a lambda, its captured frame and pre-bound arguments
#[derive(Debug, Clone)]
pub struct TargetReference {
    instance: PrimitiveInstance,
    lambda: Arc<Lambda>,
    captured: Captured,
    bound_args: Vec<Value>,
}

impl TargetReference {
    fn new(lambda: Arc<Lambda>, captured: Captured, bound_args: Vec<Value>) -> Self {
        let instance = PrimitiveInstance::new("target-reference", format!("target-reference${}", lambda.instance.name()), lambda.instance.codename());
        Self {
            instance,
            lambda,
            captured,
            bound_args,
        }
    }

    pub fn function_name(&self) -> &str {
        &self.lambda.name
    }

    pub fn bound_args(&self) -> &[Value] {
        &self.bound_args
    }

    /// Parameters still expecting arguments
    pub fn remaining_arity(&self) -> usize {
        self.lambda.params.len().saturating_sub(self.bound_args.len())
    }

    /// Copy of this closure that does not keep `frame` alive, if `frame` is on
    /// the captured chain; used when the closure is stored into `frame`
    pub fn detach_from(&self, frame: &Arc<Frame>) -> Option<PrimitiveHandle> {
        match &self.captured {
            Captured::Strong(captured) => captured.scopes_below(frame).map(|scopes| {
                PrimitiveHandle::new(Self {
                    captured: Captured::Detached(scopes),
                    ..self.clone()
                })
            }),
            Captured::Detached(_) => None,
        }
    }

    /// Invocable copy of a detached closure read back from `holder`
    pub fn reattach(&self, holder: &Arc<Frame>) -> Option<PrimitiveHandle> {
        match &self.captured {
            Captured::Detached(scopes) => Some(PrimitiveHandle::new(Self {
                captured: Captured::Strong(holder.rebuild(scopes)),
                ..self.clone()
            })),
            Captured::Strong(_) => None,
        }
    }

    async fn invoke(&self, args: Vec<Value>, ctx: EvalContext) -> PrimitiveResult<Value> {
        let frame = match &self.captured {
            Captured::Strong(frame) => Arc::clone(frame),
            Captured::Detached(_) => return Err(PrimitiveError::Internal(format!("{}: closure invoked outside the frame holding it", self.instance))),
        };
        let mut all_args = self.bound_args.clone();
        all_args.extend(args);
        self.lambda.invoke(frame, all_args, ctx).await
    }
}

#[async_trait]
impl Primitive for TargetReference {
    fn instance(&self) -> &PrimitiveInstance {
        &self.instance
    }

    fn check(&self, args: &[Value], ctx: &EvalContext) -> PrimitiveResult<()> {
        let total = self.bound_args.len() + args.len();
        let binding = ctx.mode().contains(EvalMode::NO_EVAL_LAMBDAS);
        if (binding && total > self.lambda.params.len()) || (!binding && total != self.lambda.params.len()) {
            return Err(self.lambda.instance.arity_error(format!("'{}' expects {} arguments, got {}", self.lambda.name, self.lambda.params.len(), total)));
        }
        Ok(())
    }

    async fn eval(&self, args: Vec<Value>, ctx: EvalContext) -> PrimitiveResult<Value> {
        if ctx.mode().contains(EvalMode::NO_EVAL_LAMBDAS) {
            return Ok(Value::Primitive(self.bind(args)?));
        }
        self.invoke(args, ctx).await
    }

    fn bind(&self, args: Vec<Value>) -> PrimitiveResult<PrimitiveHandle> {
        if self.bound_args.len() + args.len() > self.lambda.params.len() {
            return Err(self.lambda.instance.arity_error(format!("too many arguments bound to '{}'", self.lambda.name)));
        }
        let mut bound_args = self.bound_args.clone();
        bound_args.extend(args);
        Ok(PrimitiveHandle::new(Self { bound_args, ..self.clone() }))
    }

    fn as_closure(&self) -> Option<&TargetReference> {
        Some(self)
    }

    fn topology(&self) -> ExpressionTopology {
        ExpressionTopology::new(self.instance.name(), vec![self.lambda.topology()])
    }
}

/// A registered primitive used as a function value
#[derive(Debug, Clone)]
pub struct AccessFunction {
    instance: PrimitiveInstance,
    spec: PrimitiveSpec,
    bound_args: Vec<Value>,
}

impl AccessFunction {
    pub fn create(spec: PrimitiveSpec, instance: PrimitiveInstance) -> PrimitiveHandle {
        PrimitiveHandle::new(Self {
            instance,
            spec,
            bound_args: Vec::new(),
        })
    }

    async fn invoke(&self, args: Vec<Value>, ctx: EvalContext) -> PrimitiveResult<Value> {
        let mut operands = self.bound_args.clone();
        operands.extend(args);
        let instance = PrimitiveInstance::new(self.spec.name, format!("{}${}", self.spec.name, self.instance.name()), self.instance.codename());
        let node = (self.spec.create)(operands, instance)?;
        trace!(primitive = self.spec.name, "invoke by reference");
        node.eval_value(&ctx.remove_mode(EvalMode::NO_EVAL_LAMBDAS)).await
    }
}

#[async_trait]
impl Primitive for AccessFunction {
    fn instance(&self) -> &PrimitiveInstance {
        &self.instance
    }

    async fn eval(&self, args: Vec<Value>, ctx: EvalContext) -> PrimitiveResult<Value> {
        if args.is_empty() || ctx.mode().contains(EvalMode::NO_EVAL_LAMBDAS) {
            return Ok(Value::Primitive(self.bind(args)?));
        }
        self.invoke(args, ctx).await
    }

    fn bind(&self, args: Vec<Value>) -> PrimitiveResult<PrimitiveHandle> {
        let mut bound_args = self.bound_args.clone();
        bound_args.extend(args);
        Ok(PrimitiveHandle::new(Self { bound_args, ..self.clone() }))
    }

    fn is_invocable(&self) -> bool {
        true
    }
}

/// `f(args...)` where `f` is a variable or expression yielding a closure
#[derive(Debug)]
pub struct CallFunction {
    instance: PrimitiveInstance,
    operands: Vec<Value>,
}

impl CallFunction {
    /// Operands are the callee followed by the call arguments
    pub fn create(operands: Vec<Value>, instance: PrimitiveInstance) -> PrimitiveResult<PrimitiveHandle> {
        if operands.is_empty() {
            return Err(instance.arity_error("a call needs a callee"));
        }
        Ok(PrimitiveHandle::new(Self { instance, operands }))
    }
}

#[async_trait]
impl Primitive for CallFunction {
    fn instance(&self) -> &PrimitiveInstance {
        &self.instance
    }

    fn operands(&self) -> &[Value] {
        &self.operands
    }

    async fn eval(&self, _args: Vec<Value>, ctx: EvalContext) -> PrimitiveResult<Value> {
        let call_ctx = ctx.remove_mode(EvalMode::NO_EVAL_LAMBDAS);
        let callee_ctx = ctx.add_mode(EvalMode::NO_EVAL_LAMBDAS);
        let (callee, args) = futures::try_join!(value_operand(&self.operands[0], &callee_ctx), value_operands(&self.operands[1..], &call_ctx))?;

        match callee {
            Value::Primitive(callee) if callee.is_invocable() => callee.eval(args, &call_ctx)?.await,
            other => Err(self.instance.type_error(format!("must be an invocable object, got {}", other.type_name()))),
        }
    }
}
