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

//! The uniform node contract of the execution tree.
//!
//! Every operation (arithmetic, control flow, I/O, user function) is a
//! [`Primitive`]. Nodes are shared through [`PrimitiveHandle`]; evaluating a
//! handle first runs the node's synchronous precondition check and only then
//! hands out the future doing the actual work.

pub mod topology;

pub use topology::ExpressionTopology;

use crate::context::EvalContext;
use crate::error::{PrimitiveError, PrimitiveResult};
use crate::execution_tree::TargetReference;
use crate::value::Value;
use async_trait::async_trait;
use futures::future::{try_join_all, BoxFuture};
use futures::FutureExt;
use metrics::counter;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::trace;

/// Future returned by [`PrimitiveHandle::eval`]
pub type EvalFuture = BoxFuture<'static, PrimitiveResult<Value>>;

/// Factory creating a node from its compiled operands
pub type PrimitiveFactory = fn(Vec<Value>, PrimitiveInstance) -> PrimitiveResult<PrimitiveHandle>;

/// Registration record of a primitive type
#[derive(Clone, Copy)]
pub struct PrimitiveSpec {
    /// Registered type name, also the first part of every instance name
    pub name: &'static str,
    /// Textual call templates, e.g. `"shape(_1, _2)"`
    pub patterns: &'static [&'static str],
    pub create: PrimitiveFactory,
    pub help: &'static str,
}

impl fmt::Debug for PrimitiveSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrimitiveSpec").field("name", &self.name).field("patterns", &self.patterns).finish()
    }
}

/// Evaluation counters of one node instance
#[derive(Debug, Default)]
pub struct EvalStats {
    count: AtomicU64,
    nanos: AtomicU64,
}

impl EvalStats {
    pub fn record(&self, elapsed: Duration) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.nanos.fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::Relaxed))
    }
}

/// Diagnostic identity of a node: type, unique instance name and source codename
#[derive(Debug, Clone)]
pub struct PrimitiveInstance {
    type_name: String,
    name: String,
    codename: String,
    stats: Arc<EvalStats>,
}

impl PrimitiveInstance {
    pub fn new(type_name: impl Into<String>, name: impl Into<String>, codename: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            name: name.into(),
            codename: codename.into(),
            stats: Arc::new(EvalStats::default()),
        }
    }

    /// Instance for nodes created outside the compiler
    pub fn anonymous(type_name: &str) -> Self {
        Self::new(type_name, format!("{}$0$<internal>", type_name), "<unknown>")
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn codename(&self) -> &str {
        &self.codename
    }

    pub fn stats(&self) -> &Arc<EvalStats> {
        &self.stats
    }

    pub fn arity_error(&self, message: impl Into<String>) -> PrimitiveError {
        PrimitiveError::Arity {
            instance: self.to_string(),
            message: message.into(),
        }
    }

    pub fn invalid_operand(&self, message: impl Into<String>) -> PrimitiveError {
        PrimitiveError::InvalidOperand {
            instance: self.to_string(),
            message: message.into(),
        }
    }

    pub fn type_error(&self, message: impl Into<String>) -> PrimitiveError {
        PrimitiveError::Type {
            instance: self.to_string(),
            message: message.into(),
        }
    }

    pub fn unbound(&self, name: impl Into<String>) -> PrimitiveError {
        PrimitiveError::UnboundVariable {
            instance: self.to_string(),
            name: name.into(),
        }
    }

    pub fn io_error(&self, message: impl Into<String>, reason: impl fmt::Display) -> PrimitiveError {
        PrimitiveError::RuntimeIo {
            instance: self.to_string(),
            message: message.into(),
            reason: reason.to_string(),
        }
    }

    /// Fails unless exactly `expected` operands are present
    pub fn expect_operands(&self, operands: &[Value], expected: usize) -> PrimitiveResult<()> {
        if operands.len() != expected {
            return Err(self.arity_error(format!("expected {} operands, got {}", expected, operands.len())));
        }
        Ok(())
    }

    /// Fails unless the operand count lies in `min..=max`
    pub fn expect_operand_range(&self, operands: &[Value], min: usize, max: usize) -> PrimitiveResult<()> {
        if operands.len() < min || operands.len() > max {
            return Err(self.arity_error(format!("expected between {} and {} operands, got {}", min, max, operands.len())));
        }
        Ok(())
    }

    /// Fails if any operand is nil
    pub fn expect_valid(&self, operands: &[Value]) -> PrimitiveResult<()> {
        match operands.iter().position(Value::is_nil) {
            Some(index) => Err(self.invalid_operand(format!("operand {} must not be nil", index))),
            None => Ok(()),
        }
    }
}

impl fmt::Display for PrimitiveInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.codename)
    }
}

#[async_trait]
pub trait Primitive: Send + Sync + fmt::Debug {
    fn instance(&self) -> &PrimitiveInstance;

    /// Compiled operands: constants or child nodes
    fn operands(&self) -> &[Value] {
        &[]
    }

    /// Precondition check run before any future is created
    fn check(&self, _args: &[Value], _ctx: &EvalContext) -> PrimitiveResult<()> {
        Ok(())
    }

    /// Evaluate the node with call arguments
    async fn eval(&self, args: Vec<Value>, ctx: EvalContext) -> PrimitiveResult<Value>;

    /// True for nodes that can be the target of `store`
    fn is_bindable(&self) -> bool {
        false
    }

    /// Replace the value this node refers to
    async fn store(&self, _value: Value, _ctx: EvalContext) -> PrimitiveResult<()> {
        Err(self.instance().type_error("target is not bindable"))
    }

    /// Update the referred value in place under the owner's lock
    fn store_with(&self, _ctx: &EvalContext, _update: &mut (dyn FnMut(&mut Value) -> PrimitiveResult<()> + Send)) -> PrimitiveResult<()> {
        Err(self.instance().type_error("target does not support in-place updates"))
    }

    /// New node with `args` pre-bound ahead of future call arguments
    fn bind(&self, _args: Vec<Value>) -> PrimitiveResult<PrimitiveHandle> {
        Err(self.instance().type_error("must be an invocable object"))
    }

    /// Closure view of invocable nodes
    fn as_closure(&self) -> Option<&TargetReference> {
        None
    }

    /// True for values that can be called with arguments
    fn is_invocable(&self) -> bool {
        self.as_closure().is_some()
    }

    fn topology(&self) -> ExpressionTopology {
        ExpressionTopology::new(self.instance().name(), self.operands().iter().filter_map(Value::as_primitive).map(PrimitiveHandle::topology).collect())
    }
}

/// Shared handle to a node
#[derive(Clone)]
pub struct PrimitiveHandle(Arc<dyn Primitive>);

impl PrimitiveHandle {
    pub fn new<P: Primitive + 'static>(primitive: P) -> Self {
        Self(Arc::new(primitive))
    }

    pub fn from_arc(primitive: Arc<dyn Primitive>) -> Self {
        Self(primitive)
    }

    pub fn instance(&self) -> &PrimitiveInstance {
        self.0.instance()
    }

    pub fn name(&self) -> &str {
        self.0.instance().name()
    }

    pub fn type_name(&self) -> &str {
        self.0.instance().type_name()
    }

    pub fn operands(&self) -> &[Value] {
        self.0.operands()
    }

    pub fn ptr_eq(&self, other: &PrimitiveHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Start evaluating the node.
    ///
    /// Deadline and precondition failures are returned directly; everything
    /// else surfaces through the returned future.
    pub fn eval(&self, args: Vec<Value>, ctx: &EvalContext) -> PrimitiveResult<EvalFuture> {
        ctx.check_deadline(&self.instance().to_string())?;
        self.0.check(&args, ctx)?;

        let node = Arc::clone(&self.0);
        let ctx = ctx.clone();
        trace!(instance = node.instance().name(), mode = %ctx.mode(), "dispatch");
        Ok(async move {
            let started = Instant::now();
            let result = node.eval(args, ctx).await;
            let instance = node.instance();
            instance.stats.record(started.elapsed());
            counter!("physl_primitive_evaluations_total", 1, "primitive" => instance.type_name.clone());
            result
        }
        .boxed())
    }

    /// Evaluate without arguments
    pub async fn eval_value(&self, ctx: &EvalContext) -> PrimitiveResult<Value> {
        self.eval(Vec::new(), ctx)?.await
    }

    pub fn is_bindable(&self) -> bool {
        self.0.is_bindable()
    }

    pub async fn store(&self, value: Value, ctx: &EvalContext) -> PrimitiveResult<()> {
        ctx.check_deadline(&self.instance().to_string())?;
        self.0.store(value, ctx.clone()).await
    }

    pub fn store_with(&self, ctx: &EvalContext, update: &mut (dyn FnMut(&mut Value) -> PrimitiveResult<()> + Send)) -> PrimitiveResult<()> {
        self.0.store_with(ctx, update)
    }

    pub fn bind(&self, args: Vec<Value>) -> PrimitiveResult<PrimitiveHandle> {
        self.0.bind(args)
    }

    pub fn as_closure(&self) -> Option<&TargetReference> {
        self.0.as_closure()
    }

    /// True for values that can be called with arguments
    pub fn is_invocable(&self) -> bool {
        self.0.is_invocable()
    }

    pub fn topology(&self) -> ExpressionTopology {
        self.0.topology()
    }

    /// Visit this node and every node reachable through its operands
    pub fn walk(&self, visit: &mut dyn FnMut(&PrimitiveHandle)) {
        visit(self);
        for operand in self.0.operands() {
            if let Value::Primitive(child) = operand {
                child.walk(visit);
            }
        }
    }
}

impl fmt::Debug for PrimitiveHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Evaluate an operand: child nodes are evaluated, constants are cloned
pub async fn value_operand(operand: &Value, ctx: &EvalContext) -> PrimitiveResult<Value> {
    match operand {
        Value::Primitive(node) => node.eval_value(ctx).await,
        constant => Ok(constant.clone()),
    }
}

/// Evaluate all operands concurrently, preserving their order
pub async fn value_operands(operands: &[Value], ctx: &EvalContext) -> PrimitiveResult<Vec<Value>> {
    let mut pending = Vec::with_capacity(operands.len());
    for operand in operands {
        pending.push(match operand {
            Value::Primitive(node) => node.eval(Vec::new(), ctx)?,
            constant => futures::future::ready(Ok(constant.clone())).boxed(),
        });
    }
    try_join_all(pending).await
}

/// Evaluate an operand that must yield something invocable, without invoking it
pub async fn invocable_operand(operand: &Value, ctx: &EvalContext, instance: &PrimitiveInstance) -> PrimitiveResult<PrimitiveHandle> {
    let value = value_operand(operand, &ctx.add_mode(crate::context::EvalMode::NO_EVAL_LAMBDAS)).await?;
    match value {
        Value::Primitive(handle) if handle.is_invocable() => Ok(handle),
        other => Err(instance.type_error(format!("must be an invocable object, got {}", other.type_name()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;

    #[derive(Debug)]
    struct Constant {
        instance: PrimitiveInstance,
        value: Value,
    }

    #[async_trait]
    impl Primitive for Constant {
        fn instance(&self) -> &PrimitiveInstance {
            &self.instance
        }

        fn check(&self, args: &[Value], _ctx: &EvalContext) -> PrimitiveResult<()> {
            if !args.is_empty() {
                return Err(self.instance.arity_error("constants take no arguments"));
            }
            Ok(())
        }

        async fn eval(&self, _args: Vec<Value>, _ctx: EvalContext) -> PrimitiveResult<Value> {
            Ok(self.value.clone())
        }
    }

    fn constant(value: Value) -> PrimitiveHandle {
        PrimitiveHandle::new(Constant {
            instance: PrimitiveInstance::new("constant", "constant$0$test/1:1", "test"),
            value,
        })
    }

    #[tokio::test]
    async fn test_eval_records_stats() {
        let node = constant(Value::from(7_i64));
        let ctx = EvalContext::new(Frame::root());
        assert_eq!(node.eval_value(&ctx).await.unwrap(), Value::from(7_i64));
        assert_eq!(node.eval_value(&ctx).await.unwrap(), Value::from(7_i64));
        assert_eq!(node.instance().stats().count(), 2);
    }

    #[test]
    fn test_precondition_fails_without_future() {
        let node = constant(Value::Nil);
        let ctx = EvalContext::new(Frame::root());
        let error = node.eval(vec![Value::from(1_i64)], &ctx).err().unwrap();
        assert!(matches!(error, PrimitiveError::Arity { .. }));
        assert_eq!(node.instance().stats().count(), 0);
    }

    #[tokio::test]
    async fn test_operands_keep_order() {
        let ctx = EvalContext::new(Frame::root());
        let operands = vec![constant(Value::from(1_i64)).into(), Value::from("two"), constant(Value::from(3.0)).into()];
        let values = value_operands(&operands, &ctx).await.unwrap();
        assert_eq!(values, vec![Value::from(1_i64), Value::from("two"), Value::from(3.0)]);
    }

    #[tokio::test]
    async fn test_non_invocable_operand() {
        let ctx = EvalContext::new(Frame::root());
        let instance = PrimitiveInstance::anonymous("filter");
        let error = invocable_operand(&Value::from(1_i64), &ctx, &instance).await.unwrap_err();
        assert!(error.to_string().contains("must be an invocable object"));
    }

    #[test]
    fn test_store_rejected_by_default() {
        let node = constant(Value::Nil);
        assert!(!node.is_bindable());
        assert!(node.bind(vec![]).unwrap_err().is_type_error());
        assert_eq!(node.instance().to_string(), "constant$0$test/1:1 (test)");
    }
}
