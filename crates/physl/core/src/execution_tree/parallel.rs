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

use crate::context::{EvalContext, EvalMode};
use crate::error::{PrimitiveError, PrimitiveResult};
use crate::primitive::{EvalFuture, Primitive, PrimitiveHandle, PrimitiveInstance, PrimitiveSpec};
use crate::value::Value;
use async_trait::async_trait;
use futures::future::join_all;
use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::task::JoinSet;
use tracing::debug;

pub const SPEC: PrimitiveSpec = PrimitiveSpec {
    name: "parallel_block",
    patterns: &["parallel_block(__1)"],
    create: ParallelBlock::create,
    help: "parallel_block(expr...)\n\nEvaluates all expressions concurrently, each in its own scope; yields the value of the last one.",
};

/// Run every future to completion and return the results in input order.
///
/// Futures are spawned onto the runtime unless the context asks for direct
/// execution or no runtime is available, in which case they are polled
/// concurrently on the current task.
pub(crate) async fn dispatch_all(futures: Vec<EvalFuture>, ctx: &EvalContext) -> Vec<PrimitiveResult<Value>> {
    if ctx.mode().contains(EvalMode::DIRECT_EXECUTION) || Handle::try_current().is_err() {
        return join_all(futures).await;
    }

    let count = futures.len();
    let mut tasks = JoinSet::new();
    for (index, future) in futures.into_iter().enumerate() {
        tasks.spawn(future.map(move |result| (index, result)));
    }

    let mut results: Vec<Option<PrimitiveResult<Value>>> = (0..count).map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, result)) => results[index] = Some(result),
            Err(e) => debug!("parallel task did not complete: {}", e),
        }
    }
    results
        .into_iter()
        .map(|result| result.unwrap_or_else(|| Err(PrimitiveError::Internal("parallel task did not complete".to_string()))))
        .collect()
}

/// First failure by input position, or all values
pub(crate) fn collect_results(results: Vec<PrimitiveResult<Value>>) -> PrimitiveResult<Vec<Value>> {
    results.into_iter().collect()
}

/// Defer a node evaluation so synchronous failures surface through the future
pub(crate) fn deferred(node: PrimitiveHandle, args: Vec<Value>, ctx: EvalContext) -> EvalFuture {
    async move { node.eval(args, &ctx)?.await }.boxed()
}

#[derive(Debug)]
pub struct ParallelBlock {
    instance: PrimitiveInstance,
    operands: Vec<Value>,
}

impl ParallelBlock {
    pub fn create(operands: Vec<Value>, instance: PrimitiveInstance) -> PrimitiveResult<PrimitiveHandle> {
        if operands.is_empty() {
            return Err(instance.arity_error("parallel_block needs at least one expression"));
        }
        Ok(PrimitiveHandle::new(Self { instance, operands }))
    }
}

#[async_trait]
impl Primitive for ParallelBlock {
    fn instance(&self) -> &PrimitiveInstance {
        &self.instance
    }

    fn operands(&self) -> &[Value] {
        &self.operands
    }

    async fn eval(&self, _args: Vec<Value>, ctx: EvalContext) -> PrimitiveResult<Value> {
        let branches = self
            .operands
            .iter()
            .map(|operand| match operand {
                Value::Primitive(node) => deferred(node.clone(), Vec::new(), ctx.with_child_frame()),
                constant => futures::future::ready(Ok(constant.clone())).boxed(),
            })
            .collect();

        let mut values = collect_results(dispatch_all(branches, &ctx).await)?;
        Ok(values.pop().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution_tree::{AccessVariable, DefineVariable};
    use crate::frame::Frame;

    fn define(name: &str, value: i64) -> Value {
        DefineVariable::create(name, Value::from(value), PrimitiveInstance::anonymous("define-variable")).unwrap().into()
    }

    fn unbound(name: &str) -> Value {
        AccessVariable::create(name, PrimitiveInstance::anonymous("access-variable")).into()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_branches_have_private_scopes() {
        let globals = Frame::root();
        let node = ParallelBlock::create(vec![define("a", 1), define("b", 2)], PrimitiveInstance::anonymous("parallel_block")).unwrap();
        let result = node.eval_value(&EvalContext::new(globals.clone())).await.unwrap();
        assert_eq!(result, Value::from(2_i64));
        assert!(!globals.is_bound("a"));
        assert!(!globals.is_bound("b"));
    }

    #[tokio::test]
    async fn test_lowest_index_failure_after_all_branches() {
        let first = unbound("first");
        let counted = define("c", 3);
        let counted_node = counted.as_primitive().unwrap().clone();
        let node = ParallelBlock::create(vec![first, counted, unbound("second")], PrimitiveInstance::anonymous("parallel_block")).unwrap();

        let error = node.eval_value(&EvalContext::new(Frame::root())).await.unwrap_err();
        assert!(matches!(error, PrimitiveError::UnboundVariable { ref name, .. } if name == "first"));
        assert_eq!(counted_node.instance().stats().count(), 1);
    }

    #[tokio::test]
    async fn test_direct_execution() {
        let ctx = EvalContext::new(Frame::root()).add_mode(EvalMode::DIRECT_EXECUTION);
        let node = ParallelBlock::create(vec![Value::from(1_i64), define("x", 5)], PrimitiveInstance::anonymous("parallel_block")).unwrap();
        assert_eq!(node.eval_value(&ctx).await.unwrap(), Value::from(5_i64));
    }

    #[test]
    fn test_needs_operands() {
        assert!(ParallelBlock::create(vec![], PrimitiveInstance::anonymous("parallel_block")).is_err());
    }
}
