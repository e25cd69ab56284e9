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

use physl_common::PhyslConfig;
use physl_core::primitive::value_operand;
use physl_core::{EvalContext, ExpressionTopology, Frame, PrimitiveHandle, PrimitiveInstance, PrimitiveResult, Value};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Evaluation counters of one node instance, keyed by instance name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PerformanceCounter {
    pub count: u64,
    #[serde(with = "duration_nanos")]
    pub elapsed: Duration,
}

mod duration_nanos {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_nanos() as u64)
    }
}

/// A compiled snippet: its top-level expressions and the globals they run in
#[derive(Debug, Clone)]
pub struct Function {
    codename: String,
    instance: PrimitiveInstance,
    expressions: Vec<Value>,
    globals: Arc<Frame>,
    config: PhyslConfig,
}

impl Function {
    pub(crate) fn new(codename: &str, expressions: Vec<Value>, globals: Arc<Frame>, config: PhyslConfig) -> Self {
        Self {
            codename: codename.to_string(),
            instance: PrimitiveInstance::new("function", format!("function$0${}", codename), codename),
            expressions,
            globals,
            config,
        }
    }

    pub fn codename(&self) -> &str {
        &self.codename
    }

    pub fn expressions(&self) -> &[Value] {
        &self.expressions
    }

    pub fn globals(&self) -> &Arc<Frame> {
        &self.globals
    }

    /// Fresh context over the globals; the deadline starts now
    pub fn context(&self) -> EvalContext {
        EvalContext::from_config(Arc::clone(&self.globals), &self.config)
    }

    /// Evaluate every expression in order.
    ///
    /// Without arguments the last value is the result. With arguments the
    /// last value must be invocable and is called with them.
    #[instrument(skip(self, args), fields(codename = %self.codename))]
    pub async fn call(&self, args: Vec<Value>) -> PrimitiveResult<Value> {
        let ctx = self.context();
        let mut result = Value::Nil;
        for expression in &self.expressions {
            result = value_operand(expression, &ctx).await?;
        }
        if args.is_empty() {
            return Ok(result);
        }

        debug!("invoking result of {} with {} arguments", self.codename, args.len());
        match result {
            Value::Primitive(callee) if callee.is_invocable() => callee.eval(args, &ctx)?.await,
            other => Err(self.instance.type_error(format!("must be an invocable object, got {}", other.type_name()))),
        }
    }

    pub async fn run(&self) -> PrimitiveResult<Value> {
        self.call(Vec::new()).await
    }

    fn nodes(&self) -> impl Iterator<Item = &PrimitiveHandle> {
        self.expressions.iter().filter_map(Value::as_primitive)
    }

    pub fn topology(&self) -> ExpressionTopology {
        ExpressionTopology::new(self.codename.clone(), self.nodes().map(PrimitiveHandle::topology).collect())
    }

    /// Graphviz rendering of [`Function::topology`]
    pub fn to_dot(&self) -> String {
        self.topology().to_dot()
    }

    pub fn performance_counters(&self) -> BTreeMap<String, PerformanceCounter> {
        let mut counters = BTreeMap::new();
        for node in self.nodes() {
            node.walk(&mut |node: &PrimitiveHandle| {
                let stats = node.instance().stats();
                counters.insert(
                    node.name().to_string(),
                    PerformanceCounter {
                        count: stats.count(),
                        elapsed: stats.elapsed(),
                    },
                );
            });
        }
        counters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Compiler, Environment};

    fn compile(source: &str) -> Function {
        let compiler = Compiler::with_default_registry().unwrap();
        compiler.compile_source("test", source, &mut Environment::new()).unwrap()
    }

    #[tokio::test]
    async fn test_last_value_wins() {
        let function = compile("1, 2 + 3");
        assert_eq!(function.run().await.unwrap(), Value::from(5_i64));
    }

    #[tokio::test]
    async fn test_call_with_arguments() {
        let function = compile("lambda(x, y, x - y)");
        let result = function.call(vec![Value::from(10_i64), Value::from(4_i64)]).await.unwrap();
        assert_eq!(result, Value::from(6_i64));

        let not_callable = compile("42");
        let err = not_callable.call(vec![Value::from(1_i64)]).await.unwrap_err();
        assert!(err.is_type_error());
        assert!(err.to_string().contains("must be an invocable object"));
    }

    #[tokio::test]
    async fn test_counters_follow_evaluations() {
        let function = compile("define(x, 0), while(x < 3, store(x, x + 1)), x");
        function.run().await.unwrap();
        let counters = function.performance_counters();
        let loop_counter = counters.iter().find(|(name, _)| name.starts_with("while$0$main")).map(|(_, c)| c.count);
        assert_eq!(loop_counter, Some(1));
        let adds: u64 = counters.iter().filter(|(name, _)| name.starts_with("__add$")).map(|(_, c)| c.count).sum();
        assert_eq!(adds, 3);

        let json = serde_json::to_value(&counters).unwrap();
        assert_eq!(json["while$0$main/1:15"]["count"], 1);
    }

    #[test]
    fn test_empty_snippet_is_nil() {
        let function = compile("// nothing here");
        assert!(function.expressions().is_empty());
        assert_eq!(tokio_test::block_on(function.run()).unwrap(), Value::Nil);
    }

    #[test]
    fn test_topology_names() {
        let function = compile("1 + 2");
        let topology = function.topology();
        assert_eq!(topology.name, "test");
        assert_eq!(topology.children.len(), 1);
        assert!(topology.children[0].name.starts_with("__add$0$main/1:3"));
        assert!(function.to_dot().contains("digraph"));
    }
}
