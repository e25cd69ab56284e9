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

//! Primitives taking a function as their first operand

use super::conditional::condition;
use super::parallel::{collect_results, deferred, dispatch_all};
use crate::context::EvalContext;
use crate::error::PrimitiveResult;
use crate::primitive::{invocable_operand, value_operand, value_operands, Primitive, PrimitiveHandle, PrimitiveInstance, PrimitiveSpec};
use crate::value::Value;
use async_trait::async_trait;
use futures::future::try_join_all;

pub const FILTER_SPEC: PrimitiveSpec = PrimitiveSpec {
    name: "filter",
    patterns: &["filter(_1, _2)"],
    create: Filter::create,
    help: "filter(f, list)\n\nElements of `list` for which `f(element)` is true.",
};

pub const MAP_SPEC: PrimitiveSpec = PrimitiveSpec {
    name: "map",
    patterns: &["map(_1, __2)"],
    create: Map::create,
    help: "map(f, list...)\n\nApplies `f` element-wise; with several lists, `f` receives one element of each.",
};

pub const FOLD_LEFT_SPEC: PrimitiveSpec = PrimitiveSpec {
    name: "fold_left",
    patterns: &["fold_left(_1, _2, _3)"],
    create: FoldLeft::create,
    help: "fold_left(f, init, list)\n\nReduces `list` from the left: f(f(init, x0), x1)...",
};

pub const FOLD_RIGHT_SPEC: PrimitiveSpec = PrimitiveSpec {
    name: "fold_right",
    patterns: &["fold_right(_1, _2, _3)"],
    create: FoldRight::create,
    help: "fold_right(f, init, list)\n\nReduces `list` from the right: f(x0, f(x1, ... f(xn, init)))",
};

pub const PARALLEL_FOR_EACH_SPEC: PrimitiveSpec = PrimitiveSpec {
    name: "parallel_for_each",
    patterns: &["parallel_for_each(_1, _2)"],
    create: ParallelForEach::create,
    help: "parallel_for_each(f, list)\n\nInvokes `f` once per element, all concurrently; returns nil once every call has finished.",
};

/// The function and the evaluated list operands
async fn function_and_lists(operands: &[Value], ctx: &EvalContext, instance: &PrimitiveInstance) -> PrimitiveResult<(PrimitiveHandle, Vec<Vec<Value>>)> {
    let (function, lists) = futures::try_join!(invocable_operand(&operands[0], ctx, instance), value_operands(&operands[1..], ctx))?;
    let lists = lists.into_iter().map(|list| elements(list, instance)).collect::<PrimitiveResult<Vec<_>>>()?;
    Ok((function, lists))
}

fn elements(value: Value, instance: &PrimitiveInstance) -> PrimitiveResult<Vec<Value>> {
    let type_name = value.type_name();
    value
        .into_elements()
        .ok_or_else(|| instance.type_error(format!("expected a list or a vector, got {}", type_name)))
}

#[derive(Debug)]
pub struct Filter {
    instance: PrimitiveInstance,
    operands: Vec<Value>,
}

impl Filter {
    pub fn create(operands: Vec<Value>, instance: PrimitiveInstance) -> PrimitiveResult<PrimitiveHandle> {
        instance.expect_operands(&operands, 2)?;
        instance.expect_valid(&operands)?;
        Ok(PrimitiveHandle::new(Self { instance, operands }))
    }
}

#[async_trait]
impl Primitive for Filter {
    fn instance(&self) -> &PrimitiveInstance {
        &self.instance
    }

    fn operands(&self) -> &[Value] {
        &self.operands
    }

    async fn eval(&self, _args: Vec<Value>, ctx: EvalContext) -> PrimitiveResult<Value> {
        let (function, mut lists) = function_and_lists(&self.operands, &ctx, &self.instance).await?;
        let items = lists.pop().unwrap_or_default();

        let mut pending = Vec::with_capacity(items.len());
        for item in &items {
            pending.push(function.eval(vec![item.clone()], &ctx)?);
        }
        let keep = try_join_all(pending).await?;

        let mut selected = Vec::new();
        for (item, keep) in items.into_iter().zip(keep) {
            if condition(&keep, &self.instance)? {
                selected.push(item);
            }
        }
        Ok(Value::List(selected))
    }
}

#[derive(Debug)]
pub struct Map {
    instance: PrimitiveInstance,
    operands: Vec<Value>,
}

impl Map {
    pub fn create(operands: Vec<Value>, instance: PrimitiveInstance) -> PrimitiveResult<PrimitiveHandle> {
        if operands.len() < 2 {
            return Err(instance.arity_error("map needs a function and at least one list"));
        }
        instance.expect_valid(&operands)?;
        Ok(PrimitiveHandle::new(Self { instance, operands }))
    }
}

#[async_trait]
impl Primitive for Map {
    fn instance(&self) -> &PrimitiveInstance {
        &self.instance
    }

    fn operands(&self) -> &[Value] {
        &self.operands
    }

    async fn eval(&self, _args: Vec<Value>, ctx: EvalContext) -> PrimitiveResult<Value> {
        let (function, lists) = function_and_lists(&self.operands, &ctx, &self.instance).await?;
        let len = lists[0].len();
        if lists.iter().any(|list| list.len() != len) {
            return Err(self.instance.type_error("all lists passed to map must have the same length"));
        }

        let mut pending = Vec::with_capacity(len);
        for i in 0..len {
            let args = lists.iter().map(|list| list[i].clone()).collect();
            pending.push(function.eval(args, &ctx)?);
        }
        Ok(Value::List(try_join_all(pending).await?))
    }
}

#[derive(Debug)]
pub struct FoldLeft {
    instance: PrimitiveInstance,
    operands: Vec<Value>,
}

impl FoldLeft {
    pub fn create(operands: Vec<Value>, instance: PrimitiveInstance) -> PrimitiveResult<PrimitiveHandle> {
        instance.expect_operands(&operands, 3)?;
        Ok(PrimitiveHandle::new(Self { instance, operands }))
    }
}

#[async_trait]
impl Primitive for FoldLeft {
    fn instance(&self) -> &PrimitiveInstance {
        &self.instance
    }

    fn operands(&self) -> &[Value] {
        &self.operands
    }

    async fn eval(&self, _args: Vec<Value>, ctx: EvalContext) -> PrimitiveResult<Value> {
        let (function, init, list) = futures::try_join!(
            invocable_operand(&self.operands[0], &ctx, &self.instance),
            value_operand(&self.operands[1], &ctx),
            value_operand(&self.operands[2], &ctx),
        )?;
        let mut acc = init;
        for item in elements(list, &self.instance)? {
            acc = function.eval(vec![acc, item], &ctx)?.await?;
        }
        Ok(acc)
    }
}

#[derive(Debug)]
pub struct FoldRight {
    instance: PrimitiveInstance,
    operands: Vec<Value>,
}

impl FoldRight {
    pub fn create(operands: Vec<Value>, instance: PrimitiveInstance) -> PrimitiveResult<PrimitiveHandle> {
        instance.expect_operands(&operands, 3)?;
        Ok(PrimitiveHandle::new(Self { instance, operands }))
    }
}

#[async_trait]
impl Primitive for FoldRight {
    fn instance(&self) -> &PrimitiveInstance {
        &self.instance
    }

    fn operands(&self) -> &[Value] {
        &self.operands
    }

    async fn eval(&self, _args: Vec<Value>, ctx: EvalContext) -> PrimitiveResult<Value> {
        let (function, init, list) = futures::try_join!(
            invocable_operand(&self.operands[0], &ctx, &self.instance),
            value_operand(&self.operands[1], &ctx),
            value_operand(&self.operands[2], &ctx),
        )?;
        let mut acc = init;
        for item in elements(list, &self.instance)?.into_iter().rev() {
            acc = function.eval(vec![item, acc], &ctx)?.await?;
        }
        Ok(acc)
    }
}

#[derive(Debug)]
pub struct ParallelForEach {
    instance: PrimitiveInstance,
    operands: Vec<Value>,
}

impl ParallelForEach {
    pub fn create(operands: Vec<Value>, instance: PrimitiveInstance) -> PrimitiveResult<PrimitiveHandle> {
        instance.expect_operands(&operands, 2)?;
        instance.expect_valid(&operands)?;
        Ok(PrimitiveHandle::new(Self { instance, operands }))
    }
}

#[async_trait]
impl Primitive for ParallelForEach {
    fn instance(&self) -> &PrimitiveInstance {
        &self.instance
    }

    fn operands(&self) -> &[Value] {
        &self.operands
    }

    async fn eval(&self, _args: Vec<Value>, ctx: EvalContext) -> PrimitiveResult<Value> {
        let (function, mut lists) = function_and_lists(&self.operands, &ctx, &self.instance).await?;
        let calls = lists
            .pop()
            .unwrap_or_default()
            .into_iter()
            .map(|item| deferred(function.clone(), vec![item], ctx.clone()))
            .collect();
        collect_results(dispatch_all(calls, &ctx).await)?;
        Ok(Value::Nil)
    }
}
