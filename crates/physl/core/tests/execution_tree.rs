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

use physl_core::execution_tree::{AccessVariable, Block, CallFunction, DefineVariable, Filter, Lambda, ParallelBlock, While};
use physl_core::{builtin_primitives, EvalContext, Frame, PrimitiveHandle, PrimitiveInstance, PrimitiveSpec, Value};

fn spec(name: &str) -> PrimitiveSpec {
    builtin_primitives().into_iter().find(|spec| spec.name == name).unwrap()
}

fn node(name: &str, operands: Vec<Value>) -> Value {
    (spec(name).create)(operands, PrimitiveInstance::anonymous(name)).unwrap().into()
}

fn var(name: &str) -> Value {
    AccessVariable::create(name, PrimitiveInstance::anonymous("access-variable")).into()
}

fn lambda(params: &[&str], body: Value) -> PrimitiveHandle {
    Lambda::create("lambda", params.iter().map(|p| p.to_string()).collect(), body, PrimitiveInstance::anonymous("lambda")).unwrap()
}

#[tokio::test]
async fn test_filter_with_lambda() {
    let predicate = lambda(&["x"], node("__gt", vec![var("x"), Value::from(1_i64)]));
    let list = node("list", vec![Value::from(1_i64), Value::from(2_i64), Value::from(3_i64)]);
    let filter = Filter::create(vec![predicate.into(), list], PrimitiveInstance::anonymous("filter")).unwrap();

    let result = filter.eval_value(&EvalContext::new(Frame::root())).await.unwrap();
    assert_eq!(result, Value::List(vec![Value::from(2_i64), Value::from(3_i64)]));
}

#[tokio::test]
async fn test_recursive_function() {
    // define(fact, n, if(n <= 1, 1, n * fact(n - 1))), fact(5)
    let recurse = CallFunction::create(vec![var("fact"), node("__sub", vec![var("n"), Value::from(1_i64)])], PrimitiveInstance::anonymous("call-function")).unwrap();
    let body = node("if", vec![node("__le", vec![var("n"), Value::from(1_i64)]), Value::from(1_i64), node("__mul", vec![var("n"), recurse.into()])]);
    let fact = Lambda::create("fact", vec!["n".to_string()], body, PrimitiveInstance::anonymous("lambda")).unwrap();
    let define = DefineVariable::create("fact", fact.into(), PrimitiveInstance::anonymous("define-variable")).unwrap();
    let call = CallFunction::create(vec![var("fact"), Value::from(5_i64)], PrimitiveInstance::anonymous("call-function")).unwrap();
    let program = Block::create(vec![define.into(), call.into()], PrimitiveInstance::anonymous("block")).unwrap();

    let result = program.eval_value(&EvalContext::new(Frame::root())).await.unwrap();
    assert_eq!(result, Value::from(120_i64));
}

#[tokio::test]
async fn test_while_leaves_counter() {
    let globals = Frame::root();
    globals.define("step", Value::from(0_i64));

    let increment = node("store", vec![var("step"), node("__add", vec![var("step"), Value::from(1_i64)])]);
    let body = Block::create(vec![increment], PrimitiveInstance::anonymous("block")).unwrap();
    let condition = node("__lt", vec![var("step"), Value::from(3_i64)]);
    let program = While::create(vec![condition, body.clone().into()], PrimitiveInstance::anonymous("while")).unwrap();

    program.eval_value(&EvalContext::new(globals.clone())).await.unwrap();
    assert_eq!(globals.lookup("step"), Some(Value::from(3_i64)));
    assert_eq!(body.instance().stats().count(), 3);
}

#[tokio::test]
async fn test_parallel_branches_keep_private_bindings() {
    let globals = Frame::root();
    let left = DefineVariable::create("tmp", Value::from(1_i64), PrimitiveInstance::anonymous("define-variable")).unwrap();
    let right = DefineVariable::create("tmp", Value::from(2_i64), PrimitiveInstance::anonymous("define-variable")).unwrap();
    let program = ParallelBlock::create(vec![left.into(), right.into()], PrimitiveInstance::anonymous("parallel_block")).unwrap();

    assert_eq!(program.eval_value(&EvalContext::new(globals.clone())).await.unwrap(), Value::from(2_i64));
    assert!(!globals.contains("tmp"));
}

#[test]
fn test_builtin_names_are_unique() {
    let specs = builtin_primitives();
    let mut names: Vec<_> = specs.iter().map(|spec| spec.name).collect();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), specs.len());
}
