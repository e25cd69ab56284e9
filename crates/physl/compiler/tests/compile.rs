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
use physl_compiler::{CompileError, Compiler, Environment, PatternKind, PatternRegistry};
use physl_core::kernels::{arithmetic, collections};
use physl_core::{ChannelPlacement, PrimitiveError, PrimitiveSpec, Value};
use std::sync::Arc;
use test_case::test_case;

fn compiler() -> Compiler {
    Compiler::with_default_registry().unwrap()
}

async fn run(source: &str) -> Result<Value, String> {
    let function = compiler().compile_source("test.physl", source, &mut Environment::new()).map_err(|e| e.to_string())?;
    function.run().await.map_err(|e| e.to_string())
}

#[tokio::test]
async fn test_addition() {
    assert_eq!(run("1 + 2").await.unwrap(), Value::from(3_i64));
}

#[tokio::test]
async fn test_filter_with_lambda() {
    let result = run("filter(lambda(x, x > 1), list(1, 2, 3))").await.unwrap();
    assert_eq!(result, Value::List(vec![Value::from(2_i64), Value::from(3_i64)]));
}

#[tokio::test]
async fn test_named_function() {
    assert_eq!(run("define(f, a, a * 2), f(21)").await.unwrap(), Value::from(42_i64));
}

#[tokio::test]
async fn test_while_over_external_variable() {
    let mut env = Environment::new();
    env.define_variable("step", Value::from(0_i64));
    let function = compiler().compile_source("loop.physl", "while(step < 3, block(store(step, step + 1)))", &mut env).unwrap();
    function.run().await.unwrap();

    assert_eq!(env.variable("step"), Some(Value::from(3_i64)));
    let counters = function.performance_counters();
    let (_, block) = counters.iter().find(|(name, _)| name.starts_with("block$0$main")).unwrap();
    assert_eq!(block.count, 3);
}

#[test_case("3" ; "int")]
#[test_case("3.5" ; "float")]
#[test_case("\"x\"" ; "string")]
#[test_case("true" ; "bool")]
#[test_case("nil" ; "nil")]
fn test_store_to_literal_is_type_error(target: &str) {
    let mut env = Environment::new();
    env.define_variable("x", Value::from(1_i64));
    let error = compiler().compile_source("test.physl", &format!("store({}, 5)", target), &mut env).unwrap_err();
    assert!(error.is_type_error());
    assert!(error.to_string().contains("store$0$main/1:1 (test.physl)"));
    assert_eq!(env.variable("x"), Some(Value::from(1_i64)));
}

#[tokio::test]
async fn test_recursion_and_forward_references() {
    assert_eq!(run("define(fact, n, if(n <= 1, 1, n * fact(n - 1))), fact(5)").await.unwrap(), Value::from(120_i64));
    assert_eq!(run("define(g, x, h(x)), define(h, x, x * 3), g(2)").await.unwrap(), Value::from(6_i64));
}

#[tokio::test]
async fn test_closures_capture_their_scope() {
    let source = "define(make, n, lambda(x, x + n)), define(add2, make(2)), add2(5)";
    assert_eq!(run(source).await.unwrap(), Value::from(7_i64));
}

#[tokio::test]
async fn test_stored_closures_release_globals() {
    let sources = [
        "define(make, n, lambda(x, x + n)), define(add2, make(2)), add2(5)",
        "define(make, n, lambda(x, x + n)), define(adders, list(make(2), make(3))), 7",
    ];
    for source in sources {
        let mut env = Environment::new();
        let function = compiler().compile_source("test.physl", source, &mut env).unwrap();
        assert_eq!(function.run().await.unwrap(), Value::from(7_i64));

        let globals = Arc::downgrade(function.globals());
        drop(function);
        drop(env);
        assert!(globals.upgrade().is_none(), "globals leaked by {source}");
    }
}

#[tokio::test]
async fn test_local_names_shadow_primitives() {
    assert_eq!(run("define(len, x, x + 1), len(2)").await.unwrap(), Value::from(3_i64));
    assert_eq!(run("len(list(1, 2))").await.unwrap(), Value::from(2_i64));
}

#[tokio::test]
async fn test_primitives_as_function_values() {
    let lengths = run("map(len, list(list(1), list(1, 2)))").await.unwrap();
    assert_eq!(lengths, Value::List(vec![Value::from(1_i64), Value::from(2_i64)]));

    let nested = run("fold_left(list, 0, list(1, 2))").await.unwrap();
    let expected = Value::List(vec![Value::List(vec![Value::from(0_i64), Value::from(1_i64)]), Value::from(2_i64)]);
    assert_eq!(nested, expected);

    assert_eq!(run("define(size, len), size(list(1, 2, 3))").await.unwrap(), Value::from(3_i64));
    assert_eq!(run("define(len, x, x + 1), map(len, list(1, 2))").await.unwrap(), Value::List(vec![Value::from(2_i64), Value::from(3_i64)]));
}

#[test]
fn test_special_forms_are_not_function_values() {
    let error = compiler().compile_source("test.physl", "map(define, list(1))", &mut Environment::new()).unwrap_err();
    assert!(matches!(error, CompileError::UnboundIdentifier { ref name, .. } if name == "define"));
}

#[tokio::test]
async fn test_globals_persist_across_compilations() {
    let compiler = compiler();
    let mut env = Environment::new();
    compiler.compile_source("first", "define(base, 40)", &mut env).unwrap().run().await.unwrap();
    let second = compiler.compile_source("second", "base + 2", &mut env).unwrap();
    assert_eq!(second.run().await.unwrap(), Value::from(42_i64));
}

#[test]
fn test_unbound_identifier() {
    let error = compiler().compile_source("test.physl", "1 + foo", &mut Environment::new()).unwrap_err();
    match error {
        CompileError::UnboundIdentifier { name, position, codename } => {
            assert_eq!(name, "foo");
            assert_eq!(position.to_string(), "1:5");
            assert_eq!(codename, "test.physl");
        }
        other => panic!("unexpected error: {other}"),
    }

    let error = compiler().compile_source("test.physl", "nothing(1)", &mut Environment::new()).unwrap_err();
    assert!(matches!(error, CompileError::UnboundIdentifier { ref name, .. } if name == "nothing"));
}

#[test]
fn test_pattern_match_failure() {
    let error = compiler().compile_source("test.physl", "shape(1, 2, 3)", &mut Environment::new()).unwrap_err();
    assert!(matches!(error, CompileError::PatternMatchFailure { .. }));
    assert!(error.to_string().contains("could not fully pattern-match: shape(1, 2, 3)"));
}

#[test]
fn test_parse_errors_carry_codename() {
    let error = compiler().compile_source("broken.physl", "f(1, 2", &mut Environment::new()).unwrap_err();
    let CompileError::Parse(parse) = error else {
        panic!("expected a parse error");
    };
    assert_eq!(parse.codename.as_deref(), Some("broken.physl"));
}

#[test_case("define(1, 2)" ; "define target is not a name")]
#[test_case("lambda()" ; "lambda without body")]
#[test_case("define(f, 1, x)" ; "parameter is not a name")]
fn test_malformed_forms(source: &str) {
    let error = compiler().compile_source("test.physl", source, &mut Environment::new()).unwrap_err();
    assert!(matches!(error, CompileError::MalformedForm { .. }), "{error}");
}

fn registry(order: &[(&'static str, PrimitiveSpec)]) -> Arc<PatternRegistry> {
    let registry = PatternRegistry::empty();
    for (template, spec) in order {
        registry.register_pattern("f", &[*template], PatternKind::Primitive(*spec), "", "test").unwrap();
    }
    Arc::new(registry)
}

async fn run_with(registry: Arc<PatternRegistry>, source: &str) -> Value {
    let function = Compiler::new(registry).compile_source("test", source, &mut Environment::new()).unwrap();
    function.run().await.unwrap()
}

#[tokio::test]
async fn test_arity_selects_pattern_in_any_order() {
    let single = ("f(_1)", collections::LIST_SPEC);
    let pair = ("f(_1, _2)", arithmetic::ADD_SPEC);

    for order in [[single, pair], [pair, single]] {
        let registry = registry(&order);
        assert_eq!(run_with(registry.clone(), "f(1, 2)").await, Value::from(3_i64));
        assert_eq!(run_with(registry, "f(1)").await, Value::List(vec![Value::from(1_i64)]));
    }
}

#[tokio::test]
async fn test_ties_go_to_the_first_registration() {
    let registry = registry(&[("f(_1, _2)", arithmetic::SUB_SPEC), ("f(_1, _2)", arithmetic::ADD_SPEC)]);
    assert_eq!(run_with(registry, "f(5, 2)").await, Value::from(3_i64));
}

#[tokio::test]
async fn test_timeout_stops_runaway_loops() {
    let config = PhyslConfig {
        eval_timeout_ms: Some(50),
        ..PhyslConfig::default()
    };
    let function = compiler().with_config(config).compile_source("spin", "while(true, 1)", &mut Environment::new()).unwrap();
    let error = function.run().await.unwrap_err();
    assert!(matches!(error, PrimitiveError::Timeout { .. }));
}

#[tokio::test(flavor = "current_thread")]
async fn test_outer_timeout_interrupts_busy_loop() {
    let function = compiler().compile_source("spin", "define(c, 0), while(true, store(c, c + 1))", &mut Environment::new()).unwrap();
    let outcome = tokio::time::timeout(std::time::Duration::from_millis(50), function.run()).await;
    assert!(outcome.is_err());
}

#[tokio::test]
async fn test_channel_placement_evaluates_remotely() {
    let placement = Arc::new(ChannelPlacement::spawn(1).unwrap());
    let function = compiler().with_placement(placement).compile_source("remote", "define(f, a, a * 2), f(21)", &mut Environment::new()).unwrap();
    assert_eq!(function.run().await.unwrap(), Value::from(42_i64));
}
