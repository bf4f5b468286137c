use std::collections::HashMap;

use serde_json::json;

use crate::error::EvalError;
use crate::evaluator::interpret;
use crate::modules::ModuleRegistry;
use crate::scope::ScopeStack;
use crate::value::Value;

fn modules() -> ModuleRegistry {
    ModuleRegistry::new()
        .with_function("one", |_, _| Ok(Value::Number(1.0)))
        .with_function("accessData", |receiver, _| match receiver {
            Value::Object(map) => Ok(map.get("a").cloned().unwrap_or(Value::Null)),
            _ => Ok(Value::Null),
        })
        .with_module_function("math", "isEven", |_, args| match args.first() {
            Some(Value::Number(n)) => Ok(Value::Boolean(n % 2.0 == 0.0)),
            _ => Ok(Value::Boolean(false)),
        })
}

fn stack(overlays: Vec<serde_json::Value>) -> ScopeStack {
    ScopeStack::from_overlays(overlays.into_iter().map(Value::from).collect())
}

fn eval(source: &str, overlays: Vec<serde_json::Value>) -> Value {
    interpret(&modules(), &stack(overlays), source).unwrap()
}

#[test]
fn test_member_access() {
    assert_eq!(
        eval("a.b.c", vec![json!({"a": {"b": {"c": 1}}})]),
        Value::Number(1.0)
    );
}

#[test]
fn test_null_safe_member_access() {
    assert_eq!(eval("a?.b.c", vec![json!({})]), Value::Null);
}

#[test]
fn test_subscript_access() {
    assert_eq!(
        eval("a['b']", vec![json!({"a": {"b": "M"}})]),
        Value::String("M".into())
    );
    assert_eq!(eval("a?.['b']", vec![json!({"a": null})]), Value::Null);
    assert_eq!(eval("[1,2][1]", vec![json!({})]), Value::Number(2.0));
    assert_eq!(
        eval("a.b[c.d]", vec![json!({"a": {"b": {"z": "M"}}, "c": {"d": "z"}})]),
        Value::String("M".into())
    );
}

#[test]
fn test_call_function_from_data() {
    let mut top = HashMap::new();
    top.insert(
        "a".to_string(),
        Value::function(|_, _| Ok(Value::String("M".into()))),
    );
    let stack = ScopeStack::from_overlays(vec![Value::Object(top)]);
    assert_eq!(
        interpret(&modules(), &stack, "a()").unwrap(),
        Value::String("M".into())
    );
}

#[test]
fn test_method_call_binds_previous_value_as_receiver() {
    let mut user = HashMap::new();
    user.insert("name".to_string(), Value::String("ada".into()));
    user.insert(
        "format".to_string(),
        Value::function(|receiver, _| match receiver {
            Value::Object(map) => Ok(map.get("name").cloned().unwrap_or(Value::Null)),
            _ => Ok(Value::Null),
        }),
    );
    let mut top = HashMap::new();
    top.insert("user".to_string(), Value::Object(user));
    let stack = ScopeStack::from_overlays(vec![Value::Object(top)]);
    assert_eq!(
        interpret(&modules(), &stack, "user.format()").unwrap(),
        Value::String("ada".into())
    );
}

#[test]
fn test_method_call_arguments_are_evaluated() {
    let mut top = HashMap::new();
    top.insert(
        "sum".to_string(),
        Value::function(|_, args| {
            let total = args
                .iter()
                .map(|arg| match arg {
                    Value::Number(n) => *n,
                    _ => 0.0,
                })
                .sum();
            Ok(Value::Number(total))
        }),
    );
    top.insert("x".to_string(), Value::Number(2.0));
    let stack = ScopeStack::from_overlays(vec![Value::Object(top)]);
    assert_eq!(
        interpret(&modules(), &stack, "sum(1, x, 3)").unwrap(),
        Value::Number(6.0)
    );
}

#[test]
fn test_ternary() {
    assert_eq!(
        eval("a ? b : c", vec![json!({"a": false, "b": "lhs", "c": "rhs"})]),
        Value::String("rhs".into())
    );
}

#[test]
fn test_elvis() {
    assert_eq!(
        eval("a ?: c", vec![json!({"a": false, "b": "lhs", "c": "rhs"})]),
        Value::String("rhs".into())
    );
    assert_eq!(
        eval("a ?: b", vec![json!({"a": "lhs", "b": "rhs"})]),
        Value::String("lhs".into())
    );
    assert_eq!(eval("1 ?: 2 ?: 3", vec![]), Value::Number(1.0));
}

#[test]
fn test_null_coalesce() {
    assert_eq!(
        eval("a ?? b", vec![json!({"a": "rhs", "b": "lhs"})]),
        Value::String("rhs".into())
    );
    assert_eq!(
        eval("a ?? b", vec![json!({"b": "lhs"})]),
        Value::String("lhs".into())
    );
    assert_eq!(
        eval("a ?? b", vec![json!({"a": null, "b": "lhs"})]),
        Value::String("lhs".into())
    );
    // False is not null: the fallback must not kick in.
    assert_eq!(
        eval("a ?? b", vec![json!({"a": false, "b": "rhs"})]),
        Value::Boolean(false)
    );
}

#[test]
fn test_equality_and_comparison() {
    assert_eq!(eval("a == b", vec![json!({"a": 1, "b": 1})]), Value::Boolean(true));
    assert_eq!(eval("a != b", vec![json!({"a": 1, "b": 1})]), Value::Boolean(false));
    assert_eq!(eval("a > b", vec![json!({"a": 2, "b": 1})]), Value::Boolean(true));
    assert_eq!(eval("a >= b", vec![json!({"a": 1, "b": 1})]), Value::Boolean(true));
    assert_eq!(eval("a < b", vec![json!({"a": 1, "b": 2})]), Value::Boolean(true));
    assert_eq!(eval("a <= b", vec![json!({"a": 1, "b": 1})]), Value::Boolean(true));
    assert_eq!(eval("1 == 1 == true", vec![]), Value::Boolean(true));
}

#[test]
fn test_not() {
    assert_eq!(eval("!a", vec![json!({"a": true})]), Value::Boolean(false));
    assert_eq!(
        eval("!!!!!!!!!!!a", vec![json!({"a": true})]),
        Value::Boolean(false)
    );
}

#[test]
fn test_boolean_literals() {
    assert_eq!(eval("true", vec![]), Value::Boolean(true));
    assert_eq!(eval("false", vec![]), Value::Boolean(false));
}

#[test]
fn test_self_resolves_to_top_overlay_verbatim() {
    assert_eq!(
        eval("self", vec![json!("someValue")]),
        Value::String("someValue".into())
    );
}

#[test]
fn test_module_calls() {
    assert_eq!(eval("#one()", vec![]), Value::Number(1.0));
    assert_eq!(eval("#math:isEven(2)", vec![]), Value::Boolean(true));
}

#[test]
fn test_module_call_receiver_is_top_of_stack() {
    assert_eq!(
        eval("#accessData()", vec![json!({"a": 1}), json!({"a": 2})]),
        Value::Number(2.0)
    );
}

#[test]
fn test_literals() {
    assert_eq!(
        eval("{'a': true, 'b': false}", vec![json!({})]),
        Value::from(json!({"a": true, "b": false}))
    );
    assert_eq!(eval("[1,2]", vec![json!({})]), Value::from(json!([1, 2])));
    assert_eq!(eval("\"abc\"", vec![json!({})]), Value::String("abc".into()));
    assert_eq!(eval("'abc'", vec![json!({})]), Value::String("abc".into()));
    assert_eq!(eval("12.3", vec![json!({})]), Value::Number(12.3));
}

#[test]
fn test_logical_grouping() {
    assert_eq!(
        eval("(!a && !b) == !(a || b)", vec![json!({"a": true, "b": false})]),
        Value::Boolean(true)
    );
    assert_eq!(
        eval("!a && !b == !(a || b)", vec![json!({"a": true, "b": false})]),
        Value::Boolean(false)
    );
}

#[test]
fn test_overlays() {
    assert_eq!(
        eval("a", vec![json!({}), json!({"a": true})]),
        Value::Boolean(true)
    );
}

#[test]
fn test_latest_overlay_wins() {
    assert_eq!(
        eval("a", vec![json!({"a": false}), json!({"a": true})]),
        Value::Boolean(true)
    );
}

#[test]
fn test_missing_symbol_is_null_not_an_error() {
    assert_eq!(eval("missing", vec![json!({})]), Value::Null);
}

#[test]
fn test_method_missing_error() {
    let err = interpret(
        &ModuleRegistry::new(),
        &stack(vec![json!({"a": false})]),
        "a.boom()",
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "Method missing \"boom\"");
}

#[test]
fn test_navigation_error_names_the_failing_selector() {
    let err = interpret(&ModuleRegistry::new(), &stack(vec![json!({})]), "a.b.c").unwrap_err();
    assert_eq!(err.to_string(), "Cannot read property \"b\" of null");

    let err =
        interpret(&ModuleRegistry::new(), &stack(vec![json!({"a": {}})]), "a.b.c").unwrap_err();
    assert_eq!(err.to_string(), "Cannot read property \"c\" of null");
}

#[test]
fn test_missing_module_error() {
    let err = interpret(&ModuleRegistry::new(), &stack(vec![]), "#waldo:boom()").unwrap_err();
    assert_eq!(err.to_string(), "Module \"waldo\" not found");
}

#[test]
fn test_missing_function_error() {
    let registry = ModuleRegistry::new().with_module("waldo");
    let err = interpret(&registry, &stack(vec![]), "#waldo:isHidden()").unwrap_err();
    assert_eq!(err.to_string(), "Function \"#waldo:isHidden\" not found");

    let err = interpret(&registry, &stack(vec![]), "#nope()").unwrap_err();
    assert_eq!(err.to_string(), "Function \"#nope\" not found");
}

#[test]
fn test_host_function_errors_propagate() {
    let registry = ModuleRegistry::new().with_function("boom", |_, _| {
        Err(EvalError::host("token expired"))
    });
    let err = interpret(&registry, &stack(vec![]), "#boom()").unwrap_err();
    assert_eq!(err.to_string(), "token expired");
}

#[test]
fn test_short_circuit_skips_failing_operand() {
    // The right operand would raise; short-circuiting must not reach it.
    assert_eq!(
        eval("false && a.boom()", vec![json!({})]),
        Value::Boolean(false)
    );
    assert_eq!(eval("1 || a.boom()", vec![json!({})]), Value::Number(1.0));
    assert_eq!(
        eval("true ? 1 : a.boom()", vec![json!({})]),
        Value::Number(1.0)
    );
    assert_eq!(eval("2 ?? a.boom()", vec![json!({})]), Value::Number(2.0));
}

#[test]
fn test_logical_operators_return_operand_values() {
    assert_eq!(
        eval("a && b", vec![json!({"a": 1, "b": "x"})]),
        Value::String("x".into())
    );
    assert_eq!(
        eval("a || b", vec![json!({"a": 0, "b": "x"})]),
        Value::String("x".into())
    );
}
