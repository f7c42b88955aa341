/*
 * runtime_tests.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Tests for the runtime emitted into every generated renderer.
 */

use chat_template_transpiler::runtime::{
    LoopInfo, Value, as_list, contains, get_index, get_prop, get_var, is_defined, to_json,
    to_string_safe, truthy,
};
use pretty_assertions::assert_eq;
use std::collections::HashMap;

fn s(text: &str) -> Value {
    Value::from(text)
}

fn message(role: &str, content: &str) -> Value {
    Value::map([("role", s(role)), ("content", s(content))])
}

// ============================================================================
// Stringification
// ============================================================================

#[test]
fn test_to_string_safe_scalars() {
    assert_eq!(to_string_safe(&Value::Undefined), "");
    assert_eq!(to_string_safe(&Value::Null), "None");
    assert_eq!(to_string_safe(&Value::Bool(true)), "True");
    assert_eq!(to_string_safe(&Value::Bool(false)), "False");
    assert_eq!(to_string_safe(&Value::Int(-7)), "-7");
    assert_eq!(to_string_safe(&s("plain")), "plain");
}

#[test]
fn test_to_string_safe_floats() {
    assert_eq!(to_string_safe(&Value::Float(1.0)), "1.0");
    assert_eq!(to_string_safe(&Value::Float(0.25)), "0.25");
    assert_eq!(to_string_safe(&Value::Float(1e20)), "1e+20");
    assert_eq!(to_string_safe(&Value::Float(0.00001)), "1e-05");
}

#[test]
fn test_to_string_safe_containers_use_repr() {
    let value = Value::list([s("a"), Value::Int(1), Value::Null, s("it's")]);
    assert_eq!(to_string_safe(&value), "['a', 1, None, \"it's\"]");

    let map = Value::map([("k", Value::Bool(true))]);
    assert_eq!(to_string_safe(&map), "{'k': True}");
}

// ============================================================================
// Truthiness and definedness
// ============================================================================

#[test]
fn test_truthy() {
    assert!(!truthy(&Value::Undefined));
    assert!(!truthy(&Value::Null));
    assert!(!truthy(&Value::Int(0)));
    assert!(!truthy(&Value::Float(0.0)));
    assert!(!truthy(&s("")));
    assert!(!truthy(&Value::list([])));
    assert!(!truthy(&Value::map::<&str>([])));

    assert!(truthy(&s("false")));
    assert!(truthy(&Value::Int(-1)));
    assert!(truthy(&Value::list([Value::Null])));
}

#[test]
fn test_is_defined() {
    assert!(!is_defined(&Value::Undefined));
    assert!(is_defined(&Value::Null));
    assert!(is_defined(&s("")));
}

// ============================================================================
// JSON
// ============================================================================

#[test]
fn test_to_json_separators_and_order() {
    let tool = Value::map([
        ("name", s("get_weather")),
        (
            "parameters",
            Value::map([
                ("type", s("object")),
                ("required", Value::list([s("city")])),
            ]),
        ),
    ]);
    assert_eq!(
        to_json(&tool),
        s(r#"{"name": "get_weather", "parameters": {"type": "object", "required": ["city"]}}"#)
    );
}

#[test]
fn test_to_json_escapes() {
    assert_eq!(to_json(&s("a\"b\\c\nd")), s(r#""a\"b\\c\nd""#));
    assert_eq!(to_json(&s("héllo")), s("\"héllo\""));
    assert_eq!(to_json(&s("\u{1}")), s("\"\\u0001\""));
}

#[test]
fn test_to_json_scalars() {
    assert_eq!(to_json(&Value::Null), s("null"));
    assert_eq!(to_json(&Value::Undefined), s("null"));
    assert_eq!(to_json(&Value::Bool(false)), s("false"));
    assert_eq!(to_json(&Value::Float(2.0)), s("2.0"));
    assert_eq!(to_json(&Value::list([])), s("[]"));
}

// ============================================================================
// Access
// ============================================================================

#[test]
fn test_get_prop() {
    let msg = message("user", "hi");
    assert_eq!(get_prop(&msg, "role"), s("user"));
    assert_eq!(get_prop(&msg, "tool_calls"), Value::Undefined);
    assert_eq!(get_prop(&s("text"), "len"), Value::Undefined);
}

#[test]
fn test_get_index() {
    let items = Value::list([s("a"), s("b"), s("c")]);
    assert_eq!(get_index(&items, &Value::Int(0)), s("a"));
    assert_eq!(get_index(&items, &Value::Int(-1)), s("c"));
    assert_eq!(get_index(&items, &Value::Int(3)), Value::Undefined);
    assert_eq!(get_index(&items, &Value::Int(-4)), Value::Undefined);

    let msg = message("system", "sys");
    assert_eq!(get_index(&msg, &s("content")), s("sys"));
    assert_eq!(get_index(&msg, &Value::Int(0)), Value::Undefined);

    assert_eq!(get_index(&s("héllo"), &Value::Int(1)), s("é"));
}

#[test]
fn test_get_var_prefers_set_bindings() {
    let mut locals = HashMap::new();
    assert_eq!(get_var(&locals, "x", &s("loop value")), s("loop value"));

    locals.insert("x".to_string(), s("set value"));
    assert_eq!(get_var(&locals, "x", &s("loop value")), s("set value"));
    assert_eq!(get_var(&locals, "y", &Value::Undefined), Value::Undefined);
}

#[test]
fn test_as_list() {
    assert!(as_list(&Value::Undefined).is_empty());
    assert!(as_list(&Value::Null).is_empty());
    assert_eq!(as_list(&s("one")), vec![s("one")]);
    assert_eq!(
        as_list(&Value::map([("a", Value::Int(1)), ("b", Value::Int(2))])),
        vec![s("a"), s("b")]
    );
}

#[test]
fn test_contains() {
    assert!(contains(&s("<tool_call>x"), &s("<tool_call>")));
    assert!(!contains(&s("abc"), &s("d")));
    assert!(contains(&Value::list([Value::Int(1), Value::Int(2)]), &Value::Float(2.0)));
    assert!(contains(&message("user", "x"), &s("role")));
    assert!(!contains(&Value::Undefined, &s("x")));
}

// ============================================================================
// Loop metadata
// ============================================================================

#[test]
fn test_loop_info() {
    let first = LoopInfo::new(0, 3);
    assert!(first.first());
    assert!(!first.last());

    let last = Value::from(LoopInfo::new(2, 3));
    assert_eq!(get_prop(&last, "index0"), Value::Int(2));
    assert_eq!(get_prop(&last, "index"), Value::Int(3));
    assert_eq!(get_prop(&last, "revindex"), Value::Int(1));
    assert_eq!(get_prop(&last, "revindex0"), Value::Int(0));
    assert_eq!(get_prop(&last, "first"), Value::Bool(false));
    assert_eq!(get_prop(&last, "last"), Value::Bool(true));
    assert_eq!(get_prop(&last, "length"), Value::Int(3));
}

// ============================================================================
// Operators
// ============================================================================

#[test]
fn test_equality() {
    assert_eq!(Value::Int(1), Value::Float(1.0));
    assert_eq!(Value::Bool(true), Value::Int(1));
    assert_ne!(s("1"), Value::Int(1));
    assert_ne!(Value::Null, Value::Undefined);
    assert_eq!(
        Value::map([("a", Value::Int(1)), ("b", Value::Int(2))]),
        Value::map([("b", Value::Int(2)), ("a", Value::Int(1))])
    );
}

#[test]
fn test_ordering() {
    assert!(Value::Int(1) < Value::Float(1.5));
    assert!(s("a") < s("b"));
    assert!(!(s("a") < Value::Int(1)));
}

#[test]
fn test_arithmetic() {
    assert_eq!(Value::Int(2) + Value::Int(3), Value::Int(5));
    assert_eq!(s("Hello, ") + s("world"), s("Hello, world"));
    assert_eq!(
        Value::list([Value::Int(1)]) + Value::list([Value::Int(2)]),
        Value::list([Value::Int(1), Value::Int(2)])
    );
    assert_eq!(Value::Int(7) - Value::Int(10), Value::Int(-3));
    assert_eq!(Value::Int(3) * Value::Float(0.5), Value::Float(1.5));
    assert_eq!(s("=") * Value::Int(3), s("==="));
    assert_eq!(Value::Int(1) / Value::Int(2), Value::Float(0.5));
    assert_eq!(Value::Int(1) / Value::Int(0), Value::Undefined);
    assert_eq!(Value::Int(-7) % Value::Int(3), Value::Int(2));
    assert_eq!(Value::Int(7) % Value::Int(-3), Value::Int(-2));
    assert_eq!(-Value::Int(4), Value::Int(-4));
    assert_eq!(s("a") - Value::Int(1), Value::Undefined);
}

#[test]
fn test_concatenation() {
    assert_eq!(s("n") ^ Value::Int(1) + Value::Int(2), s("n3"));
    assert_eq!(Value::Null ^ Value::Bool(true), s("NoneTrue"));
    assert_eq!(Value::Undefined ^ s("x"), s("x"));
}

#[test]
fn test_display_matches_to_string_safe() {
    assert_eq!(Value::Float(3.0).to_string(), "3.0");
    assert_eq!(Value::list([s("x")]).to_string(), "['x']");
}
