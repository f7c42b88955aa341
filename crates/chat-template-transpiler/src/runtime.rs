/*
 * runtime.rs
 * Copyright (c) 2025 Posit, PBC
 */

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::ops::{Add, BitXor, Div, Mul, Neg, Rem, Sub};
use std::sync::Arc;

/// A dynamically typed template value.
///
/// Lists and maps are shared behind `Arc` so cloning a value while walking
/// `messages` is cheap. Maps keep insertion order, matching JSON objects.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// A missing variable, property or index.
    #[default]
    Undefined,
    /// JSON `null` / Jinja `none`.
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Arc<Vec<Value>>),
    Map(Arc<Vec<(String, Value)>>),
}

impl Value {
    /// Build a map value, keeping entry order.
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Value {
        Value::Map(Arc::new(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    /// Build a list value.
    pub fn list(items: impl IntoIterator<Item = Value>) -> Value {
        Value::List(Arc::new(items.into_iter().collect()))
    }

    fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            Value::Int(n) => Some(*n as f64),
            Value::Bool(b) => Some(f64::from(u8::from(*b))),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&to_string_safe(self))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(Arc::new(items))
    }
}

impl From<LoopInfo> for Value {
    fn from(info: LoopInfo) -> Self {
        let remaining = info.count.saturating_sub(info.index0);
        Value::map([
            ("index0", usize_value(info.index0)),
            ("index", usize_value(info.index0 + 1)),
            ("revindex", usize_value(remaining)),
            ("revindex0", usize_value(remaining.saturating_sub(1))),
            ("first", Value::Bool(info.first())),
            ("last", Value::Bool(info.last())),
            ("length", usize_value(info.count)),
        ])
    }
}

fn usize_value(n: usize) -> Value {
    Value::Int(i64::try_from(n).unwrap_or(i64::MAX))
}

fn lookup<'v>(entries: &'v [(String, Value)], key: &str) -> Option<&'v Value> {
    entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len() && a.iter().all(|(k, v)| lookup(b, k) == Some(v))
            }
            (Value::Int(a), Value::Int(b)) => a == b,
            _ => match (self.as_float(), other.as_float()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
            (Value::String(a), Value::String(b)) => a.partial_cmp(b),
            _ => self.as_float()?.partial_cmp(&other.as_float()?),
        }
    }
}

/// Numeric arithmetic. Integer results fall back to float on overflow; any
/// non-numeric operand yields `Undefined`.
fn arithmetic(
    lhs: &Value,
    rhs: &Value,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Value {
    if let (Some(a), Some(b)) = (lhs.as_int(), rhs.as_int()) {
        if let Some(n) = int_op(a, b) {
            return Value::Int(n);
        }
    }
    match (lhs.as_float(), rhs.as_float()) {
        (Some(a), Some(b)) => Value::Float(float_op(a, b)),
        _ => Value::Undefined,
    }
}

impl Add for Value {
    type Output = Value;

    fn add(self, rhs: Value) -> Value {
        match (&self, &rhs) {
            (Value::List(a), Value::List(b)) => {
                Value::list(a.iter().chain(b.iter()).cloned())
            }
            (Value::String(_), _) | (_, Value::String(_)) => {
                Value::String(to_string_safe(&self) + &to_string_safe(&rhs))
            }
            _ => arithmetic(&self, &rhs, i64::checked_add, |a, b| a + b),
        }
    }
}

impl Sub for Value {
    type Output = Value;

    fn sub(self, rhs: Value) -> Value {
        arithmetic(&self, &rhs, i64::checked_sub, |a, b| a - b)
    }
}

impl Mul for Value {
    type Output = Value;

    fn mul(self, rhs: Value) -> Value {
        match (&self, &rhs) {
            (Value::String(s), Value::Int(n)) | (Value::Int(n), Value::String(s)) => {
                Value::String(s.repeat(usize::try_from(*n).unwrap_or(0)))
            }
            _ => arithmetic(&self, &rhs, i64::checked_mul, |a, b| a * b),
        }
    }
}

impl Div for Value {
    type Output = Value;

    /// True division: the result is always a float.
    fn div(self, rhs: Value) -> Value {
        match (self.as_float(), rhs.as_float()) {
            (Some(_), Some(b)) if b == 0.0 => Value::Undefined,
            (Some(a), Some(b)) => Value::Float(a / b),
            _ => Value::Undefined,
        }
    }
}

impl Rem for Value {
    type Output = Value;

    /// Modulo with the sign of the divisor.
    fn rem(self, rhs: Value) -> Value {
        if let (Some(a), Some(b)) = (self.as_int(), rhs.as_int()) {
            return match a.checked_rem(b) {
                Some(r) if r != 0 && (r < 0) != (b < 0) => Value::Int(r + b),
                Some(r) => Value::Int(r),
                None => Value::Undefined,
            };
        }
        match (self.as_float(), rhs.as_float()) {
            (Some(_), Some(b)) if b == 0.0 => Value::Undefined,
            (Some(a), Some(b)) => {
                let r = a % b;
                if r != 0.0 && (r < 0.0) != (b < 0.0) {
                    Value::Float(r + b)
                } else {
                    Value::Float(r)
                }
            }
            _ => Value::Undefined,
        }
    }
}

impl Neg for Value {
    type Output = Value;

    fn neg(self) -> Value {
        match self {
            Value::Float(x) => Value::Float(-x),
            other => match other.as_int() {
                Some(n) => n.checked_neg().map_or(Value::Float(-(n as f64)), Value::Int),
                None => Value::Undefined,
            },
        }
    }
}

/// String concatenation (`~`): both sides are stringified.
impl BitXor for Value {
    type Output = Value;

    fn bitxor(self, rhs: Value) -> Value {
        Value::String(to_string_safe(&self) + &to_string_safe(&rhs))
    }
}

/// Loop metadata for the current iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopInfo {
    pub index0: usize,
    pub count: usize,
}

impl LoopInfo {
    pub fn new(index0: usize, count: usize) -> Self {
        Self { index0, count }
    }

    pub fn first(&self) -> bool {
        self.index0 == 0
    }

    pub fn last(&self) -> bool {
        self.index0 + 1 == self.count
    }
}

/// Stringify a value the way the template would print it.
///
/// Undefined prints nothing, null prints `None`, booleans print `True` /
/// `False` and containers print their Python repr.
pub fn to_string_safe(value: &Value) -> String {
    match value {
        Value::Undefined => String::new(),
        Value::String(s) => s.clone(),
        other => repr(other),
    }
}

fn repr(value: &Value) -> String {
    match value {
        Value::Undefined | Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Int(n) => n.to_string(),
        Value::Float(x) => format_float(*x),
        Value::String(s) => repr_str(s),
        Value::List(items) => {
            let items: Vec<String> = items.iter().map(repr).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Map(entries) => {
            let entries: Vec<String> = entries
                .iter()
                .map(|(k, v)| format!("{}: {}", repr_str(k), repr(v)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
    }
}

fn repr_str(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// Shortest round-trip float formatting with a trailing `.0` for integral
/// values and a signed two-digit exponent outside `[1e-4, 1e16)`.
fn format_float(x: f64) -> String {
    if x.is_nan() {
        return "nan".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let magnitude = x.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let formatted = format!("{x:e}");
        if let Some((mantissa, exponent)) = formatted.split_once('e') {
            let exponent: i32 = exponent.parse().unwrap_or(0);
            let sign = if exponent < 0 { '-' } else { '+' };
            return format!("{mantissa}e{sign}{:02}", exponent.abs());
        }
        return formatted;
    }
    if x.fract() == 0.0 {
        format!("{x:.1}")
    } else {
        format!("{x}")
    }
}

/// `x is defined`
pub fn is_defined(value: &Value) -> bool {
    !matches!(value, Value::Undefined)
}

/// Jinja truthiness.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Undefined | Value::Null => false,
        Value::Bool(b) => *b,
        Value::Int(n) => *n != 0,
        Value::Float(x) => *x != 0.0,
        Value::String(s) => !s.is_empty(),
        Value::List(items) => !items.is_empty(),
        Value::Map(entries) => !entries.is_empty(),
    }
}

/// The `tojson` filter: compact JSON with `", "` and `": "` separators,
/// non-ASCII characters left unescaped and map keys in insertion order.
pub fn to_json(value: &Value) -> Value {
    let mut out = String::new();
    write_json(value, &mut out);
    Value::String(out)
}

fn write_json(value: &Value, out: &mut String) {
    match value {
        Value::Undefined | Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Int(n) => out.push_str(&n.to_string()),
        Value::Float(x) if x.is_nan() => out.push_str("NaN"),
        Value::Float(x) if x.is_infinite() => {
            out.push_str(if *x > 0.0 { "Infinity" } else { "-Infinity" });
        }
        Value::Float(x) => out.push_str(&format_float(*x)),
        Value::String(s) => write_json_str(s, out),
        Value::List(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_json(item, out);
            }
            out.push(']');
        }
        Value::Map(entries) => {
            out.push('{');
            for (i, (key, item)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_json_str(key, out);
                out.push_str(": ");
                write_json(item, out);
            }
            out.push('}');
        }
    }
}

fn write_json_str(s: &str, out: &mut String) {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            c if u32::from(c) < 0x20 => out.push_str(&format!("\\u{:04x}", u32::from(c))),
            c => out.push(c),
        }
    }
    out.push('"');
}

/// The items a `for` loop iterates over.
///
/// Missing values iterate nothing, a string is a single item and a map
/// iterates its keys.
pub fn as_list(value: &Value) -> Vec<Value> {
    match value {
        Value::Undefined | Value::Null => Vec::new(),
        Value::List(items) => items.to_vec(),
        Value::Map(entries) => entries
            .iter()
            .map(|(k, _)| Value::String(k.clone()))
            .collect(),
        other => vec![other.clone()],
    }
}

/// Resolve a template variable: `set` bindings first, then `fallback`.
pub fn get_var(locals: &HashMap<String, Value>, name: &str, fallback: &Value) -> Value {
    locals.get(name).unwrap_or(fallback).clone()
}

/// `value.name`
pub fn get_prop(value: &Value, name: &str) -> Value {
    match value {
        Value::Map(entries) => lookup(entries, name).cloned().unwrap_or_default(),
        _ => Value::Undefined,
    }
}

/// `value[key]`: map keys by string, list and string positions by integer.
/// Negative positions count from the end.
pub fn get_index(value: &Value, key: &Value) -> Value {
    match (value, key) {
        (Value::Map(entries), Value::String(k)) => {
            lookup(entries, k).cloned().unwrap_or_default()
        }
        (Value::List(items), Value::Int(n)) => resolve_position(*n, items.len())
            .and_then(|i| items.get(i))
            .cloned()
            .unwrap_or_default(),
        (Value::String(s), Value::Int(n)) => resolve_position(*n, s.chars().count())
            .and_then(|i| s.chars().nth(i))
            .map(|c| Value::String(c.to_string()))
            .unwrap_or_default(),
        _ => Value::Undefined,
    }
}

fn resolve_position(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let resolved = if index < 0 { index + len } else { index };
    if (0..len).contains(&resolved) {
        usize::try_from(resolved).ok()
    } else {
        None
    }
}

/// `item in container`
pub fn contains(container: &Value, item: &Value) -> bool {
    match (container, item) {
        (Value::String(haystack), Value::String(needle)) => haystack.contains(needle.as_str()),
        (Value::List(items), _) => items.iter().any(|v| v == item),
        (Value::Map(entries), Value::String(key)) => lookup(entries, key).is_some(),
        _ => false,
    }
}
