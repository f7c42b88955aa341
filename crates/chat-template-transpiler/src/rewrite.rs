/*
 * rewrite.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Rewriting of template expressions into Rust expressions.
//!
//! Each captured expression is rewritten exactly once, through an ordered
//! pipeline:
//!
//! 1. a top-level `is` test (`defined`, `not defined`, `undefined`),
//! 2. boolean keywords (`or`, `and`, leading `not`) and membership (`in`,
//!    `not in`),
//! 3. a scanner over literals, access chains, groups, filters and
//!    arithmetic or comparison operators.
//!
//! Step 1 only applies when the expression has no top-level boolean keyword,
//! so the boolean operators bind loosest. A filter binds to the operand
//! directly before it: `a + b | trim + c` filters `b` alone.
//!
//! The result is a Rust expression of type `Value` or `bool`. Callers always
//! wrap it in `Value::from(..)`.

use crate::error::{TranspileError, TranspileResult};
use crate::naming::rust_ident;
use crate::scan::{
    TopLevel, find_matching_close, find_top_level_char, find_top_level_word,
    split_top_level_word,
};

/// Words that are never variable names inside an expression.
const KEYWORDS: &[&str] = &["and", "or", "not", "in", "is", "if", "else"];

/// Rewrites template expressions given the names visible at the point of use.
#[derive(Debug, Clone, Copy)]
pub struct ExpressionRewriter<'a> {
    /// Fields of the generated `TemplateContext`.
    context_fields: &'a [String],
    /// Rust bindings in scope in the generated code: loop variables and `loop`.
    locals: &'a [String],
}

impl<'a> ExpressionRewriter<'a> {
    pub fn new(context_fields: &'a [String], locals: &'a [String]) -> Self {
        Self {
            context_fields,
            locals,
        }
    }

    /// Rewrite one template expression.
    pub fn convert(&self, expr: &str) -> TranspileResult<String> {
        let trimmed = expr.trim();
        if trimmed.is_empty() {
            return Err(TranspileError::unsupported_expression(expr, "empty expression"));
        }

        if !has_boolean_operator(trimmed) {
            if let Some(test) = self.convert_test(trimmed)? {
                return Ok(test);
            }
        }

        self.convert_boolean(trimmed)
    }

    fn convert_test(&self, expr: &str) -> TranspileResult<Option<String>> {
        let Some(is) = find_top_level_word(expr, "is") else {
            return Ok(None);
        };
        let subject = expr[..is].trim();
        let test = expr[is + "is".len()..].trim();

        let (negated, name) = match strip_keyword(test, "not") {
            Some(rest) => (true, rest),
            None => (false, test),
        };
        let negated = match name {
            "defined" => negated,
            "undefined" => !negated,
            _ => {
                return Err(TranspileError::unsupported_expression(
                    expr,
                    format!("unsupported test '{name}'"),
                ));
            }
        };

        let subject = self.convert(subject)?;
        let bang = if negated { "!" } else { "" };
        Ok(Some(format!("{bang}is_defined(&Value::from({subject}))")))
    }

    fn convert_boolean(&self, expr: &str) -> TranspileResult<String> {
        let parts = split_top_level_word(expr, "or");
        if parts.len() > 1 {
            return self.join_truthy(expr, &parts, " || ");
        }

        let parts = split_top_level_word(expr, "and");
        if parts.len() > 1 {
            return self.join_truthy(expr, &parts, " && ");
        }

        if let Some(rest) = strip_keyword(expr, "not") {
            return Ok(format!("!truthy(&Value::from({}))", self.convert(rest)?));
        }

        if let Some(index) = find_top_level_word(expr, "in") {
            return self.convert_membership(expr, index);
        }

        self.scan_expression(expr)
    }

    fn join_truthy(&self, expr: &str, parts: &[&str], joiner: &str) -> TranspileResult<String> {
        let mut operands = Vec::with_capacity(parts.len());
        for part in parts {
            if part.trim().is_empty() {
                return Err(TranspileError::unsupported_expression(
                    expr,
                    "missing operand for boolean operator",
                ));
            }
            operands.push(format!("truthy(&Value::from({}))", self.convert(part)?));
        }
        Ok(operands.join(joiner))
    }

    fn convert_membership(&self, expr: &str, index: usize) -> TranspileResult<String> {
        let left = expr[..index].trim_end();
        let container = expr[index + "in".len()..].trim();

        let (item, negated) = match left.strip_suffix("not") {
            Some(rest) if rest.ends_with(char::is_whitespace) => (rest.trim_end(), true),
            _ => (left, false),
        };
        if item.is_empty() || container.is_empty() {
            return Err(TranspileError::unsupported_expression(
                expr,
                "membership test needs both operands",
            ));
        }

        let bang = if negated { "!" } else { "" };
        Ok(format!(
            "{bang}contains(&Value::from({}), &Value::from({}))",
            self.convert(container)?,
            self.convert(item)?
        ))
    }

    /// Operands joined by arithmetic, concatenation and comparison operators.
    fn scan_expression(&self, expr: &str) -> TranspileResult<String> {
        let mut cursor = Cursor::new(expr);
        let mut out = String::new();
        let mut comparisons = 0;

        loop {
            out.push_str(&self.scan_operand(&mut cursor)?);
            cursor.skip_whitespace();
            if cursor.is_at_end() {
                break;
            }

            let (op, is_comparison) = scan_operator(&mut cursor)?;
            if is_comparison {
                comparisons += 1;
                if comparisons > 1 {
                    return Err(TranspileError::unsupported_expression(
                        expr,
                        "chained comparisons are not supported",
                    ));
                }
            }
            out.push(' ');
            out.push_str(op);
            out.push(' ');
        }

        Ok(out)
    }

    fn scan_operand(&self, cursor: &mut Cursor<'_>) -> TranspileResult<String> {
        let mut prefix = String::new();
        loop {
            cursor.skip_whitespace();
            match cursor.peek() {
                Some('-') => prefix.push('-'),
                Some('+') => {}
                _ => break,
            }
            cursor.bump();
        }

        let primary = match cursor.peek() {
            None => return Err(cursor.error("expected an operand")),
            Some('\'' | '"') => format!("Value::from({:?})", scan_string(cursor)?),
            Some(c) if c.is_ascii_digit() => scan_number(cursor)?,
            Some('(') => self.scan_group(cursor)?,
            Some('[') => return Err(cursor.error("list literals are not supported")),
            Some('{') => return Err(cursor.error("dict literals are not supported")),
            Some(c) if is_ident_start(c) => self.scan_name(cursor)?,
            Some(c) => return Err(cursor.error(format!("unexpected character '{c}'"))),
        };

        let chain = self.scan_postfix(cursor, primary)?;
        self.scan_filters(cursor, prefix + &chain)
    }

    fn scan_name(&self, cursor: &mut Cursor<'_>) -> TranspileResult<String> {
        let name = cursor.take_while(is_ident_continue);
        let value = match name {
            "true" | "True" => "Value::Bool(true)".to_string(),
            "false" | "False" => "Value::Bool(false)".to_string(),
            "none" | "None" => "Value::Null".to_string(),
            _ if KEYWORDS.contains(&name) => {
                return Err(cursor.error(format!("unexpected keyword '{name}'")));
            }
            _ if cursor.rest().trim_start().starts_with('(') => {
                return Err(cursor.error(format!("call to '{name}' is not supported")));
            }
            _ => self.variable(name),
        };
        Ok(value)
    }

    /// A template variable: loop bindings shadow context fields, and `set`
    /// shadows loop bindings.
    fn variable(&self, name: &str) -> String {
        if self.locals.iter().any(|local| local == name) {
            format!("get_var(&__locals, {name:?}, &{})", rust_ident(name))
        } else if self.context_fields.iter().any(|field| field == name) {
            format!("context.{}.clone()", rust_ident(name))
        } else {
            format!("get_var(&__locals, {name:?}, &Value::Undefined)")
        }
    }

    fn scan_group(&self, cursor: &mut Cursor<'_>) -> TranspileResult<String> {
        let open = cursor.pos;
        let close = find_matching_close(cursor.source, open)
            .ok_or_else(|| cursor.error("unbalanced parenthesis"))?;
        let inner = &cursor.source[open + 1..close];

        if inner.trim().is_empty() {
            return Err(cursor.error("empty parentheses"));
        }
        if find_top_level_char(inner, ',').is_some() {
            return Err(cursor.error("tuples are not supported"));
        }

        cursor.pos = close + 1;
        Ok(format!("Value::from({})", self.convert(inner)?))
    }

    /// Greedy `.name`, `.0` and `[key]` suffixes.
    fn scan_postfix(&self, cursor: &mut Cursor<'_>, primary: String) -> TranspileResult<String> {
        let mut acc = primary;

        loop {
            match cursor.peek() {
                Some('.') => {
                    cursor.bump();
                    let name = cursor.take_while(is_ident_continue);
                    if name.is_empty() {
                        return Err(cursor.error("expected a name after '.'"));
                    }
                    if cursor.rest().trim_start().starts_with('(') {
                        return Err(cursor.error(format!("method call '{name}' is not supported")));
                    }
                    acc = if name.bytes().all(|b| b.is_ascii_digit()) {
                        let index: i64 = name
                            .parse()
                            .map_err(|_| cursor.error("index out of range"))?;
                        format!("get_index(&{acc}, &Value::Int({index}))")
                    } else {
                        format!("get_prop(&{acc}, {name:?})")
                    };
                }
                Some('[') => {
                    let open = cursor.pos;
                    let close = find_matching_close(cursor.source, open)
                        .ok_or_else(|| cursor.error("unbalanced '['"))?;
                    let inner = cursor.source[open + 1..close].trim();

                    if inner.is_empty() {
                        return Err(cursor.error("empty subscript"));
                    }
                    if find_top_level_char(inner, ':').is_some() {
                        return Err(cursor.error("slices are not supported"));
                    }

                    let key = self.convert(inner)?;
                    let key = if is_plain_literal(inner) {
                        key
                    } else {
                        format!("Value::from({key})")
                    };
                    acc = format!("get_index(&{acc}, &{key})");
                    cursor.pos = close + 1;
                }
                Some('(') => return Err(cursor.error("calls are not supported")),
                _ => return Ok(acc),
            }
        }
    }

    /// `| name` and `| name(args)` suffixes, applied left to right.
    ///
    /// `tojson` takes no arguments. Any other filter degrades to a string
    /// conversion of its operand, arguments included in the skip.
    fn scan_filters(&self, cursor: &mut Cursor<'_>, operand: String) -> TranspileResult<String> {
        let mut acc = operand;

        loop {
            cursor.skip_whitespace();
            if cursor.peek() != Some('|') {
                return Ok(acc);
            }
            cursor.bump();
            cursor.skip_whitespace();

            let name = cursor.take_while(is_ident_continue);
            if !name.starts_with(is_ident_start) {
                return Err(cursor.error("expected a filter name after '|'"));
            }
            let has_arguments = cursor.peek() == Some('(');
            if has_arguments {
                let close = find_matching_close(cursor.source, cursor.pos)
                    .ok_or_else(|| cursor.error("unbalanced parenthesis"))?;
                cursor.pos = close + 1;
            }

            acc = match name {
                "tojson" if has_arguments => {
                    return Err(cursor.error("tojson arguments are not supported"));
                }
                "tojson" => format!("to_json(&Value::from({acc}))"),
                _ => {
                    tracing::debug!(
                        filter = name,
                        "Degrading unsupported filter to string conversion"
                    );
                    format!(
                        "/* unsupported filter: {name} */ Value::from(to_string_safe(&Value::from({acc})))"
                    )
                }
            };
        }
    }
}

/// A single string literal or an unsigned integer, which rewrite to a
/// `Value` constructor that can be borrowed directly.
fn is_plain_literal(source: &str) -> bool {
    let quoted = source.starts_with(['\'', '"']) && TopLevel::new(source).next().is_none();
    let integer = source.bytes().all(|b| b.is_ascii_digit());
    quoted || integer
}

fn has_boolean_operator(expr: &str) -> bool {
    find_top_level_word(expr, "or").is_some()
        || find_top_level_word(expr, "and").is_some()
        || find_top_level_word(expr, "in").is_some()
        || strip_keyword(expr, "not").is_some()
}

/// The text after a leading `keyword` followed by whitespace or `(`.
fn strip_keyword<'s>(expr: &'s str, keyword: &str) -> Option<&'s str> {
    let rest = expr.strip_prefix(keyword)?;
    if rest.starts_with(|c: char| c.is_whitespace() || c == '(') {
        Some(rest.trim())
    } else {
        None
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Decode a quoted literal, including its escapes.
fn scan_string(cursor: &mut Cursor<'_>) -> TranspileResult<String> {
    let quote = cursor.bump();
    let mut decoded = String::new();

    loop {
        match cursor.bump() {
            None => return Err(cursor.error("unterminated string literal")),
            Some('\\') => match cursor.bump() {
                Some('n') => decoded.push('\n'),
                Some('t') => decoded.push('\t'),
                Some('r') => decoded.push('\r'),
                Some(c @ ('\\' | '\'' | '"')) => decoded.push(c),
                Some(other) => {
                    decoded.push('\\');
                    decoded.push(other);
                }
                None => return Err(cursor.error("unterminated string literal")),
            },
            Some(c) if Some(c) == quote => return Ok(decoded),
            Some(c) => decoded.push(c),
        }
    }
}

fn scan_number(cursor: &mut Cursor<'_>) -> TranspileResult<String> {
    let start = cursor.pos;
    cursor.take_while(|c| c.is_ascii_digit() || c == '_');

    let mut is_float = false;
    if cursor.peek() == Some('.') && cursor.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) {
        is_float = true;
        cursor.bump();
        cursor.take_while(|c| c.is_ascii_digit() || c == '_');
    }
    if matches!(cursor.peek(), Some('e' | 'E')) {
        let signed = matches!(cursor.peek_nth(1), Some('+' | '-'));
        let digit_at = if signed { 2 } else { 1 };
        if cursor.peek_nth(digit_at).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            for _ in 0..digit_at {
                cursor.bump();
            }
            cursor.take_while(|c| c.is_ascii_digit());
        }
    }

    let literal: String = cursor.source[start..cursor.pos]
        .chars()
        .filter(|c| *c != '_')
        .collect();
    if is_float {
        let value: f64 = literal
            .parse()
            .ok()
            .filter(|value: &f64| value.is_finite())
            .ok_or_else(|| cursor.error(format!("invalid number '{literal}'")))?;
        Ok(format!("Value::Float({value:?})"))
    } else {
        let value: i64 = literal
            .parse()
            .map_err(|_| cursor.error(format!("integer '{literal}' is out of range")))?;
        Ok(format!("Value::Int({value})"))
    }
}

/// Binary operator at the cursor, as Rust source and whether it compares.
fn scan_operator(cursor: &mut Cursor<'_>) -> TranspileResult<(&'static str, bool)> {
    const OPERATORS: &[(&str, &str, bool)] = &[
        ("==", "==", true),
        ("!=", "!=", true),
        ("<=", "<=", true),
        (">=", ">=", true),
        ("<", "<", true),
        (">", ">", true),
        ("+", "+", false),
        ("-", "-", false),
        ("*", "*", false),
        ("/", "/", false),
        ("%", "%", false),
        ("~", "^", false),
    ];

    let rest = cursor.rest();
    if rest.starts_with("//") {
        return Err(cursor.error("floor division is not supported"));
    }
    if rest.starts_with("**") {
        return Err(cursor.error("exponentiation is not supported"));
    }
    for &(jinja, rust, is_comparison) in OPERATORS {
        if rest.starts_with(jinja) {
            cursor.pos += jinja.len();
            return Ok((rust, is_comparison));
        }
    }

    let message = match cursor.peek() {
        Some(c) if is_ident_start(c) => {
            let word: String = rest.chars().take_while(|c| is_ident_continue(*c)).collect();
            if KEYWORDS.contains(&word.as_str()) {
                format!("unexpected keyword '{word}'")
            } else {
                format!("expected an operator before '{word}'")
            }
        }
        Some('(') => "calls are not supported".to_string(),
        Some(',') => "tuples and argument lists are not supported".to_string(),
        Some(':') => "slices and dict literals are not supported".to_string(),
        Some(c) => format!("unexpected character '{c}'"),
        None => "expected an operator".to_string(),
    };
    Err(cursor.error(message))
}

/// Byte cursor over an expression being scanned.
struct Cursor<'s> {
    source: &'s str,
    pos: usize,
}

impl<'s> Cursor<'s> {
    fn new(source: &'s str) -> Self {
        Self { source, pos: 0 }
    }

    fn rest(&self) -> &'s str {
        &self.source[self.pos..]
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        self.take_while(char::is_whitespace);
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'s str {
        let rest = self.rest();
        let len = rest.find(|c: char| !pred(c)).unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn error(&self, message: impl Into<String>) -> TranspileError {
        TranspileError::unsupported_expression(self.source, message)
    }
}
