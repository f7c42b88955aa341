/*
 * naming.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Names for generated types, files and identifiers.

/// Type name used when a hint sanitizes to nothing.
pub const DEFAULT_TYPE_NAME: &str = "GeneratedTemplate";

/// Rust keywords, strict and reserved, as of edition 2024.
const RUST_KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do", "dyn",
    "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in", "let",
    "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref", "return",
    "static", "struct", "trait", "true", "try", "type", "typeof", "unsafe", "unsized", "use",
    "virtual", "where", "while", "yield",
];

/// Keywords that cannot be raw identifiers, plus names the generated
/// renderer and its runtime already bind.
const RESERVED_NAMES: &[&str] = &[
    "_",
    "crate",
    "self",
    "Self",
    "super",
    "context",
    "Value",
    "LoopInfo",
    "TemplateContext",
    "HashMap",
    "Arc",
    "to_string_safe",
    "is_defined",
    "to_json",
    "as_list",
    "get_var",
    "get_prop",
    "get_index",
    "truthy",
    "contains",
];

/// Keep only `[A-Za-z0-9_-]` from a model or file name.
///
/// An empty result falls back to [`DEFAULT_TYPE_NAME`].
pub fn sanitize_type_name(hint: &str) -> String {
    let sanitized: String = hint
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    if sanitized.is_empty() {
        DEFAULT_TYPE_NAME.to_string()
    } else {
        sanitized
    }
}

/// Turn a sanitized name into a Rust type identifier.
///
/// Hyphens become underscores and a leading digit gets a `_` prefix. Names
/// are not re-cased; the generated type carries
/// `#[allow(non_camel_case_types)]`.
pub fn rust_type_ident(name: &str) -> String {
    let ident: String = sanitize_type_name(name)
        .chars()
        .map(|c| if c == '-' { '_' } else { c })
        .collect();
    if ident.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{ident}")
    } else if RUST_KEYWORDS.contains(&ident.as_str())
        || RESERVED_NAMES.contains(&ident.as_str())
    {
        format!("{ident}_")
    } else {
        ident
    }
}

/// File name for the generated source of `name`.
pub fn output_file_name(name: &str) -> String {
    format!("{}.rs", sanitize_type_name(name))
}

/// Map a template identifier to a Rust identifier usable as a binding or
/// struct field.
///
/// Keywords become raw identifiers, names starting with a digit get a `_`
/// prefix, and names the generated code already binds get a `_` suffix.
pub fn rust_ident(name: &str) -> String {
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{name}")
    } else if RESERVED_NAMES.contains(&name) || name.starts_with("__") {
        format!("{name}_")
    } else if RUST_KEYWORDS.contains(&name) {
        format!("r#{name}")
    } else {
        name.to_string()
    }
}
