/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Transpiler from Jinja chat templates to Rust source.
//!
//! Model checkpoints ship a `chat_template` inside `tokenizer_config.json`
//! that turns a list of chat messages into the prompt string the model
//! expects. This crate compiles such a template, once, into a self-contained
//! Rust module so the host can format prompts without embedding a template
//! engine.
//!
//! The supported subset covers what chat templates use in practice:
//!
//! - Output tags: `{{ message.content }}`
//! - Conditionals: `{% if %}...{% elif %}...{% else %}...{% endif %}`
//! - Loops with metadata: `{% for message in messages %}` and `loop.first`,
//!   `loop.last`, `loop.index0`, ...
//! - Assignment: `{% set name = expr %}`
//! - The `tojson` filter and `is defined` tests
//! - Whitespace control markers (`{%-`, `-%}`) and `{# comments #}`
//!
//! Anything outside the subset fails loudly instead of producing a renderer
//! that formats prompts differently from the reference engine.
//!
//! # Architecture
//!
//! The pipeline is [`lexer`] → [`parser`] → [`codegen`], with [`rewrite`]
//! turning each captured expression into a Rust expression over the
//! [`runtime`] value model. The runtime module is both part of this crate and
//! emitted verbatim at the top of every generated file.
//!
//! # Example
//!
//! ```ignore
//! use chat_template_transpiler::{ChatTemplateSource, GeneratedRenderer, GeneratorConfig};
//!
//! let source = ChatTemplateSource::from_tokenizer_config("models/Qwen2.5-3B/tokenizer_config.json")?;
//! let renderer = GeneratedRenderer::from_source(&source, &GeneratorConfig::default())?;
//! let path = renderer.write_to("src/generated")?;
//! ```

pub mod ast;
pub mod codegen;
pub mod error;
pub mod lexer;
pub mod naming;
pub mod parser;
pub mod rewrite;
pub mod runtime;
mod scan;
pub mod source;

use std::fs;
use std::path::{Path, PathBuf};

pub use ast::{Branch, Expr, ForNode, IfNode, Node, Root, SetNode};
pub use codegen::{Generator, GeneratorConfig, runtime_prelude};
pub use error::{Position, TranspileError, TranspileResult};
pub use lexer::{Lexer, Token, TokenKind};
pub use naming::{output_file_name, rust_type_ident, sanitize_type_name};
pub use parser::{Parser, parse_template};
pub use rewrite::ExpressionRewriter;
pub use source::ChatTemplateSource;

/// Transpile a template into Rust source with the default context fields.
pub fn transpile(template: &str, type_name: &str) -> TranspileResult<String> {
    transpile_with_config(template, type_name, &GeneratorConfig::default())
}

/// Transpile a template into Rust source.
///
/// Either the whole template converts or an error is returned; partial
/// output is never produced.
pub fn transpile_with_config(
    template: &str,
    type_name: &str,
    config: &GeneratorConfig,
) -> TranspileResult<String> {
    if let Some(field) = config
        .context_fields
        .iter()
        .find(|field| !parser::is_identifier(field))
    {
        return Err(TranspileError::unsupported_expression(
            field,
            "context field names must be identifiers",
        ));
    }

    let root = parse_template(template)?;
    Generator::new(config).generate(&root, type_name)
}

/// Generated renderer source, ready to be written next to the host's code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedRenderer {
    /// Sanitized template name.
    pub name: String,
    /// Rust identifier of the generated renderer type.
    pub type_ident: String,
    /// Complete generated source.
    pub code: String,
}

impl GeneratedRenderer {
    /// Transpile a loaded template.
    pub fn from_source(
        source: &ChatTemplateSource,
        config: &GeneratorConfig,
    ) -> TranspileResult<Self> {
        let code = transpile_with_config(&source.template, &source.name, config)?;
        Ok(Self {
            name: source.name.clone(),
            type_ident: rust_type_ident(&source.name),
            code,
        })
    }

    /// File name the source is written under: `<name>.rs`.
    pub fn file_name(&self) -> String {
        output_file_name(&self.name)
    }

    /// Write the source into `dir`, returning the written path.
    pub fn write_to(&self, dir: impl AsRef<Path>) -> TranspileResult<PathBuf> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name());
        fs::write(&path, &self.code)?;
        tracing::info!(
            path = %path.display(),
            renderer = %self.type_ident,
            "Wrote generated chat template renderer"
        );
        Ok(path)
    }
}
