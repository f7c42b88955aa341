/*
 * codegen.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Rust source generation from a parsed template.
//!
//! The generated module is self-contained: it starts with the runtime
//! prelude (the contents of `runtime.rs`), declares a `TemplateContext`
//! record and a renderer type whose `render` function walks the template
//! with plain Rust control flow.

use crate::ast::{Expr, ForNode, IfNode, Node, Root};
use crate::error::{TranspileError, TranspileResult};
use crate::naming::{rust_ident, rust_type_ident, sanitize_type_name};
use crate::rewrite::ExpressionRewriter;

/// Source of the runtime module, emitted into every generated file.
const RUNTIME_SOURCE: &str = include_str!("runtime.rs");

/// The runtime prelude without its file header comment.
pub fn runtime_prelude() -> &'static str {
    match RUNTIME_SOURCE.find("*/") {
        Some(end) => RUNTIME_SOURCE[end + 2..].trim_start(),
        None => RUNTIME_SOURCE,
    }
}

/// Options for code generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Names exposed as fields of the generated `TemplateContext`.
    pub context_fields: Vec<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            context_fields: vec![
                "tools".to_string(),
                "messages".to_string(),
                "add_generation_prompt".to_string(),
            ],
        }
    }
}

impl GeneratorConfig {
    /// Add a context field. Duplicates are ignored.
    pub fn with_context_field(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.context_fields.contains(&name) {
            self.context_fields.push(name);
        }
        self
    }
}

/// Generate the renderer module for `root` with the default configuration.
pub fn generate(root: &Root, type_name: &str) -> TranspileResult<String> {
    Generator::new(&GeneratorConfig::default()).generate(root, type_name)
}

/// Emits Rust source for one template.
pub struct Generator<'a> {
    config: &'a GeneratorConfig,
    out: String,
    depth: usize,
    /// Template names bound as Rust locals at the current point.
    scope: Vec<String>,
}

impl<'a> Generator<'a> {
    pub fn new(config: &'a GeneratorConfig) -> Self {
        Self {
            config,
            out: String::new(),
            depth: 0,
            scope: Vec::new(),
        }
    }

    /// Produce the complete generated source.
    pub fn generate(mut self, root: &Root, type_name: &str) -> TranspileResult<String> {
        let type_ident = rust_type_ident(type_name);

        self.line("// Generated from a Jinja chat template by chat-template-transpiler.");
        self.line("// Do not edit by hand; regenerate from the template instead.");
        self.line("");
        self.out.push_str(runtime_prelude());
        if !self.out.ends_with('\n') {
            self.out.push('\n');
        }
        self.line("");

        self.write_context();

        self.line(&format!(
            "/// Renderer for the `{}` chat template.",
            sanitize_type_name(type_name)
        ));
        self.line("#[allow(non_camel_case_types)]");
        self.line(&format!("pub struct {type_ident};"));
        self.line("");
        self.line(&format!("impl {type_ident} {{"));
        self.depth += 1;
        self.line("#[allow(unused_mut, unused_variables, clippy::all)]");
        self.line("pub fn render(context: &TemplateContext) -> String {");
        self.depth += 1;
        self.line("let mut __out = String::new();");
        self.line("let mut __locals: HashMap<String, Value> = HashMap::new();");
        self.emit_nodes(&root.children)?;
        self.line("__out");
        self.depth -= 1;
        self.line("}");
        self.depth -= 1;
        self.line("}");

        tracing::debug!(
            type_name = %type_ident,
            bytes = self.out.len(),
            "Generated renderer source"
        );
        Ok(self.out)
    }

    fn write_context(&mut self) {
        let fields: Vec<String> = self
            .config
            .context_fields
            .iter()
            .map(|f| rust_ident(f))
            .collect();

        self.line("/// Inputs available to the template.");
        self.line("#[derive(Debug, Clone, Default)]");
        self.line("pub struct TemplateContext {");
        self.depth += 1;
        for field in &fields {
            self.line(&format!("pub {field}: Value,"));
        }
        self.depth -= 1;
        self.line("}");
        self.line("");

        let params: Vec<String> = fields.iter().map(|f| format!("{f}: Value")).collect();
        self.line("impl TemplateContext {");
        self.depth += 1;
        self.line("#[allow(clippy::too_many_arguments)]");
        self.line(&format!("pub fn new({}) -> Self {{", params.join(", ")));
        self.depth += 1;
        self.line(&format!("Self {{ {} }}", fields.join(", ")));
        self.depth -= 1;
        self.line("}");
        self.depth -= 1;
        self.line("}");
        self.line("");
    }

    fn emit_nodes(&mut self, nodes: &[Node]) -> TranspileResult<()> {
        for node in nodes {
            self.emit_node(node)?;
        }
        Ok(())
    }

    fn emit_node(&mut self, node: &Node) -> TranspileResult<()> {
        match node {
            Node::Text(text) => {
                if !text.is_empty() {
                    self.line(&format!("__out.push_str({text:?});"));
                }
            }
            Node::Output(expr) => {
                let value = self.convert(expr)?;
                self.line(&format!(
                    "__out.push_str(&to_string_safe(&Value::from({value})));"
                ));
            }
            Node::Set(set) => {
                if self.config.context_fields.contains(&set.name) {
                    return Err(TranspileError::unsupported_expression(
                        &set.name,
                        "cannot rebind a context field",
                    )
                    .at(set.expr.position));
                }
                let value = self.convert(&set.expr)?;
                self.line(&format!(
                    "__locals.insert({:?}.to_string(), Value::from({value}));",
                    set.name
                ));
            }
            Node::If(if_node) => self.emit_if(if_node)?,
            Node::For(for_node) => self.emit_for(for_node)?,
            Node::Root(_) => {
                return Err(TranspileError::UnsupportedNode { kind: node.kind() });
            }
        }
        Ok(())
    }

    fn emit_if(&mut self, node: &IfNode) -> TranspileResult<()> {
        for (i, branch) in node.branches.iter().enumerate() {
            let condition = self.convert(&branch.condition)?;
            let keyword = if i == 0 { "if" } else { "} else if" };
            self.line(&format!("{keyword} truthy(&Value::from({condition})) {{"));
            self.depth += 1;
            self.emit_nodes(&branch.body)?;
            self.depth -= 1;
        }
        if let Some(else_body) = &node.else_body {
            self.line("} else {");
            self.depth += 1;
            self.emit_nodes(else_body)?;
            self.depth -= 1;
        }
        self.line("}");
        Ok(())
    }

    fn emit_for(&mut self, node: &ForNode) -> TranspileResult<()> {
        let iterable = self.convert(&node.iterable)?;
        let variable = rust_ident(&node.variable);

        self.line("{");
        self.depth += 1;
        self.line(&format!("let __items = as_list(&Value::from({iterable}));"));
        // A `set` binding of the same name is hidden during the loop only.
        self.line(&format!(
            "let __shadowed = __locals.remove({:?});",
            node.variable
        ));
        self.line("for __i in 0..__items.len() {");
        self.depth += 1;
        self.line(&format!("__locals.remove({:?});", node.variable));
        self.line(&format!("let {variable} = __items[__i].clone();"));
        self.line("let r#loop = Value::from(LoopInfo::new(__i, __items.len()));");

        self.scope.push(node.variable.clone());
        self.scope.push("loop".to_string());
        let body = self.emit_nodes(&node.body);
        self.scope.truncate(self.scope.len() - 2);
        body?;

        self.depth -= 1;
        self.line("}");
        self.line("if let Some(__value) = __shadowed {");
        self.depth += 1;
        self.line(&format!(
            "__locals.insert({:?}.to_string(), __value);",
            node.variable
        ));
        self.depth -= 1;
        self.line("}");
        self.depth -= 1;
        self.line("}");
        Ok(())
    }

    fn convert(&self, expr: &Expr) -> TranspileResult<String> {
        ExpressionRewriter::new(&self.config.context_fields, &self.scope)
            .convert(&expr.source)
            .map_err(|err| err.at(expr.position))
    }

    fn line(&mut self, text: &str) {
        if !text.is_empty() {
            for _ in 0..self.depth {
                self.out.push_str("    ");
            }
            self.out.push_str(text);
        }
        self.out.push('\n');
    }
}
