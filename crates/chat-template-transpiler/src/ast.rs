/*
 * ast.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template AST types.
//!
//! Expressions are kept as raw source strings together with the position of
//! the tag they came from. They are only decomposed when the code generator
//! hands them to the expression rewriter.

use crate::error::Position;

/// A raw template expression and the position of its enclosing tag.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub source: String,
    pub position: Position,
}

impl Expr {
    pub fn new(source: impl Into<String>, position: Position) -> Self {
        Self {
            source: source.into(),
            position,
        }
    }
}

/// A node in the template AST.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text emitted verbatim.
    Text(String),

    /// Output tag: `{{ expr }}`
    Output(Expr),

    /// Assignment: `{% set name = expr %}`
    Set(SetNode),

    /// Conditional: `{% if %}...{% elif %}...{% else %}...{% endif %}`
    If(IfNode),

    /// Loop: `{% for var in iterable %}...{% endfor %}`
    For(ForNode),

    /// A top-level sequence. Only valid as the parse result.
    Root(Root),
}

impl Node {
    /// Name of this node kind, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Text(_) => "text",
            Node::Output(_) => "output",
            Node::Set(_) => "set",
            Node::If(_) => "if",
            Node::For(_) => "for",
            Node::Root(_) => "root",
        }
    }
}

/// The parse result: every top-level node of a template.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Root {
    pub children: Vec<Node>,
}

impl Root {
    pub fn new(children: Vec<Node>) -> Self {
        Self { children }
    }
}

/// `{% set name = expr %}`
///
/// Binds `name` for the remainder of the whole render call, not just the
/// enclosing block.
#[derive(Debug, Clone, PartialEq)]
pub struct SetNode {
    pub name: String,
    pub expr: Expr,
}

/// One `if` / `elif` arm.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub condition: Expr,
    pub body: Vec<Node>,
}

/// Conditional block. Branches are tested in order; the first truthy one wins.
#[derive(Debug, Clone, PartialEq)]
pub struct IfNode {
    pub branches: Vec<Branch>,
    pub else_body: Option<Vec<Node>>,
}

/// `{% for variable in iterable %}`
#[derive(Debug, Clone, PartialEq)]
pub struct ForNode {
    pub variable: String,
    pub iterable: Expr,
    pub body: Vec<Node>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(source: &str) -> Expr {
        Expr::new(source, Position::locate(source, 0))
    }

    #[test]
    fn test_node_kinds() {
        assert_eq!(Node::Text("a".to_string()).kind(), "text");
        assert_eq!(Node::Output(expr("x")).kind(), "output");
        assert_eq!(
            Node::Set(SetNode {
                name: "a".to_string(),
                expr: expr("1"),
            })
            .kind(),
            "set"
        );
        assert_eq!(
            Node::If(IfNode {
                branches: vec![],
                else_body: None,
            })
            .kind(),
            "if"
        );
        assert_eq!(
            Node::For(ForNode {
                variable: "m".to_string(),
                iterable: expr("messages"),
                body: vec![],
            })
            .kind(),
            "for"
        );
        assert_eq!(Node::Root(Root::default()).kind(), "root");
    }
}
