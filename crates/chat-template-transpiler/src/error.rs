/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for chat template transpilation.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A position in template source.
///
/// `offset` is a byte offset; `line` and `column` are 1-based, with columns
/// counted in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Position {
    /// Compute the line and column of a byte offset in `source`.
    ///
    /// Offsets past the end of the source are clamped to the end.
    pub fn locate(source: &str, offset: usize) -> Self {
        let offset = offset.min(source.len());
        let mut line = 1;
        let mut column = 1;

        for (index, ch) in source.char_indices() {
            if index >= offset {
                break;
            }
            if ch == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }

        Self {
            offset,
            line,
            column,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {}, column {} (offset {})",
            self.line, self.column, self.offset
        )
    }
}

/// Errors that can occur while transpiling a chat template.
#[derive(Debug, Error)]
pub enum TranspileError {
    /// A `{{`, `{%` or `{#` without its closing delimiter.
    #[error("Unterminated '{delimiter}' starting at {position}")]
    UnterminatedDelimiter {
        delimiter: &'static str,
        position: Position,
    },

    /// A tag whose head keyword is not part of the supported subset.
    #[error("Unsupported tag '{head}' at {position}: '{tag}'")]
    UnsupportedTag {
        head: String,
        tag: String,
        position: Position,
    },

    /// A supported tag with an invalid body (missing ` in `, missing `=`, ...).
    #[error("Malformed tag at {position}: {message}: '{tag}'")]
    MalformedTag {
        tag: String,
        message: String,
        position: Position,
    },

    /// End of input reached while a block was still open.
    #[error("Unexpected end of template; expected one of: {}", .expected.join(", "))]
    UnexpectedEndOfInput { expected: Vec<String> },

    /// A block terminator that does not close the current block.
    #[error("Unexpected '{found}' at {position}; expected {expected}")]
    MismatchedTag {
        expected: String,
        found: String,
        position: Position,
    },

    /// An expression outside the supported subset.
    ///
    /// `position` is the start of the enclosing tag, when known.
    #[error("Unsupported expression '{expr}'{}: {message}", located(.position))]
    UnsupportedExpression {
        expr: String,
        message: String,
        position: Option<Position>,
    },

    /// An AST node kind the code generator does not emit.
    #[error("Node kind not supported by the code generator: {kind}")]
    UnsupportedNode { kind: &'static str },

    /// The tokenizer configuration file does not exist.
    #[error("tokenizer_config.json not found at {}", .path.display())]
    ConfigNotFound { path: PathBuf },

    /// The tokenizer configuration has no `chat_template` field.
    #[error("{} does not contain a 'chat_template' property", .path.display())]
    MissingChatTemplate { path: PathBuf },

    /// The `chat_template` field exists but is not a string.
    #[error("'chat_template' in {} exists but it is not a string", .path.display())]
    ChatTemplateNotString { path: PathBuf },

    /// The tokenizer configuration is not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error reading a configuration or writing generated source.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TranspileError {
    pub(crate) fn unsupported_expression(expr: &str, message: impl Into<String>) -> Self {
        TranspileError::UnsupportedExpression {
            expr: expr.to_string(),
            message: message.into(),
            position: None,
        }
    }

    /// Attach the enclosing tag position to an expression error that has none.
    pub(crate) fn at(self, tag: Position) -> Self {
        match self {
            TranspileError::UnsupportedExpression {
                expr,
                message,
                position: None,
            } => TranspileError::UnsupportedExpression {
                expr,
                message,
                position: Some(tag),
            },
            other => other,
        }
    }
}

fn located(position: &Option<Position>) -> String {
    match position {
        Some(position) => format!(" at {position}"),
        None => String::new(),
    }
}

/// Result type for transpiler operations.
pub type TranspileResult<T> = Result<T, TranspileError>;
