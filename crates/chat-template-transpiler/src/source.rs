/*
 * source.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Loading chat templates from model directories.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{TranspileError, TranspileResult};
use crate::naming::{DEFAULT_TYPE_NAME, sanitize_type_name};

/// The slice of `tokenizer_config.json` the transpiler reads.
#[derive(Debug, Deserialize)]
struct TokenizerConfig {
    chat_template: Option<serde_json::Value>,
}

/// A chat template together with the name its renderer should carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTemplateSource {
    /// Raw template text.
    pub template: String,
    /// Sanitized name for the generated type and file.
    pub name: String,
    /// Where the template was read from, if it came from disk.
    pub path: Option<PathBuf>,
}

impl ChatTemplateSource {
    /// Wrap an in-memory template.
    pub fn new(template: impl Into<String>, name: &str) -> Self {
        Self {
            template: template.into(),
            name: sanitize_type_name(name),
            path: None,
        }
    }

    /// Read `chat_template` from a Hugging Face `tokenizer_config.json`.
    ///
    /// The renderer is named after the directory containing the file, which
    /// is normally the model name.
    pub fn from_tokenizer_config(path: impl AsRef<Path>) -> TranspileResult<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(TranspileError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let text = fs::read_to_string(path)?;
        let config: TokenizerConfig = serde_json::from_str(&text)?;

        let template = match config.chat_template {
            None => {
                return Err(TranspileError::MissingChatTemplate {
                    path: path.to_path_buf(),
                });
            }
            Some(serde_json::Value::String(template)) => template,
            Some(_) => {
                return Err(TranspileError::ChatTemplateNotString {
                    path: path.to_path_buf(),
                });
            }
        };

        tracing::debug!(
            path = %path.display(),
            bytes = template.len(),
            "Read chat template from tokenizer config"
        );

        Ok(Self {
            template,
            name: sanitize_type_name(&model_dir_name(path)),
            path: Some(path.to_path_buf()),
        })
    }

    /// Read a standalone template file such as `chat_template.jinja`.
    ///
    /// Without an explicit `name`, the containing directory names the
    /// renderer.
    pub fn from_template_file(path: impl AsRef<Path>, name: Option<&str>) -> TranspileResult<Self> {
        let path = path.as_ref();
        let template = fs::read_to_string(path)?;
        let name = match name {
            Some(name) => name.to_string(),
            None => model_dir_name(path),
        };

        Ok(Self {
            template,
            name: sanitize_type_name(&name),
            path: Some(path.to_path_buf()),
        })
    }
}

/// Name of the directory containing `path`.
fn model_dir_name(path: &Path) -> String {
    path.canonicalize()
        .ok()
        .as_deref()
        .unwrap_or(path)
        .parent()
        .and_then(Path::file_name)
        .map_or_else(
            || DEFAULT_TYPE_NAME.to_string(),
            |name| name.to_string_lossy().into_owned(),
        )
}
