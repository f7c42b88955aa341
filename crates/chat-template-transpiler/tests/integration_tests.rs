/*
 * integration_tests.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Integration tests for chat-template-transpiler using test fixtures.
 */

use chat_template_transpiler::{
    ChatTemplateSource, GeneratedRenderer, GeneratorConfig, TranspileError, transpile,
    transpile_with_config,
};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Helper to get the path to test fixtures
fn fixture_path(name: &str) -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    Path::new(manifest_dir).join("test-fixtures").join(name)
}

fn tokenizer_config(model: &str) -> PathBuf {
    fixture_path(model).join("tokenizer_config.json")
}

// ============================================================================
// Tokenizer configs
// ============================================================================

#[test]
fn test_qwen_config_transpiles() {
    let source =
        ChatTemplateSource::from_tokenizer_config(tokenizer_config("Qwen2.5-Coder-3B-Instruct"))
            .unwrap();
    assert_eq!(source.name, "Qwen25-Coder-3B-Instruct");
    assert!(source.template.starts_with("{%- if messages[0]['role'] == 'system' %}"));

    let renderer = GeneratedRenderer::from_source(&source, &GeneratorConfig::default()).unwrap();
    assert_eq!(renderer.type_ident, "Qwen25_Coder_3B_Instruct");
    assert_eq!(renderer.file_name(), "Qwen25-Coder-3B-Instruct.rs");
    assert!(renderer.code.contains("pub struct Qwen25_Coder_3B_Instruct;"));
    assert!(renderer.code.contains("impl Qwen25_Coder_3B_Instruct {"));
    assert!(renderer.code.contains("to_json(&Value::from("));
}

#[test]
fn test_write_to_directory() {
    let temp = TempDir::new().unwrap();
    let source =
        ChatTemplateSource::from_tokenizer_config(tokenizer_config("Qwen2.5-Coder-3B-Instruct"))
            .unwrap();
    let renderer = GeneratedRenderer::from_source(&source, &GeneratorConfig::default()).unwrap();

    let out_dir = temp.path().join("generated");
    let path = renderer.write_to(&out_dir).unwrap();

    assert_eq!(path, out_dir.join("Qwen25-Coder-3B-Instruct.rs"));
    assert_eq!(fs::read_to_string(&path).unwrap(), renderer.code);
}

#[test]
fn test_generation_is_deterministic() {
    let source =
        ChatTemplateSource::from_tokenizer_config(tokenizer_config("Qwen2.5-Coder-3B-Instruct"))
            .unwrap();
    let first = transpile(&source.template, &source.name).unwrap();
    let second = transpile(&source.template, &source.name).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_config_without_chat_template() {
    let err = ChatTemplateSource::from_tokenizer_config(tokenizer_config("no-chat-template"))
        .unwrap_err();
    assert!(matches!(err, TranspileError::MissingChatTemplate { .. }));
    assert!(err.to_string().contains("does not contain a 'chat_template' property"));
}

#[test]
fn test_config_with_template_list() {
    let err =
        ChatTemplateSource::from_tokenizer_config(tokenizer_config("template-list")).unwrap_err();
    assert!(matches!(err, TranspileError::ChatTemplateNotString { .. }));
}

#[test]
fn test_config_with_broken_json() {
    let err =
        ChatTemplateSource::from_tokenizer_config(tokenizer_config("broken-json")).unwrap_err();
    assert!(matches!(err, TranspileError::Json(_)));
}

#[test]
fn test_config_not_found() {
    let err = ChatTemplateSource::from_tokenizer_config(tokenizer_config("does-not-exist"))
        .unwrap_err();
    assert!(matches!(err, TranspileError::ConfigNotFound { .. }));
}

#[test]
fn test_macro_template_is_rejected() {
    let source =
        ChatTemplateSource::from_tokenizer_config(tokenizer_config("macro-template")).unwrap();
    let err = GeneratedRenderer::from_source(&source, &GeneratorConfig::default()).unwrap_err();
    match err {
        TranspileError::UnsupportedTag { head, .. } => assert_eq!(head, "macro"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_standalone_template_file() {
    let source =
        ChatTemplateSource::from_template_file(fixture_path("Phi-3-mini/chat_template.jinja"), None)
            .unwrap();
    assert_eq!(source.name, "Phi-3-mini");

    let renderer = GeneratedRenderer::from_source(&source, &GeneratorConfig::default()).unwrap();
    assert_eq!(renderer.type_ident, "Phi_3_mini");
    assert!(renderer.code.contains("__out.push_str(\"<|\");"));
}

// ============================================================================
// Structural errors
// ============================================================================

#[test]
fn test_for_without_in() {
    let err = transpile("{% for message %}{% endfor %}", "M").unwrap_err();
    assert!(matches!(err, TranspileError::MalformedTag { .. }));
}

#[test]
fn test_if_without_endif() {
    let err = transpile("{% if add_generation_prompt %}<|assistant|>", "M").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Unexpected end of template; expected one of: elif, else, endif"
    );
}

#[test]
fn test_unknown_tag() {
    let err = transpile("a\nb {% include 'x.jinja' %}", "M").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Unsupported tag 'include' at line 2, column 3 (offset 4): 'include 'x.jinja''"
    );
}

#[test]
fn test_unterminated_output() {
    let err = transpile("{{ messages[0].content ", "M").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Unterminated '{{' starting at line 1, column 1 (offset 0)"
    );
}

#[test]
fn test_unsupported_call() {
    let err = transpile("{{ raise_exception('Only user and assistant roles') }}", "M").unwrap_err();
    assert!(matches!(err, TranspileError::UnsupportedExpression { .. }));
}

#[test]
fn test_expression_error_reports_tag_position() {
    let template = "{% for message in messages %}\n  {{ message.content | tojson(indent=4) }}\n{% endfor %}";
    let err = transpile(template, "M").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Unsupported expression 'message.content | tojson(indent=4)' at line 2, column 3 (offset 32): tojson arguments are not supported"
    );
}

#[test]
fn test_filter_keeps_trailing_concatenation() {
    let template = "{% for message in messages %}{{ message['content'] | trim + '<|eot_id|>' }}{% endfor %}";
    let code = transpile(template, "Llama").unwrap();
    assert!(code.contains("/* unsupported filter: trim */"));
    assert!(code.contains(") + Value::from(\"<|eot_id|>\")"), "{code}");
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_extra_context_field() {
    let config = GeneratorConfig::default().with_context_field("bos_token");
    let code = transpile_with_config("{{ bos_token }}", "M", &config).unwrap();
    assert!(code.contains("pub bos_token: Value,"));
}

#[test]
fn test_invalid_context_field() {
    let config = GeneratorConfig::default().with_context_field("bos-token");
    let err = transpile_with_config("x", "M", &config).unwrap_err();
    match err {
        TranspileError::UnsupportedExpression { expr, .. } => assert_eq!(expr, "bos-token"),
        other => panic!("unexpected error: {other:?}"),
    }
}
