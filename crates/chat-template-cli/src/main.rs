/*
 * main.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! `chat-template` binary - transpile a model's chat template into Rust source

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chat_template_transpiler::{
    ChatTemplateSource, GeneratedRenderer, GeneratorConfig, sanitize_type_name,
};

const TOKENIZER_CONFIG: &str = "tokenizer_config.json";

#[derive(Parser, Debug)]
#[command(name = "chat-template")]
#[command(about = "Transpile a Jinja chat template into a self-contained Rust renderer")]
struct Args {
    /// A tokenizer_config.json, a model directory containing one, or a
    /// standalone template file
    input: PathBuf,

    /// Name for the generated renderer (defaults to the model directory name)
    #[arg(short, long)]
    name: Option<String>,

    /// Directory to write `<name>.rs` into (defaults to current directory)
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Print the generated source instead of writing a file
    #[arg(long)]
    stdout: bool,

    /// Additional TemplateContext field (can be specified multiple times).
    /// Example: --context-field bos_token
    #[arg(long = "context-field", value_name = "NAME")]
    context_fields: Vec<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat_template=info,chat_template_transpiler=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let renderer = transpile(&args)?;

    if args.stdout {
        print!("{}", renderer.code);
        return Ok(());
    }

    let out_dir = match &args.out_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let path = renderer.write_to(&out_dir)?;
    info!(path = %path.display(), "Done");

    Ok(())
}

fn transpile(args: &Args) -> Result<GeneratedRenderer> {
    let source = load_source(&args.input, args.name.as_deref())?;
    info!(
        name = %source.name,
        bytes = source.template.len(),
        "Transpiling chat template"
    );

    let config = args
        .context_fields
        .iter()
        .fold(GeneratorConfig::default(), |config, field| {
            config.with_context_field(field.as_str())
        });

    GeneratedRenderer::from_source(&source, &config)
        .with_context(|| format!("Failed to transpile chat template from {}", args.input.display()))
}

/// Resolve the input path to a template source.
fn load_source(input: &Path, name: Option<&str>) -> Result<ChatTemplateSource> {
    let config_path = if input.is_dir() {
        Some(input.join(TOKENIZER_CONFIG))
    } else if input.extension().is_some_and(|ext| ext == "json") {
        Some(input.to_path_buf())
    } else {
        None
    };

    let mut source = match config_path {
        Some(path) => ChatTemplateSource::from_tokenizer_config(&path)?,
        None => ChatTemplateSource::from_template_file(input, name)
            .with_context(|| format!("Failed to read template {}", input.display()))?,
    };

    if let Some(name) = name {
        source.name = sanitize_type_name(name);
    }
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn model_dir(temp: &TempDir, model: &str, config: &str) -> PathBuf {
        let dir = temp.path().join(model);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(TOKENIZER_CONFIG), config).unwrap();
        dir
    }

    fn args(input: PathBuf) -> Args {
        Args {
            input,
            name: None,
            out_dir: None,
            stdout: false,
            context_fields: Vec::new(),
        }
    }

    #[test]
    fn test_directory_input_reads_tokenizer_config() {
        let temp = TempDir::new().unwrap();
        let dir = model_dir(&temp, "Llama-3.2-1B", r#"{"chat_template": "{{ messages }}"}"#);

        let source = load_source(&dir, None).unwrap();
        assert_eq!(source.name, "Llama-32-1B");
        assert_eq!(source.template, "{{ messages }}");
    }

    #[test]
    fn test_name_override() {
        let temp = TempDir::new().unwrap();
        let dir = model_dir(&temp, "model", r#"{"chat_template": "x"}"#);

        let source = load_source(&dir.join(TOKENIZER_CONFIG), Some("My Model")).unwrap();
        assert_eq!(source.name, "MyModel");
    }

    #[test]
    fn test_template_file_input() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("chat_template.jinja");
        fs::write(&path, "{{ bos_token }}").unwrap();

        let mut args = args(path);
        args.name = Some("Phi".to_string());
        args.context_fields = vec!["bos_token".to_string()];

        let renderer = transpile(&args).unwrap();
        assert_eq!(renderer.file_name(), "Phi.rs");
        assert!(renderer.code.contains("pub bos_token: Value,"));
    }

    #[test]
    fn test_missing_chat_template_is_an_error() {
        let temp = TempDir::new().unwrap();
        let dir = model_dir(&temp, "m", r#"{"eos_token": "</s>"}"#);
        assert!(transpile(&args(dir)).is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "chat-template",
            "models/Qwen",
            "--name",
            "Qwen",
            "--out-dir",
            "generated",
            "--context-field",
            "bos_token",
            "--context-field",
            "eos_token",
        ])
        .unwrap();
        assert_eq!(args.input, PathBuf::from("models/Qwen"));
        assert_eq!(args.name.as_deref(), Some("Qwen"));
        assert_eq!(args.out_dir, Some(PathBuf::from("generated")));
        assert!(!args.stdout);
        assert_eq!(args.context_fields, vec!["bos_token", "eos_token"]);
    }
}
