/*
 * build.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Transpiles every `fixtures/*.jinja` template into `$OUT_DIR/<stem>.rs`.
//! The conformance tests `include!` the generated renderers and run them.

use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::PathBuf;

fn main() -> Result<()> {
    println!("cargo:rerun-if-changed=fixtures");

    let out_dir = PathBuf::from(env::var("OUT_DIR").context("OUT_DIR is not set")?);

    let mut fixtures: Vec<PathBuf> = fs::read_dir("fixtures")
        .context("Failed to list fixtures")?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "jinja"))
        .collect();
    fixtures.sort();

    for path in fixtures {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .with_context(|| format!("Fixture name is not UTF-8: {}", path.display()))?;
        let template = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let code = chat_template_transpiler::transpile(&template, "Renderer")
            .with_context(|| format!("Failed to transpile {}", path.display()))?;
        fs::write(out_dir.join(format!("{stem}.rs")), code)
            .with_context(|| format!("Failed to write renderer for {}", path.display()))?;
        println!("cargo:rerun-if-changed={}", path.display());
    }

    Ok(())
}
