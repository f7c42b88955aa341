/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Conformance checks for generated chat template renderers.
//!
//! `build.rs` transpiles each template in `fixtures/` with
//! `chat-template-transpiler`. The tests in `tests/render.rs` compile the
//! generated modules with `include!` and compare their output byte for byte
//! with hand-computed reference prompts.
