/*
 * lexer.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Lexer for the chat template micro-grammar.
//!
//! Templates are literal text interleaved with `{{ expression }}` output tags,
//! `{% statement %}` tags and `{# comment #}` blocks. The lexer produces
//! tokens one at a time, left to right, without backtracking. Expressions are
//! not tokenized here: the body of a tag is captured as an opaque string.
//!
//! Whitespace control follows Jinja's explicit markers: `{{-` / `{%-` / `{#-`
//! strip whitespace at the end of the preceding text and `-}}` / `-%}` / `-#}`
//! strip whitespace at the start of the following text.

use crate::error::{Position, TranspileError, TranspileResult};

/// The kind of a lexed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Literal text between tags.
    Text,
    /// Body of a `{{ ... }}` tag.
    Output,
    /// Body of a `{% ... %}` tag.
    Tag,
    /// End of the template. Returned repeatedly once reached.
    EndOfInput,
}

/// A single token with the byte offset where it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub position: usize,
}

impl Token {
    fn new(kind: TokenKind, value: impl Into<String>, position: usize) -> Self {
        Self {
            kind,
            value: value.into(),
            position,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delimiter {
    Output,
    Tag,
    Comment,
}

impl Delimiter {
    fn open(self) -> &'static str {
        match self {
            Delimiter::Output => "{{",
            Delimiter::Tag => "{%",
            Delimiter::Comment => "{#",
        }
    }

    fn close(self) -> &'static str {
        match self {
            Delimiter::Output => "}}",
            Delimiter::Tag => "%}",
            Delimiter::Comment => "#}",
        }
    }
}

/// Lazily scans a template into [`Token`]s.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    source: &'a str,
    cursor: usize,
    /// Set after a closing `-}}` / `-%}` / `-#}` until the next text is produced.
    trim_next_text: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            cursor: 0,
            trim_next_text: false,
        }
    }

    /// The full template source being scanned.
    pub fn source(&self) -> &'a str {
        self.source
    }

    /// Produce the next token.
    ///
    /// The only failure is an unterminated delimiter, reported at the offset
    /// where the delimiter starts.
    pub fn next_token(&mut self) -> TranspileResult<Token> {
        loop {
            if self.cursor >= self.source.len() {
                return Ok(Token::new(TokenKind::EndOfInput, "", self.source.len()));
            }

            let source = self.source;
            let start = self.cursor;
            let rest = &source[start..];

            match find_delimiter(rest) {
                None => {
                    let text = self.take_text(rest, false);
                    self.cursor = self.source.len();
                    if !text.is_empty() {
                        return Ok(Token::new(TokenKind::Text, text, start));
                    }
                }
                Some((idx, _)) if idx > 0 => {
                    let left_trim = rest[idx + 2..].starts_with('-');
                    let text = self.take_text(&rest[..idx], left_trim);
                    self.cursor = start + idx;
                    if !text.is_empty() {
                        return Ok(Token::new(TokenKind::Text, text, start));
                    }
                }
                Some((_, delimiter)) => {
                    self.trim_next_text = false;
                    let body = self.scan_delimited(start, delimiter)?;
                    match delimiter {
                        Delimiter::Output => {
                            return Ok(Token::new(TokenKind::Output, body, start));
                        }
                        Delimiter::Tag => return Ok(Token::new(TokenKind::Tag, body, start)),
                        Delimiter::Comment => {}
                    }
                }
            }
        }
    }

    /// Apply pending and upcoming trim markers to a run of literal text.
    fn take_text(&mut self, text: &'a str, trim_end: bool) -> &'a str {
        let mut text = text;
        if std::mem::take(&mut self.trim_next_text) {
            text = text.trim_start();
        }
        if trim_end {
            text = text.trim_end();
        }
        text
    }

    /// Consume a delimited block starting at `start` and return its body with
    /// trim markers removed.
    fn scan_delimited(&mut self, start: usize, delimiter: Delimiter) -> TranspileResult<&'a str> {
        let source = self.source;
        let open_len = delimiter.open().len();
        let left_trim = source[start + open_len..].starts_with('-');
        let body_start = start + open_len + usize::from(left_trim);

        let end = source[body_start..]
            .find(delimiter.close())
            .map(|found| body_start + found)
            .ok_or_else(|| TranspileError::UnterminatedDelimiter {
                delimiter: delimiter.open(),
                position: Position::locate(source, start),
            })?;

        let mut body = &source[body_start..end];
        let right_trim = body.ends_with('-');
        if right_trim {
            body = &body[..body.len() - 1];
        }

        self.cursor = end + delimiter.close().len();
        self.trim_next_text = right_trim;
        Ok(body)
    }
}

/// Find the nearest `{{`, `{%` or `{#` in `rest`.
fn find_delimiter(rest: &str) -> Option<(usize, Delimiter)> {
    let bytes = rest.as_bytes();
    let mut from = 0;
    while let Some(found) = rest[from..].find('{') {
        let idx = from + found;
        match bytes.get(idx + 1) {
            Some(b'{') => return Some((idx, Delimiter::Output)),
            Some(b'%') => return Some((idx, Delimiter::Tag)),
            Some(b'#') => return Some((idx, Delimiter::Comment)),
            _ => from = idx + 1,
        }
    }
    None
}
