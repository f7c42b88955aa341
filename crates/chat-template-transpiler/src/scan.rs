/*
 * scan.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Quote- and bracket-aware scanning of expression text.
//!
//! The parser and the expression rewriter split raw expressions at top-level
//! operators (`=`, ` in `, ` and `, ` or `, ` is `). "Top level" means outside
//! string literals and outside any `()`, `[]` or `{}` nesting. This is a small
//! state machine, not an expression parser.

use std::str::CharIndices;

/// Iterator over the characters of an expression that sit at top level.
///
/// Quote characters and everything inside string literals are skipped. An
/// opening bracket is reported when it opens depth 1; a closing bracket when
/// it returns to depth 0. Characters nested deeper are skipped.
pub(crate) struct TopLevel<'a> {
    chars: CharIndices<'a>,
    depth: usize,
    quote: Option<char>,
}

impl<'a> TopLevel<'a> {
    pub(crate) fn new(source: &'a str) -> Self {
        Self {
            chars: source.char_indices(),
            depth: 0,
            quote: None,
        }
    }
}

impl Iterator for TopLevel<'_> {
    type Item = (usize, char);

    fn next(&mut self) -> Option<(usize, char)> {
        while let Some((index, ch)) = self.chars.next() {
            if let Some(quote) = self.quote {
                if ch == '\\' {
                    self.chars.next();
                } else if ch == quote {
                    self.quote = None;
                }
                continue;
            }

            match ch {
                '\'' | '"' => self.quote = Some(ch),
                '(' | '[' | '{' => {
                    self.depth += 1;
                    if self.depth == 1 {
                        return Some((index, ch));
                    }
                }
                ')' | ']' | '}' => {
                    self.depth = self.depth.saturating_sub(1);
                    if self.depth == 0 {
                        return Some((index, ch));
                    }
                }
                _ if self.depth == 0 => return Some((index, ch)),
                _ => {}
            }
        }
        None
    }
}

/// Byte index of the first top-level occurrence of `target`.
pub(crate) fn find_top_level_char(source: &str, target: char) -> Option<usize> {
    TopLevel::new(source)
        .find(|&(_, ch)| ch == target)
        .map(|(index, _)| index)
}

/// Byte indices of every top-level occurrence of `word` that is delimited by
/// whitespace on both sides.
pub(crate) fn top_level_word_indices(source: &str, word: &str) -> Vec<usize> {
    TopLevel::new(source)
        .filter(|&(index, _)| is_delimited_word_at(source, index, word))
        .map(|(index, _)| index)
        .collect()
}

/// Byte index of the first whitespace-delimited top-level `word`.
pub(crate) fn find_top_level_word(source: &str, word: &str) -> Option<usize> {
    top_level_word_indices(source, word).into_iter().next()
}

/// Split `source` at every whitespace-delimited top-level `word`.
///
/// Returns a single part when the word does not occur.
pub(crate) fn split_top_level_word<'a>(source: &'a str, word: &str) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut start = 0;
    for index in top_level_word_indices(source, word) {
        if index < start {
            continue;
        }
        parts.push(&source[start..index]);
        start = index + word.len();
    }
    parts.push(&source[start..]);
    parts
}

/// Given the byte index of an opening bracket, find its matching closer.
pub(crate) fn find_matching_close(source: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut chars = source[open..].char_indices();

    while let Some((index, ch)) = chars.next() {
        if let Some(q) = quote {
            if ch == '\\' {
                chars.next();
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' => quote = Some(ch),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(open + index);
                }
            }
            _ => {}
        }
    }
    None
}

fn is_delimited_word_at(source: &str, index: usize, word: &str) -> bool {
    if index == 0 || !source[index..].starts_with(word) {
        return false;
    }
    let before = source[..index].chars().next_back();
    let after = source[index + word.len()..].chars().next();
    matches!(before, Some(c) if c.is_whitespace()) && matches!(after, Some(c) if c.is_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_level_skips_string_contents() {
        assert_eq!(find_top_level_char("'a|b' | tojson", '|'), Some(6));
        assert_eq!(find_top_level_char("\"a|b\"", '|'), None);
    }

    #[test]
    fn test_top_level_skips_nested_brackets() {
        assert_eq!(find_top_level_char("x[a|b]", '|'), None);
        assert_eq!(find_top_level_char("(a = b) = c", '='), Some(8));
    }

    #[test]
    fn test_escaped_quote_stays_inside_literal() {
        assert_eq!(find_top_level_char(r"'it\'s | here' | x", '|'), Some(15));
    }

    #[test]
    fn test_word_must_be_whitespace_delimited() {
        assert_eq!(find_top_level_word("index in items", "in"), Some(6));
        assert_eq!(find_top_level_word("information", "in"), None);
        assert_eq!(find_top_level_word("x in", "in"), None);
    }

    #[test]
    fn test_word_inside_literal_is_ignored() {
        assert_eq!(find_top_level_word("'a or b' or c", "or"), Some(9));
    }

    #[test]
    fn test_split_top_level_word() {
        assert_eq!(
            split_top_level_word("a or (b or c) or d", "or"),
            vec!["a ", " (b or c) ", " d"]
        );
        assert_eq!(split_top_level_word("single", "or"), vec!["single"]);
    }

    #[test]
    fn test_find_matching_close() {
        let source = "a[b['c]'][0]] + 1";
        assert_eq!(find_matching_close(source, 1), Some(12));
        assert_eq!(find_matching_close("(unclosed", 0), None);
    }
}
