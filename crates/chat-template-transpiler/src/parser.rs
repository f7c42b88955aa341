/*
 * parser.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Recursive-descent parser producing the template AST.
//!
//! The parser pulls tokens from the [`Lexer`] one at a time. Statement tags
//! are split into a head keyword and a remainder; `if` and `for` recurse into
//! their bodies until one of the expected terminator tags is seen.

use crate::ast::{Branch, Expr, ForNode, IfNode, Node, Root, SetNode};
use crate::error::{Position, TranspileError, TranspileResult};
use crate::lexer::{Lexer, Token, TokenKind};
use crate::scan::{find_top_level_char, find_top_level_word};

const IF: &str = "if";
const ELIF: &str = "elif";
const ELSE: &str = "else";
const ENDIF: &str = "endif";
const FOR: &str = "for";
const ENDFOR: &str = "endfor";
const SET: &str = "set";

/// Parse a complete template into its [`Root`] node.
pub fn parse_template(source: &str) -> TranspileResult<Root> {
    Parser::new(source)?.parse_template()
}

/// Template parser over a lazily-lexed token stream.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
}

impl<'a> Parser<'a> {
    /// Create a parser positioned on the first token of `source`.
    pub fn new(source: &'a str) -> TranspileResult<Self> {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token()?;
        Ok(Self { lexer, current })
    }

    /// Parse the whole token stream.
    pub fn parse_template(mut self) -> TranspileResult<Root> {
        let children = self.parse_until(None)?;
        if self.current.kind != TokenKind::EndOfInput {
            return Err(TranspileError::MismatchedTag {
                expected: "end of template".to_string(),
                found: self.current.value.trim().to_string(),
                position: self.position(),
            });
        }
        tracing::debug!(nodes = children.len(), "Parsed chat template");
        Ok(Root::new(children))
    }

    fn advance(&mut self) -> TranspileResult<()> {
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    fn position(&self) -> Position {
        Position::locate(self.lexer.source(), self.current.position)
    }

    /// Parse nodes until a tag whose head is in `terminators`.
    ///
    /// The terminating tag is left as the current token for the caller. With
    /// no terminators, parsing runs to the end of input.
    fn parse_until(&mut self, terminators: Option<&[&str]>) -> TranspileResult<Vec<Node>> {
        let mut nodes = Vec::new();

        loop {
            match self.current.kind {
                TokenKind::EndOfInput => break,
                TokenKind::Text => {
                    nodes.push(Node::Text(std::mem::take(&mut self.current.value)));
                    self.advance()?;
                }
                TokenKind::Output => {
                    let expr = self.current.value.trim();
                    if expr.is_empty() {
                        return Err(TranspileError::MalformedTag {
                            tag: self.current.value.clone(),
                            message: "empty output expression".to_string(),
                            position: self.position(),
                        });
                    }
                    nodes.push(Node::Output(Expr::new(expr, self.position())));
                    self.advance()?;
                }
                TokenKind::Tag => {
                    let tag = self.current.value.trim().to_string();
                    let head = first_word(&tag);

                    if terminators.is_some_and(|t| t.contains(&head)) {
                        return Ok(nodes);
                    }

                    match head {
                        IF => nodes.push(Node::If(self.parse_if()?)),
                        FOR => nodes.push(Node::For(self.parse_for()?)),
                        SET => nodes.push(Node::Set(self.parse_set()?)),
                        ELIF | ELSE | ENDIF | ENDFOR => {
                            return Err(TranspileError::MismatchedTag {
                                expected: match terminators {
                                    Some(t) => t.join(" or "),
                                    None => "a statement".to_string(),
                                },
                                found: head.to_string(),
                                position: self.position(),
                            });
                        }
                        _ => {
                            return Err(TranspileError::UnsupportedTag {
                                head: head.to_string(),
                                tag,
                                position: self.position(),
                            });
                        }
                    }
                }
            }
        }

        match terminators {
            Some(expected) => Err(TranspileError::UnexpectedEndOfInput {
                expected: expected.iter().map(|s| s.to_string()).collect(),
            }),
            None => Ok(nodes),
        }
    }

    /// `{% if cond %} ... {% elif cond %} ... {% else %} ... {% endif %}`
    fn parse_if(&mut self) -> TranspileResult<IfNode> {
        let condition = self.tag_remainder(IF)?;
        self.advance()?;

        let body = self.parse_until(Some(&[ELIF, ELSE, ENDIF]))?;
        let mut branches = vec![Branch { condition, body }];
        let mut else_body = None;

        // parse_until only returns Ok on one of the terminators
        loop {
            let tag = self.current.value.trim().to_string();
            match first_word(&tag) {
                ELIF => {
                    let condition = self.tag_remainder(ELIF)?;
                    self.advance()?;
                    let body = self.parse_until(Some(&[ELIF, ELSE, ENDIF]))?;
                    branches.push(Branch { condition, body });
                }
                ELSE => {
                    self.advance()?;
                    else_body = Some(self.parse_until(Some(&[ENDIF]))?);
                    break;
                }
                _ => break,
            }
        }

        self.expect_tag(ENDIF)?;
        self.advance()?;

        Ok(IfNode {
            branches,
            else_body,
        })
    }

    /// `{% for variable in iterable %} ... {% endfor %}`
    fn parse_for(&mut self) -> TranspileResult<ForNode> {
        let tag = self.current.value.trim().to_string();
        let rest = tag[FOR.len()..].trim();

        let split = find_top_level_word(rest, "in")
            .ok_or_else(|| self.malformed(&tag, "expected 'for <name> in <iterable>'"))?;
        let variable = rest[..split].trim();
        let iterable = rest[split + "in".len()..].trim();

        if !is_identifier(variable) {
            return Err(self.malformed(&tag, "loop variable must be a single identifier"));
        }
        if iterable.is_empty() {
            return Err(self.malformed(&tag, "missing iterable expression"));
        }

        let variable = variable.to_string();
        let iterable = Expr::new(iterable, self.position());
        self.advance()?;

        let body = self.parse_until(Some(&[ENDFOR]))?;
        self.expect_tag(ENDFOR)?;
        self.advance()?;

        Ok(ForNode {
            variable,
            iterable,
            body,
        })
    }

    /// `{% set name = expr %}`
    fn parse_set(&mut self) -> TranspileResult<SetNode> {
        let tag = self.current.value.trim().to_string();
        let rest = tag[SET.len()..].trim();

        let eq = find_top_level_char(rest, '=')
            .ok_or_else(|| self.malformed(&tag, "expected 'set <name> = <expression>'"))?;
        let name = rest[..eq].trim();
        let expr = rest[eq + 1..].trim();

        if !is_identifier(name) {
            return Err(self.malformed(&tag, "assignment target must be a single identifier"));
        }
        if expr.is_empty() {
            return Err(self.malformed(&tag, "missing value expression"));
        }

        let node = SetNode {
            name: name.to_string(),
            expr: Expr::new(expr, self.position()),
        };
        self.advance()?;
        Ok(node)
    }

    /// The text after the head keyword of the current tag, which must be non-empty.
    fn tag_remainder(&self, head: &str) -> TranspileResult<Expr> {
        let tag = self.current.value.trim();
        let remainder = tag[head.len()..].trim();
        if remainder.is_empty() {
            return Err(self.malformed(tag, "missing condition"));
        }
        Ok(Expr::new(remainder, self.position()))
    }

    fn expect_tag(&self, head: &str) -> TranspileResult<()> {
        let found = match self.current.kind {
            TokenKind::Tag => first_word(self.current.value.trim()),
            TokenKind::EndOfInput => {
                return Err(TranspileError::UnexpectedEndOfInput {
                    expected: vec![head.to_string()],
                });
            }
            _ => self.current.value.trim(),
        };
        if found != head {
            return Err(TranspileError::MismatchedTag {
                expected: head.to_string(),
                found: found.to_string(),
                position: self.position(),
            });
        }
        Ok(())
    }

    fn malformed(&self, tag: &str, message: &str) -> TranspileError {
        TranspileError::MalformedTag {
            tag: tag.to_string(),
            message: message.to_string(),
            position: self.position(),
        }
    }
}

/// First whitespace-delimited word of a tag body.
fn first_word(tag: &str) -> &str {
    let tag = tag.trim_start();
    let end = tag.find(char::is_whitespace).unwrap_or(tag.len());
    &tag[..end]
}

/// ASCII identifier check used for loop variables and `set` targets.
pub(crate) fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
