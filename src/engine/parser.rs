//! Text → parse-tree parser with a configurable delimiter pair.
//!
//! Parsing a source string yields one tree per `{{ define "name" }}` block
//! plus a "main" tree holding everything outside the defines. The delimiter
//! pair is an argument so the directive preprocessor can run the same parser
//! with `{{#` `#}}` while every other delimiter passes through as plain text.

use crate::core::{Result, TemplarError};

use super::node::{Branch, Expr, Node, Tree, TemplateCall};

/// The host engine's default delimiters.
pub const DEFAULT_DELIMS: (&str, &str) = ("{{", "}}");

/// The alternate pair reserved for preprocess-time directives.
pub const DIRECTIVE_DELIMS: (&str, &str) = ("{{#", "#}}");

/// Parses `text` into named trees. The main tree (interstitial content) is
/// named `name`; each `define` contributes an additional tree.
pub fn parse(name: &str, text: &str, delims: (&str, &str)) -> Result<Vec<Tree>> {
    let mut parser = Parser {
        name,
        src: text,
        pos: 0,
        line: 1,
        tag_line: 1,
        left: delims.0,
        right: delims.1,
        defines: Vec::new(),
    };
    let (root, term) = parser.parse_list(true)?;
    match term {
        Terminator::Eof => {}
        Terminator::End => return Err(parser.error("unexpected {{end}}")),
        Terminator::Else => return Err(parser.error("unexpected {{else}}")),
    }
    let mut trees = vec![Tree { name: name.to_string(), root }];
    trees.append(&mut parser.defines);
    Ok(trees)
}

enum Item {
    Text(String),
    Comment(String),
    Tag(String),
    Eof,
}

enum Terminator {
    Eof,
    End,
    Else,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Int(i64),
    Field(Vec<String>),
    Dot,
}

struct Parser<'a> {
    name: &'a str,
    src: &'a str,
    pos: usize,
    /// Current scan line, tracked as text is consumed.
    line: usize,
    /// Line where the most recent tag started; errors report this.
    tag_line: usize,
    left: &'a str,
    right: &'a str,
    defines: Vec<Tree>,
}

impl<'a> Parser<'a> {
    fn error(&self, message: impl Into<String>) -> TemplarError {
        TemplarError::Parse {
            name: self.name.to_string(),
            line: self.tag_line,
            message: message.into(),
        }
    }

    fn advance(&mut self, len: usize) {
        let consumed = &self.src[self.pos..self.pos + len];
        self.line += consumed.bytes().filter(|&b| b == b'\n').count();
        self.pos += len;
    }

    fn next_item(&mut self) -> Result<Item> {
        if self.pos >= self.src.len() {
            return Ok(Item::Eof);
        }
        let rest = &self.src[self.pos..];
        match rest.find(self.left) {
            None => {
                let text = rest.to_string();
                self.advance(rest.len());
                Ok(Item::Text(text))
            }
            Some(0) => self.scan_tag(),
            Some(n) => {
                let text = rest[..n].to_string();
                self.advance(n);
                Ok(Item::Text(text))
            }
        }
    }

    /// Scans one delimited tag. `self.pos` sits on the left delimiter.
    fn scan_tag(&mut self) -> Result<Item> {
        self.tag_line = self.line;
        self.advance(self.left.len());
        let rest = &self.src[self.pos..];

        if let Some(body) = rest.strip_prefix("/*") {
            let end = body
                .find("*/")
                .ok_or_else(|| self.error("unclosed comment"))?;
            let comment = body[..end].to_string();
            let after = &body[end + 2..];
            if !after.starts_with(self.right) {
                return Err(self.error("comment must be closed by the right delimiter"));
            }
            self.advance(2 + end + 2 + self.right.len());
            return Ok(Item::Comment(comment));
        }

        // Find the right delimiter, skipping over quoted strings. Byte
        // scanning is safe: the delimiter is ASCII, so any match lands on a
        // character boundary.
        let bytes = rest.as_bytes();
        let right = self.right.as_bytes();
        let mut i = 0;
        let mut in_string = false;
        while i < bytes.len() {
            if in_string {
                match bytes[i] {
                    b'\\' => i += 1,
                    b'"' => in_string = false,
                    _ => {}
                }
            } else if bytes[i] == b'"' {
                in_string = true;
            } else if bytes[i..].starts_with(right) {
                let content = rest[..i].to_string();
                self.advance(i + self.right.len());
                return Ok(Item::Tag(content));
            }
            i += 1;
        }
        Err(self.error("unclosed action"))
    }

    /// Parses nodes until a terminator. `define` is only legal at the top
    /// level (`top == true`); `else`/`end` are only legal inside a block.
    fn parse_list(&mut self, top: bool) -> Result<(Vec<Node>, Terminator)> {
        let mut nodes = Vec::new();
        loop {
            match self.next_item()? {
                Item::Eof => return Ok((nodes, Terminator::Eof)),
                Item::Text(text) => {
                    if !text.is_empty() {
                        nodes.push(Node::Text(text));
                    }
                }
                Item::Comment(comment) => nodes.push(Node::Comment(comment)),
                Item::Tag(content) => {
                    let tokens = self.tokenize(&content)?;
                    let Some(first) = tokens.first().cloned() else {
                        return Err(self.error("empty action"));
                    };
                    match first {
                        Token::Ident(kw) if kw == "end" => {
                            if top {
                                return Err(self.error("unexpected {{end}}"));
                            }
                            return Ok((nodes, Terminator::End));
                        }
                        Token::Ident(kw) if kw == "else" => {
                            if top {
                                return Err(self.error("unexpected {{else}}"));
                            }
                            return Ok((nodes, Terminator::Else));
                        }
                        Token::Ident(kw) if kw == "define" => {
                            if !top {
                                return Err(self.error("define is only allowed at the top level"));
                            }
                            let tree_name = match &tokens[1..] {
                                [Token::Str(s)] => s.clone(),
                                _ => return Err(self.error("define requires a quoted name")),
                            };
                            let (body, term) = self.parse_list(false)?;
                            match term {
                                Terminator::End => {}
                                _ => return Err(self.error("unclosed define")),
                            }
                            self.defines.push(Tree { name: tree_name, root: body });
                        }
                        Token::Ident(kw) if kw == "template" => {
                            let call = self.parse_template_call(&tokens[1..])?;
                            nodes.push(Node::TemplateCall(call));
                        }
                        Token::Ident(kw) if kw == "if" || kw == "range" || kw == "with" => {
                            let branch = self.parse_branch(&tokens[1..])?;
                            nodes.push(match kw.as_str() {
                                "if" => Node::If(branch),
                                "range" => Node::Range(branch),
                                _ => Node::With(branch),
                            });
                        }
                        _ => {
                            let expr = self.parse_expr(&tokens)?;
                            nodes.push(Node::Action(expr));
                        }
                    }
                }
            }
        }
    }

    fn parse_template_call(&mut self, tokens: &[Token]) -> Result<TemplateCall> {
        let Some(Token::Str(name)) = tokens.first() else {
            return Err(self.error("template requires a quoted name"));
        };
        let arg = match &tokens[1..] {
            [] => None,
            rest => Some(self.parse_expr(rest)?),
        };
        Ok(TemplateCall { name: name.clone(), arg })
    }

    fn parse_branch(&mut self, pipe_tokens: &[Token]) -> Result<Branch> {
        let pipe = self.parse_expr(pipe_tokens)?;
        let (body, term) = self.parse_list(false)?;
        let otherwise = match term {
            Terminator::End => Vec::new(),
            Terminator::Else => {
                let (otherwise, term) = self.parse_list(false)?;
                match term {
                    Terminator::End => otherwise,
                    _ => return Err(self.error("unclosed block")),
                }
            }
            Terminator::Eof => return Err(self.error("unclosed block")),
        };
        Ok(Branch { pipe, body, otherwise })
    }

    fn parse_expr(&mut self, tokens: &[Token]) -> Result<Expr> {
        match tokens {
            [] => Err(self.error("empty action")),
            [Token::Ident(name), rest @ ..] if name != "true" && name != "false" => {
                let args = rest
                    .iter()
                    .map(|t| self.atom(t))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Expr::Call { name: name.clone(), args })
            }
            [single] => self.atom(single),
            _ => Err(self.error("unexpected tokens after expression")),
        }
    }

    fn atom(&self, token: &Token) -> Result<Expr> {
        Ok(match token {
            Token::Dot => Expr::Dot,
            Token::Field(chain) => Expr::Field(chain.clone()),
            Token::Str(s) => Expr::Str(s.clone()),
            Token::Int(n) => Expr::Int(*n),
            Token::Ident(id) => match id.as_str() {
                "true" => Expr::Bool(true),
                "false" => Expr::Bool(false),
                name => Expr::Call { name: name.to_string(), args: Vec::new() },
            },
        })
    }

    fn tokenize(&self, content: &str) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        let bytes = content.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            let c = bytes[i];
            match c {
                b' ' | b'\t' | b'\r' | b'\n' => i += 1,
                b'"' => {
                    let mut raw = Vec::new();
                    i += 1;
                    loop {
                        if i >= bytes.len() {
                            return Err(self.error("unterminated string literal"));
                        }
                        match bytes[i] {
                            b'"' => break,
                            b'\\' => {
                                i += 1;
                                let esc = *bytes
                                    .get(i)
                                    .ok_or_else(|| self.error("unterminated string literal"))?;
                                raw.push(match esc {
                                    b'n' => b'\n',
                                    b't' => b'\t',
                                    b'"' => b'"',
                                    b'\\' => b'\\',
                                    other => {
                                        return Err(self.error(format!(
                                            "unknown escape character '\\{}'",
                                            other as char
                                        )))
                                    }
                                });
                            }
                            other => raw.push(other),
                        }
                        i += 1;
                    }
                    i += 1;
                    tokens.push(Token::Str(String::from_utf8_lossy(&raw).into_owned()));
                }
                b'.' => {
                    let mut chain = Vec::new();
                    while i < bytes.len() && bytes[i] == b'.' {
                        i += 1;
                        let start = i;
                        while i < bytes.len() && is_ident_byte(bytes[i]) {
                            i += 1;
                        }
                        if i > start {
                            chain.push(content[start..i].to_string());
                        } else {
                            break;
                        }
                    }
                    if chain.is_empty() {
                        tokens.push(Token::Dot);
                    } else {
                        tokens.push(Token::Field(chain));
                    }
                }
                b'-' | b'0'..=b'9' => {
                    let start = i;
                    i += 1;
                    while i < bytes.len() && bytes[i].is_ascii_digit() {
                        i += 1;
                    }
                    let number = &content[start..i];
                    let value = number
                        .parse::<i64>()
                        .map_err(|_| self.error(format!("bad number literal '{number}'")))?;
                    tokens.push(Token::Int(value));
                }
                _ if is_ident_start(c) => {
                    let start = i;
                    while i < bytes.len() && is_ident_byte(bytes[i]) {
                        i += 1;
                    }
                    tokens.push(Token::Ident(content[start..i].to_string()));
                }
                _ => {
                    let offending = content[i..].chars().next().unwrap_or('?');
                    return Err(self.error(format!(
                        "unexpected character '{offending}' in action"
                    )));
                }
            }
        }
        Ok(tokens)
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}
