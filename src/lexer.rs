//! Call-site lexer for route registration files.
//!
//! The route scanner does not parse the handler language. It walks the raw text with a small
//! state machine that only knows about comments, string literals and occurrences of
//! `<routerObject>.` in code, which is enough to cut a file into one segment per route
//! registration:
//!
//! | state          | enters on        | leaves on            |
//! |----------------|------------------|----------------------|
//! | `Code`         | start            |                      |
//! | `LineComment`  | `//`             | newline              |
//! | `BlockComment` | `/*`, `/**/`     | `*/`                 |
//! | `DocComment`   | `/**`            | `*/` (block kept)    |
//! | `Quoted`       | `'`, `"`, `` ` `` | same quote, unescaped |
//! | `Regex`        | `/` where an operand is expected | `/` outside `[...]`, unescaped; newline |
//!
//! Router tokens are only recognised in `Code`, so registrations inside comments or strings
//! (commented-out routes, log messages) never produce a call site. A `/` starts a regular
//! expression literal at the start of a line or after one of [`OPERAND_PRECEDERS`]; anywhere
//! else it is a division.

use log::trace;

/// Bytes after which a `/` opens a regular expression literal rather than dividing.
pub const OPERAND_PRECEDERS: &[u8] = b"(,=:[!&|?{};";

/// A string literal found in code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Literal {
    /// Raw text between the quotes
    pub value: String,
    /// Template literal containing `${`
    pub interpolated: bool,
}

/// One `<routerObject>.` occurrence and the text that belongs to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite<'a> {
    /// Byte offset of the router object token
    pub offset: usize,
    /// Text after `<routerObject>.` up to the next call site or end of file
    pub segment: &'a str,
    /// Content of the documentation block closest to this call site, if any
    pub doc_block: Option<&'a str>,
    /// First string literal inside the segment
    pub first_literal: Option<Literal>,
}

impl<'a> CallSite<'a> {
    /// Text up to the first `(`, i.e. the invoked method name.
    pub fn method(&self) -> &'a str {
        self.segment.split('(').next().unwrap_or("").trim()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Code,
    LineComment,
    BlockComment,
    DocComment { start: usize },
    Quoted { quote: u8, start: usize, escaped: bool },
    Regex { in_class: bool, escaped: bool },
}

/// Splits source text into router call sites.
pub struct CallSiteLexer<'a> {
    source: &'a str,
    token: String,
}

impl<'a> CallSiteLexer<'a> {
    /// Creates a lexer looking for `<router_object>.` in `source`.
    pub fn new(source: &'a str, router_object: &str) -> Self {
        Self {
            source,
            token: format!("{}.", router_object),
        }
    }

    /// Runs the state machine and returns the call sites in textual order.
    pub fn call_sites(&self) -> Vec<CallSite<'a>> {
        let bytes = self.source.as_bytes();
        let token = self.token.as_bytes();

        // (offset, body start, doc block, first literal)
        let mut sites: Vec<(usize, usize, Option<&'a str>, Option<Literal>)> = Vec::new();
        let mut last_doc: Option<&'a str> = None;
        let mut state = State::Code;
        let mut expect_operand = true;
        let mut i = 0;

        while i < bytes.len() {
            let b = bytes[i];
            let next = bytes.get(i + 1).copied();

            match state {
                State::Code => {
                    if b == b'/' && next == Some(b'/') {
                        state = State::LineComment;
                        i += 2;
                        continue;
                    }
                    if b == b'/' && next == Some(b'*') {
                        let is_doc = bytes.get(i + 2) == Some(&b'*') && bytes.get(i + 3) != Some(&b'/');
                        state = if is_doc {
                            State::DocComment { start: i + 3 }
                        } else {
                            State::BlockComment
                        };
                        i += if is_doc { 3 } else { 2 };
                        continue;
                    }
                    if b == b'/' && expect_operand {
                        state = State::Regex {
                            in_class: false,
                            escaped: false,
                        };
                        i += 1;
                        continue;
                    }
                    if b == b'\'' || b == b'"' || b == b'`' {
                        state = State::Quoted {
                            quote: b,
                            start: i + 1,
                            escaped: false,
                        };
                        i += 1;
                        continue;
                    }
                    if bytes[i..].starts_with(token) && !Self::continues_identifier(bytes, i) {
                        trace!("Call site at byte {}", i);
                        sites.push((i, i + token.len(), last_doc.take(), None));
                        expect_operand = false;
                        i += token.len();
                        continue;
                    }
                    if b == b'\n' {
                        expect_operand = true;
                    } else if !b.is_ascii_whitespace() {
                        expect_operand = OPERAND_PRECEDERS.contains(&b);
                    }
                    i += 1;
                }
                State::LineComment => {
                    if b == b'\n' {
                        state = State::Code;
                        expect_operand = true;
                    }
                    i += 1;
                }
                State::Regex { in_class, escaped } => {
                    state = if escaped {
                        State::Regex {
                            in_class,
                            escaped: false,
                        }
                    } else if b == b'\\' {
                        State::Regex {
                            in_class,
                            escaped: true,
                        }
                    } else if b == b'\n' {
                        // unterminated, so it was not a regular expression
                        expect_operand = true;
                        State::Code
                    } else if in_class {
                        State::Regex {
                            in_class: b != b']',
                            escaped: false,
                        }
                    } else if b == b'[' {
                        State::Regex {
                            in_class: true,
                            escaped: false,
                        }
                    } else if b == b'/' {
                        expect_operand = false;
                        State::Code
                    } else {
                        state
                    };
                    i += 1;
                }
                State::BlockComment => {
                    if b == b'*' && next == Some(b'/') {
                        state = State::Code;
                        i += 2;
                    } else {
                        i += 1;
                    }
                }
                State::DocComment { start } => {
                    if b == b'*' && next == Some(b'/') {
                        last_doc = Some(&self.source[start..i]);
                        state = State::Code;
                        i += 2;
                    } else {
                        i += 1;
                    }
                }
                State::Quoted {
                    quote,
                    start,
                    escaped,
                } => {
                    if escaped {
                        state = State::Quoted {
                            quote,
                            start,
                            escaped: false,
                        };
                    } else if b == b'\\' {
                        state = State::Quoted {
                            quote,
                            start,
                            escaped: true,
                        };
                    } else if b == quote {
                        let value = &self.source[start..i];
                        if let Some(site) = sites.last_mut() {
                            if site.3.is_none() {
                                site.3 = Some(Literal {
                                    value: value.to_string(),
                                    interpolated: quote == b'`' && value.contains("${"),
                                });
                            }
                        }
                        expect_operand = false;
                        state = State::Code;
                    }
                    i += 1;
                }
            }
        }

        let mut call_sites = Vec::with_capacity(sites.len());
        for (index, (offset, body_start, doc_block, first_literal)) in sites.iter().enumerate() {
            let end = sites
                .get(index + 1)
                .map_or(self.source.len(), |next| next.0);
            call_sites.push(CallSite {
                offset: *offset,
                segment: &self.source[*body_start..end],
                doc_block: *doc_block,
                first_literal: first_literal.clone(),
            });
        }
        call_sites
    }

    /// Whether the byte before `at` glues the token to a longer name (`myrouter.`, `app.router.`).
    fn continues_identifier(bytes: &[u8], at: usize) -> bool {
        match at.checked_sub(1).map(|p| bytes[p]) {
            Some(prev) => {
                prev.is_ascii_alphanumeric() || prev == b'_' || prev == b'$' || prev == b'.' || prev >= 0x80
            }
            None => false,
        }
    }
}
