// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Document - whole-buffer parsing and ownership.
//!
//! A [`Document`] owns the source buffer and every token, value, and
//! definition derived from it, for its entire lifetime. Parsing scans the
//! buffer with the tokenizer (never raw byte search, so quotes and
//! comments are skipped correctly) for `#id = NAME(...);` clauses and
//! commits one [`Definition`] per clause in file order.
//!
//! Malformed clauses are recovered per definition: the clause is reported
//! as a [`Diagnostic`] and scanning resumes at the next plausible
//! `#id =`. A buffer that ends mid-definition keeps everything committed
//! before the truncation point and sets the `truncated` flag.
//!
//! Once `parse` returns the document is immutable; sharing it read-only
//! across threads is safe.

use crate::error::{context_snippet, Error, Result};
use crate::header::{self, HeaderInfo};
use crate::token::{Token, TokenType, Tokenizer};
use crate::value::{EncoderScratch, RawValue, ValueEncoder};
use std::fs::File;
use std::path::Path;

/// One committed `#id = NAME(...);` clause: the instance number, its Id
/// token, and the value index of the `Entity` holding name and attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Definition {
    pub id: u32,
    pub id_token: u32,
    pub value: u32,
}

/// A recovered parse problem: byte offset, short reason, and a snippet of
/// surrounding source text sufficient to locate the clause in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Diagnostic {
    pub offset: usize,
    pub message: String,
    pub snippet: String,
}

/// Source buffer ownership: pre-loaded bytes or a file mapping.
enum Source {
    Owned(Vec<u8>),
    Mapped(memmap2::Mmap),
}

impl Source {
    #[inline]
    fn bytes(&self) -> &[u8] {
        match self {
            Source::Owned(bytes) => bytes,
            Source::Mapped(map) => map,
        }
    }
}

/// A parsed STEP file: source buffer, token array, value store, and
/// definition table, all append-only and owned as a unit.
pub struct Document {
    source: Source,
    tokens: Vec<Token>,
    values: Vec<RawValue>,
    definitions: Vec<Definition>,
    header: Option<HeaderInfo>,
    truncated: bool,
    diagnostics: Vec<Diagnostic>,
}

struct Parsed {
    tokens: Vec<Token>,
    values: Vec<RawValue>,
    definitions: Vec<Definition>,
    truncated: bool,
    diagnostics: Vec<Diagnostic>,
}

impl Document {
    /// Parse a pre-loaded buffer. The document takes ownership of the
    /// bytes; an empty buffer yields an empty document, not an error.
    pub fn parse(source: impl Into<Vec<u8>>) -> Result<Self> {
        Self::build(Source::Owned(source.into()))
    }

    /// Parse UTF-8 text (copies it into an owned buffer).
    pub fn parse_str(source: &str) -> Result<Self> {
        Self::parse(source.as_bytes())
    }

    /// Parse a file through a memory mapping, so tokenization starts
    /// after a single bulk I/O step and spans stay zero-copy.
    pub fn parse_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Self::parse(Vec::new());
        }
        // Safety: the mapping is read-only and owned by the document for
        // its whole lifetime. Concurrent truncation of the underlying
        // file is the caller's contract, as with any mapped input.
        let map = unsafe { memmap2::Mmap::map(&file)? };
        Self::build(Source::Mapped(map))
    }

    fn build(source: Source) -> Result<Self> {
        if source.bytes().len() > u32::MAX as usize {
            return Err(Error::TooLarge);
        }
        let parsed = parse_buffer(source.bytes());
        let header = header::extract(source.bytes());
        tracing::debug!(
            definitions = parsed.definitions.len(),
            tokens = parsed.tokens.len(),
            values = parsed.values.len(),
            diagnostics = parsed.diagnostics.len(),
            truncated = parsed.truncated,
            "parsed STEP buffer"
        );
        Ok(Self {
            source,
            tokens: parsed.tokens,
            values: parsed.values,
            definitions: parsed.definitions,
            header,
            truncated: parsed.truncated,
            diagnostics: parsed.diagnostics,
        })
    }

    /// The raw source bytes.
    #[inline]
    pub fn source(&self) -> &[u8] {
        self.source.bytes()
    }

    /// Committed definitions, in file order. Duplicate ids are kept as
    /// separate definitions; merge policy belongs to the caller (the
    /// graph applies first-wins and reports the rest).
    #[inline]
    pub fn definitions(&self) -> &[Definition] {
        &self.definitions
    }

    /// The persisted token array (whitespace and comments excluded).
    #[inline]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// The flat value store.
    #[inline]
    pub fn values(&self) -> &[RawValue] {
        &self.values
    }

    #[inline]
    pub fn value(&self, index: u32) -> Option<RawValue> {
        self.values.get(index as usize).copied()
    }

    #[inline]
    pub fn token(&self, index: u32) -> Token {
        self.tokens[index as usize]
    }

    #[inline]
    pub fn token_bytes(&self, index: u32) -> &[u8] {
        self.token(index).bytes(self.source.bytes())
    }

    #[inline]
    pub fn token_text(&self, index: u32) -> &str {
        self.token(index).text(self.source.bytes())
    }

    /// Entity keyword of a definition, e.g. `IFCWALL`.
    pub fn entity_name(&self, definition: &Definition) -> &str {
        match self.value(definition.value) {
            Some(RawValue::Entity { name, .. }) => self.token_text(name),
            _ => "",
        }
    }

    /// A definition's attribute values: the direct children of its
    /// attribute list, as one contiguous slice.
    pub fn attributes(&self, definition: &Definition) -> &[RawValue] {
        match self.value(definition.value) {
            Some(RawValue::Entity { attrs, .. }) => self.children(attrs),
            _ => &[],
        }
    }

    /// Direct children of the `List` value at `list_index`; empty for
    /// anything that is not a list.
    pub fn children(&self, list_index: u32) -> &[RawValue] {
        match self.value(list_index) {
            Some(value) => self.children_of(value),
            None => &[],
        }
    }

    /// Direct children of a `List` value; empty for anything else.
    pub fn children_of(&self, value: RawValue) -> &[RawValue] {
        match value {
            RawValue::List { first, count } => {
                let begin = first as usize;
                self.values.get(begin..begin + count as usize).unwrap_or(&[])
            }
            _ => &[],
        }
    }

    /// HEADER section metadata, when the file carries one.
    #[inline]
    pub fn header(&self) -> Option<&HeaderInfo> {
        self.header.as_ref()
    }

    /// True when the buffer ended inside a definition. Everything
    /// committed before the truncation point is still valid.
    #[inline]
    pub fn truncated(&self) -> bool {
        self.truncated
    }

    /// Problems recovered during parsing, in file order.
    #[inline]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

fn diagnostic(source: &[u8], offset: usize, message: impl Into<String>) -> Diagnostic {
    Diagnostic {
        offset,
        message: message.into(),
        snippet: context_snippet(source, offset),
    }
}

fn diagnostic_from(source: &[u8], error: &Error) -> Diagnostic {
    diagnostic(source, error.offset().unwrap_or(0), error.to_string())
}

/// Find the next `#id` whose following stored token is `=`. Tokens in
/// between (HEADER content, stray bytes) are tolerated and discarded;
/// tokenizer errors during the search skip one byte and rescan.
fn scan_clause_head(tokenizer: &mut Tokenizer) -> Option<Token> {
    let mut pending: Option<Token> = None;
    loop {
        match tokenizer.next_token() {
            Ok(Some((token_type, token))) => match token_type {
                TokenType::Id => pending = Some(token),
                TokenType::Definition => {
                    if let Some(id_token) = pending.take() {
                        return Some(id_token);
                    }
                }
                TokenType::Whitespace | TokenType::Comment => {}
                _ => pending = None,
            },
            Ok(None) => return None,
            Err(_) => {
                // garbage outside any definition; resynchronize
                let next = tokenizer.pos() + 1;
                tokenizer.seek(next);
                pending = None;
            }
        }
    }
}

fn parse_buffer(src: &[u8]) -> Parsed {
    // ~1 entity per 50 bytes is a good estimate for real exports
    let mut tokens: Vec<Token> = Vec::with_capacity(src.len() / 8);
    let mut values: Vec<RawValue> = Vec::with_capacity(src.len() / 16);
    let mut definitions: Vec<Definition> = Vec::with_capacity(src.len() / 50);
    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    let mut truncated = false;
    let mut scratch = EncoderScratch::default();
    let mut tokenizer = Tokenizer::new(src);

    'clauses: loop {
        let Some(id_token) = scan_clause_head(&mut tokenizer) else {
            break;
        };
        let clause_offset = id_token.begin as usize;
        let Some(id) = id_token.instance_number(src) else {
            diagnostics.push(diagnostic(
                src,
                clause_offset,
                "instance reference without digits",
            ));
            continue;
        };

        // entity keyword
        let name_token = match tokenizer.next_stored() {
            Ok(Some((TokenType::Identifier, token))) => token,
            Ok(Some((_, token))) => {
                diagnostics.push(diagnostic(
                    src,
                    token.begin as usize,
                    "expected entity keyword after `=`",
                ));
                continue;
            }
            Ok(None) => {
                truncated = true;
                diagnostics.push(diagnostic(src, clause_offset, "definition cut off"));
                break;
            }
            Err(error) => {
                truncated = true;
                diagnostics.push(diagnostic_from(src, &error));
                break;
            }
        };

        // opening paren of the attribute list
        match tokenizer.next_stored() {
            Ok(Some((TokenType::BeginGroup, token))) => {
                let id_index = tokens.len() as u32;
                tokens.push(id_token);
                let name_index = tokens.len() as u32;
                tokens.push(name_token);
                tokens.push(token);

                // collect the balanced attribute list
                let body_begin = tokens.len() as u32;
                let body_end;
                let mut depth = 1u32;
                loop {
                    match tokenizer.next_stored() {
                        Ok(Some((token_type, token))) => {
                            tokens.push(token);
                            match token_type {
                                TokenType::BeginGroup => depth += 1,
                                TokenType::EndGroup => {
                                    depth -= 1;
                                    if depth == 0 {
                                        body_end = tokens.len() as u32 - 1;
                                        break;
                                    }
                                }
                                TokenType::EndOfLine => {
                                    tracing::warn!(offset = clause_offset, id, "recovered malformed definition");
                                    diagnostics.push(diagnostic(
                                        src,
                                        token.begin as usize,
                                        "attribute list not closed before `;`",
                                    ));
                                    continue 'clauses;
                                }
                                _ => {}
                            }
                        }
                        Ok(None) => {
                            truncated = true;
                            diagnostics.push(diagnostic(
                                src,
                                clause_offset,
                                "buffer ends inside a definition",
                            ));
                            break 'clauses;
                        }
                        Err(error) => {
                            // an unterminated literal swallows the rest of
                            // the buffer, so the definition reaches EOF
                            truncated = true;
                            diagnostics.push(diagnostic_from(src, &error));
                            break 'clauses;
                        }
                    }
                }

                // encode and commit
                let mut encoder = ValueEncoder::new(&tokens, src, &mut values, &mut scratch);
                match encoder.encode_definition(name_index, body_begin, body_end) {
                    Ok(value) => definitions.push(Definition {
                        id,
                        id_token: id_index,
                        value,
                    }),
                    Err(error) => {
                        tracing::warn!(offset = clause_offset, id, "recovered malformed definition");
                        diagnostics.push(diagnostic_from(src, &error));
                    }
                }

                // terminator
                match tokenizer.next_stored() {
                    Ok(Some((TokenType::EndOfLine, _))) => {}
                    Ok(Some((_, token))) => {
                        diagnostics.push(diagnostic(
                            src,
                            token.begin as usize,
                            "expected `;` after definition",
                        ));
                        // leave the token for rescanning; it may open the
                        // next clause
                        tokenizer.seek(token.begin as usize);
                    }
                    Ok(None) => {
                        truncated = true;
                        diagnostics.push(diagnostic(
                            src,
                            clause_offset,
                            "missing `;` at end of input",
                        ));
                    }
                    Err(error) => {
                        diagnostics.push(diagnostic_from(src, &error));
                        let next = tokenizer.pos() + 1;
                        tokenizer.seek(next);
                    }
                }
            }
            Ok(Some((_, token))) => {
                diagnostics.push(diagnostic(
                    src,
                    token.begin as usize,
                    "expected `(` after entity keyword",
                ));
                continue;
            }
            Ok(None) => {
                truncated = true;
                diagnostics.push(diagnostic(src, clause_offset, "definition cut off"));
                break;
            }
            Err(error) => {
                truncated = true;
                diagnostics.push(diagnostic_from(src, &error));
                break;
            }
        }
    }

    Parsed {
        tokens,
        values,
        definitions,
        truncated,
        diagnostics,
    }
}
