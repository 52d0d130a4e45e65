// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! STEP Tokenizer
//!
//! Classifies and consumes one lexical token at a time from a byte buffer.
//! First-byte dispatch uses precomputed 256-entry tables so the hot loop
//! never branches per character class. String and comment bodies are
//! skipped with [memchr](https://docs.rs/memchr) instead of byte-at-a-time
//! scanning.
//!
//! A [`Token`] is a plain `(begin, end)` span into the immutable source
//! buffer. Its [`TokenType`] is re-derived from its first byte on demand
//! and never stored. Token identity is the spelled content, not the byte
//! offset: two `#123` occurrences anywhere in the file are the same
//! logical reference (see [`Token::instance_number`]).

use crate::error::{Error, Result};

/// Lexical token categories, derived from a token's first byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum TokenType {
    Unknown = 0,
    /// Entity keyword: `IFCWALL`
    Identifier,
    /// String literal: `'text'`
    SingleQuotedString,
    /// String literal: `"text"`
    DoubleQuotedString,
    /// Numeric literal: `42`, `-3.14`, `1.5E-10`, `0.`
    Number,
    /// Enumeration literal: `.TRUE.`, `.ELEMENT.`
    Symbol,
    /// Instance reference: `#123`
    Id,
    /// Unassigned attribute: `$`
    Unassigned,
    /// Derived attribute, overridden by a later declaration: `*`
    Redeclared,
    /// `(`
    BeginGroup,
    /// `)`
    EndGroup,
    /// `=`
    Definition,
    /// `;`
    EndOfLine,
    /// `,`
    Separator,
    /// Skipped, never persisted
    Whitespace,
    /// `/* ... */`, skipped, never persisted
    Comment,
}

/// First-byte classification table.
const fn build_class_table() -> [TokenType; 256] {
    let mut table = [TokenType::Unknown; 256];
    let mut b = 0usize;
    while b < 256 {
        table[b] = match b as u8 {
            b'0'..=b'9' | b'-' | b'+' => TokenType::Number,
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => TokenType::Identifier,
            b'\'' => TokenType::SingleQuotedString,
            b'"' => TokenType::DoubleQuotedString,
            b'.' => TokenType::Symbol,
            b'#' => TokenType::Id,
            b'$' => TokenType::Unassigned,
            b'*' => TokenType::Redeclared,
            b'(' => TokenType::BeginGroup,
            b')' => TokenType::EndGroup,
            b'=' => TokenType::Definition,
            b';' => TokenType::EndOfLine,
            b',' => TokenType::Separator,
            b' ' | b'\t' | b'\r' | b'\n' | 0x0b | 0x0c => TokenType::Whitespace,
            b'/' => TokenType::Comment,
            _ => TokenType::Unknown,
        };
        b += 1;
    }
    table
}

const fn build_bool_table(kind: u8) -> [bool; 256] {
    let mut table = [false; 256];
    let mut b = 0usize;
    while b < 256 {
        let byte = b as u8;
        table[b] = match kind {
            // digits
            0 => byte.is_ascii_digit(),
            // identifier continuation: alphanumeric or underscore
            1 => byte.is_ascii_alphanumeric() || byte == b'_',
            // whitespace
            2 => matches!(byte, b' ' | b'\t' | b'\r' | b'\n' | 0x0b | 0x0c),
            // number continuation: digits, sign, decimal point, exponent marker
            _ => byte.is_ascii_digit() || matches!(byte, b'-' | b'+' | b'.' | b'e' | b'E'),
        };
        b += 1;
    }
    table
}

const TOKEN_CLASS: [TokenType; 256] = build_class_table();
const IS_DIGIT: [bool; 256] = build_bool_table(0);
const IS_IDENT: [bool; 256] = build_bool_table(1);
const IS_WHITESPACE: [bool; 256] = build_bool_table(2);
const IS_NUMBER: [bool; 256] = build_bool_table(3);

/// Classify a token by its first byte.
#[inline(always)]
pub fn token_type_of(byte: u8) -> TokenType {
    TOKEN_CLASS[byte as usize]
}

/// Whether tokens of this type belong in a persisted token stream.
/// Whitespace and comments carry no meaning and are dropped.
#[inline(always)]
pub fn should_store(token_type: TokenType) -> bool {
    !matches!(token_type, TokenType::Whitespace | TokenType::Comment)
}

/// A read-only view over a contiguous byte range of the source buffer.
///
/// Offsets are 32-bit; inputs above 4 GiB are rejected at parse time.
/// Deliberately not `PartialEq`: positional equality would be misleading,
/// token identity is content (compare via [`Token::content_eq`] or
/// [`Token::instance_number`]).
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Token {
    pub begin: u32,
    pub end: u32,
}

impl Token {
    #[inline]
    pub fn new(begin: usize, end: usize) -> Self {
        Self {
            begin: begin as u32,
            end: end as u32,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        (self.end - self.begin) as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    /// The spelled bytes of this token.
    #[inline]
    pub fn bytes<'a>(&self, source: &'a [u8]) -> &'a [u8] {
        &source[self.begin as usize..self.end as usize]
    }

    /// The spelled text of this token. Tokens produced by the tokenizer
    /// are ASCII except string literal payloads; invalid UTF-8 yields "".
    #[inline]
    pub fn text<'a>(&self, source: &'a [u8]) -> &'a str {
        std::str::from_utf8(self.bytes(source)).unwrap_or("")
    }

    /// Re-derive the token type from the first byte.
    #[inline]
    pub fn token_type(&self, source: &[u8]) -> TokenType {
        token_type_of(source[self.begin as usize])
    }

    /// Content equality: two tokens are the same if they spell the same
    /// bytes, regardless of where in the buffer they sit.
    #[inline]
    pub fn content_eq(&self, other: &Token, source: &[u8]) -> bool {
        self.bytes(source) == other.bytes(source)
    }

    /// Parse an `#digits` spelling to its instance number.
    ///
    /// The number is the stable identity of a reference: every `#42` in
    /// the file maps to the same value. Returns `None` when the token is
    /// not an Id or carries no digits.
    #[inline]
    pub fn instance_number(&self, source: &[u8]) -> Option<u32> {
        let bytes = self.bytes(source);
        if bytes.len() < 2 || bytes[0] != b'#' {
            return None;
        }
        let mut id = 0u32;
        for &b in &bytes[1..] {
            id = id.wrapping_mul(10).wrapping_add((b - b'0') as u32);
        }
        Some(id)
    }
}

/// One-token-at-a-time scanner over a byte buffer.
pub struct Tokenizer<'a> {
    source: &'a [u8],
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        Self { source, pos: 0 }
    }

    /// Current byte offset.
    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Move the cursor. Saved cursors may be re-scanned; the tokenizer is
    /// stateless apart from its position.
    #[inline]
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.source.len());
    }

    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    /// Classify and consume exactly one token, advancing the cursor past
    /// it. Returns `None` at end of input. On a structural error (an
    /// unterminated string, comment, or enumeration) the cursor is left at
    /// the offending token so callers can decide how to recover.
    pub fn next_token(&mut self) -> Result<Option<(TokenType, Token)>> {
        let src = self.source;
        if self.pos >= src.len() {
            return Ok(None);
        }
        let begin = self.pos;
        let token_type = token_type_of(src[begin]);
        let end = match token_type {
            TokenType::Whitespace => self.run(begin + 1, &IS_WHITESPACE),
            TokenType::Identifier => self.run(begin + 1, &IS_IDENT),
            TokenType::Number => self.run(begin + 1, &IS_NUMBER),
            TokenType::Id => self.run(begin + 1, &IS_DIGIT),
            TokenType::SingleQuotedString => self.quoted(begin, b'\'')?,
            TokenType::DoubleQuotedString => self.quoted(begin, b'"')?,
            TokenType::Symbol => self.symbol(begin)?,
            TokenType::Comment => return self.comment_or_unknown(begin),
            // single-byte structural tokens and Unknown
            _ => begin + 1,
        };
        self.pos = end;
        Ok(Some((token_type, Token::new(begin, end))))
    }

    /// Skip whitespace and comments, returning the next persistable token.
    pub fn next_stored(&mut self) -> Result<Option<(TokenType, Token)>> {
        while let Some((token_type, token)) = self.next_token()? {
            if should_store(token_type) {
                return Ok(Some((token_type, token)));
            }
        }
        Ok(None)
    }

    /// Consume bytes for which `table` holds, starting at `from`.
    #[inline]
    fn run(&self, from: usize, table: &[bool; 256]) -> usize {
        let src = self.source;
        let mut i = from;
        while i < src.len() && table[src[i] as usize] {
            i += 1;
        }
        i
    }

    /// Consume a quoted literal including both quote bytes. A doubled
    /// quote inside the literal is the STEP escape for the quote itself.
    fn quoted(&self, begin: usize, quote: u8) -> Result<usize> {
        let src = self.source;
        let mut i = begin + 1;
        while let Some(offset) = memchr::memchr(quote, &src[i..]) {
            let at = i + offset;
            if at + 1 < src.len() && src[at + 1] == quote {
                i = at + 2;
                continue;
            }
            return Ok(at + 1);
        }
        Err(Error::structural(begin, "unterminated string literal", src))
    }

    /// Consume `.NAME.` including both dots.
    fn symbol(&self, begin: usize) -> Result<usize> {
        let src = self.source;
        let i = self.run(begin + 1, &IS_IDENT);
        if i < src.len() && src[i] == b'.' {
            return Ok(i + 1);
        }
        Err(Error::structural(
            begin,
            "unterminated enumeration literal",
            src,
        ))
    }

    /// `/` either opens `/* ... */` or is a stray byte consumed as Unknown.
    fn comment_or_unknown(&mut self, begin: usize) -> Result<Option<(TokenType, Token)>> {
        let src = self.source;
        if begin + 1 < src.len() && src[begin + 1] == b'*' {
            match memchr::memmem::find(&src[begin + 2..], b"*/") {
                Some(offset) => {
                    let end = begin + 2 + offset + 2;
                    self.pos = end;
                    Ok(Some((TokenType::Comment, Token::new(begin, end))))
                }
                None => Err(Error::structural(begin, "unterminated comment", src)),
            }
        } else {
            self.pos = begin + 1;
            Ok(Some((TokenType::Unknown, Token::new(begin, begin + 1))))
        }
    }
}
