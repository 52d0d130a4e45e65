// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tagged value store and encoder.
//!
//! A definition's token stream is flattened into a single append-only
//! `Vec<RawValue>` shared by the whole document. Values never own text:
//! numbers, strings, and symbols point back at their token, lists are a
//! `(first, count)` run of contiguous child slots.
//!
//! ## List layout
//!
//! Nested groups are encoded *deferred*: the group's slot in its parent
//! receives a `List` placeholder, the group body goes on an explicit work
//! queue, and the placeholder is patched once its block is written. Every
//! list's direct children therefore occupy exactly
//! `values[first..first + count]` — contiguous, with sibling ranges
//! disjoint — so child access is an O(1) slice and nesting depth is
//! bounded by memory, not by the call stack.
//!
//! The array is index-stable: growth never invalidates an index already
//! handed out, and a written value is never moved for the lifetime of its
//! document.

use crate::error::{Error, Result};
use crate::token::{Token, TokenType};
use std::collections::VecDeque;

/// Value categories, used by decode helpers for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValueKind {
    Id,
    Entity,
    Number,
    List,
    Redeclared,
    Unassigned,
    Symbol,
    String,
}

impl ValueKind {
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Id => "Id",
            ValueKind::Entity => "Entity",
            ValueKind::Number => "Number",
            ValueKind::List => "List",
            ValueKind::Redeclared => "Redeclared",
            ValueKind::Unassigned => "Unassigned",
            ValueKind::Symbol => "Symbol",
            ValueKind::String => "String",
        }
    }
}

/// One compact tagged value in the flat store.
///
/// Token-referencing variants carry an index into the document's token
/// array; decoding back to text or numbers happens on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RawValue {
    /// Instance reference `#N`, by instance number.
    Id(u32),
    /// Entity value: keyword token index plus the value index of its
    /// attribute list. For a definition clause the list is the value
    /// appended immediately after the entity.
    Entity { name: u32, attrs: u32 },
    /// Numeric literal, by token index.
    Number(u32),
    /// Quoted string literal, by token index (quotes included).
    String(u32),
    /// Enumeration literal `.NAME.`, by token index (dots included).
    Symbol(u32),
    /// `count` children in the contiguous run starting at value index
    /// `first`.
    List { first: u32, count: u32 },
    /// `$`
    Unassigned,
    /// `*` — value overridden by a later declaration.
    Redeclared,
}

impl RawValue {
    #[inline]
    pub fn kind(&self) -> ValueKind {
        match self {
            RawValue::Id(_) => ValueKind::Id,
            RawValue::Entity { .. } => ValueKind::Entity,
            RawValue::Number(_) => ValueKind::Number,
            RawValue::String(_) => ValueKind::String,
            RawValue::Symbol(_) => ValueKind::Symbol,
            RawValue::List { .. } => ValueKind::List,
            RawValue::Unassigned => ValueKind::Unassigned,
            RawValue::Redeclared => ValueKind::Redeclared,
        }
    }
}

/// Which slot a pending group body patches once its block is written.
#[derive(Debug, Clone, Copy)]
enum Patch {
    /// A `List` placeholder already sitting in its parent's child slot.
    List(u32),
    /// An `Entity` whose attribute list has not been allocated yet.
    Entity(u32),
}

/// A deferred group body: token index range, exclusive of the parens.
#[derive(Debug, Clone, Copy)]
struct Job {
    patch: Patch,
    begin: u32,
    end: u32,
}

/// Reusable encoder work queue. One instance can serve any number of
/// definitions; the document keeps a single one for the whole parse.
#[derive(Default)]
pub struct EncoderScratch {
    pending: VecDeque<Job>,
}

/// Consumes a definition's token stream and appends tagged values to the
/// shared store.
pub struct ValueEncoder<'a> {
    tokens: &'a [Token],
    source: &'a [u8],
    values: &'a mut Vec<RawValue>,
    scratch: &'a mut EncoderScratch,
}

impl<'a> ValueEncoder<'a> {
    pub fn new(
        tokens: &'a [Token],
        source: &'a [u8],
        values: &'a mut Vec<RawValue>,
        scratch: &'a mut EncoderScratch,
    ) -> Self {
        scratch.pending.clear();
        Self {
            tokens,
            source,
            values,
            scratch,
        }
    }

    /// Consume one token or one balanced `(...)` group starting at
    /// `*cursor` and append exactly one value for it (plus, for a group,
    /// its children). Returns the index of the appended value and leaves
    /// the cursor past the consumed tokens.
    pub fn encode_next(&mut self, cursor: &mut u32, end: u32) -> Result<u32> {
        let index = self.encode_element(cursor, end)?;
        self.flush()?;
        Ok(index)
    }

    /// Encode a whole definition body: the entity keyword at token index
    /// `name` with its attribute group spanning tokens
    /// `[body_begin, body_end)` (parens excluded). Returns the index of
    /// the `Entity` value; its attribute `List` is the value right after
    /// it.
    pub fn encode_definition(&mut self, name: u32, body_begin: u32, body_end: u32) -> Result<u32> {
        let entity = self.push(RawValue::Entity { name, attrs: 0 });
        let attrs = self.push(RawValue::List { first: 0, count: 0 });
        self.values[entity as usize] = RawValue::Entity { name, attrs };
        self.scratch.pending.push_back(Job {
            patch: Patch::List(attrs),
            begin: body_begin,
            end: body_end,
        });
        self.flush()?;
        Ok(entity)
    }

    #[inline]
    fn push(&mut self, value: RawValue) -> u32 {
        let index = self.values.len() as u32;
        self.values.push(value);
        index
    }

    #[inline]
    fn token_type_at(&self, index: u32) -> TokenType {
        self.tokens[index as usize].token_type(self.source)
    }

    /// Append the value for one element. Group bodies are queued, not
    /// descended into, so arbitrarily deep nesting cannot overflow the
    /// call stack.
    fn encode_element(&mut self, cursor: &mut u32, end: u32) -> Result<u32> {
        let i = *cursor;
        if i >= end {
            return Err(Error::structural(
                self.source.len(),
                "expected a value",
                self.source,
            ));
        }
        let token = self.tokens[i as usize];
        let index = match self.token_type_at(i) {
            TokenType::Id => {
                let id = token.instance_number(self.source).ok_or_else(|| {
                    Error::structural(
                        token.begin as usize,
                        "instance reference without digits",
                        self.source,
                    )
                })?;
                *cursor = i + 1;
                self.push(RawValue::Id(id))
            }
            TokenType::Number => {
                *cursor = i + 1;
                self.push(RawValue::Number(i))
            }
            TokenType::SingleQuotedString | TokenType::DoubleQuotedString => {
                *cursor = i + 1;
                self.push(RawValue::String(i))
            }
            TokenType::Symbol => {
                *cursor = i + 1;
                self.push(RawValue::Symbol(i))
            }
            TokenType::Unassigned => {
                *cursor = i + 1;
                self.push(RawValue::Unassigned)
            }
            TokenType::Redeclared => {
                *cursor = i + 1;
                self.push(RawValue::Redeclared)
            }
            // keyword directly followed by a group: a typed value
            TokenType::Identifier => {
                if i + 1 < end && self.token_type_at(i + 1) == TokenType::BeginGroup {
                    let close = self.matching_group_end(i + 1, end)?;
                    let entity = self.push(RawValue::Entity { name: i, attrs: 0 });
                    self.scratch.pending.push_back(Job {
                        patch: Patch::Entity(entity),
                        begin: i + 2,
                        end: close,
                    });
                    *cursor = close + 1;
                    entity
                } else {
                    return Err(Error::structural(
                        token.begin as usize,
                        "keyword without an attribute list",
                        self.source,
                    ));
                }
            }
            TokenType::BeginGroup => {
                let close = self.matching_group_end(i, end)?;
                let list = self.push(RawValue::List { first: 0, count: 0 });
                self.scratch.pending.push_back(Job {
                    patch: Patch::List(list),
                    begin: i + 1,
                    end: close,
                });
                *cursor = close + 1;
                list
            }
            other => {
                return Err(Error::structural(
                    token.begin as usize,
                    format!("unexpected {other:?} in attribute position"),
                    self.source,
                ));
            }
        };
        Ok(index)
    }

    /// Write every pending group body as its own contiguous block and
    /// patch the owning slot with `(first, count)`.
    fn flush(&mut self) -> Result<()> {
        while let Some(job) = self.scratch.pending.pop_front() {
            let list = match job.patch {
                Patch::List(index) => index,
                Patch::Entity(entity) => {
                    let list = self.push(RawValue::List { first: 0, count: 0 });
                    if let RawValue::Entity { name, .. } = self.values[entity as usize] {
                        self.values[entity as usize] = RawValue::Entity { name, attrs: list };
                    }
                    list
                }
            };
            let first = self.values.len() as u32;
            let mut count = 0u32;
            let mut cursor = job.begin;
            while cursor < job.end {
                if self.token_type_at(cursor) == TokenType::Separator {
                    cursor += 1;
                    continue;
                }
                self.encode_element(&mut cursor, job.end)?;
                count += 1;
            }
            self.values[list as usize] = RawValue::List { first, count };
        }
        Ok(())
    }

    /// Token index of the `)` matching the `(` at `open`.
    fn matching_group_end(&self, open: u32, end: u32) -> Result<u32> {
        let mut depth = 0u32;
        let mut i = open;
        while i < end {
            match self.token_type_at(i) {
                TokenType::BeginGroup => depth += 1,
                TokenType::EndGroup => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(i);
                    }
                }
                _ => {}
            }
            i += 1;
        }
        Err(Error::structural(
            self.tokens[open as usize].begin as usize,
            "unmatched `(`",
            self.source,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Tokenizer;

    fn stored_tokens(source: &[u8]) -> Vec<Token> {
        let mut tokenizer = Tokenizer::new(source);
        let mut tokens = Vec::new();
        while let Some((_, token)) = tokenizer.next_stored().unwrap() {
            tokens.push(token);
        }
        tokens
    }

    fn encode_one(source: &[u8]) -> (Vec<Token>, Vec<RawValue>, u32) {
        let tokens = stored_tokens(source);
        let mut values = Vec::new();
        let mut scratch = EncoderScratch::default();
        let mut encoder = ValueEncoder::new(&tokens, source, &mut values, &mut scratch);
        let mut cursor = 0u32;
        let index = encoder.encode_next(&mut cursor, tokens.len() as u32).unwrap();
        assert_eq!(cursor as usize, tokens.len());
        (tokens, values, index)
    }

    #[test]
    fn test_encode_scalars() {
        let source = b"#7";
        let (_, values, index) = encode_one(source);
        assert_eq!(values[index as usize], RawValue::Id(7));

        let source = b"$";
        let (_, values, index) = encode_one(source);
        assert_eq!(values[index as usize], RawValue::Unassigned);

        let source = b"*";
        let (_, values, index) = encode_one(source);
        assert_eq!(values[index as usize], RawValue::Redeclared);
    }

    #[test]
    fn test_encode_flat_list() {
        let source = b"(0.,1.,2.)";
        let (tokens, values, index) = encode_one(source);
        let RawValue::List { first, count } = values[index as usize] else {
            panic!("expected List, got {:?}", values[index as usize]);
        };
        assert_eq!(count, 3);
        for k in 0..count {
            let RawValue::Number(tok) = values[(first + k) as usize] else {
                panic!("expected Number child");
            };
            assert_eq!(tokens[tok as usize].bytes(source)[0], b'0' + k as u8);
        }
    }

    #[test]
    fn test_nested_list_children_are_contiguous() {
        let source = b"(1,(2,3),4)";
        let (_, values, index) = encode_one(source);
        let RawValue::List { first, count } = values[index as usize] else {
            panic!("expected List");
        };
        assert_eq!(count, 3);
        // direct child slots are exactly values[first..first+count]
        assert!(matches!(values[first as usize], RawValue::Number(_)));
        let RawValue::List {
            first: inner_first,
            count: inner_count,
        } = values[(first + 1) as usize]
        else {
            panic!("expected nested List in the middle slot");
        };
        assert!(matches!(values[(first + 2) as usize], RawValue::Number(_)));
        // the nested block sits outside the parent's child run
        assert_eq!(inner_count, 2);
        assert!(inner_first >= first + count);
        assert!(matches!(values[inner_first as usize], RawValue::Number(_)));
        assert!(matches!(
            values[(inner_first + 1) as usize],
            RawValue::Number(_)
        ));
    }

    #[test]
    fn test_deeply_nested_list_does_not_recurse() {
        // 4000 levels of nesting would overflow a native call stack
        let mut source = Vec::new();
        source.extend(std::iter::repeat(b'(').take(4000));
        source.extend_from_slice(b"1");
        source.extend(std::iter::repeat(b')').take(4000));
        let (_, values, index) = encode_one(&source);
        let mut value = values[index as usize];
        let mut depth = 0;
        while let RawValue::List { first, count } = value {
            assert_eq!(count, 1);
            value = values[first as usize];
            depth += 1;
        }
        assert_eq!(depth, 4000);
        assert!(matches!(value, RawValue::Number(_)));
    }

    #[test]
    fn test_typed_value_entity() {
        let source = b"(IFCBOOLEAN(.T.),2)";
        let (tokens, values, index) = encode_one(source);
        let RawValue::List { first, count } = values[index as usize] else {
            panic!("expected List");
        };
        assert_eq!(count, 2);
        let RawValue::Entity { name, attrs } = values[first as usize] else {
            panic!("expected Entity in first slot, got {:?}", values[first as usize]);
        };
        assert_eq!(tokens[name as usize].bytes(source), b"IFCBOOLEAN");
        let RawValue::List {
            first: arg_first,
            count: arg_count,
        } = values[attrs as usize]
        else {
            panic!("expected attribute List");
        };
        assert_eq!(arg_count, 1);
        assert!(matches!(values[arg_first as usize], RawValue::Symbol(_)));
    }

    #[test]
    fn test_encode_definition_entity_then_list() {
        let source = b"IFCCARTESIANPOINT((0.,0.,0.))";
        let tokens = stored_tokens(source);
        let mut values = Vec::new();
        let mut scratch = EncoderScratch::default();
        let mut encoder = ValueEncoder::new(&tokens, source, &mut values, &mut scratch);
        // body tokens: everything between the outer parens
        let entity = encoder
            .encode_definition(0, 2, tokens.len() as u32 - 1)
            .unwrap();
        let RawValue::Entity { name, attrs } = values[entity as usize] else {
            panic!("expected Entity");
        };
        assert_eq!(name, 0);
        // the attribute list is appended immediately after the entity
        assert_eq!(attrs, entity + 1);
        let RawValue::List { count, .. } = values[attrs as usize] else {
            panic!("expected attribute List");
        };
        assert_eq!(count, 1);
    }

    #[test]
    fn test_empty_group_is_count_zero() {
        let source = b"()";
        let (_, values, index) = encode_one(source);
        assert!(matches!(
            values[index as usize],
            RawValue::List { count: 0, .. }
        ));
    }

    #[test]
    fn test_unmatched_group_is_structural() {
        let source = b"(1,(2)";
        let tokens = stored_tokens(source);
        let mut values = Vec::new();
        let mut scratch = EncoderScratch::default();
        let mut encoder = ValueEncoder::new(&tokens, source, &mut values, &mut scratch);
        let mut cursor = 0u32;
        assert!(encoder.encode_next(&mut cursor, tokens.len() as u32).is_err());
    }

    #[test]
    fn test_values_are_append_only() {
        let source = b"(1,(2,3))";
        let tokens = stored_tokens(source);
        let mut values = Vec::new();
        let mut scratch = EncoderScratch::default();
        let mut encoder = ValueEncoder::new(&tokens, source, &mut values, &mut scratch);
        let mut cursor = 0u32;
        let outer = encoder.encode_next(&mut cursor, tokens.len() as u32).unwrap();
        let snapshot = values.clone();
        // encoding more values never moves or rewrites committed ones
        let more = b"#9";
        let more_tokens = stored_tokens(more);
        let mut encoder = ValueEncoder::new(&more_tokens, more, &mut values, &mut scratch);
        let mut cursor = 0u32;
        encoder.encode_next(&mut cursor, 1).unwrap();
        assert_eq!(&values[..snapshot.len()], &snapshot[..]);
        assert!(matches!(values[outer as usize], RawValue::List { .. }));
    }
}
