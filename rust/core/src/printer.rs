// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Read-only pretty-printer over the flat value encoding.
//!
//! Reconstructs STEP-like syntax from a document's value store. Token
//! backed values are emitted with their original spelling, so printing a
//! well-formed encoding and re-parsing the output yields an element-wise
//! equal value sequence.

use crate::document::{Definition, Document};
use crate::error::{Error, Result};
use crate::value::RawValue;
use smallvec::SmallVec;
use std::fmt::Write;

enum Frame {
    Value(u32),
    Lit(&'static str),
}

/// Append the STEP spelling of the value at `index` to `out`.
///
/// Iterative over an explicit frame stack; nesting depth is bounded by
/// memory, not the call stack.
pub fn write_value(doc: &Document, index: u32, out: &mut String) -> Result<()> {
    let mut stack: SmallVec<[Frame; 16]> = SmallVec::new();
    stack.push(Frame::Value(index));
    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Lit(text) => out.push_str(text),
            Frame::Value(index) => {
                let value = doc.value(index).ok_or_else(|| Error::Structural {
                    offset: 0,
                    reason: format!("value index {index} out of range"),
                    context: String::new(),
                })?;
                match value {
                    RawValue::Id(id) => {
                        let _ = write!(out, "#{id}");
                    }
                    RawValue::Unassigned => out.push('$'),
                    RawValue::Redeclared => out.push('*'),
                    RawValue::Number(token)
                    | RawValue::String(token)
                    | RawValue::Symbol(token) => out.push_str(doc.token_text(token)),
                    RawValue::Entity { name, attrs } => {
                        out.push_str(doc.token_text(name));
                        stack.push(Frame::Value(attrs));
                    }
                    RawValue::List { first, count } => {
                        stack.push(Frame::Lit(")"));
                        for k in (0..count).rev() {
                            stack.push(Frame::Value(first + k));
                            if k > 0 {
                                stack.push(Frame::Lit(","));
                            }
                        }
                        stack.push(Frame::Lit("("));
                    }
                }
            }
        }
    }
    Ok(())
}

/// The STEP spelling of a single value.
pub fn value_to_string(doc: &Document, index: u32) -> Result<String> {
    let mut out = String::new();
    write_value(doc, index, &mut out)?;
    Ok(out)
}

/// Append a whole `#id=NAME(...);` clause.
pub fn write_definition(doc: &Document, definition: &Definition, out: &mut String) -> Result<()> {
    let _ = write!(out, "#{}=", definition.id);
    write_value(doc, definition.value, out)?;
    out.push(';');
    Ok(())
}

/// The `#id=NAME(...);` clause for one definition.
pub fn definition_to_string(doc: &Document, definition: &Definition) -> Result<String> {
    let mut out = String::new();
    write_definition(doc, definition, &mut out)?;
    Ok(out)
}
