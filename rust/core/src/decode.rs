// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Typed decode helpers.
//!
//! Values stay zero-copy token references until one of these helpers is
//! asked to materialize them. Every helper names the `ValueKind` it
//! requires and returns [`Error::TypeMismatch`] for anything else —
//! silent zero/empty defaults would corrupt downstream entity graphs.

use crate::document::Document;
use crate::error::{Error, Result};
use crate::value::RawValue;
use smallvec::SmallVec;
use std::borrow::Cow;

fn mismatch(expected: &'static str, found: RawValue) -> Error {
    Error::TypeMismatch {
        expected,
        found: found.kind().name(),
    }
}

impl Document {
    /// Decode a `Number` value to `f64`. Requires `ValueKind::Number`.
    pub fn as_number(&self, value: RawValue) -> Result<f64> {
        match value {
            RawValue::Number(token) => {
                let bytes = self.token_bytes(token);
                fast_float::parse(bytes).map_err(|_| {
                    Error::structural(
                        self.token(token).begin as usize,
                        "malformed numeric literal",
                        self.source(),
                    )
                })
            }
            other => Err(mismatch("Number", other)),
        }
    }

    /// Decode a `Number` value to `i64`. Requires `ValueKind::Number`.
    /// Reals with an integral spelling (`2.`, `2.0E0`) truncate.
    pub fn as_integer(&self, value: RawValue) -> Result<i64> {
        match value {
            RawValue::Number(token) => {
                let bytes = self.token_bytes(token);
                if let Ok(parsed) = lexical_core::parse::<i64>(bytes) {
                    return Ok(parsed);
                }
                let real: f64 = fast_float::parse(bytes).map_err(|_| {
                    Error::structural(
                        self.token(token).begin as usize,
                        "malformed numeric literal",
                        self.source(),
                    )
                })?;
                Ok(real as i64)
            }
            other => Err(mismatch("Number", other)),
        }
    }

    /// The instance number of an `Id` value. Requires `ValueKind::Id`.
    pub fn as_id(&self, value: RawValue) -> Result<u32> {
        match value {
            RawValue::Id(id) => Ok(id),
            other => Err(mismatch("Id", other)),
        }
    }

    /// The raw spelling of a `String` value, quotes included. Requires
    /// `ValueKind::String`. Non-UTF-8 payload bytes are replaced.
    pub fn as_string(&self, value: RawValue) -> Result<Cow<'_, str>> {
        match value {
            RawValue::String(token) => Ok(String::from_utf8_lossy(self.token_bytes(token))),
            other => Err(mismatch("String", other)),
        }
    }

    /// A `String` value with the surrounding quotes stripped. Requires
    /// `ValueKind::String`. Doubled interior quotes are preserved as
    /// spelled.
    pub fn as_trimmed_string(&self, value: RawValue) -> Result<Cow<'_, str>> {
        match value {
            RawValue::String(token) => {
                let bytes = self.token_bytes(token);
                let inner = if bytes.len() >= 2 {
                    &bytes[1..bytes.len() - 1]
                } else {
                    bytes
                };
                Ok(String::from_utf8_lossy(inner))
            }
            other => Err(mismatch("String", other)),
        }
    }

    /// The name of a `Symbol` value with the dots stripped: `.TRUE.` →
    /// `TRUE`. Requires `ValueKind::Symbol`.
    pub fn as_symbol(&self, value: RawValue) -> Result<&str> {
        match value {
            RawValue::Symbol(token) => Ok(self.token_text(token).trim_matches('.')),
            other => Err(mismatch("Symbol", other)),
        }
    }

    /// The direct children of a `List` value, as one contiguous slice.
    /// Requires `ValueKind::List`.
    pub fn as_array(&self, value: RawValue) -> Result<&[RawValue]> {
        match value {
            RawValue::List { .. } => Ok(self.children_of(value)),
            other => Err(mismatch("List", other)),
        }
    }

    /// The entity keyword of an `Entity` value. Requires
    /// `ValueKind::Entity`.
    pub fn entity_name_of(&self, value: RawValue) -> Result<&str> {
        match value {
            RawValue::Entity { name, .. } => Ok(self.token_text(name)),
            other => Err(mismatch("Entity", other)),
        }
    }

    /// Flatten a `List` of numbers (arbitrarily nested) to `Vec<f64>`.
    /// Requires `ValueKind::List`; every leaf must be a `Number`.
    pub fn as_number_array(&self, value: RawValue) -> Result<Vec<f64>> {
        let root = self.as_array(value)?;
        let mut result = Vec::with_capacity(root.len());
        let mut stack: SmallVec<[&[RawValue]; 8]> = SmallVec::new();
        stack.push(root);
        while let Some(mut slice) = stack.pop() {
            while let Some((child, rest)) = slice.split_first() {
                slice = rest;
                match *child {
                    RawValue::Number(_) => result.push(self.as_number(*child)?),
                    RawValue::List { .. } => {
                        stack.push(slice);
                        slice = self.children_of(*child);
                    }
                    other => return Err(mismatch("Number", other)),
                }
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueKind;

    fn doc(src: &str) -> Document {
        Document::parse_str(src).unwrap()
    }

    #[test]
    fn test_as_number() {
        let doc = doc("#1=FOO(1.5E-10,-3.14,42);");
        let attrs = doc.attributes(&doc.definitions()[0]);
        assert!((doc.as_number(attrs[0]).unwrap() - 1.5e-10).abs() < 1e-15);
        assert!((doc.as_number(attrs[1]).unwrap() + 3.14).abs() < 1e-9);
        assert_eq!(doc.as_number(attrs[2]).unwrap(), 42.0);
    }

    #[test]
    fn test_as_integer_truncates_integral_reals() {
        let doc = doc("#1=FOO(7,2.,-9.9);");
        let attrs = doc.attributes(&doc.definitions()[0]);
        assert_eq!(doc.as_integer(attrs[0]).unwrap(), 7);
        assert_eq!(doc.as_integer(attrs[1]).unwrap(), 2);
        assert_eq!(doc.as_integer(attrs[2]).unwrap(), -9);
    }

    #[test]
    fn test_string_helpers() {
        let doc = doc("#1=FOO('hello','it''s');");
        let attrs = doc.attributes(&doc.definitions()[0]);
        assert_eq!(doc.as_string(attrs[0]).unwrap(), "'hello'");
        assert_eq!(doc.as_trimmed_string(attrs[0]).unwrap(), "hello");
        assert_eq!(doc.as_trimmed_string(attrs[1]).unwrap(), "it''s");
    }

    #[test]
    fn test_as_symbol_strips_dots() {
        let doc = doc("#1=FOO(.NOTDEFINED.);");
        let attrs = doc.attributes(&doc.definitions()[0]);
        assert_eq!(doc.as_symbol(attrs[0]).unwrap(), "NOTDEFINED");
    }

    #[test]
    fn test_as_array_and_number_array() {
        let doc = doc("#1=FOO((0.,(1.,2.),3.));");
        let attrs = doc.attributes(&doc.definitions()[0]);
        let children = doc.as_array(attrs[0]).unwrap();
        assert_eq!(children.len(), 3);
        assert_eq!(
            doc.as_number_array(attrs[0]).unwrap(),
            vec![0.0, 1.0, 2.0, 3.0]
        );
    }

    #[test]
    fn test_mismatch_is_typed_not_defaulted() {
        let doc = doc("#1=FOO($,'s');");
        let attrs = doc.attributes(&doc.definitions()[0]);
        let err = doc.as_number(attrs[0]).unwrap_err();
        match err {
            Error::TypeMismatch { expected, found } => {
                assert_eq!(expected, "Number");
                assert_eq!(found, "Unassigned");
            }
            other => panic!("expected TypeMismatch, got {other:?}"),
        }
        assert!(doc.as_id(attrs[1]).is_err());
        assert!(doc.as_array(attrs[1]).is_err());
    }

    #[test]
    fn test_kind_names_cover_all_variants() {
        assert_eq!(ValueKind::Entity.name(), "Entity");
        assert_eq!(ValueKind::Redeclared.name(), "Redeclared");
        assert_eq!(RawValue::Unassigned.kind(), ValueKind::Unassigned);
    }
}
