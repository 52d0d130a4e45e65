// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Spot id lookups without global adjacency.
//!
//! A [`Resolver`] wraps a document with just an `id → Definition` index —
//! the cheap alternative to [`Graph`](crate::graph::Graph) when only a
//! small neighborhood of entities is needed. Duplicate ids resolve to the
//! first occurrence; use the graph when shadowed clauses must be
//! reported.

use crate::document::{Definition, Document};
use crate::error::{Error, Result};
use crate::value::RawValue;
use rustc_hash::FxHashMap;

pub struct Resolver<'doc> {
    doc: &'doc Document,
    index: FxHashMap<u32, Definition>,
}

impl<'doc> Resolver<'doc> {
    pub fn new(doc: &'doc Document) -> Self {
        let mut index: FxHashMap<u32, Definition> =
            FxHashMap::with_capacity_and_hasher(doc.definitions().len(), Default::default());
        for definition in doc.definitions() {
            index.entry(definition.id).or_insert(*definition);
        }
        Self { doc, index }
    }

    /// Resolve an instance number to its `Entity` value. An absent id is
    /// a routine condition for partial or filtered exports and reported
    /// as [`Error::UnresolvedReference`], never a panic.
    pub fn resolve(&self, id: u32) -> Result<RawValue> {
        let definition = self.definition(id)?;
        self.doc
            .value(definition.value)
            .ok_or(Error::UnresolvedReference { id })
    }

    pub fn definition(&self, id: u32) -> Result<&Definition> {
        self.index.get(&id).ok_or(Error::UnresolvedReference { id })
    }

    pub fn entity_name(&self, id: u32) -> Result<&str> {
        self.definition(id).map(|d| self.doc.entity_name(d))
    }

    pub fn attributes(&self, id: u32) -> Result<&'doc [RawValue]> {
        let definition = *self.definition(id)?;
        Ok(self.doc.attributes(&definition))
    }

    pub fn contains(&self, id: u32) -> bool {
        self.index.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
