// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entity reference graph.
//!
//! A derived, read-only index over a document's definitions: `id →
//! Definition` plus forward and inverse id-reference adjacency, built by
//! walking every definition's attribute tree. The graph owns only small
//! index structures; all byte data stays with the document.
//!
//! Duplicate references are preserved, not deduplicated — the same id in
//! two attribute slots of one entity means two edges, since attribute
//! position is semantically meaningful to consumers. Duplicate *ids* use
//! first-seen insertion and every shadowed definition is reported through
//! [`Graph::duplicates`].

use crate::document::{Definition, Document};
use crate::error::{Error, Result};
use crate::value::RawValue;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::collections::hash_map::Entry;

/// A second `#id=` clause that reused an already-seen instance number.
/// The first clause stays authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DuplicateId {
    pub id: u32,
    pub kept: Definition,
    pub ignored: Definition,
}

/// Forward/inverse id-reference adjacency over one document.
pub struct Graph<'doc> {
    doc: &'doc Document,
    definitions: FxHashMap<u32, Definition>,
    relations: FxHashMap<u32, Vec<u32>>,
    inverse_relations: FxHashMap<u32, Vec<u32>>,
    duplicates: Vec<DuplicateId>,
}

impl<'doc> Graph<'doc> {
    /// Build the full adjacency index for a parsed document.
    pub fn build(doc: &'doc Document) -> Self {
        let mut definitions: FxHashMap<u32, Definition> =
            FxHashMap::with_capacity_and_hasher(doc.definitions().len(), Default::default());
        let mut duplicates = Vec::new();
        for definition in doc.definitions() {
            match definitions.entry(definition.id) {
                Entry::Occupied(entry) => {
                    tracing::warn!(
                        id = definition.id,
                        "duplicate definition ignored, first occurrence wins"
                    );
                    duplicates.push(DuplicateId {
                        id: definition.id,
                        kept: *entry.get(),
                        ignored: *definition,
                    });
                }
                Entry::Vacant(entry) => {
                    entry.insert(*definition);
                }
            }
        }

        let mut relations: FxHashMap<u32, Vec<u32>> = FxHashMap::default();
        let mut inverse_relations: FxHashMap<u32, Vec<u32>> = FxHashMap::default();
        let mut references = Vec::new();
        for definition in doc.definitions() {
            // skip clauses shadowed by an earlier duplicate
            let kept = definitions[&definition.id];
            if kept.id_token != definition.id_token {
                continue;
            }
            references.clear();
            collect_ids(doc, doc.attributes(definition), &mut references);
            for &target in &references {
                inverse_relations
                    .entry(target)
                    .or_default()
                    .push(definition.id);
            }
            if !references.is_empty() {
                relations.insert(definition.id, references.clone());
            }
        }

        tracing::debug!(
            definitions = definitions.len(),
            duplicates = duplicates.len(),
            "entity graph built"
        );
        Self {
            doc,
            definitions,
            relations,
            inverse_relations,
            duplicates,
        }
    }

    /// The kept definition for `id`.
    pub fn definition(&self, id: u32) -> Result<&Definition> {
        self.definitions
            .get(&id)
            .ok_or(Error::UnresolvedReference { id })
    }

    /// Entity keyword for `id`, e.g. `IFCWALL`.
    pub fn entity_name(&self, id: u32) -> Result<&str> {
        self.definition(id).map(|d| self.doc.entity_name(d))
    }

    /// Ids referenced by `id`, in attribute order, duplicates preserved.
    pub fn relations(&self, id: u32) -> Result<&[u32]> {
        self.definition(id)?;
        Ok(self
            .relations
            .get(&id)
            .map(Vec::as_slice)
            .unwrap_or_default())
    }

    /// Ids whose definitions reference `id`.
    pub fn inverse_relations(&self, id: u32) -> Result<&[u32]> {
        self.definition(id)?;
        Ok(self
            .inverse_relations
            .get(&id)
            .map(Vec::as_slice)
            .unwrap_or_default())
    }

    /// Decoded attribute array for `id`: the direct children of its
    /// attribute list.
    pub fn attributes(&self, id: u32) -> Result<&'doc [RawValue]> {
        let definition = *self.definition(id)?;
        Ok(self.doc.attributes(&definition))
    }

    /// Shadowed duplicate clauses, in file order.
    pub fn duplicates(&self) -> &[DuplicateId] {
        &self.duplicates
    }

    /// Fail when any clause reused an instance number, for callers that
    /// must reject ambiguous exports outright instead of taking the
    /// first-wins default.
    pub fn require_unique_ids(&self) -> Result<()> {
        match self.duplicates.first() {
            Some(duplicate) => Err(Error::DuplicateId { id: duplicate.id }),
            None => Ok(()),
        }
    }

    /// All known instance numbers, in arbitrary order.
    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.definitions.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// Collect every `Id` in an attribute tree, in attribute order, walking
/// nested lists and typed values with an explicit stack.
fn collect_ids(doc: &Document, attributes: &[RawValue], out: &mut Vec<u32>) {
    let mut stack: SmallVec<[&[RawValue]; 16]> = SmallVec::new();
    stack.push(attributes);
    while let Some(mut slice) = stack.pop() {
        while let Some((value, rest)) = slice.split_first() {
            slice = rest;
            match *value {
                RawValue::Id(id) => out.push(id),
                RawValue::List { .. } => {
                    stack.push(slice);
                    slice = doc.children_of(*value);
                }
                RawValue::Entity { attrs, .. } => {
                    stack.push(slice);
                    slice = doc.children(attrs);
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(src: &str) -> Document {
        Document::parse_str(src).unwrap()
    }

    #[test]
    fn test_forward_and_inverse_edges() {
        let doc = doc(concat!(
            "#1=IFCCARTESIANPOINT((0.,0.,0.));\n",
            "#2=IFCWALL('guid',$,*,#1);\n",
            "#3=IFCRELATION(#1,#2);\n",
        ));
        let graph = Graph::build(&doc);
        assert_eq!(graph.len(), 3);
        assert_eq!(graph.relations(2).unwrap(), &[1]);
        assert_eq!(graph.relations(3).unwrap(), &[1, 2]);
        assert_eq!(graph.relations(1).unwrap(), &[] as &[u32]);
        assert_eq!(graph.inverse_relations(1).unwrap(), &[2, 3]);
        assert_eq!(graph.inverse_relations(2).unwrap(), &[3]);
        assert_eq!(graph.entity_name(2).unwrap(), "IFCWALL");
    }

    #[test]
    fn test_references_inside_nested_lists_and_typed_values() {
        let doc = doc(concat!(
            "#1=A();\n",
            "#2=B();\n",
            "#3=C(((#1,#2)),WRAP(#1));\n",
        ));
        let graph = Graph::build(&doc);
        assert_eq!(graph.relations(3).unwrap(), &[1, 2, 1]);
        assert_eq!(graph.inverse_relations(1).unwrap(), &[3, 3]);
    }

    #[test]
    fn test_duplicate_references_are_preserved() {
        let doc = doc("#1=A();\n#2=B(#1,'x',#1);\n");
        let graph = Graph::build(&doc);
        // same id in two attribute slots means two edges
        assert_eq!(graph.relations(2).unwrap(), &[1, 1]);
        assert_eq!(graph.inverse_relations(1).unwrap(), &[2, 2]);
    }

    #[test]
    fn test_duplicate_ids_first_wins_and_reported() {
        let doc = doc("#5=FIRST(#1);\n#1=A();\n#5=SECOND();\n");
        let graph = Graph::build(&doc);
        assert_eq!(graph.entity_name(5).unwrap(), "FIRST");
        assert_eq!(graph.relations(5).unwrap(), &[1]);
        assert_eq!(graph.duplicates().len(), 1);
        assert_eq!(graph.duplicates()[0].id, 5);
        assert_eq!(doc.entity_name(&graph.duplicates()[0].ignored), "SECOND");
        assert!(matches!(
            graph.require_unique_ids(),
            Err(Error::DuplicateId { id: 5 })
        ));
    }

    #[test]
    fn test_unique_ids_pass_the_strict_check() {
        let doc = doc("#1=A();\n#2=B(#1);\n");
        let graph = Graph::build(&doc);
        assert!(graph.require_unique_ids().is_ok());
    }

    #[test]
    fn test_absent_id_is_unresolved_not_empty() {
        let doc = doc("#1=A();\n");
        let graph = Graph::build(&doc);
        assert!(matches!(
            graph.relations(99),
            Err(Error::UnresolvedReference { id: 99 })
        ));
        assert!(graph.entity_name(99).is_err());
        assert!(graph.attributes(99).is_err());
    }

    #[test]
    fn test_graph_symmetry() {
        let doc = doc(concat!(
            "#1=A(#2,#3);\n",
            "#2=B(#3);\n",
            "#3=C();\n",
            "#4=D((#1,(#2)),#3);\n",
        ));
        let graph = Graph::build(&doc);
        let ids: Vec<u32> = graph.ids().collect();
        for &a in &ids {
            for &b in &ids {
                let forward = graph.relations(a).unwrap().iter().filter(|&&x| x == b).count();
                let inverse = graph
                    .inverse_relations(b)
                    .unwrap()
                    .iter()
                    .filter(|&&x| x == a)
                    .count();
                assert_eq!(forward, inverse, "edge multiset mismatch {a} -> {b}");
            }
        }
    }
}
