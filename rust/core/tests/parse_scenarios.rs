// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end parsing scenarios over realistic clause shapes.

use step_lite_core::{Document, Error, Graph, RawValue, Resolver};

#[test]
fn cartesian_point_decodes_to_number_list() {
    let doc = Document::parse_str("#1=IFCCARTESIANPOINT((0.,0.,0.));").unwrap();
    assert_eq!(doc.definitions().len(), 1);

    let def = &doc.definitions()[0];
    assert_eq!(def.id, 1);
    assert_eq!(doc.entity_name(def), "IFCCARTESIANPOINT");

    let attrs = doc.attributes(def);
    assert_eq!(attrs.len(), 1);
    let coords = doc.as_array(attrs[0]).unwrap();
    assert_eq!(coords.len(), 3);
    for &coord in coords {
        assert_eq!(doc.as_number(coord).unwrap(), 0.0);
    }
    assert_eq!(doc.as_number_array(attrs[0]).unwrap(), vec![0.0, 0.0, 0.0]);
}

#[test]
fn wall_attributes_decode_in_order() {
    let doc =
        Document::parse_str("#1=IFCCARTESIANPOINT((0.,0.,0.));\n#2=IFCWALL('guid',$,*,#1);")
            .unwrap();
    let wall = &doc.definitions()[1];
    let attrs = doc.attributes(wall);
    assert_eq!(attrs.len(), 4);

    assert_eq!(doc.as_trimmed_string(attrs[0]).unwrap(), "guid");
    assert_eq!(attrs[1], RawValue::Unassigned);
    assert_eq!(attrs[2], RawValue::Redeclared);
    assert_eq!(doc.as_id(attrs[3]).unwrap(), 1);

    let graph = Graph::build(&doc);
    assert_eq!(graph.relations(2).unwrap(), &[1]);
}

#[test]
fn truncated_file_keeps_prior_definitions() {
    let doc = Document::parse_str(
        "#1=IFCWALL('a',$);\n#2=IFCDOOR('b',$);\n#3=FOO(1,2,",
    )
    .unwrap();
    assert!(doc.truncated());
    let ids: Vec<u32> = doc.definitions().iter().map(|d| d.id).collect();
    assert_eq!(ids, vec![1, 2]);

    // the partial document is still fully usable
    let graph = Graph::build(&doc);
    assert_eq!(graph.entity_name(2).unwrap(), "IFCDOOR");
}

#[test]
fn empty_attribute_list_and_empty_file() {
    let doc = Document::parse_str("#1=NAME();").unwrap();
    let def = &doc.definitions()[0];
    assert_eq!(doc.entity_name(def), "NAME");
    assert!(doc.attributes(def).is_empty());
    // the entity value is immediately followed by its attribute list
    let RawValue::Entity { attrs, .. } = doc.value(def.value).unwrap() else {
        panic!("expected Entity value");
    };
    assert_eq!(attrs, def.value + 1);
    assert!(matches!(
        doc.value(attrs).unwrap(),
        RawValue::List { count: 0, .. }
    ));

    let empty = Document::parse_str("").unwrap();
    assert!(empty.definitions().is_empty());
    assert!(!empty.truncated());
}

#[test]
fn exporter_nonconformance_does_not_abort_the_file() {
    let doc = Document::parse_str(concat!(
        "#1=IFCWALL('ok');\n",
        "#2=IFCSLAB('broken',;\n",
        "#3=77;\n",
        "#4=IFCDOOR('also ok',#1);\n",
    ))
    .unwrap();
    let ids: Vec<u32> = doc.definitions().iter().map(|d| d.id).collect();
    assert_eq!(ids, vec![1, 4]);
    assert_eq!(doc.diagnostics().len(), 2);
    for diagnostic in doc.diagnostics() {
        assert!(!diagnostic.snippet.is_empty());
    }

    let graph = Graph::build(&doc);
    assert_eq!(graph.relations(4).unwrap(), &[1]);
}

#[test]
fn comments_and_whitespace_inside_attribute_lists() {
    let doc = Document::parse_str(
        "#1 = IFCWALL /* type */ ( 'a' , /* gap */ #2 , ( 1 , 2 ) ) ;\n#2=B();",
    )
    .unwrap();
    let def = &doc.definitions()[0];
    let attrs = doc.attributes(def);
    assert_eq!(attrs.len(), 3);
    assert_eq!(doc.as_id(attrs[1]).unwrap(), 2);
    assert_eq!(doc.as_array(attrs[2]).unwrap().len(), 2);
}

#[test]
fn resolver_spot_lookup_without_adjacency() {
    let doc = Document::parse_str("#10=A('x');\n#20=B(#10);\n").unwrap();
    let resolver = Resolver::new(&doc);
    let value = resolver.resolve(10).unwrap();
    assert_eq!(doc.entity_name_of(value).unwrap(), "A");
    assert!(matches!(
        resolver.resolve(30),
        Err(Error::UnresolvedReference { id: 30 })
    ));
}

#[test]
fn duplicate_ids_are_reported_first_wins() {
    let doc = Document::parse_str("#9=FIRST('a');\n#9=SECOND('b');\n").unwrap();
    // the document keeps both clauses in file order
    assert_eq!(doc.definitions().len(), 2);

    let graph = Graph::build(&doc);
    assert_eq!(graph.entity_name(9).unwrap(), "FIRST");
    assert_eq!(graph.duplicates().len(), 1);
    let duplicate = &graph.duplicates()[0];
    assert_eq!(duplicate.id, 9);
    assert_eq!(doc.entity_name(&duplicate.kept), "FIRST");
    assert_eq!(doc.entity_name(&duplicate.ignored), "SECOND");
}

#[test]
fn header_metadata_is_available() {
    let doc = Document::parse_str(concat!(
        "ISO-10303-21;\n",
        "HEADER;\n",
        "FILE_DESCRIPTION(('ViewDefinition [CoordinationView]'),'2;1');\n",
        "FILE_NAME('site.ifc','2024-05-02T08:30:00',('A. Author'),('Org'),'exp','sys','');\n",
        "FILE_SCHEMA(('IFC2X3'));\n",
        "ENDSEC;\n",
        "DATA;\n",
        "#1=IFCPROJECT('g',$,$,$,$,$,$,$,$);\n",
        "ENDSEC;\nEND-ISO-10303-21;\n",
    ))
    .unwrap();
    let header = doc.header().expect("header present");
    assert_eq!(header.name, "site.ifc");
    assert_eq!(header.schema_identifiers, vec!["IFC2X3".to_string()]);
    assert_eq!(header.implementation_level, "2;1");
    assert_eq!(doc.definitions().len(), 1);
}
