use indoc::indoc;

use super::*;
use crate::graph::{DeclKind, TypeNode};

#[test]
fn parses_function_declaration() {
    let tree = parse_declarations(indoc! {r#"
        { "declarations": [
          { "kind": "function", "name": "sin",
            "type": { "function": { "result": { "primitive": "double" },
                                    "params": [ { "primitive": "double" } ] } } }
        ]}
    "#})
    .unwrap();

    let graph = TypeGraph::from_tree(&tree).unwrap();
    let decl = &graph.declarations()[0];
    assert_eq!(decl.kind, DeclKind::Function);
    assert_eq!(graph.name(decl.name), "sin");
    let TypeNode::Function(f) = graph.node(decl.ty) else {
        panic!("expected function");
    };
    assert_eq!(f.params.len(), 1);
    assert!(!f.variadic);
}

#[test]
fn forward_reference_resolves_to_one_record() {
    let tree = parse_declarations(indoc! {r#"
        { "declarations": [
          { "kind": "typedef", "name": "node_t",
            "type": { "struct": { "name": "node", "fields": [
                { "name": "next", "type": { "pointer": { "struct": { "name": "node" } } } },
                { "name": "flags", "type": { "primitive": "int" }, "bits": 3 }
            ] } } },
          { "kind": "variable", "name": "table",
            "type": { "array": { "element": { "typedef": "node_t" }, "length": 4 } } }
        ]}
    "#})
    .unwrap();

    let graph = TypeGraph::from_tree(&tree).unwrap();
    let records: Vec<_> = graph.records().collect();
    assert_eq!(records.len(), 1);
    let fields = records[0].1.fields().unwrap();
    assert_eq!(fields[1].bit_width, Some(3));

    let TypeNode::Pointer(pointee) = graph.node(fields[0].ty) else {
        panic!("expected pointer");
    };
    assert_eq!(graph.node(*pointee), &TypeNode::Record(records[0].0));
}

#[test]
fn forward_declaration_completed_later() {
    let tree = parse_declarations(indoc! {r#"
        { "declarations": [
          { "kind": "function", "name": "open_it",
            "type": { "function": { "result": { "pointer": { "struct": { "name": "h" } } } } } },
          { "kind": "typedef", "name": "h_t",
            "type": { "struct": { "name": "h", "fields": [
                { "name": "fd", "type": { "primitive": "int" } } ] } } }
        ]}
    "#})
    .unwrap();

    let graph = TypeGraph::from_tree(&tree).unwrap();
    let records: Vec<_> = graph.records().collect();
    assert_eq!(records.len(), 1);
    assert!(!records[0].1.is_opaque());
}

#[test]
fn by_value_use_before_definition_fails() {
    let tree = parse_declarations(indoc! {r#"
        { "declarations": [
          { "kind": "variable", "name": "arr",
            "type": { "array": { "element": { "struct": { "name": "late" } }, "length": 2 } } },
          { "kind": "typedef", "name": "late_t",
            "type": { "struct": { "name": "late", "fields": [
                { "name": "x", "type": { "primitive": "int" } } ] } } }
        ]}
    "#})
    .unwrap();

    let err = TypeGraph::from_tree(&tree).unwrap_err();
    assert_eq!(err, GraphError::IncompleteTypeUsed("struct late".to_owned()));
}

#[test]
fn redefinition_creates_second_record() {
    let tree = parse_declarations(indoc! {r#"
        { "declarations": [
          { "kind": "typedef", "name": "a",
            "type": { "struct": { "name": "s", "fields": [
                { "name": "x", "type": { "primitive": "int" } } ] } } },
          { "kind": "typedef", "name": "b",
            "type": { "struct": { "name": "s", "fields": [
                { "name": "x", "type": { "primitive": "long" } } ] } } }
        ]}
    "#})
    .unwrap();

    let graph = TypeGraph::from_tree(&tree).unwrap();
    assert_eq!(graph.records().count(), 2);
}

#[test]
fn enum_reference_and_constants() {
    let tree = parse_declarations(indoc! {r#"
        { "declarations": [
          { "kind": "typedef", "name": "color",
            "type": { "enum": { "name": "color", "members": [
                { "name": "RED" }, { "name": "GREEN", "value": 5 }, { "name": "BLUE" } ] } } },
          { "kind": "variable", "name": "c", "type": { "enum": { "name": "color" } } },
          { "kind": "constant", "name": "DT_DIR", "type": { "primitive": "int" }, "value": 4 }
        ]}
    "#})
    .unwrap();

    let graph = TypeGraph::from_tree(&tree).unwrap();
    let decls = graph.declarations();
    assert_eq!(decls[0].ty, decls[1].ty);
    assert_eq!(decls[2].kind, DeclKind::Constant);
    assert_eq!(decls[2].value, Some(4));
}

#[test]
fn unknown_names() {
    let tree = parse_declarations(
        r#"{ "declarations": [ { "kind": "variable", "name": "x", "type": { "typedef": "nope" } } ] }"#,
    )
    .unwrap();
    assert_eq!(
        TypeGraph::from_tree(&tree).unwrap_err(),
        GraphError::UnknownTypedef("nope".to_owned())
    );

    let tree = parse_declarations(
        r#"{ "declarations": [ { "kind": "variable", "name": "x", "type": { "enum": { "name": "e" } } } ] }"#,
    )
    .unwrap();
    assert_eq!(
        TypeGraph::from_tree(&tree).unwrap_err(),
        GraphError::UnknownEnum("e".to_owned())
    );
}

#[test]
fn rejects_unknown_primitive() {
    let err = parse_declarations(
        r#"{ "declarations": [ { "kind": "variable", "name": "x", "type": { "primitive": "quad" } } ] }"#,
    );
    assert!(err.is_err());
}
