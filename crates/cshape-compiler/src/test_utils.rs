//! Test helpers.

use cshape_core::{TypeGraph, parse_declarations};
use cshape_table::TypeTable;

use crate::{Result, compile};

/// Lower a JSON declaration file into a graph.
pub fn graph_from_json(json: &str) -> TypeGraph {
    let tree = parse_declarations(json).expect("valid declaration JSON");
    TypeGraph::from_tree(&tree).expect("valid declaration tree")
}

/// Compile a JSON declaration file.
pub fn compile_json(json: &str) -> Result<TypeTable> {
    compile(&graph_from_json(json))
}

/// Compile a graph that must be valid.
pub fn compile_ok(graph: &TypeGraph) -> TypeTable {
    match compile(graph) {
        Ok(table) => table,
        Err(e) => panic!("compilation failed: {e}"),
    }
}

/// Records of a graph that must compile.
pub fn ops_of(graph: &TypeGraph) -> String {
    compile_ok(graph).render_ops()
}

/// Snapshot of the dump of a JSON declaration file.
#[macro_export]
macro_rules! shot_dump {
    ($json:literal, @$snapshot:literal) => {{
        let json = indoc::indoc!($json);
        let table = match $crate::test_utils::compile_json(json) {
            Ok(table) => table,
            Err(e) => panic!("compilation failed: {e}"),
        };
        let output = cshape_table::dump(&table, cshape_core::Colors::OFF);
        insta::assert_snapshot!(output, @$snapshot);
    }};
}
