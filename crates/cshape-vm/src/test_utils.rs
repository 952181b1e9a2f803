//! Test helpers.

use std::sync::Arc;

use cshape_core::{Platform, TypeGraph, parse_declarations};
use cshape_table::{TypeIndex, TypeTable};

use crate::engine::find_type;
use crate::{LayoutEngine, Runtime};

/// Compile a JSON declaration file that must be valid.
pub fn table_from_json(json: &str) -> Arc<TypeTable> {
    let tree = parse_declarations(json).expect("valid declaration JSON");
    let graph = TypeGraph::from_tree(&tree).expect("valid declaration tree");
    match cshape_compiler::compile(&graph) {
        Ok(table) => Arc::new(table),
        Err(e) => panic!("compilation failed: {e}"),
    }
}

pub fn engine(json: &str, platform: Platform) -> LayoutEngine {
    LayoutEngine::new(table_from_json(json), platform)
}

/// A runtime on the default platform over the heap.
pub fn runtime(json: &str) -> Runtime {
    Runtime::new(table_from_json(json))
}

/// A type by C spelling or typedef name.
pub fn ty(table: &TypeTable, name: &str) -> TypeIndex {
    match find_type(table, name) {
        Some(ty) => ty,
        None => panic!("no type '{name}' in table:\n{}", cshape_table::dump(table, cshape_core::Colors::OFF)),
    }
}
