#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core data structures for cshape.
//!
//! - [`graph`]: the type graph, an arena of declared C types
//! - [`tree`]: the serialized declaration tree a front-end produces
//! - [`PrimitiveKind`]: the closed set of primitive kinds
//! - [`Platform`]: sizes, alignments and conventions of a target

mod colors;
pub mod graph;
mod interner;
mod platform;
mod primitive;
pub mod tree;

#[cfg(test)]
mod primitive_tests;
#[cfg(test)]
mod tree_tests;

pub use colors::Colors;
pub use graph::{
    DeclKind, Declaration, EnumDecl, EnumId, EnumMember, Field, FunctionNode, GraphError, NodeId,
    RecordDecl, RecordId, RecordKind, TypeGraph, TypeNode,
};
pub use interner::{Interner, Symbol};
pub use platform::{BitOrder, Endian, Platform, PlatformError, SizeAlign};
pub use primitive::{PrimitiveClass, PrimitiveKind};
pub use tree::{DeclTree, parse_declarations};
