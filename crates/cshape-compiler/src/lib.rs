//! cshape compiler: flattens a type graph into a type table.
//!
//! - `compile` - deduplicating compilation of root declarations
//! - `emit` - serialization to the binary table format

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod compile;
pub mod emit;

#[cfg(test)]
pub mod test_utils;

use cshape_core::GraphError;
use cshape_table::TableError;

pub use compile::{Compiler, compile};
pub use emit::emit;

/// Errors that abort compilation of a unit. No partial table is produced.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// The graph is malformed: void objects, bad bitfields, misplaced
    /// unknown-length arrays, self-containment, capacity overflow.
    #[error("invalid type structure: {0}")]
    ParseStructure(String),

    /// One name bound to two different types.
    #[error("conflicting redefinition of '{0}'")]
    ConflictingRedefinition(String),

    /// A bare function type where an object is required.
    #[error("{0} has function type (did you mean a function pointer?)")]
    NotAPointer(String),

    #[error("{0} section exceeds 4 GiB")]
    TooLarge(&'static str),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Table(#[from] TableError),
}

/// Result type for compilation.
pub type Result<T> = std::result::Result<T, CompileError>;
