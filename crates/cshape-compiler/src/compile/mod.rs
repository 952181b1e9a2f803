//! Type graph compilation.
//!
//! Emission is post-order in declaration order: children before parents,
//! except named records, whose `STRUCT_UNION` record is emitted before their
//! fields so that they can refer to themselves.
//!
//! Structurally equal types are emitted once. Function argument lists are the
//! exception: each argument occupies one positional slot, and a repeated
//! non-primitive argument becomes a `NOOP` back to its first slot.

mod compiler;
mod functions;
mod key;
mod records;

#[cfg(test)]
mod functions_tests;

pub use compiler::{Compiler, compile};
