#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Layout engine and typed value runtime for cshape.
//!
//! A [`LayoutEngine`] assigns sizes, alignments and field offsets to the
//! types of a [`cshape_table::TypeTable`] for one [`cshape_core::Platform`].
//! The [`Runtime`] builds on it to allocate, read, write, cast and call typed
//! values that live in a pluggable [`MemoryProvider`].

pub mod engine;
mod layout;

#[cfg(test)]
mod layout_tests;
#[cfg(test)]
mod test_utils;

pub use engine::{
    Address, CData, Callback, Heap, HostValue, MemoryProvider, NativeArg, NativeCaller,
    Runtime, RuntimeBuilder, RuntimeError, ValueKey,
};
pub use layout::{Bitfield, FieldLayout, Layout, LayoutEngine, LayoutError, RecordLayout};
