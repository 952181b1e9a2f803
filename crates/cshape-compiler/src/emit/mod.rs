//! Serialization of type tables.
//!
//! The output is the file format `TypeTable::from_bytes` reads: a 64-byte
//! header followed by section-aligned string, record and side-table sections.

mod emitter;


pub use emitter::emit;
