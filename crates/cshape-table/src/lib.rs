#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! The cshape type table.
//!
//! A type table is a flat, append-only sequence of 8-byte records that refer
//! to each other by index, plus side tables for what a record cannot hold
//! (record fields, enum members, root declarations, names). This crate owns:
//! - the record encoding ([`TypeOp`]) and side-table entries
//! - the binary file header and section layout
//! - [`TypeTable`], the validated in-memory form, and its file loader
//! - C declarator rendering and a human-readable dump

mod cname;
mod dump;
mod error;
mod header;
mod load;
mod record;
mod sections;
mod table;

#[cfg(test)]
mod cname_tests;
#[cfg(test)]
mod dump_tests;
#[cfg(test)]
mod header_tests;
#[cfg(test)]
mod record_tests;

pub use dump::dump;
pub use error::TableError;
pub use header::{HEADER_SIZE, Header, MAGIC, SECTION_ALIGN, SectionOffsets, VERSION, align_up};
pub use record::{MAX_OPERAND, Opcode, RECORD_SIZE, TypeIndex, TypeOp};
pub use sections::{EnumDef, EnumMemberDef, FieldDef, RootDef, RootKind, StringId, StructDef};
pub use table::{FunctionSig, TableParts, TypeShape, TypeTable};
