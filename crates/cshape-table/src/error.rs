use std::io;

use crate::header::VERSION;

/// A malformed type table. Every variant except `UnknownType` is raised while
/// loading or building a table, so a table that exists is always valid.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("file too small: {0} bytes (minimum 64)")]
    FileTooSmall(usize),
    #[error("invalid magic: expected CSHT")]
    InvalidMagic,
    #[error("unsupported version: {0} (expected {VERSION})")]
    UnsupportedVersion(u32),
    #[error("size mismatch: header says {header} bytes, got {actual}")]
    SizeMismatch { header: u32, actual: usize },
    #[error("checksum mismatch: header says {header:#010x}, computed {actual:#010x}")]
    ChecksumMismatch { header: u32, actual: u32 },
    #[error("section '{section}' extends past the end of the file")]
    Truncated { section: &'static str },

    #[error("record {at}: unknown opcode {opcode}")]
    UnknownOpcode { at: usize, opcode: u8 },
    #[error("record {at}: unknown primitive id {id}")]
    UnknownPrimitive { at: usize, id: u64 },
    #[error("record {at}: index {target} out of range")]
    IndexOutOfRange { at: usize, target: u64 },
    #[error("record {at}: forward reference to {target}")]
    ForwardReference { at: usize, target: u32 },
    #[error("record {at}: {target} is not a type record")]
    NotAType { at: usize, target: u32 },
    #[error("record {at}: ARRAY is not followed by a length record")]
    MissingLength { at: usize },
    #[error("record {at}: length record without ARRAY")]
    MisplacedLength { at: usize },
    #[error("record {at}: {reason}")]
    MalformedFunction { at: usize, reason: &'static str },
    #[error("{section} entry {index}: {reason}")]
    BadSideTable {
        section: &'static str,
        index: usize,
        reason: String,
    },
    #[error("string id {0} out of range")]
    BadString(u32),
    #[error("string {0} is not valid UTF-8")]
    InvalidUtf8(u32),

    #[error("type index {0} is not a type in this table")]
    UnknownType(u32),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}
