use cshape_table::TableError;

use crate::layout::LayoutError;

/// Errors raised by the value runtime.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// An integer stored into memory is outside the target's range.
    #[error("integer {value} does not fit in '{ty}'")]
    Overflow { value: i128, ty: String },

    /// A value of the right kind but an unusable content: too many
    /// initializers, an unknown enum member, a negative length.
    #[error("{0}")]
    Value(String),

    #[error("index {index} out of range for '{ty}' of length {length}")]
    Index { index: i64, length: u64, ty: String },

    /// The host value or typed value has the wrong kind for the operation.
    #[error("{0}")]
    Type(String),

    #[error("'{ty}' needs {needed} bytes but the source has only {available}")]
    IncompatibleSize {
        ty: String,
        needed: u64,
        available: u64,
    },

    #[error("'{0}' is not a pointer")]
    NotAPointer(String),

    /// Memory access outside every live allocation.
    #[error("invalid access of {len} bytes at 0x{address:x}")]
    InvalidAddress { address: u64, len: u64 },

    #[error("out of memory allocating {0} bytes")]
    OutOfMemory(u64),

    /// A call through an address with no registered callback and no native
    /// caller to forward it to.
    #[error("no native target for function at 0x{0:x}")]
    NoNativeTarget(u64),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Table(#[from] TableError),
}

impl RuntimeError {
    pub(crate) fn convert(from: &str, to: &str) -> Self {
        Self::Type(format!("cannot convert '{from}' to '{to}'"))
    }
}
