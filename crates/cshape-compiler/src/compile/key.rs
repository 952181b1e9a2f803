//! Structural identity of compiled types.

use cshape_core::{PrimitiveKind, RecordKind, Symbol};
use cshape_table::TypeIndex;

/// Dedup key. Child references are already-compiled canonical indices, so two
/// keys are equal iff the types are structurally equal.
///
/// Named records and enums are not keyed here: they are identified by name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(super) enum ShapeKey {
    Primitive(PrimitiveKind),
    Pointer(TypeIndex),
    Array(TypeIndex, Option<u64>),
    Function {
        result: TypeIndex,
        params: Vec<TypeIndex>,
        variadic: bool,
    },
    AnonRecord {
        kind: RecordKind,
        fields: Vec<(Symbol, TypeIndex, Option<u8>)>,
    },
    Enum {
        name: Option<Symbol>,
        underlying: PrimitiveKind,
        members: Vec<(Symbol, i64)>,
    },
}
