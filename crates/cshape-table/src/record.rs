//! Main-table records.
//!
//! Every record is 8 bytes: the opcode in the low byte and a 56-bit operand
//! above it, little-endian. The operand is a back-reference, a side-table
//! index or an immediate depending on the opcode.

use std::fmt;

use cshape_core::PrimitiveKind;

use crate::TableError;

/// Index of a record in the main table.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct TypeIndex(pub u32);

impl TypeIndex {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TypeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub const RECORD_SIZE: usize = 8;

/// Largest value an operand can hold.
pub const MAX_OPERAND: u64 = (1 << 56) - 1;

/// Raw opcode byte values.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(u8)]
pub enum Opcode {
    /// Array length pseudo-record, printed as `None`.
    Length = 0,
    Primitive = 1,
    Pointer = 3,
    Array = 5,
    OpenArray = 7,
    StructUnion = 9,
    Enum = 11,
    Function = 13,
    FunctionEnd = 15,
    Noop = 17,
}

impl Opcode {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Length),
            1 => Some(Self::Primitive),
            3 => Some(Self::Pointer),
            5 => Some(Self::Array),
            7 => Some(Self::OpenArray),
            9 => Some(Self::StructUnion),
            11 => Some(Self::Enum),
            13 => Some(Self::Function),
            15 => Some(Self::FunctionEnd),
            17 => Some(Self::Noop),
            _ => None,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::Length => "None",
            Self::Primitive => "PRIMITIVE",
            Self::Pointer => "POINTER",
            Self::Array => "ARRAY",
            Self::OpenArray => "OPEN_ARRAY",
            Self::StructUnion => "STRUCT_UNION",
            Self::Enum => "ENUM",
            Self::Function => "FUNCTION",
            Self::FunctionEnd => "FUNCTION_END",
            Self::Noop => "NOOP",
        }
    }
}

/// A decoded record.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum TypeOp {
    Primitive(PrimitiveKind),
    Pointer(TypeIndex),
    /// Always followed by a [`TypeOp::Length`].
    Array(TypeIndex),
    Length(u64),
    OpenArray(TypeIndex),
    /// Index into the struct side table.
    StructUnion(u32),
    /// Index into the enum side table.
    Enum(u32),
    /// Operand is the result type; argument records follow.
    Function(TypeIndex),
    FunctionEnd { variadic: bool },
    /// Argument slot referring to a type defined earlier.
    Noop(TypeIndex),
}

impl TypeOp {
    pub fn opcode(self) -> Opcode {
        match self {
            Self::Primitive(_) => Opcode::Primitive,
            Self::Pointer(_) => Opcode::Pointer,
            Self::Array(_) => Opcode::Array,
            Self::Length(_) => Opcode::Length,
            Self::OpenArray(_) => Opcode::OpenArray,
            Self::StructUnion(_) => Opcode::StructUnion,
            Self::Enum(_) => Opcode::Enum,
            Self::Function(_) => Opcode::Function,
            Self::FunctionEnd { .. } => Opcode::FunctionEnd,
            Self::Noop(_) => Opcode::Noop,
        }
    }

    pub fn operand(self) -> u64 {
        match self {
            Self::Primitive(kind) => u64::from(kind.id()),
            Self::Pointer(t)
            | Self::Array(t)
            | Self::OpenArray(t)
            | Self::Function(t)
            | Self::Noop(t) => u64::from(t.0),
            Self::Length(n) => n,
            Self::StructUnion(i) | Self::Enum(i) => u64::from(i),
            Self::FunctionEnd { variadic } => u64::from(variadic),
        }
    }

    /// Main-table index this record points back to, if any.
    pub fn reference(self) -> Option<TypeIndex> {
        match self {
            Self::Pointer(t)
            | Self::Array(t)
            | Self::OpenArray(t)
            | Self::Function(t)
            | Self::Noop(t) => Some(t),
            _ => None,
        }
    }

    /// Whether this record describes a type (as opposed to bracketing or
    /// length pseudo-records).
    pub fn is_type(self) -> bool {
        !matches!(self, Self::Length(_) | Self::FunctionEnd { .. })
    }

    pub fn to_bytes(self) -> [u8; RECORD_SIZE] {
        let raw = u64::from(self.opcode() as u8) | (self.operand() << 8);
        raw.to_le_bytes()
    }

    /// Decode the record stored at position `at`.
    pub fn from_bytes(bytes: [u8; RECORD_SIZE], at: usize) -> Result<Self, TableError> {
        let raw = u64::from_le_bytes(bytes);
        let byte = (raw & 0xFF) as u8;
        let operand = raw >> 8;
        let opcode = Opcode::from_u8(byte).ok_or(TableError::UnknownOpcode { at, opcode: byte })?;

        let index = || {
            u32::try_from(operand)
                .map(TypeIndex)
                .map_err(|_| TableError::IndexOutOfRange {
                    at,
                    target: operand,
                })
        };
        let side = || {
            u32::try_from(operand).map_err(|_| TableError::IndexOutOfRange {
                at,
                target: operand,
            })
        };

        let op = match opcode {
            Opcode::Length => Self::Length(operand),
            Opcode::Primitive => {
                let kind = u8::try_from(operand)
                    .ok()
                    .and_then(PrimitiveKind::from_u8)
                    .ok_or(TableError::UnknownPrimitive { at, id: operand })?;
                Self::Primitive(kind)
            }
            Opcode::Pointer => Self::Pointer(index()?),
            Opcode::Array => Self::Array(index()?),
            Opcode::OpenArray => Self::OpenArray(index()?),
            Opcode::StructUnion => Self::StructUnion(side()?),
            Opcode::Enum => Self::Enum(side()?),
            Opcode::Function => Self::Function(index()?),
            Opcode::FunctionEnd => match operand {
                0 => Self::FunctionEnd { variadic: false },
                1 => Self::FunctionEnd { variadic: true },
                _ => {
                    return Err(TableError::MalformedFunction {
                        at,
                        reason: "unknown FUNCTION_END flags",
                    });
                }
            },
            Opcode::Noop => Self::Noop(index()?),
        };
        Ok(op)
    }
}

impl fmt::Display for TypeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {})", self.opcode().mnemonic(), self.operand())
    }
}
