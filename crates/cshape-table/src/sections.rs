//! Side-table entries: structs, fields, enums, enum members and roots.
//!
//! All entries are fixed-size and little-endian.

use cshape_core::PrimitiveKind;

use super::record::TypeIndex;

/// Index into the string table. String 0 is always the empty string, which
/// names anonymous records.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct StringId(pub u32);

impl StringId {
    pub const EMPTY: Self = Self(0);

    pub fn is_empty(self) -> bool {
        self == Self::EMPTY
    }
}

#[inline]
pub(crate) fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

#[inline]
fn read_i64(bytes: &[u8], offset: usize) -> i64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[offset..offset + 8]);
    i64::from_le_bytes(raw)
}

/// Struct or union descriptor (20 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StructDef {
    pub name: StringId,
    /// The `STRUCT_UNION` record that owns this descriptor.
    pub record: TypeIndex,
    pub first_field: u32,
    pub field_count: u32,
    pub flags: u32,
}

impl StructDef {
    pub const SIZE: usize = 20;
    pub const UNION: u32 = 1;
    pub const OPAQUE: u32 = 2;

    pub fn is_union(&self) -> bool {
        self.flags & Self::UNION != 0
    }

    pub fn is_opaque(&self) -> bool {
        self.flags & Self::OPAQUE != 0
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.name.0.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.record.0.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.first_field.to_le_bytes());
        bytes[12..16].copy_from_slice(&self.field_count.to_le_bytes());
        bytes[16..20].copy_from_slice(&self.flags.to_le_bytes());
        bytes
    }

    pub(crate) fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            name: StringId(read_u32(bytes, 0)),
            record: TypeIndex(read_u32(bytes, 4)),
            first_field: read_u32(bytes, 8),
            field_count: read_u32(bytes, 12),
            flags: read_u32(bytes, 16),
        }
    }
}

/// Field descriptor (12 bytes). A missing bit width is stored as `0xFFFF`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FieldDef {
    pub name: StringId,
    pub ty: TypeIndex,
    pub bit_width: Option<u8>,
}

impl FieldDef {
    pub const SIZE: usize = 12;
    const NO_WIDTH: u16 = 0xFFFF;

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let width = self.bit_width.map_or(Self::NO_WIDTH, u16::from);
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.name.0.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.ty.0.to_le_bytes());
        bytes[8..10].copy_from_slice(&width.to_le_bytes());
        bytes
    }

    /// `None` when the width is neither absent nor a valid `u8`.
    pub(crate) fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let width = u16::from_le_bytes([bytes[8], bytes[9]]);
        let bit_width = match width {
            Self::NO_WIDTH => None,
            w => Some(u8::try_from(w).ok()?),
        };
        Some(Self {
            name: StringId(read_u32(bytes, 0)),
            ty: TypeIndex(read_u32(bytes, 4)),
            bit_width,
        })
    }
}

/// Enum descriptor (20 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EnumDef {
    pub name: StringId,
    /// The `ENUM` record that owns this descriptor.
    pub record: TypeIndex,
    pub underlying: PrimitiveKind,
    pub first_member: u32,
    pub member_count: u32,
}

impl EnumDef {
    pub const SIZE: usize = 20;

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.name.0.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.record.0.to_le_bytes());
        bytes[8..12].copy_from_slice(&u32::from(self.underlying.id()).to_le_bytes());
        bytes[12..16].copy_from_slice(&self.first_member.to_le_bytes());
        bytes[16..20].copy_from_slice(&self.member_count.to_le_bytes());
        bytes
    }

    pub(crate) fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let underlying = u8::try_from(read_u32(bytes, 8))
            .ok()
            .and_then(PrimitiveKind::from_u8)?;
        Some(Self {
            name: StringId(read_u32(bytes, 0)),
            record: TypeIndex(read_u32(bytes, 4)),
            underlying,
            first_member: read_u32(bytes, 12),
            member_count: read_u32(bytes, 16),
        })
    }
}

/// Enum member (12 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EnumMemberDef {
    pub name: StringId,
    pub value: i64,
}

impl EnumMemberDef {
    pub const SIZE: usize = 12;

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.name.0.to_le_bytes());
        bytes[4..12].copy_from_slice(&self.value.to_le_bytes());
        bytes
    }

    pub(crate) fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            name: StringId(read_u32(bytes, 0)),
            value: read_i64(bytes, 4),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RootKind {
    Function = 0,
    Variable = 1,
    Typedef = 2,
    Constant = 3,
}

impl RootKind {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Function),
            1 => Some(Self::Variable),
            2 => Some(Self::Typedef),
            3 => Some(Self::Constant),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Variable => "variable",
            Self::Typedef => "typedef",
            Self::Constant => "constant",
        }
    }
}

/// Root declaration (20 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RootDef {
    pub name: StringId,
    pub kind: RootKind,
    pub ty: TypeIndex,
    pub value: Option<i64>,
}

impl RootDef {
    pub const SIZE: usize = 20;

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.name.0.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.ty.0.to_le_bytes());
        bytes[8] = self.kind as u8;
        bytes[9] = u8::from(self.value.is_some());
        bytes[12..20].copy_from_slice(&self.value.unwrap_or(0).to_le_bytes());
        bytes
    }

    pub(crate) fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let kind = RootKind::from_u8(bytes[8])?;
        let value = match bytes[9] {
            0 => None,
            1 => Some(read_i64(bytes, 12)),
            _ => return None,
        };
        Some(Self {
            name: StringId(read_u32(bytes, 0)),
            kind,
            ty: TypeIndex(read_u32(bytes, 4)),
            value,
        })
    }
}
