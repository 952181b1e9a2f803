//! Table file header (64 bytes).
//!
//! Section order: Header → StringBlob → StringTable → Records → Structs →
//! Fields → Enums → EnumMembers → Roots. Every section starts on a
//! `SECTION_ALIGN` boundary; offsets are derived from the counts.

use crate::record::RECORD_SIZE;
use crate::sections::{EnumDef, EnumMemberDef, FieldDef, RootDef, StructDef};

pub const MAGIC: [u8; 4] = *b"CSHT";
pub const VERSION: u32 = 1;
pub const SECTION_ALIGN: usize = 64;
pub const HEADER_SIZE: usize = 64;

/// First 64 bytes of a table file.
///
/// - 0-19: magic, version, checksum, total_size, str_blob_size
/// - 20-47: counts (7 × u32), in section order
/// - 48-63: reserved
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    pub magic: [u8; 4],
    pub version: u32,
    /// CRC32 of everything after the header.
    pub checksum: u32,
    pub total_size: u32,
    pub str_blob_size: u32,

    pub str_count: u32,
    pub record_count: u32,
    pub struct_count: u32,
    pub field_count: u32,
    pub enum_count: u32,
    pub member_count: u32,
    pub root_count: u32,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            magic: MAGIC,
            version: VERSION,
            checksum: 0,
            total_size: 0,
            str_blob_size: 0,
            str_count: 0,
            record_count: 0,
            struct_count: 0,
            field_count: 0,
            enum_count: 0,
            member_count: 0,
            root_count: 0,
        }
    }
}

/// Byte offsets of each section, plus the end of the last one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SectionOffsets {
    pub str_blob: usize,
    pub str_table: usize,
    pub records: usize,
    pub structs: usize,
    pub fields: usize,
    pub enums: usize,
    pub members: usize,
    pub roots: usize,
    pub end: usize,
}

impl Header {
    /// # Panics
    /// Panics if `bytes` is shorter than 64 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        assert!(bytes.len() >= HEADER_SIZE, "header too short");
        let u32_at = |o: usize| u32::from_le_bytes([bytes[o], bytes[o + 1], bytes[o + 2], bytes[o + 3]]);

        Self {
            magic: [bytes[0], bytes[1], bytes[2], bytes[3]],
            version: u32_at(4),
            checksum: u32_at(8),
            total_size: u32_at(12),
            str_blob_size: u32_at(16),
            str_count: u32_at(20),
            record_count: u32_at(24),
            struct_count: u32_at(28),
            field_count: u32_at(32),
            enum_count: u32_at(36),
            member_count: u32_at(40),
            root_count: u32_at(44),
        }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(&self.magic);
        let fields = [
            self.version,
            self.checksum,
            self.total_size,
            self.str_blob_size,
            self.str_count,
            self.record_count,
            self.struct_count,
            self.field_count,
            self.enum_count,
            self.member_count,
            self.root_count,
        ];
        for (i, value) in fields.iter().enumerate() {
            let at = 4 + i * 4;
            bytes[at..at + 4].copy_from_slice(&value.to_le_bytes());
        }
        bytes
    }

    pub fn validate_magic(&self) -> bool {
        self.magic == MAGIC
    }

    pub fn validate_version(&self) -> bool {
        self.version == VERSION
    }

    /// Section offsets implied by the counts. Computed in `usize` so hostile
    /// counts cannot wrap.
    pub fn compute_offsets(&self) -> SectionOffsets {
        let n = |v: u32| v as usize;

        let str_blob = HEADER_SIZE;
        let str_table = align_up(str_blob + n(self.str_blob_size));
        let records = align_up(str_table + (n(self.str_count) + 1) * 4);
        let structs = align_up(records + n(self.record_count) * RECORD_SIZE);
        let fields = align_up(structs + n(self.struct_count) * StructDef::SIZE);
        let enums = align_up(fields + n(self.field_count) * FieldDef::SIZE);
        let members = align_up(enums + n(self.enum_count) * EnumDef::SIZE);
        let roots = align_up(members + n(self.member_count) * EnumMemberDef::SIZE);
        let end = align_up(roots + n(self.root_count) * RootDef::SIZE);

        SectionOffsets {
            str_blob,
            str_table,
            records,
            structs,
            fields,
            enums,
            members,
            roots,
            end,
        }
    }
}

/// Round up to the next section boundary.
pub fn align_up(value: usize) -> usize {
    value.div_ceil(SECTION_ALIGN) * SECTION_ALIGN
}
