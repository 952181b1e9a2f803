//! Reading table files.

use std::path::Path;

use crate::error::TableError;
use crate::header::{HEADER_SIZE, Header, SectionOffsets};
use crate::record::{RECORD_SIZE, TypeOp};
use crate::sections::{EnumDef, EnumMemberDef, FieldDef, RootDef, StructDef, read_u32};
use crate::table::{TableParts, TypeTable};

impl TypeTable {
    /// Load and validate a table from its binary form. Nothing is kept on
    /// failure.
    #[tracing::instrument(level = "debug", skip_all, fields(len = bytes.len()))]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TableError> {
        if bytes.len() < HEADER_SIZE {
            return Err(TableError::FileTooSmall(bytes.len()));
        }

        let header = Header::from_bytes(&bytes[..HEADER_SIZE]);
        if !header.validate_magic() {
            return Err(TableError::InvalidMagic);
        }
        if !header.validate_version() {
            return Err(TableError::UnsupportedVersion(header.version));
        }
        if header.total_size as usize != bytes.len() {
            return Err(TableError::SizeMismatch {
                header: header.total_size,
                actual: bytes.len(),
            });
        }
        let actual = crc32fast::hash(&bytes[HEADER_SIZE..]);
        if actual != header.checksum {
            return Err(TableError::ChecksumMismatch {
                header: header.checksum,
                actual,
            });
        }

        let offsets = header.compute_offsets();
        if offsets.end > bytes.len() {
            return Err(TableError::Truncated { section: "roots" });
        }

        let parts = TableParts {
            strings: read_strings(bytes, &header, &offsets)?,
            ops: read_records(bytes, &header, &offsets)?,
            structs: entries(bytes, offsets.structs, header.struct_count, StructDef::SIZE)
                .map(StructDef::from_bytes)
                .collect(),
            fields: entries(bytes, offsets.fields, header.field_count, FieldDef::SIZE)
                .enumerate()
                .map(|(index, raw)| {
                    FieldDef::from_bytes(raw).ok_or_else(|| TableError::BadSideTable {
                        section: "fields",
                        index,
                        reason: "invalid bit width".to_owned(),
                    })
                })
                .collect::<Result<_, _>>()?,
            enums: entries(bytes, offsets.enums, header.enum_count, EnumDef::SIZE)
                .enumerate()
                .map(|(index, raw)| {
                    EnumDef::from_bytes(raw).ok_or_else(|| TableError::BadSideTable {
                        section: "enums",
                        index,
                        reason: "unknown underlying primitive".to_owned(),
                    })
                })
                .collect::<Result<_, _>>()?,
            members: entries(bytes, offsets.members, header.member_count, EnumMemberDef::SIZE)
                .map(EnumMemberDef::from_bytes)
                .collect(),
            roots: entries(bytes, offsets.roots, header.root_count, RootDef::SIZE)
                .enumerate()
                .map(|(index, raw)| {
                    RootDef::from_bytes(raw).ok_or_else(|| TableError::BadSideTable {
                        section: "roots",
                        index,
                        reason: "unknown root kind or value flag".to_owned(),
                    })
                })
                .collect::<Result<_, _>>()?,
        };

        Self::from_parts(parts)
    }

    /// Load a table file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TableError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }
}

/// Fixed-size entries of one section. Bounds are checked by the caller
/// through `SectionOffsets::end`.
fn entries(bytes: &[u8], offset: usize, count: u32, size: usize) -> impl Iterator<Item = &[u8]> {
    bytes[offset..offset + count as usize * size].chunks_exact(size)
}

fn read_records(
    bytes: &[u8],
    header: &Header,
    offsets: &SectionOffsets,
) -> Result<Vec<TypeOp>, TableError> {
    entries(bytes, offsets.records, header.record_count, RECORD_SIZE)
        .enumerate()
        .map(|(at, raw)| {
            let mut record = [0u8; RECORD_SIZE];
            record.copy_from_slice(raw);
            TypeOp::from_bytes(record, at)
        })
        .collect()
}

fn read_strings(
    bytes: &[u8],
    header: &Header,
    offsets: &SectionOffsets,
) -> Result<Vec<String>, TableError> {
    let blob = &bytes[offsets.str_blob..offsets.str_blob + header.str_blob_size as usize];
    let count = header.str_count as usize;
    let mut strings = Vec::with_capacity(count);

    for i in 0..count {
        let id = i as u32;
        let start = read_u32(bytes, offsets.str_table + i * 4) as usize;
        let end = read_u32(bytes, offsets.str_table + (i + 1) * 4) as usize;
        let raw = blob.get(start..end).ok_or(TableError::BadString(id))?;
        let s = std::str::from_utf8(raw).map_err(|_| TableError::InvalidUtf8(id))?;
        strings.push(s.to_owned());
    }
    Ok(strings)
}
