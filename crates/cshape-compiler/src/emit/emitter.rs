//! Table file writer.

use cshape_table::{HEADER_SIZE, Header, RECORD_SIZE, SECTION_ALIGN, TypeTable};

use crate::{CompileError, Result};

/// Serialize a validated table.
///
/// Sections are written in header order, each padded to `SECTION_ALIGN`. The
/// header is written last, once the checksum over the body is known.
#[tracing::instrument(level = "debug", skip_all, fields(records = table.len()))]
pub fn emit(table: &TypeTable) -> Result<Vec<u8>> {
    let (str_blob, str_table) = emit_strings(table.strings())?;

    let mut records = Vec::with_capacity(table.len() * RECORD_SIZE);
    for op in table.ops() {
        records.extend_from_slice(&op.to_bytes());
    }

    let structs: Vec<u8> = table.structs().iter().flat_map(|d| d.to_bytes()).collect();
    let fields: Vec<u8> = table.fields().iter().flat_map(|d| d.to_bytes()).collect();
    let enums: Vec<u8> = table.enums().iter().flat_map(|d| d.to_bytes()).collect();
    let members: Vec<u8> = table.members().iter().flat_map(|d| d.to_bytes()).collect();
    let roots: Vec<u8> = table.roots().iter().flat_map(|d| d.to_bytes()).collect();

    let mut output = vec![0u8; HEADER_SIZE];
    emit_section(&mut output, &str_blob);
    emit_section(&mut output, &str_table);
    emit_section(&mut output, &records);
    emit_section(&mut output, &structs);
    emit_section(&mut output, &fields);
    emit_section(&mut output, &enums);
    emit_section(&mut output, &members);
    emit_section(&mut output, &roots);
    pad_to_section(&mut output);

    let mut header = Header {
        total_size: count(output.len(), "file")?,
        str_blob_size: count(str_blob.len(), "string blob")?,
        str_count: count(table.strings().len(), "strings")?,
        record_count: count(table.len(), "records")?,
        struct_count: count(table.structs().len(), "structs")?,
        field_count: count(table.fields().len(), "fields")?,
        enum_count: count(table.enums().len(), "enums")?,
        member_count: count(table.members().len(), "enum members")?,
        root_count: count(table.roots().len(), "roots")?,
        ..Default::default()
    };
    header.checksum = crc32fast::hash(&output[HEADER_SIZE..]);
    output[..HEADER_SIZE].copy_from_slice(&header.to_bytes());

    tracing::debug!(bytes = output.len(), "table emitted");
    Ok(output)
}

fn count(len: usize, section: &'static str) -> Result<u32> {
    u32::try_from(len).map_err(|_| CompileError::TooLarge(section))
}

/// String blob plus `count + 1` offsets into it; string `i` spans
/// `offsets[i]..offsets[i + 1]`.
fn emit_strings(strings: &[String]) -> Result<(Vec<u8>, Vec<u8>)> {
    let mut blob = Vec::new();
    let mut table = Vec::with_capacity((strings.len() + 1) * 4);
    for s in strings {
        table.extend_from_slice(&count(blob.len(), "string blob")?.to_le_bytes());
        blob.extend_from_slice(s.as_bytes());
    }
    table.extend_from_slice(&count(blob.len(), "string blob")?.to_le_bytes());
    Ok((blob, table))
}

/// Pad a buffer to the section alignment boundary.
fn pad_to_section(buf: &mut Vec<u8>) {
    let rem = buf.len() % SECTION_ALIGN;
    if rem != 0 {
        let padding = SECTION_ALIGN - rem;
        buf.resize(buf.len() + padding, 0);
    }
}

fn emit_section(output: &mut Vec<u8>, data: &[u8]) {
    pad_to_section(output);
    output.extend_from_slice(data);
}
