use super::header::*;

#[test]
fn align_up_rounds_to_section() {
    assert_eq!(align_up(0), 0);
    assert_eq!(align_up(1), 64);
    assert_eq!(align_up(64), 64);
    assert_eq!(align_up(65), 128);
}

#[test]
fn empty_table_offsets() {
    let offsets = Header::default().compute_offsets();

    assert_eq!(offsets.str_blob, 64);
    assert_eq!(offsets.str_table, 64);
    // The string table always holds the sentinel offset.
    assert_eq!(offsets.records, 128);
    assert_eq!(offsets.roots, 128);
    assert_eq!(offsets.end, 128);
}

#[test]
fn offsets_follow_counts() {
    let header = Header {
        str_blob_size: 10,
        str_count: 3,
        record_count: 9,
        struct_count: 1,
        field_count: 2,
        root_count: 1,
        ..Default::default()
    };
    let offsets = header.compute_offsets();

    assert_eq!(offsets.str_table, 128);
    assert_eq!(offsets.records, 192);
    assert_eq!(offsets.structs, 192 + 128);
    assert_eq!(offsets.fields, 384);
    assert_eq!(offsets.enums, 448);
    assert_eq!(offsets.members, 448);
    assert_eq!(offsets.roots, 448);
    assert_eq!(offsets.end, 512);
}

#[test]
fn header_bytes_layout() {
    let header = Header {
        checksum: 0xDEADBEEF,
        total_size: 256,
        record_count: 4,
        root_count: 2,
        ..Default::default()
    };
    let bytes = header.to_bytes();

    assert_eq!(&bytes[0..4], b"CSHT");
    assert_eq!(&bytes[4..8], &1u32.to_le_bytes());
    assert_eq!(&bytes[8..12], &0xDEADBEEFu32.to_le_bytes());
    assert_eq!(&bytes[24..28], &4u32.to_le_bytes());
    assert_eq!(&bytes[44..48], &2u32.to_le_bytes());
    assert!(bytes[48..].iter().all(|&b| b == 0));
    assert_eq!(Header::from_bytes(&bytes), header);
}

#[test]
fn validation_flags() {
    let mut header = Header::default();
    assert!(header.validate_magic());
    assert!(header.validate_version());

    header.magic = *b"PTKQ";
    header.version = 7;
    assert!(!header.validate_magic());
    assert!(!header.validate_version());
}
