use std::rc::Rc;
use std::sync::Arc;

use cshape_core::{BitOrder, Platform};
use cshape_table::TypeTable;
use indoc::indoc;

use crate::test_utils::{engine, table_from_json, ty};
use crate::{Bitfield, Layout, LayoutEngine, LayoutError};

const SHAPES: &str = indoc! {r#"
    { "declarations": [
      { "kind": "typedef", "name": "packed_t",
        "type": { "struct": { "name": "packed", "fields": [
            { "name": "a", "type": { "primitive": "char" } },
            { "name": "b", "type": { "primitive": "short" } },
            { "name": "c", "type": { "primitive": "char" } }
        ] } } },
      { "kind": "typedef", "name": "four_t",
        "type": { "struct": { "name": "four", "fields": [
            { "name": "a", "type": { "primitive": "int" } },
            { "name": "b", "type": { "primitive": "short" } },
            { "name": "c", "type": { "primitive": "short" } },
            { "name": "d", "type": { "primitive": "short" } }
        ] } } },
      { "kind": "typedef", "name": "four_u",
        "type": { "union": { "name": "quad", "fields": [
            { "name": "a", "type": { "primitive": "int" } },
            { "name": "b", "type": { "primitive": "short" } }
        ] } } },
      { "kind": "typedef", "name": "mixed_t",
        "type": { "struct": { "name": "mixed", "fields": [
            { "name": "c", "type": { "primitive": "char" } },
            { "name": "d", "type": { "primitive": "double" } }
        ] } } },
      { "kind": "variable", "name": "longs",
        "type": { "array": { "element": { "primitive": "long" }, "length": 10 } } },
      { "kind": "variable", "name": "ints",
        "type": { "array": { "element": { "primitive": "int" } } } },
      { "kind": "variable", "name": "nothing",
        "type": { "pointer": { "primitive": "void" } } },
      { "kind": "variable", "name": "file",
        "type": { "pointer": { "struct": { "name": "FILE" } } } },
      { "kind": "function", "name": "abs",
        "type": { "function": { "result": { "primitive": "int" },
                                "params": [ { "primitive": "int" } ] } } },
      { "kind": "variable", "name": "shade",
        "type": { "enum": { "name": "color", "members": [
            { "name": "RED" }, { "name": "GREEN" }
        ] } } }
    ]}
"#};

const BITS: &str = indoc! {r#"
    { "declarations": [
      { "kind": "typedef", "name": "flags_t",
        "type": { "struct": { "name": "flags", "fields": [
            { "name": "a", "type": { "primitive": "int" }, "bits": 10 },
            { "name": "b", "type": { "primitive": "int" }, "bits": 20 },
            { "name": "c", "type": { "primitive": "int" }, "bits": 3 }
        ] } } },
      { "kind": "typedef", "name": "split_t",
        "type": { "struct": { "name": "split", "fields": [
            { "name": "a", "type": { "primitive": "int" }, "bits": 3 },
            { "name": "", "type": { "primitive": "int" }, "bits": 0 },
            { "name": "b", "type": { "primitive": "unsigned int" }, "bits": 2 }
        ] } } },
      { "kind": "typedef", "name": "tail_t",
        "type": { "struct": { "name": "tail", "fields": [
            { "name": "c", "type": { "primitive": "char" } },
            { "name": "b", "type": { "primitive": "int" }, "bits": 4 }
        ] } } },
      { "kind": "typedef", "name": "wide_t",
        "type": { "struct": { "name": "wide", "fields": [
            { "name": "x", "type": { "primitive": "long" }, "bits": 40 }
        ] } } }
    ]}
"#};

#[test]
fn primitive_sizes_follow_platform() {
    let lp64 = engine(SHAPES, Platform::lp64());
    let ilp32 = engine(SHAPES, Platform::ilp32());
    let llp64 = engine(SHAPES, Platform::llp64());

    let long = ty(lp64.table(), "long");
    assert_eq!(lp64.size_of(long).unwrap(), 8);
    assert_eq!(ilp32.size_of(long).unwrap(), 4);
    assert_eq!(llp64.size_of(long).unwrap(), 4);

    let pointer = ty(lp64.table(), "void *");
    assert_eq!(lp64.size_of(pointer).unwrap(), 8);
    assert_eq!(ilp32.size_of(pointer).unwrap(), 4);
}

#[test]
fn members_are_padded_to_their_alignment() {
    let engine = engine(SHAPES, Platform::lp64());
    let packed = ty(engine.table(), "packed_t");

    let record = engine.record(packed).unwrap();
    let offsets: Vec<_> = record.fields.iter().map(|f| f.offset).collect();
    assert_eq!(offsets, [0, 2, 4]);
    assert_eq!(record.layout, Layout { size: 6, align: 2 });
    assert_eq!(engine.offset_of(packed, "c").unwrap(), 4);
}

#[test]
fn struct_and_union_sizes() {
    let engine = engine(SHAPES, Platform::lp64());
    assert_eq!(engine.size_of(ty(engine.table(), "struct four")).unwrap(), 12);
    assert_eq!(engine.size_of(ty(engine.table(), "union quad")).unwrap(), 4);
    assert_eq!(engine.offset_of(ty(engine.table(), "union quad"), "b").unwrap(), 0);
}

#[test]
fn double_alignment_differs_between_platforms() {
    let lp64 = engine(SHAPES, Platform::lp64());
    let ilp32 = engine(SHAPES, Platform::ilp32());
    let mixed = ty(lp64.table(), "mixed_t");

    assert_eq!(lp64.offset_of(mixed, "d").unwrap(), 8);
    assert_eq!(lp64.size_of(mixed).unwrap(), 16);
    assert_eq!(ilp32.offset_of(mixed, "d").unwrap(), 4);
    assert_eq!(ilp32.size_of(mixed).unwrap(), 12);
}

#[test]
fn array_size_multiplies_element() {
    let engine = engine(SHAPES, Platform::lp64());
    let longs = ty(engine.table(), "long[10]");
    assert_eq!(engine.layout(longs).unwrap(), Layout { size: 80, align: 8 });
}

#[test]
fn enum_uses_underlying_type() {
    let engine = engine(SHAPES, Platform::lp64());
    let color = ty(engine.table(), "enum color");
    assert_eq!(engine.layout(color).unwrap(), Layout { size: 4, align: 4 });
}

#[test]
fn incomplete_types_have_no_size() {
    let engine = engine(SHAPES, Platform::lp64());

    let err = engine.size_of(ty(engine.table(), "int[]")).unwrap_err();
    assert_eq!(err.to_string(), "'int[]' has incomplete type");

    let err = engine.size_of(ty(engine.table(), "struct FILE")).unwrap_err();
    assert!(matches!(err, LayoutError::IncompleteType(ref name) if name == "struct FILE"));

    let err = engine.size_of(ty(engine.table(), "void")).unwrap_err();
    assert_eq!(err.to_string(), "'void' has incomplete type");
}

#[test]
fn function_type_is_unsized() {
    let engine = engine(SHAPES, Platform::lp64());
    let err = engine.size_of(ty(engine.table(), "int(int)")).unwrap_err();
    assert_eq!(err.to_string(), "'int(int)' is a function type and has no size");
}

#[test]
fn unknown_field() {
    let engine = engine(SHAPES, Platform::lp64());
    let err = engine
        .offset_of(ty(engine.table(), "packed_t"), "z")
        .unwrap_err();
    assert_eq!(err.to_string(), "'struct packed' has no field 'z'");
}

#[test]
fn record_query_on_scalar() {
    let engine = engine(SHAPES, Platform::lp64());
    let err = engine.record(ty(engine.table(), "long")).unwrap_err();
    assert_eq!(err.to_string(), "'long' is not a struct or union");
}

#[test]
fn record_layouts_are_cached() {
    let engine = engine(SHAPES, Platform::lp64());
    let four = ty(engine.table(), "four_t");
    let first = engine.record(four).unwrap();
    let second = engine.record(four).unwrap();
    assert!(Rc::ptr_eq(&first, &second));
}

#[test]
fn bitfields_share_storage_units() {
    let engine = engine(BITS, Platform::lp64());
    let flags = engine.record(ty(engine.table(), "flags_t")).unwrap();

    assert_eq!(flags.layout.size, 8);
    let placed: Vec<_> = flags.fields.iter().map(|f| (f.offset, f.bit_offset())).collect();
    assert_eq!(placed, [(0, 0), (0, 10), (4, 0)]);
    assert_eq!(
        flags.fields[1].bitfield,
        Some(Bitfield {
            width: 20,
            shift: 10,
            unit: 4,
            signed: true,
        })
    );
}

#[test]
fn msb_first_bit_order() {
    let platform = Platform {
        bit_order: BitOrder::MsbFirst,
        ..Platform::lp64()
    };
    let engine = engine(BITS, platform);
    let flags = engine.record(ty(engine.table(), "flags_t")).unwrap();

    let placed: Vec<_> = flags.fields.iter().map(|f| (f.offset, f.bit_offset())).collect();
    assert_eq!(placed, [(0, 22), (0, 2), (4, 29)]);
}

#[test]
fn zero_width_bitfield_closes_unit() {
    let engine = engine(BITS, Platform::lp64());
    let split = engine.record(ty(engine.table(), "split_t")).unwrap();

    assert_eq!(split.fields.len(), 2);
    assert_eq!(split.field("b").unwrap().offset, 4);
    assert!(!split.field("b").unwrap().bitfield.unwrap().signed);
    assert_eq!(split.layout.size, 8);
}

#[test]
fn bitfield_after_plain_member() {
    let engine = engine(BITS, Platform::lp64());
    let tail = engine.record(ty(engine.table(), "tail_t")).unwrap();

    let b = tail.field("b").unwrap();
    assert_eq!((b.offset, b.bit_offset(), b.bit_width()), (0, 8, Some(4)));
    assert_eq!(tail.layout, Layout { size: 4, align: 4 });
}

#[test]
fn bitfield_has_no_byte_offset() {
    let engine = engine(BITS, Platform::lp64());
    let err = engine
        .offset_of(ty(engine.table(), "flags_t"), "a")
        .unwrap_err();
    assert_eq!(err.to_string(), "bitfield 'a' has no byte offset");
}

#[test]
fn bitfield_width_checked_per_platform() {
    let lp64 = engine(BITS, Platform::lp64());
    assert_eq!(lp64.size_of(ty(lp64.table(), "wide_t")).unwrap(), 8);

    let ilp32 = engine(BITS, Platform::ilp32());
    let err = ilp32.size_of(ty(ilp32.table(), "wide_t")).unwrap_err();
    assert_eq!(
        err.to_string(),
        "bitfield 'x' is 40 bits wide, wider than 'long'"
    );
}

#[test]
fn flexible_array_member_adds_no_size() {
    let engine = engine(
        indoc! {r#"
            { "declarations": [
              { "kind": "typedef", "name": "buf_t",
                "type": { "struct": { "name": "buf", "fields": [
                    { "name": "n", "type": { "primitive": "int" } },
                    { "name": "data", "type": { "array": { "element": { "primitive": "char" } } } }
                ] } } }
            ]}
        "#},
        Platform::lp64(),
    );
    let buf = ty(engine.table(), "buf_t");
    let record = engine.record(buf).unwrap();
    assert_eq!(record.field("data").unwrap().offset, 4);
    assert_eq!(record.layout.size, 4);
}

#[test]
fn nested_record_alignment() {
    let engine = engine(
        indoc! {r#"
            { "declarations": [
              { "kind": "typedef", "name": "outer_t",
                "type": { "struct": { "name": "outer", "fields": [
                    { "name": "c", "type": { "primitive": "char" } },
                    { "name": "in", "type": { "struct": { "name": "inner", "fields": [
                        { "name": "s", "type": { "primitive": "short" } },
                        { "name": "i", "type": { "primitive": "int" } }
                    ] } } }
                ] } } }
            ]}
        "#},
        Platform::lp64(),
    );
    let outer = ty(engine.table(), "outer_t");
    assert_eq!(engine.offset_of(outer, "in").unwrap(), 4);
    assert_eq!(engine.layout(outer).unwrap(), Layout { size: 12, align: 4 });
}

#[test]
fn int_then_two_shorts() {
    let engine = engine(
        indoc! {r#"
            { "declarations": [
              { "kind": "typedef", "name": "trio_t",
                "type": { "struct": { "name": "trio", "fields": [
                    { "name": "a", "type": { "primitive": "int" } },
                    { "name": "b", "type": { "primitive": "short" } },
                    { "name": "c", "type": { "primitive": "short" } }
                ] } } }
            ]}
        "#},
        Platform::lp64(),
    );
    let trio = ty(engine.table(), "trio_t");
    assert_eq!(engine.layout(trio).unwrap(), Layout { size: 8, align: 4 });
    assert_eq!(engine.offset_of(trio, "b").unwrap(), 4);
    assert_eq!(engine.offset_of(trio, "c").unwrap(), 6);
}

#[test]
fn oversized_member_is_too_large() {
    let engine = engine(
        indoc! {r#"
            { "declarations": [
              { "kind": "typedef", "name": "huge_t",
                "type": { "struct": { "name": "huge", "fields": [
                    { "name": "tag", "type": { "primitive": "char" } },
                    { "name": "data", "type": { "array": {
                        "element": { "array": { "element": { "primitive": "char" },
                                                "length": 4194304 } },
                        "length": 1099511627776 } } }
                ] } } }
            ]}
        "#},
        Platform::lp64(),
    );
    let huge = ty(engine.table(), "huge_t");
    let err = engine.size_of(huge).unwrap_err();
    assert!(matches!(err, LayoutError::TooLarge(_)));
    assert_eq!(err.to_string(), "'struct huge' is too large");
}

#[test]
fn reloaded_table_lays_out_the_same() {
    for json in [SHAPES, BITS] {
        let compiled = table_from_json(json);
        let bytes = cshape_compiler::emit(&compiled).unwrap();
        let reloaded = Arc::new(TypeTable::from_bytes(&bytes).unwrap());

        for platform in [Platform::lp64(), Platform::ilp32(), Platform::llp64()] {
            let before = LayoutEngine::new(Arc::clone(&compiled), platform.clone());
            let after = LayoutEngine::new(Arc::clone(&reloaded), platform);

            for root in compiled.roots() {
                assert_eq!(
                    before.layout(root.ty).ok(),
                    after.layout(root.ty).ok(),
                    "root '{}'",
                    compiled.string(root.name)
                );
            }
            for def in compiled.structs() {
                assert_eq!(before.record(def.record).ok(), after.record(def.record).ok());
            }
        }
    }
}
