use cshape_core::{Colors, PrimitiveKind};

use crate::{
    EnumDef, EnumMemberDef, FieldDef, RootDef, RootKind, StringId, StructDef, TableParts,
    TypeIndex, TypeOp, TypeTable, dump,
};

fn sample() -> TypeTable {
    let strings = ["", "point", "x", "y", "color", "RED", "GREEN", "origin", "LIMIT"];
    TypeTable::from_parts(TableParts {
        strings: strings.iter().map(|s| (*s).to_owned()).collect(),
        ops: vec![
            TypeOp::Primitive(PrimitiveKind::Int),
            TypeOp::StructUnion(0),
            TypeOp::Enum(0),
            TypeOp::Pointer(TypeIndex(1)),
        ],
        structs: vec![StructDef {
            name: StringId(1),
            record: TypeIndex(1),
            first_field: 0,
            field_count: 2,
            flags: 0,
        }],
        fields: vec![
            FieldDef {
                name: StringId(2),
                ty: TypeIndex(0),
                bit_width: None,
            },
            FieldDef {
                name: StringId(3),
                ty: TypeIndex(0),
                bit_width: Some(4),
            },
        ],
        enums: vec![EnumDef {
            name: StringId(4),
            record: TypeIndex(2),
            underlying: PrimitiveKind::UInt,
            first_member: 0,
            member_count: 2,
        }],
        members: vec![
            EnumMemberDef {
                name: StringId(5),
                value: 0,
            },
            EnumMemberDef {
                name: StringId(6),
                value: 1,
            },
        ],
        roots: vec![
            RootDef {
                name: StringId(7),
                kind: RootKind::Variable,
                ty: TypeIndex(3),
                value: None,
            },
            RootDef {
                name: StringId(8),
                kind: RootKind::Constant,
                ty: TypeIndex(0),
                value: Some(10),
            },
        ],
    })
    .unwrap()
}

#[test]
fn dump_all_sections() {
    insta::assert_snapshot!(dump(&sample(), Colors::OFF), @r#"
    [strings]
    S0 ""
    S1 "point"
    S2 "x"
    S3 "y"
    S4 "color"
    S5 "RED"
    S6 "GREEN"
    S7 "origin"
    S8 "LIMIT"

    [records]
    0 (PRIMITIVE 7)  ; int
    1 (STRUCT_UNION 0)  ; struct point
    2 (ENUM 0)  ; enum color
    3 (POINTER 1)  ; struct point *

    [structs]
    struct point @1
      x: int
      y: int : 4

    [enums]
    enum color: unsigned int @2
      RED = 0
      GREEN = 1

    [roots]
    variable origin: struct point *
    constant LIMIT: int = 10
    "#);
}

#[test]
fn dump_with_colors() {
    let out = dump(&sample(), Colors::ON);
    assert!(out.starts_with("\x1b[34m[strings]\x1b[0m\n"));
    assert!(out.contains("\x1b[32morigin\x1b[0m"));
}
