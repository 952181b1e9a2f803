use cshape_core::PrimitiveKind;

use crate::{StringId, StructDef, TableParts, TypeIndex, TypeOp, TypeTable};

fn prim(kind: PrimitiveKind) -> TypeOp {
    TypeOp::Primitive(kind)
}

fn name(ops: Vec<TypeOp>, ty: u32) -> String {
    let table = TypeTable::from_parts(TableParts {
        strings: vec![String::new()],
        ops,
        ..Default::default()
    })
    .unwrap();
    table.type_name(TypeIndex(ty)).unwrap()
}

#[test]
fn pointers_and_arrays() {
    let ops = vec![
        prim(PrimitiveKind::Int),
        TypeOp::Pointer(TypeIndex(0)),
        TypeOp::Array(TypeIndex(1)),
        TypeOp::Length(3),
        TypeOp::Array(TypeIndex(2)),
        TypeOp::Length(2),
        TypeOp::Pointer(TypeIndex(1)),
    ];
    assert_eq!(name(ops.clone(), 1), "int *");
    assert_eq!(name(ops.clone(), 4), "int *[2][3]");
    assert_eq!(name(ops, 6), "int **");
}

#[test]
fn pointer_to_array() {
    let ops = vec![
        prim(PrimitiveKind::Int),
        TypeOp::Array(TypeIndex(0)),
        TypeOp::Length(4),
        TypeOp::Pointer(TypeIndex(1)),
        TypeOp::OpenArray(TypeIndex(0)),
    ];
    assert_eq!(name(ops.clone(), 3), "int(*)[4]");
    assert_eq!(name(ops, 4), "int[]");
}

#[test]
fn function_types() {
    let ops = vec![
        prim(PrimitiveKind::Int),
        prim(PrimitiveKind::Long),
        TypeOp::Function(TypeIndex(0)),
        prim(PrimitiveKind::Long),
        TypeOp::FunctionEnd { variadic: false },
        TypeOp::Pointer(TypeIndex(2)),
    ];
    assert_eq!(name(ops.clone(), 2), "int(long)");
    assert_eq!(name(ops, 5), "int(*)(long)");
}

#[test]
fn variadic_and_empty_parameter_lists() {
    let ops = vec![
        prim(PrimitiveKind::Int),
        prim(PrimitiveKind::Char),
        TypeOp::Pointer(TypeIndex(1)),
        TypeOp::Function(TypeIndex(0)),
        TypeOp::Pointer(TypeIndex(1)),
        TypeOp::FunctionEnd { variadic: true },
        prim(PrimitiveKind::Void),
        TypeOp::Function(TypeIndex(6)),
        TypeOp::FunctionEnd { variadic: false },
    ];
    assert_eq!(name(ops.clone(), 3), "int(char *, ...)");
    assert_eq!(name(ops, 7), "void()");
}

#[test]
fn records_by_name_or_index() {
    let table = TypeTable::from_parts(TableParts {
        strings: vec![String::new(), "u".to_owned()],
        ops: vec![
            TypeOp::StructUnion(0),
            TypeOp::Pointer(TypeIndex(0)),
            TypeOp::StructUnion(1),
            TypeOp::OpenArray(TypeIndex(2)),
        ],
        structs: vec![
            StructDef {
                name: StringId::EMPTY,
                record: TypeIndex(0),
                first_field: 0,
                field_count: 0,
                flags: 0,
            },
            StructDef {
                name: StringId(1),
                record: TypeIndex(2),
                first_field: 0,
                field_count: 0,
                flags: StructDef::UNION | StructDef::OPAQUE,
            },
        ],
        ..Default::default()
    })
    .unwrap();

    assert_eq!(table.type_name(TypeIndex(1)).unwrap(), "struct $0 *");
    assert_eq!(table.type_name(TypeIndex(3)).unwrap(), "union u[]");
}
