use cshape_core::PrimitiveKind;

use super::record::*;
use crate::TableError;

#[test]
fn display_matches_mnemonics() {
    assert_eq!(
        TypeOp::Primitive(PrimitiveKind::Double).to_string(),
        "(PRIMITIVE 14)"
    );
    assert_eq!(TypeOp::Length(100).to_string(), "(None 100)");
    assert_eq!(
        TypeOp::FunctionEnd { variadic: true }.to_string(),
        "(FUNCTION_END 1)"
    );
    assert_eq!(TypeOp::Noop(TypeIndex(2)).to_string(), "(NOOP 2)");
}

#[test]
fn encoding_layout() {
    let bytes = TypeOp::Pointer(TypeIndex(0x0102)).to_bytes();
    assert_eq!(bytes, [3, 0x02, 0x01, 0, 0, 0, 0, 0]);

    let decoded = TypeOp::from_bytes(bytes, 0).unwrap();
    assert_eq!(decoded, TypeOp::Pointer(TypeIndex(0x0102)));
}

#[test]
fn large_lengths_survive() {
    let op = TypeOp::Length(MAX_OPERAND);
    assert_eq!(TypeOp::from_bytes(op.to_bytes(), 0).unwrap(), op);
}

#[test]
fn rejects_unknown_opcode() {
    let err = TypeOp::from_bytes([2, 0, 0, 0, 0, 0, 0, 0], 4).unwrap_err();
    assert!(matches!(err, TableError::UnknownOpcode { at: 4, opcode: 2 }));
}

#[test]
fn rejects_unknown_primitive() {
    let err = TypeOp::from_bytes([1, 99, 0, 0, 0, 0, 0, 0], 0).unwrap_err();
    assert!(matches!(err, TableError::UnknownPrimitive { id: 99, .. }));
}

#[test]
fn rejects_wide_index() {
    let raw = (5u64 << 40) << 8 | 3;
    let err = TypeOp::from_bytes(raw.to_le_bytes(), 1).unwrap_err();
    assert!(matches!(err, TableError::IndexOutOfRange { at: 1, .. }));
}

#[test]
fn rejects_unknown_end_flags() {
    let err = TypeOp::from_bytes([15, 2, 0, 0, 0, 0, 0, 0], 0).unwrap_err();
    assert!(matches!(err, TableError::MalformedFunction { .. }));
}

#[test]
fn type_records() {
    assert!(TypeOp::Noop(TypeIndex(0)).is_type());
    assert!(!TypeOp::Length(3).is_type());
    assert!(!TypeOp::FunctionEnd { variadic: false }.is_type());
    assert_eq!(TypeOp::Enum(3).reference(), None);
    assert_eq!(
        TypeOp::Function(TypeIndex(7)).reference(),
        Some(TypeIndex(7))
    );
}
