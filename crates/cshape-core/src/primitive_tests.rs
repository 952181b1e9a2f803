use super::*;

#[test]
fn discriminants_match_position() {
    for (i, kind) in PrimitiveKind::ALL.iter().enumerate() {
        assert_eq!(kind.id() as usize, i);
        assert_eq!(PrimitiveKind::from_u8(i as u8), Some(*kind));
    }
    assert_eq!(PrimitiveKind::from_u8(30), None);
}

#[test]
fn well_known_ids() {
    assert_eq!(PrimitiveKind::Int.id(), 7);
    assert_eq!(PrimitiveKind::Float.id(), 13);
    assert_eq!(PrimitiveKind::Double.id(), 14);
    assert_eq!(PrimitiveKind::Int32.id(), 21);
}

#[test]
fn c_names_roundtrip() {
    for kind in PrimitiveKind::ALL {
        assert_eq!(PrimitiveKind::from_c_name(kind.c_name()), Some(kind));
    }
}

#[test]
fn long_hand_aliases() {
    assert_eq!(
        PrimitiveKind::from_c_name("unsigned"),
        Some(PrimitiveKind::UInt)
    );
    assert_eq!(
        PrimitiveKind::from_c_name("long   long int"),
        Some(PrimitiveKind::LongLong)
    );
    assert_eq!(
        PrimitiveKind::from_c_name("short int"),
        Some(PrimitiveKind::Short)
    );
    assert_eq!(PrimitiveKind::from_c_name("quad"), None);
}

#[test]
fn classes() {
    assert_eq!(PrimitiveKind::Char.class(), PrimitiveClass::Char);
    assert_eq!(PrimitiveKind::UChar.class(), PrimitiveClass::Integer);
    assert!(PrimitiveKind::LongDouble.is_float());
    assert!(PrimitiveKind::Bool.is_integral());
    assert!(!PrimitiveKind::Double.is_integral());
}

#[test]
fn signedness() {
    assert!(PrimitiveKind::Int.is_signed(false, false));
    assert!(!PrimitiveKind::UInt.is_signed(true, true));
    assert!(PrimitiveKind::Char.is_signed(true, false));
    assert!(!PrimitiveKind::Char.is_signed(false, false));
}

#[test]
fn serde_uses_c_spelling() {
    let kind: PrimitiveKind = serde_json::from_str("\"unsigned long long\"").unwrap();
    assert_eq!(kind, PrimitiveKind::ULongLong);
    assert_eq!(
        serde_json::to_string(&PrimitiveKind::Bool).unwrap(),
        "\"_Bool\""
    );
}
