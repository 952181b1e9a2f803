use cshape_core::{PrimitiveKind, RecordKind, TypeGraph};
use cshape_table::{FunctionSig, TypeIndex, TypeShape};

use crate::test_utils::{compile_ok, ops_of};
use crate::{CompileError, compile};

#[test]
fn single_argument() {
    let mut g = TypeGraph::new();
    let double = g.primitive(PrimitiveKind::Double);
    let f = g.function(double, vec![double], false);
    g.declare_function("sin", f);

    assert_eq!(
        ops_of(&g),
        "(PRIMITIVE 14)(FUNCTION 0)(PRIMITIVE 14)(FUNCTION_END 0)"
    );
}

#[test]
fn repeated_pointer_argument_becomes_noop() {
    let mut g = TypeGraph::new();
    let double = g.primitive(PrimitiveKind::Double);
    let p = g.pointer(double);
    let q = g.pointer(double);
    let f = g.function(double, vec![p, q, double], false);
    g.declare_function("sincos", f);

    let table = compile_ok(&g);
    assert_eq!(
        table.render_ops(),
        "(PRIMITIVE 14)(FUNCTION 0)(POINTER 0)(NOOP 2)(PRIMITIVE 14)(FUNCTION_END 0)"
    );
    assert_eq!(
        table.shape(TypeIndex(1)).unwrap(),
        TypeShape::Function(FunctionSig {
            result: TypeIndex(0),
            params: vec![TypeIndex(2), TypeIndex(2), TypeIndex(0)],
            variadic: false,
        })
    );
}

#[test]
fn argument_placed_in_slot_is_reused_later() {
    let mut g = TypeGraph::new();
    let int = g.primitive(PrimitiveKind::Int);
    let char_ = g.primitive(PrimitiveKind::Char);
    let s = g.pointer(char_);
    let f = g.function(int, vec![s], false);
    g.declare_function("puts", f);
    let s_again = g.pointer(char_);
    g.declare_variable("name", s_again);

    let table = compile_ok(&g);
    assert_eq!(
        table.render_ops(),
        "(PRIMITIVE 7)(PRIMITIVE 2)(FUNCTION 0)(POINTER 1)(FUNCTION_END 0)"
    );
    assert_eq!(table.root("name").unwrap().ty, TypeIndex(3));
}

#[test]
fn existing_pointer_is_referenced() {
    let mut g = TypeGraph::new();
    let int = g.primitive(PrimitiveKind::Int);
    let p = g.pointer(int);
    g.declare_variable("cursor", p);
    let f = g.function(int, vec![p], false);
    g.declare_function("deref", f);

    assert_eq!(
        ops_of(&g),
        "(PRIMITIVE 7)(POINTER 0)(FUNCTION 0)(NOOP 1)(FUNCTION_END 0)"
    );
}

#[test]
fn variadic_function() {
    let mut g = TypeGraph::new();
    let int = g.primitive(PrimitiveKind::Int);
    let char_ = g.primitive(PrimitiveKind::Char);
    let fmt = g.pointer(char_);
    let f = g.function(int, vec![fmt], true);
    g.declare_function("printf", f);

    let table = compile_ok(&g);
    assert!(table.render_ops().ends_with("(FUNCTION_END 1)"));
    let TypeShape::Function(sig) = table.shape(table.root("printf").unwrap().ty).unwrap() else {
        panic!("expected a function");
    };
    assert!(sig.variadic);
}

#[test]
fn no_arguments() {
    let mut g = TypeGraph::new();
    let void = g.primitive(PrimitiveKind::Void);
    let f = g.function(void, vec![], false);
    g.declare_function("abort", f);

    assert_eq!(ops_of(&g), "(PRIMITIVE 0)(FUNCTION 0)(FUNCTION_END 0)");
}

#[test]
fn equal_signatures_share_one_function() {
    let mut g = TypeGraph::new();
    let double = g.primitive(PrimitiveKind::Double);
    let sin = g.function(double, vec![double], false);
    let cos = g.function(double, vec![double], false);
    g.declare_function("sin", sin);
    g.declare_function("cos", cos);

    let table = compile_ok(&g);
    assert_eq!(table.len(), 4);
    assert_eq!(table.root("sin").unwrap().ty, table.root("cos").unwrap().ty);
}

#[test]
fn array_parameter_decays() {
    let mut g = TypeGraph::new();
    let int = g.primitive(PrimitiveKind::Int);
    let arr = g.array(int, Some(8));
    let void = g.primitive(PrimitiveKind::Void);
    let f = g.function(void, vec![arr], false);
    g.declare_function("fill", f);

    assert_eq!(
        ops_of(&g),
        "(PRIMITIVE 0)(PRIMITIVE 7)(FUNCTION 0)(POINTER 1)(FUNCTION_END 0)"
    );
}

#[test]
fn function_parameter_becomes_pointer() {
    let mut g = TypeGraph::new();
    let int = g.primitive(PrimitiveKind::Int);
    let callback = g.function(int, vec![int], false);
    let void = g.primitive(PrimitiveKind::Void);
    let f = g.function(void, vec![callback], false);
    g.declare_function("on_event", f);

    let table = compile_ok(&g);
    assert_eq!(
        table.render_ops(),
        "(PRIMITIVE 0)(PRIMITIVE 7)(FUNCTION 1)(PRIMITIVE 7)(FUNCTION_END 0)\
         (FUNCTION 0)(POINTER 2)(FUNCTION_END 0)"
    );
    let on_event = table.root("on_event").unwrap().ty;
    assert_eq!(table.type_name(on_event).unwrap(), "void(int(*)(int))");
}

#[test]
fn record_argument_is_referenced() {
    let mut g = TypeGraph::new();
    let int = g.primitive(PrimitiveKind::Int);
    let x = g.field("x", int);
    let point = g.define_record(RecordKind::Struct, Some("point"), vec![x]).unwrap();
    let f = g.function(int, vec![point], false);
    g.declare_function("get_x", f);

    assert_eq!(
        ops_of(&g),
        "(PRIMITIVE 7)(STRUCT_UNION 0)(FUNCTION 0)(NOOP 1)(FUNCTION_END 0)"
    );
}

#[test]
fn void_parameter() {
    let mut g = TypeGraph::new();
    let void = g.primitive(PrimitiveKind::Void);
    let f = g.function(void, vec![void], false);
    g.declare_function("f", f);

    let err = compile(&g).unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid type structure: parameter 1 has type void"
    );
}

#[test]
fn function_returning_function() {
    let mut g = TypeGraph::new();
    let int = g.primitive(PrimitiveKind::Int);
    let inner = g.function(int, vec![], false);
    let outer = g.function(inner, vec![], false);
    g.declare_function("f", outer);

    let err = compile(&g).unwrap_err();
    assert!(matches!(err, CompileError::NotAPointer(_)));
}

#[test]
fn function_returning_array() {
    let mut g = TypeGraph::new();
    let int = g.primitive(PrimitiveKind::Int);
    let arr = g.array(int, Some(2));
    let f = g.function(arr, vec![], false);
    g.declare_function("f", f);

    let err = compile(&g).unwrap_err();
    assert!(matches!(err, CompileError::ParseStructure(_)));
}
