use std::sync::Arc;

use cshape_core::{Colors, Platform};
use cshape_vm::LayoutEngine;
use indoc::indoc;

use super::compile_declarations;
use super::layout::{render, resolve_platform};
use crate::commands::CliError;

const DECLS: &str = indoc! {r#"
    { "declarations": [
      { "kind": "typedef", "name": "point_t",
        "type": { "struct": { "name": "point", "fields": [
            { "name": "x", "type": { "primitive": "int" } },
            { "name": "y", "type": { "primitive": "int" } }
        ] } } },
      { "kind": "typedef", "name": "flags_t",
        "type": { "struct": { "name": "flags", "fields": [
            { "name": "a", "type": { "primitive": "int" }, "bits": 10 },
            { "name": "b", "type": { "primitive": "int" }, "bits": 20 },
            { "name": "c", "type": { "primitive": "int" }, "bits": 3 }
        ] } } },
      { "kind": "variable", "name": "file",
        "type": { "pointer": { "struct": { "name": "FILE" } } } },
      { "kind": "function", "name": "abs",
        "type": { "function": { "result": { "primitive": "int" },
                                "params": [ { "primitive": "int" } ] } } }
    ]}
"#};

fn report(platform: Platform) -> String {
    let table = compile_declarations(DECLS).unwrap();
    render(&LayoutEngine::new(Arc::new(table), platform), Colors::OFF)
}

#[test]
fn lp64_report() {
    insta::assert_snapshot!(report(Platform::lp64()), @r"
    [platform]
    lp64: little-endian, lsb-first bitfields, 8-byte pointers

    [records]
    struct point: size 8, align 4
      x +0 int
      y +4 int
    struct flags: size 8, align 4
      a +0 int:10 (bit 0 of 4-byte unit)
      b +0 int:20 (bit 10 of 4-byte unit)
      c +4 int:3 (bit 0 of 4-byte unit)
    struct FILE: incomplete

    [roots]
    typedef point_t: struct point (size 8, align 4)
    typedef flags_t: struct flags (size 8, align 4)
    variable file: struct FILE * (size 8, align 8)
    function abs: int(int) (-)
    ");
}

#[test]
fn pointer_size_follows_platform() {
    let out = report(Platform::ilp32());
    assert!(out.contains("ilp32: little-endian, lsb-first bitfields, 4-byte pointers"));
    assert!(out.contains("variable file: struct FILE * (size 4, align 4)"));
}

#[test]
fn colored_report_wraps_headers() {
    let table = compile_declarations(DECLS).unwrap();
    let engine = LayoutEngine::new(Arc::new(table), Platform::lp64());
    let out = render(&engine, Colors::ON);
    assert!(out.starts_with("\x1b[34m[platform]\x1b[0m"));
    assert!(out.contains("\x1b[2m+4\x1b[0m"));
}

#[test]
fn presets_resolve_by_name() {
    assert_eq!(resolve_platform("llp64").unwrap(), Platform::llp64());
}

#[test]
fn platform_from_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom.json");
    let custom = Platform {
        name: "custom".to_owned(),
        ..Platform::ilp32()
    };
    std::fs::write(&path, serde_json::to_string(&custom).unwrap()).unwrap();

    let loaded = resolve_platform(path.to_str().unwrap()).unwrap();
    assert_eq!(loaded, custom);
}

#[test]
fn unknown_platform() {
    let err = resolve_platform("pdp11").unwrap_err();
    assert!(matches!(err, CliError::UnknownPlatform(_)));
    assert_eq!(
        err.to_string(),
        "unknown platform 'pdp11' (expected lp64, ilp32, llp64 or a .json file)"
    );
}
