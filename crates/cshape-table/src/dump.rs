//! Human-readable table dump for debugging.

use std::fmt::Write as _;

use cshape_core::Colors;

use crate::record::{TypeIndex, TypeOp};
use crate::sections::{RootDef, StructDef};
use crate::table::TypeTable;

/// Render every section of `table`. Type records carry their C spelling as a
/// trailing comment.
pub fn dump(table: &TypeTable, colors: Colors) -> String {
    let sections = [
        dump_strings(table, colors),
        dump_records(table, colors),
        dump_structs(table, colors),
        dump_enums(table, colors),
        dump_roots(table, colors),
    ];
    sections.join("\n")
}

fn width_for_count(count: usize) -> usize {
    if count <= 1 {
        1
    } else {
        ((count - 1) as f64).log10().floor() as usize + 1
    }
}

fn name_of(table: &TypeTable, ty: TypeIndex) -> String {
    table
        .type_name(ty)
        .unwrap_or_else(|_| format!("<invalid {ty}>"))
}

fn dump_strings(table: &TypeTable, c: Colors) -> String {
    let mut out = String::new();
    let w = width_for_count(table.strings().len());
    writeln!(out, "{}", c.header("strings")).unwrap();
    for (i, s) in table.strings().iter().enumerate() {
        writeln!(out, "S{i:0w$} {}{s:?}{}", c.green, c.reset).unwrap();
    }
    out
}

fn dump_records(table: &TypeTable, c: Colors) -> String {
    let mut out = String::new();
    let w = width_for_count(table.len());
    writeln!(out, "{}", c.header("records")).unwrap();
    for (i, op) in table.ops().iter().enumerate() {
        let ty = TypeIndex(i as u32);
        write!(out, "{i:0w$} {op}").unwrap();
        match op {
            TypeOp::Length(_) | TypeOp::FunctionEnd { .. } => {}
            _ => write!(out, "  {}; {}{}", c.dim, name_of(table, ty), c.reset).unwrap(),
        }
        out.push('\n');
    }
    out
}

fn record_heading(table: &TypeTable, index: usize, def: &StructDef) -> String {
    let keyword = if def.is_union() { "union" } else { "struct" };
    let name = if def.name.is_empty() {
        format!("${index}")
    } else {
        table.string(def.name).to_owned()
    };
    format!("{keyword} {name}")
}

fn dump_structs(table: &TypeTable, c: Colors) -> String {
    let mut out = String::new();
    writeln!(out, "{}", c.header("structs")).unwrap();
    for (i, def) in table.structs().iter().enumerate() {
        let heading = record_heading(table, i, def);
        if def.is_opaque() {
            writeln!(out, "{heading} {}(opaque){}", c.dim, c.reset).unwrap();
            continue;
        }
        writeln!(out, "{heading} {}@{}{}", c.dim, def.record, c.reset).unwrap();
        for field in table.fields_of(def) {
            let name = c.name(table.string(field.name));
            let ty = name_of(table, field.ty);
            match field.bit_width {
                Some(bits) => writeln!(out, "  {name}: {ty} : {bits}").unwrap(),
                None => writeln!(out, "  {name}: {ty}").unwrap(),
            }
        }
    }
    out
}

fn dump_enums(table: &TypeTable, c: Colors) -> String {
    let mut out = String::new();
    writeln!(out, "{}", c.header("enums")).unwrap();
    for (i, def) in table.enums().iter().enumerate() {
        let name = if def.name.is_empty() {
            format!("${i}")
        } else {
            table.string(def.name).to_owned()
        };
        writeln!(
            out,
            "enum {name}: {} {}@{}{}",
            def.underlying, c.dim, def.record, c.reset
        )
        .unwrap();
        for member in table.members_of(def) {
            let name = c.name(table.string(member.name));
            writeln!(out, "  {name} = {}", member.value).unwrap();
        }
    }
    out
}

fn dump_roots(table: &TypeTable, c: Colors) -> String {
    let mut out = String::new();
    writeln!(out, "{}", c.header("roots")).unwrap();
    for root in table.roots() {
        writeln!(out, "{}", root_line(table, root, c)).unwrap();
    }
    out
}

fn root_line(table: &TypeTable, root: &RootDef, c: Colors) -> String {
    let name = c.name(table.string(root.name));
    let ty = name_of(table, root.ty);
    match root.value {
        Some(value) => format!("{} {name}: {ty} = {value}", root.kind.as_str()),
        None => format!("{} {name}: {ty}", root.kind.as_str()),
    }
}
