//! `cshape layout`: sizes, alignments and field offsets of a table's types
//! on one platform.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cshape_core::{BitOrder, Colors, Endian, Platform};
use cshape_table::{RootDef, StructDef};
use cshape_vm::{FieldLayout, LayoutEngine};

use super::{CliError, load_table, read_file};

pub struct LayoutArgs {
    pub input: PathBuf,
    pub platform: String,
    pub color: bool,
}

pub fn run(args: LayoutArgs) -> Result<(), CliError> {
    let platform = resolve_platform(&args.platform)?;
    let table = Arc::new(load_table(&args.input)?);
    let engine = LayoutEngine::new(table, platform);
    print!("{}", render(&engine, Colors::new(args.color)));
    Ok(())
}

/// A preset name, or a path to a JSON platform description.
pub fn resolve_platform(spec: &str) -> Result<Platform, CliError> {
    if let Some(platform) = Platform::preset(spec) {
        return Ok(platform);
    }
    let path = Path::new(spec);
    if !path.is_file() {
        return Err(CliError::UnknownPlatform(spec.to_owned()));
    }
    let bytes = read_file(path)?;
    let platform = Platform::from_json(&String::from_utf8_lossy(&bytes))?;
    tracing::debug!(platform = %platform.name, "platform loaded");
    Ok(platform)
}

pub fn render(engine: &LayoutEngine, c: Colors) -> String {
    let sections = [
        render_platform(engine.platform(), c),
        render_records(engine, c),
        render_roots(engine, c),
    ];
    sections.join("\n")
}

fn render_platform(platform: &Platform, c: Colors) -> String {
    let endian = match platform.endian {
        Endian::Little => "little-endian",
        Endian::Big => "big-endian",
    };
    let bits = match platform.bit_order {
        BitOrder::LsbFirst => "lsb-first",
        BitOrder::MsbFirst => "msb-first",
    };
    let mut out = String::new();
    writeln!(out, "{}", c.header("platform")).unwrap();
    writeln!(
        out,
        "{}: {endian}, {bits} bitfields, {}-byte pointers",
        c.name(&platform.name),
        platform.pointer.size
    )
    .unwrap();
    out
}

fn render_records(engine: &LayoutEngine, c: Colors) -> String {
    let table = engine.table();
    let mut out = String::new();
    writeln!(out, "{}", c.header("records")).unwrap();
    for def in table.structs() {
        render_record(&mut out, engine, def, c);
    }
    out
}

fn render_record(out: &mut String, engine: &LayoutEngine, def: &StructDef, c: Colors) {
    let name = c.name(&engine.name(def.record));
    if def.is_opaque() {
        writeln!(out, "{name}: incomplete").unwrap();
        return;
    }
    let record = match engine.record(def.record) {
        Ok(record) => record,
        Err(e) => {
            writeln!(out, "{name}: {e}").unwrap();
            return;
        }
    };
    writeln!(
        out,
        "{name}: size {}, align {}",
        record.layout.size, record.layout.align
    )
    .unwrap();
    for field in &record.fields {
        writeln!(out, "  {}", field_line(engine, field, c)).unwrap();
    }
}

fn field_line(engine: &LayoutEngine, field: &FieldLayout, c: Colors) -> String {
    let name = if field.name.is_empty() {
        "<unnamed>"
    } else {
        &field.name
    };
    let ty = engine.name(field.ty);
    let offset = format!("{}+{}{}", c.dim, field.offset, c.reset);
    match field.bitfield {
        Some(bits) => format!(
            "{name} {offset} {ty}:{} (bit {} of {}-byte unit)",
            bits.width, bits.shift, bits.unit
        ),
        None => format!("{name} {offset} {ty}"),
    }
}

fn render_roots(engine: &LayoutEngine, c: Colors) -> String {
    let mut out = String::new();
    writeln!(out, "{}", c.header("roots")).unwrap();
    for root in engine.table().roots() {
        writeln!(out, "{}", root_line(engine, root, c)).unwrap();
    }
    out
}

fn root_line(engine: &LayoutEngine, root: &RootDef, c: Colors) -> String {
    let table = engine.table();
    let name = c.name(table.string(root.name));
    let ty = engine.name(root.ty);
    let placement = match engine.layout(root.ty) {
        Ok(layout) => format!("size {}, align {}", layout.size, layout.align),
        Err(_) => "-".to_owned(),
    };
    format!("{} {name}: {ty} ({placement})", root.kind.as_str())
}
