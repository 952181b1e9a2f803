//! Tests for CLI dispatch logic.

use std::path::PathBuf;

use super::*;
use crate::cli::commands::{compile_command, dump_command, layout_command};
use crate::commands::compile::CompileArgs;
use crate::commands::dump::DumpArgs;
use crate::commands::layout::LayoutArgs;

#[test]
fn compile_output_defaults_next_to_input() {
    let m = compile_command()
        .try_get_matches_from(["compile", "decls/libc.json"])
        .unwrap();
    let args: CompileArgs = CompileParams::from_matches(&m).into();

    assert_eq!(args.input, PathBuf::from("decls/libc.json"));
    assert_eq!(args.output, PathBuf::from("decls/libc.ctab"));
}

#[test]
fn compile_explicit_output() {
    let m = compile_command()
        .try_get_matches_from(["compile", "libc.json", "-o", "out/types.ctab"])
        .unwrap();
    let args: CompileArgs = CompileParams::from_matches(&m).into();
    assert_eq!(args.output, PathBuf::from("out/types.ctab"));
}

#[test]
fn compile_requires_input() {
    let result = compile_command().try_get_matches_from(["compile"]);
    assert!(result.is_err());
}

#[test]
fn dump_color_modes() {
    let m = dump_command()
        .try_get_matches_from(["dump", "types.ctab", "--color", "always"])
        .unwrap();
    let args: DumpArgs = DumpParams::from_matches(&m).into();
    assert_eq!(args.input, PathBuf::from("types.ctab"));
    assert!(args.color);

    let m = dump_command()
        .try_get_matches_from(["dump", "types.ctab", "--color", "never"])
        .unwrap();
    let params = DumpParams::from_matches(&m);
    assert_eq!(params.color, ColorChoice::Never);
    assert!(!DumpArgs::from(params).color);
}

#[test]
fn dump_color_defaults_to_auto() {
    let m = dump_command()
        .try_get_matches_from(["dump", "types.ctab"])
        .unwrap();
    assert_eq!(DumpParams::from_matches(&m).color, ColorChoice::Auto);
}

#[test]
fn dump_rejects_unknown_color() {
    let result = dump_command().try_get_matches_from(["dump", "types.ctab", "--color", "rainbow"]);
    assert!(result.is_err());
}

#[test]
fn layout_platform_defaults_to_lp64() {
    let m = layout_command()
        .try_get_matches_from(["layout", "types.ctab"])
        .unwrap();
    let args: LayoutArgs = LayoutParams::from_matches(&m).into();
    assert_eq!(args.platform, "lp64");
}

#[test]
fn layout_platform_flag() {
    let m = layout_command()
        .try_get_matches_from(["layout", "types.ctab", "-p", "targets/arm.json", "--color", "never"])
        .unwrap();
    let args: LayoutArgs = LayoutParams::from_matches(&m).into();
    assert_eq!(args.platform, "targets/arm.json");
    assert!(!args.color);
}

#[test]
fn subcommand_is_required() {
    assert!(build_cli().try_get_matches_from(["cshape"]).is_err());
}

#[test]
fn help_lists_commands() {
    let help = build_cli().render_help().to_string();
    assert!(help.contains("compile"));
    assert!(help.contains("dump"));
    assert!(help.contains("layout"));
}
