//! Command builders for the CLI.

use clap::Command;

use super::args::*;

/// Build the complete CLI with all subcommands.
pub fn build_cli() -> Command {
    Command::new("cshape")
        .about("Compile C declarations into type tables and inspect their layout")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(compile_command())
        .subcommand(dump_command())
        .subcommand(layout_command())
}

/// Compile a declaration file into a table file.
pub fn compile_command() -> Command {
    Command::new("compile")
        .about("Compile a JSON declaration file into a type table")
        .override_usage("  cshape compile <DECLS> [-o <FILE>]")
        .after_help(
            r#"EXAMPLES:
  cshape compile api.json              # writes api.ctab
  cshape compile api.json -o out.ctab  # explicit output"#,
        )
        .arg(declarations_arg())
        .arg(output_file_arg())
}

/// Show the records of a table.
pub fn dump_command() -> Command {
    Command::new("dump")
        .about("Show the records and side tables of a type table")
        .override_usage("  cshape dump <FILE> [--color <WHEN>]")
        .after_help(
            r#"EXAMPLES:
  cshape dump api.ctab                 # compiled table
  cshape dump api.json                 # compile in memory, then dump"#,
        )
        .arg(input_arg())
        .arg(color_arg())
}

/// Show sizes, alignments and field offsets for one platform.
pub fn layout_command() -> Command {
    Command::new("layout")
        .about("Show sizes, alignments and field offsets on a platform")
        .override_usage("  cshape layout <FILE> [--platform <PLATFORM>]")
        .after_help(
            r#"EXAMPLES:
  cshape layout api.ctab               # lp64
  cshape layout api.ctab -p ilp32      # 32-bit preset
  cshape layout api.json -p arm.json   # custom platform"#,
        )
        .arg(input_arg())
        .arg(platform_arg())
        .arg(color_arg())
}
