//! Shared argument builders for CLI commands.
//!
//! Each function returns a `clap::Arg` that can be composed into commands.

use std::path::PathBuf;

use clap::{Arg, value_parser};

/// Declaration file or table file (positional).
pub fn input_arg() -> Arg {
    Arg::new("input")
        .value_name("FILE")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Declaration file (.json) or type table (.ctab)")
}

/// Declaration file to compile (positional).
pub fn declarations_arg() -> Arg {
    Arg::new("input")
        .value_name("DECLS")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("JSON declaration file")
}

/// Write output to file (-o/--output).
pub fn output_file_arg() -> Arg {
    Arg::new("output")
        .short('o')
        .long("output")
        .value_name("FILE")
        .value_parser(value_parser!(PathBuf))
        .help("Table file to write (default: input with .ctab extension)")
}

/// Color output control (--color).
pub fn color_arg() -> Arg {
    Arg::new("color")
        .long("color")
        .value_name("WHEN")
        .default_value("auto")
        .value_parser(["auto", "always", "never"])
        .help("Colorize output")
}

/// Target platform (-p/--platform).
pub fn platform_arg() -> Arg {
    Arg::new("platform")
        .short('p')
        .long("platform")
        .value_name("PLATFORM")
        .default_value("lp64")
        .help("Preset (lp64, ilp32, llp64) or a JSON platform description")
}
