//! Dispatch logic: extract params from ArgMatches and convert to command args.

use std::path::PathBuf;

use clap::ArgMatches;

use super::ColorChoice;
use crate::commands::compile::CompileArgs;
use crate::commands::dump::DumpArgs;
use crate::commands::layout::LayoutArgs;

pub struct CompileParams {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
}

impl CompileParams {
    pub fn from_matches(m: &ArgMatches) -> Self {
        Self {
            input: input(m),
            output: m.get_one::<PathBuf>("output").cloned(),
        }
    }
}

impl From<CompileParams> for CompileArgs {
    fn from(p: CompileParams) -> Self {
        let output = p
            .output
            .unwrap_or_else(|| p.input.with_extension("ctab"));
        Self {
            input: p.input,
            output,
        }
    }
}

pub struct DumpParams {
    pub input: PathBuf,
    pub color: ColorChoice,
}

impl DumpParams {
    pub fn from_matches(m: &ArgMatches) -> Self {
        Self {
            input: input(m),
            color: parse_color(m),
        }
    }
}

impl From<DumpParams> for DumpArgs {
    fn from(p: DumpParams) -> Self {
        Self {
            input: p.input,
            color: p.color.should_colorize(),
        }
    }
}

pub struct LayoutParams {
    pub input: PathBuf,
    pub platform: String,
    pub color: ColorChoice,
}

impl LayoutParams {
    pub fn from_matches(m: &ArgMatches) -> Self {
        Self {
            input: input(m),
            platform: m
                .get_one::<String>("platform")
                .cloned()
                .unwrap_or_else(|| "lp64".to_owned()),
            color: parse_color(m),
        }
    }
}

impl From<LayoutParams> for LayoutArgs {
    fn from(p: LayoutParams) -> Self {
        Self {
            input: p.input,
            platform: p.platform,
            color: p.color.should_colorize(),
        }
    }
}

/// `input` is required, so clap has rejected the command line without it.
fn input(m: &ArgMatches) -> PathBuf {
    m.get_one::<PathBuf>("input").cloned().unwrap_or_default()
}

fn parse_color(m: &ArgMatches) -> ColorChoice {
    match m.get_one::<String>("color").map(|s| s.as_str()) {
        Some("always") => ColorChoice::Always,
        Some("never") => ColorChoice::Never,
        _ => ColorChoice::Auto,
    }
}
