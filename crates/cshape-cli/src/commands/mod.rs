pub mod compile;
pub mod dump;
pub mod layout;

#[cfg(test)]
mod layout_tests;

use std::io;
use std::path::{Path, PathBuf};

use cshape_compiler::CompileError;
use cshape_core::{GraphError, PlatformError, TypeGraph, parse_declarations};
use cshape_table::{TableError, TypeTable};

/// Errors reported by CLI commands.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("cannot read '{}': {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("cannot write '{}': {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("malformed declaration file: {0}")]
    Declarations(#[from] serde_json::Error),

    #[error("unknown platform '{0}' (expected lp64, ilp32, llp64 or a .json file)")]
    UnknownPlatform(String),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Platform(#[from] PlatformError),
}

pub fn read_file(path: &Path) -> Result<Vec<u8>, CliError> {
    std::fs::read(path).map_err(|source| CliError::Read {
        path: path.to_owned(),
        source,
    })
}

/// Compile declaration JSON into a validated table.
pub fn compile_declarations(json: &str) -> Result<TypeTable, CliError> {
    let tree = parse_declarations(json)?;
    let graph = TypeGraph::from_tree(&tree)?;
    Ok(cshape_compiler::compile(&graph)?)
}

/// A table from a `.json` declaration file, compiled in memory, or from a
/// table file.
pub fn load_table(path: &Path) -> Result<TypeTable, CliError> {
    let bytes = read_file(path)?;
    if path.extension().is_some_and(|ext| ext == "json") {
        let json = String::from_utf8_lossy(&bytes);
        return compile_declarations(&json);
    }
    Ok(TypeTable::from_bytes(&bytes)?)
}
