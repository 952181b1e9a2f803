use std::path::PathBuf;

use super::{CliError, compile_declarations, read_file};

pub struct CompileArgs {
    pub input: PathBuf,
    pub output: PathBuf,
}

pub fn run(args: CompileArgs) -> Result<(), CliError> {
    let bytes = read_file(&args.input)?;
    let table = compile_declarations(&String::from_utf8_lossy(&bytes))?;
    let encoded = cshape_compiler::emit(&table)?;

    std::fs::write(&args.output, &encoded).map_err(|source| CliError::Write {
        path: args.output.clone(),
        source,
    })?;
    tracing::info!(
        output = %args.output.display(),
        records = table.len(),
        bytes = encoded.len(),
        "table written"
    );
    Ok(())
}
