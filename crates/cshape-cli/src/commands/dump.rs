use std::path::PathBuf;

use cshape_core::Colors;

use super::{CliError, load_table};

pub struct DumpArgs {
    pub input: PathBuf,
    pub color: bool,
}

pub fn run(args: DumpArgs) -> Result<(), CliError> {
    let table = load_table(&args.input)?;
    print!("{}", cshape_table::dump(&table, Colors::new(args.color)));
    Ok(())
}
