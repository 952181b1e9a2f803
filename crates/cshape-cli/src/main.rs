mod cli;
mod commands;

use cli::{CompileParams, DumpParams, LayoutParams, build_cli};

fn main() {
    init_tracing();
    let matches = build_cli().get_matches();

    let result = match matches.subcommand() {
        Some(("compile", m)) => {
            let params = CompileParams::from_matches(m);
            commands::compile::run(params.into())
        }
        Some(("dump", m)) => {
            let params = DumpParams::from_matches(m);
            commands::dump::run(params.into())
        }
        Some(("layout", m)) => {
            let params = LayoutParams::from_matches(m);
            commands::layout::run(params.into())
        }
        _ => unreachable!("clap should have caught this"),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

/// Library events go to stderr, filtered by `RUST_LOG`. Nothing is
/// installed when it is unset.
fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    if std::env::var_os("RUST_LOG").is_none() {
        return;
    }
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .with(EnvFilter::from_default_env())
        .init();
}
