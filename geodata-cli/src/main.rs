//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use env_logger::Env;
use geodata_cli::{Cli, CliError};

fn main() {
    let cli = match Cli::parse_args() {
        Ok(cli) => cli,
        Err(CliError::ArgumentParsing(err)) => err.exit(),
        Err(err) => fail(&err),
    };
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::init_from_env(Env::default().default_filter_or(default_filter));
    if let Err(err) = cli.run() {
        fail(&err);
    }
}

#[expect(
    clippy::print_stderr,
    reason = "the binary reports fatal errors on stderr"
)]
fn fail(err: &CliError) -> ! {
    eprintln!("geodata: {err}");
    std::process::exit(1);
}
