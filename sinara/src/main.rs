use clap::Parser;
use tracing_subscriber::EnvFilter;

use sinara_core::sinara_error;

mod cli;
mod commands;
mod prompt;
mod resolve;

use cli::Cli;
use commands::execute_command;

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "sinara=debug,info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = execute_command(cli) {
        sinara_error!("{}", e);
        std::process::exit(1);
    }
}
