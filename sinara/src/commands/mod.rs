// Command dispatch

pub mod server;
pub mod volume;

use sinara_core::error::Result;

use crate::cli::{Cli, Subject};

pub fn execute_command(cli: Cli) -> Result<()> {
    match cli.subject {
        Subject::Server(action) => server::execute(action, cli.verbose),
        Subject::Volume(action) => volume::execute(action),
    }
}
