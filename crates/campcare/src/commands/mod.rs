//! Command dispatch: bridges CLI args -> core requests -> output formatting.

pub mod instances;
pub mod lookup;

use crate::cli::{Command, GlobalOpts, OutputFormat};
use crate::config::Host;
use crate::error::CliError;

/// Dispatch a lookup command to its handler.
pub async fn dispatch(
    cmd: Command,
    host: &Host,
    format: OutputFormat,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::CheckPlate(args) => lookup::check_plate(host, args, format, global).await,
        Command::QueryPlate(args) => lookup::query_plate(host, args, format, global).await,
        Command::Reservation(args) => lookup::reservation(host, args, format, global).await,
        Command::Places(args) => lookup::places(host, &args, format, global).await,
        // Instances and Completions are handled before dispatch
        Command::Instances(_) | Command::Completions(_) => unreachable!(),
    }
}
